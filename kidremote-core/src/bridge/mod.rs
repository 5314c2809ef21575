//! Device I/O: Wi-Fi status, the TV and the lights.

pub mod govee;
#[cfg(test)]
pub mod mock;
pub mod network;
pub mod roku;

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use kidremote_protocol::govee::{Envelope, Rgb};

use crate::{
    error::Error,
    registry::{Device, DeviceKind, DeviceRegistry},
    storage::{keys, StorageHandle},
    util::default_agent,
};

use self::govee::GoveeCloudClient;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GoveeStatus {
    pub online: bool,
    pub power: Option<bool>,
    pub brightness: Option<u8>,
    pub color: Option<Rgb>,
}

/// Commands the controller may issue to the outside world.  Every call
/// blocks, so the controller runs them on its worker pool.
pub trait Bridge: Send + Sync {
    fn is_wifi_connected(&self) -> Result<bool, Error>;

    fn roku_discover(&self, timeout: Duration) -> Result<Vec<Device>, Error>;
    fn roku_launch_app(&self, app_id: &str, params: &Map<String, Value>) -> Result<(), Error>;

    fn govee_discover(&self, timeout: Duration) -> Result<Vec<Device>, Error>;
    fn govee_send(&self, host: &str, port: Option<u16>, body: &Envelope) -> Result<(), Error>;
    fn govee_status(&self, host: &str, port: Option<u16>) -> Result<GoveeStatus, Error>;

    fn govee_cloud_devices(&self, api_key: &str) -> Result<Value, Error>;
    fn govee_cloud_control(
        &self,
        api_key: &str,
        device: &str,
        model: &str,
        cmd: &Value,
    ) -> Result<Value, Error>;
    fn govee_cloud_state(&self, api_key: &str, device: &str, model: &str) -> Result<Value, Error>;
}

/// Talks to real devices over the local network and the Govee cloud.
pub struct NativeBridge {
    storage: StorageHandle,
    agent: ureq::Agent,
    govee_cloud: GoveeCloudClient,
}

impl NativeBridge {
    pub fn new(storage: StorageHandle, govee_cloud_base: &str, proxy_url: Option<&str>) -> Self {
        Self {
            storage,
            agent: default_agent(None),
            govee_cloud: GoveeCloudClient::new(govee_cloud_base, proxy_url),
        }
    }

    /// The configured TV address, else the first TV ever discovered.
    fn roku_host(&self) -> Option<String> {
        self.storage.get_non_empty(keys::ROKU_IP).or_else(|| {
            DeviceRegistry::load(&self.storage)
                .devices(DeviceKind::Roku)
                .map(|device| device.host.clone())
                .find(|host| !host.is_empty())
        })
    }
}

impl Bridge for NativeBridge {
    fn is_wifi_connected(&self) -> Result<bool, Error> {
        network::is_connected_to_wifi()
    }

    fn roku_discover(&self, timeout: Duration) -> Result<Vec<Device>, Error> {
        roku::discover(&self.agent, timeout)
    }

    fn roku_launch_app(&self, app_id: &str, params: &Map<String, Value>) -> Result<(), Error> {
        let host = self
            .roku_host()
            .ok_or_else(|| Error::BridgeUnavailable("no TV has been found yet".into()))?;
        roku::launch_app(&self.agent, &host, app_id, params)
    }

    fn govee_discover(&self, timeout: Duration) -> Result<Vec<Device>, Error> {
        govee::discover(timeout)
    }

    fn govee_send(&self, host: &str, port: Option<u16>, body: &Envelope) -> Result<(), Error> {
        govee::send(host, port, body)
    }

    fn govee_status(&self, host: &str, port: Option<u16>) -> Result<GoveeStatus, Error> {
        govee::status(host, port)
    }

    fn govee_cloud_devices(&self, api_key: &str) -> Result<Value, Error> {
        self.govee_cloud.devices(api_key)
    }

    fn govee_cloud_control(
        &self,
        api_key: &str,
        device: &str,
        model: &str,
        cmd: &Value,
    ) -> Result<Value, Error> {
        self.govee_cloud.control(api_key, device, model, cmd)
    }

    fn govee_cloud_state(&self, api_key: &str, device: &str, model: &str) -> Result<Value, Error> {
        self.govee_cloud.state(api_key, device, model)
    }
}
