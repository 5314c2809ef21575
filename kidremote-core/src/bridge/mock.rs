//! Scriptable bridge for tests.

use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use kidremote_protocol::govee::Envelope;

use crate::{error::Error, registry::Device};

use super::{Bridge, GoveeStatus};

#[derive(Default)]
pub struct MockBridge {
    pub wifi: bool,
    pub roku: Option<Vec<Device>>,
    pub govee: Option<Vec<Device>>,
    pub fail_launch: bool,
    pub launched: Mutex<Vec<(String, Map<String, Value>)>>,
    pub sent: Mutex<Vec<(String, Option<u16>, Envelope)>>,
    pub cloud_devices: Vec<Value>,
    pub cloud_state: Value,
    /// `(device, model, cmd)` of every cloud control call.
    pub cloud_sent: Mutex<Vec<(String, String, Value)>>,
}

impl MockBridge {
    pub fn online() -> Self {
        Self {
            wifi: true,
            roku: Some(Vec::new()),
            govee: Some(Vec::new()),
            ..Self::default()
        }
    }

    pub fn sent_commands(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .map(|(_, _, body)| body.msg.cmd.clone())
            .collect()
    }
}

impl Bridge for MockBridge {
    fn is_wifi_connected(&self) -> Result<bool, Error> {
        Ok(self.wifi)
    }

    fn roku_discover(&self, _: Duration) -> Result<Vec<Device>, Error> {
        self.roku.clone().ok_or(Error::Timeout)
    }

    fn roku_launch_app(&self, app_id: &str, params: &Map<String, Value>) -> Result<(), Error> {
        if self.fail_launch {
            return Err(Error::BridgeUnavailable("no TV has been found yet".into()));
        }
        self.launched.lock().push((app_id.to_string(), params.clone()));
        Ok(())
    }

    fn govee_discover(&self, _: Duration) -> Result<Vec<Device>, Error> {
        self.govee.clone().ok_or(Error::Timeout)
    }

    fn govee_send(&self, host: &str, port: Option<u16>, body: &Envelope) -> Result<(), Error> {
        self.sent.lock().push((host.to_string(), port, body.clone()));
        Ok(())
    }

    fn govee_status(&self, _: &str, _: Option<u16>) -> Result<GoveeStatus, Error> {
        Ok(GoveeStatus::default())
    }

    fn govee_cloud_devices(&self, _: &str) -> Result<Value, Error> {
        Ok(Value::Array(self.cloud_devices.clone()))
    }

    fn govee_cloud_control(
        &self,
        _: &str,
        device: &str,
        model: &str,
        cmd: &Value,
    ) -> Result<Value, Error> {
        self.cloud_sent
            .lock()
            .push((device.to_string(), model.to_string(), cmd.clone()));
        Ok(Value::Null)
    }

    fn govee_cloud_state(&self, _: &str, _: &str, _: &str) -> Result<Value, Error> {
        Ok(self.cloud_state.clone())
    }
}
