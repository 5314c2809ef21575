//! Finding TVs and lights on the local network and remembering them.

use std::time::Duration;

use crate::{
    bridge::Bridge,
    content::cloud::CloudConfigClient,
    error::Error,
    registry::{Device, DeviceKind, DeviceRegistry},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scan {
    pub roku: Vec<Device>,
    pub govee: Vec<Device>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registration {
    pub new_count: usize,
    /// The merged lists are worth pushing to the cloud.
    pub should_sync: bool,
}

impl Registration {
    pub fn status_message(&self) -> Option<String> {
        (self.new_count > 0).then(|| format!("Found {} new devices!", self.new_count))
    }
}

/// Runs TV then light discovery.  Returns `Ok(None)` off Wi-Fi.  A failing
/// discovery only empties its own list.  `started` runs once the Wi-Fi check
/// has passed, right before the first search.
pub fn scan(
    bridge: &dyn Bridge,
    timeout: Duration,
    started: impl FnOnce(),
) -> Result<Option<Scan>, Error> {
    if !bridge.is_wifi_connected()? {
        log::info!("skipping device discovery, not on wi-fi");
        return Ok(None);
    }
    started();
    let roku = bridge.roku_discover(timeout).unwrap_or_else(|err| {
        log::warn!("roku discovery failed: {}", err);
        Vec::new()
    });
    let govee = bridge.govee_discover(timeout).unwrap_or_else(|err| {
        log::warn!("govee discovery failed: {}", err);
        Vec::new()
    });
    Ok(Some(Scan { roku, govee }))
}

pub fn register(registry: &mut DeviceRegistry, scan: Scan) -> Registration {
    let new_count = registry.merge(DeviceKind::Roku, scan.roku)
        + registry.merge(DeviceKind::Govee, scan.govee);
    Registration {
        new_count,
        should_sync: new_count > 0 || !registry.roku.is_empty(),
    }
}

/// Uploads the whole registry, one list per device kind.  Failures are
/// logged per kind.
pub fn sync_to_cloud(
    client: &CloudConfigClient,
    passphrase: Option<&str>,
    registry: &DeviceRegistry,
) {
    for kind in [DeviceKind::Roku, DeviceKind::Govee] {
        let devices: Vec<Device> = registry.devices(kind).cloned().collect();
        if let Err(err) = client.save_devices(passphrase, kind, &devices) {
            log::error!("failed to save {} devices to cloud: {}", kind.as_str(), err);
        }
    }
}
