use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::{keys, Storage};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceKind {
    Roku,
    Govee,
}

impl DeviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Roku => "roku",
            DeviceKind::Govee => "govee",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Anything else the discovery reply carried.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Every device ever discovered, keyed by id.  Entries are never pruned.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRegistry {
    #[serde(default)]
    pub roku: BTreeMap<String, Device>,
    #[serde(default)]
    pub govee: BTreeMap<String, Device>,
}

impl DeviceRegistry {
    pub fn load(storage: &Storage) -> Self {
        let Some(raw) = storage.get_non_empty(keys::DEVICE_REGISTRY) else {
            return Self::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            log::error!("failed to parse device registry: {}", err);
            Self::default()
        })
    }

    pub fn save(&self, storage: &Storage) {
        match serde_json::to_string(self) {
            Ok(raw) => storage.set(keys::DEVICE_REGISTRY, raw),
            Err(err) => log::error!("failed to save device registry: {}", err),
        }
    }

    fn bucket_mut(&mut self, kind: DeviceKind) -> &mut BTreeMap<String, Device> {
        match kind {
            DeviceKind::Roku => &mut self.roku,
            DeviceKind::Govee => &mut self.govee,
        }
    }

    pub fn devices(&self, kind: DeviceKind) -> impl Iterator<Item = &Device> {
        match kind {
            DeviceKind::Roku => self.roku.values(),
            DeviceKind::Govee => self.govee.values(),
        }
    }

    pub fn get(&self, kind: DeviceKind, id: &str) -> Option<&Device> {
        match kind {
            DeviceKind::Roku => self.roku.get(id),
            DeviceKind::Govee => self.govee.get(id),
        }
    }

    /// Insert or refresh `devices`, returning how many ids were new.
    pub fn merge(&mut self, kind: DeviceKind, devices: impl IntoIterator<Item = Device>) -> usize {
        let bucket = self.bucket_mut(kind);
        let mut new_count = 0;
        for device in devices {
            if device.id.is_empty() {
                log::warn!("ignoring {} device without id", kind.as_str());
                continue;
            }
            if bucket.insert(device.id.clone(), device).is_none() {
                new_count += 1;
            }
        }
        new_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, host: &str) -> Device {
        Device {
            id: id.to_string(),
            host: host.to_string(),
            ..Device::default()
        }
    }

    #[test]
    fn merge_counts_only_new_ids() {
        let mut registry = DeviceRegistry::default();
        let added = registry.merge(
            DeviceKind::Roku,
            vec![device("a", "10.0.0.2"), device("b", "10.0.0.3")],
        );
        assert_eq!(added, 2);

        let added = registry.merge(
            DeviceKind::Roku,
            vec![device("a", "10.0.0.9"), device("c", "10.0.0.4")],
        );
        assert_eq!(added, 1);
        assert_eq!(registry.roku.len(), 3);
        assert_eq!(registry.get(DeviceKind::Roku, "a").unwrap().host, "10.0.0.9");
    }

    #[test]
    fn devices_without_id_are_skipped() {
        let mut registry = DeviceRegistry::default();
        assert_eq!(registry.merge(DeviceKind::Govee, vec![device("", "x")]), 0);
        assert!(registry.govee.is_empty());
    }

    #[test]
    fn round_trips_through_storage() {
        let storage = Storage::in_memory();
        let mut registry = DeviceRegistry::default();
        registry.merge(DeviceKind::Govee, vec![device("AA:BB", "10.0.0.7")]);
        registry.save(&storage);

        let loaded = DeviceRegistry::load(&storage);
        assert_eq!(loaded, registry);
    }

    #[test]
    fn corrupt_registry_loads_empty() {
        let storage = Storage::in_memory();
        storage.set(keys::DEVICE_REGISTRY, "[1, 2");
        assert_eq!(DeviceRegistry::load(&storage), DeviceRegistry::default());
    }
}
