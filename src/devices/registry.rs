use std::collections::HashSet;

use serde_json::Value;

use crate::devices::builtin::BuiltinDevice;
use crate::devices::schema::{migrate_record, RecordShape, StoredDevice};
use crate::devices::store::KeyValueStore;
use crate::devices::types::{DeviceDefinition, NewDevice, ScreenRegion};
use crate::errors::{DevframeError, DevframeResult};

pub const CUSTOM_ID_PREFIX: &str = "custom-";

/// Result of a registry mutation. The mutation always took effect in memory;
/// `warning` is set when writing it to storage failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<T> {
    pub value: T,
    pub warning: Option<String>,
}

/// Ordered list of user-created devices, written through to a key/value
/// store after every change.
pub struct DeviceRegistry {
    store: Box<dyn KeyValueStore>,
    key: String,
    devices: Vec<DeviceDefinition>,
}

impl DeviceRegistry {
    /// Reads the stored list. Missing or unreadable storage gives an empty
    /// registry; individual bad records are skipped.
    pub fn load(store: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let mut registry = Self {
            store,
            key: key.into(),
            devices: Vec::new(),
        };
        registry.reload();
        registry
    }

    /// Replaces the in-memory list with what storage currently holds.
    pub fn reload(&mut self) {
        let (devices, upgraded) = self.read_stored();
        self.devices = devices;
        tracing::info!(key = %self.key, count = self.devices.len(), "custom devices loaded");

        if upgraded {
            if let Some(warning) = self.persist() {
                tracing::warn!(warning = %warning, "could not rewrite upgraded device records");
            }
        }
    }

    fn read_stored(&self) -> (Vec<DeviceDefinition>, bool) {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return (Vec::new(), false),
            Err(e) => {
                tracing::warn!(error = %e, "device storage unreadable, starting empty");
                return (Vec::new(), false);
            }
        };

        let records: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "device storage corrupt, starting empty");
                return (Vec::new(), false);
            }
        };

        let mut devices = Vec::with_capacity(records.len());
        let mut seen = HashSet::new();
        let mut upgraded = false;
        for (index, record) in records.into_iter().enumerate() {
            match migrate_record(record) {
                Ok((def, shape)) => {
                    if !seen.insert(def.id.clone()) {
                        tracing::warn!(device_id = %def.id, "duplicate device id in storage, keeping first");
                        upgraded = true;
                        continue;
                    }
                    if shape != RecordShape::Fractions {
                        tracing::info!(
                            device_id = %def.id,
                            from_version = shape.version(),
                            "upgraded stored device record"
                        );
                        upgraded = true;
                    }
                    devices.push(def);
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping unreadable device record");
                }
            }
        }
        (devices, upgraded)
    }

    /// Devices in creation order.
    pub fn list(&self) -> &[DeviceDefinition] {
        &self.devices
    }

    pub fn get(&self, id: &str) -> Option<&DeviceDefinition> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Validates `device`, assigns it a fresh id, appends it and persists.
    pub fn add(&mut self, device: NewDevice) -> DevframeResult<Persisted<DeviceDefinition>> {
        let name = device.name.trim();
        if name.is_empty() {
            return Err(DevframeError::Validation("device name must not be empty".into()));
        }
        if device.frame_image.image_url.is_empty() {
            return Err(DevframeError::Validation("device image is missing".into()));
        }
        if !device.frame_image.has_natural_size() {
            return Err(DevframeError::Validation("device image has no natural size".into()));
        }
        let r = device.screen_region;
        let screen_region = ScreenRegion::new(r.x, r.y, r.width, r.height)?;

        let definition = DeviceDefinition {
            id: self.next_id(chrono::Utc::now().timestamp_millis()),
            name: name.to_string(),
            frame_image: device.frame_image,
            screen_region,
        };
        self.devices.push(definition.clone());
        tracing::info!(device_id = %definition.id, name = %definition.name, "custom device added");

        let warning = self.persist();
        Ok(Persisted {
            value: definition,
            warning,
        })
    }

    /// Removes the device with `id`. Absent ids are a no-op; `value` reports
    /// whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Persisted<bool> {
        let before = self.devices.len();
        self.devices.retain(|d| d.id != id);
        let removed = self.devices.len() != before;
        if removed {
            tracing::info!(device_id = %id, "custom device removed");
        } else {
            tracing::debug!(device_id = %id, "remove: no such device");
        }
        Persisted {
            value: removed,
            warning: self.persist(),
        }
    }

    /// `custom-<millis>`, bumped until it collides with nothing.
    fn next_id(&self, millis: i64) -> String {
        let mut n = millis;
        loop {
            let candidate = format!("{CUSTOM_ID_PREFIX}{n}");
            let taken = self.get(&candidate).is_some() || BuiltinDevice::from_id(&candidate).is_some();
            if !taken {
                return candidate;
            }
            n += 1;
        }
    }

    /// Full synchronous rewrite. Returns a user-facing warning on failure.
    fn persist(&self) -> Option<String> {
        let stored: Vec<StoredDevice> = self.devices.iter().map(StoredDevice::from).collect();
        let result = serde_json::to_string(&stored)
            .map_err(DevframeError::from)
            .and_then(|json| self.store.set(&self.key, &json));
        match result {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, count = self.devices.len(), "failed to persist custom devices");
                Some(format!(
                    "Changes are kept for this session but will be lost on reload: {e}"
                ))
            }
        }
    }
}
