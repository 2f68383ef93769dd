//! Device enumeration and session hand-out

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use devflow_core_types::DeviceSerial;
use tracing::{info, warn};

use crate::device::UiDevice;
use crate::errors::BridgeError;
use crate::scripted::{Scenario, ScriptedDevice};

/// Supplies device sessions to flow callers.
///
/// Sessions are handed to the engine opaquely; the engine never starts or
/// stops the provider.
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<DeviceSerial>, BridgeError>;

    async fn open(&self, serial: &DeviceSerial) -> Result<Arc<dyn UiDevice>, BridgeError>;
}

/// Provider backed by scripted devices.
#[derive(Default)]
pub struct ScenarioProvider {
    devices: DashMap<DeviceSerial, Arc<ScriptedDevice>>,
}

impl ScenarioProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, device: ScriptedDevice) -> Arc<ScriptedDevice> {
        let device = Arc::new(device);
        self.devices
            .insert(device.serial().clone(), Arc::clone(&device));
        device
    }

    /// Load every `*.yaml` / `*.yml` scenario in `dir`.
    pub async fn from_dir(dir: &Path) -> Result<Self, BridgeError> {
        let provider = Self::new();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|err| BridgeError::Scenario(format!("{}: {}", dir.display(), err)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| BridgeError::Scenario(err.to_string()))?
        {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }

            let scenario = Scenario::load(&path).await?;
            let serial = DeviceSerial::new(scenario.serial.clone());
            if provider.devices.contains_key(&serial) {
                warn!(%serial, path = %path.display(), "duplicate device serial; skipping");
                continue;
            }
            provider.insert(ScriptedDevice::from_scenario(scenario)?);
            info!(%serial, path = %path.display(), "Loaded scripted device");
        }

        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[async_trait]
impl DeviceProvider for ScenarioProvider {
    async fn list_devices(&self) -> Result<Vec<DeviceSerial>, BridgeError> {
        let mut serials: Vec<DeviceSerial> =
            self.devices.iter().map(|entry| entry.key().clone()).collect();
        serials.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(serials)
    }

    async fn open(&self, serial: &DeviceSerial) -> Result<Arc<dyn UiDevice>, BridgeError> {
        self.devices
            .get(serial)
            .map(|entry| Arc::clone(entry.value()) as Arc<dyn UiDevice>)
            .ok_or_else(|| BridgeError::UnknownDevice(serial.to_string()))
    }
}
