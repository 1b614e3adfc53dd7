//! Device-control contract consumed by the command dispatcher.

mod cloud;

pub use cloud::CloudDeviceController;

use crate::config::DeviceCommandConfig;
use async_trait::async_trait;

/// A single data-point write, e.g. `switch_led = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub code: String,
    pub value: bool,
}

impl From<&DeviceCommandConfig> for DeviceCommand {
    fn from(cfg: &DeviceCommandConfig) -> Self {
        Self {
            code: cfg.code.clone(),
            value: cfg.value,
        }
    }
}

/// Why a device command did not take effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The request never got a usable answer (connection, timeout, bad body).
    #[error("{0}")]
    Transport(String),
    /// The API answered but refused the command.
    #[error("device rejected command: {0}")]
    Rejected(String),
}

/// Executes commands against a remote device. Safe to retry.
#[async_trait]
pub trait DeviceController: Send + Sync {
    /// # Errors
    ///
    /// [`DeviceError::Transport`] when the call failed in flight,
    /// [`DeviceError::Rejected`] when the API refused the command.
    async fn execute(&self, device_id: &str, command: &DeviceCommand) -> Result<(), DeviceError>;
}
