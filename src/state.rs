use std::sync::{Arc, Mutex};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::sensor::SensorMailbox;
use crate::store::Store;

/// Shared by the HTTP boundary and the in-process commands.
pub struct AppState {
    pub config: Mutex<AppConfig>,
    pub store: Arc<dyn Store>,
    pub mailbox: Arc<SensorMailbox>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let mailbox = Arc::new(SensorMailbox::new(config.sensor_ttl()));
        Self {
            config: Mutex::new(config),
            store,
            mailbox,
        }
    }

    /// Copy of the current settings.
    pub fn config_snapshot(&self) -> Result<AppConfig, AppError> {
        self.config
            .lock()
            .map(|c| c.clone())
            .map_err(|e| AppError::ConfigError(format!("Failed to lock config: {}", e)))
    }
}
