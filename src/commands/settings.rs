use crate::ai::registry::{self, ProviderInfo};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::AppState;

pub fn get_provider_registry() -> Vec<ProviderInfo> {
    registry::get_provider_registry()
}

pub fn get_settings(state: &AppState) -> Result<AppConfig, AppError> {
    state.config_snapshot()
}

/// Persist `new_config` and make it current. Sensor TTL changes apply on restart.
pub fn update_settings(state: &AppState, new_config: AppConfig) -> Result<(), AppError> {
    if registry::find_provider(&new_config.ai_provider).is_none() {
        return Err(AppError::ConfigError(format!(
            "Unknown AI provider: {}",
            new_config.ai_provider
        )));
    }
    // Save to disk
    new_config.save()?;
    // Update in memory
    let mut config = state
        .config
        .lock()
        .map_err(|e| AppError::ConfigError(format!("Failed to lock config: {}", e)))?;
    *config = new_config;
    Ok(())
}
