use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub ai_provider: String,
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub http_referer: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_plans_per_request")]
    pub plans_per_request: u32,
    #[serde(default = "default_generation_timeout_seconds")]
    pub generation_timeout_seconds: u64,
    #[serde(default = "default_sensor_ttl_seconds")]
    pub sensor_ttl_seconds: u64,
    #[serde(default = "default_sensor_poll_interval_seconds")]
    pub sensor_poll_interval_seconds: u64,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default)]
    pub seed_path: Option<String>,
}

fn default_plans_per_request() -> u32 {
    3
}

fn default_generation_timeout_seconds() -> u64 {
    180
}

fn default_sensor_ttl_seconds() -> u64 {
    90
}

fn default_sensor_poll_interval_seconds() -> u64 {
    5
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ai_provider: "openrouter".to_string(),
            api_key: None,
            model: "deepseek/deepseek-r1-0528-qwen3-8b:free".to_string(),
            base_url: None,
            http_referer: None,
            max_tokens: None,
            temperature: None,
            plans_per_request: default_plans_per_request(),
            generation_timeout_seconds: default_generation_timeout_seconds(),
            sensor_ttl_seconds: default_sensor_ttl_seconds(),
            sensor_poll_interval_seconds: default_sensor_poll_interval_seconds(),
            bind_address: default_bind_address(),
            seed_path: None,
        }
    }
}

impl AppConfig {
    /// Get the path to the config file in the user config dir
    pub fn config_path() -> Result<PathBuf, AppError> {
        let data_dir = dirs::config_dir()
            .ok_or_else(|| AppError::ConfigError("Cannot find config directory".into()))?;
        Ok(data_dir.join("agroplan-studio").join("config.json"))
    }

    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self, AppError> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents).map_err(|e| AppError::ConfigError(e.to_string()))?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), AppError> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` outside tests.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("AGROPLAN_API_KEY").or_else(|| lookup("OPENROUTER_API_KEY")) {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Some(bind) = lookup("AGROPLAN_BIND") {
            self.bind_address = bind;
        }
        if let Some(seed) = lookup("AGROPLAN_SEED") {
            self.seed_path = Some(seed);
        }
        self
    }

    pub fn sensor_ttl(&self) -> Duration {
        Duration::from_secs(self.sensor_ttl_seconds)
    }

    pub fn sensor_poll_interval(&self) -> Duration {
        Duration::from_secs(self.sensor_poll_interval_seconds.max(1))
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_fields_take_defaults() {
        let json = r#"{"ai_provider":"openai","api_key":null,"model":"gpt-4o-mini"}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.plans_per_request, 3);
        assert_eq!(config.sensor_ttl_seconds, 90);
        assert_eq!(config.sensor_poll_interval_seconds, 5);
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert!(config.seed_path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("OPENROUTER_API_KEY", "sk-or-test"),
            ("AGROPLAN_BIND", "127.0.0.1:8080"),
        ]
        .into_iter()
        .collect();
        let config =
            AppConfig::default().with_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("sk-or-test"));
        assert_eq!(config.bind_address, "127.0.0.1:8080");
    }

    #[test]
    fn test_project_key_wins_over_openrouter_key() {
        let config = AppConfig::default().with_env_overrides(|k| match k {
            "AGROPLAN_API_KEY" => Some("primary".to_string()),
            "OPENROUTER_API_KEY" => Some("secondary".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn test_poll_interval_never_zero() {
        let config = AppConfig {
            sensor_poll_interval_seconds: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.sensor_poll_interval(), Duration::from_secs(1));
    }
}
