pub mod agent;
pub mod ai;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod plan;
pub mod sensor;
pub mod server;
pub mod soil;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::AppConfig;
use error::AppError;
use state::AppState;
use store::seed::SeedData;
use store::{InMemoryStore, Store};

const BUNDLED_SEED: &str = include_str!("../data/seed.json");

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agroplan_lib=info,tower_http=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Seed file from config, or the data set compiled into the binary.
fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>, AppError> {
    let store = match &config.seed_path {
        Some(path) => InMemoryStore::from_seed_file(&PathBuf::from(path))?,
        None => {
            tracing::info!("no seed path configured, using bundled reference data");
            InMemoryStore::new(SeedData::from_json(BUNDLED_SEED)?)
        }
    };
    Ok(Arc::new(store))
}

/// Boot the sensor HTTP boundary from the saved configuration.
pub async fn run() -> Result<(), AppError> {
    init_tracing();

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        AppConfig::default().with_env_overrides(|key| std::env::var(key).ok())
    });
    let bind_address = config.bind_address.clone();
    tracing::info!(
        provider = %config.ai_provider,
        model = %config.model,
        sensor_ttl_seconds = config.sensor_ttl_seconds,
        "configuration loaded"
    );

    let store = open_store(&config)?;
    let state = Arc::new(AppState::new(config, store));
    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on {}", bind_address);
    axum::serve(listener, app).await?;
    Ok(())
}
