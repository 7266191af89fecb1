use crate::agent::pipeline::{self, SoilDetection};
use crate::catalog::SoilProfile;
use crate::error::AppError;
use crate::soil::SoilReading;
use crate::state::AppState;

/// Match a manually entered reading and rank crops for the matched soil.
pub async fn detect_soil(state: &AppState, reading: SoilReading) -> Result<SoilDetection, AppError> {
    pipeline::detect(state.store.as_ref(), &reading).await
}

pub async fn list_soils(state: &AppState) -> Result<Vec<SoilProfile>, AppError> {
    state.store.soils().await
}
