use crate::agent::market::{
    self, CropPriceHistory, CropWithPrice, EnrichedCrop, MarketFilters, MarketItem,
};
use crate::catalog::Zone;
use crate::error::AppError;
use crate::state::AppState;

/// Zones sorted by name.
pub async fn list_zones(state: &AppState) -> Result<Vec<Zone>, AppError> {
    state.store.zones().await
}

pub async fn browse_market(
    state: &AppState,
    filters: MarketFilters,
) -> Result<Vec<MarketItem>, AppError> {
    market::browse_market(state.store.as_ref(), &filters).await
}

pub async fn price_history(state: &AppState, crop_id: i64) -> Result<CropPriceHistory, AppError> {
    market::price_history(state.store.as_ref(), crop_id).await
}

pub async fn crops_with_current_price(state: &AppState) -> Result<Vec<CropWithPrice>, AppError> {
    market::crops_with_current_price(state.store.as_ref()).await
}

pub async fn zone_crops(state: &AppState, zone_id: i64) -> Result<Vec<EnrichedCrop>, AppError> {
    market::zone_crops(state.store.as_ref(), zone_id).await
}
