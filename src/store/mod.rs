pub mod memory;
pub mod seed;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{CropProfile, CropSoilAffinity, MarketQuote, SoilProfile, Zone};
use crate::error::AppError;
use crate::plan::{Dimensions, GeoJsonPolygon, ParcelProperties};

pub use memory::InMemoryStore;

/// `plan_optimisation` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRow {
    pub nom: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub analyses: String,
    pub date_creation: DateTime<Utc>,
    pub id_zone: i64,
    pub superficie: f64,
    pub profit_estime: f64,
    pub niveau_risque: u8,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
}

/// `parcelles` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRow {
    pub id_plan: i64,
    pub id_culture: i64,
    pub id_zone: i64,
    pub pourcentage: f64,
    #[serde(default)]
    pub proprietes: Option<ParcelProperties>,
    #[serde(default)]
    pub geometrie: Option<GeoJsonPolygon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredParcel {
    pub id_parcelle: i64,
    #[serde(flatten)]
    pub row: ParcelRow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPlan {
    pub id_plan: i64,
    #[serde(flatten)]
    pub row: PlanRow,
    #[serde(default)]
    pub parcelles: Vec<StoredParcel>,
}

/// CRUD boundary to the relational store. Reference tables are read-only;
/// plans and parcels are insert-only.
#[async_trait]
pub trait Store: Send + Sync {
    async fn soils(&self) -> Result<Vec<SoilProfile>, AppError>;

    async fn soil(&self, soil_id: i64) -> Result<Option<SoilProfile>, AppError>;

    async fn crops(&self) -> Result<Vec<CropProfile>, AppError>;

    async fn affinities_for_soil(&self, soil_id: i64) -> Result<Vec<CropSoilAffinity>, AppError>;

    async fn zones(&self) -> Result<Vec<Zone>, AppError>;

    async fn zone(&self, zone_id: i64) -> Result<Option<Zone>, AppError>;

    async fn market_quotes(&self) -> Result<Vec<MarketQuote>, AppError>;

    /// Insert a plan row and return its assigned id.
    async fn insert_plan(&self, row: PlanRow) -> Result<i64, AppError>;

    async fn insert_parcels(&self, rows: Vec<ParcelRow>) -> Result<(), AppError>;

    /// Plans with their parcels, newest first.
    async fn plans(&self) -> Result<Vec<StoredPlan>, AppError>;

    async fn plan(&self, plan_id: i64) -> Result<Option<StoredPlan>, AppError>;
}
