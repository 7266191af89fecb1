use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::CropProfile;
use crate::error::AppError;
use crate::plan::{
    CropSnapshot, Dimensions, GeoJsonPolygon, Parcel, ParcelProperties, PlanProposal, Terrain,
};
use crate::store::{ParcelRow, PlanRow, Store, StoredPlan};

/// A proposal the user picked, with the plot it was generated for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePlanRequest {
    pub plan: PlanProposal,
    #[serde(rename = "id_zone")]
    pub zone_id: i64,
    pub terrain: Terrain,
}

/// Outcome reported to the caller of a save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveResult {
    pub success: bool,
    /// Assigned id on success. On a parcel failure, the orphaned plan row.
    pub id_plan: Option<i64>,
    pub error: Option<String>,
}

impl From<Result<i64, AppError>> for SaveResult {
    fn from(result: Result<i64, AppError>) -> Self {
        match result {
            Ok(id) => Self {
                success: true,
                id_plan: Some(id),
                error: None,
            },
            Err(e) => Self {
                success: false,
                id_plan: e.orphaned_plan_id(),
                error: Some(e.to_string()),
            },
        }
    }
}

pub fn plan_row(plan: &PlanProposal, zone_id: i64, terrain: &Terrain) -> PlanRow {
    PlanRow {
        nom: plan.name.clone(),
        description: plan.description.clone().unwrap_or_default(),
        analyses: plan.analysis.clone().unwrap_or_default(),
        date_creation: plan.created_at,
        id_zone: zone_id,
        superficie: terrain.area,
        profit_estime: plan.estimated_profit,
        niveau_risque: plan.risk_level,
        dimensions: Some(terrain.dimensions()),
    }
}

/// One row per parcel. A polygon is derived from grid position and size
/// unless the parcel carries a valid one.
pub fn parcel_rows(plan: &PlanProposal, plan_id: i64, zone_id: i64) -> Vec<ParcelRow> {
    plan.parcels
        .iter()
        .map(|parcel| ParcelRow {
            id_plan: plan_id,
            id_culture: parcel.crop_id,
            id_zone: zone_id,
            pourcentage: parcel.percentage,
            proprietes: Some(parcel.properties.clone()),
            geometrie: Some(parcel.footprint()),
        })
        .collect()
}

/// Insert the plan row, then its parcels. Not atomic: when the parcel batch
/// fails the plan row stays behind and its id is reported in the error.
pub async fn persist_plan(store: &dyn Store, req: &SavePlanRequest) -> Result<i64, AppError> {
    if req.plan.is_persisted() {
        return Err(AppError::InvalidInput(format!(
            "plan {} is already saved",
            req.plan.id
        )));
    }

    let plan_id = store
        .insert_plan(plan_row(&req.plan, req.zone_id, &req.terrain))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, plan = %req.plan.name, "plan insert failed");
            AppError::PlanInsertFailed(e.to_string())
        })?;

    let rows = parcel_rows(&req.plan, plan_id, req.zone_id);
    let parcel_count = rows.len();
    if !rows.is_empty() {
        store.insert_parcels(rows).await.map_err(|e| {
            tracing::error!(plan_id, error = %e, "parcel insert failed; plan row left orphaned");
            AppError::ParcelInsertFailed {
                plan_id,
                message: e.to_string(),
            }
        })?;
    }

    tracing::info!(plan_id, parcels = parcel_count, zone_id = req.zone_id, "plan saved");
    Ok(plan_id)
}

// -- Read-back --

/// Rebuild a proposal from stored rows, joining crop snapshots from `crops`.
pub fn proposal_from_stored(stored: StoredPlan, crops: &HashMap<i64, CropProfile>) -> PlanProposal {
    let plan_id = stored.id_plan;
    let row = stored.row;
    let parcels = stored
        .parcelles
        .into_iter()
        .map(|p| {
            let snapshot = crops
                .get(&p.row.id_culture)
                .map_or_else(|| CropSnapshot::unknown(p.row.id_culture), CropSnapshot::from_crop);
            let properties = p.row.proprietes.unwrap_or_else(|| ParcelProperties {
                color: snapshot.color.clone(),
                ..ParcelProperties::default()
            });
            Parcel {
                id: p.id_parcelle.to_string(),
                plan_id: p.row.id_plan,
                zone_id: p.row.id_zone,
                crop_id: p.row.id_culture,
                percentage: p.row.pourcentage,
                properties,
                crop: snapshot,
                geometry: p.row.geometrie.filter(GeoJsonPolygon::is_valid),
            }
        })
        .collect();

    PlanProposal {
        id: plan_id,
        name: row.nom,
        description: Some(row.description).filter(|s| !s.is_empty()),
        analysis: Some(row.analyses).filter(|s| !s.is_empty()),
        area: row.superficie,
        dimensions: row.dimensions.unwrap_or_else(Dimensions::default),
        estimated_profit: row.profit_estime,
        risk_level: row.niveau_risque,
        created_at: row.date_creation,
        parcels,
    }
}

async fn crop_index(store: &dyn Store) -> Result<HashMap<i64, CropProfile>, AppError> {
    Ok(store.crops().await?.into_iter().map(|c| (c.id, c)).collect())
}

/// Saved plans, newest first.
pub async fn list_plans(store: &dyn Store) -> Result<Vec<PlanProposal>, AppError> {
    let crops = crop_index(store).await?;
    Ok(store
        .plans()
        .await?
        .into_iter()
        .map(|p| proposal_from_stored(p, &crops))
        .collect())
}

pub async fn load_plan(store: &dyn Store, plan_id: i64) -> Result<PlanProposal, AppError> {
    let stored = store
        .plan(plan_id)
        .await?
        .ok_or(AppError::PlanNotFound(plan_id))?;
    let crops = crop_index(store).await?;
    Ok(proposal_from_stored(stored, &crops))
}
