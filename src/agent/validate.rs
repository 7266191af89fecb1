use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::agent::extract::{parse_model_response, ParseMode};
use crate::agent::prompts::GenerationContext;
use crate::error::AppError;
use crate::plan::{CropSnapshot, Parcel, ParcelProperties, PlanProposal, Terrain, DEFAULT_SHAPE};

/// Why a generated parcel was discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// `id_culture` missing or not an integer.
    MissingCropId,
    /// `id_culture` outside the offered set.
    NotAllowed(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParcelDecision {
    Keep(i64),
    Drop(DropReason),
}

/// Closed-world crop filter: a parcel survives only if its `id_culture`
/// was offered in the prompt. Violators are dropped, never substituted.
pub fn closed_world_policy(parcel: &Map<String, Value>, ctx: &GenerationContext) -> ParcelDecision {
    match parcel.get("id_culture").and_then(integer) {
        None => ParcelDecision::Drop(DropReason::MissingCropId),
        Some(id) if ctx.allowed_crop_ids.contains(&id) => ParcelDecision::Keep(id),
        Some(id) => ParcelDecision::Drop(DropReason::NotAllowed(id)),
    }
}

/// Accepted plans plus what was thrown away on the way.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub plans: Vec<PlanProposal>,
    pub mode: ParseMode,
    pub dropped_parcels: Vec<DropReason>,
    pub dropped_plans: usize,
}

/// Validate a raw model response against the context its prompt was built with.
pub fn validate_plans(response: &str, ctx: &GenerationContext) -> Result<ValidationReport, AppError> {
    validate_plans_with(response, ctx, closed_world_policy, Utc::now())
}

pub fn validate_plans_with<P>(
    response: &str,
    ctx: &GenerationContext,
    policy: P,
    now: DateTime<Utc>,
) -> Result<ValidationReport, AppError>
where
    P: Fn(&Map<String, Value>, &GenerationContext) -> ParcelDecision,
{
    let (value, mode) = parse_model_response(response)
        .into_value()
        .map_err(AppError::UnparsableModelResponse)?;

    let raw_plans = value
        .get("plans")
        .and_then(Value::as_array)
        .ok_or(AppError::EmptyPlanSet)?;

    let mut plans = Vec::new();
    let mut dropped_parcels = Vec::new();
    let mut dropped_plans = 0;

    for (index, raw) in raw_plans.iter().enumerate() {
        let Some(raw) = raw.as_object() else {
            dropped_plans += 1;
            continue;
        };

        let mut parcels = Vec::new();
        for raw_parcel in raw
            .get("parcelles")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let Some(raw_parcel) = raw_parcel.as_object() else {
                dropped_parcels.push(DropReason::MissingCropId);
                continue;
            };
            match policy(raw_parcel, ctx) {
                ParcelDecision::Keep(crop_id) => parcels.push(build_parcel(raw_parcel, crop_id, ctx)),
                ParcelDecision::Drop(reason) => {
                    tracing::debug!(plan = index, ?reason, "dropping generated parcel");
                    dropped_parcels.push(reason);
                }
            }
        }

        if parcels.is_empty() {
            dropped_plans += 1;
            continue;
        }
        plans.push(build_plan(raw, index, parcels, &ctx.terrain, now));
    }

    if plans.is_empty() {
        tracing::warn!(
            received = raw_plans.len(),
            dropped_parcels = dropped_parcels.len(),
            "model response held no usable plan"
        );
        return Err(AppError::EmptyPlanSet);
    }

    tracing::info!(
        plans = plans.len(),
        ?mode,
        dropped_parcels = dropped_parcels.len(),
        dropped_plans,
        "validated generated plans"
    );
    Ok(ValidationReport {
        plans,
        mode,
        dropped_parcels,
        dropped_plans,
    })
}

fn build_plan(
    raw: &Map<String, Value>,
    index: usize,
    parcels: Vec<Parcel>,
    terrain: &Terrain,
    now: DateTime<Utc>,
) -> PlanProposal {
    let risk = number(raw.get("niveau_risque")).unwrap_or(0.0).round().clamp(0.0, 10.0);
    PlanProposal {
        id: 0,
        name: text(raw.get("nom")).unwrap_or_else(|| format!("Plan {}", index + 1)),
        description: text(raw.get("description")),
        analysis: text(raw.get("analyse")).or_else(|| text(raw.get("analyses"))),
        area: terrain.area,
        dimensions: terrain.dimensions(),
        estimated_profit: number(raw.get("profit_estime")).unwrap_or(0.0),
        risk_level: risk as u8,
        created_at: now,
        parcels,
    }
}

fn build_parcel(raw: &Map<String, Value>, crop_id: i64, ctx: &GenerationContext) -> Parcel {
    let t = &ctx.terrain;
    let crop = ctx.crops.get(&crop_id);
    let snapshot = crop.map_or_else(|| CropSnapshot::unknown(crop_id), CropSnapshot::from_crop);

    let properties = ParcelProperties {
        color: text(raw.get("couleur")).unwrap_or_else(|| snapshot.color.clone()),
        shape: text(raw.get("forme")).unwrap_or_else(|| DEFAULT_SHAPE.to_string()),
        grid_x: number(raw.get("grid_x")).unwrap_or(0.0).clamp(0.0, t.width - 1.0),
        grid_y: number(raw.get("grid_y")).unwrap_or(0.0).clamp(0.0, t.height - 1.0),
        width: number(raw.get("width")).unwrap_or(1.0).clamp(1.0, t.width),
        height: number(raw.get("height")).unwrap_or(1.0).clamp(1.0, t.height),
    };

    Parcel {
        id: temp_parcel_id(),
        plan_id: 0,
        zone_id: ctx.zone_id,
        crop_id,
        percentage: number(raw.get("pourcentage")).unwrap_or(0.0).clamp(0.0, 100.0),
        properties,
        crop: snapshot,
        geometry: None,
    }
}

/// Placeholder id until the store assigns one.
fn temp_parcel_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("temp_{}", &id[..9])
}

/// Integral JSON number. `3.0` counts, `"3"` and `3.5` do not.
fn integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Finite number, or a string holding one.
fn number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
