use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{CropProfile, CropSoilAffinity};
use crate::error::AppError;
use crate::store::Store;

/// A crop recommended for a soil, with its affinity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCrop {
    #[serde(flatten)]
    pub crop: CropProfile,
    #[serde(rename = "affinite")]
    pub affinity: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Join `crops` with the affinities recorded for `soil_id`, best first.
///
/// Equal scores keep crop catalog order. Affinities pointing at crops that
/// are not in the catalog are ignored.
pub fn rank_crops(
    soil_id: i64,
    crops: &[CropProfile],
    affinities: &[CropSoilAffinity],
) -> Vec<RankedCrop> {
    let mut by_crop: HashMap<i64, &CropSoilAffinity> = HashMap::new();
    for affinity in affinities.iter().filter(|a| a.soil_id == soil_id) {
        by_crop.entry(affinity.crop_id).or_insert(affinity);
    }

    let mut ranked: Vec<RankedCrop> = crops
        .iter()
        .filter_map(|crop| {
            by_crop.get(&crop.id).map(|a| RankedCrop {
                crop: crop.clone(),
                affinity: a.affinity,
                notes: a.notes.clone(),
            })
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| b.affinity.total_cmp(&a.affinity));
    ranked
}

/// Crops for `soil_id` ranked by affinity. An empty list is a valid answer.
pub async fn ranked_crops_for_soil(
    store: &dyn Store,
    soil_id: i64,
) -> Result<Vec<RankedCrop>, AppError> {
    let affinities = store.affinities_for_soil(soil_id).await?;
    if affinities.is_empty() {
        tracing::debug!(soil_id, "no crop affinities recorded for soil");
        return Ok(Vec::new());
    }
    let crops = store.crops().await?;
    Ok(rank_crops(soil_id, &crops, &affinities))
}
