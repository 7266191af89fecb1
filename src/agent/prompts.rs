use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::agent::market::EnrichedCrop;
use crate::catalog::{CropProfile, DemandLevel, SoilProfile, Zone};
use crate::error::AppError;
use crate::plan::Terrain;

pub const DEFAULT_PLAN_COUNT: u32 = 3;

/// Everything the prompt is rendered from.
pub struct PlanRequest<'a> {
    pub soil: &'a SoilProfile,
    pub crops: &'a [EnrichedCrop],
    pub zone: &'a Zone,
    pub terrain: Terrain,
    pub plan_count: u32,
}

/// What validation needs to know about the prompt that produced a response.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Crop ids the model was allowed to use.
    pub allowed_crop_ids: BTreeSet<i64>,
    pub terrain: Terrain,
    pub zone_id: i64,
    /// Full records of the offered crops, for parcel snapshots.
    pub crops: HashMap<i64, CropProfile>,
}

#[derive(Debug, Clone)]
pub struct PlanPrompt {
    pub text: String,
    pub context: GenerationContext,
}

/// Crop attributes shown to the model.
#[derive(Serialize)]
struct OfferedCrop<'a> {
    id_culture: i64,
    nom: &'a str,
    type_culture: &'a str,
    besoin_eau: &'a str,
    resistance_secheresse: Option<f64>,
    temps_maturation: Option<u32>,
    rendement_moyen: Option<f64>,
    prix_moyen: f64,
    niveau_demande: Option<DemandLevel>,
}

fn offered(crop: &EnrichedCrop) -> Option<OfferedCrop<'_>> {
    let price = crop.average_price?;
    Some(OfferedCrop {
        id_culture: crop.crop.id,
        nom: &crop.crop.name,
        type_culture: &crop.crop.crop_type,
        besoin_eau: &crop.crop.water_need,
        resistance_secheresse: crop.crop.drought_resistance,
        temps_maturation: crop.crop.maturation_days,
        rendement_moyen: crop.crop.average_yield,
        prix_moyen: price,
        niveau_demande: crop.demand,
    })
}

const OUTPUT_SCHEMA: &str = r##"{
  "plans": [
    {
      "nom": "Plan name (e.g. High Yield Plan)",
      "description": "Strategy and objectives of the plan.",
      "analyse": "Pragmatic analysis: advantages, drawbacks, optimisation method, decision factors.",
      "parcelles": [
        {
          "id_culture": 123,
          "pourcentage": 60,
          "couleur": "#FF5733",
          "grid_x": 0,
          "grid_y": 0,
          "width": 10,
          "height": 15,
          "forme": "rectangle"
        }
      ],
      "profit_estime": 50000,
      "niveau_risque": 3
    }
  ]
}"##;

/// Render the generation prompt. Only crops with a market price are offered;
/// their ids form the closed set the response is validated against.
pub fn build_plan_prompt(req: &PlanRequest<'_>) -> Result<PlanPrompt, AppError> {
    let offered: Vec<OfferedCrop<'_>> = req.crops.iter().filter_map(offered).collect();
    if offered.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "no crop has a market price in zone {}",
            req.zone.name
        )));
    }
    let plan_count = req.plan_count.max(1);
    let t = &req.terrain;
    let mut prompt = String::new();

    prompt.push_str("You are an agronomy and farm-planning expert. ");
    prompt.push_str(&format!(
        "Generate {} crop allocation plans for one plot of land, respecting the constraints below strictly.\n\n",
        plan_count
    ));

    // -- Terrain --
    prompt.push_str("## Terrain\n");
    prompt.push_str(&format!(
        "- Soil: {} (pH={}, humidity={}%, salinity={}‰, texture={})\n",
        req.soil.name, req.soil.ph, req.soil.humidity, req.soil.salinity, req.soil.texture
    ));
    prompt.push_str(&format!("- Zone: {}\n", req.zone.name));
    prompt.push_str(&format!(
        "- Dimensions: area={}m², width={}m, height={}m\n\n",
        t.area, t.width, t.height
    ));

    // -- Allowed crops --
    prompt.push_str("## Allowed crops\n");
    prompt.push_str("This list is EXHAUSTIVE. Every parcel must use an `id_culture` from it. ");
    prompt.push_str("Any other id will be discarded.\n");
    prompt.push_str(&serde_json::to_string_pretty(&offered)?);
    prompt.push_str("\n\n");

    // -- Output format --
    prompt.push_str("## Output format\n");
    prompt.push_str("Reply ONLY with one valid JSON object, with no text before or after it, shaped like this:\n");
    prompt.push_str(OUTPUT_SCHEMA);
    prompt.push_str("\n\n");

    // -- Rules --
    prompt.push_str("## Rules\n");
    prompt.push_str(&format!(
        "1. Produce exactly {} distinct plans with different strategies (e.g. maximum yield, minimum risk, biodiversity).\n",
        plan_count
    ));
    prompt.push_str("2. Justify each plan in its `analyse` field.\n");
    prompt.push_str(&format!(
        "3. `grid_x` is an integer in [0, {}] and `grid_y` an integer in [0, {}]. `width` and `height` are in metres.\n",
        t.width - 1.0,
        t.height - 1.0
    ));
    prompt.push_str("4. Parcels must not overlap, and together they must cover the whole terrain.\n");
    prompt.push_str("5. The `pourcentage` values of each plan must sum to 100.\n");
    prompt.push_str("6. Give each crop a vivid, distinct `couleur`.\n");
    prompt.push_str("7. `niveau_risque` is an integer from 0 (no risk) to 10.\n");

    let allowed_crop_ids: BTreeSet<i64> = offered.iter().map(|c| c.id_culture).collect();
    let crops = req
        .crops
        .iter()
        .filter(|c| allowed_crop_ids.contains(&c.crop.id))
        .map(|c| (c.crop.id, c.crop.clone()))
        .collect();

    Ok(PlanPrompt {
        text: prompt,
        context: GenerationContext {
            allowed_crop_ids,
            terrain: req.terrain,
            zone_id: req.zone.id,
            crops,
        },
    })
}
