//! Soil detection and plan generation, end to end.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::market::enrich_for_zone;
use crate::agent::prompts::{build_plan_prompt, PlanRequest, DEFAULT_PLAN_COUNT};
use crate::agent::ranking::{ranked_crops_for_soil, RankedCrop};
use crate::agent::validate::{validate_plans, ValidationReport};
use crate::ai::message::ChatMessage;
use crate::ai::provider::AiProvider;
use crate::catalog::SoilProfile;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::plan::Terrain;
use crate::soil::{match_soil, SoilReading};
use crate::store::Store;

/// Matched soil and the crops recommended for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilDetection {
    pub sol: SoilProfile,
    pub cultures: Vec<RankedCrop>,
    #[serde(default)]
    pub distance: f64,
}

pub async fn detect(store: &dyn Store, reading: &SoilReading) -> Result<SoilDetection, AppError> {
    let soils = store.soils().await?;
    let matched = match_soil(reading, &soils)?;
    let sol = matched.profile.clone();
    let distance = matched.distance;
    let cultures = ranked_crops_for_soil(store, sol.id).await?;
    tracing::info!(
        soil_id = sol.id,
        soil = %sol.name,
        distance,
        crops = cultures.len(),
        "soil detected"
    );
    Ok(SoilDetection {
        sol,
        cultures,
        distance,
    })
}

/// Input to one generation run, as the planning screen submits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(rename = "sol")]
    pub soil: SoilProfile,
    #[serde(rename = "cultures")]
    pub crops: Vec<RankedCrop>,
    #[serde(rename = "id_zone")]
    pub zone_id: i64,
    #[serde(rename = "largeur")]
    pub width: f64,
    #[serde(rename = "longueur")]
    pub height: f64,
    #[serde(rename = "superficie", default)]
    pub area: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub plan_count: u32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            plan_count: DEFAULT_PLAN_COUNT,
            max_tokens: None,
            timeout: Duration::from_secs(180),
        }
    }
}

impl GenerationOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            plan_count: config.plans_per_request,
            max_tokens: config.max_tokens,
            timeout: config.generation_timeout(),
        }
    }
}

/// Enrich, prompt, call the model once, and validate the answer against
/// the crop set the prompt offered.
pub async fn generate(
    store: &dyn Store,
    provider: &dyn AiProvider,
    req: &GenerationRequest,
    opts: &GenerationOptions,
) -> Result<ValidationReport, AppError> {
    let terrain = Terrain::new(req.width, req.height, req.area)?;
    let (zone, crops) = enrich_for_zone(store, req.zone_id, req.crops.clone()).await?;
    let prompt = build_plan_prompt(&PlanRequest {
        soil: &req.soil,
        crops: &crops,
        zone: &zone,
        terrain,
        plan_count: opts.plan_count,
    })?;

    tracing::info!(
        zone_id = zone.id,
        allowed = prompt.context.allowed_crop_ids.len(),
        width = terrain.width,
        height = terrain.height,
        "requesting plans from model"
    );
    let messages = [ChatMessage::user(prompt.text)];
    let (text, usage) = tokio::time::timeout(opts.timeout, provider.complete(&messages, opts.max_tokens))
        .await
        .map_err(|_| {
            AppError::AiProviderError(format!(
                "no response within {}s",
                opts.timeout.as_secs()
            ))
        })??;
    if let Some(usage) = usage {
        tracing::debug!(total_tokens = usage.total(), "model usage");
    }

    validate_plans(&text, &prompt.context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::TokenUsage;
    use crate::catalog::{CropSoilAffinity, MarketQuote};
    use crate::store::seed::SeedData;
    use crate::store::InMemoryStore;
    use crate::testutil::{crop, seeded_store, soil, zone, ScriptedProvider};
    use async_trait::async_trait;

    fn one_crop_store() -> InMemoryStore {
        InMemoryStore::new(SeedData {
            sols: vec![soil(1, 6.5, 40.0, 2.0)],
            cultures: vec![crop(10, "Sorgho")],
            culture_sol: vec![CropSoilAffinity {
                crop_id: 10,
                soil_id: 1,
                affinity: 7.0,
                notes: None,
            }],
            zones: vec![zone(1, "Sahel")],
            culture_marches: vec![MarketQuote {
                zone_id: 1,
                crop_id: 10,
                average_price: Some(150.0),
                season: Some("hivernage".into()),
                demand: None,
                valid_from: None,
                valid_to: None,
            }],
        })
    }

    async fn request_for(store: &InMemoryStore, reading: SoilReading) -> GenerationRequest {
        let detection = detect(store, &reading).await.unwrap();
        GenerationRequest {
            soil: detection.sol,
            crops: detection.cultures,
            zone_id: 1,
            width: 10.0,
            height: 5.0,
            area: None,
        }
    }

    #[tokio::test]
    async fn test_detect_exact_reading() {
        let store = seeded_store();
        let detection = detect(&store, &SoilReading::new(6.5, 40.0, 2.0)).await.unwrap();
        assert_eq!(detection.sol.id, 2);
        assert_eq!(detection.distance, 0.0);
        let names: Vec<&str> = detection.cultures.iter().map(|c| c.crop.name.as_str()).collect();
        assert_eq!(names, vec!["Maïs", "Tomate", "Arachide"]);
    }

    #[tokio::test]
    async fn test_detect_on_empty_catalog() {
        let store = InMemoryStore::empty();
        let err = detect(&store, &SoilReading::new(7.0, 30.0, 1.0)).await.unwrap_err();
        assert!(matches!(err, AppError::NoSoilData));
    }

    #[tokio::test]
    async fn test_unknown_crop_filtered_end_to_end() {
        let store = one_crop_store();
        let req = request_for(&store, SoilReading::new(6.4, 41.0, 2.0)).await;
        let provider = ScriptedProvider::replying(
            r#"{"plans":[{"nom":"Mixte","profit_estime":900,"niveau_risque":2,"parcelles":[
                {"id_culture":10,"pourcentage":70,"grid_x":0,"grid_y":0,"width":7,"height":5},
                {"id_culture":999,"pourcentage":30,"grid_x":7,"grid_y":0,"width":3,"height":5}
            ]}]}"#,
        );

        let report = generate(&store, &provider, &req, &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(report.plans.len(), 1);
        let parcels = &report.plans[0].parcels;
        assert_eq!(parcels.len(), 1);
        assert_eq!(parcels[0].crop_id, 10);
        assert_eq!(parcels[0].crop.name, "Sorgho");
        assert_eq!(parcels[0].properties.width, 7.0);

        let prompt = provider.last_prompt();
        assert!(prompt.contains("\"id_culture\": 10"));
        assert!(prompt.contains("Zone: Sahel"));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let store = one_crop_store();
        let req = request_for(&store, SoilReading::new(6.5, 40.0, 2.0)).await;
        let provider = ScriptedProvider::failing("API error (429 Too Many Requests)");
        let err = generate(&store, &provider, &req, &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_invalid_terrain_rejected_before_model_call() {
        let store = one_crop_store();
        let mut req = request_for(&store, SoilReading::new(6.5, 40.0, 2.0)).await;
        req.width = 0.0;
        let provider = ScriptedProvider::replying("{}");
        let err = generate(&store, &provider, &req, &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(provider.seen.lock().unwrap().is_empty());
    }

    struct StalledProvider;

    #[async_trait]
    impl AiProvider for StalledProvider {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _max_tokens: Option<u32>,
        ) -> Result<(String, Option<TokenUsage>), AppError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok((String::new(), None))
        }
    }

    #[tokio::test]
    async fn test_generation_times_out() {
        let store = one_crop_store();
        let req = request_for(&store, SoilReading::new(6.5, 40.0, 2.0)).await;
        let opts = GenerationOptions {
            timeout: Duration::from_millis(20),
            ..GenerationOptions::default()
        };
        let err = generate(&store, &StalledProvider, &req, &opts).await.unwrap_err();
        assert!(matches!(err, AppError::AiProviderError(_)));
    }
}
