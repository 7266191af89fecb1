use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Soil reference profile. Field names follow the `sols` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    #[serde(rename = "id_sol")]
    pub id: i64,
    #[serde(rename = "nom")]
    pub name: String,
    pub ph: f64,
    #[serde(rename = "humidite")]
    pub humidity: f64,
    #[serde(rename = "salinite")]
    pub salinity: f64,
    pub texture: String,
    #[serde(rename = "matiere_organique", default)]
    pub organic_matter: Option<f64>,
    #[serde(rename = "capacite_drainage", default)]
    pub drainage_capacity: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    #[serde(rename = "id_culture")]
    pub id: i64,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "nom_scientifique", default)]
    pub scientific_name: Option<String>,
    #[serde(rename = "type_culture")]
    pub crop_type: String,
    #[serde(rename = "saison_plantation", default)]
    pub planting_season: Option<String>,
    #[serde(rename = "besoin_eau")]
    pub water_need: String,
    #[serde(rename = "resistance_secheresse", default)]
    pub drought_resistance: Option<f64>,
    #[serde(default)]
    pub temperature_min: Option<f64>,
    #[serde(default)]
    pub temperature_max: Option<f64>,
    #[serde(rename = "temps_maturation", default)]
    pub maturation_days: Option<u32>,
    #[serde(rename = "rendement_moyen", default)]
    pub average_yield: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "couleur", default = "default_crop_color")]
    pub color: String,
    #[serde(rename = "img_url", default)]
    pub image_url: Option<String>,
}

pub const FALLBACK_COLOR: &str = "#cccccc";

fn default_crop_color() -> String {
    FALLBACK_COLOR.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropSoilAffinity {
    #[serde(rename = "id_culture")]
    pub crop_id: i64,
    #[serde(rename = "id_sol")]
    pub soil_id: i64,
    #[serde(rename = "affinite")]
    pub affinity: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Market demand. Accepts the French labels stored by the price refresh job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandLevel {
    #[serde(alias = "faible")]
    Low,
    #[serde(alias = "moyen")]
    Medium,
    #[serde(alias = "élevé", alias = "eleve")]
    High,
}

impl DemandLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemandLevel::Low => "low",
            DemandLevel::Medium => "medium",
            DemandLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    #[serde(rename = "id_zone")]
    pub zone_id: i64,
    #[serde(rename = "id_culture")]
    pub crop_id: i64,
    #[serde(rename = "prix_moyen", default)]
    pub average_price: Option<f64>,
    #[serde(rename = "saison", default)]
    pub season: Option<String>,
    #[serde(rename = "niveau_demande", default)]
    pub demand: Option<DemandLevel>,
    #[serde(rename = "startDate", default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(rename = "endDate", default)]
    pub valid_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(rename = "id_zone")]
    pub id: i64,
    #[serde(rename = "nom")]
    pub name: String,
    pub continent: String,
    #[serde(rename = "pays")]
    pub country: String,
    #[serde(rename = "ville")]
    pub city: String,
}
