//! Plan proposals and parcels, serialized with the storage column names
//! the rendering layer reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{CropProfile, FALLBACK_COLOR};
use crate::error::AppError;

pub const DEFAULT_UNIT: &str = "m";
pub const DEFAULT_SHAPE: &str = "rectangle";
pub const UNKNOWN_CROP_NAME: &str = "Unknown";

/// Plot size a plan is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    pub width: f64,
    pub height: f64,
    pub area: f64,
}

impl Terrain {
    /// Validate dimensions. `area` defaults to `width * height`.
    pub fn new(width: f64, height: f64, area: Option<f64>) -> Result<Self, AppError> {
        for (label, value) in [("width", width), ("height", height)] {
            if !value.is_finite() || value < 1.0 {
                return Err(AppError::InvalidInput(format!(
                    "terrain {} must be at least 1, got {}",
                    label, value
                )));
            }
        }
        let area = match area {
            Some(a) if a.is_finite() && a > 0.0 => a,
            Some(a) => {
                return Err(AppError::InvalidInput(format!(
                    "terrain area must be positive, got {}",
                    a
                )))
            }
            None => width * height,
        };
        Ok(Self { width, height, area })
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
            unit: DEFAULT_UNIT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub unit: String,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            unit: DEFAULT_UNIT.to_string(),
        }
    }
}

/// Rendering hints stored in the parcel `proprietes` blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelProperties {
    #[serde(rename = "couleur")]
    pub color: String,
    #[serde(rename = "forme")]
    pub shape: String,
    pub grid_x: f64,
    pub grid_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ParcelProperties {
    fn default() -> Self {
        Self {
            color: FALLBACK_COLOR.to_string(),
            shape: DEFAULT_SHAPE.to_string(),
            grid_x: 0.0,
            grid_y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Crop display metadata copied onto each parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropSnapshot {
    #[serde(rename = "id_culture")]
    pub id: i64,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "couleur")]
    pub color: String,
    #[serde(rename = "type_culture")]
    pub crop_type: String,
    #[serde(rename = "besoin_eau")]
    pub water_need: Option<String>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
}

impl CropSnapshot {
    pub fn from_crop(crop: &CropProfile) -> Self {
        Self {
            id: crop.id,
            name: crop.name.clone(),
            color: crop.color.clone(),
            crop_type: crop.crop_type.clone(),
            water_need: Some(crop.water_need.clone()),
            temperature_min: crop.temperature_min,
            temperature_max: crop.temperature_max,
        }
    }

    pub fn unknown(id: i64) -> Self {
        Self {
            id,
            name: UNKNOWN_CROP_NAME.to_string(),
            color: FALLBACK_COLOR.to_string(),
            crop_type: UNKNOWN_CROP_NAME.to_string(),
            water_need: None,
            temperature_min: None,
            temperature_max: None,
        }
    }
}

/// GeoJSON `Polygon` in terrain-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonPolygon {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl GeoJsonPolygon {
    /// Closed ring around `(x, y)`..`(x + width, y + height)`.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            kind: "Polygon".to_string(),
            coordinates: vec![vec![
                [x, y],
                [x + width, y],
                [x + width, y + height],
                [x, y + height],
                [x, y],
            ]],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.kind == "Polygon"
            && !self.coordinates.is_empty()
            && self.coordinates.iter().all(|ring| ring.len() >= 4)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    #[serde(rename = "id_parcelle")]
    pub id: String,
    #[serde(rename = "id_plan")]
    pub plan_id: i64,
    #[serde(rename = "id_zone")]
    pub zone_id: i64,
    #[serde(rename = "id_culture")]
    pub crop_id: i64,
    #[serde(rename = "pourcentage")]
    pub percentage: f64,
    #[serde(rename = "proprietes")]
    pub properties: ParcelProperties,
    #[serde(rename = "culture")]
    pub crop: CropSnapshot,
    #[serde(rename = "geometrie", default)]
    pub geometry: Option<GeoJsonPolygon>,
}

impl Parcel {
    /// Stored geometry when valid, otherwise the grid rectangle.
    pub fn footprint(&self) -> GeoJsonPolygon {
        match &self.geometry {
            Some(g) if g.is_valid() => g.clone(),
            _ => GeoJsonPolygon::rectangle(
                self.properties.grid_x,
                self.properties.grid_y,
                self.properties.width,
                self.properties.height,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanProposal {
    #[serde(rename = "id_plan")]
    pub id: i64,
    #[serde(rename = "nom")]
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "analyses")]
    pub analysis: Option<String>,
    #[serde(rename = "superficie")]
    pub area: f64,
    pub dimensions: Dimensions,
    #[serde(rename = "profit_estime")]
    pub estimated_profit: f64,
    #[serde(rename = "niveau_risque")]
    pub risk_level: u8,
    #[serde(rename = "date_creation")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "parcelles")]
    pub parcels: Vec<Parcel>,
}

impl PlanProposal {
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    pub fn percentage_total(&self) -> f64 {
        self.parcels.iter().map(|p| p.percentage).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_area_defaults_to_product() {
        let terrain = Terrain::new(10.0, 5.0, None).unwrap();
        assert_eq!(terrain.area, 50.0);
        assert_eq!(terrain.dimensions().unit, "m");
    }

    #[test]
    fn test_terrain_rejects_degenerate_sizes() {
        assert!(matches!(Terrain::new(0.0, 5.0, None), Err(AppError::InvalidInput(_))));
        assert!(matches!(Terrain::new(10.0, f64::INFINITY, None), Err(AppError::InvalidInput(_))));
        assert!(matches!(Terrain::new(10.0, 5.0, Some(-1.0)), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_rectangle_ring_is_closed() {
        let poly = GeoJsonPolygon::rectangle(6.0, 0.0, 4.0, 5.0);
        let ring = &poly.coordinates[0];
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring[2], [10.0, 5.0]);
        assert!(poly.is_valid());
    }

    #[test]
    fn test_footprint_falls_back_to_grid() {
        let parcel = Parcel {
            id: "temp_1".into(),
            plan_id: 0,
            zone_id: 1,
            crop_id: 3,
            percentage: 50.0,
            properties: ParcelProperties {
                grid_x: 2.0,
                grid_y: 1.0,
                width: 3.0,
                height: 2.0,
                ..ParcelProperties::default()
            },
            crop: CropSnapshot::unknown(3),
            geometry: Some(GeoJsonPolygon {
                kind: "Point".into(),
                coordinates: vec![],
            }),
        };
        assert_eq!(parcel.footprint(), GeoJsonPolygon::rectangle(2.0, 1.0, 3.0, 2.0));
    }

    #[test]
    fn test_proposal_wire_names() {
        let plan = PlanProposal {
            id: 0,
            name: "Plan Rendement".into(),
            description: None,
            analysis: Some("ok".into()),
            area: 50.0,
            dimensions: Dimensions {
                width: 10.0,
                height: 5.0,
                unit: "m".into(),
            },
            estimated_profit: 1200.0,
            risk_level: 3,
            created_at: Utc::now(),
            parcels: vec![],
        };
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["nom"], "Plan Rendement");
        assert_eq!(value["analyses"], "ok");
        assert_eq!(value["niveau_risque"], 3);
        assert_eq!(value["dimensions"]["unit"], "m");
        assert!(!plan.is_persisted());
    }
}
