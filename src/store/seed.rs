use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{CropProfile, CropSoilAffinity, MarketQuote, SoilProfile, Zone};
use crate::error::AppError;

/// Reference tables keyed by their storage names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub sols: Vec<SoilProfile>,
    #[serde(default)]
    pub cultures: Vec<CropProfile>,
    #[serde(default)]
    pub culture_sol: Vec<CropSoilAffinity>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub culture_marches: Vec<MarketQuote>,
}

impl SeedData {
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let seed: SeedData = serde_json::from_str(raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid seed data: {}", e)))?;
        seed.check_unique_ids()?;
        Ok(seed)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| match e {
            AppError::ConfigError(msg) => {
                AppError::ConfigError(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    fn check_unique_ids(&self) -> Result<(), AppError> {
        check_unique("sols", self.sols.iter().map(|s| s.id))?;
        check_unique("cultures", self.cultures.iter().map(|c| c.id))?;
        check_unique("zones", self.zones.iter().map(|z| z.id))?;
        Ok(())
    }
}

fn check_unique(table: &str, ids: impl Iterator<Item = i64>) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::ConfigError(format!(
                "duplicate id {} in {}",
                id, table
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tables_default_to_empty() {
        let seed = SeedData::from_json(r#"{"zones":[{"id_zone":1,"nom":"Sahel","continent":"Afrique","pays":"Sénégal","ville":"Thiès"}]}"#).unwrap();
        assert_eq!(seed.zones.len(), 1);
        assert!(seed.sols.is_empty());
        assert!(seed.culture_marches.is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let raw = r#"{"sols":[
            {"id_sol":1,"nom":"a","ph":6.0,"humidite":30,"salinite":1,"texture":"sableux"},
            {"id_sol":1,"nom":"b","ph":7.0,"humidite":40,"salinite":2,"texture":"argileux"}
        ]}"#;
        let err = SeedData::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate id 1 in sols"));
    }

    #[test]
    fn test_bundled_seed_parses() {
        let raw = include_str!("../../data/seed.json");
        let seed = SeedData::from_json(raw).unwrap();
        assert!(!seed.sols.is_empty());
        assert!(!seed.cultures.is_empty());
        assert!(!seed.culture_sol.is_empty());
    }
}
