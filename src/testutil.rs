//! Shared fixtures for unit tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::ai::message::ChatMessage;
use crate::ai::provider::{AiProvider, TokenUsage};
use crate::catalog::{CropProfile, SoilProfile, Zone};
use crate::error::AppError;
use crate::store::seed::SeedData;
use crate::store::InMemoryStore;

pub fn crop(id: i64, name: &str) -> CropProfile {
    CropProfile {
        id,
        name: name.to_string(),
        scientific_name: None,
        crop_type: "légume".to_string(),
        planting_season: None,
        water_need: "moyen".to_string(),
        drought_resistance: None,
        temperature_min: Some(10.0),
        temperature_max: Some(30.0),
        maturation_days: None,
        average_yield: None,
        description: None,
        color: "#00aa00".to_string(),
        image_url: None,
    }
}

pub fn soil(id: i64, ph: f64, humidity: f64, salinity: f64) -> SoilProfile {
    SoilProfile {
        id,
        name: format!("sol-{}", id),
        ph,
        humidity,
        salinity,
        texture: "limoneux".to_string(),
        organic_matter: None,
        drainage_capacity: None,
        description: None,
    }
}

pub fn zone(id: i64, name: &str) -> Zone {
    Zone {
        id,
        name: name.to_string(),
        continent: "Afrique".to_string(),
        country: "Sénégal".to_string(),
        city: "Thiès".to_string(),
    }
}

pub fn seed() -> SeedData {
    SeedData::from_json(include_str!("../data/seed.json")).expect("bundled seed parses")
}

pub fn seeded_store() -> InMemoryStore {
    InMemoryStore::new(seed())
}

/// Provider that replays a fixed reply and records the prompts it saw.
pub struct ScriptedProvider {
    reply: Result<String, String>,
    pub seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> String {
        self.seen
            .lock()
            .unwrap()
            .last()
            .and_then(|messages| messages.last())
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AiProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _max_tokens: Option<u32>,
    ) -> Result<(String, Option<TokenUsage>), AppError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        match &self.reply {
            Ok(text) => Ok((text.clone(), None)),
            Err(msg) => Err(AppError::AiProviderError(msg.clone())),
        }
    }
}
