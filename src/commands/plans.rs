use crate::agent::persist::{self, SavePlanRequest, SaveResult};
use crate::agent::pipeline::{self, GenerationOptions, GenerationRequest};
use crate::agent::validate::ValidationReport;
use crate::ai::openai::OpenAiProvider;
use crate::ai::provider::AiProvider;
use crate::ai::registry;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::plan::PlanProposal;
use crate::state::AppState;

/// Create an AI provider based on the current configuration.
/// Every registered provider speaks the OpenAI chat-completions dialect.
pub fn create_provider(config: &AppConfig) -> Result<Box<dyn AiProvider>, AppError> {
    let info = registry::find_provider(&config.ai_provider).ok_or_else(|| {
        AppError::ConfigError(format!("Unknown AI provider: {}", config.ai_provider))
    })?;

    let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
    if info.requires_api_key && api_key.is_none() {
        return Err(AppError::AiProviderError(format!(
            "{} API key not set",
            info.display_name
        )));
    }

    let base_url = config.base_url.clone().unwrap_or(info.base_url);
    Ok(Box::new(
        OpenAiProvider::new(api_key, config.model.clone(), Some(base_url))
            .with_temperature(config.temperature)
            .with_referer(config.http_referer.clone())
            .with_json_mode(true),
    ))
}

/// Generate candidate plans for the request using the configured provider.
pub async fn generate_plans(
    state: &AppState,
    request: GenerationRequest,
) -> Result<ValidationReport, AppError> {
    let config = state.config_snapshot()?;
    let provider = create_provider(&config)?;
    let opts = GenerationOptions::from_config(&config);
    pipeline::generate(state.store.as_ref(), provider.as_ref(), &request, &opts).await
}

/// Persist the selected plan. Failures are reported in the result, not raised.
pub async fn save_plan(state: &AppState, request: SavePlanRequest) -> SaveResult {
    persist::persist_plan(state.store.as_ref(), &request).await.into()
}

pub async fn list_plans(state: &AppState) -> Result<Vec<PlanProposal>, AppError> {
    persist::list_plans(state.store.as_ref()).await
}

pub async fn get_plan(state: &AppState, plan_id: i64) -> Result<PlanProposal, AppError> {
    persist::load_plan(state.store.as_ref(), plan_id).await
}
