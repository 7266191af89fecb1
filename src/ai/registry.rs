use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
}

/// An OpenAI-compatible chat-completion provider the planner can call.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub id: String,
    pub display_name: String,
    pub requires_api_key: bool,
    pub base_url: String,
    pub models: Vec<ModelInfo>,
    pub allows_custom_model: bool,
}

fn model(id: &str, display_name: &str) -> ModelInfo {
    ModelInfo {
        id: id.to_string(),
        display_name: display_name.to_string(),
    }
}

pub fn get_provider_registry() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            id: "openrouter".to_string(),
            display_name: "OpenRouter".to_string(),
            requires_api_key: true,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            models: vec![
                model("deepseek/deepseek-r1-0528-qwen3-8b:free", "DeepSeek R1 Qwen3 8B (free)"),
                model("mistralai/mistral-small-3.2-24b-instruct:free", "Mistral Small 3.2 (free)"),
            ],
            allows_custom_model: true,
        },
        ProviderInfo {
            id: "openai".to_string(),
            display_name: "OpenAI".to_string(),
            requires_api_key: true,
            base_url: "https://api.openai.com/v1".to_string(),
            models: vec![model("gpt-4o-mini", "GPT-4o mini"), model("gpt-4.1", "GPT-4.1")],
            allows_custom_model: false,
        },
        ProviderInfo {
            id: "deepseek".to_string(),
            display_name: "DeepSeek".to_string(),
            requires_api_key: true,
            base_url: "https://api.deepseek.com/v1".to_string(),
            models: vec![
                model("deepseek-chat", "Chat V3"),
                model("deepseek-reasoner", "Reasoner R1"),
            ],
            allows_custom_model: false,
        },
        ProviderInfo {
            id: "ollama".to_string(),
            display_name: "Ollama".to_string(),
            requires_api_key: false,
            base_url: "http://localhost:11434/v1".to_string(),
            models: vec![],
            allows_custom_model: true,
        },
    ]
}

pub fn find_provider(id: &str) -> Option<ProviderInfo> {
    get_provider_registry().into_iter().find(|p| p.id == id)
}
