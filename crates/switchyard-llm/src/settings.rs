use std::env;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl LlmSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let defaults = Self::default();

        let base_url = get("SWITCHYARD_LLM_BASE_URL")
            .or_else(|| get("OPENAI_BASE_URL"))
            .unwrap_or(defaults.base_url);
        let api_key = get("SWITCHYARD_LLM_API_KEY").or_else(|| get("OPENAI_API_KEY"));
        let model = get("SWITCHYARD_LLM_MODEL").unwrap_or(defaults.model);
        let temperature = get("SWITCHYARD_LLM_TEMPERATURE")
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(defaults.temperature);
        let max_output_tokens = get("SWITCHYARD_LLM_MAX_OUTPUT_TOKENS")
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(defaults.max_output_tokens);

        Self {
            base_url,
            api_key,
            model,
            temperature,
            max_output_tokens,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}
