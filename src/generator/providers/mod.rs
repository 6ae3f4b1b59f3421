mod custom;

use anyhow::Result;
use rig::providers;
use std::env;

pub use custom::CustomEndpointClient;

/// Enum to hold different provider clients
pub enum ProviderClient {
    Custom(CustomEndpointClient),
    Gemini(providers::gemini::Client),
    OpenAI(providers::openai::Client),
    Anthropic(providers::anthropic::Client),
    Ollama(providers::ollama::Client),
}

impl ProviderClient {
    /// Auto-detect and configure provider from environment variables
    pub fn from_env() -> Result<Self> {
        // Priority order:
        // 1. GENERATOR_ENDPOINT → custom HTTP endpoint
        // 2. GEMINI_API_KEY → Gemini
        // 3. OPENAI_API_KEY → OpenAI
        // 4. ANTHROPIC_API_KEY → Claude
        // 5. LLM_USE_OLLAMA=true → Ollama

        if let Ok(endpoint) = env::var("GENERATOR_ENDPOINT") {
            let model = env::var("GENERATOR_MODEL").ok();
            let api_key = env::var("GENERATOR_API_KEY").ok();
            return Ok(Self::Custom(CustomEndpointClient::new(
                endpoint, model, api_key,
            )));
        }

        if let Ok(key) = env::var("GEMINI_API_KEY") {
            return Ok(Self::Gemini(providers::gemini::Client::new(&key)));
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            return Ok(Self::OpenAI(providers::openai::Client::new(&key)));
        }

        if let Ok(key) = env::var("ANTHROPIC_API_KEY") {
            return Ok(Self::Anthropic(providers::anthropic::Client::new(&key)));
        }

        let use_ollama = env::var("LLM_USE_OLLAMA")
            .unwrap_or_else(|_| "false".into())
            .to_ascii_lowercase();

        if matches!(use_ollama.as_str(), "1" | "true" | "yes" | "on") {
            // Ollama endpoint is configured via OLLAMA_HOST environment variable
            // The Rig client reads this automatically (defaults to http://localhost:11434)
            return Ok(Self::Ollama(providers::ollama::Client::new()));
        }

        Err(anyhow::anyhow!(
            "No text-generation provider configured. Set GENERATOR_ENDPOINT, GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or LLM_USE_OLLAMA=true"
        ))
    }
}
