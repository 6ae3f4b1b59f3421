use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Client for a custom text-generation HTTP endpoint
pub struct CustomEndpointClient {
    client: reqwest::Client,
    endpoint: String,
    model: Option<String>,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct PromptMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<PromptMessage<'a>>,
}

// Endpoint response types
#[derive(Deserialize)]
struct WireMessage {
    content: String,
}

#[derive(Deserialize)]
struct WireChoice {
    message: Option<WireMessage>,
}

#[derive(Deserialize)]
struct ResponseOpenAIShape {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct ResponseContentOnly {
    content: String,
}

impl CustomEndpointClient {
    pub fn new(endpoint: String, model: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
            api_key,
        }
    }

    pub async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let mut request = self.client.post(&self.endpoint).json(&GenerationRequest {
            model: self.model.as_deref(),
            messages: vec![
                PromptMessage {
                    role: "system",
                    content: system,
                },
                PromptMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        });

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "generation endpoint error {}: {}",
                status,
                body
            ));
        }

        // Try OpenAI-shaped response first
        if let Ok(parsed) = serde_json::from_str::<ResponseOpenAIShape>(&body)
            && let Some(choice) = parsed.choices.into_iter().next()
            && let Some(msg) = choice.message
        {
            return Ok(msg.content);
        }

        // Try content-only response
        if let Ok(parsed) = serde_json::from_str::<ResponseContentOnly>(&body) {
            return Ok(parsed.content);
        }

        // Fallback to raw body
        Ok(body)
    }
}
