use std::env;
use std::time::Duration;

use rig::client::CompletionClient;
use rig::completion::Prompt;

use super::providers::ProviderClient;
use crate::config::AppConfig;
use crate::types::{ClientDetails, Proposal, Quotation};

// ============================================
// Error Types
// ============================================

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("business description is empty")]
    EmptyInput,

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation endpoint error: {0}")]
    Endpoint(String),
}

const PROPOSAL_SYSTEM_PROMPT: &str = r#"You are a senior business consultant writing on behalf of a professional services company.

Given a description of a prospective client's business, write a tailored business proposal covering their needs, the recommended services, and expected outcomes.

When responding:
- Open with a short executive summary
- Use section headers wrapped in ** markers on their own line
- Separate sections with a blank line
- Use * for bullet points inside a section
- Keep the tone formal and client-ready"#;

const QUOTATION_SYSTEM_PROMPT: &str = r#"You are a senior business consultant preparing a priced quotation.

Given a description of a prospective client's business and their contact details, produce an itemized quotation: the recommended services, a price for each line item, and a total.

When responding:
- List each service with its price on its own line
- Separate sections with a blank line
- End with a clearly marked total
- Keep the tone formal and client-ready"#;

/// Client for the text-generation backend. Every call is bounded by a timeout
/// and retried a fixed number of times; a hung endpoint surfaces as
/// `GeneratorError::Timeout` instead of an indefinite loading state.
pub struct GeneratorClient {
    provider: ProviderClient,
    timeout: Duration,
    retries: u32,
}

impl GeneratorClient {
    pub fn new(provider: ProviderClient, timeout: Duration, retries: u32) -> Self {
        Self {
            provider,
            timeout,
            retries,
        }
    }

    /// Provider from environment configuration, call budget from `config`.
    pub fn from_env(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            ProviderClient::from_env()?,
            config.generator_timeout,
            config.generator_retries,
        ))
    }

    /// One proposal per business description. Blank input is rejected before
    /// any request is made.
    pub async fn generate_proposal(&self, business: &str) -> Result<Proposal, GeneratorError> {
        let business = business.trim();
        if business.is_empty() {
            return Err(GeneratorError::EmptyInput);
        }
        let raw_content = self
            .complete_bounded(PROPOSAL_SYSTEM_PROMPT, &proposal_prompt(business))
            .await?;
        Ok(Proposal { raw_content })
    }

    pub async fn generate_quotation(
        &self,
        business: &str,
        details: &ClientDetails,
    ) -> Result<Quotation, GeneratorError> {
        let business = business.trim();
        if business.is_empty() {
            return Err(GeneratorError::EmptyInput);
        }
        let raw_content = self
            .complete_bounded(QUOTATION_SYSTEM_PROMPT, &quotation_prompt(business, details))
            .await?;
        Ok(Quotation { raw_content })
    }

    async fn complete_bounded(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, GeneratorError> {
        let attempts = self.retries + 1;
        let mut last = GeneratorError::Timeout(self.timeout);
        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, self.complete(system, prompt)).await {
                Ok(Ok(content)) if !content.trim().is_empty() => return Ok(content),
                Ok(Ok(_)) => last = GeneratorError::Endpoint("empty completion".to_string()),
                Ok(Err(err)) => last = GeneratorError::Endpoint(err.to_string()),
                Err(_) => last = GeneratorError::Timeout(self.timeout),
            }
            if attempt < attempts {
                tracing::warn!(attempt, error = %last, "generation attempt failed, retrying");
            }
        }
        Err(last)
    }

    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        match &self.provider {
            ProviderClient::Custom(client) => client.complete(system, prompt).await,
            ProviderClient::Gemini(client) => {
                let model =
                    env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

                let agent = client
                    .agent(&model)
                    .preamble(system)
                    .max_tokens(4096)
                    .temperature(0.7)
                    .build();

                Ok(agent.prompt(prompt).await?)
            }
            ProviderClient::OpenAI(client) => {
                let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());

                let agent = client
                    .agent(&model)
                    .preamble(system)
                    .max_tokens(4096)
                    .temperature(0.7)
                    .build();

                Ok(agent.prompt(prompt).await?)
            }
            ProviderClient::Anthropic(client) => {
                let model = env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| "claude-3-5-sonnet-20241022".to_string());

                let agent = client
                    .agent(&model)
                    .preamble(system)
                    .max_tokens(4096)
                    .temperature(0.7)
                    .build();

                Ok(agent.prompt(prompt).await?)
            }
            ProviderClient::Ollama(client) => {
                let model = env::var("LLM_MODEL").unwrap_or_else(|_| "llama3.1:latest".to_string());

                let agent = client.agent(&model).preamble(system).build();

                Ok(agent.prompt(prompt).await?)
            }
        }
    }
}

fn proposal_prompt(business: &str) -> String {
    format!(
        "The prospective client describes their business as follows:\n\n{business}\n\nWrite the business proposal."
    )
}

fn quotation_prompt(business: &str, details: &ClientDetails) -> String {
    let mut prompt = format!(
        "The prospective client describes their business as follows:\n\n{business}\n"
    );
    let fields = [
        ("Client name", &details.client_name),
        ("Company name", &details.company_name),
        ("Address", &details.address),
        ("Phone number", &details.phone_number),
        ("Email", &details.email),
    ];
    let filled: Vec<_> = fields
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect();
    if !filled.is_empty() {
        prompt.push_str("\nClient details:\n");
        for (label, value) in filled {
            prompt.push_str(&format!("- {label}: {}\n", value.trim()));
        }
    }
    prompt.push_str("\nWrite the quotation.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::providers::CustomEndpointClient;

    fn unreachable_client() -> GeneratorClient {
        // Never contacted in these tests; input validation happens first.
        let provider = ProviderClient::Custom(CustomEndpointClient::new(
            "http://127.0.0.1:9".to_string(),
            None,
            None,
        ));
        GeneratorClient::new(provider, Duration::from_secs(1), 0)
    }

    #[tokio::test]
    async fn blank_business_is_rejected_before_any_request() {
        let client = unreachable_client();
        assert!(matches!(
            client.generate_proposal("   ").await,
            Err(GeneratorError::EmptyInput)
        ));
        assert!(matches!(
            client
                .generate_quotation("\n\t", &ClientDetails::default())
                .await,
            Err(GeneratorError::EmptyInput)
        ));
    }

    #[test]
    fn quotation_prompt_carries_filled_details_only() {
        let details = ClientDetails {
            client_name: "Ada Patel".to_string(),
            company_name: "Soapworks Ltd".to_string(),
            address: String::new(),
            phone_number: String::new(),
            email: "ada@soapworks.example".to_string(),
        };
        let prompt = quotation_prompt("We sell handmade soap", &details);
        assert!(prompt.contains("We sell handmade soap"));
        assert!(prompt.contains("Soapworks Ltd"));
        assert!(prompt.contains("ada@soapworks.example"));
        assert!(!prompt.contains("Address:"));
        assert!(!prompt.contains("Phone number:"));
    }

    #[test]
    fn proposal_prompt_carries_business_description() {
        let prompt = proposal_prompt("We sell handmade soap");
        assert!(prompt.contains("We sell handmade soap"));
    }
}
