use std::env;
use std::time::Duration;

/// Reserved support account. Sign-ins with this address are routed to the
/// support desk instead of the client flow.
pub const DEFAULT_SUPPORT_EMAIL: &str = "support@abc.com";

const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_COMPANY_NAME: &str = "Cehpoint E-Learning & Cyber Security Solutions";
const DEFAULT_COMPANY_TAGLINE: &str = "A Secure Choice for Your Career and Our World";
const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GENERATOR_RETRIES: u32 = 1;

/// Runtime configuration, read once at startup. Values come from the process
/// environment; `main` loads `.env` (or the bundled `assets/config.env`)
/// before this is constructed.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Identity provider REST base URL.
    pub identity_endpoint: String,
    /// API key appended to identity provider requests.
    pub identity_api_key: Option<String>,
    /// Document store REST base URL. Absent means the in-memory backend.
    pub store_endpoint: Option<String>,
    /// Websocket URL for the store's change feed.
    pub store_ws_endpoint: Option<String>,
    /// Bearer token for store requests.
    pub store_api_key: Option<String>,
    pub support_email: String,
    /// Designated password for the reserved support account.
    pub support_password: Option<String>,
    pub company_name: String,
    pub company_tagline: String,
    pub generator_timeout: Duration,
    pub generator_retries: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            identity_endpoint: env::var("IDENTITY_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_ENDPOINT.to_string()),
            identity_api_key: env::var("IDENTITY_API_KEY").ok(),
            store_endpoint: env::var("STORE_ENDPOINT").ok(),
            store_ws_endpoint: env::var("STORE_WS_ENDPOINT").ok(),
            store_api_key: env::var("STORE_API_KEY").ok(),
            support_email: env::var("SUPPORT_EMAIL")
                .unwrap_or_else(|_| DEFAULT_SUPPORT_EMAIL.to_string()),
            support_password: env::var("SUPPORT_PASSWORD").ok(),
            company_name: env::var("COMPANY_NAME")
                .unwrap_or_else(|_| DEFAULT_COMPANY_NAME.to_string()),
            company_tagline: env::var("COMPANY_TAGLINE")
                .unwrap_or_else(|_| DEFAULT_COMPANY_TAGLINE.to_string()),
            generator_timeout: Duration::from_secs(parse_or(
                env::var("GENERATOR_TIMEOUT_SECS").ok(),
                DEFAULT_GENERATOR_TIMEOUT_SECS,
            )),
            generator_retries: parse_or(
                env::var("GENERATOR_RETRIES").ok(),
                DEFAULT_GENERATOR_RETRIES,
            ),
        }
    }

    /// True when the address matches the reserved support account,
    /// case-insensitively.
    pub fn is_support_email(&self, email: &str) -> bool {
        email.trim().eq_ignore_ascii_case(&self.support_email)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            identity_endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            identity_api_key: None,
            store_endpoint: None,
            store_ws_endpoint: None,
            store_api_key: None,
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            support_password: None,
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            company_tagline: DEFAULT_COMPANY_TAGLINE.to_string(),
            generator_timeout: Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS),
            generator_retries: DEFAULT_GENERATOR_RETRIES,
        }
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, fallback: T) -> T {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or(fallback)
}
