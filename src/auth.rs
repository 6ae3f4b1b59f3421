//! Auth gateway.
//!
//! Wraps the identity provider's REST API for email/password and Google
//! id-token sign-in. The role is decided here, once, at sign-in time: the
//! reserved support address gets `Role::Support`, everyone else
//! `Role::Client`. On success the identity is written to the credential
//! store so later sessions can recover it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::types::{Identity, Role};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    AccountExists,

    #[error("password is too weak: {0}")]
    WeakPassword(String),

    #[error("identity provider error {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct AuthGateway {
    http: reqwest::Client,
    config: AppConfig,
    credentials: Arc<CredentialStore>,
}

impl AuthGateway {
    pub fn new(
        http: reqwest::Client,
        config: AppConfig,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            http,
            config,
            credentials,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        // The reserved support account never reaches the provider; it is a
        // designated static credential.
        if self.config.is_support_email(email) {
            return self.sign_in_support(password);
        }

        let response = self
            .account_request(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.admit(response.local_id, response.email.unwrap_or_else(|| email.to_string())))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let response = self
            .account_request(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.admit(response.local_id, response.email.unwrap_or_else(|| email.to_string())))
    }

    /// Exchanges a Google id token (obtained by the platform sign-in SDK,
    /// which stays outside this crate) for a provider identity.
    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<Identity, AuthError> {
        let response = self
            .account_request(
                "signInWithIdp",
                &IdpRequest {
                    post_body: format!("id_token={id_token}&providerId=google.com"),
                    request_uri: "http://localhost",
                    return_secure_token: true,
                },
            )
            .await?;
        let email = response.email.unwrap_or_default();
        Ok(self.admit(response.local_id, email))
    }

    /// Ends the session. The cached identity is cleared; a failure to clear
    /// is logged, not surfaced, since the session itself is already over.
    pub fn sign_out(&self) {
        if let Err(err) = self.credentials.clear() {
            tracing::warn!(error = %err, "failed to clear cached credentials");
        }
    }

    fn sign_in_support(&self, password: &str) -> Result<Identity, AuthError> {
        match &self.config.support_password {
            Some(expected) if expected == password => {
                let identity = Identity {
                    id: "support".to_string(),
                    email: self.config.support_email.clone(),
                    role: Role::Support,
                };
                self.persist(&identity);
                Ok(identity)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn admit(&self, id: String, email: String) -> Identity {
        let role = if self.config.is_support_email(&email) {
            Role::Support
        } else {
            Role::Client
        };
        let identity = Identity { id, email, role };
        self.persist(&identity);
        identity
    }

    fn persist(&self, identity: &Identity) {
        if let Err(err) = self.credentials.save(identity) {
            tracing::warn!(error = %err, "failed to cache credentials");
        }
    }

    async fn account_request<B: Serialize>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<AccountResponse, AuthError> {
        let mut url = format!(
            "{}/v1/accounts:{action}",
            self.config.identity_endpoint.trim_end_matches('/')
        );
        if let Some(key) = &self.config.identity_api_key {
            url.push_str(&format!("?key={key}"));
        }

        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|err| AuthError::Provider {
                status: status.as_u16(),
                message: err.to_string(),
            })
        } else {
            Err(classify_failure(status.as_u16(), &text))
        }
    }
}

fn classify_failure(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.to_string());

    match message.as_str() {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            AuthError::InvalidCredentials
        }
        "EMAIL_EXISTS" => AuthError::AccountExists,
        _ if message.starts_with("WEAK_PASSWORD") => AuthError::WeakPassword(
            message
                .split_once(':')
                .map(|(_, detail)| detail.trim().to_string())
                .unwrap_or(message.clone()),
        ),
        _ => AuthError::Provider { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_provider_failures() {
        let body = r#"{"error":{"message":"EMAIL_NOT_FOUND","code":400}}"#;
        assert!(matches!(
            classify_failure(400, body),
            AuthError::InvalidCredentials
        ));

        let body = r#"{"error":{"message":"EMAIL_EXISTS","code":400}}"#;
        assert!(matches!(classify_failure(400, body), AuthError::AccountExists));

        let body =
            r#"{"error":{"message":"WEAK_PASSWORD : Password should be at least 6 characters","code":400}}"#;
        match classify_failure(400, body) {
            AuthError::WeakPassword(detail) => {
                assert!(detail.contains("at least 6 characters"));
            }
            other => panic!("expected WeakPassword, got {other:?}"),
        }

        assert!(matches!(
            classify_failure(500, "gateway exploded"),
            AuthError::Provider { status: 500, .. }
        ));
    }
}
