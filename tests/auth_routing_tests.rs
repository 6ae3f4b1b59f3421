//! Sign-in routing: the reserved support account lands on the conversation
//! list, everyone else on the main flow, and the credential store tracks the
//! session either way. Only the offline paths are exercised here; provider
//! round-trips stay external.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use dealdesk::app::{App, Entry, entry_for};
use dealdesk::auth::AuthError;
use dealdesk::config::AppConfig;
use dealdesk::credentials::CredentialStore;
use dealdesk::generator::{CustomEndpointClient, GeneratorClient, ProviderClient};
use dealdesk::store::MemoryStore;
use dealdesk::types::{Identity, Role};

fn support_config() -> AppConfig {
    AppConfig {
        support_password: Some("support123".to_string()),
        ..AppConfig::default()
    }
}

fn temp_credentials(tag: &str) -> Arc<CredentialStore> {
    let dir = std::env::temp_dir().join(format!("dealdesk-auth-{tag}"));
    let _ = fs::remove_dir_all(&dir);
    Arc::new(CredentialStore::at(dir))
}

/// Full composition over the in-memory backend. The generator points at a
/// dead endpoint; none of these tests reach it.
fn test_app(tag: &str) -> (App, Arc<CredentialStore>) {
    let credentials = temp_credentials(tag);
    let generator = GeneratorClient::new(
        ProviderClient::Custom(CustomEndpointClient::new(
            "http://127.0.0.1:9".to_string(),
            None,
            None,
        )),
        Duration::from_secs(1),
        0,
    );
    let app = App::with_store(
        support_config(),
        Arc::new(MemoryStore::new()),
        generator,
        credentials.clone(),
    );
    (app, credentials)
}

#[tokio::test]
async fn support_sign_in_routes_to_the_conversation_list() {
    let (app, credentials) = test_app("support-ok");

    let identity = app
        .auth
        .sign_in("support@abc.com", "support123")
        .await
        .unwrap();

    assert_eq!(identity.role, Role::Support);
    assert_eq!(entry_for(&identity), Entry::SupportDesk);

    // The session is cached for the next start.
    let cached = credentials.load(&app.config).unwrap();
    assert_eq!(cached.email, "support@abc.com");
    assert_eq!(cached.role, Role::Support);
}

#[tokio::test]
async fn support_sign_in_with_wrong_password_fails() {
    let (app, credentials) = test_app("support-bad");

    let err = app
        .auth
        .sign_in("support@abc.com", "not-the-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(credentials.load(&app.config).is_none());
}

#[tokio::test]
async fn support_address_matching_ignores_case() {
    let (app, _credentials) = test_app("support-case");

    let identity = app
        .auth
        .sign_in("Support@ABC.com", "support123")
        .await
        .unwrap();
    assert_eq!(identity.role, Role::Support);
}

#[tokio::test]
async fn client_identity_routes_to_the_main_flow_and_is_cached() {
    let credentials = temp_credentials("client-route");
    let identity = Identity {
        id: "uid-42".to_string(),
        email: "owner@soapworks.example".to_string(),
        role: Role::Client,
    };
    credentials.save(&identity).unwrap();

    let cached = credentials.load(&support_config()).unwrap();
    assert_eq!(cached.id, "uid-42");
    assert_eq!(cached.email, "owner@soapworks.example");
    assert_eq!(entry_for(&cached), Entry::MainFlow);
}

#[tokio::test]
async fn sign_out_clears_the_cached_identity() {
    let (app, credentials) = test_app("sign-out");

    app.auth
        .sign_in("support@abc.com", "support123")
        .await
        .unwrap();
    assert!(credentials.load(&app.config).is_some());

    app.auth.sign_out();
    assert!(credentials.load(&app.config).is_none());
}
