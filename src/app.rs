//! Composition root.
//!
//! Every service is constructed here, explicitly, from one `AppConfig`; there
//! are no module-level backend singletons. The `App` is created once at
//! process start and disposed with `shutdown`.

use std::sync::Arc;

use crate::auth::AuthGateway;
use crate::chat::ChatChannel;
use crate::config::AppConfig;
use crate::credentials::CredentialStore;
use crate::generator::GeneratorClient;
use crate::records::RecordService;
use crate::store::{ConversationStore, MemoryStore, QuotationStore, RemoteStore};
use crate::types::Identity;

/// Role-specific entry screen chosen right after sign-in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entry {
    /// Conversation list across all clients.
    SupportDesk,
    /// Business description → proposal → quotation flow.
    MainFlow,
}

pub fn entry_for(identity: &Identity) -> Entry {
    if identity.role.is_support() {
        Entry::SupportDesk
    } else {
        Entry::MainFlow
    }
}

pub struct App {
    pub config: AppConfig,
    pub credentials: Arc<CredentialStore>,
    pub auth: AuthGateway,
    pub generator: GeneratorClient,
    pub chat: ChatChannel,
    pub records: RecordService,
    remote: Option<Arc<RemoteStore>>,
}

impl App {
    /// Full composition from the environment: remote store when configured,
    /// in-memory backend otherwise.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let http = reqwest::Client::new();
        let credentials = Arc::new(CredentialStore::open_default());
        let generator = GeneratorClient::from_env(&config)?;

        let (conversations, quotations, remote): (
            Arc<dyn ConversationStore>,
            Arc<dyn QuotationStore>,
            Option<Arc<RemoteStore>>,
        ) = match &config.store_endpoint {
            Some(endpoint) => {
                let store = Arc::new(RemoteStore::new(
                    http.clone(),
                    endpoint,
                    config.store_api_key.clone(),
                ));
                if let Some(ws_url) = &config.store_ws_endpoint {
                    store.connect_events(ws_url)?;
                }
                (
                    store.clone() as Arc<dyn ConversationStore>,
                    store.clone() as Arc<dyn QuotationStore>,
                    Some(store),
                )
            }
            None => {
                let store = Arc::new(MemoryStore::new());
                (
                    store.clone() as Arc<dyn ConversationStore>,
                    store as Arc<dyn QuotationStore>,
                    None,
                )
            }
        };

        let auth = AuthGateway::new(http, config.clone(), credentials.clone());

        Ok(Self {
            chat: ChatChannel::new(conversations),
            records: RecordService::new(quotations),
            auth,
            generator,
            config,
            credentials,
            remote,
        })
    }

    /// Composition over an injected in-process backend. Used by tests.
    pub fn with_store(
        config: AppConfig,
        store: Arc<MemoryStore>,
        generator: GeneratorClient,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        let http = reqwest::Client::new();
        let auth = AuthGateway::new(http, config.clone(), credentials.clone());
        Self {
            chat: ChatChannel::new(store.clone() as Arc<dyn ConversationStore>),
            records: RecordService::new(store as Arc<dyn QuotationStore>),
            auth,
            generator,
            config,
            credentials,
            remote: None,
        }
    }

    /// Releases background resources (the store's event listener). Live
    /// subscriptions cancel themselves on drop.
    pub fn shutdown(&self) {
        if let Some(remote) = &self.remote {
            remote.shutdown();
        }
    }
}
