//! Backing stores for conversations and quotation records.
//!
//! Two implementations behind the same trait seams: an in-process store used
//! by tests and local runs, and a REST client over the managed backend with a
//! websocket change feed.

mod memory;
mod remote;

pub use memory::MemoryStore;
pub use remote::RemoteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{ClientDetails, ConversationSummary, Message, QuotationRecord, Quotation, Role};

/// Common error type for both backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),

    #[error("store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

/// Message as handed to the store. Id and timestamp are assigned server-side.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    pub text: String,
    pub sender_id: String,
    pub sender_email: String,
    pub sender_role: Role,
}

/// Quotation record as handed to the store, before id and timestamp exist.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationDraft {
    pub owner_id: String,
    pub business: String,
    pub quotation: Quotation,
    pub client_details: ClientDetails,
}

/// Change notification fanned out to live subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreEvent {
    MessageAppended { conversation_id: String },
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends a message, assigning its id and server timestamp. The
    /// conversation is created implicitly on first append.
    async fn append(
        &self,
        conversation_id: &str,
        draft: MessageDraft,
    ) -> Result<Message, StoreError>;

    /// Full message set for one conversation. Delivery order is whatever the
    /// backend returns; callers re-sort by timestamp.
    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError>;

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, StoreError>;

    /// Live change feed. Receivers see every event from subscription time on.
    fn events(&self) -> broadcast::Receiver<StoreEvent>;
}

#[async_trait]
pub trait QuotationStore: Send + Sync {
    async fn add(&self, draft: QuotationDraft) -> Result<QuotationRecord, StoreError>;

    async fn mark_accepted(&self, id: &str) -> Result<(), StoreError>;

    async fn record(&self, id: &str) -> Result<QuotationRecord, StoreError>;

    async fn accepted_for(&self, owner_id: &str) -> Result<Vec<QuotationRecord>, StoreError>;
}
