use std::collections::BTreeMap;
use std::sync::Mutex;

use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{
    ConversationStore, MessageDraft, QuotationDraft, QuotationStore, StoreError, StoreEvent,
};
use crate::types::{ConversationSummary, Message, QuotationRecord};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// In-process backend. Timestamps are server-assigned and strictly monotonic
/// across the whole store, so tie-breaks reduce to assignment order.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    events: broadcast::Sender<StoreEvent>,
}

struct Inner {
    conversations: BTreeMap<String, Vec<Message>>,
    quotations: BTreeMap<String, QuotationRecord>,
    last_timestamp: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                conversations: BTreeMap::new(),
                quotations: BTreeMap::new(),
                last_timestamp: 0,
            }),
            events,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store poisoned")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn next_timestamp(&mut self) -> i64 {
        let now = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
        self.last_timestamp = now.max(self.last_timestamp + 1);
        self.last_timestamp
    }
}

#[async_trait::async_trait]
impl ConversationStore for MemoryStore {
    async fn append(
        &self,
        conversation_id: &str,
        draft: MessageDraft,
    ) -> Result<Message, StoreError> {
        let message = {
            let mut inner = self.lock();
            let timestamp = inner.next_timestamp();
            let message = Message {
                id: Uuid::new_v4().to_string(),
                text: draft.text,
                sender_id: draft.sender_id,
                sender_email: draft.sender_email,
                sender_role: draft.sender_role,
                timestamp,
            };
            inner
                .conversations
                .entry(conversation_id.to_string())
                .or_default()
                .push(message.clone());
            message
        };
        // Nobody listening is fine.
        let _ = self.events.send(StoreEvent::MessageAppended {
            conversation_id: conversation_id.to_string(),
        });
        Ok(message)
    }

    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .lock()
            .conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, StoreError> {
        Ok(self
            .lock()
            .conversations
            .iter()
            .map(|(id, messages)| ConversationSummary {
                id: id.clone(),
                last_message: messages.last().cloned(),
            })
            .collect())
    }

    fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[async_trait::async_trait]
impl QuotationStore for MemoryStore {
    async fn add(&self, draft: QuotationDraft) -> Result<QuotationRecord, StoreError> {
        let mut inner = self.lock();
        let timestamp = inner.next_timestamp();
        let record = QuotationRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: draft.owner_id,
            business: draft.business,
            quotation: draft.quotation,
            client_details: draft.client_details,
            timestamp,
            accepted: false,
            accepted_at: None,
        };
        inner.quotations.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn mark_accepted(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let accepted_at = inner.next_timestamp();
        let record = inner
            .quotations
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("quotation {id}")))?;
        record.accepted = true;
        record.accepted_at = Some(accepted_at);
        Ok(())
    }

    async fn record(&self, id: &str) -> Result<QuotationRecord, StoreError> {
        self.lock()
            .quotations
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("quotation {id}")))
    }

    async fn accepted_for(&self, owner_id: &str) -> Result<Vec<QuotationRecord>, StoreError> {
        Ok(self
            .lock()
            .quotations
            .values()
            .filter(|record| record.accepted && record.owner_id == owner_id)
            .cloned()
            .collect())
    }
}
