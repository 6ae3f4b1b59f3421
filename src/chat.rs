//! Chat/support channel.
//!
//! One conversation per client, keyed by the client's user id; the support
//! role sees every conversation. Subscriptions are explicit handles whose
//! emissions are always the full, re-sorted message set for the conversation,
//! and which stop their background work on `cancel` or drop.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::store::{ConversationStore, MessageDraft, StoreError, StoreEvent};
use crate::types::{ConversationSummary, Identity, Message};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Live view onto store state. The first `recv` yields the current snapshot,
/// later ones wait for a change; `cancel` (or drop) releases the background
/// refresh task so nothing keeps polling after the consumer is gone.
pub struct Live<T> {
    rx: watch::Receiver<T>,
    task: JoinHandle<()>,
    delivered_initial: bool,
}

pub type Subscription = Live<Vec<Message>>;
pub type ConversationFeed = Live<Vec<ConversationSummary>>;

impl<T: Clone> Live<T> {
    pub async fn recv(&mut self) -> Option<T> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Latest snapshot without waiting.
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl<T> Drop for Live<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct ChatChannel {
    store: Arc<dyn ConversationStore>,
}

impl ChatChannel {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// A client's conversation id is their user id. Created implicitly in the
    /// store on first send.
    pub fn conversation_id_for(identity: &Identity) -> &str {
        &identity.id
    }

    /// Appends a message. The input field is cleared by the caller before the
    /// round-trip resolves; the store assigns id and timestamp.
    pub async fn send(
        &self,
        conversation_id: &str,
        text: &str,
        sender: &Identity,
    ) -> ChatResult<()> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.store
            .append(
                conversation_id,
                MessageDraft {
                    text: trimmed.to_string(),
                    sender_id: sender.id.clone(),
                    sender_email: sender.email.clone(),
                    sender_role: sender.role,
                },
            )
            .await?;
        Ok(())
    }

    /// Live, ordered message feed for one conversation.
    pub async fn subscribe(&self, conversation_id: &str) -> ChatResult<Subscription> {
        // Take the event feed before the initial fetch so appends landing in
        // between still trigger a refresh.
        let mut events = self.store.events();
        let initial = order_messages(self.store.messages(conversation_id).await?);
        let (tx, rx) = watch::channel(initial);

        let store = self.store.clone();
        let id = conversation_id.to_string();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(StoreEvent::MessageAppended { conversation_id }) => {
                        if conversation_id != id {
                            continue;
                        }
                    }
                    // Missed events are covered by the refetch below.
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                match store.messages(&id).await {
                    Ok(messages) => {
                        if tx.send(order_messages(messages)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, conversation = %id, "message refresh failed");
                    }
                }
            }
        });

        Ok(Subscription {
            rx,
            task,
            delivered_initial: false,
        })
    }

    /// Live conversation list for the support desk.
    pub async fn list_conversations(&self) -> ChatResult<ConversationFeed> {
        let mut events = self.store.events();
        let initial = self.store.conversations().await?;
        let (tx, rx) = watch::channel(initial);

        let store = self.store.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(StoreEvent::MessageAppended { .. }) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                match store.conversations().await {
                    Ok(summaries) => {
                        if tx.send(summaries).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "conversation list refresh failed");
                    }
                }
            }
        });

        Ok(ConversationFeed {
            rx,
            task,
            delivered_initial: false,
        })
    }
}

/// Ascending by server timestamp. The sort is stable, so ties keep the
/// store's assignment order.
fn order_messages(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by_key(|message| message.timestamp);
    messages
}
