use std::sync::Mutex;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite;
use url::Url;

use super::{
    ConversationStore, MessageDraft, QuotationDraft, QuotationStore, StoreError, StoreEvent,
};
use crate::types::{ConversationSummary, Message, QuotationRecord};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// REST client over the managed document store. Realtime change events arrive
/// on a websocket and are re-broadcast to in-process subscribers.
pub struct RemoteStore {
    http: reqwest::Client,
    base: String,
    api_key: Option<String>,
    events: broadcast::Sender<StoreEvent>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Deserialize)]
struct ConversationsResponse {
    conversations: Vec<ConversationSummary>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct QuotationsResponse {
    quotations: Vec<QuotationRecord>,
}

/// Pushed change frame, e.g. `{"type":"message","conversationId":"uid-1"}`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    conversation_id: Option<String>,
}

impl RemoteStore {
    pub fn new(http: reqwest::Client, endpoint: &str, api_key: Option<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http,
            base: endpoint.trim_end_matches('/').to_string(),
            api_key,
            events,
            listener: Mutex::new(None),
        }
    }

    /// Starts the websocket listener feeding the event channel. The task
    /// reconnects until `shutdown` is called.
    pub fn connect_events(&self, ws_url: &str) -> Result<(), StoreError> {
        let url = Url::parse(ws_url).map_err(|err| StoreError::Transport(err.to_string()))?;
        let sender = self.events.clone();
        let handle = tokio::spawn(listen(url, sender));
        let mut slot = self.listener.lock().expect("listener slot poisoned");
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Stops the websocket listener. Part of app disposal; subscriptions held
    /// by callers keep their receivers but see no further events.
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().expect("listener slot poisoned").take() {
            handle.abort();
        }
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let status = response.status();
        let body = response.text().await?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(body));
        }
        if !status.is_success() {
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|err| StoreError::Transport(err.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let response = self
            .with_auth(self.http.get(format!("{}{}", self.base, path)))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let response = self
            .with_auth(self.http.post(format!("{}{}", self.base, path)))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }
}

async fn listen(url: Url, sender: broadcast::Sender<StoreEvent>) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((mut stream, _)) => {
                tracing::info!(url = %url, "store event feed connected");
                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(tungstenite::Message::Text(body)) => {
                            if let Some(event) = parse_event(&body) {
                                let _ = sender.send(event);
                            }
                        }
                        Ok(tungstenite::Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(error = %err, "store event feed read failed");
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "store event feed connect failed");
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

fn parse_event(body: &str) -> Option<StoreEvent> {
    let wire: WireEvent = serde_json::from_str(body).ok()?;
    if wire.kind == "message" {
        return Some(StoreEvent::MessageAppended {
            conversation_id: wire.conversation_id?,
        });
    }
    None
}

#[async_trait::async_trait]
impl ConversationStore for RemoteStore {
    async fn append(
        &self,
        conversation_id: &str,
        draft: MessageDraft,
    ) -> Result<Message, StoreError> {
        self.post_json(
            &format!("/v1/conversations/{conversation_id}/messages"),
            &draft,
        )
        .await
    }

    async fn messages(&self, conversation_id: &str) -> Result<Vec<Message>, StoreError> {
        let response: MessagesResponse = self
            .get_json(&format!("/v1/conversations/{conversation_id}/messages"))
            .await?;
        Ok(response.messages)
    }

    async fn conversations(&self) -> Result<Vec<ConversationSummary>, StoreError> {
        let response: ConversationsResponse = self.get_json("/v1/conversations").await?;
        Ok(response.conversations)
    }

    fn events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[async_trait::async_trait]
impl QuotationStore for RemoteStore {
    async fn add(&self, draft: QuotationDraft) -> Result<QuotationRecord, StoreError> {
        self.post_json("/v1/quotations", &draft).await
    }

    async fn mark_accepted(&self, id: &str) -> Result<(), StoreError> {
        let _: serde_json::Value = self
            .post_json(&format!("/v1/quotations/{id}/accept"), &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn record(&self, id: &str) -> Result<QuotationRecord, StoreError> {
        self.get_json(&format!("/v1/quotations/{id}")).await
    }

    async fn accepted_for(&self, owner_id: &str) -> Result<Vec<QuotationRecord>, StoreError> {
        let response: QuotationsResponse = self
            .get_json(&format!("/v1/quotations?owner={owner_id}&accepted=true"))
            .await?;
        Ok(response.quotations)
    }
}
