use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Support,
}

impl Role {
    pub fn is_support(self) -> bool {
        matches!(self, Role::Support)
    }
}

/// Authenticated user, as issued by the identity provider. The role is
/// assigned once at sign-in and carried everywhere else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Immutable chat message. The id and timestamp are assigned by the store;
/// `timestamp` is unix milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_email: String,
    pub sender_role: Role,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub last_message: Option<Message>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email: String,
}

/// Generated proposal prose. No structure is guaranteed beyond being
/// human-readable text; callers tokenize it for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub raw_content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub raw_content: String,
}

/// Persisted quotation, keyed by a store-assigned id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationRecord {
    pub id: String,
    pub owner_id: String,
    pub business: String,
    pub quotation: Quotation,
    pub client_details: ClientDetails,
    pub timestamp: i64,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub accepted_at: Option<i64>,
}
