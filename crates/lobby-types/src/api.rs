use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Guestbook --

/// Body of `POST /guestbook`. Every field is optional at the wire level so
/// the handler can reject incomplete submissions with a precise message
/// instead of a generic deserialization error.
#[derive(Debug, Deserialize)]
pub struct PostEntryRequest {
    pub name: Option<String>,
    pub content: Option<String>,
    /// Parent entry id, accepted as a JSON number or a numeric string.
    pub reply_to: Option<serde_json::Value>,
    pub site: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostEntryResponse {
    /// Whether the operator webhook was reached after the entry was stored.
    pub notified: bool,
}

/// A reply nested under a top-level entry. Carries no moderation state;
/// hidden rows are filtered out before they ever reach this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestbookReply {
    pub id: i64,
    pub created: DateTime<Utc>,
    pub name: String,
    pub content: String,
    pub site: Option<String>,
    pub reply_to: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestbookEntry {
    pub id: i64,
    pub created: DateTime<Utc>,
    pub name: String,
    pub content: String,
    pub site: Option<String>,
    pub replies: Vec<GuestbookReply>,
    pub reply_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestbookResponse {
    pub count: usize,
    pub entries: Vec<GuestbookEntry>,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
pub struct PostNtfyRequest {
    pub text: Option<String>,
}
