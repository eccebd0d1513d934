//! Row types for the hosted store's REST interface. These map directly to
//! the columns each query selects and stay distinct from the API response
//! types assembled in lobby-api.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A visible top-level message. The reply-target column is never selected
/// for these rows, so it does not appear here.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRow {
    pub id: i64,
    pub created: DateTime<Utc>,
    pub name: String,
    pub content: String,
    pub site: Option<String>,
}

/// A visible reply to one top-level message.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyRow {
    pub id: i64,
    pub created: DateTime<Utc>,
    pub name: String,
    pub content: String,
    pub site: Option<String>,
    pub reply_to: i64,
}

/// Insert payload for the messages table. Absent optionals serialize as
/// explicit nulls, which the store accepts.
#[derive(Debug, Serialize)]
pub(crate) struct NewMessage<'a> {
    pub name: &'a str,
    pub content: &'a str,
    pub reply_to: Option<i64>,
    pub site: Option<&'a str>,
}

/// Insert payload for the notifications audit table.
#[derive(Debug, Serialize)]
pub(crate) struct NewNotification<'a> {
    pub text: &'a str,
}
