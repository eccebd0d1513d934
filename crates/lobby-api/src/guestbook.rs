use axum::Json;
use axum::extract::State;
use tracing::warn;
use url::Url;

use lobby_store::models::{MessageRow, ReplyRow};
use lobby_types::api::{
    GuestbookEntry, GuestbookReply, GuestbookResponse, PostEntryRequest, PostEntryResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /guestbook — all visible top-level entries, newest first, each with
/// its visible replies attached.
pub async fn list_entries(
    State(state): State<AppState>,
) -> Result<Json<GuestbookResponse>, ApiError> {
    let roots = state.store.top_level_messages().await?;

    // One reply query per top-level entry.
    let mut entries = Vec::with_capacity(roots.len());
    for root in roots {
        let replies = state.store.replies_to(root.id).await?;
        entries.push(attach_replies(root, replies));
    }

    Ok(Json(GuestbookResponse { count: entries.len(), entries }))
}

/// POST /guestbook — validate, persist, then announce the new entry.
pub async fn post_entry(
    State(state): State<AppState>,
    Json(req): Json<PostEntryRequest>,
) -> Result<Json<PostEntryResponse>, ApiError> {
    let entry = NewEntry::validate(req)?;

    state
        .store
        .insert_message(&entry.name, &entry.content, entry.reply_to, entry.site.as_deref())
        .await?;

    // The row is durable at this point; an announcement failure is reported
    // as partial success rather than an error status.
    let notified = match state.notifier.announce_entry(&entry.name).await {
        Ok(()) => true,
        Err(err) => {
            warn!("guestbook announcement failed after insert: {}", err);
            false
        }
    };

    Ok(Json(PostEntryResponse { notified }))
}

fn attach_replies(root: MessageRow, replies: Vec<ReplyRow>) -> GuestbookEntry {
    let replies: Vec<GuestbookReply> = replies
        .into_iter()
        .map(|r| GuestbookReply {
            id: r.id,
            created: r.created,
            name: r.name,
            content: r.content,
            site: r.site,
            reply_to: r.reply_to,
        })
        .collect();

    GuestbookEntry {
        id: root.id,
        created: root.created,
        name: root.name,
        content: root.content,
        site: root.site,
        reply_count: replies.len(),
        replies,
    }
}

/// A fully validated guestbook submission.
#[derive(Debug)]
struct NewEntry {
    name: String,
    content: String,
    reply_to: Option<i64>,
    site: Option<String>,
}

impl NewEntry {
    fn validate(req: PostEntryRequest) -> Result<Self, ApiError> {
        let name = match req.name {
            Some(n) if !n.is_empty() => n,
            _ => return Err(ApiError::BadRequest("ERROR: missing `name`")),
        };
        let content = match req.content {
            Some(c) if !c.is_empty() => c,
            _ => return Err(ApiError::BadRequest("ERROR: missing `content`")),
        };
        let reply_to = match req.reply_to {
            None => None,
            Some(value) => Some(
                coerce_reply_to(&value)
                    .ok_or(ApiError::BadRequest("ERROR: invalid `reply_to`"))?,
            ),
        };
        // Stored in normalized form, not as submitted.
        let site = match req.site {
            None => None,
            Some(raw) => match Url::parse(&raw) {
                Ok(url) => Some(url.to_string()),
                Err(_) => return Err(ApiError::BadRequest("ERROR: invalid site url")),
            },
        };

        Ok(Self { name, content, reply_to, site })
    }
}

/// Accepts the reply target as a JSON number or a numeric string.
fn coerce_reply_to(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
