use chrono::NaiveDate;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// User-Agent sent with every outbound webhook call.
const AGENT: &str = concat!("lobby/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notify request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notify endpoint returned {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Posts plain-text notifications to the two fixed webhook targets: one for
/// guestbook announcements, one for relayed texts.
pub struct Notifier {
    client: reqwest::Client,
    guestbook_target: Url,
    relay_target: Url,
}

impl Notifier {
    pub fn new(guestbook_target: Url, relay_target: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            guestbook_target,
            relay_target,
        }
    }

    /// Announce a fresh guestbook entry to the operator webhook.
    pub async fn announce_entry(&self, author: &str) -> Result<(), NotifyError> {
        let message = entry_announcement(author, chrono::Utc::now().date_naive());
        self.post(self.guestbook_target.clone(), message).await
    }

    /// Forward a notification text to the relay webhook, verbatim.
    pub async fn relay(&self, text: &str) -> Result<(), NotifyError> {
        self.post(self.relay_target.clone(), text.to_owned()).await
    }

    async fn post(&self, target: Url, body: String) -> Result<(), NotifyError> {
        debug!("posting notification to {}", target);
        let resp = self
            .client
            .post(target)
            .header(CONTENT_TYPE, "text/plain")
            .header(USER_AGENT, AGENT)
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }
}

/// `[YYYY-MM-DD] New guestbook entry by "<author>"`.
fn entry_announcement(author: &str, date: NaiveDate) -> String {
    format!(
        "[{}] New guestbook entry by \"{}\"",
        date.format("%Y-%m-%d"),
        author
    )
}
