pub mod error;
pub mod models;

use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;
use url::Url;

pub use error::StoreError;

use models::{MessageRow, NewMessage, NewNotification, ReplyRow};

const MESSAGES_TABLE: &str = "messages";
const NOTIFICATIONS_TABLE: &str = "notifications";

/// Columns served for top-level entries. `reply_to` is known null here and
/// `visible` is known true, so neither is fetched.
const TOP_LEVEL_COLUMNS: &str = "id,created,name,content,site";
/// Columns served for replies.
const REPLY_COLUMNS: &str = "id,created,name,content,site,reply_to";

/// Client for the hosted data store's REST interface. Built once at startup
/// and shared by every request handler; all persistence goes through it.
pub struct Store {
    client: reqwest::Client,
    base: Url,
    key: String,
}

impl Store {
    pub fn new(base: Url, key: impl Into<String>) -> Self {
        info!("Store client ready for {}", base);
        Self {
            client: reqwest::Client::new(),
            base,
            key: key.into(),
        }
    }

    /// All visible top-level messages, newest first.
    pub async fn top_level_messages(&self) -> Result<Vec<MessageRow>, StoreError> {
        self.fetch_rows(self.top_level_request()).await
    }

    /// Visible replies to one top-level message, newest first.
    pub async fn replies_to(&self, parent: i64) -> Result<Vec<ReplyRow>, StoreError> {
        self.fetch_rows(self.replies_request(parent)).await
    }

    /// Persist a guestbook message. The store fills in id, timestamp and the
    /// default visibility; nothing from the row is read back.
    pub async fn insert_message(
        &self,
        name: &str,
        content: &str,
        reply_to: Option<i64>,
        site: Option<&str>,
    ) -> Result<(), StoreError> {
        let row = NewMessage { name, content, reply_to, site };
        self.execute(self.insert_request(MESSAGES_TABLE, &row)).await
    }

    /// Persist a relayed notification text as an audit row.
    pub async fn insert_notification(&self, text: &str) -> Result<(), StoreError> {
        self.execute(self.insert_request(NOTIFICATIONS_TABLE, &NewNotification { text }))
            .await
    }

    // -- Request construction --

    fn top_level_request(&self) -> reqwest::RequestBuilder {
        self.select(MESSAGES_TABLE).query(&[
            ("select", TOP_LEVEL_COLUMNS),
            ("visible", "eq.true"),
            ("reply_to", "is.null"),
            ("order", "created.desc"),
        ])
    }

    fn replies_request(&self, parent: i64) -> reqwest::RequestBuilder {
        let parent_filter = format!("eq.{parent}");
        self.select(MESSAGES_TABLE).query(&[
            ("select", REPLY_COLUMNS),
            ("visible", "eq.true"),
            ("reply_to", parent_filter.as_str()),
            ("order", "created.desc"),
        ])
    }

    fn insert_request<T: Serialize>(&self, table: &str, row: &T) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(row)
    }

    fn select(&self, table: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(self.table_url(table)))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", self.key.as_str())
            .header(AUTHORIZATION, format!("Bearer {}", self.key))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base.as_str().trim_end_matches('/'), table)
    }

    // -- Response handling --

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<Vec<T>, StoreError> {
        let resp = check(req.send().await?).await?;
        resp.json().await.map_err(StoreError::Malformed)
    }

    async fn execute(&self, req: reqwest::RequestBuilder) -> Result<(), StoreError> {
        check(req.send().await?).await?;
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::rejected(status.as_u16(), &body))
}
