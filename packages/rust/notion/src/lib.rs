//! Minimal Notion REST client.
//!
//! Covers exactly what the sync reads: database queries (filtered, sorted,
//! paginated) and single page properties (paginated lists are concatenated).
//! Calls are never retried; any transport, status, or decoding failure is
//! returned to the caller.

mod query;
mod types;

use std::time::Duration;

use contribsync_shared::{NotionConfig, Result, SyncError};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

pub use query::{DatabaseQuery, QueryFilter, QuerySort};
pub use types::{
    DateValue, FileObject, FileUrl, Icon, Page, PropertyItem, PropertyItemEntry, RichText,
};

use types::QueryResponse;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("contribsync/", env!("CARGO_PKG_VERSION"));

/// Upper bound the API accepts for `page_size`.
const MAX_PAGE_SIZE: u32 = 100;

/// Authenticated client for one Notion integration.
pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    page_size: u32,
}

impl NotionClient {
    /// Build a client from the `[notion]` config section and an integration token.
    pub fn new(token: impl Into<String>, config: &NotionConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let version = HeaderValue::from_str(&config.version).map_err(|e| {
            SyncError::config(format!("invalid notion.version '{}': {e}", config.version))
        })?;
        headers.insert("Notion-Version", version);

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            page_size: config.page_size.clamp(1, MAX_PAGE_SIZE),
        })
    }

    /// Run `query` against a database, following cursors until exhausted.
    #[instrument(skip_all, fields(database_id = %database_id))]
    pub async fn query_database(
        &self,
        database_id: &str,
        query: &DatabaseQuery,
    ) -> Result<Vec<Page>> {
        let url = format!("{}/databases/{database_id}/query", self.base_url);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = query.to_body(self.page_size, cursor.as_deref());
            let request = self.client.post(&url).bearer_auth(&self.token).json(&body);
            let response: QueryResponse = send_json(request, &url).await?;

            debug!(returned = response.results.len(), has_more = response.has_more, "query page");
            pages.extend(response.results);

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(pages)
    }

    /// Fetch one property of a page. List-shaped properties are read to the end.
    pub async fn page_property(&self, page_id: &str, property_id: &str) -> Result<PropertyItem> {
        let url = format!("{}/pages/{page_id}/properties/{property_id}", self.base_url);
        let page_size = self.page_size.to_string();
        let mut item: Option<PropertyItem> = None;
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[("page_size", page_size.as_str())]);
            if let Some(c) = &cursor {
                request = request.query(&[("start_cursor", c.as_str())]);
            }

            let page: PropertyItem = send_json(request, &url).await?;
            let has_more = page.has_more;
            let next = page.next_cursor.clone();

            match item.as_mut() {
                Some(acc) => acc.results.extend(page.results),
                None => item = Some(page),
            }

            match next {
                Some(next) if has_more => cursor = Some(next),
                _ => break,
            }
        }

        let mut item = item.unwrap_or_default();
        item.has_more = false;
        item.next_cursor = None;
        Ok(item)
    }
}

/// Send a request and decode a successful JSON response.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder, url: &str) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| SyncError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SyncError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| SyncError::Network(format!("{url}: failed to read body: {e}")))?;

    serde_json::from_str(&body).map_err(|e| SyncError::parse(format!("{url}: {e}")))
}
