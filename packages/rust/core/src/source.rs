//! The content-source seam.
//!
//! Builders only need two capabilities: query a database, and read one
//! property of a page. Canonical URLs and icons ride along on [`Page`].

use contribsync_notion::{DatabaseQuery, NotionClient, Page, PropertyItem};
use contribsync_shared::Result;

/// Read access to the remote content database.
#[allow(async_fn_in_trait)]
pub trait ContentSource {
    /// Every page of `database_id` matching `query`, in the query's order.
    async fn query_database(&self, database_id: &str, query: &DatabaseQuery) -> Result<Vec<Page>>;

    /// One property of a page, with list-shaped values read to the end.
    async fn page_property(&self, page_id: &str, property_id: &str) -> Result<PropertyItem>;
}

impl ContentSource for NotionClient {
    async fn query_database(&self, database_id: &str, query: &DatabaseQuery) -> Result<Vec<Page>> {
        NotionClient::query_database(self, database_id, query).await
    }

    async fn page_property(&self, page_id: &str, property_id: &str) -> Result<PropertyItem> {
        NotionClient::page_property(self, page_id, property_id).await
    }
}
