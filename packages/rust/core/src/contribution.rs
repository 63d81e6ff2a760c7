//! Page → [`Contribution`] normalization.

use contribsync_notion::Page;
use contribsync_shared::{
    Contribution, ContributionProperties, DateRange, PropertyIds, Result, SyncError,
};
use tracing::debug;
use url::Url;

use crate::source::ContentSource;

/// Builds contributions from raw contribution pages.
pub struct ContributionBuilder<'a, S> {
    source: &'a S,
    properties: &'a PropertyIds,
    public_base_url: &'a Url,
}

impl<'a, S: ContentSource> ContributionBuilder<'a, S> {
    pub fn new(source: &'a S, properties: &'a PropertyIds, public_base_url: &'a Url) -> Self {
        Self {
            source,
            properties,
            public_base_url,
        }
    }

    /// Build a contribution including its owning user ids.
    pub async fn build(&self, page: &Page) -> Result<Contribution> {
        let mut contribution = self.build_fields(page).await?;
        contribution.users = self.owners(&page.id).await?;
        Ok(contribution)
    }

    /// Build a contribution without fetching owners (`users` stays empty).
    pub async fn build_fields(&self, page: &Page) -> Result<Contribution> {
        let props = self.properties;
        let page_id = page.id.as_str();

        let name = self.source.page_property(page_id, &props.name).await?;
        let name = name
            .first_text()
            .ok_or_else(|| SyncError::missing_property(page_id, &props.name))?
            .to_string();

        let image = self.source.page_property(page_id, &props.image).await?;
        let image = image
            .files
            .first()
            .and_then(|f| f.url())
            .ok_or_else(|| SyncError::missing_property(page_id, &props.image))?
            .to_string();

        let description = self.source.page_property(page_id, &props.description).await?;
        let description = description
            .first_text()
            .ok_or_else(|| SyncError::missing_property(page_id, &props.description))?
            .to_string();

        let date = self.source.page_property(page_id, &props.date).await?;
        let date = date
            .date
            .and_then(|d| d.start.map(|start| DateRange { start, end: d.end }))
            .ok_or_else(|| SyncError::missing_property(page_id, &props.date))?;

        let contribution = Contribution {
            name,
            description,
            image,
            external_url: external_url(&page.url, self.public_base_url)?,
            properties: ContributionProperties {
                page_id: page.id.clone(),
                reference: Vec::new(),
                date,
            },
            users: Vec::new(),
        };

        debug!(page_id, start = %contribution.start(), "contribution built");
        Ok(contribution)
    }

    /// User ids listed on the page's owner property, one per rich-text value.
    pub async fn owners(&self, page_id: &str) -> Result<Vec<String>> {
        let item = self
            .source
            .page_property(page_id, &self.properties.user_id)
            .await?;
        Ok(item.plain_texts().map(String::from).collect())
    }
}

/// Public URL for a workspace page.
///
/// The last path segment of a page URL is `Title-Words-<short id>`; the short
/// id is appended to `base`.
pub fn external_url(page_url: &str, base: &Url) -> Result<String> {
    let segment = page_url.rsplit('/').next().unwrap_or_default();
    let short_id = segment.rsplit('-').next().unwrap_or_default();
    if short_id.is_empty() {
        return Err(SyncError::validation(format!(
            "cannot derive a short id from page URL '{page_url}'"
        )));
    }

    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(short_id)
        .map(String::from)
        .map_err(|e| SyncError::validation(format!("joining '{short_id}' onto {base}: {e}")))
}
