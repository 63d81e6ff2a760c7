//! Per-user [`Metadata`] assembly: profile lookup plus fresh contributions.

use chrono::{DateTime, Utc};
use contribsync_notion::{DatabaseQuery, Page};
use contribsync_shared::{
    Contribution, Metadata, MetadataProperties, Result, SyncError, SyncSettings,
};
use tracing::{debug, instrument};

use crate::context::BuildContext;
use crate::contribution::{ContributionBuilder, external_url};
use crate::source::ContentSource;

/// Profile fields read from a user's page in the users database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub image: String,
    pub external_url: String,
}

/// Builds a user's document from the contributions this run observed.
///
/// The returned document only ever holds fresh contributions; folding in
/// what was persisted before is the merge step's job.
pub struct MetadataBuilder<'a, S> {
    source: &'a S,
    settings: &'a SyncSettings,
}

impl<'a, S: ContentSource> MetadataBuilder<'a, S> {
    pub fn new(source: &'a S, settings: &'a SyncSettings) -> Self {
        Self { source, settings }
    }

    fn contributions(&self) -> ContributionBuilder<'a, S> {
        ContributionBuilder::new(
            self.source,
            &self.settings.properties,
            &self.settings.public_base_url,
        )
    }

    /// Full rebuild: take `page_ids` from the run's contribution cache.
    #[instrument(skip_all, fields(user_id = %user_id, pages = page_ids.len()))]
    pub async fn from_pages(
        &self,
        user_id: &str,
        page_ids: &[String],
        ctx: &BuildContext,
    ) -> Result<Metadata> {
        let contributions = page_ids
            .iter()
            .map(|page_id| {
                ctx.contribution(page_id)
                    .map(|c| Contribution {
                        users: Vec::new(),
                        ..c.clone()
                    })
                    .ok_or_else(|| {
                        SyncError::validation(format!(
                            "page {page_id} was not built in this run"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let profile = self.profile(user_id).await?;
        Ok(self.assemble(user_id, profile, contributions))
    }

    /// Incremental: pages of `user_id` edited after `since`.
    ///
    /// Every page the query returns is recorded as observed in `ctx`, owned by
    /// this user or not.
    #[instrument(skip_all, fields(user_id = %user_id, since = %since))]
    pub async fn since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        ctx: &mut BuildContext,
    ) -> Result<Metadata> {
        let pages = self
            .source
            .query_database(
                &self.settings.contribution_db_id,
                &DatabaseQuery::edited_after(since),
            )
            .await?;

        let builder = self.contributions();
        let mut contributions = Vec::new();
        for page in &pages {
            ctx.observe(page.id.as_str());
            let owners = builder.owners(&page.id).await?;
            if !owners.iter().any(|o| o == user_id) {
                continue;
            }
            contributions.push(builder.build_fields(page).await?);
        }
        debug!(
            edited = pages.len(),
            owned = contributions.len(),
            "edited pages filtered"
        );

        let profile = self.profile(user_id).await?;
        Ok(self.assemble(user_id, profile, contributions))
    }

    /// Look up the user's single profile page.
    pub async fn profile(&self, user_id: &str) -> Result<Profile> {
        let query = DatabaseQuery::text_equals(&self.settings.user_filter_property, user_id);
        let mut pages = self
            .source
            .query_database(&self.settings.user_db_id, &query)
            .await?;
        if pages.len() != 1 {
            return Err(SyncError::ProfileLookup {
                user_id: user_id.to_string(),
                matches: pages.len(),
            });
        }
        let page = pages.remove(0);
        let props = &self.settings.properties;

        let name = self.source.page_property(&page.id, &props.name).await?;
        let name = name
            .first_text()
            .ok_or_else(|| SyncError::missing_property(&page.id, &props.name))?
            .to_string();

        Ok(Profile {
            name,
            image: self.profile_image(&page).await?,
            external_url: external_url(&page.url, &self.settings.public_base_url)?,
        })
    }

    /// Page icon if it is an image, else the first file of the icon property.
    async fn profile_image(&self, page: &Page) -> Result<String> {
        if let Some(url) = page.icon.as_ref().and_then(|i| i.url()) {
            return Ok(url.to_string());
        }
        let icon_prop = &self.settings.properties.icon;
        let item = self.source.page_property(&page.id, icon_prop).await?;
        item.files
            .first()
            .and_then(|f| f.url())
            .map(String::from)
            .ok_or_else(|| SyncError::missing_property(&page.id, icon_prop))
    }

    /// Every user id listed in the users database, sorted and deduplicated.
    pub async fn list_user_ids(&self) -> Result<Vec<String>> {
        let pages = self
            .source
            .query_database(&self.settings.user_db_id, &DatabaseQuery::all())
            .await?;
        let mut ids: Vec<String> = pages
            .iter()
            .filter_map(|p| p.plain_text(&self.settings.user_filter_property))
            .filter(|id| !id.is_empty())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn assemble(&self, user_id: &str, profile: Profile, contributions: Vec<Contribution>) -> Metadata {
        Metadata {
            name: profile.name,
            description: self.settings.user_description.clone(),
            image: profile.image,
            external_url: profile.external_url,
            properties: MetadataProperties { contributions },
            user_id: user_id.to_string(),
        }
    }
}
