//! In-memory fakes shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use contribsync_notion::{
    DatabaseQuery, FileObject, FileUrl, Icon, Page, PropertyItem, QueryFilter, QuerySort,
};
use contribsync_shared::{
    Contribution, ContributionProperties, DateRange, Metadata, MetadataProperties, PropertyIds,
    Result, SyncError, SyncSettings,
};
use contribsync_storage::MetadataStore;
use serde_json::json;
use url::Url;

use crate::source::ContentSource;

pub const USERS_DB: &str = "users-db";
pub const CONTRIB_DB: &str = "contrib-db";

pub fn public_base() -> Url {
    Url::parse("https://wagumi-dev.notion.site/").unwrap()
}

pub fn settings() -> SyncSettings {
    SyncSettings {
        user_db_id: USERS_DB.into(),
        contribution_db_id: CONTRIB_DB.into(),
        properties: PropertyIds::default(),
        public_base_url: public_base(),
        user_description: "He/She is one of wagumi members.".into(),
        user_filter_property: "id".into(),
        metadata_dir: PathBuf::from("unused"),
        run_log: PathBuf::from("unused"),
    }
}

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn contribution(page_id: &str, start: &str, users: &[&str]) -> Contribution {
    Contribution {
        name: format!("work {page_id}"),
        description: format!("work {page_id} description"),
        image: format!("https://files.example.com/{page_id}.png"),
        external_url: format!("https://wagumi-dev.notion.site/{page_id}"),
        properties: ContributionProperties {
            page_id: page_id.into(),
            reference: Vec::new(),
            date: DateRange {
                start: start.into(),
                end: None,
            },
        },
        users: users.iter().map(|u| u.to_string()).collect(),
    }
}

pub fn metadata(user_id: &str, contributions: Vec<Contribution>) -> Metadata {
    Metadata {
        name: user_id.to_uppercase(),
        description: "He/She is one of wagumi members.".into(),
        image: format!("https://img.example.com/{user_id}.png"),
        external_url: format!("https://wagumi-dev.notion.site/{user_id}"),
        properties: MetadataProperties { contributions },
        user_id: user_id.into(),
    }
}

pub fn page_ids(metadata: &Metadata) -> Vec<&str> {
    metadata.contributions().iter().map(|c| c.page_id()).collect()
}

pub fn contribution_page(page_id: &str) -> Page {
    Page {
        id: page_id.into(),
        url: format!("https://www.notion.so/Work-{page_id}"),
        last_edited_time: None,
        icon: None,
        properties: HashMap::new(),
    }
}

// ---------------------------------------------------------------------------
// FakeSource
// ---------------------------------------------------------------------------

/// Content source backed by maps; unknown pages/properties answer 404.
#[derive(Default)]
pub struct FakeSource {
    databases: HashMap<String, Vec<Page>>,
    properties: HashMap<(String, String), PropertyItem>,
    queries: Cell<usize>,
}

impl FakeSource {
    pub fn set_property(&mut self, page_id: &str, property_id: &str, item: PropertyItem) {
        self.properties
            .insert((page_id.to_string(), property_id.to_string()), item);
    }

    /// Populate every property a contribution page carries.
    pub fn set_contribution(
        &mut self,
        page_id: &str,
        name: &str,
        start: &str,
        end: Option<&str>,
        owners: &[&str],
    ) {
        self.set_property(page_id, "name", PropertyItem::from_texts([name]));
        self.set_property(
            page_id,
            "image",
            PropertyItem::from_files(vec![FileObject::hosted(
                format!("{page_id}.png"),
                format!("https://files.example.com/{page_id}.png"),
            )]),
        );
        self.set_property(
            page_id,
            "description",
            PropertyItem::from_texts([format!("{name} description")]),
        );
        self.set_property(
            page_id,
            "date",
            PropertyItem::from_date(start, end.map(String::from)),
        );
        self.set_property(page_id, "userId", PropertyItem::from_texts(owners.iter().copied()));
    }

    /// Add a contribution page edited at `edited` to the contributions database.
    pub fn add_contribution(
        &mut self,
        page_id: &str,
        start: &str,
        owners: &[&str],
        edited: &str,
    ) {
        let mut page = contribution_page(page_id);
        page.last_edited_time = Some(ts(edited));
        self.databases
            .entry(CONTRIB_DB.to_string())
            .or_default()
            .push(page);
        self.set_contribution(page_id, &format!("work {page_id}"), start, None, owners);
    }

    /// Add a profile page for `user_id` to the users database.
    pub fn add_user(&mut self, user_id: &str) {
        let page_id = format!("{user_id}-profile");
        let mut properties = HashMap::new();
        properties.insert(
            "id".to_string(),
            json!({ "id": "%3Aid", "type": "rich_text", "rich_text": [{ "plain_text": user_id }] }),
        );
        let page = Page {
            id: page_id.clone(),
            url: format!("https://www.notion.so/Profile-{user_id}"),
            last_edited_time: None,
            icon: Some(Icon::External {
                external: FileUrl {
                    url: format!("https://img.example.com/{user_id}.png"),
                },
            }),
            properties,
        };
        self.databases
            .entry(USERS_DB.to_string())
            .or_default()
            .push(page);
        self.set_property(&page_id, "name", PropertyItem::from_texts([user_id.to_uppercase()]));
    }

    /// Add a profile page with no image icon; the icon property is used instead.
    pub fn add_user_with_icon_property(&mut self, user_id: &str, icon: Option<FileObject>) {
        self.add_user(user_id);
        if let Some(page) = self
            .databases
            .get_mut(USERS_DB)
            .and_then(|pages| pages.last_mut())
        {
            page.icon = Some(Icon::Emoji {
                emoji: "🙂".into(),
            });
        }
        let files = icon.into_iter().collect();
        self.set_property(
            &format!("{user_id}-profile"),
            "icon",
            PropertyItem::from_files(files),
        );
    }

    pub fn query_count(&self) -> usize {
        self.queries.get()
    }
}

impl ContentSource for FakeSource {
    async fn query_database(&self, database_id: &str, query: &DatabaseQuery) -> Result<Vec<Page>> {
        self.queries.set(self.queries.get() + 1);
        let pages = self.databases.get(database_id).ok_or(SyncError::Api {
            status: 404,
            message: format!("no database {database_id}"),
        })?;

        let mut matched: Vec<Page> = pages
            .iter()
            .filter(|page| match &query.filter {
                None => true,
                Some(QueryFilter::EditedAfter(since)) => {
                    page.last_edited_time.is_some_and(|t| t > *since)
                }
                Some(QueryFilter::TextEquals { property, value }) => {
                    page.plain_text(property).as_deref() == Some(value.as_str())
                }
            })
            .cloned()
            .collect();

        if query.sorts.contains(&QuerySort::EditedAscending) {
            matched.sort_by_key(|p| p.last_edited_time);
        }
        Ok(matched)
    }

    async fn page_property(&self, page_id: &str, property_id: &str) -> Result<PropertyItem> {
        self.properties
            .get(&(page_id.to_string(), property_id.to_string()))
            .cloned()
            .ok_or(SyncError::Api {
                status: 404,
                message: format!("no property {property_id} on {page_id}"),
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    docs: RefCell<HashMap<String, Metadata>>,
    corrupt: HashSet<String>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn with(docs: Vec<Metadata>) -> Self {
        let store = Self::default();
        for doc in docs {
            store.docs.borrow_mut().insert(doc.user_id.clone(), doc);
        }
        store
    }

    /// Make reads of `user_id` fail as if the file were malformed.
    pub fn mark_corrupt(&mut self, user_id: &str) {
        self.corrupt.insert(user_id.to_string());
    }

    pub fn get(&self, user_id: &str) -> Option<Metadata> {
        self.docs.borrow().get(user_id).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl MetadataStore for MemoryStore {
    fn exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.corrupt.contains(user_id) || self.docs.borrow().contains_key(user_id))
    }

    fn read(&self, user_id: &str) -> Result<Metadata> {
        if self.corrupt.contains(user_id) {
            return Err(SyncError::parse(format!("invalid JSON in {user_id}.json")));
        }
        self.docs
            .borrow()
            .get(user_id)
            .cloned()
            .ok_or_else(|| SyncError::Storage(format!("{user_id}.json not found")))
    }

    fn write(&self, metadata: &Metadata) -> Result<()> {
        self.writes.set(self.writes.get() + 1);
        self.docs
            .borrow_mut()
            .insert(metadata.user_id.clone(), metadata.clone());
        Ok(())
    }
}
