//! Wire types for the subset of the Notion API the sync reads.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// A page object as returned by database queries.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Page {
    pub id: String,
    /// Canonical (workspace-internal) page URL.
    pub url: String,
    #[serde(default)]
    pub last_edited_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub icon: Option<Icon>,
    /// Inline property values keyed by property name.
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl Page {
    /// Concatenated plain text of an inline `title` or `rich_text` property.
    ///
    /// Inline values are truncated by the API for long lists; use the
    /// property endpoint when every entry matters.
    pub fn plain_text(&self, name: &str) -> Option<String> {
        let value = self.properties.get(name)?;
        let kind = value.get("type")?.as_str()?;
        let parts = value.get(kind)?.as_array()?;
        Some(
            parts
                .iter()
                .filter_map(|p| p.get("plain_text").and_then(Value::as_str))
                .collect(),
        )
    }
}

/// Page icon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Icon {
    Emoji { emoji: String },
    External { external: FileUrl },
    File { file: FileUrl },
    #[serde(other)]
    Other,
}

impl Icon {
    /// URL of an image icon; `None` for emoji icons.
    pub fn url(&self) -> Option<&str> {
        match self {
            Icon::External { external } => Some(&external.url),
            Icon::File { file } => Some(&file.url),
            Icon::Emoji { .. } | Icon::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileUrl {
    pub url: String,
}

/// One page of database query results.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QueryResponse {
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Property items
// ---------------------------------------------------------------------------

/// Response of the page-property endpoint.
///
/// Scalar properties (`files`, `date`) come back as a single item; text-like
/// properties (`title`, `rich_text`) come back as a paginated list whose
/// pages the client concatenates into `results`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PropertyItem {
    #[serde(default)]
    pub results: Vec<PropertyItemEntry>,
    #[serde(default)]
    pub files: Vec<FileObject>,
    #[serde(default)]
    pub date: Option<DateValue>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl PropertyItem {
    /// A list item holding one rich-text entry per value.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            results: texts
                .into_iter()
                .map(|t| PropertyItemEntry {
                    title: None,
                    rich_text: Some(RichText {
                        plain_text: t.into(),
                    }),
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn from_files(files: Vec<FileObject>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn from_date(start: impl Into<String>, end: Option<String>) -> Self {
        Self {
            date: Some(DateValue {
                start: Some(start.into()),
                end,
            }),
            ..Self::default()
        }
    }

    /// Plain text of every title or rich-text entry, in order.
    pub fn plain_texts(&self) -> impl Iterator<Item = &str> {
        self.results.iter().filter_map(PropertyItemEntry::plain_text)
    }

    pub fn first_text(&self) -> Option<&str> {
        self.plain_texts().next()
    }
}

/// One entry of a list-shaped property item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyItemEntry {
    #[serde(default)]
    pub title: Option<RichText>,
    #[serde(default)]
    pub rich_text: Option<RichText>,
}

impl PropertyItemEntry {
    pub fn plain_text(&self) -> Option<&str> {
        self.title
            .as_ref()
            .or(self.rich_text.as_ref())
            .map(|t| t.plain_text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

/// An entry of a `files` property.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileObject {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub file: Option<FileUrl>,
    #[serde(default)]
    pub external: Option<FileUrl>,
}

impl FileObject {
    pub fn hosted(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "file".into(),
            file: Some(FileUrl { url: url.into() }),
            external: None,
        }
    }

    pub fn external(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "external".into(),
            file: None,
            external: Some(FileUrl { url: url.into() }),
        }
    }

    /// URL of the entry: the hosted file for `file` entries, the link otherwise.
    pub fn url(&self) -> Option<&str> {
        let target = if self.kind == "file" {
            self.file.as_ref()
        } else {
            self.external.as_ref()
        };
        target.map(|f| f.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DateValue {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_with_external_icon() {
        let json = r#"{
            "object": "page",
            "id": "0a1b",
            "url": "https://www.notion.so/Alice-0a1b2c3d",
            "last_edited_time": "2024-01-02T03:04:00.000Z",
            "icon": { "type": "external", "external": { "url": "https://img/alice.png" } }
        }"#;
        let page: Page = serde_json::from_str(json).expect("page");
        assert_eq!(page.icon.as_ref().and_then(Icon::url), Some("https://img/alice.png"));
        assert!(page.last_edited_time.is_some());
        assert!(page.properties.is_empty());
    }

    #[test]
    fn inline_rich_text_property() {
        let json = r#"{
            "id": "u-page",
            "url": "https://www.notion.so/Alice-u",
            "properties": {
                "id": { "id": "%3Aab", "type": "rich_text", "rich_text": [
                    { "type": "text", "plain_text": "ali" },
                    { "type": "text", "plain_text": "ce" }
                ] },
                "count": { "id": "n", "type": "number", "number": 3 }
            }
        }"#;
        let page: Page = serde_json::from_str(json).expect("page");
        assert_eq!(page.plain_text("id").as_deref(), Some("alice"));
        assert_eq!(page.plain_text("count"), None);
        assert_eq!(page.plain_text("missing"), None);
    }

    #[test]
    fn emoji_and_unknown_icons_have_no_url() {
        let emoji: Icon = serde_json::from_str(r#"{"type":"emoji","emoji":"🎉"}"#).expect("emoji");
        assert_eq!(emoji.url(), None);
        let custom: Icon =
            serde_json::from_str(r#"{"type":"custom_emoji","custom_emoji":{}}"#).expect("other");
        assert_eq!(custom, Icon::Other);
    }

    #[test]
    fn list_property_item_texts() {
        let json = r#"{
            "object": "list",
            "results": [
                { "object": "property_item", "type": "title", "title": { "plain_text": "Hello" } },
                { "object": "property_item", "type": "rich_text", "rich_text": { "plain_text": "World" } }
            ],
            "has_more": false,
            "next_cursor": null
        }"#;
        let item: PropertyItem = serde_json::from_str(json).expect("item");
        assert_eq!(item.plain_texts().collect::<Vec<_>>(), vec!["Hello", "World"]);
        assert_eq!(item.first_text(), Some("Hello"));
    }

    #[test]
    fn files_property_prefers_entry_kind() {
        let json = r#"{
            "object": "property_item",
            "type": "files",
            "files": [
                { "name": "a.png", "type": "file", "file": { "url": "https://s3/a.png", "expiry_time": "2024-01-01T00:00:00Z" } },
                { "name": "b", "type": "external", "external": { "url": "https://ext/b.png" } }
            ]
        }"#;
        let item: PropertyItem = serde_json::from_str(json).expect("item");
        assert_eq!(item.files[0].url(), Some("https://s3/a.png"));
        assert_eq!(item.files[1].url(), Some("https://ext/b.png"));
    }

    #[test]
    fn date_property_with_null_end() {
        let json = r#"{
            "object": "property_item",
            "type": "date",
            "date": { "start": "2022-06-01", "end": null, "time_zone": null }
        }"#;
        let item: PropertyItem = serde_json::from_str(json).expect("item");
        let date = item.date.expect("date");
        assert_eq!(date.start.as_deref(), Some("2022-06-01"));
        assert!(date.end.is_none());
    }
}
