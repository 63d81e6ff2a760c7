//! Database query builder.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

/// Filter applied to a database query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    /// Pages whose `last_edited_time` is strictly after the instant.
    EditedAfter(DateTime<Utc>),
    /// Pages whose rich-text `property` equals `value` exactly.
    TextEquals { property: String, value: String },
}

/// Sort order for a database query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySort {
    EditedAscending,
}

/// A database query: optional filter plus sorts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseQuery {
    pub filter: Option<QueryFilter>,
    pub sorts: Vec<QuerySort>,
}

impl DatabaseQuery {
    /// Every page in the database.
    pub fn all() -> Self {
        Self::default()
    }

    /// Pages edited after `since`, oldest edit first.
    pub fn edited_after(since: DateTime<Utc>) -> Self {
        Self {
            filter: Some(QueryFilter::EditedAfter(since)),
            sorts: vec![QuerySort::EditedAscending],
        }
    }

    /// Pages whose rich-text `property` equals `value`.
    pub fn text_equals(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            filter: Some(QueryFilter::TextEquals {
                property: property.into(),
                value: value.into(),
            }),
            sorts: Vec::new(),
        }
    }

    /// JSON request body for one page of results.
    pub fn to_body(&self, page_size: u32, start_cursor: Option<&str>) -> Value {
        let mut body = Map::new();

        if let Some(filter) = &self.filter {
            let filter = match filter {
                QueryFilter::EditedAfter(since) => json!({
                    "timestamp": "last_edited_time",
                    "last_edited_time": {
                        "after": since.to_rfc3339_opts(SecondsFormat::Millis, true)
                    }
                }),
                QueryFilter::TextEquals { property, value } => json!({
                    "property": property,
                    "rich_text": { "equals": value }
                }),
            };
            body.insert("filter".into(), filter);
        }

        if !self.sorts.is_empty() {
            let sorts = self
                .sorts
                .iter()
                .map(|sort| match sort {
                    QuerySort::EditedAscending => json!({
                        "timestamp": "last_edited_time",
                        "direction": "ascending"
                    }),
                })
                .collect();
            body.insert("sorts".into(), Value::Array(sorts));
        }

        body.insert("page_size".into(), json!(page_size));
        if let Some(cursor) = start_cursor {
            body.insert("start_cursor".into(), json!(cursor));
        }

        Value::Object(body)
    }
}
