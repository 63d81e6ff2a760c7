//! Core domain types: contributions, per-user metadata documents, run log.
//!
//! The serialized shape of [`Metadata`] is a published file format and must
//! stay byte-compatible with documents already in circulation, including the
//! misspelled `contribusions` key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{Result, SyncError};

// ---------------------------------------------------------------------------
// Contribution
// ---------------------------------------------------------------------------

/// Start/end of a contribution. `start` is an ISO-8601 date or date-time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    /// Serialized as `null` when the range is open-ended.
    pub end: Option<String>,
}

/// Source identity and dating of a contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionProperties {
    /// Content-source page id; the dedup key.
    #[serde(rename = "pageId")]
    pub page_id: String,
    /// Related identifiers. Reserved, currently always empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reference: Vec<String>,
    pub date: DateRange,
}

/// One recognized unit of work, normalized from a content-source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub name: String,
    pub description: String,
    pub image: String,
    pub external_url: String,
    pub properties: ContributionProperties,
    /// Owning user ids. Never serialized; empty when the record was built
    /// for a single, already-filtered user.
    #[serde(skip)]
    pub users: Vec<String>,
}

impl Contribution {
    pub fn page_id(&self) -> &str {
        &self.properties.page_id
    }

    pub fn start(&self) -> &str {
        &self.properties.date.start
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Wrapper object around the contribution list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataProperties {
    #[serde(rename = "contribusions", default, deserialize_with = "null_as_empty")]
    pub contributions: Vec<Contribution>,
}

/// One user's published artifact: profile fields plus contributions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub external_url: String,
    pub properties: MetadataProperties,
    /// Storage identity; not part of the document.
    #[serde(skip)]
    pub user_id: String,
}

impl Metadata {
    pub fn contributions(&self) -> &[Contribution] {
        &self.properties.contributions
    }

    pub fn contributions_mut(&mut self) -> &mut Vec<Contribution> {
        &mut self.properties.contributions
    }

    /// Storage key for this document.
    pub fn filename(&self) -> String {
        metadata_filename(&self.user_id)
    }
}

/// Storage key of a user's metadata document: `{user_id}.json`.
pub fn metadata_filename(user_id: &str) -> String {
    format!("{user_id}.json")
}

/// Reject user ids that cannot name a file inside the metadata directory.
///
/// User ids come from free-text page properties and the command line. Blank
/// ids and ids holding a path separator or `..` are refused.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(SyncError::validation("user id must not be empty"));
    }
    if user_id.contains(['/', '\\', '\0']) || user_id.contains("..") {
        return Err(SyncError::validation(format!(
            "user id '{}' contains a path separator or '..'",
            user_id.escape_debug()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RunLog
// ---------------------------------------------------------------------------

/// Record of the last successful sync, used to bound incremental runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    /// Start time of the last successful run.
    pub last_execution_time: DateTime<Utc>,
    /// Identifier of that run (UUID v7, time-sortable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

/// Treat an explicit `null` the same as a missing list.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
