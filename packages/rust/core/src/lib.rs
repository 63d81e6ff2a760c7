//! Sync pipeline and domain logic for contribsync.
//!
//! This crate ties the Notion client and the metadata store together: it
//! normalizes contribution pages, groups them by owner, builds per-user
//! documents, merges them into what was persisted, and drives the whole
//! run ([`run_sync`]).

pub mod context;
pub mod contribution;
pub mod grouping;
pub mod merge;
pub mod metadata;
pub mod source;
pub mod sync;

#[cfg(test)]
mod testing;

pub use context::BuildContext;
pub use contribution::{ContributionBuilder, external_url};
pub use grouping::group_by_user;
pub use merge::{ChangeSummary, MergeOutcome, merge, sort_contributions};
pub use metadata::{MetadataBuilder, Profile};
pub use source::ContentSource;
pub use sync::{
    FailurePolicy, ProgressReporter, SilentProgress, SyncMode, SyncOptions, SyncReport,
    UserFailure, run_sync,
};
