//! Merge of freshly built metadata into the persisted document.

use std::collections::HashSet;
use std::fmt;

use contribsync_shared::{Contribution, Metadata, Result};
use contribsync_storage::MetadataStore;
use tracing::{debug, instrument};

use crate::context::BuildContext;

/// What a merge did to a user's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSummary {
    NoUpdates { user_id: String },
    Created { user_id: String },
    Updated { user_id: String },
}

impl ChangeSummary {
    pub fn user_id(&self) -> &str {
        match self {
            ChangeSummary::NoUpdates { user_id }
            | ChangeSummary::Created { user_id }
            | ChangeSummary::Updated { user_id } => user_id,
        }
    }

    /// Whether the document was written.
    pub fn is_write(&self) -> bool {
        !matches!(self, ChangeSummary::NoUpdates { .. })
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeSummary::NoUpdates { user_id } => write!(f, "no updates for {user_id}"),
            ChangeSummary::Created { user_id } => write!(f, "create metadata for {user_id}"),
            ChangeSummary::Updated { user_id } => write!(f, "update metadata for {user_id}"),
        }
    }
}

/// Result of [`merge`].
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub metadata: Metadata,
    pub summary: ChangeSummary,
}

/// Fold `fresh` into the stored document for `user_id` and write it back.
///
/// Fresh contributions always win: a persisted contribution survives only if
/// its page was not observed by this run. Nothing is read or written when
/// `fresh` has no contributions.
#[instrument(skip_all, fields(user_id = %user_id, fresh = fresh.contributions().len()))]
pub fn merge(
    mut fresh: Metadata,
    user_id: &str,
    ctx: &BuildContext,
    store: &dyn MetadataStore,
) -> Result<MergeOutcome> {
    if fresh.contributions().is_empty() {
        return Ok(MergeOutcome {
            metadata: fresh,
            summary: ChangeSummary::NoUpdates {
                user_id: user_id.to_string(),
            },
        });
    }

    fresh.user_id = user_id.to_string();
    dedup_by_page(fresh.contributions_mut());

    let summary = match store.load(user_id)? {
        None => ChangeSummary::Created {
            user_id: user_id.to_string(),
        },
        Some(previous) => {
            let fresh_ids: HashSet<String> = fresh
                .contributions()
                .iter()
                .map(|c| c.page_id().to_string())
                .collect();
            let kept: Vec<Contribution> = previous
                .properties
                .contributions
                .into_iter()
                .filter(|c| !ctx.is_observed(c.page_id()) && !fresh_ids.contains(c.page_id()))
                .collect();
            debug!(kept = kept.len(), "carried over persisted contributions");
            fresh.contributions_mut().extend(kept);
            ChangeSummary::Updated {
                user_id: user_id.to_string(),
            }
        }
    };

    sort_contributions(fresh.contributions_mut());
    store.write(&fresh)?;

    Ok(MergeOutcome {
        metadata: fresh,
        summary,
    })
}

/// Stable ascending sort on `date.start`, compared as strings.
pub fn sort_contributions(contributions: &mut [Contribution]) {
    contributions.sort_by(|a, b| a.start().cmp(b.start()));
}

/// Drop repeated page ids, keeping the first occurrence.
fn dedup_by_page(contributions: &mut Vec<Contribution>) {
    let mut seen = HashSet::new();
    contributions.retain(|c| seen.insert(c.page_id().to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryStore, contribution, metadata, page_ids};
    use contribsync_shared::SyncError;

    #[test]
    fn empty_fresh_is_a_no_op() {
        let store = MemoryStore::with(vec![metadata("u1", vec![contribution("a", "2023-01-01", &[])])]);
        let ctx = BuildContext::new(None);

        let outcome = merge(metadata("u1", Vec::new()), "u1", &ctx, &store).expect("merge");

        assert_eq!(outcome.summary.to_string(), "no updates for u1");
        assert!(!outcome.summary.is_write());
        assert!(outcome.metadata.contributions().is_empty());
        assert_eq!(store.writes(), 0);
        assert_eq!(page_ids(&store.get("u1").unwrap()), vec!["a"]);
    }

    #[test]
    fn no_previous_document_creates_it() {
        let store = MemoryStore::default();
        let mut ctx = BuildContext::new(None);
        ctx.observe("b");
        ctx.observe("a");
        let fresh = metadata(
            "u1",
            vec![contribution("b", "2023-05-01", &[]), contribution("a", "2022-01-01", &[])],
        );

        let outcome = merge(fresh, "u1", &ctx, &store).expect("merge");

        assert_eq!(outcome.summary, ChangeSummary::Created { user_id: "u1".into() });
        assert_eq!(outcome.summary.to_string(), "create metadata for u1");
        assert_eq!(page_ids(&outcome.metadata), vec!["a", "b"]);
        assert_eq!(store.get("u1").unwrap(), outcome.metadata);
    }

    #[test]
    fn update_keeps_unobserved_and_sorts() {
        let store = MemoryStore::with(vec![metadata("u1", vec![contribution("A", "2023-01-01", &[])])]);
        let mut ctx = BuildContext::new(None);
        ctx.observe("B");
        let fresh = metadata("u1", vec![contribution("B", "2022-06-01", &[])]);

        let outcome = merge(fresh, "u1", &ctx, &store).expect("merge");

        assert_eq!(outcome.summary.to_string(), "update metadata for u1");
        assert_eq!(page_ids(&outcome.metadata), vec!["B", "A"]);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn fresh_supersedes_persisted_copy() {
        let mut stale = contribution("A", "2023-01-01", &[]);
        stale.name = "stale".into();
        let store = MemoryStore::with(vec![metadata("u1", vec![stale])]);
        let mut ctx = BuildContext::new(None);
        ctx.observe("A");
        let mut updated = contribution("A", "2023-01-01", &[]);
        updated.name = "renamed".into();

        let outcome = merge(metadata("u1", vec![updated]), "u1", &ctx, &store).expect("merge");

        assert_eq!(outcome.metadata.contributions().len(), 1);
        assert_eq!(outcome.metadata.contributions()[0].name, "renamed");
    }

    #[test]
    fn page_observed_but_no_longer_owned_is_dropped() {
        let store = MemoryStore::with(vec![metadata(
            "u1",
            vec![contribution("A", "2023-01-01", &[]), contribution("C", "2021-01-01", &[])],
        )]);
        let mut ctx = BuildContext::new(None);
        ctx.observe("A");
        ctx.observe("B");
        let fresh = metadata("u1", vec![contribution("B", "2024-01-01", &[])]);

        let outcome = merge(fresh, "u1", &ctx, &store).expect("merge");
        assert_eq!(page_ids(&outcome.metadata), vec!["C", "B"]);
    }

    #[test]
    fn page_ids_stay_unique() {
        let store = MemoryStore::with(vec![metadata("u1", vec![contribution("A", "2023-01-01", &[])])]);
        let ctx = BuildContext::new(None);
        let fresh = metadata(
            "u1",
            vec![
                contribution("A", "2023-01-01", &[]),
                contribution("B", "2023-02-01", &[]),
                contribution("B", "2023-02-01", &[]),
            ],
        );

        let outcome = merge(fresh, "u1", &ctx, &store).expect("merge");
        assert_eq!(page_ids(&outcome.metadata), vec!["A", "B"]);
    }

    #[test]
    fn equal_starts_keep_relative_order() {
        let mut items = vec![
            contribution("x", "2023-01-01", &[]),
            contribution("y", "2022-01-01", &[]),
            contribution("z", "2023-01-01", &[]),
        ];
        sort_contributions(&mut items);
        let ids: Vec<_> = items.iter().map(|c| c.page_id()).collect();
        assert_eq!(ids, vec!["y", "x", "z"]);
    }

    #[test]
    fn unreadable_document_is_an_error() {
        let mut store = MemoryStore::default();
        store.mark_corrupt("u1");
        let ctx = BuildContext::new(None);
        let fresh = metadata("u1", vec![contribution("A", "2023-01-01", &[])]);

        let err = merge(fresh, "u1", &ctx, &store).expect_err("corrupt");
        assert!(matches!(err, SyncError::Parse { .. }));
        assert_eq!(store.writes(), 0);
    }
}
