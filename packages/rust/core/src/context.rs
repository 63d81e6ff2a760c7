//! Per-run build state passed explicitly through builders and merge.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use contribsync_shared::Contribution;
use uuid::Uuid;

/// What the current run has seen of the content source.
///
/// Holds the page → contribution cache filled by a full scan and the set of
/// page ids observed by this run. The merge step treats an observed page as
/// authoritative: a persisted copy of it is superseded, never kept. A context
/// lives for one run only.
#[derive(Debug)]
pub struct BuildContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    last_execution_time: Option<DateTime<Utc>>,
    contributions: HashMap<String, Contribution>,
    observed: HashSet<String>,
}

impl BuildContext {
    pub fn new(last_execution_time: Option<DateTime<Utc>>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            last_execution_time,
            contributions: HashMap::new(),
            observed: HashSet::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Lower bound of an incremental run.
    pub fn last_execution_time(&self) -> Option<DateTime<Utc>> {
        self.last_execution_time
    }

    /// Cache a built contribution and mark its page observed.
    pub fn insert(&mut self, contribution: Contribution) {
        self.observed.insert(contribution.page_id().to_string());
        self.contributions
            .insert(contribution.page_id().to_string(), contribution);
    }

    /// Mark a page observed without caching a contribution for it.
    pub fn observe(&mut self, page_id: impl Into<String>) {
        self.observed.insert(page_id.into());
    }

    pub fn is_observed(&self, page_id: &str) -> bool {
        self.observed.contains(page_id)
    }

    pub fn contribution(&self, page_id: &str) -> Option<&Contribution> {
        self.contributions.get(page_id)
    }

    pub fn contributions(&self) -> &HashMap<String, Contribution> {
        &self.contributions
    }

    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }
}
