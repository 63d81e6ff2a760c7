//! End-to-end sync: content source → contributions → per-user merge → store.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use contribsync_notion::DatabaseQuery;
use contribsync_shared::{Result, RunLog, SyncError, SyncSettings, validate_user_id};
use contribsync_storage::{MetadataStore, RunLogFile};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::context::BuildContext;
use crate::contribution::ContributionBuilder;
use crate::grouping::group_by_user;
use crate::merge::{ChangeSummary, merge};
use crate::metadata::MetadataBuilder;
use crate::source::ContentSource;

/// How contributions are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Scan every contribution page and rebuild each owner's document.
    Full,
    /// Only pages edited after `since`, or after the run log's last
    /// execution time when `since` is `None`.
    Incremental { since: Option<DateTime<Utc>> },
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Full => f.write_str("full"),
            SyncMode::Incremental { .. } => f.write_str("incremental"),
        }
    }
}

/// What happens when one user fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run and return the error.
    #[default]
    Abort,
    /// Record the failure and continue with the next user.
    SkipUser,
}

/// Options for [`run_sync`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Restrict the run to these user ids. Empty means every known user.
    pub users: Vec<String>,
    pub failure_policy: FailurePolicy,
}

impl SyncOptions {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            users: Vec::new(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// A user skipped under [`FailurePolicy::SkipUser`].
#[derive(Debug)]
pub struct UserFailure {
    pub user_id: String,
    pub error: SyncError,
}

/// Result of [`run_sync`].
#[derive(Debug)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub mode: SyncMode,
    /// One entry per processed user, in processing order.
    pub summaries: Vec<ChangeSummary>,
    pub failures: Vec<UserFailure>,
    /// Contribution pages seen by this run.
    pub pages_observed: usize,
    /// Whether the run log was rewritten with this run's start time.
    pub run_log_advanced: bool,
    pub elapsed: Duration,
}

impl SyncReport {
    /// Number of documents written.
    pub fn written(&self) -> usize {
        self.summaries.iter().filter(|s| s.is_write()).count()
    }
}

/// Progress callback for reporting sync status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a user is processed.
    fn user_started(&self, user_id: &str, current: usize, total: usize);
    /// Called after a user's document was merged.
    fn user_finished(&self, summary: &ChangeSummary);
    /// Called when a user is skipped after an error.
    fn user_failed(&self, user_id: &str, error: &SyncError);
    /// Called when the sync completes.
    fn done(&self, report: &SyncReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn user_started(&self, _user_id: &str, _current: usize, _total: usize) {}
    fn user_finished(&self, _summary: &ChangeSummary) {}
    fn user_failed(&self, _user_id: &str, _error: &SyncError) {}
    fn done(&self, _report: &SyncReport) {}
}

/// Per-mode state resolved before the user loop.
enum Plan {
    Full { groups: BTreeMap<String, Vec<String>> },
    Incremental { since: DateTime<Utc> },
}

/// Run a sync.
///
/// 1. Resolve the mode's lower bound (incremental only)
/// 2. Full: scan and build every contribution page, then group by owner
/// 3. Resolve target users
/// 4. Build, merge, and write each user's document in turn
/// 5. Advance the run log if every user was covered without failure
#[instrument(skip_all, fields(mode = %options.mode))]
pub async fn run_sync<S: ContentSource>(
    source: &S,
    settings: &SyncSettings,
    store: &dyn MetadataStore,
    run_log: &RunLogFile,
    options: &SyncOptions,
    progress: &dyn ProgressReporter,
) -> Result<SyncReport> {
    let start = Instant::now();
    let targets = normalize_targets(&options.users)?;

    let since = match options.mode {
        SyncMode::Full => None,
        SyncMode::Incremental { since: Some(since) } => Some(since),
        SyncMode::Incremental { since: None } => {
            progress.phase("Reading run log");
            let log = run_log.load()?.ok_or_else(|| {
                SyncError::validation(format!(
                    "no run recorded at {}; pass --since or run a full sync first",
                    run_log.path().display()
                ))
            })?;
            Some(log.last_execution_time)
        }
    };

    let mut ctx = BuildContext::new(since);
    info!(run_id = %ctx.run_id(), since = ?since, "starting sync");

    let metadata_builder = MetadataBuilder::new(source, settings);

    let plan = match since {
        None => {
            progress.phase("Scanning contributions");
            scan_contributions(source, settings, &mut ctx).await?;
            Plan::Full {
                groups: group_by_user(ctx.contributions()),
            }
        }
        Some(since) => Plan::Incremental { since },
    };

    let users = if !targets.is_empty() {
        targets.clone()
    } else {
        match &plan {
            Plan::Full { groups } => groups.keys().cloned().collect(),
            Plan::Incremental { .. } => {
                progress.phase("Listing users");
                metadata_builder.list_user_ids().await?
            }
        }
    };

    progress.phase("Updating metadata");
    let mut summaries = Vec::with_capacity(users.len());
    let mut failures = Vec::new();
    let total = users.len();

    for (i, user_id) in users.iter().enumerate() {
        progress.user_started(user_id, i + 1, total);

        let result = match &plan {
            Plan::Full { groups } => {
                let page_ids = groups.get(user_id).map(Vec::as_slice).unwrap_or_default();
                sync_full_user(&metadata_builder, user_id, page_ids, &ctx, store).await
            }
            Plan::Incremental { since } => {
                sync_incremental_user(&metadata_builder, user_id, *since, &mut ctx, store).await
            }
        };

        match result {
            Ok(summary) => {
                info!(user_id = %user_id, "{summary}");
                progress.user_finished(&summary);
                summaries.push(summary);
            }
            Err(error) => match options.failure_policy {
                FailurePolicy::Abort => return Err(error),
                FailurePolicy::SkipUser => {
                    warn!(user_id = %user_id, error = %error, "user failed, skipping");
                    progress.user_failed(user_id, &error);
                    failures.push(UserFailure {
                        user_id: user_id.clone(),
                        error,
                    });
                }
            },
        }
    }

    let run_log_advanced = targets.is_empty() && failures.is_empty();
    if run_log_advanced {
        run_log.save(&RunLog {
            last_execution_time: ctx.started_at(),
            run_id: Some(ctx.run_id()),
        })?;
    }

    let report = SyncReport {
        run_id: ctx.run_id(),
        mode: options.mode,
        summaries,
        failures,
        pages_observed: ctx.observed_count(),
        run_log_advanced,
        elapsed: start.elapsed(),
    };

    info!(
        users = total,
        written = report.written(),
        failed = report.failures.len(),
        pages_observed = report.pages_observed,
        run_log_advanced,
        elapsed_ms = report.elapsed.as_millis(),
        "sync complete"
    );

    progress.done(&report);
    Ok(report)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build every contribution page into the run's cache.
async fn scan_contributions<S: ContentSource>(
    source: &S,
    settings: &SyncSettings,
    ctx: &mut BuildContext,
) -> Result<()> {
    let pages = source
        .query_database(&settings.contribution_db_id, &DatabaseQuery::all())
        .await?;
    let builder = ContributionBuilder::new(source, &settings.properties, &settings.public_base_url);
    for page in &pages {
        ctx.insert(builder.build(page).await?);
    }
    info!(pages = pages.len(), "contribution scan complete");
    Ok(())
}

async fn sync_full_user<S: ContentSource>(
    builder: &MetadataBuilder<'_, S>,
    user_id: &str,
    page_ids: &[String],
    ctx: &BuildContext,
    store: &dyn MetadataStore,
) -> Result<ChangeSummary> {
    if page_ids.is_empty() {
        return Ok(ChangeSummary::NoUpdates {
            user_id: user_id.to_string(),
        });
    }
    let fresh = builder.from_pages(user_id, page_ids, ctx).await?;
    Ok(merge(fresh, user_id, ctx, store)?.summary)
}

async fn sync_incremental_user<S: ContentSource>(
    builder: &MetadataBuilder<'_, S>,
    user_id: &str,
    since: DateTime<Utc>,
    ctx: &mut BuildContext,
    store: &dyn MetadataStore,
) -> Result<ChangeSummary> {
    let fresh = builder.since(user_id, since, ctx).await?;
    Ok(merge(fresh, user_id, ctx, store)?.summary)
}

/// Trim, reject ids unusable as file names, drop repeats; order is kept.
fn normalize_targets(users: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for user in users {
        let user = user.trim();
        validate_user_id(user)?;
        if seen.insert(user.to_string()) {
            targets.push(user.to_string());
        }
    }
    Ok(targets)
}
