//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use contribsync_core::{
    ChangeSummary, FailurePolicy, ProgressReporter, SyncMode, SyncOptions, SyncReport, run_sync,
};
use contribsync_notion::NotionClient;
use contribsync_shared::{
    AppConfig, SyncError, SyncSettings, init_config, load_config, load_config_from,
    resolve_api_key,
};
use contribsync_storage::{FsMetadataStore, RunLogFile};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// contribsync: publish per-user contribution metadata from Notion.
#[derive(Parser)]
#[command(
    name = "contribsync",
    version,
    about = "Sync per-user contribution metadata documents from a Notion database.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.contribsync/contribsync.toml).
    #[arg(long, global = true, env = "CONTRIBSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Rebuild documents from every contribution page.
    Full {
        #[command(flatten)]
        targets: TargetArgs,
    },

    /// Apply pages edited since the last successful run.
    Update {
        #[command(flatten)]
        targets: TargetArgs,

        /// Lower bound (RFC 3339 or YYYY-MM-DD); overrides the run log.
        #[arg(long, value_parser = parse_since)]
        since: Option<DateTime<Utc>>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// User selection and failure handling shared by sync commands.
#[derive(Args, Debug, Clone)]
pub(crate) struct TargetArgs {
    /// Only sync this user id (can be specified multiple times).
    #[arg(short, long = "user")]
    pub users: Vec<String>,

    /// Skip users that fail instead of stopping the run.
    #[arg(long)]
    pub keep_going: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Parse `--since`: a full RFC 3339 timestamp or a bare date (midnight UTC).
fn parse_since(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("'{value}' is neither an RFC 3339 timestamp nor YYYY-MM-DD"))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "contribsync=info",
        1 => "contribsync=debug",
        _ => "contribsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Full { targets } => cmd_sync(config_path, SyncMode::Full, targets).await,
        Command::Update { targets, since } => {
            cmd_sync(config_path, SyncMode::Incremental { since }, targets).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn read_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_sync(config_path: Option<&Path>, mode: SyncMode, targets: TargetArgs) -> Result<()> {
    let config = read_config(config_path)?;
    let settings = SyncSettings::try_from(&config)?;
    // Validate the token before touching the store.
    let token = resolve_api_key(&config)?;
    let client = NotionClient::new(token, &config.notion)?;

    let store = FsMetadataStore::new(&settings.metadata_dir);
    let run_log = RunLogFile::new(&settings.run_log);
    let options = SyncOptions {
        mode,
        users: targets.users,
        failure_policy: if targets.keep_going {
            FailurePolicy::SkipUser
        } else {
            FailurePolicy::Abort
        },
    };

    info!(
        %mode,
        users = options.users.len(),
        metadata_dir = %settings.metadata_dir.display(),
        "sync requested"
    );

    let reporter = CliProgress::new();
    let report = run_sync(&client, &settings, &store, &run_log, &options, &reporter).await?;

    print_report(&report, store.root());

    if !report.failures.is_empty() {
        return Err(eyre!(
            "{} of {} user(s) failed",
            report.failures.len(),
            report.failures.len() + report.summaries.len()
        ));
    }
    Ok(())
}

fn print_report(report: &SyncReport, metadata_dir: &Path) {
    println!();
    for summary in &report.summaries {
        println!("  {summary}");
    }
    for failure in &report.failures {
        println!("  failed {}: {}", failure.user_id, failure.error);
    }
    println!();
    println!("  Mode:     {}", report.mode);
    println!("  Run:      {}", report.run_id);
    println!("  Written:  {}", report.written());
    println!("  Pages:    {}", report.pages_observed);
    println!("  Output:   {}", metadata_dir.display());
    println!(
        "  Run log:  {}",
        if report.run_log_advanced { "advanced" } else { "unchanged" }
    );
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = read_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn user_started(&self, user_id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Syncing [{current}/{total}] {user_id}"));
    }

    fn user_finished(&self, _summary: &ChangeSummary) {
        self.spinner.tick();
    }

    fn user_failed(&self, user_id: &str, error: &SyncError) {
        self.spinner.println(format!("  skipped {user_id}: {error}"));
    }

    fn done(&self, _report: &SyncReport) {
        self.spinner.finish_and_clear();
    }
}
