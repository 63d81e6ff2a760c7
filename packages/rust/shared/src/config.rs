//! Application configuration for contribsync.
//!
//! User config lives at `~/.contribsync/contribsync.toml` unless a path is
//! given explicitly. CLI flags override config file values, which override
//! defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SyncError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contribsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contribsync";

// ---------------------------------------------------------------------------
// Config structs (matching contribsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Notion API settings.
    #[serde(default)]
    pub notion: NotionConfig,

    /// Source database ids.
    #[serde(default)]
    pub databases: DatabasesConfig,

    /// Property ids used to address page fields.
    #[serde(default)]
    pub properties: PropertyIds,

    /// Output locations and fixed document values.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[notion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    /// Name of the env var holding the integration token (never store the token itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// REST API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Value of the `Notion-Version` header.
    #[serde(default = "default_notion_version")]
    pub version: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size for database queries and property lists (max 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            version: default_notion_version(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

fn default_api_key_env() -> String {
    "NOTION_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.notion.com/v1".into()
}
fn default_notion_version() -> String {
    "2022-06-28".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_page_size() -> u32 {
    100
}

/// `[databases]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabasesConfig {
    /// Database holding one profile page per user.
    #[serde(default)]
    pub users: String,

    /// Database holding contribution pages.
    #[serde(default)]
    pub contributions: String,
}

/// `[properties]` section: ids of the page properties the sync reads.
///
/// Every key is required once the section is present, so a typo fails at
/// config load instead of at the first page fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyIds {
    /// Title property.
    pub name: String,
    /// Files property holding the contribution image.
    pub image: String,
    /// Rich-text description.
    pub description: String,
    /// Date range.
    pub date: String,
    /// Rich-text property listing owning user ids.
    pub user_id: String,
    /// Files property holding the profile icon on user pages.
    pub icon: String,
}

impl Default for PropertyIds {
    fn default() -> Self {
        Self {
            name: "name".into(),
            image: "image".into(),
            description: "description".into(),
            date: "date".into(),
            user_id: "userId".into(),
            icon: "icon".into(),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory holding `{user_id}.json` documents.
    #[serde(default = "default_metadata_dir")]
    pub metadata_dir: String,

    /// File recording the last successful run.
    #[serde(default = "default_run_log")]
    pub run_log: String,

    /// Public site that page short ids are appended to.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Fixed description written into every user document.
    #[serde(default = "default_user_description")]
    pub user_description: String,

    /// Users-database property matched exactly against a user id.
    #[serde(default = "default_user_filter_property")]
    pub user_filter_property: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metadata_dir: default_metadata_dir(),
            run_log: default_run_log(),
            public_base_url: default_public_base_url(),
            user_description: default_user_description(),
            user_filter_property: default_user_filter_property(),
        }
    }
}

fn default_metadata_dir() -> String {
    "metadata".into()
}
fn default_run_log() -> String {
    "log/last_execution.json".into()
}
fn default_public_base_url() -> String {
    "https://wagumi-dev.notion.site/".into()
}
fn default_user_description() -> String {
    "He/She is one of wagumi members.".into()
}
fn default_user_filter_property() -> String {
    "id".into()
}

// ---------------------------------------------------------------------------
// Sync settings (runtime, validated from config)
// ---------------------------------------------------------------------------

/// Validated settings the sync pipeline runs with.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub user_db_id: String,
    pub contribution_db_id: String,
    pub properties: PropertyIds,
    pub public_base_url: Url,
    pub user_description: String,
    pub user_filter_property: String,
    pub metadata_dir: PathBuf,
    pub run_log: PathBuf,
}

impl TryFrom<&AppConfig> for SyncSettings {
    type Error = SyncError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        if config.databases.users.trim().is_empty() {
            return Err(SyncError::config("databases.users is not set"));
        }
        if config.databases.contributions.trim().is_empty() {
            return Err(SyncError::config("databases.contributions is not set"));
        }

        let public_base_url = Url::parse(&config.output.public_base_url).map_err(|e| {
            SyncError::config(format!(
                "invalid output.public_base_url '{}': {e}",
                config.output.public_base_url
            ))
        })?;

        Ok(Self {
            user_db_id: config.databases.users.clone(),
            contribution_db_id: config.databases.contributions.clone(),
            properties: config.properties.clone(),
            public_base_url,
            user_description: config.output.user_description.clone(),
            user_filter_property: config.output.user_filter_property.clone(),
            metadata_dir: PathBuf::from(&config.output.metadata_dir),
            run_log: PathBuf::from(&config.output.run_log),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contribsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| SyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contribsync/contribsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SyncError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file to `path`, or to the default location.
/// Returns the path to the created file.
pub fn init_config(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| SyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the Notion integration token from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.notion.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SyncError::config(format!(
            "Notion API key not found. Set the {var_name} environment variable."
        ))),
    }
}
