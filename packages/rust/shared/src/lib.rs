//! Shared types, error model, and configuration for contribsync.
//!
//! This crate is the foundation depended on by all other contribsync crates.
//! It provides:
//! - [`SyncError`], the unified error type
//! - Domain types ([`Contribution`], [`Metadata`], [`RunLog`])
//! - Configuration ([`AppConfig`], [`PropertyIds`], [`SyncSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabasesConfig, NotionConfig, OutputConfig, PropertyIds, SyncSettings,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{Result, SyncError};
pub use types::{
    Contribution, ContributionProperties, DateRange, Metadata, MetadataProperties, RunLog,
    metadata_filename, validate_user_id,
};
