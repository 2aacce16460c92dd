//! Shared types, error model, and configuration for comparekit.
//!
//! This crate is the foundation depended on by all other comparekit crates.
//! It provides:
//! - [`ComparekitError`] is the unified error type
//! - Domain types ([`CatalogEntry`], [`EnrichedEntry`], [`LocaleBundle`], [`Locale`])
//! - Configuration ([`AppConfig`], config loading, credential lookup)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletenessMode, EnrichmentPolicyConfig, PathsConfig, ProviderConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    validate_config,
};
pub use error::{ComparekitError, Result};
pub use types::{
    CatalogEntry, DEFAULT_KEY_COLUMN, EnrichedEntry, LIST_SEPARATOR, Locale, LocaleBundle,
    RATING_COLUMN, enrichment_columns, is_enrichment_column, join_list, split_list,
};
