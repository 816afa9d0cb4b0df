//! Shared types, error model, and configuration for CourseLens.
//!
//! This crate is the foundation depended on by all other CourseLens crates.
//! It provides:
//! - [`CourseLensError`] — the unified error type
//! - Domain types ([`Metric`], [`EnrichmentResult`], [`CourseRecord`])
//! - Configuration ([`AppConfig`], [`GatewayConfig`], [`PageContract`],
//!   config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContractSection, DEFAULT_HOST, GatewayConfig, GatewaySection, PageContract,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{CourseLensError, Result};
pub use types::{CourseRecord, EnrichmentKind, EnrichmentResult, Metric};
