//! Shared types, error model, and configuration for Sietsemap.
//!
//! This crate is the foundation depended on by all other Sietsemap crates.
//! It provides:
//! - [`SietsemapError`]: the unified error type
//! - Domain types ([`Post`], [`Candidate`], [`Coordinates`], [`Restaurant`])
//! - Configuration ([`AppConfig`] and its sections, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FeedConfig, GeocoderConfig, MapConfig, OutputConfig, PublishConfig, config_dir,
    config_file_path, init_config, init_config_at, load_config, load_config_from,
};
pub use error::{Result, SietsemapError};
pub use types::{Candidate, Coordinates, Post, Restaurant};
