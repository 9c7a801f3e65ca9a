//! Pipeline orchestration for Sietsemap.
//!
//! Ties the feed, extraction, geocoding, cache, and map crates together into
//! the daily `build` run.

pub mod pipeline;

pub use pipeline::{BuildConfig, BuildReport, ProgressReporter, SilentProgress, build};
