//! Application configuration for Sietsemap.
//!
//! Config is looked up at `./sietsemap.toml`, then
//! `~/.sietsemap/sietsemap.toml`. CLI flags override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SietsemapError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sietsemap.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sietsemap";

// ---------------------------------------------------------------------------
// Config structs (matching sietsemap.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub geocoder: GeocoderConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub publish: PublishConfig,
}

/// `[feed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// RSS feed to scrape.
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            timeout_secs: default_feed_timeout(),
        }
    }
}

fn default_feed_url() -> String {
    "https://robertsietsema.substack.com/feed".into()
}
fn default_feed_timeout() -> u64 {
    30
}

/// `[geocoder]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Nominatim base URL (no trailing `/search`).
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,

    /// User-Agent sent to Nominatim. Their usage policy requires one
    /// that identifies the application.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,

    /// Minimum ms between consecutive geocoding requests.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_geocoder_timeout(),
            rate_limit_ms: default_rate_limit(),
        }
    }
}

fn default_geocoder_url() -> String {
    "https://nominatim.openstreetmap.org".into()
}
fn default_user_agent() -> String {
    "sietsemap-bot/0.1 (github action)".into()
}
fn default_geocoder_timeout() -> u64 {
    15
}
fn default_rate_limit() -> u64 {
    1000
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON cache of every restaurant seen so far.
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Rendered map page.
    #[serde(default = "default_map_file")]
    pub map_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            cache_file: default_cache_file(),
            map_file: default_map_file(),
        }
    }
}

fn default_cache_file() -> String {
    "restaurants.json".into()
}
fn default_map_file() -> String {
    "public/index.html".into()
}

/// `[map]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    #[serde(default = "default_center_lon")]
    pub center_lon: f64,

    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Tile layer name: "CartoDB positron" or "OpenStreetMap".
    #[serde(default = "default_tiles")]
    pub tiles: String,

    #[serde(default = "default_marker_color")]
    pub marker_color: String,

    /// Font Awesome icon name (without the `fa-` prefix).
    #[serde(default = "default_marker_icon")]
    pub marker_icon: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lon: default_center_lon(),
            zoom: default_zoom(),
            tiles: default_tiles(),
            marker_color: default_marker_color(),
            marker_icon: default_marker_icon(),
        }
    }
}

fn default_center_lat() -> f64 {
    40.73
}
fn default_center_lon() -> f64 {
    -73.94
}
fn default_zoom() -> u8 {
    11
}
fn default_tiles() -> String {
    "CartoDB positron".into()
}
fn default_marker_color() -> String {
    "darkblue".into()
}
fn default_marker_icon() -> String {
    "cutlery".into()
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Git remote to push to.
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Name of the env var holding the push token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Commit message prefix; the UTC date is appended.
    #[serde(default = "default_message_prefix")]
    pub message_prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,

    /// Paths to stage. Empty means the cache file plus the map's directory.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
            token_env: default_token_env(),
            message_prefix: default_message_prefix(),
            author_name: None,
            author_email: None,
            paths: Vec::new(),
        }
    }
}

fn default_remote() -> String {
    "origin".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_message_prefix() -> String {
    "Update Sietsemap".into()
}

impl AppConfig {
    /// Paths the publish step stages and checks for changes.
    pub fn publish_paths(&self) -> Vec<String> {
        if !self.publish.paths.is_empty() {
            return self.publish.paths.clone();
        }

        let map_dir = Path::new(&self.output.map_file)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| self.output.map_file.clone());

        vec![self.output.cache_file.clone(), map_dir]
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sietsemap/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SietsemapError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.sietsemap/sietsemap.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config.
///
/// Prefers `./sietsemap.toml` (the repository being published), then the
/// user config. Returns defaults if neither exists.
pub fn load_config() -> Result<AppConfig> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    let path = config_file_path()?;
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SietsemapError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SietsemapError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the user config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| SietsemapError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| SietsemapError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| SietsemapError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("robertsietsema.substack.com"));
        assert!(toml_str.contains("GITHUB_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.geocoder.rate_limit_ms, 1000);
        assert_eq!(parsed.map.zoom, 11);
        assert_eq!(parsed.output.map_file, "public/index.html");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[feed]
url = "https://example.com/feed"

[publish]
message_prefix = "Refresh map"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.feed.url, "https://example.com/feed");
        assert_eq!(config.feed.timeout_secs, 30);
        assert_eq!(config.publish.message_prefix, "Refresh map");
        assert_eq!(config.publish.remote, "origin");
        assert_eq!(config.geocoder.timeout_secs, 15);
    }

    #[test]
    fn publish_paths_default_to_outputs() {
        let config = AppConfig::default();
        assert_eq!(
            config.publish_paths(),
            vec!["restaurants.json".to_string(), "public".to_string()]
        );
    }

    #[test]
    fn publish_paths_for_top_level_map() {
        let mut config = AppConfig::default();
        config.output.map_file = "map.html".into();
        assert_eq!(
            config.publish_paths(),
            vec!["restaurants.json".to_string(), "map.html".to_string()]
        );

        config.publish.paths = vec!["docs".into()];
        assert_eq!(config.publish_paths(), vec!["docs".to_string()]);
    }

    #[test]
    fn init_config_at_writes_loadable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        init_config_at(&path).expect("init");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.map.tiles, "CartoDB positron");
    }

    #[test]
    fn invalid_config_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[feed\nurl = ").expect("write");

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, SietsemapError::Config { .. }));
    }
}
