//! JSON-file restaurant cache.
//!
//! [`RestaurantCache`] holds every restaurant geocoded so far, keyed by
//! address, in insertion order. It is persisted as a pretty-printed JSON
//! array (`restaurants.json`) so it diffs cleanly in git.
//!
//! **Invariants:**
//! - `insert` never adds a second record for a known address
//! - entries are only ever appended; records loaded from disk are kept as-is
//! - every entry carries coordinates

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use sietsemap_shared::{Restaurant, Result, SietsemapError};

/// Persistent set of geocoded restaurants.
#[derive(Debug)]
pub struct RestaurantCache {
    path: PathBuf,
    restaurants: Vec<Restaurant>,
    addresses: HashSet<String>,
}

impl RestaurantCache {
    /// Load the cache at `path`. A missing file is an empty cache.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("cache file not found, starting empty");
            return Ok(Self::empty(path));
        }

        let content = std::fs::read_to_string(path).map_err(|e| SietsemapError::io(path, e))?;

        let loaded: Vec<Restaurant> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&content).map_err(|e| {
                SietsemapError::Storage(format!("invalid cache file {}: {e}", path.display()))
            })?
        };

        let mut cache = Self::empty(path);
        let mut duplicates = 0;
        for restaurant in loaded {
            // Older caches may repeat an address; keep the record, index it once.
            if !cache.addresses.insert(restaurant.address.clone()) {
                duplicates += 1;
            }
            cache.restaurants.push(restaurant);
        }

        if duplicates > 0 {
            warn!(duplicates, "cache contains repeated addresses");
        }
        info!(restaurants = cache.len(), "cache loaded");
        Ok(cache)
    }

    /// An empty cache that will be saved to `path`.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            restaurants: Vec::new(),
            addresses: HashSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    /// Append a restaurant. Returns `false` (and drops it) if the address is
    /// already cached.
    pub fn insert(&mut self, restaurant: Restaurant) -> bool {
        if !self.addresses.insert(restaurant.address.clone()) {
            return false;
        }
        self.restaurants.push(restaurant);
        true
    }

    pub fn len(&self) -> usize {
        self.restaurants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restaurants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Restaurant> {
        self.restaurants.iter()
    }

    /// All restaurants, in insertion order.
    pub fn restaurants(&self) -> &[Restaurant] {
        &self.restaurants
    }

    /// Write the cache to its path atomically.
    #[instrument(skip_all, fields(path = %self.path.display(), restaurants = self.len()))]
    pub fn save(&self) -> Result<()> {
        let mut json = to_pretty_json(&self.restaurants)?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes())?;

        debug!("cache saved");
        Ok(())
    }
}

/// Serialize with 2-space indentation.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| SietsemapError::Storage(format!("failed to serialize cache: {e}")))
}

/// Write `content` to `target` via a temp sibling and rename.
///
/// Parent directories are created as needed.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| SietsemapError::io(parent, e))?;

    let file_name = target
        .file_name()
        .ok_or_else(|| SietsemapError::validation(format!("not a file path: {}", target.display())))?;
    let temp = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

    std::fs::write(&temp, content).map_err(|e| SietsemapError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| SietsemapError::io(target, e))?;

    Ok(())
}
