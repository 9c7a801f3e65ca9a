//! End-to-end `build` pipeline: feed → extract → geocode → cache → map.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};
use url::Url;

use sietsemap_feed::FeedOptions;
use sietsemap_geocode::Geocoder;
use sietsemap_render::MapOptions;
use sietsemap_shared::{AppConfig, Restaurant, Result, SietsemapError};
use sietsemap_storage::RestaurantCache;

/// Configuration for the `build` pipeline.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// RSS feed to scan.
    pub feed_url: Url,
    pub feed: FeedOptions,
    /// JSON cache file.
    pub cache_path: PathBuf,
    /// Rendered map page.
    pub map_path: PathBuf,
    pub map: MapOptions,
    /// Date stamped on newly added restaurants.
    pub today: NaiveDate,
}

impl BuildConfig {
    /// Resolve a build config from the app config.
    pub fn from_config(config: &AppConfig, today: NaiveDate) -> Result<Self> {
        let feed_url = Url::parse(&config.feed.url).map_err(|e| {
            SietsemapError::config(format!("invalid feed url '{}': {e}", config.feed.url))
        })?;

        Ok(Self {
            feed_url,
            feed: FeedOptions {
                timeout_secs: config.feed.timeout_secs,
            },
            cache_path: PathBuf::from(&config.output.cache_file),
            map_path: PathBuf::from(&config.output.map_file),
            map: MapOptions::from(&config.map),
            today,
        })
    }
}

/// Result of the `build` pipeline.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Posts in the feed.
    pub posts: usize,
    /// Address mentions extracted across all posts.
    pub candidates: usize,
    /// Mentions skipped because the address was already cached or seen.
    pub already_known: usize,
    /// Restaurants geocoded and added this run.
    pub added: usize,
    /// Addresses that failed to geocode (retried next run).
    pub geocode_failures: usize,
    /// Restaurants in the cache after this run.
    pub total: usize,
    pub map_path: PathBuf,
    pub cache_path: PathBuf,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a post's candidates have been extracted.
    fn post_scanned(&self, title: &str, current: usize, total: usize);
    /// Called after each geocoding attempt.
    fn geocoded(&self, address: &str, found: bool);
    /// Called when the pipeline completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn post_scanned(&self, _title: &str, _current: usize, _total: usize) {}
    fn geocoded(&self, _address: &str, _found: bool) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Run the full `build` pipeline.
///
/// 1. Load the cache
/// 2. Fetch the feed (fatal on failure)
/// 3. Extract candidates and geocode the unseen ones
/// 4. Save the cache
/// 5. Render the map from the whole cache
#[instrument(skip_all, fields(feed = %config.feed_url))]
pub async fn build<G: Geocoder>(
    config: &BuildConfig,
    geocoder: &G,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    let start = Instant::now();

    // --- Phase 1: Cache ---
    progress.phase("Loading cache");
    let mut cache = RestaurantCache::load(&config.cache_path)?;
    let cached_before = cache.len();

    // --- Phase 2: Feed ---
    progress.phase("Fetching feed");
    let posts = sietsemap_feed::fetch_feed(&config.feed_url, &config.feed).await?;

    // --- Phase 3: Extract & geocode ---
    progress.phase("Scanning posts");
    let date_added = config.today.format("%Y-%m-%d").to_string();
    let mut attempted: HashSet<String> = HashSet::new();
    let mut candidates = 0;
    let mut already_known = 0;
    let mut added = 0;
    let mut geocode_failures = 0;

    for (i, post) in posts.iter().enumerate() {
        let found = sietsemap_extract::extract_candidates(post);
        progress.post_scanned(&post.title, i + 1, posts.len());
        candidates += found.len();

        for candidate in found {
            if cache.contains(&candidate.address) || !attempted.insert(candidate.address.clone()) {
                debug!(address = %candidate.address, "already known");
                already_known += 1;
                continue;
            }

            match geocoder.geocode(&candidate.address).await {
                Ok(Some(coords)) => {
                    progress.geocoded(&candidate.address, true);
                    info!(name = %candidate.name, address = %candidate.address, "added");
                    cache.insert(Restaurant::from_candidate(candidate, coords, date_added.clone()));
                    added += 1;
                }
                Ok(None) => {
                    progress.geocoded(&candidate.address, false);
                    warn!(address = %candidate.address, "no geocoding result, will retry next run");
                    geocode_failures += 1;
                }
                Err(e) => {
                    progress.geocoded(&candidate.address, false);
                    warn!(address = %candidate.address, error = %e, "geocoding failed, will retry next run");
                    geocode_failures += 1;
                }
            }
        }
    }

    // --- Phase 4: Save ---
    progress.phase("Saving cache");
    cache.save()?;

    // --- Phase 5: Render ---
    progress.phase("Rendering map");
    sietsemap_render::write_map(&config.map_path, cache.restaurants(), &config.map)?;

    let report = BuildReport {
        posts: posts.len(),
        candidates,
        already_known,
        added,
        geocode_failures,
        total: cache.len(),
        map_path: config.map_path.clone(),
        cache_path: config.cache_path.clone(),
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        posts = report.posts,
        cached_before,
        added = report.added,
        failures = report.geocode_failures,
        total = report.total,
        elapsed_ms = report.elapsed.as_millis(),
        "build complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use sietsemap_geocode::NominatimGeocoder;
    use sietsemap_shared::{Coordinates, GeocoderConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = include_str!("../../../../fixtures/feed/substack.xml");

    const TANOREEN: &str = "7523 3rd Ave, Brooklyn, NY 11209";
    const AL_SHAM: &str = "7206 5th Ave, Brooklyn, NY 11209";
    const KYCLADES: &str = "3307 Ditmars Blvd, Queens, NY 11105";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    /// In-memory geocoder that records every lookup.
    #[derive(Default)]
    struct StubGeocoder {
        known: HashMap<String, Coordinates>,
        failing: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubGeocoder {
        fn with(entries: &[(&str, f64, f64)]) -> Self {
            Self {
                known: entries
                    .iter()
                    .map(|(a, lat, lon)| (a.to_string(), Coordinates { lat: *lat, lon: *lon }))
                    .collect(),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Geocoder for StubGeocoder {
        async fn geocode(&self, address: &str) -> Result<Option<Coordinates>> {
            self.calls.lock().unwrap().push(address.to_string());
            if self.failing.contains(address) {
                return Err(SietsemapError::Geocode(format!("{address}: HTTP 503")));
            }
            Ok(self.known.get(address).copied())
        }
    }

    async fn feed_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;
        server
    }

    fn config(server: &MockServer, dir: &std::path::Path) -> BuildConfig {
        BuildConfig {
            feed_url: Url::parse(&format!("{}/feed", server.uri())).unwrap(),
            feed: FeedOptions { timeout_secs: 5 },
            cache_path: dir.join("restaurants.json"),
            map_path: dir.join("public").join("index.html"),
            map: MapOptions::default(),
            today: today(),
        }
    }

    #[tokio::test]
    async fn build_adds_new_restaurants_and_writes_outputs() {
        let server = feed_server().await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, dir.path());
        let geocoder = StubGeocoder::with(&[
            (TANOREEN, 40.6311, -74.0275),
            (AL_SHAM, 40.6337, -74.0226),
            (KYCLADES, 40.7753, -73.9119),
        ]);

        let report = build(&cfg, &geocoder, &SilentProgress).await.unwrap();

        assert_eq!(report.posts, 3);
        assert_eq!(report.candidates, 4);
        assert_eq!(report.added, 3);
        assert_eq!(report.already_known, 1);
        assert_eq!(report.geocode_failures, 0);
        assert_eq!(report.total, 3);

        // Tanoreen appears twice in the feed but is geocoded once.
        assert_eq!(geocoder.calls(), vec![TANOREEN, AL_SHAM, KYCLADES]);

        let cache = RestaurantCache::load(&cfg.cache_path).unwrap();
        let names: Vec<&str> = cache.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Tanoreen", "Al Sham Sweets & Pastries", "Taverna Kyclades"]);
        assert!(cache.iter().all(|r| r.date_added == "2026-10-16"));

        let html = std::fs::read_to_string(&cfg.map_path).unwrap();
        assert!(html.contains("Taverna Kyclades"));
        assert!(html.contains("Al Sham Sweets &amp; Pastries"));
    }

    #[tokio::test]
    async fn second_run_adds_nothing() {
        let server = feed_server().await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, dir.path());
        let geocoder = StubGeocoder::with(&[
            (TANOREEN, 40.6311, -74.0275),
            (AL_SHAM, 40.6337, -74.0226),
            (KYCLADES, 40.7753, -73.9119),
        ]);

        build(&cfg, &geocoder, &SilentProgress).await.unwrap();
        let first = std::fs::read_to_string(&cfg.cache_path).unwrap();

        let rerun = StubGeocoder::default();
        let report = build(&cfg, &rerun, &SilentProgress).await.unwrap();

        assert_eq!(report.added, 0);
        assert_eq!(report.already_known, 4);
        assert_eq!(report.total, 3);
        assert!(rerun.calls().is_empty());
        assert_eq!(std::fs::read_to_string(&cfg.cache_path).unwrap(), first);
    }

    #[tokio::test]
    async fn geocode_failures_are_not_cached() {
        let server = feed_server().await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, dir.path());
        let mut geocoder = StubGeocoder::with(&[(TANOREEN, 40.6311, -74.0275)]);
        geocoder.failing.insert(KYCLADES.to_string());

        let report = build(&cfg, &geocoder, &SilentProgress).await.unwrap();

        // Al Sham: no result. Kyclades: error.
        assert_eq!(report.added, 1);
        assert_eq!(report.geocode_failures, 2);

        let cache = RestaurantCache::load(&cfg.cache_path).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains(AL_SHAM));
        assert!(!cache.contains(KYCLADES));

        // The next run tries them again.
        let retry = StubGeocoder::with(&[(AL_SHAM, 40.6337, -74.0226), (KYCLADES, 40.7753, -73.9119)]);
        let report = build(&cfg, &retry, &SilentProgress).await.unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(retry.calls(), vec![AL_SHAM, KYCLADES]);
    }

    #[tokio::test]
    async fn feed_failure_is_fatal_and_leaves_cache_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, dir.path());

        let result = build(&cfg, &StubGeocoder::default(), &SilentProgress).await;

        assert!(matches!(result, Err(SietsemapError::Network(_))));
        assert!(!cfg.cache_path.exists());
        assert!(!cfg.map_path.exists());
    }

    #[tokio::test]
    async fn build_against_mock_nominatim() {
        let server = feed_server().await;
        for (address, lat, lon) in [(TANOREEN, "40.6311", "-74.0275"), (AL_SHAM, "40.6337", "-74.0226")] {
            Mock::given(method("GET"))
                .and(path("/search"))
                .and(query_param("q", address))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!(r#"[{{"lat":"{lat}","lon":"{lon}"}}]"#)),
                )
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", KYCLADES))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&server, dir.path());
        let geocoder = NominatimGeocoder::new(&GeocoderConfig {
            base_url: server.uri(),
            rate_limit_ms: 0,
            ..GeocoderConfig::default()
        })
        .unwrap();

        let report = build(&cfg, &geocoder, &SilentProgress).await.unwrap();

        assert_eq!(report.added, 2);
        assert_eq!(report.geocode_failures, 1);
        let cache = RestaurantCache::load(&cfg.cache_path).unwrap();
        assert_eq!(cache.restaurants()[0].lat, 40.6311);
        assert_eq!(cache.restaurants()[1].lon, -74.0226);
    }

    #[test]
    fn config_from_app_config() {
        let app = AppConfig::default();
        let cfg = BuildConfig::from_config(&app, today()).unwrap();

        assert_eq!(cfg.feed_url.as_str(), "https://robertsietsema.substack.com/feed");
        assert_eq!(cfg.cache_path, PathBuf::from("restaurants.json"));
        assert_eq!(cfg.map_path, PathBuf::from("public/index.html"));
        assert_eq!(cfg.map.zoom, 11);
    }

    #[test]
    fn invalid_feed_url_is_config_error() {
        let mut app = AppConfig::default();
        app.feed.url = "not a url".into();
        assert!(matches!(
            BuildConfig::from_config(&app, today()),
            Err(SietsemapError::Config { .. })
        ));
    }
}
