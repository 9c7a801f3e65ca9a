//! Leaflet map page generation.
//!
//! Renders every cached restaurant as a marker on a standalone HTML page
//! (Leaflet, Leaflet.awesome-markers, and Font Awesome from CDNs). Popups
//! show the escaped name, address, and blurb.

mod template;

use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use sietsemap_shared::{Coordinates, MapConfig, Restaurant, Result, SietsemapError};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Base map tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLayer {
    CartoDbPositron,
    OpenStreetMap,
}

impl TileLayer {
    /// Resolve a config name. Unknown names fall back to OpenStreetMap.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "cartodb positron" | "cartodbpositron" | "cartodb.positron" => Self::CartoDbPositron,
            _ => Self::OpenStreetMap,
        }
    }

    fn url(self) -> &'static str {
        match self {
            Self::CartoDbPositron => "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
            Self::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        }
    }

    fn attribution(self) -> &'static str {
        match self {
            Self::CartoDbPositron => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>"
            }
            Self::OpenStreetMap => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
            }
        }
    }
}

/// Rendering options, usually built from the `[map]` config section.
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub title: String,
    pub center: Coordinates,
    pub zoom: u8,
    pub tiles: TileLayer,
    pub marker_color: String,
    pub marker_icon: String,
}

impl From<&MapConfig> for MapOptions {
    fn from(config: &MapConfig) -> Self {
        Self {
            title: "Sietsemap".into(),
            center: Coordinates {
                lat: config.center_lat,
                lon: config.center_lon,
            },
            zoom: config.zoom,
            tiles: TileLayer::from_name(&config.tiles),
            marker_color: config.marker_color.clone(),
            marker_icon: config.marker_icon.clone(),
        }
    }
}

impl Default for MapOptions {
    fn default() -> Self {
        Self::from(&MapConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Per-marker data embedded in the page.
#[derive(Debug, Serialize)]
struct Marker {
    lat: f64,
    lon: f64,
    popup: String,
    tooltip: String,
}

/// Render the full HTML page.
#[instrument(skip_all, fields(markers = restaurants.len()))]
pub fn render_map(restaurants: &[Restaurant], opts: &MapOptions) -> Result<String> {
    let markers: Vec<Marker> = restaurants
        .iter()
        .map(|r| Marker {
            lat: r.lat,
            lon: r.lon,
            popup: popup_html(r),
            tooltip: escape_html(&r.name),
        })
        .collect();

    let values = [
        ("TITLE", escape_html(&opts.title)),
        ("CENTER_LAT", opts.center.lat.to_string()),
        ("CENTER_LON", opts.center.lon.to_string()),
        ("ZOOM", opts.zoom.to_string()),
        ("TILE_URL", script_json(opts.tiles.url())?),
        ("TILE_ATTRIBUTION", script_json(opts.tiles.attribution())?),
        ("MARKER_ICON", script_json(&opts.marker_icon)?),
        ("MARKER_COLOR", script_json(&opts.marker_color)?),
        ("MARKERS", script_json(&markers)?),
    ];

    Ok(fill(template::PAGE, &values))
}

/// Render and write the page to `path`.
pub fn write_map(path: &Path, restaurants: &[Restaurant], opts: &MapOptions) -> Result<()> {
    let html = render_map(restaurants, opts)?;
    sietsemap_storage::write_atomic(path, html.as_bytes())?;

    info!(path = %path.display(), markers = restaurants.len(), "map written");
    Ok(())
}

/// Popup body: bold name, address, rule, blurb.
pub fn popup_html(r: &Restaurant) -> String {
    format!(
        "<b>{}</b><br>{}<br><hr style='margin:4px'>{}",
        escape_html(&r.name),
        escape_html(&r.address),
        escape_html(&r.blurb)
    )
}

/// Escape `& < > " '` for HTML text and attribute contexts.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON-encode a value for inline `<script>` use.
///
/// `<` only occurs inside JSON strings, so rewriting it as `\u003c` keeps
/// the encoding valid while making `</script>` and `<!--` impossible.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)
        .map_err(|e| SietsemapError::validation(format!("failed to encode map data: {e}")))?;
    Ok(json.replace('<', "\\u003c"))
}

/// Single-pass `{{KEY}}` substitution; substituted text is never rescanned.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];

        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };

        let key = &after[..close];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name: &str, blurb: &str) -> Restaurant {
        Restaurant {
            name: name.into(),
            address: "7523 3rd Ave, Brooklyn, NY 11209".into(),
            blurb: blurb.into(),
            lat: 40.6311,
            lon: -74.0275,
            date_added: "2026-10-16".into(),
        }
    }

    #[test]
    fn escape_html_covers_all_specials() {
        assert_eq!(
            escape_html(r#"Tom & Jerry's <"Diner">"#),
            "Tom &amp; Jerry&#x27;s &lt;&quot;Diner&quot;&gt;"
        );
    }

    #[test]
    fn popup_layout() {
        let popup = popup_html(&restaurant("Sweets & Co", "Baklava"));
        assert_eq!(
            popup,
            "<b>Sweets &amp; Co</b><br>7523 3rd Ave, Brooklyn, NY 11209<br><hr style='margin:4px'>Baklava"
        );
    }

    #[test]
    fn renders_default_page() {
        let html = render_map(&[restaurant("Tanoreen", "Fatteh")], &MapOptions::default()).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("setView([40.73, -73.94], 11)"));
        assert!(html.contains("basemaps.cartocdn.com/light_all"));
        assert!(html.contains(r#"icon: "cutlery""#));
        assert!(html.contains(r#"markerColor: "darkblue""#));
        assert!(html.contains("\"lat\":40.6311"));
        assert!(html.contains("Tanoreen"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn empty_cache_still_renders() {
        let html = render_map(&[], &MapOptions::default()).unwrap();
        assert!(html.contains("var restaurants = [];"));
    }

    #[test]
    fn script_breakout_is_neutralised() {
        let html = render_map(
            &[restaurant("</script><script>alert(1)</script>", "<!-- {{ZOOM}}")],
            &MapOptions::default(),
        )
        .unwrap();

        // Only the template's own three script tags close.
        assert_eq!(html.matches("</script>").count(), 3);
        assert!(!html.contains("alert(1)</script>"));
        assert!(!html.contains("<!--"));
        // Placeholder text inside data is not substituted.
        assert!(html.contains("{{ZOOM}}"));
    }

    #[test]
    fn unknown_tiles_fall_back_to_osm() {
        assert_eq!(TileLayer::from_name("CartoDB positron"), TileLayer::CartoDbPositron);
        assert_eq!(TileLayer::from_name("Stamen Toner"), TileLayer::OpenStreetMap);

        let opts = MapOptions {
            tiles: TileLayer::from_name("whatever"),
            ..MapOptions::default()
        };
        let html = render_map(&[], &opts).unwrap();
        assert!(html.contains("tile.openstreetmap.org"));
    }

    #[test]
    fn fill_leaves_unknown_keys_alone() {
        let out = fill("a {{X}} b {{Y}} c {{", &[("X", "1".into())]);
        assert_eq!(out, "a 1 b {{Y}} c {{");
    }

    #[test]
    fn write_map_creates_public_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("index.html");

        write_map(&path, &[restaurant("Tanoreen", "Fatteh")], &MapOptions::default()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Tanoreen"));
    }
}
