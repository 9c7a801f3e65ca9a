//! Core domain types: feed posts, extracted candidates, and cached restaurants.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A single post pulled from the RSS feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post title (`"Untitled"` when the feed omits it).
    pub title: String,
    /// Raw publication date as it appears in the feed (may be empty).
    pub published: String,
    /// Full HTML body of the post.
    pub content_html: String,
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A restaurant mention extracted from a post, not yet geocoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Best-guess restaurant name.
    pub name: String,
    /// Street address including borough and ZIP.
    pub address: String,
    /// Short excerpt starting at the address.
    pub blurb: String,
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

// ---------------------------------------------------------------------------
// Restaurant
// ---------------------------------------------------------------------------

/// A geocoded restaurant as persisted in `restaurants.json`.
///
/// Field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    pub address: String,
    pub blurb: String,
    pub lat: f64,
    pub lon: f64,
    /// ISO date (`YYYY-MM-DD`) the restaurant was first added.
    pub date_added: String,
}

impl Restaurant {
    /// Build a cache record from a candidate and its coordinates.
    pub fn from_candidate(candidate: Candidate, coords: Coordinates, date_added: String) -> Self {
        Self {
            name: candidate.name,
            address: candidate.address,
            blurb: candidate.blurb,
            lat: coords.lat,
            lon: coords.lon,
            date_added,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restaurant_json_field_names() {
        let r = Restaurant::from_candidate(
            Candidate {
                name: "Kabab Cafe".into(),
                address: "25-12 Steinway St, Queens, NY 11103".into(),
                blurb: "25-12 Steinway St…".into(),
            },
            Coordinates {
                lat: 40.77,
                lon: -73.91,
            },
            "2026-10-16".into(),
        );

        let json = serde_json::to_value(&r).expect("serialize");
        for key in ["name", "address", "blurb", "lat", "lon", "date_added"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(r.coordinates().lat, 40.77);
    }

    #[test]
    fn restaurant_parses_legacy_record() {
        let raw = r#"{
            "name": "Tanoreen",
            "address": "7523 3rd Ave, Brooklyn, NY 11209",
            "blurb": "7523 3rd Ave, Brooklyn, NY 11209…Palestinian",
            "lat": 40.63,
            "lon": -74.02,
            "date_added": "2025-06-01"
        }"#;
        let r: Restaurant = serde_json::from_str(raw).expect("parse");
        assert_eq!(r.name, "Tanoreen");
        assert_eq!(r.date_added, "2025-06-01");
    }
}
