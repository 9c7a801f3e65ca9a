//! Address geocoding.
//!
//! This crate provides:
//! - [`Geocoder`]: the seam the build pipeline geocodes through
//! - [`NominatimGeocoder`]: OpenStreetMap Nominatim search client
//! - [`RateLimiter`]: spacing between consecutive requests

mod limiter;
mod nominatim;

use std::future::Future;

use sietsemap_shared::{Coordinates, Result};

pub use limiter::RateLimiter;
pub use nominatim::NominatimGeocoder;

/// Resolves a free-form street address to coordinates.
///
/// `Ok(None)` means the service answered but found nothing. Errors are
/// reserved for transport, status, and decoding failures.
pub trait Geocoder: Send + Sync {
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Option<Coordinates>>> + Send;
}
