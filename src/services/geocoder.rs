//! Reverse geocoding seam.
//!
//! Geocoding is best-effort: the pipeline records a location when the
//! geocoder answers and logs a warning when it does not. It never affects
//! clustering correctness.

use async_trait::async_trait;
use geo::Point;

use crate::error::Result;
use crate::models::Location;

/// Reverse geocoder: coordinate in, location record out.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn locate(&self, point: Point<f64>) -> Result<Location>;
}
