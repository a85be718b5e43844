//! Engine configuration loaded from environment variables.
//!
//! All knobs have production defaults; `from_env()` is for deployments that
//! need to override them, `Default` is what tests use.

use std::env;
use std::time::Duration;

/// Clustering engine configuration.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Outward buffer distance for flood-fill traversal hops (km)
    pub traversal_buffer_km: f64,
    /// Outward buffer distance for cross-source merge candidacy (km)
    pub merge_buffer_km: f64,
    /// Cursor batch size for ski-area enumeration
    pub batch_size: usize,
    /// TTL for traversal (nearby) queries
    pub traversal_ttl: Duration,
    /// TTL for ski-area enumeration cursors
    pub enumeration_ttl: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            traversal_buffer_km: 0.5,
            merge_buffer_km: 0.25,
            batch_size: 50,
            traversal_ttl: Duration::from_secs(120),
            enumeration_ttl: Duration::from_secs(3600),
        }
    }
}

impl ClusterConfig {
    /// Load configuration from environment variables, falling back to the
    /// production defaults for anything unset.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();
        Self {
            traversal_buffer_km: parse_var("CLUSTERING_TRAVERSAL_BUFFER_KM")
                .unwrap_or(defaults.traversal_buffer_km),
            merge_buffer_km: parse_var("CLUSTERING_MERGE_BUFFER_KM")
                .unwrap_or(defaults.merge_buffer_km),
            batch_size: parse_var("CLUSTERING_BATCH_SIZE").unwrap_or(defaults.batch_size),
            traversal_ttl: parse_var("CLUSTERING_TRAVERSAL_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.traversal_ttl),
            enumeration_ttl: parse_var("CLUSTERING_ENUMERATION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.enumeration_ttl),
        }
    }
}

/// Parse an environment variable, ignoring unset or malformed values.
fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
