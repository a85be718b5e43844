// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Engine error types and recovery classification.

/// Clustering engine error type.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Query timed out after {0} seconds")]
    QueryTimeout(u64),

    #[error("Ski area {0} has no public id")]
    MissingSkiAreaId(String),

    #[error("Unexpected geometry in traversal: {0}")]
    UnexpectedGeometry(String),

    #[error("Geocoder error: {0}")]
    Geocode(String),

    #[error("Invalid GeoJSON input: {0}")]
    InvalidGeoJson(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClusterError {
    pub const POLYGON_NOT_VALID: &'static str = "Polygon is not valid";
    pub const INVALID_LOOP: &'static str = "Invalid loop in polygon";
    pub const LOOP_NOT_CLOSED: &'static str = "Loop not closed";

    /// Check whether this error is one of the recognized invalid-polygon
    /// query errors. These are recoverable: the query is treated as having
    /// returned an empty result.
    pub fn is_invalid_polygon(&self) -> bool {
        match self {
            ClusterError::Store(msg) => {
                msg.contains(Self::POLYGON_NOT_VALID)
                    || msg.contains(Self::INVALID_LOOP)
                    || msg.contains(Self::LOOP_NOT_CLOSED)
            }
            _ => false,
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ClusterError>;
