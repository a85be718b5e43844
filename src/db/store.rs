// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Store query adapter: the narrow geospatial interface the pipeline sees.
//!
//! The pipeline never issues raw queries. Everything it needs from the
//! backing document store is expressed here:
//! - paged ski-area enumeration with source/polygon filters
//! - geometry-predicate searches scoped by a visit context
//! - atomic membership marking, removal and reference rewriting

use async_trait::async_trait;
use geo::{Geometry, Polygon};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::Result;
use crate::models::{Activity, MapObject, SourceType};

/// Geometry predicate for nearby searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPredicate {
    /// Object geometry intersects the search area
    Intersects,
    /// Object geometry is contained in the search area
    Contains,
}

/// Filter for ski-area enumeration cursors.
#[derive(Debug, Clone, Default)]
pub struct SkiAreaFilter {
    /// Restrict to ski areas from one source
    pub source: Option<SourceType>,
    /// Restrict to ski areas whose geometry is a polygon
    pub only_polygons: bool,
    /// Restrict to ski areas whose geometry centroid lies inside this
    /// polygon or multipolygon
    pub within_polygon: Option<Geometry<f64>>,
    /// Cursor TTL hint for the backing store
    pub ttl: Option<Duration>,
}

/// Per-traversal search scope shared with the store.
///
/// Owned by the traversal; the store reads it to apply exclusion rules.
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// Ski-area id being built
    pub id: String,
    /// Current activity filter; objects must share at least one
    pub activities: BTreeSet<Activity>,
    /// Skip objects already claimed by a polygon-phase pass
    pub exclude_objects_in_ski_area_polygon: bool,
    /// Object keys already seen in this traversal
    pub already_visited: BTreeSet<String>,
}

/// Paged cursor over ski areas. Batches hold at most the store's
/// configured batch size.
#[async_trait]
pub trait SkiAreaCursor: Send {
    /// Next batch, or `None` once the cursor is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<MapObject>>>;
}

/// Narrow geospatial store interface used by the clustering pipeline.
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Enumerate ski areas matching `filter` as a paged cursor.
    async fn ski_areas(&self, filter: SkiAreaFilter) -> Result<Box<dyn SkiAreaCursor>>;

    /// Fetch ski areas by public id. Unknown ids are skipped.
    async fn ski_areas_by_id(&self, ids: &[String]) -> Result<Vec<MapObject>>;

    /// Lifts and runs whose geometry satisfies `predicate` against `area`,
    /// subject to the exclusion rules carried by `ctx`: not already visited,
    /// not already claiming `ctx.id`, optionally not already claimed by a
    /// polygon pass, and sharing at least one activity with `ctx.activities`.
    async fn nearby(
        &self,
        area: &Polygon<f64>,
        predicate: SearchPredicate,
        ctx: &SearchContext,
    ) -> Result<Vec<MapObject>>;

    /// Append `id` to every listed object's `ski_areas` (with uniqueness),
    /// clear `is_basis_for_new_ski_area` and OR `is_in_ski_area_polygon`
    /// with `is_in_polygon`. Atomic per batch.
    async fn mark_ski_area(&self, id: &str, is_in_polygon: bool, keys: &[String]) -> Result<()>;

    /// Insert or replace a ski-area record.
    async fn save_ski_area(&self, object: &MapObject) -> Result<()>;

    /// Lifts and runs referencing `id` in their `ski_areas`.
    async fn members_of(&self, id: &str) -> Result<Vec<MapObject>>;

    /// Remove one object by key.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove several objects atomically.
    async fn remove_batch(&self, keys: &[String]) -> Result<()>;

    /// For every object referencing any of `old_ids`, remove them all and
    /// append `new_id` (uniquely). Serialized against concurrent markings.
    async fn rewrite_ski_area_refs(&self, old_ids: &[String], new_id: &str) -> Result<()>;

    /// One run still flagged as the basis for a new ski area, or `None`.
    async fn next_unassigned_run(&self) -> Result<Option<MapObject>>;

    /// Clear `is_basis_for_new_ski_area` on one object.
    async fn clear_basis_flag(&self, key: &str) -> Result<()>;
}

/// Recover from the recognized invalid-polygon query errors by substituting
/// an empty result. The offending geometry is logged for post-mortem
/// analysis. All other errors propagate.
pub fn recover_invalid_polygon<T: Default>(
    result: Result<T>,
    geometry: &Geometry<f64>,
) -> Result<T> {
    match result {
        Err(e) if e.is_invalid_polygon() => {
            tracing::warn!(
                error = %e,
                geometry = ?geometry,
                "Invalid polygon in query; treating result as empty"
            );
            Ok(T::default())
        }
        other => other,
    }
}
