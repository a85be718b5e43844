// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Flood-fill traversal over the object store.
//!
//! Two modes share one entry point:
//! - Polygon phase: the upstream polygon is trusted as ground truth and
//!   everything it contains is claimed in a single containment query.
//! - Buffered phase: the cluster grows by half-kilometre hops from each
//!   seed until no new objects are discovered. The activity filter only
//!   ever narrows, so a downhill cluster cannot leak into an adjacent
//!   nordic area through a shared connector.

use geo::{Geometry, Polygon};
use std::collections::{BTreeSet, VecDeque};

use crate::config::ClusterConfig;
use crate::db::{recover_invalid_polygon, ClusterStore, SearchContext, SearchPredicate};
use crate::error::{ClusterError, Result};
use crate::geometry;
use crate::models::{Activity, MapObject};

/// Per-traversal context for one ski area being built.
#[derive(Debug, Clone)]
pub struct VisitContext {
    pub search: SearchContext,
    /// Fixed search polygon; set only during the polygon phase
    pub search_polygon: Option<Geometry<f64>>,
}

impl VisitContext {
    /// Context for a polygon-phase traversal: one containment query against
    /// the fixed polygon, no recursion.
    pub fn polygon_phase(
        id: String,
        activities: BTreeSet<Activity>,
        polygon: Geometry<f64>,
        seed_key: String,
    ) -> Self {
        Self {
            search: SearchContext {
                id,
                activities,
                exclude_objects_in_ski_area_polygon: false,
                already_visited: BTreeSet::from([seed_key]),
            },
            search_polygon: Some(polygon),
        }
    }

    /// Context for a buffered flood-fill traversal.
    pub fn buffered(
        id: String,
        activities: BTreeSet<Activity>,
        exclude_objects_in_ski_area_polygon: bool,
        seed_key: String,
    ) -> Self {
        Self {
            search: SearchContext {
                id,
                activities,
                exclude_objects_in_ski_area_polygon,
                already_visited: BTreeSet::from([seed_key]),
            },
            search_polygon: None,
        }
    }
}

/// Traversal driver bound to a store and configuration.
pub struct Visitor<'a, S: ClusterStore> {
    store: &'a S,
    config: &'a ClusterConfig,
}

impl<'a, S: ClusterStore> Visitor<'a, S> {
    pub fn new(store: &'a S, config: &'a ClusterConfig) -> Self {
        Self { store, config }
    }

    /// Visit `seed` and everything reachable from it under the context's
    /// rules. Returns the seed plus all objects found, in discovery order.
    pub async fn visit_object(
        &self,
        ctx: &mut VisitContext,
        seed: MapObject,
    ) -> Result<Vec<MapObject>> {
        if let Some(search_polygon) = ctx.search_polygon.clone() {
            return self.visit_fixed_polygon(ctx, seed, &search_polygon).await;
        }

        // Buffered mode: explicit work queue instead of recursion, so a
        // dense resort cannot exhaust the call stack.
        let mut collected = Vec::new();
        let mut queue = VecDeque::from([seed]);
        while let Some(object) = queue.pop_front() {
            let Some(search_area) =
                geometry::buffer(&object.geometry, self.config.traversal_buffer_km)
            else {
                // Degenerate geometry: keep the object, expand nothing
                collected.push(object);
                continue;
            };

            // Narrowing only: child filter = parent filter ∩ object
            ctx.search.activities = ctx
                .search
                .activities
                .intersection(&object.activities)
                .copied()
                .collect();
            collected.push(object);

            for polygon in component_polygons(&search_area)? {
                let found = self
                    .query_nearby(&polygon, SearchPredicate::Intersects, &ctx.search)
                    .await?;
                for object in &found {
                    ctx.search.already_visited.insert(object.key.clone());
                }
                queue.extend(found);
            }
        }
        Ok(collected)
    }

    /// Polygon phase: claim everything the fixed polygon contains, in one
    /// query per component. No buffering, no recursion.
    async fn visit_fixed_polygon(
        &self,
        ctx: &mut VisitContext,
        seed: MapObject,
        search_polygon: &Geometry<f64>,
    ) -> Result<Vec<MapObject>> {
        let mut collected = vec![seed];
        for polygon in component_polygons(search_polygon)? {
            let found = self
                .query_nearby(&polygon, SearchPredicate::Contains, &ctx.search)
                .await?;
            for object in &found {
                ctx.search.already_visited.insert(object.key.clone());
            }
            collected.extend(found);
        }
        Ok(collected)
    }

    /// One nearby query under the traversal TTL, recovering from
    /// invalid-polygon errors with an empty result.
    pub(crate) async fn query_nearby(
        &self,
        polygon: &Polygon<f64>,
        predicate: SearchPredicate,
        search: &SearchContext,
    ) -> Result<Vec<MapObject>> {
        let ttl = self.config.traversal_ttl;
        let result = tokio::time::timeout(ttl, self.store.nearby(polygon, predicate, search))
            .await
            .map_err(|_| ClusterError::QueryTimeout(ttl.as_secs()))?;
        recover_invalid_polygon(result, &Geometry::Polygon(polygon.clone()))
    }
}

/// Split a search area into its component polygons.
///
/// Anything that is not a Polygon or MultiPolygon is a programmer error.
pub fn component_polygons(geometry: &Geometry<f64>) -> Result<Vec<Polygon<f64>>> {
    match geometry {
        Geometry::Polygon(p) => Ok(vec![p.clone()]),
        Geometry::MultiPolygon(mp) => Ok(mp.0.clone()),
        other => Err(ClusterError::UnexpectedGeometry(
            geometry_type_name(other).to_string(),
        )),
    }
}

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
