//! In-memory geospatial store.
//!
//! Backs the integration tests and benchmarks, and documents the reference
//! semantics a production adapter must provide: envelope pre-filtering with
//! exact geometry predicates, append-with-uniqueness membership, and the
//! recognized invalid-polygon error messages for degenerate search areas.

use async_trait::async_trait;
use geo::{BoundingRect, Centroid, Contains, Geometry, Intersects, Polygon};
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::store::{
    ClusterStore, SearchContext, SearchPredicate, SkiAreaCursor, SkiAreaFilter,
};
use crate::error::{ClusterError, Result};
use crate::models::{
    Activity, MapObject, ObjectType, SkiAreaProperties, SkiAreaSource, SourceType,
};

/// Default cursor batch size, matching the engine configuration default.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Spatial index entry for a lift or run.
struct IndexedObject {
    key: String,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedObject {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

struct Inner {
    objects: BTreeMap<String, MapObject>,
    /// Lifts and runs only; ski areas are enumerated, not searched
    index: RTree<IndexedObject>,
}

/// In-process implementation of [`ClusterStore`].
#[derive(Clone)]
pub struct MemoryClusterStore {
    inner: Arc<RwLock<Inner>>,
    batch_size: usize,
}

impl MemoryClusterStore {
    /// Build a store over a pre-populated object collection.
    pub fn from_objects<I>(objects: I) -> Self
    where
        I: IntoIterator<Item = MapObject>,
    {
        let objects: BTreeMap<String, MapObject> =
            objects.into_iter().map(|o| (o.key.clone(), o)).collect();

        let entries: Vec<IndexedObject> = objects
            .values()
            .filter(|o| o.object_type != ObjectType::SkiArea)
            .filter_map(|o| {
                let rect = o.geometry.bounding_rect()?;
                Some(IndexedObject {
                    key: o.key.clone(),
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        Self {
            inner: Arc::new(RwLock::new(Inner {
                objects,
                index: RTree::bulk_load(entries),
            })),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Build a store from an ingested GeoJSON feature collection.
    ///
    /// Feature properties carry the non-geometry fields: `type`, `source`,
    /// `activities` and the ingestion flags. Features without a key get
    /// their feature id, falling back to a fresh uuid.
    pub fn from_geojson(json_data: &str) -> Result<Self> {
        let geojson: geojson::GeoJson = json_data
            .parse()
            .map_err(|e: geojson::Error| ClusterError::InvalidGeoJson(e.to_string()))?;
        let geojson::GeoJson::FeatureCollection(collection) = geojson else {
            return Err(ClusterError::InvalidGeoJson(
                "expected a FeatureCollection".to_string(),
            ));
        };

        let mut objects = Vec::new();
        for feature in collection.features {
            let properties: FeatureProperties = match &feature.properties {
                Some(map) => {
                    serde_json::from_value(serde_json::Value::Object(map.clone()))
                        .map_err(|e| ClusterError::InvalidGeoJson(e.to_string()))?
                }
                None => {
                    return Err(ClusterError::InvalidGeoJson(
                        "feature without properties".to_string(),
                    ))
                }
            };
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let geometry: Geometry<f64> = geometry
                .value
                .try_into()
                .map_err(|e: geojson::Error| ClusterError::InvalidGeoJson(e.to_string()))?;

            let key = properties
                .key
                .or(properties.id.clone())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let is_polygon = matches!(
                geometry,
                Geometry::Polygon(_) | Geometry::MultiPolygon(_)
            );
            let is_ski_area = properties.object_type == ObjectType::SkiArea;

            objects.push(MapObject {
                id: properties.id.unwrap_or_else(|| key.clone()),
                key,
                object_type: properties.object_type,
                geometry,
                activities: properties.activities,
                source: properties.source,
                ski_areas: Default::default(),
                is_in_ski_area_polygon: false,
                is_basis_for_new_ski_area: properties.is_basis_for_new_ski_area,
                is_in_ski_area_site: properties.is_in_ski_area_site,
                is_polygon: is_ski_area && is_polygon,
                properties: is_ski_area.then(|| SkiAreaProperties {
                    name: properties.name,
                    sources: properties.sources,
                    ..Default::default()
                }),
            });
        }

        tracing::info!(count = objects.len(), "Loaded map objects");
        Ok(Self::from_objects(objects))
    }

    // ─── Inspection (tests and tooling) ──────────────────────────

    pub async fn object(&self, key: &str) -> Option<MapObject> {
        self.inner.read().await.objects.get(key).cloned()
    }

    pub async fn all_objects(&self) -> Vec<MapObject> {
        self.inner.read().await.objects.values().cloned().collect()
    }

    pub async fn ski_area_records(&self) -> Vec<MapObject> {
        self.inner
            .read()
            .await
            .objects
            .values()
            .filter(|o| o.is_ski_area())
            .cloned()
            .collect()
    }
}

/// Non-geometry fields of an ingested GeoJSON feature.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureProperties {
    key: Option<String>,
    id: Option<String>,
    #[serde(rename = "type")]
    object_type: ObjectType,
    #[serde(default)]
    activities: BTreeSet<Activity>,
    source: SourceType,
    #[serde(default)]
    is_in_ski_area_site: bool,
    #[serde(default)]
    is_basis_for_new_ski_area: bool,
    name: Option<String>,
    #[serde(default)]
    sources: Vec<SkiAreaSource>,
}

/// Reject search polygons a real geospatial store would refuse.
fn validate_search_polygon(polygon: &Polygon<f64>) -> Result<()> {
    let exterior = polygon.exterior();
    if exterior.0.len() < 4 {
        return Err(ClusterError::Store(format!(
            "{}: exterior ring has {} coordinates",
            ClusterError::INVALID_LOOP,
            exterior.0.len()
        )));
    }
    if exterior.0.first() != exterior.0.last() {
        return Err(ClusterError::Store(ClusterError::LOOP_NOT_CLOSED.to_string()));
    }
    if let Some(first) = exterior.0.first() {
        if exterior.0.iter().all(|c| c == first) {
            return Err(ClusterError::Store(format!(
                "{}: zero-area ring",
                ClusterError::POLYGON_NOT_VALID
            )));
        }
    }
    Ok(())
}

/// Check a within-polygon filter geometry and test a centroid against it.
fn within_filter_matches(filter: &Geometry<f64>, object: &MapObject) -> Result<bool> {
    let Some(centroid) = object.geometry.centroid() else {
        return Ok(false);
    };
    match filter {
        Geometry::Polygon(poly) => {
            validate_search_polygon(poly)?;
            Ok(poly.contains(&centroid))
        }
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                validate_search_polygon(poly)?;
                if poly.contains(&centroid) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Err(ClusterError::Store(format!(
            "{}: search geometry is not a polygon",
            ClusterError::POLYGON_NOT_VALID
        ))),
    }
}

struct MemoryCursor {
    store: MemoryClusterStore,
    keys: VecDeque<String>,
    batch_size: usize,
}

#[async_trait]
impl SkiAreaCursor for MemoryCursor {
    async fn next_batch(&mut self) -> Result<Option<Vec<MapObject>>> {
        let inner = self.store.inner.read().await;
        let mut batch = Vec::new();
        while batch.len() < self.batch_size {
            let Some(key) = self.keys.pop_front() else {
                break;
            };
            // Objects removed since the snapshot are skipped
            if let Some(object) = inner.objects.get(&key) {
                batch.push(object.clone());
            }
        }
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}

#[async_trait]
impl ClusterStore for MemoryClusterStore {
    async fn ski_areas(&self, filter: SkiAreaFilter) -> Result<Box<dyn SkiAreaCursor>> {
        let inner = self.inner.read().await;
        let mut keys = VecDeque::new();
        for object in inner.objects.values() {
            if !object.is_ski_area() {
                continue;
            }
            if let Some(source) = filter.source {
                if object.source != source {
                    continue;
                }
            }
            if filter.only_polygons && !object.is_polygon {
                continue;
            }
            if let Some(within) = &filter.within_polygon {
                if !within_filter_matches(within, object)? {
                    continue;
                }
            }
            keys.push_back(object.key.clone());
        }
        Ok(Box::new(MemoryCursor {
            store: self.clone(),
            keys,
            batch_size: self.batch_size,
        }))
    }

    async fn ski_areas_by_id(&self, ids: &[String]) -> Result<Vec<MapObject>> {
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .values()
            .filter(|o| o.is_ski_area() && ids.contains(&o.id))
            .cloned()
            .collect())
    }

    async fn nearby(
        &self,
        area: &Polygon<f64>,
        predicate: SearchPredicate,
        ctx: &SearchContext,
    ) -> Result<Vec<MapObject>> {
        validate_search_polygon(area)?;
        let Some(rect) = area.bounding_rect() else {
            return Ok(Vec::new());
        };
        let envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        let inner = self.inner.read().await;
        let mut found: Vec<MapObject> = inner
            .index
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|entry| inner.objects.get(&entry.key))
            .filter(|o| !ctx.already_visited.contains(&o.key))
            .filter(|o| !o.ski_areas.contains(&ctx.id))
            .filter(|o| !(ctx.exclude_objects_in_ski_area_polygon && o.is_in_ski_area_polygon))
            .filter(|o| o.has_any_activity(&ctx.activities))
            .filter(|o| match predicate {
                SearchPredicate::Intersects => area.intersects(&o.geometry),
                SearchPredicate::Contains => area.contains(&o.geometry),
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(found)
    }

    async fn mark_ski_area(&self, id: &str, is_in_polygon: bool, keys: &[String]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for key in keys {
            match inner.objects.get_mut(key) {
                Some(object) => {
                    object.ski_areas.insert(id.to_string());
                    object.is_basis_for_new_ski_area = false;
                    object.is_in_ski_area_polygon |= is_in_polygon;
                }
                None => {
                    tracing::debug!(key = %key, "Skipping mark for object removed concurrently");
                }
            }
        }
        Ok(())
    }

    async fn save_ski_area(&self, object: &MapObject) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.objects.insert(object.key.clone(), object.clone());
        Ok(())
    }

    async fn members_of(&self, id: &str) -> Result<Vec<MapObject>> {
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .values()
            .filter(|o| !o.is_ski_area() && o.ski_areas.contains(id))
            .cloned()
            .collect())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.objects.remove(key);
        Ok(())
    }

    async fn remove_batch(&self, keys: &[String]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for key in keys {
            inner.objects.remove(key);
        }
        Ok(())
    }

    async fn rewrite_ski_area_refs(&self, old_ids: &[String], new_id: &str) -> Result<()> {
        // The write lock is the exclusive-lock equivalent: no marking can
        // interleave with the rewrite.
        let mut inner = self.inner.write().await;
        for object in inner.objects.values_mut() {
            let had_old = old_ids.iter().any(|id| object.ski_areas.contains(id));
            if had_old {
                for id in old_ids {
                    object.ski_areas.remove(id);
                }
                object.ski_areas.insert(new_id.to_string());
            }
        }
        Ok(())
    }

    async fn next_unassigned_run(&self) -> Result<Option<MapObject>> {
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .values()
            .find(|o| o.object_type == ObjectType::Run && o.is_basis_for_new_ski_area)
            .cloned())
    }

    async fn clear_basis_flag(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(object) = inner.objects.get_mut(key) {
            object.is_basis_for_new_ski_area = false;
        }
        Ok(())
    }
}
