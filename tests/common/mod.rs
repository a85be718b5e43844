// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared fixture builders for the clustering integration tests.

#![allow(dead_code)]

use geo::{Geometry, LineString, Point, Polygon};
use std::collections::BTreeSet;

use skiarea_clusterer::config::ClusterConfig;
use skiarea_clusterer::db::MemoryClusterStore;
use skiarea_clusterer::models::{
    Activity, MapObject, ObjectType, SkiAreaProperties, SkiAreaSource, SourceType,
};
use skiarea_clusterer::services::ClusterPipeline;

/// Axis-aligned rectangle polygon from two corners.
pub fn rectangle(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (min_lon, min_lat),
            (max_lon, min_lat),
            (max_lon, max_lat),
            (min_lon, max_lat),
            (min_lon, min_lat),
        ]),
        vec![],
    )
}

fn base_object(key: &str, object_type: ObjectType, geometry: Geometry<f64>) -> MapObject {
    MapObject {
        key: key.to_string(),
        id: key.to_string(),
        object_type,
        geometry,
        activities: BTreeSet::new(),
        source: SourceType::Crowdsourced,
        ski_areas: BTreeSet::new(),
        is_in_ski_area_polygon: false,
        is_basis_for_new_ski_area: false,
        is_in_ski_area_site: false,
        is_polygon: false,
        properties: None,
    }
}

/// Crowdsourced polygon ski area.
pub fn crowdsourced_polygon_area(
    key: &str,
    polygon: Polygon<f64>,
    activities: &[Activity],
) -> MapObject {
    let mut object = base_object(key, ObjectType::SkiArea, Geometry::Polygon(polygon));
    object.activities = activities.iter().copied().collect();
    object.is_polygon = true;
    object.properties = Some(SkiAreaProperties {
        name: Some(format!("{} ski area", key)),
        sources: vec![SkiAreaSource {
            source_type: SourceType::Crowdsourced,
            id: key.to_string(),
        }],
        ..Default::default()
    });
    object
}

/// Registry point ski area.
pub fn registry_point_area(key: &str, lon: f64, lat: f64, activities: &[Activity]) -> MapObject {
    let mut object = base_object(key, ObjectType::SkiArea, Geometry::Point(Point::new(lon, lat)));
    object.activities = activities.iter().copied().collect();
    object.source = SourceType::Registry;
    object.properties = Some(SkiAreaProperties {
        name: Some(format!("{} resort", key)),
        sources: vec![SkiAreaSource {
            source_type: SourceType::Registry,
            id: key.to_string(),
        }],
        ..Default::default()
    });
    object
}

/// Run along the given coordinates, flagged as a synthesis basis.
pub fn run_line(key: &str, coords: &[(f64, f64)], activities: &[Activity]) -> MapObject {
    let mut object = base_object(
        key,
        ObjectType::Run,
        Geometry::LineString(LineString::from(coords.to_vec())),
    );
    object.activities = activities.iter().copied().collect();
    object.is_basis_for_new_ski_area = true;
    object
}

/// Downhill lift along the given coordinates.
pub fn lift_line(key: &str, coords: &[(f64, f64)]) -> MapObject {
    let mut object = base_object(
        key,
        ObjectType::Lift,
        Geometry::LineString(LineString::from(coords.to_vec())),
    );
    object.activities = BTreeSet::from([Activity::Downhill]);
    object
}

/// Pipeline over a fresh in-memory store seeded with `objects`.
pub fn pipeline(objects: Vec<MapObject>) -> ClusterPipeline<MemoryClusterStore> {
    init_tracing();
    ClusterPipeline::new(
        MemoryClusterStore::from_objects(objects),
        ClusterConfig::default(),
    )
}

/// Route engine logs to the test output when RUST_LOG is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
