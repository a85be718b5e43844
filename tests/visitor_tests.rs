// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Traversal semantics: polygon phase vs buffered flood fill.

mod common;

use geo::Geometry;
use std::collections::BTreeSet;

use common::{crowdsourced_polygon_area, rectangle, run_line};
use skiarea_clusterer::config::ClusterConfig;
use skiarea_clusterer::db::MemoryClusterStore;
use skiarea_clusterer::error::ClusterError;
use skiarea_clusterer::models::{Activity, MapObject};
use skiarea_clusterer::services::{VisitContext, Visitor};

fn keys(objects: &[MapObject]) -> BTreeSet<String> {
    objects.iter().map(|o| o.key.clone()).collect()
}

#[tokio::test]
async fn test_polygon_phase_does_not_expand_beyond_polygon() {
    let area = crowdsourced_polygon_area(
        "area-1",
        rectangle(10.0, 46.0, 10.01, 46.01),
        &[Activity::Downhill],
    );
    // ~330 m apart: buffered traversal would chain from inside to outside
    let inside = run_line("inside", &[(10.002, 46.009), (10.004, 46.009)], &[Activity::Downhill]);
    let outside = run_line("outside", &[(10.002, 46.012), (10.004, 46.012)], &[Activity::Downhill]);

    let store = MemoryClusterStore::from_objects(vec![area.clone(), inside, outside]);
    let config = ClusterConfig::default();
    let visitor = Visitor::new(&store, &config);

    let mut ctx = VisitContext::polygon_phase(
        area.id.clone(),
        BTreeSet::from([Activity::Downhill]),
        area.geometry.clone(),
        area.key.clone(),
    );
    let collected = visitor.visit_object(&mut ctx, area).await.unwrap();

    assert_eq!(
        keys(&collected),
        BTreeSet::from(["area-1".to_string(), "inside".to_string()]),
        "the polygon phase claims only contained objects"
    );
}

#[tokio::test]
async fn test_buffered_traversal_chains_within_hops() {
    // Three runs ~330 m apart chain together; a fourth ~1.5 km away does not
    let r1 = run_line("r1", &[(10.0, 46.000), (10.001, 46.000)], &[Activity::Downhill]);
    let r2 = run_line("r2", &[(10.0, 46.003), (10.001, 46.003)], &[Activity::Downhill]);
    let r3 = run_line("r3", &[(10.0, 46.006), (10.001, 46.006)], &[Activity::Downhill]);
    let far = run_line("far", &[(10.0, 46.020), (10.001, 46.020)], &[Activity::Downhill]);

    let store = MemoryClusterStore::from_objects(vec![r1.clone(), r2, r3, far]);
    let config = ClusterConfig::default();
    let visitor = Visitor::new(&store, &config);

    let mut ctx = VisitContext::buffered(
        "new-area".to_string(),
        BTreeSet::from([Activity::Downhill]),
        false,
        r1.key.clone(),
    );
    let collected = visitor.visit_object(&mut ctx, r1).await.unwrap();

    assert_eq!(
        keys(&collected),
        BTreeSet::from(["r1".to_string(), "r2".to_string(), "r3".to_string()])
    );
}

#[tokio::test]
async fn test_activity_filter_narrows_outward() {
    // A downhill seed may reach a mixed connector, but never a nordic-only
    // run beyond it: the filter narrows to {Downhill} and stays there.
    let seed = run_line("seed", &[(10.0, 46.000), (10.001, 46.000)], &[Activity::Downhill]);
    let connector = run_line(
        "connector",
        &[(10.0, 46.003), (10.001, 46.003)],
        &[Activity::Downhill, Activity::Nordic],
    );
    let nordic = run_line("nordic", &[(10.0, 46.006), (10.001, 46.006)], &[Activity::Nordic]);

    let store = MemoryClusterStore::from_objects(vec![seed.clone(), connector, nordic]);
    let config = ClusterConfig::default();
    let visitor = Visitor::new(&store, &config);

    let mut ctx = VisitContext::buffered(
        "new-area".to_string(),
        BTreeSet::from([Activity::Downhill]),
        false,
        seed.key.clone(),
    );
    let collected = visitor.visit_object(&mut ctx, seed).await.unwrap();

    assert_eq!(
        keys(&collected),
        BTreeSet::from(["seed".to_string(), "connector".to_string()])
    );
    assert_eq!(ctx.search.activities, BTreeSet::from([Activity::Downhill]));
}

#[tokio::test]
async fn test_every_visited_object_shares_a_seed_activity() {
    let seed = run_line(
        "seed",
        &[(10.0, 46.000), (10.001, 46.000)],
        &[Activity::Downhill, Activity::Nordic],
    );
    let neighbours = vec![
        run_line("n1", &[(10.0, 46.003), (10.001, 46.003)], &[Activity::Nordic]),
        run_line("n2", &[(10.0, 46.006), (10.001, 46.006)], &[Activity::Backcountry]),
    ];

    let mut objects = vec![seed.clone()];
    objects.extend(neighbours);
    let store = MemoryClusterStore::from_objects(objects);
    let config = ClusterConfig::default();
    let visitor = Visitor::new(&store, &config);

    let seed_activities = BTreeSet::from([Activity::Downhill, Activity::Nordic]);
    let mut ctx = VisitContext::buffered(
        "new-area".to_string(),
        seed_activities.clone(),
        false,
        seed.key.clone(),
    );
    let collected = visitor.visit_object(&mut ctx, seed).await.unwrap();

    for object in &collected {
        assert!(
            object.has_any_activity(&seed_activities),
            "{} slipped through the activity filter",
            object.key
        );
    }
    assert!(!keys(&collected).contains("n2"));
}

#[tokio::test]
async fn test_non_areal_search_polygon_is_fatal() {
    let area = crowdsourced_polygon_area(
        "area-1",
        rectangle(10.0, 46.0, 10.01, 46.01),
        &[Activity::Downhill],
    );
    let store = MemoryClusterStore::from_objects(vec![area.clone()]);
    let config = ClusterConfig::default();
    let visitor = Visitor::new(&store, &config);

    let mut ctx = VisitContext::polygon_phase(
        area.id.clone(),
        BTreeSet::from([Activity::Downhill]),
        Geometry::Point(geo::Point::new(10.0, 46.0)),
        area.key.clone(),
    );
    let result = visitor.visit_object(&mut ctx, area).await;

    assert!(matches!(result, Err(ClusterError::UnexpectedGeometry(_))));
}
