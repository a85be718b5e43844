use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use geo::{Geometry, LineString, Point, Polygon};
use std::collections::BTreeSet;
use tokio::runtime::Runtime;

use skiarea_clusterer::config::ClusterConfig;
use skiarea_clusterer::db::MemoryClusterStore;
use skiarea_clusterer::models::{
    Activity, MapObject, ObjectType, SkiAreaProperties, SkiAreaSource, SourceType,
};
use skiarea_clusterer::services::ClusterPipeline;

/// A synthetic resort: one polygon ski area, a registry twin, a ladder of
/// runs and lifts inside the polygon and a trail of orphan nordic runs.
fn synthetic_resort() -> MemoryClusterStore {
    let mut objects = Vec::new();

    let polygon = Polygon::new(
        LineString::from(vec![
            (10.0, 46.0),
            (10.05, 46.0),
            (10.05, 46.05),
            (10.0, 46.05),
            (10.0, 46.0),
        ]),
        vec![],
    );
    objects.push(MapObject {
        key: "area-1".to_string(),
        id: "area-1".to_string(),
        object_type: ObjectType::SkiArea,
        geometry: Geometry::Polygon(polygon),
        activities: BTreeSet::from([Activity::Downhill]),
        source: SourceType::Crowdsourced,
        ski_areas: BTreeSet::new(),
        is_in_ski_area_polygon: false,
        is_basis_for_new_ski_area: false,
        is_in_ski_area_site: false,
        is_polygon: true,
        properties: Some(SkiAreaProperties {
            name: Some("Bench Resort".to_string()),
            sources: vec![SkiAreaSource {
                source_type: SourceType::Crowdsourced,
                id: "area-1".to_string(),
            }],
            ..Default::default()
        }),
    });

    objects.push(MapObject {
        key: "reg-1".to_string(),
        id: "reg-1".to_string(),
        object_type: ObjectType::SkiArea,
        geometry: Geometry::Point(Point::new(10.025, 46.025)),
        activities: BTreeSet::from([Activity::Downhill]),
        source: SourceType::Registry,
        ski_areas: BTreeSet::new(),
        is_in_ski_area_polygon: false,
        is_basis_for_new_ski_area: false,
        is_in_ski_area_site: false,
        is_polygon: false,
        properties: Some(SkiAreaProperties {
            name: Some("Bench Resort (registry)".to_string()),
            sources: vec![SkiAreaSource {
                source_type: SourceType::Registry,
                id: "reg-1".to_string(),
            }],
            ..Default::default()
        }),
    });

    for i in 0..40 {
        let lat = 46.002 + 0.001 * i as f64;
        let (object_type, activities) = if i % 5 == 0 {
            (ObjectType::Lift, BTreeSet::from([Activity::Downhill]))
        } else {
            (ObjectType::Run, BTreeSet::from([Activity::Downhill]))
        };
        objects.push(MapObject {
            key: format!("obj-{}", i),
            id: format!("obj-{}", i),
            object_type,
            geometry: Geometry::LineString(LineString::from(vec![
                (10.01, lat),
                (10.02, lat),
            ])),
            activities,
            source: SourceType::Crowdsourced,
            ski_areas: BTreeSet::new(),
            is_in_ski_area_polygon: false,
            is_basis_for_new_ski_area: object_type == ObjectType::Run,
            is_in_ski_area_site: false,
            is_polygon: false,
            properties: None,
        });
    }

    // Orphan nordic trail far from the resort
    for i in 0..10 {
        let lat = 47.0 + 0.003 * i as f64;
        objects.push(MapObject {
            key: format!("nordic-{}", i),
            id: format!("nordic-{}", i),
            object_type: ObjectType::Run,
            geometry: Geometry::LineString(LineString::from(vec![
                (12.0, lat),
                (12.002, lat),
            ])),
            activities: BTreeSet::from([Activity::Nordic]),
            source: SourceType::Crowdsourced,
            ski_areas: BTreeSet::new(),
            is_in_ski_area_polygon: false,
            is_basis_for_new_ski_area: true,
            is_in_ski_area_site: false,
            is_polygon: false,
            properties: None,
        });
    }

    MemoryClusterStore::from_objects(objects)
}

fn benchmark_pipeline(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    c.bench_function("cluster_synthetic_resort", |b| {
        b.to_async(&rt).iter_batched(
            synthetic_resort,
            |store| async move {
                ClusterPipeline::new(store, ClusterConfig::default())
                    .run()
                    .await
                    .expect("pipeline run");
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);
