// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The six-phase clustering pipeline.
//!
//! Phases run strictly in order; each one is a pure function of the store's
//! current state:
//! 1. Remove crowdsourced polygons enclosing several registry ski areas
//! 2. Claim objects inside crowdsourced polygons
//! 3. Claim nearby objects for crowdsourced ski areas (buffered)
//! 4. Merge registry ski areas with crowdsourced neighbours, or claim
//!    nearby objects for them
//! 5. Synthesize ski areas from still-unassigned runs
//! 6. Annotate with statistics, centroid geometry and geocoded location
//!
//! Within a phase, ski areas in one cursor batch are processed
//! concurrently and batches are sequential. Two areas in one batch may race
//! to claim a border object; the store's append-with-uniqueness keeps
//! `ski_areas` set-valued and the object simply ends up in both.

use futures::future::try_join_all;
use geo::Geometry;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ClusterConfig;
use crate::db::{
    recover_invalid_polygon, ClusterStore, SearchContext, SearchPredicate, SkiAreaFilter,
};
use crate::error::{ClusterError, Result};
use crate::geometry;
use crate::models::{
    all_ski_area_activities, Activity, MapObject, ObjectType, SkiAreaProperties, SkiAreaStatistics,
    SkiAreaStatus, SourceType,
};
use crate::services::geocoder::ReverseGeocoder;
use crate::services::merge::{default_composer, merge_ski_areas, MergeComposer};
use crate::services::visitor::{component_polygons, VisitContext, Visitor};

/// Clustering pipeline over a store, with an optional reverse geocoder.
pub struct ClusterPipeline<S: ClusterStore> {
    store: S,
    config: ClusterConfig,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
    composer: MergeComposer,
}

impl<S: ClusterStore> ClusterPipeline<S> {
    pub fn new(store: S, config: ClusterConfig) -> Self {
        Self {
            store,
            config,
            geocoder: None,
            composer: default_composer(),
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_composer(mut self, composer: MergeComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run all six phases in order.
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Starting ski area clustering pipeline");
        self.remove_ambiguous_duplicates().await?;
        self.assign_objects_in_polygons().await?;
        self.assign_nearby_objects().await?;
        self.merge_or_assign_registry_areas().await?;
        self.synthesize_from_unassigned_runs().await?;
        self.augment_ski_areas().await?;
        tracing::info!("Ski area clustering pipeline complete");
        Ok(())
    }

    // ─── Ambiguous duplicate removal ─────────────────────────────

    /// A crowdsourced polygon enclosing more than one registry ski area is a
    /// shared-ticketing super-relation, not a ski area. Remove it.
    async fn remove_ambiguous_duplicates(&self) -> Result<()> {
        tracing::info!("Removing ambiguous ski area polygons");
        let mut cursor = self
            .store
            .ski_areas(SkiAreaFilter {
                source: Some(SourceType::Crowdsourced),
                only_polygons: true,
                within_polygon: None,
                ttl: Some(self.config.enumeration_ttl),
            })
            .await?;
        while let Some(batch) = cursor.next_batch().await? {
            try_join_all(batch.into_iter().map(|area| self.remove_if_ambiguous(area))).await?;
        }
        Ok(())
    }

    async fn remove_if_ambiguous(&self, area: MapObject) -> Result<()> {
        let count = recover_invalid_polygon(
            self.count_registry_areas_within(&area.geometry).await,
            &area.geometry,
        )?;
        if count > 1 {
            tracing::info!(
                id = %area.id,
                registry_areas = count,
                "Removing polygon enclosing multiple registry ski areas"
            );
            self.store.remove(&area.key).await?;
        }
        Ok(())
    }

    async fn count_registry_areas_within(&self, geometry: &Geometry<f64>) -> Result<usize> {
        let mut cursor = self
            .store
            .ski_areas(SkiAreaFilter {
                source: Some(SourceType::Registry),
                only_polygons: false,
                within_polygon: Some(geometry.clone()),
                ttl: Some(self.config.enumeration_ttl),
            })
            .await?;
        let mut count = 0;
        while let Some(batch) = cursor.next_batch().await? {
            count += batch.len();
        }
        Ok(count)
    }

    // ─── Polygon containment pass ────────────────────────────────

    async fn assign_objects_in_polygons(&self) -> Result<()> {
        tracing::info!("Assigning objects inside crowdsourced ski area polygons");
        let mut cursor = self
            .store
            .ski_areas(SkiAreaFilter {
                source: Some(SourceType::Crowdsourced),
                only_polygons: true,
                within_polygon: None,
                ttl: Some(self.config.enumeration_ttl),
            })
            .await?;
        while let Some(batch) = cursor.next_batch().await? {
            try_join_all(batch.into_iter().map(|area| self.process_polygon_area(area))).await?;
        }
        Ok(())
    }

    async fn process_polygon_area(&self, area: MapObject) -> Result<()> {
        if area.id.is_empty() {
            return Err(ClusterError::MissingSkiAreaId(area.key));
        }

        let original_activities = area.activities.clone();
        let seed_activities = if original_activities.is_empty() {
            // An untagged polygon can still claim members of either kind
            all_ski_area_activities()
        } else {
            original_activities.clone()
        };

        let mut ctx = VisitContext::polygon_phase(
            area.id.clone(),
            seed_activities,
            area.geometry.clone(),
            area.key.clone(),
        );
        let visitor = Visitor::new(&self.store, &self.config);
        let collected = visitor.visit_object(&mut ctx, area.clone()).await?;
        let members: Vec<MapObject> = collected.into_iter().filter(|o| !o.is_ski_area()).collect();

        if members.is_empty() {
            tracing::info!(id = %area.id, "Removing ski area polygon with no members");
            return self.store.remove(&area.key).await;
        }
        let site_members = members.iter().filter(|m| m.is_in_ski_area_site).count();
        if site_members * 2 > members.len() {
            tracing::info!(
                id = %area.id,
                site_members,
                total = members.len(),
                "Removing ski area polygon dominated by a site relation"
            );
            return self.store.remove(&area.key).await;
        }

        self.store
            .mark_ski_area(&area.id, true, &member_keys(&members))
            .await?;

        if original_activities.is_empty() {
            let mut updated = area;
            updated.activities = members
                .iter()
                .flat_map(|m| m.ski_area_activities())
                .chain(original_activities)
                .collect();
            self.store.save_ski_area(&updated).await?;
        }
        Ok(())
    }

    // ─── Buffered crowdsourced pass ──────────────────────────────

    async fn assign_nearby_objects(&self) -> Result<()> {
        tracing::info!("Assigning nearby objects to crowdsourced ski areas");
        let mut cursor = self
            .store
            .ski_areas(SkiAreaFilter {
                source: Some(SourceType::Crowdsourced),
                only_polygons: false,
                within_polygon: None,
                ttl: Some(self.config.enumeration_ttl),
            })
            .await?;
        while let Some(batch) = cursor.next_batch().await? {
            try_join_all(batch.into_iter().map(|area| self.process_buffered_area(area))).await?;
        }
        Ok(())
    }

    /// Buffered traversal for one ski area: claim everything reachable by
    /// half-kilometre hops that is not already claimed by a polygon pass.
    /// No removal rules apply here.
    async fn process_buffered_area(&self, area: MapObject) -> Result<()> {
        if area.id.is_empty() {
            return Err(ClusterError::MissingSkiAreaId(area.key));
        }

        let mut ctx = VisitContext::buffered(
            area.id.clone(),
            area.activities.clone(),
            true,
            area.key.clone(),
        );
        let visitor = Visitor::new(&self.store, &self.config);
        let collected = visitor.visit_object(&mut ctx, area.clone()).await?;
        let members: Vec<MapObject> = collected.into_iter().filter(|o| !o.is_ski_area()).collect();

        if members.is_empty() {
            return Ok(());
        }
        self.store
            .mark_ski_area(&area.id, false, &member_keys(&members))
            .await
    }

    // ─── Registry pass with merging ──────────────────────────────

    async fn merge_or_assign_registry_areas(&self) -> Result<()> {
        tracing::info!("Merging registry ski areas with crowdsourced neighbours");
        let mut cursor = self
            .store
            .ski_areas(SkiAreaFilter {
                source: Some(SourceType::Registry),
                only_polygons: false,
                within_polygon: None,
                ttl: Some(self.config.enumeration_ttl),
            })
            .await?;
        while let Some(batch) = cursor.next_batch().await? {
            try_join_all(batch.into_iter().map(|area| self.process_registry_area(area))).await?;
        }
        Ok(())
    }

    async fn process_registry_area(&self, area: MapObject) -> Result<()> {
        let candidates = self.merge_candidates(&area).await?;
        if candidates.is_empty() {
            return self.process_buffered_area(area).await;
        }
        // The merged area does not go on to absorb nearby unassigned
        // objects; its members are whatever the inputs already claimed.
        merge_ski_areas(&self.store, &self.composer, area, candidates).await
    }

    /// Ski areas from other sources referenced by objects within the merge
    /// buffer of `area`.
    async fn merge_candidates(&self, area: &MapObject) -> Result<Vec<MapObject>> {
        let Some(buffered) = geometry::buffer(&area.geometry, self.config.merge_buffer_km) else {
            return Ok(Vec::new());
        };

        let activities = if area.activities.is_empty() {
            all_ski_area_activities()
        } else {
            area.activities.clone()
        };
        let search = SearchContext {
            id: area.id.clone(),
            activities,
            exclude_objects_in_ski_area_polygon: false,
            already_visited: BTreeSet::from([area.key.clone()]),
        };

        let visitor = Visitor::new(&self.store, &self.config);
        let mut referenced_ids: BTreeSet<String> = BTreeSet::new();
        for polygon in component_polygons(&buffered)? {
            let found = visitor
                .query_nearby(&polygon, SearchPredicate::Intersects, &search)
                .await?;
            for object in found {
                referenced_ids.extend(object.ski_areas);
            }
        }
        if referenced_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = referenced_ids.into_iter().collect();
        let referenced = self.store.ski_areas_by_id(&ids).await?;
        Ok(referenced
            .into_iter()
            .filter(|s| s.source != area.source)
            .collect())
    }

    // ─── Synthesis from unassigned runs ──────────────────────────

    async fn synthesize_from_unassigned_runs(&self) -> Result<()> {
        tracing::info!("Synthesizing ski areas from unassigned runs");
        while let Some(run) = self.store.next_unassigned_run().await? {
            if let Err(error) = self.synthesize_ski_area(&run).await {
                tracing::error!(
                    key = %run.key,
                    error = %error,
                    "Failed to synthesize ski area from run; skipping"
                );
                self.store.clear_basis_flag(&run.key).await?;
            }
        }
        Ok(())
    }

    async fn synthesize_ski_area(&self, run: &MapObject) -> Result<()> {
        let new_id = Uuid::new_v4().to_string();
        let mut activities = run.ski_area_activities();

        let mut ctx =
            VisitContext::buffered(new_id.clone(), activities.clone(), true, run.key.clone());
        let visitor = Visitor::new(&self.store, &self.config);
        let mut members = visitor.visit_object(&mut ctx, run.clone()).await?;

        // A downhill ski area needs at least one lift
        let has_lift = members.iter().any(|m| m.object_type == ObjectType::Lift);
        if activities.contains(&Activity::Downhill) && !has_lift {
            activities.remove(&Activity::Downhill);
            members.retain(|m| m.has_any_activity(&activities));
        }

        if activities.is_empty() || members.is_empty() {
            tracing::debug!(key = %run.key, "Run cannot seed a ski area; leaving unassigned");
            return self.store.clear_basis_flag(&run.key).await;
        }

        let centroid = geometry::centroid(members.iter().map(|m| m.geometry.clone()))
            .ok_or_else(|| {
                ClusterError::Internal(anyhow::anyhow!(
                    "no centroid for {} member geometries",
                    members.len()
                ))
            })?;

        let ski_area = MapObject {
            key: new_id.clone(),
            id: new_id.clone(),
            object_type: ObjectType::SkiArea,
            geometry: Geometry::Point(centroid),
            activities: activities.clone(),
            source: SourceType::Crowdsourced,
            ski_areas: BTreeSet::new(),
            is_in_ski_area_polygon: false,
            is_basis_for_new_ski_area: false,
            is_in_ski_area_site: false,
            is_polygon: true,
            properties: Some(SkiAreaProperties {
                name: None,
                sources: Vec::new(),
                status: Some(SkiAreaStatus::Operating),
                statistics: None,
                run_convention: geometry::run_convention(&centroid),
                location: None,
                generated: true,
            }),
        };
        self.store.save_ski_area(&ski_area).await?;
        self.store
            .mark_ski_area(&new_id, false, &member_keys(&members))
            .await?;

        tracing::info!(
            id = %new_id,
            members = members.len(),
            activities = ?activities,
            "Synthesized ski area from unassigned runs"
        );
        Ok(())
    }

    // ─── Augmentation ────────────────────────────────────────────

    async fn augment_ski_areas(&self) -> Result<()> {
        tracing::info!("Augmenting ski areas with statistics and locations");
        let mut cursor = self
            .store
            .ski_areas(SkiAreaFilter {
                ttl: Some(self.config.enumeration_ttl),
                ..Default::default()
            })
            .await?;
        while let Some(batch) = cursor.next_batch().await? {
            try_join_all(batch.into_iter().map(|area| self.augment_ski_area(area))).await?;
        }
        Ok(())
    }

    async fn augment_ski_area(&self, mut area: MapObject) -> Result<()> {
        let members = self.store.members_of(&area.id).await?;

        if members.is_empty() && !area.has_registry_source() {
            tracing::info!(id = %area.id, "Removing ski area with no members and no registry source");
            return self.store.remove(&area.key).await;
        }

        let statistics = SkiAreaStatistics::from_members(&members);
        if !members.is_empty() {
            if let Some(centroid) = geometry::centroid(members.iter().map(|m| m.geometry.clone()))
            {
                area.geometry = Geometry::Point(centroid);
            }
        }
        area.is_polygon = false;

        let location = match (&self.geocoder, geometry::centroid_point(&area.geometry)) {
            (Some(geocoder), Some(point)) => match geocoder.locate(point).await {
                Ok(location) => Some(location),
                Err(error) => {
                    tracing::warn!(
                        id = %area.id,
                        error = %error,
                        "Reverse geocoding failed; location left unchanged"
                    );
                    None
                }
            },
            _ => None,
        };

        let convention = geometry::centroid_point(&area.geometry).map(|p| geometry::run_convention(&p));
        let properties = area.properties.get_or_insert_with(Default::default);
        properties.statistics = Some(statistics);
        if let Some(convention) = convention {
            properties.run_convention = convention;
        }
        if let Some(location) = location {
            properties.location = Some(location);
        }

        self.store.save_ski_area(&area).await
    }
}

fn member_keys(members: &[MapObject]) -> Vec<String> {
    members.iter().map(|m| m.key.clone()).collect()
}
