// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map object model: ski areas, lifts and runs as stored documents.

use geo::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::SkiAreaStatistics;

/// Discriminant for the three map object variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    SkiArea,
    Lift,
    Run,
}

/// Discipline tag on lifts, runs and ski areas.
///
/// Closed set; the pipeline treats it as opaque except for the ski-area
/// relevant subset (`all_ski_area_activities`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Downhill,
    Nordic,
    Backcountry,
}

/// The activities that can define a ski area on their own.
pub fn all_ski_area_activities() -> BTreeSet<Activity> {
    BTreeSet::from([Activity::Downhill, Activity::Nordic])
}

/// Origin feed of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Crowdsourced,
    Registry,
    Generated,
}

/// Operational status of a ski area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkiAreaStatus {
    Operating,
    Disused,
    Abandoned,
    Proposed,
}

/// Regional run-difficulty colour convention, derived from location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunConvention {
    Europe,
    Japan,
    NorthAmerica,
}

impl Default for RunConvention {
    fn default() -> Self {
        RunConvention::NorthAmerica
    }
}

/// Upstream source reference carried on a ski area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkiAreaSource {
    pub source_type: SourceType,
    pub id: String,
}

/// Reverse-geocoded location of a ski area.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    pub country: Option<String>,
    pub region: Option<String>,
    pub locality: Option<String>,
}

/// Ski-area-only properties record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkiAreaProperties {
    pub name: Option<String>,
    #[serde(default)]
    pub sources: Vec<SkiAreaSource>,
    pub status: Option<SkiAreaStatus>,
    pub statistics: Option<SkiAreaStatistics>,
    #[serde(default)]
    pub run_convention: RunConvention,
    pub location: Option<Location>,
    /// True for ski areas synthesized from orphan runs.
    #[serde(default)]
    pub generated: bool,
}

/// A document in the map objects collection.
///
/// A single struct discriminated by `object_type`; ski-area-only fields are
/// meaningless (and left at their defaults) on lifts and runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapObject {
    /// Stable opaque identifier, unique within the store
    pub key: String,
    /// Public identifier (may equal `key`)
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    /// Point, LineString, Polygon or MultiPolygon
    pub geometry: Geometry<f64>,
    #[serde(default)]
    pub activities: BTreeSet<Activity>,
    pub source: SourceType,
    /// Ski-area ids this object is associated with
    #[serde(default)]
    pub ski_areas: BTreeSet<String>,
    /// Monotonic: set once the object is claimed by a polygon-phase pass
    #[serde(default)]
    pub is_in_ski_area_polygon: bool,
    /// Set by ingestion on runs to be synthesized; cleared once consumed
    #[serde(default)]
    pub is_basis_for_new_ski_area: bool,
    /// True when upstream data placed this lift/run inside a site relation
    #[serde(default)]
    pub is_in_ski_area_site: bool,
    /// Ski-area-only: geometry is a polygon/multipolygon
    #[serde(default)]
    pub is_polygon: bool,
    /// Ski-area-only properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SkiAreaProperties>,
}

impl MapObject {
    pub fn is_ski_area(&self) -> bool {
        self.object_type == ObjectType::SkiArea
    }

    /// This object's activities restricted to the ski-area relevant subset.
    pub fn ski_area_activities(&self) -> BTreeSet<Activity> {
        self.activities
            .intersection(&all_ski_area_activities())
            .copied()
            .collect()
    }

    /// Whether this object shares at least one activity with `activities`.
    pub fn has_any_activity(&self, activities: &BTreeSet<Activity>) -> bool {
        self.activities.iter().any(|a| activities.contains(a))
    }

    /// Whether this ski area carries a registry source, either directly or
    /// through an earlier merge.
    pub fn has_registry_source(&self) -> bool {
        self.source == SourceType::Registry
            || self
                .properties
                .as_ref()
                .map(|p| p.sources.iter().any(|s| s.source_type == SourceType::Registry))
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    fn lift(activities: &[Activity]) -> MapObject {
        MapObject {
            key: "lift-1".to_string(),
            id: "lift-1".to_string(),
            object_type: ObjectType::Lift,
            geometry: Geometry::Point(point! { x: 10.0, y: 46.0 }),
            activities: activities.iter().copied().collect(),
            source: SourceType::Crowdsourced,
            ski_areas: BTreeSet::new(),
            is_in_ski_area_polygon: false,
            is_basis_for_new_ski_area: false,
            is_in_ski_area_site: false,
            is_polygon: false,
            properties: None,
        }
    }

    #[test]
    fn test_ski_area_activities_filters_backcountry() {
        let object = lift(&[Activity::Downhill, Activity::Backcountry]);

        let relevant = object.ski_area_activities();
        assert_eq!(relevant, BTreeSet::from([Activity::Downhill]));
    }

    #[test]
    fn test_has_any_activity() {
        let object = lift(&[Activity::Nordic]);

        assert!(object.has_any_activity(&all_ski_area_activities()));
        assert!(!object.has_any_activity(&BTreeSet::from([Activity::Downhill])));
    }

    #[test]
    fn test_registry_source_via_merge_record() {
        let mut area = lift(&[Activity::Downhill]);
        area.object_type = ObjectType::SkiArea;
        assert!(!area.has_registry_source());

        area.properties = Some(SkiAreaProperties {
            sources: vec![SkiAreaSource {
                source_type: SourceType::Registry,
                id: "reg-1".to_string(),
            }],
            ..Default::default()
        });
        assert!(area.has_registry_source());
    }
}
