//! Ski-area statistics aggregates.
//!
//! Pre-computed during augmentation (P5) so downstream consumers never have
//! to re-scan member objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geometry;
use crate::models::{Activity, MapObject, ObjectType};

/// Per-activity run summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityStatistics {
    /// Number of runs carrying this activity
    #[serde(default)]
    pub count: u32,
    /// Combined run length in kilometres
    #[serde(default)]
    pub combined_km: f64,
}

/// Numeric summary of a ski area's member objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkiAreaStatistics {
    // ─── Runs ────────────────────────────────────────────────────
    /// Run summaries keyed by activity
    #[serde(default)]
    pub runs: BTreeMap<Activity, ActivityStatistics>,

    // ─── Lifts ───────────────────────────────────────────────────
    /// Number of member lifts
    #[serde(default)]
    pub lift_count: u32,
    /// Combined lift length in kilometres
    #[serde(default)]
    pub lift_combined_km: f64,
}

impl SkiAreaStatistics {
    /// Compute statistics over a ski area's member objects.
    ///
    /// Member ski areas are ignored; only lifts and runs contribute.
    pub fn from_members(members: &[MapObject]) -> Self {
        let mut stats = Self::default();
        for member in members {
            stats.update_from_member(member);
        }
        stats
    }

    fn update_from_member(&mut self, member: &MapObject) {
        let length_km = geometry::geometry_length_km(&member.geometry);
        match member.object_type {
            ObjectType::Run => {
                for activity in &member.activities {
                    let entry = self.runs.entry(*activity).or_default();
                    entry.count += 1;
                    entry.combined_km += length_km;
                }
            }
            ObjectType::Lift => {
                self.lift_count += 1;
                self.lift_combined_km += length_km;
            }
            ObjectType::SkiArea => {}
        }
    }
}
