// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for map objects and ski-area statistics.

pub mod object;
pub mod statistics;

pub use object::{
    all_ski_area_activities, Activity, Location, MapObject, ObjectType, RunConvention,
    SkiAreaProperties, SkiAreaSource, SkiAreaStatus, SourceType,
};
pub use statistics::{ActivityStatistics, SkiAreaStatistics};
