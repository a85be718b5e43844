// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Clustering services: traversal, merging, geocoding and the pipeline.

pub mod geocoder;
pub mod merge;
pub mod pipeline;
pub mod visitor;

pub use geocoder::ReverseGeocoder;
pub use merge::{compose_merged_ski_area, default_composer, merge_ski_areas, MergeComposer};
pub use pipeline::ClusterPipeline;
pub use visitor::{VisitContext, Visitor};
