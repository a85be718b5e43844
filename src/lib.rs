// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ski-area clustering engine.
//!
//! Reconciles ski areas from a crowdsourced map database and a curated
//! resort registry with the lifts and runs around them. Upstream data
//! carries no membership links, so the engine infers them: polygon
//! containment first, then buffered flood fill, cross-source merging,
//! and synthesis of ski areas from runs nothing claimed. A final pass
//! annotates every surviving ski area with statistics, a centroid
//! geometry and an optional reverse-geocoded location.

pub mod config;
pub mod db;
pub mod error;
pub mod geometry;
pub mod models;
pub mod services;

use std::sync::Arc;

use config::ClusterConfig;
use db::ClusterStore;
use services::{ClusterPipeline, ReverseGeocoder};

/// Run the full clustering pipeline over a populated store.
///
/// Configuration is read from the environment; pass a geocoder to have
/// ski-area locations resolved best-effort.
pub async fn run_clustering<S: ClusterStore>(
    store: S,
    geocoder: Option<Arc<dyn ReverseGeocoder>>,
) -> error::Result<()> {
    let mut pipeline = ClusterPipeline::new(store, ClusterConfig::from_env());
    if let Some(geocoder) = geocoder {
        pipeline = pipeline.with_geocoder(geocoder);
    }
    pipeline.run().await
}
