// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-source ski-area merging.
//!
//! The composer is a pure function deciding how inputs combine and which
//! record survives; persistence around it is fixed: save the survivor,
//! rewrite references, remove the rest.

use std::sync::Arc;

use crate::db::ClusterStore;
use crate::error::Result;
use crate::models::MapObject;

/// Pure composition function: primary ski area plus cross-source candidates
/// in, merged ski area out. `None` means no merge is possible and the
/// operation becomes a no-op.
pub type MergeComposer = Arc<dyn Fn(&MapObject, &[MapObject]) -> Option<MapObject> + Send + Sync>;

/// The default composer.
///
/// Survivor selection: the first polygon candidate, falling back to the
/// primary. The curated registry name wins when present;
/// sources and activities are unioned; `is_polygon` is preserved when any
/// input was a polygon.
pub fn default_composer() -> MergeComposer {
    Arc::new(compose_merged_ski_area)
}

/// Compose a merged ski area from `primary` and `others`.
pub fn compose_merged_ski_area(primary: &MapObject, others: &[MapObject]) -> Option<MapObject> {
    if others.is_empty() {
        return None;
    }

    let survivor = others
        .iter()
        .find(|o| o.is_polygon)
        .unwrap_or(primary);
    let mut merged = survivor.clone();

    let inputs: Vec<&MapObject> = std::iter::once(primary).chain(others.iter()).collect();

    for input in &inputs {
        merged.activities.extend(input.activities.iter().copied());
    }
    merged.is_polygon = inputs.iter().any(|o| o.is_polygon);

    let properties = merged.properties.get_or_insert_with(Default::default);
    properties.name = inputs
        .iter()
        .filter_map(|o| o.properties.as_ref().and_then(|p| p.name.clone()))
        .next();
    properties.status = inputs
        .iter()
        .filter_map(|o| o.properties.as_ref().and_then(|p| p.status))
        .next();
    properties.sources = Vec::new();
    for input in &inputs {
        if let Some(p) = &input.properties {
            for source in &p.sources {
                if !properties.sources.contains(source) {
                    properties.sources.push(source.clone());
                }
            }
        }
    }

    Some(merged)
}

/// Merge `primary` with `candidates`: persist the composed survivor,
/// rewrite every reference to a non-surviving id, then remove the
/// non-surviving records. The reference rewrite runs under the store's
/// exclusive lock so concurrent markings cannot interleave.
pub async fn merge_ski_areas<S: ClusterStore>(
    store: &S,
    composer: &MergeComposer,
    primary: MapObject,
    candidates: Vec<MapObject>,
) -> Result<()> {
    let Some(merged) = composer(&primary, &candidates) else {
        tracing::debug!(id = %primary.id, "Merge composer declined; ski areas left unchanged");
        return Ok(());
    };

    let inputs: Vec<&MapObject> = std::iter::once(&primary).chain(candidates.iter()).collect();
    let old_ids: Vec<String> = inputs
        .iter()
        .filter(|o| o.id != merged.id)
        .map(|o| o.id.clone())
        .collect();
    let old_keys: Vec<String> = inputs
        .iter()
        .filter(|o| o.key != merged.key)
        .map(|o| o.key.clone())
        .collect();

    store.save_ski_area(&merged).await?;
    store.rewrite_ski_area_refs(&old_ids, &merged.id).await?;
    store.remove_batch(&old_keys).await?;

    tracing::info!(
        survivor = %merged.id,
        merged_count = old_ids.len(),
        "Merged ski areas across sources"
    );
    Ok(())
}
