// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Store adapter interface and the in-memory backend.

pub mod memory;
pub mod store;

pub use memory::MemoryClusterStore;
pub use store::{
    recover_invalid_polygon, ClusterStore, SearchContext, SearchPredicate, SkiAreaCursor,
    SkiAreaFilter,
};
