//! `HdcContext`: the session-owned handle onto the substrate.
//!
//! Wraps the free functions in `hdc` with session-local operation counters
//! (`hdcBindOps`, `hdcBundleOps`, ...) and owns the `PositionRegistry`
//! cache, per spec.md §4.1 ("each call increments session-local counters
//! ... when the call carries a session handle") and §4.2/§9
//! ("`HdcContext` type owned by the session").

use super::position::PositionRegistry;
use super::{Geometry, Hv, Strategy};
use crate::error::CoreResult;
use serde::{Deserialize, Serialize};

/// HDC operation counters, exposed via `Session::stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdcCounters {
    pub hdc_bind_ops: u64,
    pub hdc_bundle_ops: u64,
    pub hdc_unbind_ops: u64,
    pub hdc_similarity_ops: u64,
    pub hdc_top_k_ops: u64,
    pub hdc_create_ops: u64,
}

#[derive(Debug)]
pub struct HdcContext {
    pub strategy: Strategy,
    pub geometry: Geometry,
    pub positions: PositionRegistry,
    pub counters: HdcCounters,
}

impl HdcContext {
    #[must_use]
    pub fn new(strategy: Strategy, geometry: Geometry) -> Self {
        HdcContext {
            strategy,
            geometry,
            positions: PositionRegistry::new(),
            counters: HdcCounters::default(),
        }
    }

    pub fn create(&mut self, name: &str) -> Hv {
        self.counters.hdc_create_ops += 1;
        super::create_from_name(name, self.geometry, self.strategy)
    }

    pub fn bind(&mut self, a: &Hv, b: &Hv) -> CoreResult<Hv> {
        self.counters.hdc_bind_ops += 1;
        super::bind(a, b)
    }

    pub fn unbind(&mut self, c: &Hv, b: &Hv) -> CoreResult<Hv> {
        self.counters.hdc_unbind_ops += 1;
        super::unbind(c, b)
    }

    pub fn bundle(&mut self, vs: &[Hv]) -> CoreResult<Hv> {
        self.counters.hdc_bundle_ops += 1;
        super::bundle(vs)
    }

    pub fn similarity(&mut self, a: &Hv, b: &Hv) -> CoreResult<f64> {
        self.counters.hdc_similarity_ops += 1;
        super::similarity(a, b)
    }

    pub fn top_k(&mut self, query: &Hv, set: &[(usize, Hv)], k: usize) -> CoreResult<Vec<(usize, f64)>> {
        self.counters.hdc_top_k_ops += 1;
        super::top_k(query, set, k)
    }

    pub fn with_position(&mut self, i: u8, v: &Hv) -> CoreResult<Hv> {
        self.counters.hdc_bind_ops += 1;
        self.positions.with_position(i, self.geometry, self.strategy, v)
    }

    pub fn remove_position(&mut self, i: u8, c: &Hv) -> CoreResult<Hv> {
        self.counters.hdc_unbind_ops += 1;
        self.positions.remove_position(i, self.geometry, self.strategy, c)
    }

    pub fn reset_counters(&mut self) {
        self.counters = HdcCounters::default();
    }
}
