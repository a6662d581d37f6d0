//! Position registry (C2).
//!
//! `getPosition(i, geom, strategy)` returns the deterministic HV
//! `createFromName("__POS_i__", geom, strategy)`, cached per
//! `(strategy, geom, i)`. The cache lives on a `PositionRegistry` owned by
//! the session's `HdcContext` — stateless strategies could in principle
//! share a process-level cache, but since sessions never share mutable state
//! (spec.md §3, §5), this crate always scopes the cache to the owning
//! session, which is simplest and still satisfies "cached per
//! `(strategy, geom, i)`" exactly.

use super::{create_from_name, similarity, Geometry, Hv, Strategy};
use crate::error::CoreResult;
use std::collections::HashMap;

/// Maximum position index, per spec.md §3.
pub const MAX_POS: u8 = 20;

#[derive(Debug, Default)]
pub struct PositionRegistry {
    cache: HashMap<(Strategy, Geometry, u8), Hv>,
}

impl PositionRegistry {
    #[must_use]
    pub fn new() -> Self {
        PositionRegistry {
            cache: HashMap::new(),
        }
    }

    /// Returns `Pos_i`, creating and caching it on first request.
    pub fn get(&mut self, i: u8, geometry: Geometry, strategy: Strategy) -> &Hv {
        self.cache
            .entry((strategy, geometry, i))
            .or_insert_with(|| create_from_name(&format!("__POS_{i}__"), geometry, strategy))
    }

    /// `withPosition(i, v) = bind(Pos_i, v)`.
    pub fn with_position(
        &mut self,
        i: u8,
        geometry: Geometry,
        strategy: Strategy,
        v: &Hv,
    ) -> CoreResult<Hv> {
        let pos = self.get(i, geometry, strategy).clone();
        super::bind(&pos, v)
    }

    /// `removePosition(i, c) = unbind(c, Pos_i)`.
    pub fn remove_position(
        &mut self,
        i: u8,
        geometry: Geometry,
        strategy: Strategy,
        c: &Hv,
    ) -> CoreResult<Hv> {
        let pos = self.get(i, geometry, strategy).clone();
        super::unbind(c, &pos)
    }

    /// Verifies the quasi-orthogonality invariant (spec.md §8 invariant 4)
    /// for all cached positions under a given strategy/geometry.
    pub fn verify_quasi_orthogonal(&mut self, geometry: Geometry, strategy: Strategy) -> CoreResult<bool> {
        let positions: Vec<Hv> = (1..=MAX_POS)
            .map(|i| self.get(i, geometry, strategy).clone())
            .collect();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if similarity(&positions[i], &positions[j])? >= 0.55 {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
