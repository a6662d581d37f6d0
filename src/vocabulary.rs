//! Vocabulary (C3): the session-local name <-> hypervector bijection.
//!
//! Grounded on `catalog::Catalog`'s ordered name-registry pattern (a `Vec`
//! for insertion-ordered iteration plus a `HashMap` index for O(1) lookup).

use crate::error::{CoreError, CoreResult};
use crate::hdc::context::HdcContext;
use crate::hdc::Hv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Insertion-ordered atom names (canonical iteration order).
    names: Vec<String>,
    by_name: HashMap<String, Hv>,
    /// Reverse index: full-payload content hash -> name, for decoding.
    by_hash: HashMap<[u8; 32], String>,
}

impl Vocabulary {
    #[must_use]
    pub fn new() -> Self {
        Vocabulary::default()
    }

    /// Returns the existing vector for `name`, or deterministically creates
    /// one via the `HdcContext`.
    pub fn get_or_create(&mut self, name: &str, ctx: &mut HdcContext) -> CoreResult<Hv> {
        if let Some(v) = self.by_name.get(name) {
            return Ok(v.clone());
        }
        let v = ctx.create(name);
        let hash = v.content_hash();
        if let Some(existing_name) = self.by_hash.get(&hash) {
            if existing_name != name {
                return Err(CoreError::VocabularyHashCollision(name.to_string()));
            }
        }
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), v.clone());
        self.by_hash.insert(hash, name.to_string());
        Ok(v)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Hv> {
        self.by_name.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Decode a vector back to its atom name via the full-payload hash.
    #[must_use]
    pub fn decode(&self, v: &Hv) -> Option<&str> {
        self.by_hash.get(&v.content_hash()).map(String::as_str)
    }

    /// Names in insertion (canonical) order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdc::Strategy;

    #[test]
    fn get_or_create_is_idempotent() {
        let mut ctx = HdcContext::new(Strategy::DenseBinary, 1024);
        let mut vocab = Vocabulary::new();
        let a = vocab.get_or_create("Rex", &mut ctx).unwrap();
        let b = vocab.get_or_create("Rex", &mut ctx).unwrap();
        assert_eq!(a, b);
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn decode_recovers_name() {
        let mut ctx = HdcContext::new(Strategy::Exact, 64);
        let mut vocab = Vocabulary::new();
        let v = vocab.get_or_create("Rex", &mut ctx).unwrap();
        assert_eq!(vocab.decode(&v), Some("Rex"));
    }

    #[test]
    fn insertion_order_is_canonical() {
        let mut ctx = HdcContext::new(Strategy::Exact, 64);
        let mut vocab = Vocabulary::new();
        vocab.get_or_create("B", &mut ctx).unwrap();
        vocab.get_or_create("A", &mut ctx).unwrap();
        assert_eq!(vocab.names(), &["B".to_string(), "A".to_string()]);
    }
}
