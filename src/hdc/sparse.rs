//! Sparse polynomial hypervectors (optional strategy).
//!
//! A vector is a sorted set of exponents over a finite field
//! `Z_p`, `p = 2^61 - 1` (a Mersenne prime). `bind` adds exponents mod `p`
//! (polynomial multiplication in the exponent group, so it is associative
//! and commutative); `bundle` is set union (superposition as "these terms are
//! all present"); `similarity` is Jaccard overlap of the exponent sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 2^61 - 1, a Mersenne prime, used as the exponent-group modulus.
const FIELD_MOD: u64 = (1u64 << 61) - 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseVec {
    pub geometry: usize,
    /// Sorted, deduplicated exponents in `0..FIELD_MOD`.
    pub exponents: Vec<u64>,
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

impl SparseVec {
    #[must_use]
    pub fn from_name(name: &str, geometry: usize) -> Self {
        let exp = fnv1a64(name.as_bytes()) % FIELD_MOD;
        SparseVec {
            geometry,
            exponents: vec![exp],
        }
    }
}

fn add_mod(a: u64, b: u64) -> u64 {
    let sum = u128::from(a) + u128::from(b);
    (sum % u128::from(FIELD_MOD)) as u64
}

fn sub_mod(a: u64, b: u64) -> u64 {
    let a = i128::from(a);
    let b = i128::from(b);
    let m = i128::from(FIELD_MOD);
    (((a - b) % m + m) % m) as u64
}

#[must_use]
pub fn bind(a: &SparseVec, b: &SparseVec) -> SparseVec {
    let mut set = BTreeSet::new();
    for &ea in &a.exponents {
        for &eb in &b.exponents {
            set.insert(add_mod(ea, eb));
        }
    }
    SparseVec {
        geometry: a.geometry,
        exponents: set.into_iter().collect(),
    }
}

/// Exact when `b` is a single-exponent (pure) vector, mirroring the exact
/// strategy's mode-A guarantee.
#[must_use]
pub fn unbind(c: &SparseVec, b: &SparseVec) -> SparseVec {
    if b.exponents.len() == 1 {
        let eb = b.exponents[0];
        let set: BTreeSet<u64> = c.exponents.iter().map(|&ec| sub_mod(ec, eb)).collect();
        return SparseVec {
            geometry: c.geometry,
            exponents: set.into_iter().collect(),
        };
    }
    bind(c, b)
}

#[must_use]
pub fn bundle(vs: &[&SparseVec]) -> SparseVec {
    assert!(!vs.is_empty(), "bundle requires at least one vector");
    let geometry = vs[0].geometry;
    let mut set = BTreeSet::new();
    for v in vs {
        set.extend(v.exponents.iter().copied());
    }
    SparseVec {
        geometry,
        exponents: set.into_iter().collect(),
    }
}

#[must_use]
pub fn similarity(a: &SparseVec, b: &SparseVec) -> f64 {
    let sa: BTreeSet<u64> = a.exponents.iter().copied().collect();
    let sb: BTreeSet<u64> = b.exponents.iter().copied().collect();
    if sa.is_empty() && sb.is_empty() {
        return 1.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    if union == 0 {
        1.0
    } else {
        intersection as f64 / union as f64
    }
}
