//! Exact (appearance-index) hypervectors.
//!
//! A formal sum over an atom-id basis: `{ atom_id -> coefficient }`, sorted
//! by id for a canonical, hashable, comparable representation. `bind` is
//! XOR-convolution over the id group (XOR is closed, associative,
//! commutative and self-inverse on `u64`) with coefficients multiplying
//! across cross terms; `bundle` is coefficient-wise addition. Because every
//! atom/position vector this crate constructs is a *pure* single-term vector
//! (`{id: 1}`), `unbind(bind(a, b), b) == a` holds exactly whenever `b` is
//! such a pure vector — this is "mode A" (left-inverse) from SPEC_FULL.md
//! §14; "mode B" is not implemented.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactVec {
    pub geometry: usize,
    /// Sorted `(atom_id, coefficient)` pairs; no duplicate ids.
    pub coeffs: Vec<(u64, i64)>,
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

impl ExactVec {
    #[must_use]
    pub fn from_name(name: &str, geometry: usize) -> Self {
        let id = fnv1a64(name.as_bytes());
        ExactVec {
            geometry,
            coeffs: vec![(id, 1)],
        }
    }

    fn as_map(&self) -> BTreeMap<u64, i64> {
        self.coeffs.iter().copied().collect()
    }

    fn from_map(geometry: usize, map: BTreeMap<u64, i64>) -> Self {
        ExactVec {
            geometry,
            coeffs: map.into_iter().filter(|(_, c)| *c != 0).collect(),
        }
    }

    /// True iff this vector is a single pure atom/position term.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.coeffs.len() == 1 && self.coeffs[0].1 == 1
    }
}

#[must_use]
pub fn bind(a: &ExactVec, b: &ExactVec) -> ExactVec {
    let mut out: BTreeMap<u64, i64> = BTreeMap::new();
    for &(id_a, c_a) in &a.coeffs {
        for &(id_b, c_b) in &b.coeffs {
            let id = id_a ^ id_b;
            *out.entry(id).or_insert(0) += c_a * c_b;
        }
    }
    ExactVec::from_map(a.geometry, out)
}

/// Exact when `b` is a pure single-term vector (the only case this crate
/// relies on): `unbind(bind(a,b), b) = a` because XOR is self-inverse and
/// `b`'s sole coefficient is `1`.
#[must_use]
pub fn unbind(c: &ExactVec, b: &ExactVec) -> ExactVec {
    if b.coeffs.len() == 1 {
        let (id_b, c_b) = b.coeffs[0];
        let mut out = BTreeMap::new();
        for &(id_c, coeff_c) in &c.coeffs {
            let id = id_c ^ id_b;
            let coeff = if c_b != 0 && coeff_c % c_b == 0 {
                coeff_c / c_b
            } else {
                coeff_c
            };
            *out.entry(id).or_insert(0) += coeff;
        }
        return ExactVec::from_map(c.geometry, out);
    }
    // General (non-pure) b: best-effort distributive unbind via the same
    // convolution structure; not guaranteed exact (mode B is unimplemented).
    bind(c, b)
}

#[must_use]
pub fn bundle(vs: &[&ExactVec]) -> ExactVec {
    assert!(!vs.is_empty(), "bundle requires at least one vector");
    let geometry = vs[0].geometry;
    let mut out: BTreeMap<u64, i64> = BTreeMap::new();
    for v in vs {
        for &(id, c) in &v.coeffs {
            *out.entry(id).or_insert(0) += c;
        }
    }
    ExactVec::from_map(geometry, out)
}

#[must_use]
pub fn similarity(a: &ExactVec, b: &ExactVec) -> f64 {
    let am = a.as_map();
    let bm = b.as_map();
    let dot: f64 = am
        .iter()
        .filter_map(|(id, ca)| bm.get(id).map(|cb| (*ca as f64) * (*cb as f64)))
        .sum();
    let norm_a: f64 = am.values().map(|c| (*c as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = bm.values().map(|c| (*c as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 && norm_b == 0.0 {
        return 1.0;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.5;
    }
    let cosine = dot / (norm_a * norm_b);
    ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ExactVec::from_name("Rex", 64);
        let b = ExactVec::from_name("Rex", 64);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_atoms_orthogonal() {
        let a = ExactVec::from_name("Rex", 64);
        let b = ExactVec::from_name("Dog", 64);
        assert!((similarity(&a, &b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn self_similarity_one() {
        let a = ExactVec::from_name("Rex", 64);
        assert!((similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unbind_inverts_bind_for_pure_vectors() {
        let a = ExactVec::from_name("A", 64);
        let b = ExactVec::from_name("B", 64);
        let bound = bind(&a, &b);
        let recovered = unbind(&bound, &b);
        assert_eq!(recovered, a);
    }

    #[test]
    fn bundle_sums_coefficients() {
        let a = ExactVec::from_name("A", 64);
        let b = ExactVec::from_name("A", 64);
        let bundled = bundle(&[&a, &b]);
        assert_eq!(bundled.coeffs[0].1, 2);
    }
}
