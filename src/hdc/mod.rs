//! # HDC substrate (C1)
//!
//! The hypervector type and the four core operations (`bind`, `bundle`,
//! `unbind`, `similarity`) plus `top_k`, dispatched over a pluggable
//! `Strategy`. Mixing strategies in one operation is a typed error
//! (`CoreError::StrategyMismatch`), enforced by tagging every vector with its
//! strategy at construction.
//!
//! Grounded on the teacher's tagged-union value type (`value::Value`) for
//! the "one enum, strategy as a discriminant" shape, and on
//! `vector_ops::hamming_distance` for the dense-binary similarity metric.

pub mod dense;
pub mod exact;
pub mod position;
pub mod sparse;

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Strategy tag. Every `Hv` carries one; operations across mismatched tags
/// fail rather than silently reinterpreting bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    DenseBinary,
    Exact,
    SparsePolynomial,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Strategy::DenseBinary => "dense-binary",
            Strategy::Exact => "exact",
            Strategy::SparsePolynomial => "sparse-polynomial",
        };
        write!(f, "{s}")
    }
}

/// The hypervector geometry: bit-width for dense-binary, vocabulary-size
/// hint for exact, modulus-adjacent parameter for sparse-polynomial. The
/// substrate treats this as an opaque `usize` — only the strategy
/// implementation interprets it.
pub type Geometry = usize;

/// A hypervector. A tagged union over the concrete strategy payloads.
/// Immutable after construction, per spec.md §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hv {
    Dense(dense::DenseVec),
    Exact(exact::ExactVec),
    Sparse(sparse::SparseVec),
}

impl Hv {
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match self {
            Hv::Dense(_) => Strategy::DenseBinary,
            Hv::Exact(_) => Strategy::Exact,
            Hv::Sparse(_) => Strategy::SparsePolynomial,
        }
    }

    #[must_use]
    pub fn geometry(&self) -> Geometry {
        match self {
            Hv::Dense(v) => v.dimensions,
            Hv::Exact(v) => v.geometry,
            Hv::Sparse(v) => v.geometry,
        }
    }

    fn check_same_strategy(&self, other: &Hv) -> CoreResult<()> {
        if self.strategy() != other.strategy() {
            return Err(CoreError::StrategyMismatch(
                self.strategy().to_string(),
                other.strategy().to_string(),
            ));
        }
        Ok(())
    }

    /// SHA-256 over the full vector payload (not a prefix), satisfying the
    /// "hash covers the full vector payload" decoding guarantee in spec.md
    /// §4.3.
    #[must_use]
    pub fn content_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.strategy().to_string().as_bytes());
        match self {
            Hv::Dense(v) => {
                for word in &v.words {
                    hasher.update(word.to_le_bytes());
                }
            }
            Hv::Exact(v) => {
                for (id, coeff) in &v.coeffs {
                    hasher.update(id.to_le_bytes());
                    hasher.update(coeff.to_le_bytes());
                }
            }
            Hv::Sparse(v) => {
                for exp in &v.exponents {
                    hasher.update(exp.to_le_bytes());
                }
            }
        }
        hasher.finalize().into()
    }
}

/// Deterministic construction from a name. Same `(name, geometry, strategy)`
/// always yields a bit-identical vector (spec.md §4.1).
#[must_use]
pub fn create_from_name(name: &str, geometry: Geometry, strategy: Strategy) -> Hv {
    match strategy {
        Strategy::DenseBinary => Hv::Dense(dense::DenseVec::from_name(name, geometry)),
        Strategy::Exact => Hv::Exact(exact::ExactVec::from_name(name, geometry)),
        Strategy::SparsePolynomial => Hv::Sparse(sparse::SparseVec::from_name(name, geometry)),
    }
}

/// Associative, commutative bind; each strategy supplies its own definition
/// but guarantees a matching `unbind`.
pub fn bind(a: &Hv, b: &Hv) -> CoreResult<Hv> {
    a.check_same_strategy(b)?;
    Ok(match (a, b) {
        (Hv::Dense(x), Hv::Dense(y)) => Hv::Dense(dense::bind(x, y)),
        (Hv::Exact(x), Hv::Exact(y)) => Hv::Exact(exact::bind(x, y)),
        (Hv::Sparse(x), Hv::Sparse(y)) => Hv::Sparse(sparse::bind(x, y)),
        _ => unreachable!("check_same_strategy guarantees matching variants"),
    })
}

/// Left-inverse of `bind` with respect to `b`: `unbind(bind(a,b), b) == a`
/// (exactly for `Exact`, with similarity >= 1-eps for `DenseBinary`). Only
/// "mode A" (left-inverse) is implemented; "mode B" from the Exact strategy
/// is an Open Question left unimplemented (SPEC_FULL.md §14).
pub fn unbind(c: &Hv, b: &Hv) -> CoreResult<Hv> {
    c.check_same_strategy(b)?;
    Ok(match (c, b) {
        (Hv::Dense(x), Hv::Dense(y)) => Hv::Dense(dense::unbind(x, y)),
        (Hv::Exact(x), Hv::Exact(y)) => Hv::Exact(exact::unbind(x, y)),
        (Hv::Sparse(x), Hv::Sparse(y)) => Hv::Sparse(sparse::unbind(x, y)),
        _ => unreachable!("check_same_strategy guarantees matching variants"),
    })
}

/// Superposition of a set of vectors. Ties (e.g. dense-binary majority vote
/// ties) are broken deterministically by the strategy's canonical
/// lexicographic order, never by iteration-order accident.
pub fn bundle(vs: &[Hv]) -> CoreResult<Hv> {
    let Some(first) = vs.first() else {
        return Err(CoreError::Other("bundle requires at least one vector".into()));
    };
    for v in &vs[1..] {
        first.check_same_strategy(v)?;
    }
    Ok(match first {
        Hv::Dense(_) => {
            let items: Vec<&dense::DenseVec> = vs
                .iter()
                .map(|v| match v {
                    Hv::Dense(d) => d,
                    _ => unreachable!(),
                })
                .collect();
            Hv::Dense(dense::bundle(&items))
        }
        Hv::Exact(_) => {
            let items: Vec<&exact::ExactVec> = vs
                .iter()
                .map(|v| match v {
                    Hv::Exact(e) => e,
                    _ => unreachable!(),
                })
                .collect();
            Hv::Exact(exact::bundle(&items))
        }
        Hv::Sparse(_) => {
            let items: Vec<&sparse::SparseVec> = vs
                .iter()
                .map(|v| match v {
                    Hv::Sparse(s) => s,
                    _ => unreachable!(),
                })
                .collect();
            Hv::Sparse(sparse::bundle(&items))
        }
    })
}

/// Symmetric similarity in `[0,1]`; `1` iff bit-identical.
pub fn similarity(a: &Hv, b: &Hv) -> CoreResult<f64> {
    a.check_same_strategy(b)?;
    Ok(match (a, b) {
        (Hv::Dense(x), Hv::Dense(y)) => dense::similarity(x, y),
        (Hv::Exact(x), Hv::Exact(y)) => exact::similarity(x, y),
        (Hv::Sparse(x), Hv::Sparse(y)) => sparse::similarity(x, y),
        _ => unreachable!("check_same_strategy guarantees matching variants"),
    })
}

/// Top-`k` most similar vectors in `set` to `query`, ties broken by
/// insertion order (stable sort over the input slice's natural order).
pub fn top_k(query: &Hv, set: &[(usize, Hv)], k: usize) -> CoreResult<Vec<(usize, f64)>> {
    let mut scored = Vec::with_capacity(set.len());
    for (idx, v) in set {
        scored.push((*idx, similarity(query, v)?));
    }
    // Stable sort descending by score; stability preserves insertion order
    // on ties, per spec.md §4.1's `topK` guarantee.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    Ok(scored)
}

/// `withPosition(i, v) = bind(Pos_i, v)`.
pub fn with_position(pos: &Hv, v: &Hv) -> CoreResult<Hv> {
    bind(pos, v)
}

/// `removePosition(i, c) = unbind(c, Pos_i)`.
pub fn remove_position(pos: &Hv, c: &Hv) -> CoreResult<Hv> {
    unbind(c, pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_creation() {
        let a = create_from_name("Rex", 1024, Strategy::DenseBinary);
        let b = create_from_name("Rex", 1024, Strategy::DenseBinary);
        assert_eq!(a, b);
    }

    #[test]
    fn similarity_reflexive_all_strategies() {
        for strat in [Strategy::DenseBinary, Strategy::Exact, Strategy::SparsePolynomial] {
            let v = create_from_name("Fido", 1024, strat);
            assert!((similarity(&v, &v).unwrap() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn strategy_mismatch_is_an_error() {
        let a = create_from_name("A", 1024, Strategy::DenseBinary);
        let b = create_from_name("B", 1024, Strategy::Exact);
        assert!(bind(&a, &b).is_err());
    }

    #[test]
    fn unbind_inverts_bind_exact() {
        let a = create_from_name("A", 64, Strategy::Exact);
        let b = create_from_name("B", 64, Strategy::Exact);
        let bound = bind(&a, &b).unwrap();
        let recovered = unbind(&bound, &b).unwrap();
        assert!((similarity(&a, &recovered).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unbind_inverts_bind_dense_binary_highly_similar() {
        let a = create_from_name("A", 8192, Strategy::DenseBinary);
        let b = create_from_name("B", 8192, Strategy::DenseBinary);
        let bound = bind(&a, &b).unwrap();
        let recovered = unbind(&bound, &b).unwrap();
        assert!(similarity(&a, &recovered).unwrap() >= 0.95);
    }

    #[test]
    fn content_hash_changes_with_payload() {
        let a = create_from_name("A", 1024, Strategy::DenseBinary);
        let b = create_from_name("B", 1024, Strategy::DenseBinary);
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn top_k_breaks_ties_by_insertion_order() {
        let q = create_from_name("Q", 64, Strategy::Exact);
        let set = vec![(0, q.clone()), (1, q.clone()), (2, q.clone())];
        let result = top_k(&q, &set, 2).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, 0);
        assert_eq!(result[1].0, 1);
    }
}
