//! Property tests for the HDC substrate's universal invariants: reflexive
//! similarity, quasi-orthogonality of distinct atoms and distinct position
//! markers, and the unbind left-inverse law for each strategy.

use hdcore::hdc::position::{PositionRegistry, MAX_POS};
use hdcore::hdc::{bind, create_from_name, similarity, unbind, Strategy as HdcStrategy};
use proptest::prelude::*;

const GEOMETRY: usize = 8192;

fn arb_strategy() -> impl Strategy<Value = HdcStrategy> {
    prop_oneof![
        Just(HdcStrategy::DenseBinary),
        Just(HdcStrategy::Exact),
        Just(HdcStrategy::SparsePolynomial),
    ]
}

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,15}"
}

proptest! {
    #[test]
    fn similarity_is_reflexive(name in arb_name(), strategy in arb_strategy()) {
        let v = create_from_name(&name, GEOMETRY, strategy);
        let sim = similarity(&v, &v).unwrap();
        prop_assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unbind_is_left_inverse_for_exact(a in arb_name(), b in arb_name()) {
        prop_assume!(a != b);
        let va = create_from_name(&a, GEOMETRY, HdcStrategy::Exact);
        let vb = create_from_name(&b, GEOMETRY, HdcStrategy::Exact);
        let bound = bind(&va, &vb).unwrap();
        let recovered = unbind(&bound, &vb).unwrap();
        prop_assert_eq!(recovered, va);
    }

    #[test]
    fn unbind_is_approximate_left_inverse_for_dense_binary(a in arb_name(), b in arb_name()) {
        prop_assume!(a != b);
        let va = create_from_name(&a, GEOMETRY, HdcStrategy::DenseBinary);
        let vb = create_from_name(&b, GEOMETRY, HdcStrategy::DenseBinary);
        let bound = bind(&va, &vb).unwrap();
        let recovered = unbind(&bound, &vb).unwrap();
        let sim = similarity(&va, &recovered).unwrap();
        prop_assert!(sim >= 0.95, "similarity was {sim}");
    }

    #[test]
    fn distinct_atom_names_are_quasi_orthogonal(a in arb_name(), b in arb_name(), strategy in arb_strategy()) {
        prop_assume!(a != b);
        let va = create_from_name(&a, GEOMETRY, strategy);
        let vb = create_from_name(&b, GEOMETRY, strategy);
        let sim = similarity(&va, &vb).unwrap();
        prop_assert!(sim <= 0.55, "similarity({a}, {b}) = {sim}");
    }
}

#[test]
fn distinct_position_markers_are_quasi_orthogonal() {
    for strategy in [HdcStrategy::DenseBinary, HdcStrategy::Exact, HdcStrategy::SparsePolynomial] {
        let mut registry = PositionRegistry::new();
        for i in 1..MAX_POS {
            for j in (i + 1)..=MAX_POS {
                let pi = registry.get(i, GEOMETRY, strategy).clone();
                let pj = registry.get(j, GEOMETRY, strategy).clone();
                let sim = similarity(&pi, &pj).unwrap();
                assert!(sim < 0.55, "similarity(Pos_{i}, Pos_{j}) = {sim} under {strategy:?}");
            }
        }
    }
}
