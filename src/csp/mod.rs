//! # CSP solver (C8)
//!
//! Backtracking search over KB-derived or explicit domains, sharing the
//! same knowledge base and hypervector substrate as the reasoner. See
//! spec.md §4.8.

pub mod constraint;
pub mod domain;
pub mod search;

pub use constraint::{ArgRef, Constraint, NamedPredicate};
pub use domain::{Domain, DomainManager};
pub use search::{solve, SolveOptions, SolveResult, VariableSelection};

use crate::error::CoreResult;
use crate::hdc::context::HdcContext;
use crate::kb::Kb;
use crate::vocabulary::Vocabulary;

/// A full CSP problem: named domains plus the constraints over them.
#[derive(Debug, Default)]
pub struct CspSpec {
    pub domains: DomainManager,
    pub constraints: Vec<Constraint>,
}

/// Runs [`solve`] and materializes each solution into the KB as
/// `assignment(var, value)` facts plus a bundled "solution vector"
/// (spec.md §4.8: "bundle of positional binds"), returning the solve result
/// unchanged alongside the solution vectors in declaration-of-variable
/// order.
pub fn solve_and_materialize(
    spec: &mut CspSpec,
    kb: &mut Kb,
    vocab: &mut Vocabulary,
    hdc: &mut HdcContext,
    options: &SolveOptions,
    next_statement_id: &mut usize,
) -> CoreResult<(SolveResult, Vec<crate::hdc::Hv>)> {
    let result = solve(&mut spec.domains, &spec.constraints, kb, options);
    let mut solution_vectors = Vec::with_capacity(result.solutions.len());

    for solution in &result.solutions {
        let mut binds = Vec::with_capacity(spec.domains.order().len());
        for (i, variable) in spec.domains.order().iter().enumerate() {
            let Some(value) = solution.get(variable) else { continue };
            let var_hv = vocab.get_or_create(variable, hdc)?;
            let val_hv = vocab.get_or_create(value, hdc)?;
            let pair = hdc.bind(&var_hv, &val_hv)?;
            let positioned = hdc.with_position(
                u8::try_from(i + 1).unwrap_or(u8::MAX),
                &pair,
            )?;
            binds.push(positioned);

            let fact_vector = hdc.bind(&vocab.get_or_create("assignment", hdc)?, &pair)?;
            kb.assert_fact(
                fact_vector,
                "assignment".to_string(),
                vec![variable.clone(), value.clone()],
                true,
                *next_statement_id,
                false,
            )?;
        }
        *next_statement_id += 1;
        if !binds.is_empty() {
            solution_vectors.push(hdc.bundle(&binds)?);
        }
    }

    Ok((result, solution_vectors))
}
