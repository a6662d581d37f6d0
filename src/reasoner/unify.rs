//! Pattern/ground-term unification and substitution.
//!
//! A goal's `FactPattern` mixes constants and free variables (`?x`); a KB
//! fact's args are always ground strings. `unify` threads a substitution
//! through both directions: matching a rule's consequent pattern against a
//! ground goal, and matching a (partially substituted) antecedent leaf
//! against a ground KB fact.

use crate::rules::{Condition, FactPattern, PatternArg};
use std::collections::HashMap;

pub type Subst = HashMap<String, String>;

/// Extends `subst` so that `pattern_args` matches `fact_args` positionally,
/// or returns `None` on conflict. Consts must match exactly; a `Var` already
/// bound must agree with its prior binding, otherwise it is bound fresh.
#[must_use]
pub fn unify(pattern_args: &[PatternArg], fact_args: &[String], subst: &Subst) -> Option<Subst> {
    if pattern_args.len() != fact_args.len() {
        return None;
    }
    let mut out = subst.clone();
    for (p, f) in pattern_args.iter().zip(fact_args) {
        match p {
            PatternArg::Const(c) => {
                if c != f {
                    return None;
                }
            }
            PatternArg::Var(v) => match out.get(v) {
                Some(bound) if bound != f => return None,
                Some(_) => {}
                None => {
                    out.insert(v.clone(), f.clone());
                }
            },
        }
    }
    Some(out)
}

/// Resolves every arg to a ground string using `subst`; `None` if any `Var`
/// remains unbound.
#[must_use]
pub fn resolve_ground(args: &[PatternArg], subst: &Subst) -> Option<Vec<String>> {
    args.iter()
        .map(|a| match a {
            PatternArg::Const(c) => Some(c.clone()),
            PatternArg::Var(v) => subst.get(v).cloned(),
        })
        .collect()
}

/// Rewrites every bound `Var` in a fact pattern to its `Const` binding,
/// leaving unbound variables untouched.
#[must_use]
pub fn apply_substitution(fp: &FactPattern, subst: &Subst) -> FactPattern {
    FactPattern {
        operator: fp.operator.clone(),
        polarity: fp.polarity,
        args: fp
            .args
            .iter()
            .map(|a| match a {
                PatternArg::Var(v) => subst.get(v).map_or_else(|| a.clone(), |c| PatternArg::Const(c.clone())),
                PatternArg::Const(_) => a.clone(),
            })
            .collect(),
    }
}

/// Recursively applies [`apply_substitution`] across an antecedent tree —
/// used to instantiate a rule's antecedent with the substitution produced by
/// unifying its consequent against the goal.
#[must_use]
pub fn substitute_condition(cond: &Condition, subst: &Subst) -> Condition {
    match cond {
        Condition::Leaf(fp) => Condition::Leaf(apply_substitution(fp, subst)),
        Condition::And(a, b) => Condition::And(
            Box::new(substitute_condition(a, subst)),
            Box::new(substitute_condition(b, subst)),
        ),
        Condition::Or(a, b) => Condition::Or(
            Box::new(substitute_condition(a, subst)),
            Box::new(substitute_condition(b, subst)),
        ),
        Condition::Not(inner) => Condition::Not(Box::new(substitute_condition(inner, subst))),
    }
}
