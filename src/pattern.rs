//! Shared AST -> pattern/condition lowering, used by both the executor
//! (registering `Implies` rules while learning) and the reasoner (parsing a
//! `prove`/`query` goal). Factored out because both need the same
//! `And`/`Or`/`Not`/leaf-fact decomposition over `dsl::ast::Expr`.

use crate::dsl::ast::{Compound, Expr, Literal};
use crate::error::{CoreError, CoreResult};
use crate::rules::{Condition, FactPattern, PatternArg};

/// Lowers a single arg expression to a pattern argument: `?x` becomes a free
/// variable, everything else becomes a ground constant keyed by its
/// canonical vocabulary name. This is the one place in the core where `Hole`
/// is legal outside an explicit query context — spec.md's Rule data model
/// itself calls the antecedent/consequent free variables `?x`.
pub fn to_pattern_arg(expr: &Expr) -> CoreResult<PatternArg> {
    Ok(match expr {
        Expr::Identifier(name) => PatternArg::Const(name.clone()),
        Expr::Literal(lit) => PatternArg::Const(lit.canonical_name()),
        Expr::Hole(name) => PatternArg::Var(name.clone()),
        Expr::Reference(name) => {
            return Err(CoreError::UnboundReference(format!(
                "reference ${name} cannot appear as a bare pattern argument"
            )))
        }
        Expr::Compound(_) => {
            return Err(CoreError::Other(
                "nested compound expressions are not supported as pattern arguments".into(),
            ))
        }
    })
}

fn operator_name(expr: &Expr) -> CoreResult<String> {
    match expr {
        Expr::Identifier(name) => Ok(name.clone()),
        other => Err(CoreError::Other(format!(
            "operator position requires a bare identifier, found {other:?}"
        ))),
    }
}

/// Lowers an `operator arg*` pair (as found in a `Statement::Body` or a
/// `Compound`) into a ground/variable `FactPattern`.
pub fn to_fact_pattern(operator: &Expr, args: &[Expr]) -> CoreResult<FactPattern> {
    let operator = operator_name(operator)?;
    let args = args.iter().map(to_pattern_arg).collect::<CoreResult<Vec<_>>>()?;
    Ok(FactPattern {
        operator,
        args,
        polarity: true,
    })
}

/// Lowers a goal/antecedent expression into a `Condition` tree. `resolve_ref`
/// dereferences a `$name` reference to a previously-bound named statement's
/// condition (the "ground-term modus ponens" dereference spec.md §4.7
/// calls out) — callers without such a binding table may pass a closure that
/// always returns `None`.
pub fn to_condition(expr: &Expr, resolve_ref: &dyn Fn(&str) -> Option<Condition>) -> CoreResult<Condition> {
    match expr {
        Expr::Reference(name) => resolve_ref(name)
            .ok_or_else(|| CoreError::UnboundReference(name.clone())),
        Expr::Compound(c) => lower_compound(c, resolve_ref),
        Expr::Identifier(_) => Err(CoreError::Other(
            "a bare identifier is not a valid condition; wrap it in a fact expression".into(),
        )),
        _ => Err(CoreError::Other("expression is not a valid condition".into())),
    }
}

fn lower_compound(c: &Compound, resolve_ref: &dyn Fn(&str) -> Option<Condition>) -> CoreResult<Condition> {
    if let Expr::Identifier(op) = &c.operator {
        match op.as_str() {
            "And" => {
                let [a, b] = require_two(&c.args, "And")?;
                return Ok(Condition::And(
                    Box::new(to_condition_or_leaf(a, resolve_ref)?),
                    Box::new(to_condition_or_leaf(b, resolve_ref)?),
                ));
            }
            "Or" => {
                let [a, b] = require_two(&c.args, "Or")?;
                return Ok(Condition::Or(
                    Box::new(to_condition_or_leaf(a, resolve_ref)?),
                    Box::new(to_condition_or_leaf(b, resolve_ref)?),
                ));
            }
            "Not" => {
                let a = c
                    .args
                    .first()
                    .ok_or_else(|| CoreError::ArityMismatch {
                        operator: "Not".into(),
                        expected: 1,
                        found: c.args.len(),
                    })?;
                return Ok(Condition::Not(Box::new(to_condition_or_leaf(a, resolve_ref)?)));
            }
            _ => {}
        }
    }
    Ok(Condition::Leaf(to_fact_pattern(&c.operator, &c.args)?))
}

/// A bare `(op args...)` or `$ref` can stand in for a leaf inside And/Or/Not;
/// this tries condition-lowering first (handles `$ref` and nested And/Or/Not)
/// and falls back to a leaf fact pattern.
fn to_condition_or_leaf(expr: &Expr, resolve_ref: &dyn Fn(&str) -> Option<Condition>) -> CoreResult<Condition> {
    match expr {
        Expr::Reference(_) | Expr::Compound(_) => to_condition(expr, resolve_ref),
        _ => Err(CoreError::Other("expected a fact, reference, or nested condition".into())),
    }
}

fn require_two(args: &[Expr], operator: &str) -> CoreResult<[&Expr; 2]> {
    if args.len() != 2 {
        return Err(CoreError::ArityMismatch {
            operator: operator.to_string(),
            expected: 2,
            found: args.len(),
        });
    }
    Ok([&args[0], &args[1]])
}

/// Canonical string args for a ground fact: used when asserting directly
/// into the KB (no free variables permitted).
pub fn ground_args(args: &[Expr]) -> CoreResult<Vec<String>> {
    args.iter()
        .map(|a| match a {
            Expr::Identifier(name) => Ok(name.clone()),
            Expr::Literal(lit) => Ok(lit.canonical_name()),
            Expr::Hole(name) => Err(CoreError::HoleInNonQueryContext(name.clone())),
            Expr::Reference(name) => Err(CoreError::UnboundReference(format!(
                "reference ${name} cannot be used as a ground fact argument"
            ))),
            Expr::Compound(_) => Err(CoreError::Other(
                "nested compound expressions are not supported as ground fact arguments".into(),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::ast::Literal;

    #[test]
    fn pattern_arg_hole_becomes_var() {
        let expr = Expr::Hole("x".into());
        assert_eq!(to_pattern_arg(&expr).unwrap(), PatternArg::Var("x".into()));
    }

    #[test]
    fn fact_pattern_from_operator_and_args() {
        let op = Expr::Identifier("isA".into());
        let args = vec![Expr::Hole("x".into()), Expr::Identifier("Bird".into())];
        let fp = to_fact_pattern(&op, &args).unwrap();
        assert_eq!(fp.operator, "isA");
        assert_eq!(fp.args[0], PatternArg::Var("x".into()));
        assert_eq!(fp.args[1], PatternArg::Const("Bird".into()));
    }

    #[test]
    fn and_condition_from_two_references() {
        let c1 = Condition::Leaf(FactPattern {
            operator: "hasProperty".into(),
            args: vec![PatternArg::Const("Bob".into()), PatternArg::Const("big".into())],
            polarity: true,
        });
        let c2 = c1.clone();
        let resolve = |name: &str| -> Option<Condition> {
            match name {
                "c1" => Some(c1.clone()),
                "c2" => Some(c2.clone()),
                _ => None,
            }
        };
        let expr = Expr::Compound(Box::new(Compound {
            operator: Expr::Identifier("And".into()),
            args: vec![Expr::Reference("c1".into()), Expr::Reference("c2".into())],
        }));
        let cond = to_condition(&expr, &resolve).unwrap();
        assert!(matches!(cond, Condition::And(_, _)));
    }

    #[test]
    fn ground_args_rejects_holes() {
        let args = vec![Expr::Hole("x".into())];
        assert!(ground_args(&args).is_err());
    }

    #[test]
    fn ground_args_uses_literal_canonical_name() {
        let args = vec![Expr::Literal(Literal::Int(5))];
        assert_eq!(ground_args(&args).unwrap(), vec!["__LIT_INT_5__".to_string()]);
    }
}
