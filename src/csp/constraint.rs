//! Constraint variants (spec.md §4.8) over a [`DomainManager`] assignment.
//!
//! Grounded on the teacher's `schema::CheckConstraint` tagged-variant model
//! with a uniform `check` entrypoint, generalized from row validation to
//! CSP assignment validation. `Predicate` is a named, fixed predicate
//! (rather than an embedded closure) so constraints stay `Clone`/`Debug` and
//! serializable alongside everything else in the session.

use super::domain::DomainManager;
use crate::kb::Kb;

/// A relation-argument pattern: a mix of bound variable references and
/// ground constants, resolved against the current assignment before the KB
/// is consulted.
#[derive(Debug, Clone)]
pub enum ArgRef {
    Var(String),
    Const(String),
}

impl ArgRef {
    fn resolve(&self, domains: &DomainManager) -> Option<String> {
        match self {
            ArgRef::Const(c) => Some(c.clone()),
            ArgRef::Var(v) => domains.get(v).and_then(|d| d.assigned.clone()),
        }
    }
}

/// A named built-in predicate over resolved string values, evaluated without
/// consulting the KB (e.g. `"distinct"`, `"lexicallyOrdered"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedPredicate {
    Distinct,
    LexicallyOrdered,
}

impl NamedPredicate {
    fn eval(self, values: &[String]) -> bool {
        match self {
            NamedPredicate::Distinct => {
                let mut sorted = values.to_vec();
                sorted.sort();
                sorted.dedup();
                sorted.len() == values.len()
            }
            NamedPredicate::LexicallyOrdered => values.windows(2).all(|w| w[0] <= w[1]),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Constraint {
    /// Holds iff a KB fact with the given operator and (bound-or-constant)
    /// args exists.
    Relational { operator: String, args: Vec<ArgRef> },
    Not(Box<Constraint>),
    And(Vec<Constraint>),
    Or(Vec<Constraint>),
    AllDifferent(Vec<String>),
    Predicate { vars: Vec<String>, predicate: NamedPredicate },
    /// False iff `conflictsWith(p1, p2)` holds in the KB and both variables
    /// are assigned the same value.
    NoConflict { p1: String, p2: String },
    Capacity { table_var: String, guest_vars: Vec<String>, max: usize },
}

impl Constraint {
    /// A constraint is checkable only once every variable it mentions is
    /// assigned; partially-bound constraints are vacuously `true` (spec.md
    /// §4.8: "not yet falsifiable").
    #[must_use]
    pub fn is_checkable(&self, domains: &DomainManager) -> bool {
        self.variables().iter().all(|v| domains.get(v).is_some_and(|d| d.assigned.is_some()))
    }

    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<String>) {
        match self {
            Constraint::Relational { args, .. } => {
                for a in args {
                    if let ArgRef::Var(v) = a {
                        if !out.contains(v) {
                            out.push(v.clone());
                        }
                    }
                }
            }
            Constraint::Not(inner) => inner.collect_vars(out),
            Constraint::And(cs) | Constraint::Or(cs) => {
                for c in cs {
                    c.collect_vars(out);
                }
            }
            Constraint::AllDifferent(vars) | Constraint::Predicate { vars, .. } => {
                for v in vars {
                    if !out.contains(v) {
                        out.push(v.clone());
                    }
                }
            }
            Constraint::NoConflict { p1, p2 } => {
                for v in [p1, p2] {
                    if !out.contains(v) {
                        out.push(v.clone());
                    }
                }
            }
            Constraint::Capacity { table_var, guest_vars, .. } => {
                if !out.contains(table_var) {
                    out.push(table_var.clone());
                }
                for v in guest_vars {
                    if !out.contains(v) {
                        out.push(v.clone());
                    }
                }
            }
        }
    }

    /// Checks the constraint against the current assignment. Returns `true`
    /// if it is not yet checkable (partial binding) or if it holds.
    #[must_use]
    pub fn check(&self, domains: &DomainManager, kb: &Kb) -> bool {
        match self {
            Constraint::Relational { operator, args } => {
                let Some(resolved): Option<Vec<String>> = args.iter().map(|a| a.resolve(domains)).collect() else {
                    return true;
                };
                kb.by_operator(operator).iter().any(|&idx| {
                    kb.get(idx).is_some_and(|e| e.polarity && e.args == resolved)
                })
            }
            Constraint::Not(inner) => {
                if !inner.is_checkable(domains) {
                    return true;
                }
                !inner.check(domains, kb)
            }
            Constraint::And(cs) => cs.iter().all(|c| c.check(domains, kb)),
            Constraint::Or(cs) => {
                if cs.iter().all(|c| c.is_checkable(domains)) {
                    cs.iter().any(|c| c.check(domains, kb))
                } else {
                    true
                }
            }
            Constraint::AllDifferent(vars) => {
                let assigned: Vec<String> = vars.iter().filter_map(|v| domains.get(v).and_then(|d| d.assigned.clone())).collect();
                NamedPredicate::Distinct.eval(&assigned)
            }
            Constraint::Predicate { vars, predicate } => {
                let Some(assigned): Option<Vec<String>> = vars.iter().map(|v| domains.get(v).and_then(|d| d.assigned.clone())).collect() else {
                    return true;
                };
                predicate.eval(&assigned)
            }
            Constraint::NoConflict { p1, p2 } => {
                let (Some(v1), Some(v2)) = (
                    domains.get(p1).and_then(|d| d.assigned.clone()),
                    domains.get(p2).and_then(|d| d.assigned.clone()),
                ) else {
                    return true;
                };
                if v1 != v2 {
                    return true;
                }
                !conflicts_with(kb, p1, p2) && !conflicts_with(kb, &v1, &v2)
            }
            Constraint::Capacity { table_var, guest_vars, max } => {
                let Some(_table) = domains.get(table_var).and_then(|d| d.assigned.clone()) else {
                    return true;
                };
                let assigned_guests = guest_vars
                    .iter()
                    .filter(|v| domains.get(*v).is_some_and(|d| d.assigned.is_some()))
                    .count();
                assigned_guests <= *max
            }
        }
    }
}

/// `conflictsWith(a, b)` queried directly against the KB's `conflictsWith`
/// relation, checked symmetrically since spec.md leaves ordering
/// unspecified for this binary predicate.
fn conflicts_with(kb: &Kb, a: &str, b: &str) -> bool {
    kb.by_operator("conflictsWith").iter().any(|&idx| {
        kb.get(idx).is_some_and(|e| {
            e.polarity && e.args.len() == 2 && ((e.args[0] == a && e.args[1] == b) || (e.args[0] == b && e.args[1] == a))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::domain::Domain;
    use crate::hdc::{create_from_name, Strategy};

    fn v() -> crate::hdc::Hv {
        create_from_name("x", 64, Strategy::Exact)
    }

    fn assigned_manager(pairs: &[(&str, &str)]) -> DomainManager {
        let mut mgr = DomainManager::new();
        for (var, val) in pairs {
            let mut d = Domain::explicit(*var, vec![(*val).to_string()]);
            d.assign(val);
            mgr.declare(d);
        }
        mgr
    }

    #[test]
    fn all_different_rejects_duplicate_assignment() {
        let mgr = assigned_manager(&[("X", "a"), ("Y", "a")]);
        let kb = Kb::new();
        let c = Constraint::AllDifferent(vec!["X".into(), "Y".into()]);
        assert!(!c.check(&mgr, &kb));
    }

    #[test]
    fn all_different_accepts_distinct_assignment() {
        let mgr = assigned_manager(&[("X", "a"), ("Y", "b")]);
        let kb = Kb::new();
        let c = Constraint::AllDifferent(vec!["X".into(), "Y".into()]);
        assert!(c.check(&mgr, &kb));
    }

    #[test]
    fn relational_holds_for_existing_fact() {
        let mut kb = Kb::new();
        kb.assert_fact(v(), "likes".into(), vec!["Alice".into(), "Cake".into()], true, 0, true)
            .unwrap();
        let mgr = assigned_manager(&[("X", "Alice")]);
        let c = Constraint::Relational {
            operator: "likes".into(),
            args: vec![ArgRef::Var("X".into()), ArgRef::Const("Cake".into())],
        };
        assert!(c.check(&mgr, &kb));
    }

    #[test]
    fn unchecked_constraint_is_vacuously_true() {
        let mgr = DomainManager::new();
        let kb = Kb::new();
        let c = Constraint::Relational {
            operator: "likes".into(),
            args: vec![ArgRef::Var("X".into()), ArgRef::Const("Cake".into())],
        };
        assert!(!c.is_checkable(&mgr));
        assert!(c.check(&mgr, &kb));
    }

    #[test]
    fn no_conflict_blocks_conflicting_same_value_assignment() {
        let mut kb = Kb::new();
        kb.assert_fact(v(), "conflictsWith".into(), vec!["Alice".into(), "Bob".into()], true, 0, true)
            .unwrap();
        let mgr = assigned_manager(&[("Alice", "Table1"), ("Bob", "Table1")]);
        let c = Constraint::NoConflict { p1: "Alice".into(), p2: "Bob".into() };
        assert!(!c.check(&mgr, &kb));
    }

    #[test]
    fn capacity_rejects_overfull_table() {
        let mgr = assigned_manager(&[("T", "Table1"), ("G1", "x"), ("G2", "x"), ("G3", "x")]);
        let kb = Kb::new();
        let c = Constraint::Capacity {
            table_var: "T".into(),
            guest_vars: vec!["G1".into(), "G2".into(), "G3".into()],
            max: 2,
        };
        assert!(!c.check(&mgr, &kb));
    }
}
