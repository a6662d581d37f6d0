//! Backtracking search (spec.md §4.8): MRV/first-fail variable selection,
//! forward checking, wall-clock timeout and solution cap, deterministic
//! enumeration order.
//!
//! Grounded on the teacher's `recursion` module's worklist-with-checkpoint
//! shape, adapted from semi-naive fixpoint iteration to depth-first search
//! with explicit save/restore of domain state at each choice point.

use super::constraint::Constraint;
use super::domain::DomainManager;
use crate::kb::Kb;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSelection {
    /// Fewest remaining domain values; ties broken by declaration order.
    MinimumRemainingValues,
    /// Fewest remaining values first; ties broken by degree (most
    /// constraints touching other unassigned variables), then declaration
    /// order.
    FirstFail,
}

impl Default for VariableSelection {
    fn default() -> Self {
        VariableSelection::MinimumRemainingValues
    }
}

#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub variable_selection: VariableSelection,
    pub forward_checking: bool,
    pub timeout: Duration,
    pub max_solutions: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            variable_selection: VariableSelection::MinimumRemainingValues,
            forward_checking: true,
            timeout: Duration::from_secs(10),
            max_solutions: 100,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SolveResult {
    pub solutions: Vec<HashMap<String, String>>,
    pub truncated: bool,
    pub timed_out: bool,
}

/// Entry point: exhaustively (up to the cap/timeout) enumerates every
/// assignment of `domains` that satisfies `constraints`.
pub fn solve(domains: &mut DomainManager, constraints: &[Constraint], kb: &Kb, options: &SolveOptions) -> SolveResult {
    let mut result = SolveResult::default();
    let deadline = Instant::now() + options.timeout;
    backtrack(domains, constraints, kb, options, &deadline, &mut result);
    result
}

fn backtrack(
    domains: &mut DomainManager,
    constraints: &[Constraint],
    kb: &Kb,
    options: &SolveOptions,
    deadline: &Instant,
    result: &mut SolveResult,
) -> bool {
    if Instant::now() >= *deadline {
        result.timed_out = true;
        return true;
    }
    if result.solutions.len() >= options.max_solutions {
        result.truncated = true;
        return true;
    }

    if domains.all_assigned() {
        if constraints.iter().all(|c| c.check(domains, kb)) {
            result.solutions.push(domains.snapshot());
        }
        return false;
    }

    let Some(variable) = select_variable(domains, constraints, options.variable_selection) else {
        return false;
    };
    let values = domains.get(&variable).map(|d| d.current_values.clone()).unwrap_or_default();

    for value in values {
        let checkpoints = snapshot_all(domains);
        if let Some(d) = domains.get_mut(&variable) {
            d.assign(&value);
        }

        let consistent = constraints.iter().filter(|c| c.is_checkable(domains)).all(|c| c.check(domains, kb));
        let mut pruned_ok = true;
        if consistent && options.forward_checking {
            pruned_ok = forward_check(domains, constraints, kb, &variable);
        }

        if consistent && pruned_ok {
            let stop = backtrack(domains, constraints, kb, options, deadline, result);
            if stop {
                restore_all(domains, checkpoints);
                return true;
            }
        }

        restore_all(domains, checkpoints);
        if let Some(d) = domains.get_mut(&variable) {
            d.unassign();
        }
    }
    false
}

fn select_variable(domains: &DomainManager, constraints: &[Constraint], selection: VariableSelection) -> Option<String> {
    let unassigned = domains.unassigned();
    if unassigned.is_empty() {
        return None;
    }
    let min_size = unassigned.iter().filter_map(|v| domains.get(v).map(super::domain::Domain::size)).min()?;
    let tied: Vec<&str> = unassigned.into_iter().filter(|v| domains.get(v).is_some_and(|d| d.size() == min_size)).collect();

    match selection {
        VariableSelection::MinimumRemainingValues => tied.first().map(|s| (*s).to_string()),
        VariableSelection::FirstFail => tied
            .into_iter()
            .max_by_key(|v| degree(constraints, v))
            .map(ToString::to_string),
    }
}

fn degree(constraints: &[Constraint], variable: &str) -> usize {
    constraints
        .iter()
        .filter(|c| {
            let vars = c.variables();
            vars.iter().any(|v| v == variable) && vars.len() > 1
        })
        .count()
}

/// After assigning `variable`, removes its value from the current domains of
/// every other unassigned variable that shares an `AllDifferent` constraint
/// with it; returns `false` if any domain is pruned to empty.
fn forward_check(domains: &mut DomainManager, constraints: &[Constraint], _kb: &Kb, variable: &str) -> bool {
    let Some(value) = domains.get(variable).and_then(|d| d.assigned.clone()) else {
        return true;
    };
    let neighbours: Vec<String> = constraints
        .iter()
        .filter_map(|c| match c {
            Constraint::AllDifferent(vars) if vars.iter().any(|v| v == variable) => Some(vars.clone()),
            _ => None,
        })
        .flatten()
        .filter(|v| v != variable)
        .collect();

    for n in neighbours {
        if let Some(d) = domains.get_mut(&n) {
            if d.assigned.is_none() {
                d.remove(&value);
                if d.is_empty() {
                    return false;
                }
            }
        }
    }
    true
}

fn snapshot_all(domains: &DomainManager) -> HashMap<String, Vec<String>> {
    domains.order().iter().filter_map(|v| domains.get(v).map(|d| (v.clone(), d.save_state()))).collect()
}

fn restore_all(domains: &mut DomainManager, snapshot: HashMap<String, Vec<String>>) {
    for (var, state) in snapshot {
        if let Some(d) = domains.get_mut(&var) {
            d.restore_state(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::domain::Domain;

    #[test]
    fn solves_all_different_over_two_variables() {
        let mut domains = DomainManager::new();
        domains.declare(Domain::explicit("X", vec!["a".into(), "b".into()]));
        domains.declare(Domain::explicit("Y", vec!["a".into(), "b".into()]));
        let constraints = vec![Constraint::AllDifferent(vec!["X".into(), "Y".into()])];
        let kb = Kb::new();
        let options = SolveOptions::default();
        let result = solve(&mut domains, &constraints, &kb, &options);
        assert_eq!(result.solutions.len(), 2);
        for sol in &result.solutions {
            assert_ne!(sol["X"], sol["Y"]);
        }
    }

    #[test]
    fn unsatisfiable_returns_no_solutions() {
        let mut domains = DomainManager::new();
        domains.declare(Domain::explicit("X", vec!["a".into()]));
        domains.declare(Domain::explicit("Y", vec!["a".into()]));
        let constraints = vec![Constraint::AllDifferent(vec!["X".into(), "Y".into()])];
        let kb = Kb::new();
        let options = SolveOptions::default();
        let result = solve(&mut domains, &constraints, &kb, &options);
        assert!(result.solutions.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn solution_cap_sets_truncated_flag() {
        let mut domains = DomainManager::new();
        domains.declare(Domain::explicit("X", vec!["a".into(), "b".into(), "c".into()]));
        let constraints: Vec<Constraint> = Vec::new();
        let kb = Kb::new();
        let options = SolveOptions {
            max_solutions: 2,
            ..SolveOptions::default()
        };
        let result = solve(&mut domains, &constraints, &kb, &options);
        assert_eq!(result.solutions.len(), 2);
        assert!(result.truncated);
    }

    #[test]
    fn deterministic_enumeration_order_is_stable() {
        let mut domains_a = DomainManager::new();
        domains_a.declare(Domain::explicit("X", vec!["a".into(), "b".into()]));
        domains_a.declare(Domain::explicit("Y", vec!["a".into(), "b".into()]));
        let constraints = vec![Constraint::AllDifferent(vec!["X".into(), "Y".into()])];
        let kb = Kb::new();
        let options = SolveOptions::default();
        let result_a = solve(&mut domains_a, &constraints, &kb, &options);

        let mut domains_b = DomainManager::new();
        domains_b.declare(Domain::explicit("X", vec!["a".into(), "b".into()]));
        domains_b.declare(Domain::explicit("Y", vec!["a".into(), "b".into()]));
        let result_b = solve(&mut domains_b, &constraints, &kb, &options);

        assert_eq!(result_a.solutions, result_b.solutions);
    }
}
