//! Variables and domains (C8 substrate).
//!
//! Grounded on the teacher's `schema::ValidationEngine` pattern of a
//! registry keyed by name with explicit save/restore checkpoints for a
//! search procedure to roll back through — here the checkpoint is a
//! domain's `currentValues` snapshot rather than a whole schema.

use crate::kb::Kb;
use crate::reasoner::query::find_all;
use crate::rules::FactPattern;
use std::collections::HashMap;

/// One CSP variable's domain: the original (declared or type-derived) value
/// set, the current (possibly pruned) set, and its assignment if any.
#[derive(Debug, Clone)]
pub struct Domain {
    pub variable: String,
    pub original_values: Vec<String>,
    pub current_values: Vec<String>,
    pub assigned: Option<String>,
}

impl Domain {
    #[must_use]
    pub fn explicit(variable: impl Into<String>, values: Vec<String>) -> Self {
        Domain {
            variable: variable.into(),
            original_values: values.clone(),
            current_values: values,
            assigned: None,
        }
    }

    /// A type-derived domain: enumerates every `isA(?, type)` fact in the KB
    /// (spec.md's `findAllOfType(T)` via C7.findAll).
    #[must_use]
    pub fn type_derived(variable: impl Into<String>, type_name: &str, kb: &Kb) -> Self {
        let pattern = FactPattern {
            operator: "isA".to_string(),
            args: vec![
                crate::rules::PatternArg::Var("x".to_string()),
                crate::rules::PatternArg::Const(type_name.to_string()),
            ],
            polarity: true,
        };
        let mut values: Vec<String> = find_all(&pattern, kb)
            .into_iter()
            .filter_map(|idx| kb.get(idx))
            .map(|entry| entry.args[0].clone())
            .collect();
        values.dedup();
        Domain::explicit(variable, values)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current_values.is_empty()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.current_values.len()
    }

    pub fn remove(&mut self, value: &str) {
        self.current_values.retain(|v| v != value);
    }

    pub fn assign(&mut self, value: &str) {
        self.assigned = Some(value.to_string());
    }

    pub fn unassign(&mut self) {
        self.assigned = None;
    }

    /// A restorable checkpoint of `current_values` for backtracking.
    #[must_use]
    pub fn save_state(&self) -> Vec<String> {
        self.current_values.clone()
    }

    pub fn restore_state(&mut self, state: Vec<String>) {
        self.current_values = state;
    }
}

/// A named registry of domains, in declaration order (used to break MRV
/// ties deterministically).
#[derive(Debug, Default)]
pub struct DomainManager {
    order: Vec<String>,
    domains: HashMap<String, Domain>,
}

impl DomainManager {
    #[must_use]
    pub fn new() -> Self {
        DomainManager::default()
    }

    pub fn declare(&mut self, domain: Domain) {
        if !self.domains.contains_key(&domain.variable) {
            self.order.push(domain.variable.clone());
        }
        self.domains.insert(domain.variable.clone(), domain);
    }

    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&Domain> {
        self.domains.get(variable)
    }

    pub fn get_mut(&mut self, variable: &str) -> Option<&mut Domain> {
        self.domains.get_mut(variable)
    }

    /// Declaration order, used to break MRV ties (spec.md §4.8).
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn unassigned(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|v| self.domains.get(*v).is_some_and(|d| d.assigned.is_none()))
            .map(String::as_str)
            .collect()
    }

    #[must_use]
    pub fn all_assigned(&self) -> bool {
        self.domains.values().all(|d| d.assigned.is_some())
    }

    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.domains
            .iter()
            .filter_map(|(k, d)| d.assigned.clone().map(|v| (k.clone(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdc::{create_from_name, Strategy};

    fn v() -> crate::hdc::Hv {
        create_from_name("x", 64, Strategy::Exact)
    }

    #[test]
    fn explicit_domain_tracks_removal() {
        let mut d = Domain::explicit("X", vec!["a".into(), "b".into(), "c".into()]);
        d.remove("b");
        assert_eq!(d.size(), 2);
        assert!(!d.is_empty());
    }

    #[test]
    fn save_and_restore_state_round_trips() {
        let mut d = Domain::explicit("X", vec!["a".into(), "b".into()]);
        let checkpoint = d.save_state();
        d.remove("a");
        assert_eq!(d.size(), 1);
        d.restore_state(checkpoint);
        assert_eq!(d.size(), 2);
    }

    #[test]
    fn type_derived_domain_enumerates_isa_facts() {
        let mut kb = Kb::new();
        kb.assert_fact(v(), "isA".into(), vec!["Alice".into(), "Guest".into()], true, 0, true)
            .unwrap();
        kb.assert_fact(v(), "isA".into(), vec!["Bob".into(), "Guest".into()], true, 1, true)
            .unwrap();
        let d = Domain::type_derived("X", "Guest", &kb);
        assert_eq!(d.current_values, vec!["Alice".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn manager_preserves_declaration_order() {
        let mut mgr = DomainManager::new();
        mgr.declare(Domain::explicit("B", vec!["1".into()]));
        mgr.declare(Domain::explicit("A", vec!["1".into()]));
        assert_eq!(mgr.order(), &["B".to_string(), "A".to_string()]);
    }
}
