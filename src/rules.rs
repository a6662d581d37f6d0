//! Rule storage (part of C7's substrate): `Implies` antecedent/consequent
//! pairs over free variables.
//!
//! Grounded on the teacher's `rule_catalog::RuleCatalog` (append-only,
//! indexed-by-id registry with rollback-to-checkpoint support for a failed
//! batch load).

use serde::{Deserialize, Serialize};

/// A fact pattern: an operator applied to a mix of constants and free
/// variables, used for both rule consequents/antecedent leaves and query
/// patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactPattern {
    pub operator: String,
    pub args: Vec<PatternArg>,
    /// `false` for a `Not`-wrapped leaf fact (rare; most negation is
    /// represented via `Condition::Not` instead).
    pub polarity: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternArg {
    Const(String),
    Var(String),
}

impl PatternArg {
    #[must_use]
    pub fn as_var(&self) -> Option<&str> {
        match self {
            PatternArg::Var(v) => Some(v),
            PatternArg::Const(_) => None,
        }
    }
}

/// The antecedent condition tree: facts combined with `And`/`Or`/`Not`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Leaf(FactPattern),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Collects every free variable name appearing anywhere in the tree.
    pub fn collect_vars(&self, out: &mut Vec<String>) {
        match self {
            Condition::Leaf(p) => {
                for a in &p.args {
                    if let PatternArg::Var(v) = a {
                        if !out.contains(v) {
                            out.push(v.clone());
                        }
                    }
                }
            }
            Condition::And(a, b) | Condition::Or(a, b) => {
                a.collect_vars(out);
                b.collect_vars(out);
            }
            Condition::Not(inner) => inner.collect_vars(out),
        }
    }
}

/// A stored rule: `Implies(antecedent, consequent)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: usize,
    pub antecedent: Condition,
    pub consequent: FactPattern,
    pub free_vars: Vec<String>,
    pub source_statement_id: usize,
}

/// Append-only rule store with rollback-to-checkpoint, mirroring `Kb`'s
/// rollback shape for a failed `learn` call.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RuleStore {
    rules: Vec<Rule>,
}

impl RuleStore {
    #[must_use]
    pub fn new() -> Self {
        RuleStore::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn all(&self) -> &[Rule] {
        &self.rules
    }

    pub fn add(&mut self, antecedent: Condition, consequent: FactPattern, source_statement_id: usize) -> usize {
        let mut free_vars = Vec::new();
        antecedent.collect_vars(&mut free_vars);
        for a in &consequent.args {
            if let PatternArg::Var(v) = a {
                if !free_vars.contains(v) {
                    free_vars.push(v.clone());
                }
            }
        }
        let id = self.rules.len();
        self.rules.push(Rule {
            id,
            antecedent,
            consequent,
            free_vars,
            source_statement_id,
        });
        id
    }

    pub fn truncate(&mut self, len: usize) {
        self.rules.truncate(len);
    }
}
