//! Knowledge base (part of Session state): an ordered, append-only fact
//! store with dedup and contradiction checking.
//!
//! Grounded on the teacher's `catalog::Catalog`/`rule_catalog::RuleCatalog`
//! ordered-registry pattern: a `Vec` for canonical insertion-order iteration,
//! plus `HashMap` indices for O(1) dedup and operator-scoped scanning.

use crate::error::{CoreError, CoreResult};
use crate::hdc::Hv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `{ vector, metadata: { operator, args[], polarity, sourceStatementId } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbEntry {
    pub vector: Hv,
    pub operator: String,
    pub args: Vec<String>,
    pub polarity: bool,
    pub source_statement_id: usize,
}

/// Key used for dedup and negation bookkeeping: `(operator, args, polarity)`
/// minus polarity, since negation-checking needs the polarity-free key.
fn fact_key(operator: &str, args: &[String]) -> String {
    let mut key = operator.to_string();
    for a in args {
        key.push('\u{1}');
        key.push_str(a);
    }
    key
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Kb {
    entries: Vec<KbEntry>,
    /// `(operator, args)` -> index of the entry with `polarity == true`.
    positive_index: HashMap<String, usize>,
    /// `(operator, args)` -> index of the entry with `polarity == false`.
    negative_index: HashMap<String, usize>,
    /// operator -> entry indices, insertion order, for `findAll` scans.
    by_operator: HashMap<String, Vec<usize>>,
}

impl Kb {
    #[must_use]
    pub fn new() -> Self {
        Kb::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[KbEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&KbEntry> {
        self.entries.get(idx)
    }

    /// Indices of entries with the given operator, in insertion order.
    #[must_use]
    pub fn by_operator(&self, operator: &str) -> &[usize] {
        self.by_operator.get(operator).map_or(&[], Vec::as_slice)
    }

    /// True if an identical `(operator, args, polarity)` entry already
    /// exists (spec.md §3 dedup invariant).
    #[must_use]
    pub fn contains(&self, operator: &str, args: &[String], polarity: bool) -> bool {
        let key = fact_key(operator, args);
        let index = if polarity {
            &self.positive_index
        } else {
            &self.negative_index
        };
        index.contains_key(&key)
    }

    /// Returns the existing entry of the opposite polarity for the same
    /// `(operator, args)`, if any.
    #[must_use]
    pub fn opposing(&self, operator: &str, args: &[String], polarity: bool) -> Option<&KbEntry> {
        let key = fact_key(operator, args);
        let index = if polarity {
            &self.negative_index
        } else {
            &self.positive_index
        };
        index.get(&key).and_then(|&i| self.entries.get(i))
    }

    /// Appends a new fact. Returns `Ok(None)` if it was a duplicate
    /// (idempotent, invariant 5) and nothing was added; `Ok(Some(index))`
    /// if it was newly inserted; `Err(Contradiction)` if `reject_contradictions`
    /// is true and an opposing-polarity entry already exists.
    pub fn assert_fact(
        &mut self,
        vector: Hv,
        operator: String,
        args: Vec<String>,
        polarity: bool,
        source_statement_id: usize,
        reject_contradictions: bool,
    ) -> CoreResult<Option<usize>> {
        if self.contains(&operator, &args, polarity) {
            return Ok(None);
        }
        if reject_contradictions && self.opposing(&operator, &args, polarity).is_some() {
            return Err(CoreError::Contradiction {
                operator: operator.clone(),
                args: args.clone(),
            });
        }
        let idx = self.entries.len();
        let key = fact_key(&operator, &args);
        if polarity {
            self.positive_index.insert(key, idx);
        } else {
            self.negative_index.insert(key, idx);
        }
        self.by_operator.entry(operator.clone()).or_default().push(idx);
        self.entries.push(KbEntry {
            vector,
            operator,
            args,
            polarity,
            source_statement_id,
        });
        Ok(Some(idx))
    }

    /// Truncates back to `len` entries, rebuilding all indices — used to roll
    /// back a failed `learn` call (spec.md §3: "on failure the whole learn
    /// call is rolled back").
    pub fn truncate(&mut self, len: usize) {
        if len >= self.entries.len() {
            return;
        }
        self.entries.truncate(len);
        self.positive_index.clear();
        self.negative_index.clear();
        self.by_operator.clear();
        for (idx, e) in self.entries.iter().enumerate() {
            let key = fact_key(&e.operator, &e.args);
            if e.polarity {
                self.positive_index.insert(key, idx);
            } else {
                self.negative_index.insert(key, idx);
            }
            self.by_operator.entry(e.operator.clone()).or_default().push(idx);
        }
    }
}
