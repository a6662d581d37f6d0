//! # Session facade
//!
//! Owns every piece of session-local state (C1-C8) behind one handle, the
//! way the teacher's `DatalogEngine` owns its catalog/rule-catalog/storage
//! triple. Unlike the teacher's `SessionManager`, there is exactly one
//! session per instance and no cross-session sharing (spec.md §3, §5) — so
//! this is a plain owning struct, not a registry behind an `RwLock`.

use crate::config::{Config, HdcStrategy};
use crate::csp::{solve_and_materialize, CspSpec, SolveOptions, SolveResult};
use crate::dsl::ast::{Expr, GraphDef, MacroDef, StatementKind};
use crate::dsl::parser::parse;
use crate::error::{CoreError, CoreResult, SyntaxError};
use crate::executor::{Definitions, Executor, SymbolTable};
use crate::hdc::context::{HdcContext, HdcCounters};
use crate::hdc::{Hv, Strategy};
use crate::kb::{Kb, KbEntry};
use crate::pattern;
use crate::reasoner::{self, Derivation, QueryResult, ReasonerStats};
use crate::rules::{Condition, RuleStore};
use crate::scope::Scope;
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire format version for [`Session::dump`]/[`Session::from_bytes`].
const DUMP_FORMAT_VERSION: (u16, u16) = (1, 0);

/// `learn()`'s return shape (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnOutcome {
    pub success: bool,
    pub facts_added: usize,
    pub rules_added: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// A single KB fact, rendered for `findAll`/`inspect` results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactView {
    pub operator: String,
    pub args: Vec<String>,
    pub polarity: bool,
    pub source_statement_id: usize,
}

impl From<&KbEntry> for FactView {
    fn from(e: &KbEntry) -> Self {
        FactView {
            operator: e.operator.clone(),
            args: e.args.clone(),
            polarity: e.polarity,
            source_statement_id: e.source_statement_id,
        }
    }
}

/// `findAll()`'s return shape (spec.md §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindAllResult {
    pub results: Vec<FactView>,
}

/// `inspect(name)`'s return shape: everything the session currently knows
/// about one atom name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InspectResult {
    pub known: bool,
    pub facts: Vec<FactView>,
    pub rule_ids: Vec<usize>,
}

/// Combined HDC/reasoner counters for `stats()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub reasoner: ReasonerStats,
    pub hdc: HdcCounters,
}

/// Query options: the only tunable is the result cap (spec.md does not name
/// a default; 1000 is chosen as generous-but-bounded, matching the CSP
/// solver's own "default 100, overridable" posture at a scale appropriate
/// for flat KB scans rather than combinatorial search).
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub max_results: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions { max_results: 1000 }
    }
}

/// The full session-owned state (spec.md §3: "all mutable state ... is
/// owned by exactly one session; no cross-session sharing is permitted").
pub struct Session {
    vocab: Vocabulary,
    hdc: HdcContext,
    scope: Scope,
    kb: Kb,
    rules: RuleStore,
    defs: Definitions,
    symbols: SymbolTable,
    config: Config,
    stats: ReasonerStats,
    next_statement_id: usize,
}

/// Maps the config-level strategy tag to the substrate's algebra. Every
/// substrate variant except `MetricAffine` maps 1:1; `MetricAffine` is named
/// in config (spec.md §6 lists it as a recognized value) but has no
/// `hdc::Strategy` counterpart (SPEC_FULL.md §14 / Open Question 1 scope),
/// so it degrades to `DenseBinary` with a warning rather than failing
/// `Session::new` outright.
fn resolve_substrate_strategy(cfg: &Config) -> Strategy {
    match cfg.resolved_strategy() {
        HdcStrategy::DenseBinary => Strategy::DenseBinary,
        HdcStrategy::Exact => Strategy::Exact,
        HdcStrategy::SparsePolynomial => Strategy::SparsePolynomial,
        HdcStrategy::MetricAffine => {
            tracing::warn!(
                "hdc_strategy = metric-affine has no implemented substrate algebra; \
                 falling back to dense-binary for this session"
            );
            Strategy::DenseBinary
        }
    }
}

impl Session {
    /// Opens a new session from a validated config.
    pub fn new(config: Config) -> CoreResult<Self> {
        config.validate()?;
        let strategy = resolve_substrate_strategy(&config);
        let hdc = HdcContext::new(strategy, config.dimensions);
        Ok(Session {
            vocab: Vocabulary::new(),
            hdc,
            scope: Scope::new(),
            kb: Kb::new(),
            rules: RuleStore::new(),
            defs: Definitions::default(),
            symbols: SymbolTable::new(),
            config,
            stats: ReasonerStats::new(),
            next_statement_id: 0,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parses and executes `source`, committing facts/rules to the session.
    /// On any executor error the whole call is rolled back to the
    /// pre-`learn` KB/rule-store length (spec.md §3); a syntax error aborts
    /// before anything is committed, since no execution has happened yet.
    #[tracing::instrument(skip(self, source), fields(source_len = source.len()))]
    pub fn learn(&mut self, source: &str) -> CoreResult<LearnOutcome> {
        let outcome = parse(source);
        if !outcome.errors.is_empty() {
            return Ok(LearnOutcome {
                success: false,
                errors: outcome.errors.iter().map(SyntaxError::to_string).collect(),
                ..LearnOutcome::default()
            });
        }

        let kb_checkpoint = self.kb.len();
        let rules_checkpoint = self.rules.len();

        let mut executor = Executor::new(
            &mut self.vocab,
            &mut self.hdc,
            &mut self.kb,
            &mut self.rules,
            &mut self.defs,
            &mut self.symbols,
            &self.config,
            &mut self.next_statement_id,
        );

        match executor.run_program(&outcome.program, &mut self.scope) {
            Ok(result) => Ok(LearnOutcome {
                success: true,
                facts_added: result.facts_added,
                rules_added: result.rules_added,
                errors: Vec::new(),
                warnings: result.warnings,
            }),
            Err(e) => {
                self.kb.truncate(kb_checkpoint);
                self.rules.truncate(rules_checkpoint);
                if e.is_fatal() {
                    return Err(e);
                }
                Ok(LearnOutcome {
                    success: false,
                    errors: vec![e.to_string()],
                    ..LearnOutcome::default()
                })
            }
        }
    }

    /// Parses a single `operator arg*` (or `And`/`Or`/`Not`-wrapped) goal
    /// statement and returns a derivation for it.
    #[tracing::instrument(skip(self, goal_source))]
    pub fn prove(&mut self, goal_source: &str) -> CoreResult<Derivation> {
        let condition = self.parse_condition(goal_source)?;
        reasoner::prove(&condition, &self.kb, &self.rules, &self.config, &mut self.stats)
    }

    /// Parses a single (possibly holey) leaf fact pattern and enumerates
    /// every provable binding for it.
    #[tracing::instrument(skip(self, pattern_source))]
    pub fn query(&mut self, pattern_source: &str, opts: QueryOptions) -> CoreResult<QueryResult> {
        let pattern = self.parse_fact_pattern(pattern_source)?;
        Ok(reasoner::query(
            &pattern,
            &self.kb,
            &self.rules,
            &self.config,
            &mut self.stats,
            opts.max_results,
        ))
    }

    /// Parses a single (possibly holey) leaf fact pattern and returns every
    /// literal KB entry that matches it — no rule application.
    #[tracing::instrument(skip(self, pattern_source))]
    pub fn find_all(&self, pattern_source: &str) -> CoreResult<FindAllResult> {
        let pattern = self.parse_fact_pattern(pattern_source)?;
        let results = reasoner::find_all(&pattern, &self.kb)
            .into_iter()
            .filter_map(|idx| self.kb.get(idx))
            .map(FactView::from)
            .collect();
        Ok(FindAllResult { results })
    }

    /// Runs the CSP solver over an already-built domain/constraint spec
    /// (built via [`crate::csp::Domain`]/[`crate::csp::Constraint`], possibly
    /// against this session's own KB via `Domain::type_derived`), and
    /// materializes each solution into the KB. spec.md names `solve(spec)`'s
    /// input as "DSL `solve` block" text, but the grammar in spec.md §4.5
    /// never extends to CSP constructs (no literal syntax for domains or
    /// constraint variants is given) — so this session exposes the builder
    /// API directly rather than inventing an undocumented sub-grammar; the
    /// REPL's `.solve` command builds a [`CspSpec`] the same way.
    #[tracing::instrument(skip(self, spec, options))]
    pub fn solve(&mut self, mut spec: CspSpec, options: SolveOptions) -> CoreResult<(SolveResult, Vec<Hv>)> {
        solve_and_materialize(
            &mut spec,
            &mut self.kb,
            &mut self.vocab,
            &mut self.hdc,
            &options,
            &mut self.next_statement_id,
        )
    }

    /// Everything the session currently knows about one atom name.
    #[must_use]
    pub fn inspect(&self, name: &str) -> InspectResult {
        let known = self.vocab.contains(name);
        let facts = self
            .kb
            .entries()
            .iter()
            .filter(|e| e.operator == name || e.args.iter().any(|a| a == name))
            .map(FactView::from)
            .collect();
        let rule_ids = self
            .rules
            .all()
            .iter()
            .filter(|r| r.consequent.operator == name || r.free_vars.iter().any(|v| v == name))
            .map(|r| r.id)
            .collect();
        InspectResult { known, facts, rule_ids }
    }

    /// Returns a snapshot of the session's counters, optionally resetting
    /// them to zero afterward.
    pub fn stats(&mut self, reset: bool) -> SessionStats {
        let snapshot = SessionStats {
            reasoner: self.stats.clone(),
            hdc: self.hdc.counters.clone(),
        };
        if reset {
            self.stats.reset();
            self.hdc.reset_counters();
        }
        snapshot
    }

    /// Serializes the full session state (vocabulary, scope, KB, rules,
    /// definitions, symbol table, config, reasoner stats) to a versioned
    /// byte buffer. Hypervector payloads are carried as-is (`Hv` already
    /// derives `Serialize`); the position-registry cache is *not* carried —
    /// it rebuilds lazily and deterministically from `(strategy, geometry)`
    /// on first use, so persisting it would only waste bytes.
    pub fn dump(&self) -> CoreResult<Vec<u8>> {
        let snapshot = SessionSnapshot {
            format_version: DUMP_FORMAT_VERSION,
            strategy: self.hdc.strategy,
            geometry: self.hdc.geometry,
            vocab: self.vocab.clone(),
            scope: self.scope.clone(),
            kb: self.kb.clone(),
            rules: self.rules.clone(),
            defs_macros: self.defs.macros.clone(),
            defs_graphs: self.defs.graphs.clone(),
            symbols: self.symbols.clone(),
            config: self.config.clone(),
            stats: self.stats.clone(),
            next_statement_id: self.next_statement_id,
        };
        bincode::serialize(&snapshot).map_err(|e| CoreError::Other(format!("dump serialization failed: {e}")))
    }

    /// Rebuilds a session from a buffer produced by [`Session::dump`].
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let snapshot: SessionSnapshot =
            bincode::deserialize(bytes).map_err(|e| CoreError::Other(format!("dump deserialization failed: {e}")))?;
        if snapshot.format_version.0 != DUMP_FORMAT_VERSION.0 {
            return Err(CoreError::Other(format!(
                "incompatible dump format major version {} (expected {})",
                snapshot.format_version.0, DUMP_FORMAT_VERSION.0
            )));
        }
        let mut hdc = HdcContext::new(snapshot.strategy, snapshot.geometry);
        hdc.counters = HdcCounters::default();
        Ok(Session {
            vocab: snapshot.vocab,
            hdc,
            scope: snapshot.scope,
            kb: snapshot.kb,
            rules: snapshot.rules,
            defs: Definitions {
                macros: snapshot.defs_macros,
                graphs: snapshot.defs_graphs,
            },
            symbols: snapshot.symbols,
            config: snapshot.config,
            stats: snapshot.stats,
            next_statement_id: snapshot.next_statement_id,
        })
    }

    /// Releases the session. The core holds no external resources (file
    /// handles, sockets) so this only documents the lifecycle boundary
    /// spec.md §6 names; dropping the `Session` value does the same thing.
    pub fn close(self) {}

    fn parse_single_body(source: &str) -> CoreResult<(Expr, Vec<Expr>)> {
        let outcome = parse(source);
        if let Some(e) = outcome.errors.into_iter().next() {
            return Err(CoreError::from(e));
        }
        if outcome.program.statements.len() != 1 {
            return Err(CoreError::Other(format!(
                "expected exactly one statement, found {}",
                outcome.program.statements.len()
            )));
        }
        match outcome.program.statements.into_iter().next().unwrap().kind {
            StatementKind::Body { operator, args } => Ok((operator, args)),
            _ => Err(CoreError::Other(
                "expected a fact/condition statement, found a macro, graph or theory".into(),
            )),
        }
    }

    fn parse_condition(&self, source: &str) -> CoreResult<Condition> {
        let (operator, args) = Self::parse_single_body(source)?;
        let wrapped = Expr::Compound(Box::new(crate::dsl::ast::Compound { operator, args }));
        pattern::to_condition(&wrapped, &|n| self.symbols.get(n).cloned())
    }

    fn parse_fact_pattern(&self, source: &str) -> CoreResult<crate::rules::FactPattern> {
        let (operator, args) = Self::parse_single_body(source)?;
        pattern::to_fact_pattern(&operator, &args)
    }
}

/// The serializable subset of [`Session`], versioned independently of the
/// in-memory layout.
#[derive(Debug, Serialize, Deserialize)]
struct SessionSnapshot {
    format_version: (u16, u16),
    strategy: Strategy,
    geometry: crate::hdc::Geometry,
    vocab: Vocabulary,
    scope: Scope,
    kb: Kb,
    rules: RuleStore,
    defs_macros: HashMap<String, MacroDef>,
    defs_graphs: HashMap<String, GraphDef>,
    symbols: SymbolTable,
    config: Config,
    stats: ReasonerStats,
    next_statement_id: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learn_then_prove_direct_fact() {
        let mut session = Session::new(Config { dimensions: 512, ..Config::default() }).unwrap();
        let outcome = session.learn("isA Rex Dog\n").unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.facts_added, 1);
        let deriv = session.prove("isA Rex Dog\n").unwrap();
        assert!(deriv.valid);
    }

    #[test]
    fn learn_rolls_back_on_contradiction() {
        let mut session = Session::new(Config { dimensions: 512, ..Config::default() }).unwrap();
        session.learn("hasProperty Bob big\n").unwrap();
        let kb_len_before = session.kb.len();
        let outcome = session.learn("Not (hasProperty Bob big)\nhasProperty Bob big\n").unwrap();
        assert!(!outcome.success);
        assert_eq!(session.kb.len(), kb_len_before);
    }

    #[test]
    fn query_with_hole_returns_binding() {
        let mut session = Session::new(Config { dimensions: 512, ..Config::default() }).unwrap();
        session.learn("isA Rex Dog\n").unwrap();
        let result = session.query("isA ?x Dog\n", QueryOptions::default()).unwrap();
        assert_eq!(result.bindings.len(), 1);
    }

    #[test]
    fn find_all_never_applies_rules() {
        let mut session = Session::new(Config { dimensions: 512, ..Config::default() }).unwrap();
        session.learn("isA Opus Bird\nImplies(isA ?x Bird, can ?x Fly)\n").unwrap();
        let result = session.find_all("can ?x Fly\n").unwrap();
        assert!(result.results.is_empty());
    }

    #[test]
    fn dump_and_from_bytes_round_trip() {
        let mut session = Session::new(Config { dimensions: 512, ..Config::default() }).unwrap();
        session.learn("isA Rex Dog\n").unwrap();
        let bytes = session.dump().unwrap();
        let mut restored = Session::from_bytes(&bytes).unwrap();
        let deriv = restored.prove("isA Rex Dog\n").unwrap();
        assert!(deriv.valid);
    }

    #[test]
    fn inspect_reports_facts_and_rules() {
        let mut session = Session::new(Config { dimensions: 512, ..Config::default() }).unwrap();
        session.learn("isA Rex Dog\nImplies(isA ?x Dog, can ?x Bark)\n").unwrap();
        let report = session.inspect("Rex");
        assert!(report.known);
        assert_eq!(report.facts.len(), 1);
    }

    #[test]
    fn stats_reset_clears_counters() {
        let mut session = Session::new(Config { dimensions: 512, ..Config::default() }).unwrap();
        session.learn("isA Rex Dog\n").unwrap();
        let _ = session.prove("isA Rex Dog\n").unwrap();
        let before = session.stats(true);
        assert!(before.reasoner.proofs > 0);
        let after = session.stats(false);
        assert_eq!(after.reasoner.proofs, 0);
    }
}
