//! Executor (C6): AST -> vectors, KB writes, and rule registration.
//!
//! Grounded on the teacher's `ir_builder` (AST -> IR lowering pass: resolve
//! names, detect arity/unbound-reference errors, build composite values) but
//! generalized from relational IR to `buildStatementVector`'s bind/bundle
//! composition over positional argument markers.

use crate::config::Config;
use crate::dsl::ast::{Compound, Expr, GraphDef, MacroDef, Program, Statement, StatementKind};
use crate::error::{CoreError, CoreResult};
use crate::hdc::context::HdcContext;
use crate::hdc::Hv;
use crate::kb::Kb;
use crate::pattern;
use crate::rules::{Condition, FactPattern, RuleStore};
use crate::scope::Scope;
use crate::vocabulary::Vocabulary;
use std::collections::HashMap;

/// `learn()`'s result shape (spec.md §6 Session API: `{success, factsAdded,
/// rulesAdded, errors, warnings}`); `success`/`errors` are layered on by
/// `Session::learn`, which also owns the rollback-on-failure transaction.
#[derive(Debug, Default)]
pub struct ExecOutcome {
    pub facts_added: usize,
    pub rules_added: usize,
    pub warnings: Vec<String>,
}

/// Named macro/graph definitions, session-scoped and accumulated across
/// `learn` calls (a macro learned once is callable by every later source).
#[derive(Debug, Default)]
pub struct Definitions {
    pub macros: HashMap<String, MacroDef>,
    pub graphs: HashMap<String, GraphDef>,
}

/// Named-statement condition bindings (`@c1 hasProperty Bob big` -> a
/// `Condition::Leaf` keyed by `c1`), kept alongside `Scope`'s vector
/// bindings. `Scope` alone cannot reconstruct rule structure from a vector,
/// so `Implies`/`And`/`Or`/`Not` dereference through this table instead —
/// this is the "ground-term modus ponens" dereference spec.md §4.7 names.
pub type SymbolTable = HashMap<String, Condition>;

const RESERVED_OPERATORS: &[&str] = &[
    "isA", "has", "can", "must", "causes", "before", "locatedIn", "partOf", "subsetOf",
    "elementOf", "equal", "synonym", "Not", "And", "Or", "Implies", "Default", "Exception", "solve",
];

pub struct Executor<'a> {
    pub vocab: &'a mut Vocabulary,
    pub hdc: &'a mut HdcContext,
    pub kb: &'a mut Kb,
    pub rules: &'a mut RuleStore,
    pub defs: &'a mut Definitions,
    pub symbols: &'a mut SymbolTable,
    pub config: &'a Config,
    pub next_statement_id: &'a mut usize,
    warnings: Vec<String>,
}

impl<'a> Executor<'a> {
    pub fn new(
        vocab: &'a mut Vocabulary,
        hdc: &'a mut HdcContext,
        kb: &'a mut Kb,
        rules: &'a mut RuleStore,
        defs: &'a mut Definitions,
        symbols: &'a mut SymbolTable,
        config: &'a Config,
        next_statement_id: &'a mut usize,
    ) -> Self {
        Executor {
            vocab,
            hdc,
            kb,
            rules,
            defs,
            symbols,
            config,
            next_statement_id,
            warnings: Vec::new(),
        }
    }

    pub fn run_program(&mut self, program: &Program, scope: &mut Scope) -> CoreResult<ExecOutcome> {
        let mut facts_added = 0;
        let mut rules_added = 0;
        for stmt in &program.statements {
            let (f, r) = self.exec_statement(stmt, scope, 0)?;
            facts_added += f;
            rules_added += r;
        }
        Ok(ExecOutcome {
            facts_added,
            rules_added,
            warnings: std::mem::take(&mut self.warnings),
        })
    }

    fn exec_statement(&mut self, stmt: &Statement, scope: &mut Scope, depth: usize) -> CoreResult<(usize, usize)> {
        let id = *self.next_statement_id;
        *self.next_statement_id += 1;
        match &stmt.kind {
            StatementKind::Macro(def) => {
                self.defs.macros.insert(def.name.clone(), def.clone());
                Ok((0, 0))
            }
            StatementKind::Graph(def) => {
                self.defs.graphs.insert(def.name.clone(), def.clone());
                Ok((0, 0))
            }
            StatementKind::Theory(decl) => {
                let mut facts = 0;
                let mut rules = 0;
                for s in &decl.body {
                    let (f, r) = self.exec_statement(s, scope, depth)?;
                    facts += f;
                    rules += r;
                }
                Ok((facts, rules))
            }
            StatementKind::Body { operator, args } => {
                self.exec_body(stmt.dest.as_deref(), operator, args, scope, depth, id)
            }
        }
    }

    fn exec_body(
        &mut self,
        dest: Option<&str>,
        operator: &Expr,
        args: &[Expr],
        scope: &mut Scope,
        depth: usize,
        id: usize,
    ) -> CoreResult<(usize, usize)> {
        let op_name = match operator {
            Expr::Identifier(n) => n.clone(),
            other => {
                return Err(CoreError::Other(format!(
                    "statement operator must be a bare identifier, found {other:?}"
                )))
            }
        };

        if op_name == "Implies" {
            if args.len() != 2 {
                return Err(CoreError::ArityMismatch {
                    operator: "Implies".into(),
                    expected: 2,
                    found: args.len(),
                });
            }
            let antecedent = pattern::to_condition(&args[0], &|n| self.symbols.get(n).cloned())?;
            let consequent = self.resolve_consequent(&args[1])?;
            self.rules.add(antecedent, consequent, id);
            return Ok((0, 1));
        }

        if op_name == "Not" && dest.is_none() && args.len() == 1 {
            // Anonymous `Not $ref`/`Not (fact ...)`: commit the negation of
            // the referenced or inline fact as a KB entry.
            let cond = pattern::to_condition(
                &Expr::Compound(Box::new(Compound {
                    operator: operator.clone(),
                    args: args.to_vec(),
                })),
                &|n| self.symbols.get(n).cloned(),
            )?;
            let Condition::Not(inner) = cond else {
                unreachable!("to_condition(Not(...)) always yields Condition::Not");
            };
            let Condition::Leaf(fact_pattern) = *inner else {
                return Err(CoreError::Other(
                    "Not at statement level requires a leaf fact operand".into(),
                ));
            };
            return self.assert_ground_fact(
                &fact_pattern.operator,
                &pattern_args_to_strings(&fact_pattern)?,
                false,
                scope,
                depth,
                id,
            );
        }

        if (op_name == "And" || op_name == "Or") && dest.is_some() {
            let compound = Expr::Compound(Box::new(Compound {
                operator: operator.clone(),
                args: args.to_vec(),
            }));
            let cond = pattern::to_condition(&compound, &|n| self.symbols.get(n).cloned())?;
            self.symbols.insert(dest.unwrap().to_string(), cond);
            let v = self.build_statement_vector(operator, args, scope, depth, false)?;
            scope.set(dest.unwrap(), v);
            return Ok((0, 0));
        }

        // Macro/graph invocation as a plain statement.
        if !RESERVED_OPERATORS.contains(&op_name.as_str()) {
            if let Some(def) = self.defs.graphs.get(&op_name).cloned() {
                let v = self.invoke_graph(&def, args, scope, depth)?;
                if let Some(name) = dest {
                    scope.set(name, v);
                }
                return Ok((0, 0));
            }
            if let Some(def) = self.defs.macros.get(&op_name).cloned() {
                let v = self.invoke_macro(&def, args, scope, depth)?;
                if let Some(name) = dest {
                    scope.set(name, v);
                }
                return Ok((0, 0));
            }
        }

        // Plain fact statement.
        if let Some(name) = dest {
            let v = self.build_statement_vector(operator, args, scope, depth, false)?;
            scope.set(name, v);
            let fact_pattern = pattern::to_fact_pattern(operator, args)?;
            self.symbols.insert(name.to_string(), Condition::Leaf(fact_pattern));
            Ok((0, 0))
        } else {
            let ground = pattern::ground_args(args)?;
            self.assert_ground_fact(&op_name, &ground, true, scope, depth, id)
        }
    }

    fn assert_ground_fact(
        &mut self,
        operator: &str,
        args: &[String],
        polarity: bool,
        scope: &mut Scope,
        depth: usize,
        id: usize,
    ) -> CoreResult<(usize, usize)> {
        let exprs: Vec<Expr> = args.iter().map(|a| Expr::Identifier(a.clone())).collect();
        let v = self.build_statement_vector(&Expr::Identifier(operator.to_string()), &exprs, scope, depth, false)?;
        let added = self.kb.assert_fact(
            v,
            operator.to_string(),
            args.to_vec(),
            polarity,
            id,
            self.config.reject_contradictions,
        )?;
        Ok((usize::from(added.is_some()), 0))
    }

    fn resolve_consequent(&self, expr: &Expr) -> CoreResult<FactPattern> {
        match expr {
            Expr::Reference(name) => match self.symbols.get(name) {
                Some(Condition::Leaf(fp)) => Ok(fp.clone()),
                Some(_) => Err(CoreError::Other(format!(
                    "rule consequent ${name} must dereference to a single fact, not a compound condition"
                ))),
                None => Err(CoreError::UnboundReference(name.clone())),
            },
            Expr::Compound(c) => pattern::to_fact_pattern(&c.operator, &c.args),
            _ => Err(CoreError::Other("rule consequent must be a fact or a reference to one".into())),
        }
    }

    /// `buildStatementVector`: `opVec bundled with bind(Pos_i, argVec)` for
    /// each positional argument.
    fn build_statement_vector(
        &mut self,
        operator: &Expr,
        args: &[Expr],
        scope: &mut Scope,
        depth: usize,
        allow_holes: bool,
    ) -> CoreResult<Hv> {
        if depth > usize::from(self.config.recursion_horizon) {
            self.warnings.push(format!(
                "statement truncated: recursion horizon {} exceeded",
                self.config.recursion_horizon
            ));
            return Ok(self.vocab.get_or_create("__TRUNCATED__", self.hdc)?);
        }
        let op_vec = self.resolve(operator, scope, depth, allow_holes)?;
        let mut parts = vec![op_vec];
        for (i, arg) in args.iter().enumerate() {
            let arg_vec = self.resolve(arg, scope, depth, allow_holes)?;
            #[allow(clippy::cast_possible_truncation)]
            let pos = (i + 1) as u8;
            parts.push(self.hdc.with_position(pos, &arg_vec)?);
        }
        self.hdc.bundle(&parts)
    }

    fn resolve(&mut self, expr: &Expr, scope: &mut Scope, depth: usize, allow_holes: bool) -> CoreResult<Hv> {
        match expr {
            Expr::Identifier(name) => self.vocab.get_or_create(name, self.hdc),
            Expr::Reference(name) => scope.get_or_err(name).map(Hv::clone),
            Expr::Hole(name) => {
                if allow_holes {
                    self.vocab.get_or_create(&format!("__HOLE_{name}__"), self.hdc)
                } else {
                    Err(CoreError::HoleInNonQueryContext(name.clone()))
                }
            }
            Expr::Literal(lit) => self.vocab.get_or_create(&lit.canonical_name(), self.hdc),
            Expr::Compound(c) => self.build_statement_vector(&c.operator, &c.args, scope, depth + 1, allow_holes),
        }
    }

    fn invoke_graph(&mut self, def: &GraphDef, args: &[Expr], scope: &mut Scope, depth: usize) -> CoreResult<Hv> {
        if depth + 1 > usize::from(self.config.recursion_horizon) {
            self.warnings.push(format!(
                "graph '{}' invocation truncated: recursion horizon {} exceeded",
                def.name, self.config.recursion_horizon
            ));
            return self.vocab.get_or_create("__TRUNCATED__", self.hdc);
        }
        if def.params.len() != args.len() {
            return Err(CoreError::ArityMismatch {
                operator: def.name.clone(),
                expected: def.params.len(),
                found: args.len(),
            });
        }
        let mut child = scope.child();
        for (param, arg) in def.params.iter().zip(args) {
            let v = self.resolve(arg, scope, depth + 1, false)?;
            child.set(param, v);
        }
        for s in &def.body {
            self.exec_statement(s, &mut child, depth + 1)?;
        }
        self.resolve(&def.return_expr, &mut child, depth + 1, false)
    }

    fn invoke_macro(&mut self, def: &MacroDef, args: &[Expr], scope: &mut Scope, depth: usize) -> CoreResult<Hv> {
        if depth + 1 > usize::from(self.config.recursion_horizon) {
            self.warnings.push(format!(
                "macro '{}' invocation truncated: recursion horizon {} exceeded",
                def.name, self.config.recursion_horizon
            ));
            return self.vocab.get_or_create("__TRUNCATED__", self.hdc);
        }
        if def.params.len() != args.len() {
            return Err(CoreError::ArityMismatch {
                operator: def.name.clone(),
                expected: def.params.len(),
                found: args.len(),
            });
        }
        let mut child = scope.child();
        for (param, arg) in def.params.iter().zip(args) {
            let v = self.resolve(arg, scope, depth + 1, false)?;
            child.set(param, v);
        }
        let mut last = self.vocab.get_or_create(&def.name, self.hdc)?;
        for s in &def.body {
            if let StatementKind::Body { operator, args } = &s.kind {
                last = self.build_statement_vector(operator, args, &mut child, depth + 1, false)?;
                if let Some(name) = &s.dest {
                    child.set(name, last.clone());
                }
            }
        }
        Ok(last)
    }
}

fn pattern_args_to_strings(pattern: &FactPattern) -> CoreResult<Vec<String>> {
    pattern
        .args
        .iter()
        .map(|a| match a {
            crate::rules::PatternArg::Const(s) => Ok(s.clone()),
            crate::rules::PatternArg::Var(v) => Err(CoreError::Other(format!(
                "cannot assert a ground fact with free variable ?{v}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parser::parse;
    use crate::hdc::Strategy;

    fn fresh() -> (Vocabulary, HdcContext, Kb, RuleStore, Definitions, SymbolTable, Config, usize) {
        (
            Vocabulary::new(),
            HdcContext::new(Strategy::Exact, 256),
            Kb::new(),
            RuleStore::new(),
            Definitions::default(),
            SymbolTable::new(),
            Config::default(),
            0,
        )
    }

    #[test]
    fn anonymous_fact_commits_to_kb() {
        let (mut vocab, mut hdc, mut kb, mut rules, mut defs, mut symbols, config, mut id) = fresh();
        let mut scope = Scope::new();
        let out = parse("isA Rex Dog\n");
        assert!(out.errors.is_empty());
        let mut exec = Executor::new(&mut vocab, &mut hdc, &mut kb, &mut rules, &mut defs, &mut symbols, &config, &mut id);
        let result = exec.run_program(&out.program, &mut scope).unwrap();
        assert_eq!(result.facts_added, 1);
        assert!(kb.contains("isA", &["Rex".to_string(), "Dog".to_string()], true));
    }

    #[test]
    fn named_statement_does_not_commit_to_kb() {
        let (mut vocab, mut hdc, mut kb, mut rules, mut defs, mut symbols, config, mut id) = fresh();
        let mut scope = Scope::new();
        let out = parse("@c1 hasProperty Bob big\n");
        let mut exec = Executor::new(&mut vocab, &mut hdc, &mut kb, &mut rules, &mut defs, &mut symbols, &config, &mut id);
        let result = exec.run_program(&out.program, &mut scope).unwrap();
        assert_eq!(result.facts_added, 0);
        assert!(kb.is_empty());
        assert!(scope.get("c1").is_some());
    }

    #[test]
    fn implies_registers_a_rule() {
        let (mut vocab, mut hdc, mut kb, mut rules, mut defs, mut symbols, config, mut id) = fresh();
        let mut scope = Scope::new();
        let src = "hasProperty Bob big\nhasProperty Bob cold\n@c1 hasProperty Bob big\n@c2 hasProperty Bob cold\n@a And $c1 $c2\n@k hasProperty Bob green\nImplies $a $k\n";
        let out = parse(src);
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let mut exec = Executor::new(&mut vocab, &mut hdc, &mut kb, &mut rules, &mut defs, &mut symbols, &config, &mut id);
        let result = exec.run_program(&out.program, &mut scope).unwrap();
        assert_eq!(result.rules_added, 1);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.all()[0].consequent.operator, "hasProperty");
    }

    #[test]
    fn not_reference_asserts_negative_fact() {
        let (mut vocab, mut hdc, mut kb, mut rules, mut defs, mut symbols, config, mut id) = fresh();
        let mut scope = Scope::new();
        let src = "@neg can Opus Fly\nNot $neg\n";
        let out = parse(src);
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let mut exec = Executor::new(&mut vocab, &mut hdc, &mut kb, &mut rules, &mut defs, &mut symbols, &config, &mut id);
        exec.run_program(&out.program, &mut scope).unwrap();
        assert!(kb.contains("can", &["Opus".to_string(), "Fly".to_string()], false));
    }

    #[test]
    fn idempotent_relearn_adds_no_new_facts() {
        let (mut vocab, mut hdc, mut kb, mut rules, mut defs, mut symbols, config, mut id) = fresh();
        let mut scope = Scope::new();
        let out = parse("isA Rex Dog\n");
        {
            let mut exec = Executor::new(&mut vocab, &mut hdc, &mut kb, &mut rules, &mut defs, &mut symbols, &config, &mut id);
            exec.run_program(&out.program, &mut scope).unwrap();
        }
        let result = {
            let mut exec = Executor::new(&mut vocab, &mut hdc, &mut kb, &mut rules, &mut defs, &mut symbols, &config, &mut id);
            exec.run_program(&out.program, &mut scope).unwrap()
        };
        assert_eq!(result.facts_added, 0);
        assert_eq!(kb.len(), 1);
    }
}
