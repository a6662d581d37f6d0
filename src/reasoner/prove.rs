//! Backward-chaining proof search (C7 core).
//!
//! Grounded on the teacher's `planner::solve_stratified` worker-recursion
//! shape (try-direct -> try-derived -> recurse-on-subgoals), generalized
//! from plan-step resolution to condition proof search under CWA.

use super::stats::ReasonerStats;
use super::transitive::{is_transitive_operator, transitive_bfs};
use super::unify::{resolve_ground, substitute_condition, unify, Subst};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::kb::Kb;
use crate::rules::{Condition, FactPattern, RuleStore};
use serde::{Deserialize, Serialize};

/// A single step in a derivation's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofStep {
    pub operation: String,
    pub fact: Option<String>,
    pub rule_id: Option<usize>,
    pub substitution: Option<Subst>,
    pub detail: Option<String>,
}

impl ProofStep {
    fn kb_match(entry_desc: &str) -> Self {
        ProofStep {
            operation: "kbMatch".into(),
            fact: Some(entry_desc.into()),
            rule_id: None,
            substitution: None,
            detail: None,
        }
    }

    fn rule_applied(rule_id: usize, subst: &Subst) -> Self {
        ProofStep {
            operation: "ruleApplied".into(),
            fact: None,
            rule_id: Some(rule_id),
            substitution: Some(subst.clone()),
            detail: None,
        }
    }

    fn cwa_negation(goal_desc: &str) -> Self {
        ProofStep {
            operation: "cwaNegation".into(),
            fact: Some(goal_desc.into()),
            rule_id: None,
            substitution: None,
            detail: None,
        }
    }

    fn explicit_negation(goal_desc: &str) -> Self {
        ProofStep {
            operation: "explicitNegation".into(),
            fact: Some(goal_desc.into()),
            rule_id: None,
            substitution: None,
            detail: None,
        }
    }

    pub(crate) fn transitive_edge(operator: &str, from: &str, to: &str) -> Self {
        ProofStep {
            operation: "transitiveEdge".into(),
            fact: Some(format!("{operator}({from}, {to})")),
            rule_id: None,
            substitution: None,
            detail: None,
        }
    }
}

fn describe(fp: &FactPattern) -> String {
    let args: Vec<String> = fp
        .args
        .iter()
        .map(|a| match a {
            crate::rules::PatternArg::Const(c) => c.clone(),
            crate::rules::PatternArg::Var(v) => format!("?{v}"),
        })
        .collect();
    format!("{}({})", fp.operator, args.join(", "))
}

/// The outcome of a proof attempt: success carries the binding and the audit
/// trail; failure carries a human-readable reason (spec.md §7's "reason"
/// field on a failed `prove`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Derivation {
    pub valid: bool,
    pub subst: Subst,
    pub used: Vec<usize>,
    pub steps: Vec<ProofStep>,
    pub method: Option<String>,
    pub reason: Option<String>,
}

impl Derivation {
    fn fail(reason: impl Into<String>) -> Self {
        Derivation {
            valid: false,
            subst: Subst::new(),
            used: Vec::new(),
            steps: Vec::new(),
            method: None,
            reason: Some(reason.into()),
        }
    }

    fn succeed(subst: Subst, used: Vec<usize>, steps: Vec<ProofStep>, method: &str) -> Self {
        Derivation {
            valid: true,
            subst,
            used,
            steps,
            method: Some(method.to_string()),
            reason: None,
        }
    }
}

/// Bundles the read-only reasoning substrate plus the mutable stats sink, so
/// the recursive prove functions don't thread five separate parameters.
pub struct Ctx<'a> {
    pub kb: &'a Kb,
    pub rules: &'a RuleStore,
    pub config: &'a Config,
    pub stats: &'a mut ReasonerStats,
}

/// Proves a single ground-or-partially-bound leaf goal: `operator(args...)`.
/// `used` lists KB entry indices already consumed earlier in the same AND
/// chain (spec.md's AND-reuse restriction — a fact satisfies at most one
/// conjunct).
pub fn prove_goal(
    fp: &FactPattern,
    subst: &Subst,
    used: &[usize],
    depth: u64,
    ctx: &mut Ctx,
) -> Derivation {
    if depth > ctx.config.max_proof_depth as u64 {
        return Derivation::fail("max proof depth exceeded");
    }
    ctx.stats.kb_scans += 1;

    // 1. Direct KB match, skipping entries already used in this AND chain.
    for &idx in ctx.kb.by_operator(&fp.operator) {
        if used.contains(&idx) {
            continue;
        }
        let Some(entry) = ctx.kb.get(idx) else { continue };
        if entry.polarity != fp.polarity {
            continue;
        }
        if let Some(new_subst) = unify(&fp.args, &entry.args, subst) {
            let mut next_used = used.to_vec();
            next_used.push(idx);
            return Derivation::succeed(
                new_subst,
                next_used,
                vec![ProofStep::kb_match(&describe(fp))],
                "kbMatch",
            );
        }
    }

    // 2. Explicit negation guard: a KB entry with the opposite polarity
    //    that unifies with the goal blocks rule application outright (spec
    //    §4.7, scenario S6) — an asserted negation overrides anything a
    //    rule would otherwise derive.
    for &idx in ctx.kb.by_operator(&fp.operator) {
        if used.contains(&idx) {
            continue;
        }
        let Some(entry) = ctx.kb.get(idx) else { continue };
        if entry.polarity == fp.polarity {
            continue;
        }
        if unify(&fp.args, &entry.args, subst).is_some() {
            return Derivation::fail("explicit negation");
        }
    }

    // 3. Rule application: unify the goal against each rule's consequent,
    //    then recursively prove the substituted antecedent.
    for rule in ctx.rules.all() {
        if rule.consequent.operator != fp.operator || rule.consequent.polarity != fp.polarity {
            continue;
        }
        ctx.stats.rule_attempts += 1;
        let Some(new_subst) = unify(&rule.consequent.args, &resolve_from_goal(fp, subst), subst) else {
            continue;
        };
        let instantiated = substitute_condition(&rule.antecedent, &new_subst);
        let sub_deriv = prove_condition(&instantiated, &new_subst, used, depth + 1, ctx);
        if sub_deriv.valid {
            let mut steps = sub_deriv.steps;
            steps.push(ProofStep::rule_applied(rule.id, &sub_deriv.subst));
            return Derivation::succeed(sub_deriv.subst, sub_deriv.used, steps, "ruleApplied");
        }
    }

    // 4. Transitive closure fallback for the fixed operator set.
    if is_transitive_operator(&fp.operator) && fp.args.len() == 2 && fp.polarity {
        if let (Some(start), Some(goal)) = (
            resolve_ground(&fp.args[..1], subst),
            resolve_ground(&fp.args[1..], subst),
        ) {
            if let Some(path) = transitive_bfs(
                &fp.operator,
                &start[0],
                &goal[0],
                ctx.kb,
                ctx.config.max_transitive_depth,
                ctx.stats,
            ) {
                return Derivation::succeed(subst.clone(), used.to_vec(), path, "transitiveClosure");
            }
        }
    }

    Derivation::fail("no derivation")
}

/// The goal's args resolved against `subst` where possible, falling back to
/// an unresolved placeholder — used only to thread existing bindings into
/// the consequent unification call; unresolved args still unify freely as
/// fresh variables on the rule side.
fn resolve_from_goal(fp: &FactPattern, subst: &Subst) -> Vec<String> {
    fp.args
        .iter()
        .map(|a| match a {
            crate::rules::PatternArg::Const(c) => c.clone(),
            crate::rules::PatternArg::Var(v) => subst.get(v).cloned().unwrap_or_else(|| format!("?{v}")),
        })
        .collect()
}

/// Proves a condition tree: `Leaf` delegates to `prove_goal`; `And` proves
/// the left side then threads its substitution and `used` set into the
/// right; `Or` tries the left branch then the right; `Not` delegates to
/// [`prove_not`].
pub fn prove_condition(cond: &Condition, subst: &Subst, used: &[usize], depth: u64, ctx: &mut Ctx) -> Derivation {
    if depth > ctx.config.max_proof_depth as u64 {
        return Derivation::fail("max proof depth exceeded");
    }
    match cond {
        Condition::Leaf(fp) => prove_goal(fp, subst, used, depth, ctx),
        Condition::And(a, b) => {
            let left = prove_condition(a, subst, used, depth + 1, ctx);
            if !left.valid {
                return left;
            }
            let right = prove_condition(b, &left.subst, &left.used, depth + 1, ctx);
            if !right.valid {
                return right;
            }
            let mut steps = left.steps;
            steps.extend(right.steps);
            Derivation::succeed(right.subst, right.used, steps, "and")
        }
        Condition::Or(a, b) => {
            let left = prove_condition(a, subst, used, depth + 1, ctx);
            if left.valid {
                return left;
            }
            prove_condition(b, subst, used, depth + 1, ctx)
        }
        Condition::Not(inner) => prove_not(inner, subst, used, depth + 1, ctx),
    }
}

/// Negation as failure under CWA (default): the inner condition is proved
/// *not* to hold. Under the open-world variant (`closed_world_assumption =
/// false`), negation only succeeds when the KB holds an explicit
/// negative-polarity fact matching the leaf — `Not` over a non-leaf
/// condition is unprovable in that mode.
fn prove_not(inner: &Condition, subst: &Subst, used: &[usize], depth: u64, ctx: &mut Ctx) -> Derivation {
    if ctx.config.closed_world_assumption {
        let attempt = prove_condition(inner, subst, used, depth, ctx);
        return if attempt.valid {
            Derivation::fail("negated condition holds under closed-world assumption")
        } else {
            Derivation::succeed(subst.clone(), used.to_vec(), Vec::new(), "CWA")
        };
    }

    let Condition::Leaf(fp) = inner else {
        return Derivation::fail("open-world negation only supports leaf facts");
    };
    let Some(args) = resolve_ground(&fp.args, subst) else {
        return Derivation::fail("cannot evaluate open-world negation with unbound variables");
    };
    if ctx.kb.contains(&fp.operator, &args, !fp.polarity) {
        Derivation::succeed(
            subst.clone(),
            used.to_vec(),
            vec![ProofStep::explicit_negation(&describe(fp))],
            "explicitNegation",
        )
    } else {
        Derivation::fail(format!("no explicit negation of {} found", describe(fp)))
    }
}

/// Top-level entry point: proves `goal` from scratch, updating `stats` and
/// returning a fully-populated [`Derivation`].
pub fn prove(goal: &Condition, kb: &Kb, rules: &RuleStore, config: &Config, stats: &mut ReasonerStats) -> CoreResult<Derivation> {
    stats.queries += 1;
    let mut ctx = Ctx { kb, rules, config, stats };
    let result = prove_condition(goal, &Subst::new(), &[], 0, &mut ctx);
    if result.valid {
        ctx.stats.proofs += 1;
        ctx.stats.total_proof_steps += result.steps.len() as u64;
        ctx.stats.record_proof_depth(result.steps.len() as u64);
    }
    Ok(result)
}

/// Proves with an externally supplied `CoreError` path for callers needing a
/// hard error rather than a failed-but-valid `Derivation` (unused by the
/// direct prove path above, kept for `query`'s candidate loop which wants to
/// short-circuit on malformed patterns rather than silently failing them).
pub fn require_ground(fp: &FactPattern) -> CoreResult<Vec<String>> {
    resolve_ground(&fp.args, &Subst::new())
        .ok_or_else(|| CoreError::Other(format!("{} is not fully ground", describe(fp))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdc::{create_from_name, Strategy};
    use crate::rules::PatternArg;

    fn v() -> crate::hdc::Hv {
        create_from_name("x", 64, Strategy::Exact)
    }

    fn leaf(op: &str, args: &[&str]) -> Condition {
        Condition::Leaf(FactPattern {
            operator: op.to_string(),
            args: args
                .iter()
                .map(|a| {
                    a.strip_prefix('?')
                        .map_or_else(|| PatternArg::Const((*a).to_string()), |v| PatternArg::Var(v.to_string()))
                })
                .collect(),
            polarity: true,
        })
    }

    #[test]
    fn direct_kb_match_succeeds() {
        let mut kb = Kb::new();
        kb.assert_fact(v(), "isA".into(), vec!["Rex".into(), "Dog".into()], true, 0, true)
            .unwrap();
        let rules = RuleStore::new();
        let config = Config::default();
        let mut stats = ReasonerStats::new();
        let goal = leaf("isA", &["Rex", "Dog"]);
        let d = prove(&goal, &kb, &rules, &config, &mut stats).unwrap();
        assert!(d.valid);
        assert_eq!(d.method.as_deref(), Some("kbMatch"));
    }

    #[test]
    fn rule_application_derives_goal() {
        let mut kb = Kb::new();
        kb.assert_fact(v(), "isA".into(), vec!["Opus".into(), "Bird".into()], true, 0, true)
            .unwrap();
        let mut rules = RuleStore::new();
        rules.add(
            leaf("isA", &["?x", "Bird"]),
            FactPattern {
                operator: "can".into(),
                args: vec![PatternArg::Var("x".into()), PatternArg::Const("Fly".into())],
                polarity: true,
            },
            0,
        );
        let config = Config::default();
        let mut stats = ReasonerStats::new();
        let goal = leaf("can", &["Opus", "Fly"]);
        let d = prove(&goal, &kb, &rules, &config, &mut stats).unwrap();
        assert!(d.valid);
        assert_eq!(d.method.as_deref(), Some("ruleApplied"));
    }

    #[test]
    fn cwa_negation_succeeds_when_unprovable() {
        let kb = Kb::new();
        let rules = RuleStore::new();
        let config = Config::default();
        let mut stats = ReasonerStats::new();
        let goal = Condition::Not(Box::new(leaf("isA", &["Ghost", "Dog"])));
        let d = prove(&goal, &kb, &rules, &config, &mut stats).unwrap();
        assert!(d.valid);
    }

    #[test]
    fn and_reuses_no_fact_twice() {
        let mut kb = Kb::new();
        kb.assert_fact(v(), "hasProperty".into(), vec!["Bob".into(), "big".into()], true, 0, true)
            .unwrap();
        let rules = RuleStore::new();
        let config = Config::default();
        let mut stats = ReasonerStats::new();
        let goal = Condition::And(
            Box::new(leaf("hasProperty", &["Bob", "big"])),
            Box::new(leaf("hasProperty", &["Bob", "big"])),
        );
        let d = prove(&goal, &kb, &rules, &config, &mut stats).unwrap();
        assert!(!d.valid);
    }

    #[test]
    fn or_succeeds_on_second_branch() {
        let mut kb = Kb::new();
        kb.assert_fact(v(), "isA".into(), vec!["Rex".into(), "Dog".into()], true, 0, true)
            .unwrap();
        let rules = RuleStore::new();
        let config = Config::default();
        let mut stats = ReasonerStats::new();
        let goal = Condition::Or(
            Box::new(leaf("isA", &["Rex", "Cat"])),
            Box::new(leaf("isA", &["Rex", "Dog"])),
        );
        let d = prove(&goal, &kb, &rules, &config, &mut stats).unwrap();
        assert!(d.valid);
    }

    #[test]
    fn transitive_closure_derives_goal() {
        let mut kb = Kb::new();
        kb.assert_fact(v(), "isA".into(), vec!["Rex".into(), "Dog".into()], true, 0, true)
            .unwrap();
        kb.assert_fact(v(), "isA".into(), vec!["Dog".into(), "Mammal".into()], true, 1, true)
            .unwrap();
        let rules = RuleStore::new();
        let config = Config::default();
        let mut stats = ReasonerStats::new();
        let goal = leaf("isA", &["Rex", "Mammal"]);
        let d = prove(&goal, &kb, &rules, &config, &mut stats).unwrap();
        assert!(d.valid);
        assert_eq!(d.method.as_deref(), Some("transitiveClosure"));
    }
}
