//! Run a single rule over a unit without the engine. Test-only.

use super::context::{ReduceContext, VisitContext};
use super::finding::{Fact, Finding, FindingSink};
use super::traits::Rule;
use crate::engine::FileIndex;
use crate::patterns::PatternContext;
use crate::tree::{NodeId, SourceUnit};

pub fn run_rule(rule: &dyn Rule, unit: &SourceUnit) -> Vec<Finding> {
    run_rule_with_facts(rule, unit).0
}

pub fn run_rule_with_facts(rule: &dyn Rule, unit: &SourceUnit) -> (Vec<Finding>, Vec<Fact>) {
    let patterns = PatternContext::new();
    let file = FileIndex::build(&unit.tree);
    let mut sink = FindingSink::new();
    let mut ancestors = Vec::new();
    walk(rule, unit, unit.tree.root(), &mut ancestors, &patterns, &file, &mut sink);
    let (findings, mut facts) = sink.drain();
    for fact in &mut facts {
        fact.unit = unit.path.clone();
    }
    (findings, facts)
}

pub fn reduce_rule(rule: &dyn Rule, facts: &[Fact], units_scanned: usize) -> Vec<Finding> {
    reduce_rule_partial(rule, facts, units_scanned, 0)
}

pub fn reduce_rule_partial(
    rule: &dyn Rule,
    facts: &[Fact],
    units_scanned: usize,
    units_partial: usize,
) -> Vec<Finding> {
    let patterns = PatternContext::new();
    let ctx = ReduceContext {
        facts,
        units_scanned,
        units_partial,
        patterns: &patterns,
    };
    let mut sink = FindingSink::new();
    rule.reduce(&ctx, &mut sink);
    sink.drain().0
}

fn walk(
    rule: &dyn Rule,
    unit: &SourceUnit,
    node: NodeId,
    ancestors: &mut Vec<NodeId>,
    patterns: &PatternContext,
    file: &FileIndex,
    sink: &mut FindingSink,
) {
    if rule.node_kinds().contains(&unit.tree.kind(node)) {
        let ctx = VisitContext {
            unit,
            tree: &unit.tree,
            node,
            ancestors: ancestors.as_slice(),
            patterns,
            file,
        };
        rule.visit(&ctx, sink);
    }
    ancestors.push(node);
    for child in unit.tree.children(node).iter().copied() {
        walk(rule, unit, child, ancestors, patterns, file, sink);
    }
    ancestors.pop();
}
