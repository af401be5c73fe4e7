use super::{ReplaceNestedExps, SimplifyNestedExps, VisitResult, Visitor};
use crate::grammar::{Grammar, NodeId, NodeKind, NodeTag};
use std::collections::HashMap;

impl Visitor for SimplifyNestedExps {
    fn name(&self) -> &'static str {
        "SimplifyNestedExps"
    }

    fn visit_expression(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let tree = &grammar.tree;
        let part = match tree.parent(node) {
            Some(part) if tree.tag(part) == NodeTag::Part => part,
            _ => return Ok(false),
        };
        match tree.kind(part) {
            NodeKind::Part { pred, quant, .. } => {
                if pred.is_some() || quant.is_some() {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
        let alt = match tree.parent(part) {
            Some(alt) if tree.tag(alt) == NodeTag::Alt => alt,
            _ => return Ok(false),
        };
        if tree.children(alt).len() > 1 {
            return Ok(false);
        }
        let outer = match tree.parent(alt) {
            Some(outer) if tree.tag(outer) == NodeTag::Expression => outer,
            _ => return Ok(false),
        };
        if tree.children(outer).len() > 1 {
            return Ok(false);
        }

        let alts = grammar.tree.take_alts(node);
        grammar.tree.replace_alts(outer, alts);
        Ok(true)
    }
}

impl ReplaceNestedExps {
    pub fn new() -> Self {
        Self {
            created: Vec::new(),
            counters: HashMap::new(),
        }
    }

    fn fresh_name(&mut self, rule: &str) -> String {
        let counter = self.counters.entry(rule.to_string()).or_insert(0);
        *counter += 1;
        format!("{}__GEN_{}", rule, counter)
    }
}

impl Default for ReplaceNestedExps {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for ReplaceNestedExps {
    fn name(&self) -> &'static str {
        "ReplaceNestedExps"
    }

    fn visit_expression(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let part = match grammar.tree.parent(node) {
            Some(parent) if grammar.tree.tag(parent) == NodeTag::Part => parent,
            _ => return Ok(false),
        };

        // Reuse an already generated rule with an equal body.
        for rule in &self.created {
            let body = grammar.tree.rule_expr(*rule);
            if grammar.tree.deep_eq(body, &grammar.tree, node) {
                let name = grammar.tree.rule_name(*rule).to_string();
                let reference = grammar.tree.alloc(NodeKind::Identifier { name });
                grammar.tree.set_prime(part, reference);
                return Ok(true);
            }
        }

        let enclosing = grammar
            .tree
            .enclosing_rule(node)
            .map(|rule| grammar.tree.rule_name(rule).to_string())
            .unwrap_or_default();
        let name = self.fresh_name(&enclosing);
        let rule = grammar.tree.alloc(NodeKind::Rule {
            name: name.clone(),
            expr: node,
            entry: false,
            ignore: false,
        });
        let reference = grammar.tree.alloc(NodeKind::Identifier { name });
        grammar.tree.set_prime(part, reference);
        self.created.push(rule);
        Ok(true)
    }

    fn visit_grammar(&mut self, grammar: &mut Grammar, _node: NodeId) -> VisitResult {
        if self.created.is_empty() {
            return Ok(false);
        }
        for rule in self.created.drain(..) {
            grammar.add_rule(rule);
        }
        Ok(true)
    }
}
