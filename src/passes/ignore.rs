use super::{IgnoreRules, VisitResult, Visitor};
use crate::grammar::{Grammar, NodeId, NodeKind, NodeTag};
use std::collections::HashMap;

impl IgnoreRules {
    pub fn new() -> Self {
        Self {
            refs: HashMap::new(),
        }
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for IgnoreRules {
    fn name(&self) -> &'static str {
        "IgnoreRules"
    }

    fn visit_identifier(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let name = match grammar.tree.kind(node) {
            NodeKind::Identifier { name } => name.clone(),
            _ => panic!("Bug! identifier hook dispatched on a non-identifier node"),
        };
        if let Some(part) = grammar.tree.parent(node) {
            if grammar.tree.tag(part) == NodeTag::Part {
                self.refs.entry(name).or_default().push(part);
            }
        }
        Ok(false)
    }

    // Resolved on the grammar node, after every identifier occurrence of
    // the sweep has been recorded.
    fn visit_grammar(&mut self, grammar: &mut Grammar, _node: NodeId) -> VisitResult {
        let mut changed = false;
        let ignored: Vec<String> = grammar
            .rules()
            .into_iter()
            .filter(|rule| match grammar.tree.kind(*rule) {
                NodeKind::Rule { ignore, .. } => *ignore,
                _ => false,
            })
            .map(|rule| grammar.tree.rule_name(rule).to_string())
            .collect();

        for name in ignored {
            let parts = self.refs.get(&name).cloned().unwrap_or_default();
            for part in parts {
                let blank = match grammar.tree.kind(part) {
                    NodeKind::Part { name, .. } => name.as_deref() != Some("_"),
                    _ => false,
                };
                if blank {
                    grammar.tree.set_metaname(part, Some("_".to_string()));
                    changed = true;
                }
            }
        }
        self.refs.clear();
        Ok(changed)
    }
}
