use super::{ExpandClass, SemanticError, SemanticIssue, VisitResult, Visitor};
use crate::grammar::{Grammar, NodeId, NodeKind, NodeTag};
use std::collections::BTreeSet;

impl Visitor for ExpandClass {
    fn name(&self) -> &'static str {
        "ExpandClass"
    }

    fn visit_class(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let ranges = match grammar.tree.kind(node) {
            NodeKind::Class { ranges } => ranges.clone(),
            _ => panic!("Bug! class hook dispatched on a non-class node"),
        };
        let part = match grammar.tree.parent(node) {
            Some(part) if grammar.tree.tag(part) == NodeTag::Part => part,
            _ => return Ok(false),
        };

        let mut chars: BTreeSet<char> = BTreeSet::new();
        for range in &ranges {
            match range.end {
                None => {
                    chars.insert(range.beg);
                }
                Some(end) => {
                    if end < range.beg {
                        return Err(SemanticIssue::Error(SemanticError::InvalidRange(*range)));
                    }
                    for code in (range.beg as u32)..=(end as u32) {
                        if let Some(c) = char::from_u32(code) {
                            chars.insert(c);
                        }
                    }
                }
            }
        }

        let mut alts = Vec::with_capacity(chars.len());
        for c in chars {
            let prime = grammar.tree.alloc(NodeKind::Ch { value: c });
            let part = grammar.tree.alloc(NodeKind::Part {
                name: None,
                pred: None,
                prime,
                quant: None,
            });
            alts.push(grammar.tree.alloc(NodeKind::Alt {
                parts: vec![part],
                action: None,
            }));
        }
        let expr = grammar.tree.alloc(NodeKind::Expression { alts });
        grammar.tree.set_prime(part, expr);
        Ok(true)
    }
}
