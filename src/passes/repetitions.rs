use super::{ReplaceRep, SemanticError, SemanticIssue, VisitResult, Visitor};
use crate::grammar::{Grammar, NodeId, NodeKind, Quantifier};

impl Visitor for ReplaceRep {
    fn name(&self) -> &'static str {
        "ReplaceRep"
    }

    fn visit_part(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let (prime, beg, end) = match grammar.tree.kind(node) {
            NodeKind::Part {
                prime,
                quant: Some(Quantifier::Repetition(beg, end)),
                ..
            } => (*prime, *beg, *end),
            _ => return Ok(false),
        };

        if let Some(end) = end {
            if end < beg {
                return Err(SemanticIssue::Error(SemanticError::InvalidRepetition(
                    beg, end,
                )));
            }
        }

        let mut parts = Vec::new();
        for index in 0..beg {
            let copy = if index == 0 {
                prime
            } else {
                grammar.tree.clone_subtree(prime)
            };
            parts.push(grammar.tree.alloc(NodeKind::Part {
                name: None,
                pred: None,
                prime: copy,
                quant: None,
            }));
        }

        if let Some(end) = end {
            if end > beg {
                let mut tail_parts = Vec::new();
                for _ in 0..(end - beg) {
                    let copy = grammar.tree.clone_subtree(prime);
                    tail_parts.push(grammar.tree.alloc(NodeKind::Part {
                        name: None,
                        pred: None,
                        prime: copy,
                        quant: None,
                    }));
                }
                let tail_alt = grammar.tree.alloc(NodeKind::Alt {
                    parts: tail_parts,
                    action: None,
                });
                let tail_expr = grammar.tree.alloc(NodeKind::Expression {
                    alts: vec![tail_alt],
                });
                parts.push(grammar.tree.alloc(NodeKind::Part {
                    name: None,
                    pred: None,
                    prime: tail_expr,
                    quant: Some(Quantifier::ZeroOrOne),
                }));
            }
        }

        let alt = grammar.tree.alloc(NodeKind::Alt {
            parts,
            action: None,
        });
        let expr = grammar.tree.alloc(NodeKind::Expression { alts: vec![alt] });
        grammar.tree.set_prime(node, expr);
        grammar.tree.set_quant(node, None);
        Ok(true)
    }
}
