use super::{CreateAnyCharRule, VisitResult, Visitor};
use crate::grammar::{Grammar, NodeId, NodeKind, NodeTag};

/// Identifier of the synthesized wildcard rule.
pub const ANY_CHAR_RULE: &str = "AnyChar__GEN";

impl Visitor for CreateAnyCharRule {
    fn name(&self) -> &'static str {
        "CreateAnyCharRule"
    }

    fn visit_grammar(&mut self, grammar: &mut Grammar, _node: NodeId) -> VisitResult {
        if grammar.rule_named(ANY_CHAR_RULE).is_some() {
            return Ok(false);
        }
        let any = grammar.tree.alloc(NodeKind::AnyChar);
        let part = grammar.tree.alloc(NodeKind::Part {
            name: None,
            pred: None,
            prime: any,
            quant: None,
        });
        let alt = grammar.tree.alloc(NodeKind::Alt {
            parts: vec![part],
            action: None,
        });
        let expr = grammar.tree.alloc(NodeKind::Expression { alts: vec![alt] });
        let rule = grammar.tree.alloc(NodeKind::Rule {
            name: ANY_CHAR_RULE.to_string(),
            expr,
            entry: false,
            ignore: false,
        });
        grammar.add_rule(rule);
        Ok(true)
    }

    fn visit_any_char(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let tree = &grammar.tree;
        let part = match tree.parent(node) {
            Some(part) if tree.tag(part) == NodeTag::Part => part,
            _ => return Ok(false),
        };

        // Wildcards inside the synthesized rule body stay in place.
        let enclosing = tree
            .parent(part)
            .and_then(|alt| tree.parent(alt))
            .and_then(|expr| tree.parent(expr));
        if let Some(rule) = enclosing {
            if tree.tag(rule) == NodeTag::Rule && tree.rule_name(rule) == ANY_CHAR_RULE {
                return Ok(false);
            }
        }

        let reference = grammar.tree.alloc(NodeKind::Identifier {
            name: ANY_CHAR_RULE.to_string(),
        });
        grammar.tree.set_prime(part, reference);
        Ok(true)
    }
}
