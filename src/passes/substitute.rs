use super::{SemanticError, SemanticIssue, SubstituteMetaRefs, VisitResult, Visitor};
use crate::grammar::{Grammar, MetaAction, NodeId, NodeKind};

impl Visitor for SubstituteMetaRefs {
    fn name(&self) -> &'static str {
        "SubstituteMetaRefs"
    }

    fn visit_alt(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let reference = match grammar.tree.kind(node) {
            NodeKind::Alt {
                action: Some(MetaAction::Ref(name)),
                ..
            } => name.clone(),
            _ => return Ok(false),
        };

        let body = grammar.metadef(&reference).map(str::to_string);
        let replacement = body.clone().map(MetaAction::Inline);
        match grammar.tree.kind_mut(node) {
            NodeKind::Alt { action, .. } => *action = replacement,
            _ => panic!("Bug! alt hook dispatched on a non-alt node"),
        }

        match body {
            Some(_) => Ok(true),
            None => {
                let rule = grammar
                    .tree
                    .enclosing_rule(node)
                    .map(|r| grammar.tree.rule_name(r).to_string())
                    .unwrap_or_default();
                Err(SemanticIssue::Error(SemanticError::UndefMetaRefs(
                    reference, rule,
                )))
            }
        }
    }
}
