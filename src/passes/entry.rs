use super::{FindEntryRule, SemanticError, SemanticIssue, VisitResult, Visitor};
use crate::grammar::{Grammar, NodeId, NodeKind};

impl FindEntryRule {
    pub fn new() -> Self {
        Self { entry: None }
    }
}

impl Default for FindEntryRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for FindEntryRule {
    fn name(&self) -> &'static str {
        "FindEntryRule"
    }

    fn visit_rule(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let is_entry = match grammar.tree.kind(node) {
            NodeKind::Rule { entry, .. } => *entry,
            _ => panic!("Bug! rule hook dispatched on a non-rule node"),
        };
        if !is_entry {
            return Ok(false);
        }
        match self.entry {
            Some(existing) if existing == node => Ok(false),
            Some(_) => Err(SemanticIssue::Error(SemanticError::RedefEntry(
                grammar.tree.display(node).to_string(),
            ))),
            None => {
                self.entry = Some(node);
                Ok(false)
            }
        }
    }

    fn visit_grammar(&mut self, grammar: &mut Grammar, _node: NodeId) -> VisitResult {
        match self.entry {
            None => Err(SemanticIssue::Error(SemanticError::EntryNotDefined)),
            Some(rule) => {
                if grammar.entry() == Some(rule) {
                    Ok(false)
                } else {
                    grammar.set_entry(rule);
                    Ok(true)
                }
            }
        }
    }
}
