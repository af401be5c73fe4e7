use super::{
    GenerateMetanames, SemanticError, SemanticIssue, SemanticWarning, VisitResult, Visitor,
};
use crate::grammar::{Grammar, NodeId, NodeKind, NodeTag};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Keywords of the emission target, which generated capture names must not
/// shadow.
static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true",
        "type", "unsafe", "use", "where", "while",
    ]
    .into_iter()
    .collect()
});

impl GenerateMetanames {
    pub fn new() -> Self {
        Self {
            index: 1,
            metanames: HashSet::new(),
            id_names: Vec::new(),
        }
    }

    fn indexed(&mut self) -> String {
        let name = format!("_{}", self.index);
        self.index += 1;
        name
    }
}

impl Default for GenerateMetanames {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for GenerateMetanames {
    fn name(&self) -> &'static str {
        "GenerateMetanames"
    }

    fn visit_part(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let (name, pred, prime) = match grammar.tree.kind(node) {
            NodeKind::Part {
                name, pred, prime, ..
            } => (name.clone(), *pred, *prime),
            _ => panic!("Bug! part hook dispatched on a non-part node"),
        };

        // Lookahead parts consume nothing, so their value is never exposed.
        if pred.is_some() {
            match name.as_deref() {
                Some("_") | None => {
                    grammar.tree.set_metaname(node, Some("_".to_string()));
                    return Ok(false);
                }
                Some(_) => {
                    let snapshot = grammar.tree.display(node).to_string();
                    grammar.tree.set_metaname(node, Some("_".to_string()));
                    return Err(SemanticIssue::Warning(SemanticWarning::LookaheadMetaname(
                        snapshot,
                    )));
                }
            }
        }

        match grammar.tree.tag(prime) {
            NodeTag::Ch | NodeTag::Str | NodeTag::AnyChar => {
                let indexed = self.indexed();
                grammar.tree.set_metaname(node, Some(indexed));
                Ok(false)
            }
            NodeTag::Identifier => {
                if let Some(user) = name {
                    if user == "_" {
                        return Ok(false);
                    }
                    if self.metanames.contains(&user) {
                        return Err(SemanticIssue::Error(SemanticError::MetanameRedef(
                            grammar.tree.display(node).to_string(),
                        )));
                    }
                    self.metanames.insert(user);
                    return Ok(false);
                }

                let reference = match grammar.tree.kind(prime) {
                    NodeKind::Identifier { name } => name.clone(),
                    _ => panic!("Bug! identifier tag on a non-identifier node"),
                };
                let generated = if reference.contains("__GEN") {
                    self.indexed()
                } else {
                    let mut base = reference.to_lowercase();
                    if RESERVED.contains(base.as_str()) {
                        base = format!("_{}", base);
                    }
                    let count = self.id_names.iter().filter(|n| **n == base).count();
                    let name = if count > 0 {
                        format!("{}{}", base, count)
                    } else {
                        base.clone()
                    };
                    self.id_names.push(base);
                    name
                };
                grammar.tree.set_metaname(node, Some(generated));
                Ok(false)
            }
            // A class or nested expression can survive here when an earlier
            // pass recorded an error; the run is already failed, so the
            // part just gets an indexed name.
            _ => {
                let indexed = self.indexed();
                grammar.tree.set_metaname(node, Some(indexed));
                Ok(false)
            }
        }
    }

    // Capture name scopes are per alternative.
    fn visit_alt(&mut self, _grammar: &mut Grammar, _node: NodeId) -> VisitResult {
        self.index = 1;
        self.metanames.clear();
        self.id_names.clear();
        Ok(false)
    }
}
