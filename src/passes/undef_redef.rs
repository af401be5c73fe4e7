use super::{
    CheckUndefRedef, SemanticError, SemanticIssue, SemanticWarning, VisitResult, Visitor,
};
use crate::grammar::{Grammar, NodeId, NodeKind};
use std::collections::{HashMap, HashSet};

impl CheckUndefRedef {
    pub fn new() -> Self {
        Self {
            refs: HashMap::new(),
            defined: Vec::new(),
        }
    }
}

impl Default for CheckUndefRedef {
    fn default() -> Self {
        Self::new()
    }
}

impl Visitor for CheckUndefRedef {
    fn name(&self) -> &'static str {
        "CheckUndefRedef"
    }

    fn visit_identifier(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let name = match grammar.tree.kind(node) {
            NodeKind::Identifier { name } => name.clone(),
            _ => panic!("Bug! identifier hook dispatched on a non-identifier node"),
        };
        let rule = grammar
            .tree
            .enclosing_rule(node)
            .map(|r| grammar.tree.rule_name(r).to_string())
            .unwrap_or_default();
        self.refs.entry(name).or_insert(rule);
        Ok(false)
    }

    fn visit_rule(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let name = grammar.tree.rule_name(node).to_string();
        self.defined.push((name, node));
        Ok(false)
    }

    fn visit_grammar(&mut self, grammar: &mut Grammar, _node: NodeId) -> VisitResult {
        let refs = std::mem::take(&mut self.refs);
        let defined = std::mem::take(&mut self.defined);
        let rule_names: HashSet<&str> = defined.iter().map(|(name, _)| name.as_str()).collect();

        let mut undefined: Vec<(String, String)> = refs
            .iter()
            .filter(|(name, _)| !rule_names.contains(name.as_str()))
            .map(|(name, rule)| (name.clone(), rule.clone()))
            .collect();
        if !undefined.is_empty() {
            undefined.sort();
            return Err(SemanticIssue::Error(SemanticError::UndefRules(undefined)));
        }

        let mut duplicated: Vec<(String, Vec<String>)> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for (name, _) in &defined {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let nodes: Vec<NodeId> = defined
                .iter()
                .filter(|(other, _)| other == name)
                .map(|(_, node)| *node)
                .collect();
            if nodes.len() > 1 {
                duplicated.push((
                    name.clone(),
                    nodes
                        .iter()
                        .map(|n| grammar.tree.display(*n).to_string())
                        .collect(),
                ));
            }
        }
        if !duplicated.is_empty() {
            return Err(SemanticIssue::Error(SemanticError::RedefRules(duplicated)));
        }

        // Rules that nothing references: the entry rule and the generated
        // rules are exempt.
        let entry = grammar.entry();
        let mut unused: Vec<String> = defined
            .iter()
            .filter(|(name, node)| {
                Some(*node) != entry && !name.contains("__GEN") && !refs.contains_key(name)
            })
            .map(|(name, _)| name.clone())
            .collect();
        if !unused.is_empty() {
            unused.sort();
            return Err(SemanticIssue::Warning(SemanticWarning::UnusedRules(unused)));
        }

        Ok(false)
    }
}
