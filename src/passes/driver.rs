use super::{
    CheckUndefRedef, CreateAnyCharRule, ExpandClass, FindEntryRule, GenerateMetanames,
    IgnoreRules, ReplaceNestedExps, ReplaceRep, SemanticIssue, SemanticWarning, Severity,
    SimplifyNestedExps, SubstituteMetaRefs, TreeModifier, TreeModifierError, Visitor,
};
use crate::grammar::{Grammar, NodeId, NodeTag};
use crate::util::Log;
use once_cell::unsync::OnceCell;

/// Call the hook matching the node's variant.
pub fn dispatch(pass: &mut dyn Visitor, grammar: &mut Grammar, node: NodeId) -> super::VisitResult {
    match grammar.tree.tag(node) {
        NodeTag::Grammar => pass.visit_grammar(grammar, node),
        NodeTag::Rule => pass.visit_rule(grammar, node),
        NodeTag::Expression => pass.visit_expression(grammar, node),
        NodeTag::Alt => pass.visit_alt(grammar, node),
        NodeTag::Part => pass.visit_part(grammar, node),
        NodeTag::Identifier => pass.visit_identifier(grammar, node),
        NodeTag::Class => pass.visit_class(grammar, node),
        NodeTag::AnyChar => pass.visit_any_char(grammar, node),
        NodeTag::Str | NodeTag::Ch => Ok(false),
    }
}

impl TreeModifier {
    pub fn new(stages: Vec<Vec<Box<dyn Visitor>>>) -> Self {
        Self {
            stages,
            errors: Vec::new(),
            warnings: Vec::new(),
            debugger: OnceCell::new(),
        }
    }

    /// The full normalization pipeline in its required order.
    pub fn standard() -> Self {
        Self::new(vec![
            vec![Box::new(SubstituteMetaRefs)],
            vec![Box::new(CreateAnyCharRule)],
            vec![Box::new(ExpandClass), Box::new(ReplaceRep)],
            vec![Box::new(FindEntryRule::new()), Box::new(IgnoreRules::new())],
            vec![
                Box::new(SimplifyNestedExps),
                Box::new(ReplaceNestedExps::new()),
            ],
            vec![Box::new(CheckUndefRedef::new())],
            vec![Box::new(GenerateMetanames::new())],
        ])
    }

    /// Set a log label to trace pass activity based on the level of
    /// [Log](crate::util::Log).
    pub fn set_log(&self, debugger: Log<&'static str>) -> Result<(), String> {
        self.debugger
            .set(debugger)
            .map_err(|_| "Log is already set for the tree modifier.".to_string())
    }

    fn log_fired(&self, pass: &str, sweep: usize) {
        #[cfg(debug_assertions)]
        if let Some(log) = self.debugger.get() {
            if log.order() >= Log::Verbose(()).order() {
                println!("[{}; TreeModifier]: {} fired on sweep {}.", log, pass, sweep);
            }
        }
        #[cfg(not(debug_assertions))]
        let _ = (pass, sweep);
    }

    fn log_deactivated(&self, pass: &str) {
        #[cfg(debug_assertions)]
        if let Some(log) = self.debugger.get() {
            if log.order() >= Log::Result(()).order() {
                println!("[{}; TreeModifier]: {} deactivated.", log, pass);
            }
        }
        #[cfg(not(debug_assertions))]
        let _ = pass;
    }

    /// Run every stage to its local fixpoint, in order. Returns the
    /// collected warnings, or the collected errors if any was recorded.
    ///
    /// Within one sweep the first pass that modifies a node wins: the
    /// remaining passes skip that node until the next sweep, so no pass
    /// observes a half-rewritten subtree.
    pub fn apply(mut self, grammar: &mut Grammar) -> Result<Vec<SemanticWarning>, TreeModifierError> {
        let stages = std::mem::take(&mut self.stages);
        for mut stage in stages {
            let mut active = vec![true; stage.len()];
            let mut sweep = 0;
            loop {
                sweep += 1;
                let mut fired = false;
                let order = grammar.tree.post_order(grammar.root);
                for node in order {
                    if !grammar.tree.is_attached(node, grammar.root) {
                        continue;
                    }
                    for (index, pass) in stage.iter_mut().enumerate() {
                        if !active[index] {
                            continue;
                        }
                        match dispatch(pass.as_mut(), grammar, node) {
                            Ok(false) => {}
                            Ok(true) => {
                                self.log_fired(pass.name(), sweep);
                                fired = true;
                                break;
                            }
                            Err(SemanticIssue::Warning(warning)) => {
                                self.warnings.push(warning);
                            }
                            Err(SemanticIssue::Error(error)) => {
                                let severity = error.severity();
                                self.errors.push(error);
                                match severity {
                                    Severity::Low => {}
                                    Severity::Moderate => {
                                        self.log_deactivated(pass.name());
                                        active[index] = false;
                                    }
                                    Severity::Critical => {
                                        return Err(TreeModifierError::new(self.errors));
                                    }
                                }
                            }
                        }
                    }
                }
                if !fired {
                    break;
                }
            }
        }

        if !self.errors.is_empty() {
            return Err(TreeModifierError::new(self.errors));
        }
        Ok(self.warnings)
    }
}
