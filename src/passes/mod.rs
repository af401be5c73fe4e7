//! The normalization passes and their driver.
//!
//! Each pass is a visitor exposing `visit_*` hooks per node variant. A hook
//! returns `Ok(true)` iff it modified the tree, so the driver can re-run
//! the stage to a fixpoint, and reports semantic problems through
//! [SemanticIssue]. Low severity errors accumulate without halting the
//! stage, moderate errors deactivate the raising pass, critical errors
//! abort the driver.
mod any_char;
mod classes;
mod driver;
mod entry;
mod ignore;
mod metanames;
mod nested;
mod repetitions;
mod substitute;
mod undef_redef;

#[cfg(test)]
mod __tests__;

use crate::grammar::{Grammar, NodeId, Range};
use crate::util::Log;
use once_cell::unsync::OnceCell;
use std::collections::HashMap;

pub use any_char::ANY_CHAR_RULE;
pub use driver::dispatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How the driver reacts to a recorded [SemanticError].
pub enum Severity {
    Low,
    Moderate,
    Critical,
}

#[derive(Debug, Clone)]
/// A semantic defect found while normalizing the grammar. Every variant
/// carries the offending nodes, rendered in the meta-grammar syntax.
pub enum SemanticError {
    /// Class range with `end < beg`.
    InvalidRange(Range),
    /// `{n,m}` with `m < n`.
    InvalidRepetition(u32, u32),
    /// Identifiers referring to no rule, mapped to the rule they occur in.
    UndefRules(Vec<(String, String)>),
    /// Identifiers bound to more than one rule, mapped to the rendered
    /// rules sharing them.
    RedefRules(Vec<(String, Vec<String>)>),
    /// A second `@entry` directive, carrying the rendered rule.
    RedefEntry(String),
    /// No `@entry` directive in the grammar.
    EntryNotDefined,
    /// Two parts of one alternative share a capture name; carries the
    /// rendered part.
    MetanameRedef(String),
    /// An action reference with no matching action definition, mapped to
    /// the rule it occurs in.
    UndefMetaRefs(String, String),
}

#[derive(Debug, Clone)]
/// A non-fatal oddity found while normalizing the grammar.
pub enum SemanticWarning {
    /// A capture name attached to a lookahead part; carries a rendered
    /// snapshot of the part before the name was blanked.
    LookaheadMetaname(String),
    /// Rules that are defined but never referenced.
    UnusedRules(Vec<String>),
}

#[derive(Debug)]
/// What a visitor hook reports instead of a result.
pub enum SemanticIssue {
    Error(SemanticError),
    Warning(SemanticWarning),
}

#[derive(Debug)]
/// The collected semantic errors of one normalization run.
pub struct TreeModifierError {
    pub errors: Vec<SemanticError>,
}

pub type VisitResult = Result<bool, SemanticIssue>;

/// A rewriting or checking pass over the grammar tree. Hooks default to
/// doing nothing; each pass overrides the variants it cares about.
pub trait Visitor {
    fn name(&self) -> &'static str;

    fn visit_grammar(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let _ = (grammar, node);
        Ok(false)
    }

    fn visit_rule(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let _ = (grammar, node);
        Ok(false)
    }

    fn visit_expression(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let _ = (grammar, node);
        Ok(false)
    }

    fn visit_alt(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let _ = (grammar, node);
        Ok(false)
    }

    fn visit_part(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let _ = (grammar, node);
        Ok(false)
    }

    fn visit_identifier(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let _ = (grammar, node);
        Ok(false)
    }

    fn visit_class(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let _ = (grammar, node);
        Ok(false)
    }

    fn visit_any_char(&mut self, grammar: &mut Grammar, node: NodeId) -> VisitResult {
        let _ = (grammar, node);
        Ok(false)
    }
}

/// Inline every action reference with the body of the matching action
/// definition from the grammar's definition table.
pub struct SubstituteMetaRefs;

/// Synthesize the `AnyChar__GEN <- .` rule and redirect every other
/// wildcard primary to it.
pub struct CreateAnyCharRule;

/// Lower every character class to an expression of single character
/// alternatives, sorted by code point.
pub struct ExpandClass;

/// Lower every bounded repetition `{n}` / `{n,m}` to a concatenation of
/// mandatory parts plus an optional tail.
pub struct ReplaceRep;

/// Locate the single rule carrying the `@entry` directive and designate it
/// as the grammar entry.
pub struct FindEntryRule {
    pub(crate) entry: Option<NodeId>,
}

/// Blank the capture of every reference to a rule carrying the `@ignore`
/// directive.
pub struct IgnoreRules {
    pub(crate) refs: HashMap<String, Vec<NodeId>>,
}

/// Lift a nested expression into its enclosing expression when the
/// containment chain is a singleton.
pub struct SimplifyNestedExps;

/// Extract every remaining nested expression into a generated rule
/// `{rule}__GEN_{n}`, reusing generated rules with an equal body.
pub struct ReplaceNestedExps {
    pub(crate) created: Vec<NodeId>,
    pub(crate) counters: HashMap<String, u32>,
}

/// Check that every referenced identifier is bound to exactly one rule and
/// warn about rules that are never referenced.
pub struct CheckUndefRedef {
    pub(crate) refs: HashMap<String, String>,
    pub(crate) defined: Vec<(String, NodeId)>,
}

/// Assign a capture name to every part of every alternative.
pub struct GenerateMetanames {
    pub(crate) index: usize,
    pub(crate) metanames: std::collections::HashSet<String>,
    pub(crate) id_names: Vec<String>,
}

/// Traverses the tree in stages and applies the rewriting passes of each
/// stage bottom-up until no pass fired.
pub struct TreeModifier {
    stages: Vec<Vec<Box<dyn Visitor>>>,
    errors: Vec<SemanticError>,
    warnings: Vec<SemanticWarning>,
    debugger: OnceCell<Log<&'static str>>,
}
