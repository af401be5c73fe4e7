//! The meta-parser: a hand-written packrat recognizer for the PEG
//! meta-language that builds the grammar tree.
//!
//! The recognizer runs on the [runtime](crate::runtime) contract itself:
//! token level rules are plainly memoized, while the structural rules
//! (`Expression`, `Sequence`, `Prefix`, `Suffix`, `Primary`, `NestedBody`)
//! go through the left recursion entry point.
mod parser;

#[cfg(test)]
mod __tests__;

use crate::grammar::{MetaAction, NodeId, Predicate, Quantifier, Tree};
use crate::runtime::{CharSource, Packrat};
use crate::util::Log;
use once_cell::unsync::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Memoization keys of the meta-grammar rules.
pub enum MetaKey {
    Grammar,
    Entity,
    Definition,
    Directive,
    Expression,
    ExpressionTail,
    Sequence,
    Prefix,
    Suffix,
    Primary,
    MetaName,
    MetaAction,
    MetaDef,
    MetaDefBody,
    NestedBody,
    MetaBodyItem,
    Identifier,
    Literal,
    Class,
    Range,
    Char,
    Repetition,
    Number,
    Spacing,
    EndOfFile,
    LeftArrow,
    Slash,
    AndOp,
    NotOp,
    Question,
    Star,
    Plus,
    Open,
    Close,
    Dot,
    At,
    Semi,
}

#[derive(Debug, Clone)]
/// Intermediate values produced by the meta-grammar rules; one memoizable
/// type shared by every rule.
pub enum MetaValue {
    Unit,
    Ch(char),
    Text(String),
    Num(u32),
    Node(NodeId),
    Range(char, Option<char>),
    Pred(Predicate),
    Quant(Quantifier),
    Action(MetaAction),
    MetaDef(String, String),
}

impl MetaValue {
    pub fn node(self) -> NodeId {
        match self {
            MetaValue::Node(id) => id,
            other => panic!("Bug! expected a node value, got {:?}", other),
        }
    }

    pub fn text(self) -> String {
        match self {
            MetaValue::Text(text) => text,
            other => panic!("Bug! expected a text value, got {:?}", other),
        }
    }
}

/// The grammar recognizer over a [CharSource].
pub struct GrammarParser<S: CharSource> {
    src: S,
    state: Packrat<MetaKey, MetaValue>,
    tree: Tree,
    debugger: OnceCell<Log<&'static str>>,
}
