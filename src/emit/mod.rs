//! Code emission: walking the normalized grammar and rendering a packrat
//! recognizer per rule, plus the skeleton preprocessor that frames the
//! emitted body into a complete source file.
mod generator;
mod preprocessor;
mod sink;

#[cfg(test)]
mod __tests__;

pub use generator::{left_recursive_rules, nullable_rules};

use crate::grammar::{Predicate, Quantifier};
use std::collections::HashMap;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
/// The primary atom of an emitted part, reduced to its match call.
pub enum PrimeCall {
    /// `expectc(Some(c))`
    Char(char),
    /// `expects(s)`
    Str(String),
    /// `expectc(None)`
    Any,
    /// A recursive call to the referenced rule.
    Rule(String),
}

#[derive(Debug, Clone)]
/// Everything the sink needs to render one part of an alternative.
pub struct PartCall {
    pub binding: String,
    pub pred: Option<Predicate>,
    pub quant: Option<Quantifier>,
    pub prime: PrimeCall,
}

/// The structural emission interface. The emitter supplies order and
/// names; the sink owns the syntactic framing of the target language.
pub trait CodeSink {
    fn begin_rule(&mut self, name: &str, leftrec: bool) -> std::fmt::Result;
    fn begin_alt(&mut self, index: usize) -> std::fmt::Result;
    fn emit_part(&mut self, part: &PartCall) -> std::fmt::Result;
    fn end_alt(&mut self, index: usize, bindings: &[String]) -> std::fmt::Result;
    fn end_rule(&mut self) -> std::fmt::Result;
}

/// A [CodeSink] rendering Rust methods for the embedded parser skeleton.
pub struct RustSink<'w> {
    writer: &'w mut dyn Write,
    indentation: String,
    alt: usize,
}

/// Walks a normalized grammar and drives a [CodeSink] rule by rule.
pub struct CodeGenerator;

/// Creates a source file from a skeleton, substituting `%% name %%`
/// directives while preserving each line's prefix and postfix.
pub struct Preprocessor {
    directives: HashMap<String, String>,
}
