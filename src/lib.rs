//! peggen is a parser generator for Parsing Expression Grammars (PEG).
//! It reads a grammar written in a PEG meta-language, normalizes it into a
//! canonical tree and emits the source code of a packrat parser with left
//! recursion support for the described language.
//!
//! # Overview
//! A grammar file consists of rule definitions `Id <- Expression` built from
//! ordered choice `/`, concatenation, the predicates `&` and `!`, the
//! quantifiers `? * + {n} {n,m}`, character classes `[a-z0-9]`, quoted
//! literals with escapes, the wildcard `.` and the directives `@entry` and
//! `@ignore`. Semantic action blocks `${ ... }` and action definitions
//! `$name { ... }` flow through the pipeline as opaque text.
//!
//! The pipeline has three parts:
//! 1. the meta-parser ([GrammarParser](parser::GrammarParser)) reads grammar
//!    text into an arena tree ([Grammar](grammar::Grammar)), itself running
//!    on the same packrat algorithm the generated parsers embed;
//! 2. the normalization passes ([TreeModifier](passes::TreeModifier)) lower
//!    classes, bounded repetitions, wildcards and nested groups into a
//!    minimal subset, designate the entry rule, check the grammar for
//!    undefined or duplicated rules and assign capture names;
//! 3. the emitter ([CodeGenerator](emit::CodeGenerator)) renders each
//!    normalized rule as a recognizer function and the [Generator] splices
//!    the result into a parser skeleton.
//!
//! # Example
//! ```
//! use peggen::runtime::StrSource;
//! use peggen::Generator;
//!
//! let grammar = "
//! @entry
//! Sum   <- Sum '+' Digit / Digit
//! Digit <- [0-9]
//! ";
//!
//! let mut output = String::new();
//! let generator = Generator::new();
//! generator.generate(StrSource::new(grammar), &mut output).unwrap();
//!
//! assert!(output.contains("fn r_Sum"));
//! assert!(output.contains("fn r_Digit"));
//! ```
//!
//! # License
//! [peggen](crate) is provided under the MIT license.
mod error;
mod generator;

pub mod emit;
pub mod grammar;
pub mod parser;
pub mod passes;
pub mod runtime;
pub mod util;

#[derive(Debug)]
/// An error returned when the meta-parser failed to recognize the grammar
/// text.
pub struct ParseError {
    pub pointer: usize,
    pub message: String,
}

#[derive(Debug)]
/// An error returned by the [Generator] pipeline: a parser failure, a failed
/// normalization or a broken emission step.
pub struct GeneratorError {
    what: String,
    message: String,
}

#[derive(Debug)]
/// An error returned when a skeleton line carries a directive the
/// preprocessor has no substitution for.
pub struct PreprocessorError {
    pub message: String,
}

/// The parser generation pipeline: parse, normalize, emit and splice the
/// result into the parser skeleton.
pub struct Generator {
    datefmt: String,
    skeleton: Option<String>,
}
