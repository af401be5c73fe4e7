use crate::emit::{CodeGenerator, Preprocessor, RustSink};
use crate::grammar::Grammar;
use crate::parser::GrammarParser;
use crate::passes::TreeModifier;
use crate::runtime::CharSource;
use crate::{Generator, GeneratorError};
use std::collections::HashMap;
use std::fmt::Write;

const DEFAULT_SKELETON: &str = include_str!("../templates/parser.rs.in");

impl Generator {
    pub fn new() -> Self {
        Self {
            datefmt: "%Y-%m-%d %H:%M".to_string(),
            skeleton: None,
        }
    }

    /// Override the timestamp format of the generated file header.
    pub fn with_datefmt(mut self, datefmt: &str) -> Self {
        self.datefmt = datefmt.to_string();
        self
    }

    /// Override the embedded parser skeleton.
    pub fn with_skeleton(mut self, skeleton: String) -> Self {
        self.skeleton = Some(skeleton);
        self
    }

    /// Parse a grammar, optionally running the normalization pipeline.
    /// Collected warnings are printed; collected errors fail the run.
    pub fn get_grammar<S: CharSource>(
        &self,
        source: S,
        modified: bool,
    ) -> Result<Grammar, GeneratorError> {
        let parser = GrammarParser::new(source);
        let mut grammar = parser
            .parse()
            .map_err(|err| GeneratorError::new("ParserFailure", err.message))?;

        if modified {
            let modifier = TreeModifier::standard();
            match modifier.apply(&mut grammar) {
                Ok(warnings) => {
                    for warning in warnings {
                        println!("Warning {}", warning);
                    }
                }
                Err(err) => {
                    return Err(GeneratorError::new("TreeModifierError", err.to_string()))
                }
            }
        }

        Ok(grammar)
    }

    /// Run the whole pipeline: parse, normalize, emit the rule bodies and
    /// splice them into the skeleton.
    pub fn generate<S: CharSource>(
        &self,
        source: S,
        output: &mut dyn Write,
    ) -> Result<(), GeneratorError> {
        let grammar = self.get_grammar(source, true)?;
        self.generate_from(&grammar, output)
    }

    /// Emit a parser for an already normalized grammar.
    pub fn generate_from(
        &self,
        grammar: &Grammar,
        output: &mut dyn Write,
    ) -> Result<(), GeneratorError> {
        let entry = grammar
            .entry()
            .map(|rule| grammar.tree.rule_name(rule).to_string())
            .ok_or_else(|| {
                GeneratorError::new("EmitError", "the entry rule is not designated.".to_string())
            })?;

        let mut body = String::new();
        {
            let mut sink = RustSink::new(&mut body);
            CodeGenerator::new().generate(grammar, &mut sink)?;
        }

        let mut directives = HashMap::new();
        directives.insert("body".to_string(), body);
        directives.insert("entry".to_string(), entry);
        directives.insert(
            "version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        directives.insert(
            "datetime".to_string(),
            chrono::Local::now().format(&self.datefmt).to_string(),
        );

        let skeleton = self.skeleton.as_deref().unwrap_or(DEFAULT_SKELETON);
        Preprocessor::new(directives)
            .process(skeleton, output)
            .map_err(|err| GeneratorError::new("PreprocessorError", err.message))
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}
