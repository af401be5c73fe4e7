use crate::passes::{SemanticError, SemanticWarning, Severity, TreeModifierError};
use crate::{GeneratorError, ParseError, PreprocessorError};
use std::fmt::{Display, Formatter};

impl ParseError {
    pub fn new(pointer: usize, message: String) -> Self {
        Self { pointer, message }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParserFailure: {}", self.message)
    }
}

impl GeneratorError {
    pub fn new(what: &str, message: String) -> Self {
        Self {
            what: what.to_string(),
            message,
        }
    }
}

impl Display for GeneratorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GeneratorError: {}-{}", self.what, self.message)
    }
}

impl PreprocessorError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

impl Display for PreprocessorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PreprocessorError: {}", self.message)
    }
}

impl SemanticError {
    pub fn severity(&self) -> Severity {
        match self {
            SemanticError::InvalidRange(_)
            | SemanticError::InvalidRepetition(_, _)
            | SemanticError::UndefRules(_)
            | SemanticError::RedefRules(_)
            | SemanticError::MetanameRedef(_)
            | SemanticError::UndefMetaRefs(_, _) => Severity::Low,
            SemanticError::RedefEntry(_) | SemanticError::EntryNotDefined => Severity::Moderate,
        }
    }
}

impl Display for SemanticError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticError::InvalidRange(range) => {
                write!(f, "InvalidRangeError: [{}-", range.beg)?;
                match range.end {
                    Some(end) => write!(f, "{}]", end),
                    None => write!(f, "]"),
                }
            }
            SemanticError::InvalidRepetition(beg, end) => {
                write!(f, "InvalidRepetitionError: {{{},{}}}", beg, end)
            }
            SemanticError::UndefRules(rules) => {
                write!(f, "UndefRulesError:")?;
                for (name, rule) in rules {
                    write!(f, "\n    {} in rule {}", name, rule)?;
                }
                Ok(())
            }
            SemanticError::RedefRules(rules) => {
                write!(f, "RedefRulesError:")?;
                for (name, definitions) in rules {
                    write!(f, "\n    {}:", name)?;
                    for definition in definitions {
                        write!(f, "\n        {}", definition)?;
                    }
                }
                Ok(())
            }
            SemanticError::RedefEntry(rule) => {
                write!(f, "RedefEntryError: {}", rule)
            }
            SemanticError::EntryNotDefined => write!(f, "EntryNotDefinedError"),
            SemanticError::MetanameRedef(part) => {
                write!(f, "MetanameRedefError: {}", part)
            }
            SemanticError::UndefMetaRefs(name, rule) => {
                write!(f, "UndefMetaRefsError: ${} in rule {}", name, rule)
            }
        }
    }
}

impl Display for SemanticWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticWarning::LookaheadMetaname(part) => {
                write!(f, "LookaheadMetanameWarning: {}", part)
            }
            SemanticWarning::UnusedRules(rules) => {
                write!(f, "UnusedRulesWarning: {}", rules.join(", "))
            }
        }
    }
}

impl TreeModifierError {
    pub fn new(errors: Vec<SemanticError>) -> Self {
        Self { errors }
    }
}

impl Display for TreeModifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TreeModifierError:")?;
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}
