use super::Preprocessor;
use crate::PreprocessorError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write;

// The whole line is matched so the greedy prefix group picks up the last
// directive pair on the line.
static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(.*)%% *(\w+) *%%(.*)$").unwrap());

impl Preprocessor {
    /// Create a preprocessor from a mapping of directive names to their
    /// substitutions.
    pub fn new(directives: HashMap<String, String>) -> Self {
        Self { directives }
    }

    /// Process the skeleton text line by line and write the result.
    ///
    /// A directive line `### %% name %% !` is replaced by the substitution
    /// with `### ` prepended to every substituted line and ` !` appended
    /// once at the end. Lines without a directive are copied through; a
    /// directive escaped as `\%% name %%` is left alone.
    pub fn process(
        &self,
        skeleton: &str,
        output: &mut dyn Write,
    ) -> Result<(), PreprocessorError> {
        for line in skeleton.split_inclusive('\n') {
            match DIRECTIVE_RE.captures(line) {
                Some(caps) if !caps[1].ends_with('\\') => {
                    let directive = caps[2].to_string();
                    let content = self.directives.get(&directive).ok_or_else(|| {
                        PreprocessorError::new(format!("unknown directive '{}'.", directive))
                    })?;
                    self.insert(content, output, &caps[1], &caps[3])?;
                }
                _ => {
                    output.write_str(line).map_err(|_| write_failure())?;
                }
            }
        }
        Ok(())
    }

    fn insert(
        &self,
        content: &str,
        output: &mut dyn Write,
        prefix: &str,
        postfix: &str,
    ) -> Result<(), PreprocessorError> {
        let fail = |_| write_failure();
        for line in content.split_inclusive('\n') {
            if line.chars().all(|c| c == '\n' || c == '\r') {
                output.write_str(line).map_err(fail)?;
            } else {
                output.write_str(prefix).map_err(fail)?;
                output.write_str(line).map_err(fail)?;
            }
        }
        output.write_str(postfix).map_err(fail)?;
        Ok(())
    }
}

fn write_failure() -> PreprocessorError {
    PreprocessorError::new("writing the output stream failed.".to_string())
}
