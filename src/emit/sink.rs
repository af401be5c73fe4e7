use super::{CodeSink, PartCall, PrimeCall, RustSink};
use crate::grammar::{Predicate, Quantifier};
use std::fmt::Write;

impl<'w> RustSink<'w> {
    pub fn new(writer: &'w mut dyn Write) -> Self {
        Self {
            writer,
            indentation: String::new(),
            alt: 0,
        }
    }

    fn put(&mut self, line: &str) -> std::fmt::Result {
        if line.is_empty() {
            writeln!(self.writer)
        } else {
            writeln!(self.writer, "{}{}", self.indentation, line)
        }
    }

    fn indent(&mut self) {
        self.indentation.push_str("    ");
    }

    fn dedent(&mut self) {
        let len = self.indentation.len().saturating_sub(4);
        self.indentation.truncate(len);
    }

    fn render_call(part: &PartCall) -> String {
        let prime = match &part.prime {
            PrimeCall::Char(c) => format!("p.expectc(Some({:?}))", c),
            PrimeCall::Str(s) => format!("p.expects({:?})", s),
            PrimeCall::Any => "p.expectc(None)".to_string(),
            PrimeCall::Rule(name) => format!("p.r_{}()", name),
        };
        let quantified = match part.quant {
            None => prime,
            Some(Quantifier::ZeroOrOne) => format!("p.maybe(|p| {})", prime),
            Some(Quantifier::ZeroOrMore) => format!("p.repeat(0, |p| {})", prime),
            Some(Quantifier::OneOrMore) => format!("p.repeat(1, |p| {})", prime),
            Some(Quantifier::Repetition(_, _)) => {
                panic!("Bug! repetition survived normalization")
            }
        };
        match part.pred {
            None => quantified,
            Some(Predicate::And) => format!("p.lookahead(true, |p| {})", quantified),
            Some(Predicate::Not) => format!("p.lookahead(false, |p| {})", quantified),
        }
    }
}

impl<'w> CodeSink for RustSink<'w> {
    fn begin_rule(&mut self, name: &str, leftrec: bool) -> std::fmt::Result {
        let memo = if leftrec { "memoized_lr" } else { "memoized" };
        self.put(&format!("fn r_{}(&mut self) -> Option<Value> {{", name))?;
        self.indent();
        self.put(&format!("self.{}({:?}, |p| {{", memo, name))?;
        self.indent();
        self.put("let begin = p.mark();")
    }

    fn begin_alt(&mut self, index: usize) -> std::fmt::Result {
        self.alt = index;
        self.put(&format!("'alt{}: {{", index))?;
        self.indent();
        Ok(())
    }

    fn emit_part(&mut self, part: &PartCall) -> std::fmt::Result {
        let call = Self::render_call(part);
        if part.pred.is_some() || part.binding == "_" {
            self.put(&format!("if {}.is_none() {{", call))?;
            self.indent();
            self.put(&format!("break 'alt{};", self.alt))?;
            self.dedent();
            self.put("}")
        } else {
            self.put(&format!(
                "let Some({}) = {} else {{ break 'alt{} }};",
                part.binding, call, self.alt
            ))
        }
    }

    fn end_alt(&mut self, _index: usize, bindings: &[String]) -> std::fmt::Result {
        let retval = match bindings.len() {
            0 => "Value::Empty".to_string(),
            1 => bindings[0].clone(),
            _ => format!("Value::seq(vec![{}])", bindings.join(", ")),
        };
        self.put(&format!("return Some({});", retval))?;
        self.dedent();
        self.put("}")?;
        self.put("p.reset(begin);")
    }

    fn end_rule(&mut self) -> std::fmt::Result {
        self.put("None")?;
        self.dedent();
        self.put("})")?;
        self.dedent();
        self.put("}")?;
        self.put("")
    }
}
