use crate::emit::{left_recursive_rules, nullable_rules, CodeGenerator, Preprocessor, RustSink};
use crate::grammar::Grammar;
use crate::parser::GrammarParser;
use crate::passes::TreeModifier;
use crate::runtime::StrSource;
use crate::Generator;
use std::collections::HashMap;

fn normalize(text: &str) -> Grammar {
    let mut grammar = GrammarParser::new(StrSource::new(text)).parse().unwrap();
    TreeModifier::standard().apply(&mut grammar).unwrap();
    grammar
}

fn emit(text: &str) -> String {
    let grammar = normalize(text);
    let mut body = String::new();
    let mut sink = RustSink::new(&mut body);
    CodeGenerator::new().generate(&grammar, &mut sink).unwrap();
    body
}

fn directives(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn preprocessor_preserves_prefix_and_postfix() {
    let pre = Preprocessor::new(directives(&[("greeting", "Hello\nWorld")]));
    let mut output = String::new();
    pre.process("### %% greeting %% !\n", &mut output).unwrap();
    assert_eq!(output, "### Hello\n### World !\n");
}

#[test]
fn preprocessor_copies_plain_lines() {
    let pre = Preprocessor::new(directives(&[]));
    let mut output = String::new();
    pre.process("fn main() {}\n// no directives\n", &mut output)
        .unwrap();
    assert_eq!(output, "fn main() {}\n// no directives\n");
}

#[test]
fn preprocessor_rejects_unknown_directives() {
    let pre = Preprocessor::new(directives(&[]));
    let mut output = String::new();
    assert!(pre.process("%% nope %%\n", &mut output).is_err());
}

#[test]
fn preprocessor_leaves_escaped_directives_alone() {
    let pre = Preprocessor::new(directives(&[("body", "X")]));
    let mut output = String::new();
    pre.process("\\%% body %%\n", &mut output).unwrap();
    assert_eq!(output, "\\%% body %%\n");
}

#[test]
fn preprocessor_keeps_blank_substitution_lines_unprefixed() {
    let pre = Preprocessor::new(directives(&[("body", "a\n\nb")]));
    let mut output = String::new();
    pre.process("    %% body %%\n", &mut output).unwrap();
    assert_eq!(output, "    a\n\n    b\n");
}

#[test]
fn nullability_reaches_a_fixpoint() {
    let grammar = normalize(
        "@entry S <- A B 'x'\n\
         A <- 'a'?\n\
         B <- A A\n\
         C <- 'c'",
    );
    let nullable = nullable_rules(&grammar);
    assert!(nullable.contains("A"));
    assert!(nullable.contains("B"), "nullability propagates transitively");
    assert!(!nullable.contains("C"));
    assert!(!nullable.contains("S"), "a mandatory terminal blocks nullability");
}

#[test]
fn direct_left_recursion_is_detected() {
    let grammar = normalize("@entry Expr <- Expr '+' Term / Term\nTerm <- 'a'");
    let leftrec = left_recursive_rules(&grammar);
    assert!(leftrec.contains("Expr"));
    assert!(!leftrec.contains("Term"));
}

#[test]
fn indirect_left_recursion_is_detected() {
    let grammar = normalize("@entry A <- B 'x' / 'a'\nB <- A 'y'");
    let leftrec = left_recursive_rules(&grammar);
    assert!(leftrec.contains("A"));
    assert!(leftrec.contains("B"));
}

#[test]
fn left_recursion_through_a_nullable_prefix_is_detected() {
    let grammar = normalize("@entry A <- Opt A 'x' / 'a'\nOpt <- 'o'?");
    let leftrec = left_recursive_rules(&grammar);
    assert!(leftrec.contains("A"));
}

#[test]
fn emitted_rules_follow_the_alt_and_part_structure() {
    let body = emit("@entry Sum <- Sum '+' Digit / Digit\nDigit <- [0-9]");

    assert!(body.contains("fn r_Sum(&mut self) -> Option<Value> {"));
    assert!(body.contains("self.memoized_lr(\"Sum\", |p| {"));
    assert!(body.contains("fn r_Digit(&mut self) -> Option<Value> {"));
    assert!(body.contains("self.memoized(\"Digit\", |p| {"));
    assert!(body.contains("let Some(sum) = p.r_Sum() else { break 'alt0 };"));
    assert!(body.contains("let Some(_1) = p.expectc(Some('+')) else { break 'alt0 };"));
    assert!(body.contains("return Some(Value::seq(vec![sum, _1, digit]));"));
    assert!(body.contains("p.reset(begin);"));
    assert!(body.contains("fn r_AnyChar__GEN(&mut self) -> Option<Value> {"));
}

#[test]
fn emitted_parts_compose_predicate_quantifier_and_primary() {
    let body = emit(
        "@entry S <- !Stop \"ab\" Stop? Tail*\n\
         Stop <- 's'\nTail <- 't'",
    );
    assert!(body.contains("if p.lookahead(false, |p| p.r_Stop()).is_none() {"));
    assert!(body.contains("p.expects(\"ab\")"));
    assert!(body.contains("p.maybe(|p| p.r_Stop())"));
    assert!(body.contains("p.repeat(0, |p| p.r_Tail())"));
}

#[test]
fn ignored_captures_do_not_bind() {
    let body = emit("@entry S <- Sp 'a'\n@ignore Sp <- ' '");
    assert!(body.contains("if p.r_Sp().is_none() {"));
    assert!(body.contains("return Some(_1);"));
}

#[test]
fn generation_splices_the_skeleton() {
    let mut output = String::new();
    Generator::new()
        .generate(
            StrSource::new("@entry Sum <- Sum '+' Digit / Digit\nDigit <- [0-9]"),
            &mut output,
        )
        .unwrap();

    assert!(output.starts_with("// Generated by peggen"));
    assert!(output.contains("pub struct Parser"));
    assert!(output.contains("self.r_Sum()"), "the entry directive resolves");
    assert!(output.contains("    fn r_Sum(&mut self) -> Option<Value> {"));
    assert!(!output.contains("%% body %%"));
    assert!(!output.contains("%% entry %%"));
    assert!(!output.contains("%% version %%"));
    assert!(!output.contains("%% datetime %%"));
}

#[test]
fn generation_with_a_custom_skeleton() {
    let mut output = String::new();
    Generator::new()
        .with_skeleton("entry=%% entry %%\n%% body %%".to_string())
        .generate(StrSource::new("@entry S <- 'a'"), &mut output)
        .unwrap();
    assert!(output.starts_with("entry=S\n"));
    assert!(output.contains("fn r_S(&mut self) -> Option<Value> {"));
}
