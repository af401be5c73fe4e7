use super::{CodeGenerator, CodeSink, PartCall, PrimeCall};
use crate::grammar::{Grammar, NodeId, NodeKind, Quantifier, Tree};
use crate::GeneratorError;
use std::collections::{HashMap, HashSet};

impl CodeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Emit one recognizer per rule, in grammar order. The grammar must be
    /// normalized: the only remaining primaries are identifiers and
    /// terminals, and the only remaining quantifiers are `?`, `*` and `+`.
    pub fn generate(
        &self,
        grammar: &Grammar,
        sink: &mut dyn CodeSink,
    ) -> Result<(), GeneratorError> {
        let leftrec = left_recursive_rules(grammar);
        for rule in grammar.rules() {
            let name = grammar.tree.rule_name(rule).to_string();
            sink.begin_rule(&name, leftrec.contains(&name))
                .map_err(emit_failure)?;
            let expr = grammar.tree.rule_expr(rule);
            for (index, alt) in grammar.tree.children(expr).into_iter().enumerate() {
                sink.begin_alt(index).map_err(emit_failure)?;
                let mut bindings = Vec::new();
                for part in grammar.tree.children(alt) {
                    let call = self.part_call(grammar, part)?;
                    if call.pred.is_none() && call.binding != "_" {
                        bindings.push(call.binding.clone());
                    }
                    sink.emit_part(&call).map_err(emit_failure)?;
                }
                sink.end_alt(index, &bindings).map_err(emit_failure)?;
            }
            sink.end_rule().map_err(emit_failure)?;
        }
        Ok(())
    }

    fn part_call(&self, grammar: &Grammar, part: NodeId) -> Result<PartCall, GeneratorError> {
        let (name, pred, prime, quant) = match grammar.tree.kind(part) {
            NodeKind::Part {
                name,
                pred,
                prime,
                quant,
            } => (name.clone(), *pred, *prime, *quant),
            _ => panic!("Bug! expected a part node"),
        };

        if let Some(Quantifier::Repetition(_, _)) = quant {
            return Err(GeneratorError::new(
                "EmitError",
                format!(
                    "repetition survived normalization in {}.",
                    grammar.tree.display(part)
                ),
            ));
        }

        let prime = match grammar.tree.kind(prime) {
            NodeKind::Ch { value } => PrimeCall::Char(*value),
            NodeKind::Str { chars } => PrimeCall::Str(chars.iter().collect()),
            NodeKind::AnyChar => PrimeCall::Any,
            NodeKind::Identifier { name } => PrimeCall::Rule(name.clone()),
            other => {
                return Err(GeneratorError::new(
                    "EmitError",
                    format!("unsupported primary {:?} after normalization.", other),
                ))
            }
        };

        let binding = name.ok_or_else(|| {
            GeneratorError::new(
                "EmitError",
                format!("unnamed part {}.", grammar.tree.display(part)),
            )
        })?;

        Ok(PartCall {
            binding,
            pred,
            quant,
            prime,
        })
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn emit_failure(_: std::fmt::Error) -> GeneratorError {
    GeneratorError::new("EmitError", "writing the parser body failed.".to_string())
}

/// Rules that can match the empty input, computed to a fixpoint.
pub fn nullable_rules(grammar: &Grammar) -> HashSet<String> {
    let rules = grammar.rules();
    let mut nullable: HashSet<String> = HashSet::new();
    loop {
        let mut changed = false;
        for rule in &rules {
            let name = grammar.tree.rule_name(*rule);
            if nullable.contains(name) {
                continue;
            }
            let expr = grammar.tree.rule_expr(*rule);
            if expression_nullable(&grammar.tree, expr, &nullable) {
                nullable.insert(name.to_string());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    nullable
}

fn expression_nullable(tree: &Tree, expr: NodeId, nullable: &HashSet<String>) -> bool {
    tree.children(expr).into_iter().any(|alt| {
        tree.children(alt)
            .into_iter()
            .all(|part| part_transparent(tree, part, nullable))
    })
}

/// Whether a part can succeed without consuming input.
fn part_transparent(tree: &Tree, part: NodeId, nullable: &HashSet<String>) -> bool {
    let (pred, prime, quant) = match tree.kind(part) {
        NodeKind::Part {
            pred, prime, quant, ..
        } => (*pred, *prime, *quant),
        _ => panic!("Bug! expected a part node"),
    };
    if pred.is_some() {
        return true;
    }
    match quant {
        Some(Quantifier::ZeroOrOne) | Some(Quantifier::ZeroOrMore) => return true,
        Some(Quantifier::Repetition(0, _)) => return true,
        _ => {}
    }
    match tree.kind(prime) {
        NodeKind::Str { chars } => chars.is_empty(),
        NodeKind::Identifier { name } => nullable.contains(name),
        NodeKind::Expression { .. } => expression_nullable(tree, prime, nullable),
        _ => false,
    }
}

/// Rules that can reach themselves at the same input position, directly or
/// through a chain of leading calls. These must be wrapped in the left
/// recursion entry point of the runtime.
pub fn left_recursive_rules(grammar: &Grammar) -> HashSet<String> {
    let nullable = nullable_rules(grammar);
    let mut edges: HashMap<String, HashSet<String>> = HashMap::new();
    for rule in grammar.rules() {
        let name = grammar.tree.rule_name(rule).to_string();
        let mut calls = HashSet::new();
        let expr = grammar.tree.rule_expr(rule);
        collect_leading_calls(&grammar.tree, expr, &nullable, &mut calls);
        edges.insert(name, calls);
    }

    let mut leftrec = HashSet::new();
    for start in edges.keys() {
        let mut visited = HashSet::new();
        let mut stack: Vec<&String> = edges[start].iter().collect();
        while let Some(next) = stack.pop() {
            if next == start {
                leftrec.insert(start.clone());
                break;
            }
            if visited.insert(next.clone()) {
                if let Some(targets) = edges.get(next) {
                    stack.extend(targets.iter());
                }
            }
        }
    }
    leftrec
}

/// Record every rule reference reachable at the start position of the
/// expression: a part contributes its calls, and scanning continues past
/// it only while the prefix can still be empty.
fn collect_leading_calls(
    tree: &Tree,
    expr: NodeId,
    nullable: &HashSet<String>,
    calls: &mut HashSet<String>,
) {
    for alt in tree.children(expr) {
        for part in tree.children(alt) {
            let prime = match tree.kind(part) {
                NodeKind::Part { prime, .. } => *prime,
                _ => panic!("Bug! expected a part node"),
            };
            match tree.kind(prime) {
                NodeKind::Identifier { name } => {
                    calls.insert(name.clone());
                }
                NodeKind::Expression { .. } => {
                    collect_leading_calls(tree, prime, nullable, calls);
                }
                _ => {}
            }
            if !part_transparent(tree, part, nullable) {
                break;
            }
        }
    }
}
