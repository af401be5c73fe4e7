use crate::grammar::{
    Grammar, MetaAction, NodeId, NodeKind, NodeTag, Predicate, Quantifier, Range, Tree,
};
use crate::parser::GrammarParser;
use crate::passes::{
    dispatch, CheckUndefRedef, ExpandClass, ReplaceNestedExps, ReplaceRep, SemanticError,
    SemanticIssue, SemanticWarning, SimplifyNestedExps, TreeModifier, Visitor, ANY_CHAR_RULE,
};
use crate::runtime::StrSource;

fn parse(text: &str) -> Grammar {
    GrammarParser::new(StrSource::new(text))
        .parse()
        .expect("the grammar text should parse")
}

fn normalize(text: &str) -> (Grammar, Vec<SemanticWarning>) {
    let mut grammar = parse(text);
    let warnings = TreeModifier::standard()
        .apply(&mut grammar)
        .expect("normalization should succeed");
    (grammar, warnings)
}

fn normalize_err(text: &str) -> Vec<SemanticError> {
    let mut grammar = parse(text);
    TreeModifier::standard()
        .apply(&mut grammar)
        .expect_err("normalization should fail")
        .errors
}

fn find_tag(grammar: &Grammar, tag: NodeTag) -> Option<NodeId> {
    grammar
        .tree
        .post_order(grammar.root)
        .into_iter()
        .find(|node| grammar.tree.tag(*node) == tag)
}

fn part_of(grammar: &Grammar, prime: NodeId) -> NodeId {
    grammar.tree.parent(prime).unwrap()
}

fn alt_parts(grammar: &Grammar, rule: &str) -> Vec<NodeId> {
    let rule = grammar.rule_named(rule).unwrap();
    let expr = grammar.tree.rule_expr(rule);
    let alts = grammar.tree.children(expr);
    assert_eq!(alts.len(), 1);
    grammar.tree.children(alts[0])
}

fn part_names(grammar: &Grammar, rule: &str) -> Vec<String> {
    alt_parts(grammar, rule)
        .into_iter()
        .map(|part| match grammar.tree.kind(part) {
            NodeKind::Part { name, .. } => name.clone().unwrap_or_default(),
            _ => panic!("expected a part"),
        })
        .collect()
}

fn expected_chars(tree: &mut Tree, chars: &[char]) -> NodeId {
    let alts = chars
        .iter()
        .map(|c| {
            let prime = tree.alloc(NodeKind::Ch { value: *c });
            let part = tree.alloc(NodeKind::Part {
                name: None,
                pred: None,
                prime,
                quant: None,
            });
            tree.alloc(NodeKind::Alt {
                parts: vec![part],
                action: None,
            })
        })
        .collect();
    tree.alloc(NodeKind::Expression { alts })
}

#[test]
fn expand_class_single_point_range() {
    let mut grammar = parse("R <- [a]");
    let class = find_tag(&grammar, NodeTag::Class).unwrap();
    let part = part_of(&grammar, class);

    let fired = ExpandClass.visit_class(&mut grammar, class).unwrap();
    assert!(fired);

    let mut clue = Tree::new();
    let expected = expected_chars(&mut clue, &['a']);
    let prime = match grammar.tree.kind(part) {
        NodeKind::Part { prime, .. } => *prime,
        _ => unreachable!(),
    };
    assert!(grammar.tree.deep_eq(prime, &clue, expected));
    assert_eq!(grammar.tree.parent(prime), Some(part));
}

#[test]
fn expand_class_full_range() {
    let mut grammar = parse("R <- [a-c]");
    let class = find_tag(&grammar, NodeTag::Class).unwrap();
    let part = part_of(&grammar, class);
    ExpandClass.visit_class(&mut grammar, class).unwrap();

    let mut clue = Tree::new();
    let expected = expected_chars(&mut clue, &['a', 'b', 'c']);
    let prime = match grammar.tree.kind(part) {
        NodeKind::Part { prime, .. } => *prime,
        _ => unreachable!(),
    };
    assert!(grammar.tree.deep_eq(prime, &clue, expected));
}

#[test]
fn expand_class_sorts_and_unions_ranges() {
    let mut grammar = parse("R <- [a-c0-2]");
    let class = find_tag(&grammar, NodeTag::Class).unwrap();
    let part = part_of(&grammar, class);
    ExpandClass.visit_class(&mut grammar, class).unwrap();

    let mut clue = Tree::new();
    let expected = expected_chars(&mut clue, &['0', '1', '2', 'a', 'b', 'c']);
    let prime = match grammar.tree.kind(part) {
        NodeKind::Part { prime, .. } => *prime,
        _ => unreachable!(),
    };
    assert!(grammar.tree.deep_eq(prime, &clue, expected));
}

#[test]
fn expand_class_merges_intersecting_ranges() {
    let mut grammar = parse("R <- [a-cb-d]");
    let class = find_tag(&grammar, NodeTag::Class).unwrap();
    let part = part_of(&grammar, class);
    ExpandClass.visit_class(&mut grammar, class).unwrap();

    let mut clue = Tree::new();
    let expected = expected_chars(&mut clue, &['a', 'b', 'c', 'd']);
    let prime = match grammar.tree.kind(part) {
        NodeKind::Part { prime, .. } => *prime,
        _ => unreachable!(),
    };
    assert!(grammar.tree.deep_eq(prime, &clue, expected));
}

#[test]
fn expand_class_rejects_descending_ranges() {
    let mut grammar = parse("R <- [c-b]");
    let class = find_tag(&grammar, NodeTag::Class).unwrap();
    match ExpandClass.visit_class(&mut grammar, class) {
        Err(SemanticIssue::Error(SemanticError::InvalidRange(range))) => {
            assert_eq!(range, Range::new('c', Some('b')));
        }
        other => panic!("expected an invalid range error, got {:?}", other),
    }
}

fn repetition_part(grammar: &Grammar) -> NodeId {
    grammar
        .tree
        .post_order(grammar.root)
        .into_iter()
        .find(|node| {
            matches!(
                grammar.tree.kind(*node),
                NodeKind::Part {
                    quant: Some(Quantifier::Repetition(_, _)),
                    ..
                }
            )
        })
        .unwrap()
}

#[test]
fn replace_rep_without_end() {
    let mut grammar = parse("R <- 'e'{3}");
    let part = repetition_part(&grammar);
    let fired = ReplaceRep.visit_part(&mut grammar, part).unwrap();
    assert!(fired);

    match grammar.tree.kind(part) {
        NodeKind::Part {
            prime, quant: None, ..
        } => {
            let alts = grammar.tree.children(*prime);
            assert_eq!(alts.len(), 1);
            let parts = grammar.tree.children(alts[0]);
            assert_eq!(parts.len(), 3);
            for inner in parts {
                let prime = match grammar.tree.kind(inner) {
                    NodeKind::Part { prime, .. } => *prime,
                    _ => unreachable!(),
                };
                assert!(matches!(
                    grammar.tree.kind(prime),
                    NodeKind::Ch { value: 'e' }
                ));
            }
        }
        other => panic!("quantifier should be cleared, got {:?}", other),
    }
}

#[test]
fn replace_rep_with_end() {
    let mut grammar = parse("R <- 'e'{2,6}");
    let part = repetition_part(&grammar);
    ReplaceRep.visit_part(&mut grammar, part).unwrap();

    let prime = match grammar.tree.kind(part) {
        NodeKind::Part {
            prime, quant: None, ..
        } => *prime,
        _ => panic!("quantifier should be cleared"),
    };
    let parts = grammar.tree.children(grammar.tree.children(prime)[0]);
    assert_eq!(parts.len(), 3, "two mandatory parts plus the optional tail");

    match grammar.tree.kind(parts[2]) {
        NodeKind::Part {
            prime,
            quant: Some(Quantifier::ZeroOrOne),
            ..
        } => {
            let tail_parts = grammar.tree.children(grammar.tree.children(*prime)[0]);
            assert_eq!(tail_parts.len(), 4);
        }
        other => panic!("expected an optional tail, got {:?}", other),
    }
}

#[test]
fn replace_rep_rejects_descending_bounds() {
    let mut grammar = parse("R <- 'e'{3,2}");
    let part = repetition_part(&grammar);
    match ReplaceRep.visit_part(&mut grammar, part) {
        Err(SemanticIssue::Error(SemanticError::InvalidRepetition(3, 2))) => {}
        other => panic!("expected an invalid repetition error, got {:?}", other),
    }
}

#[test]
fn simplify_lifts_singleton_nested_expressions() {
    let mut grammar = parse("A <- (B / C)");
    let nested = grammar
        .tree
        .post_order(grammar.root)
        .into_iter()
        .find(|node| {
            grammar.tree.tag(*node) == NodeTag::Expression
                && grammar
                    .tree
                    .parent(*node)
                    .map(|p| grammar.tree.tag(p) == NodeTag::Part)
                    .unwrap_or(false)
        })
        .unwrap();

    let fired = SimplifyNestedExps
        .visit_expression(&mut grammar, nested)
        .unwrap();
    assert!(fired);

    let rule = grammar.rule_named("A").unwrap();
    let expr = grammar.tree.rule_expr(rule);
    let alts = grammar.tree.children(expr);
    assert_eq!(alts.len(), 2, "the nested alternatives moved up");
    for alt in &alts {
        assert_eq!(grammar.tree.parent(*alt), Some(expr));
    }
}

#[test]
fn replace_nested_creates_a_generated_rule() {
    let mut grammar = parse("Number <- ('0' / '1') x:Number");
    let nested = grammar
        .tree
        .post_order(grammar.root)
        .into_iter()
        .find(|node| {
            grammar.tree.tag(*node) == NodeTag::Expression
                && grammar
                    .tree
                    .parent(*node)
                    .map(|p| grammar.tree.tag(p) == NodeTag::Part)
                    .unwrap_or(false)
        })
        .unwrap();

    let mut pass = ReplaceNestedExps::new();
    assert!(pass.visit_expression(&mut grammar, nested).unwrap());
    let root = grammar.root;
    assert!(pass.visit_grammar(&mut grammar, root).unwrap());

    let generated = grammar.rule_named("Number__GEN_1").expect("rule created");
    assert_eq!(grammar.tree.rule_expr(generated), nested);
    assert_eq!(grammar.tree.parent(nested), Some(generated));

    let parts = alt_parts(&grammar, "Number");
    match grammar.tree.kind(parts[0]) {
        NodeKind::Part { prime, .. } => assert!(matches!(
            grammar.tree.kind(*prime),
            NodeKind::Identifier { name } if name == "Number__GEN_1"
        )),
        _ => unreachable!(),
    }
}

#[test]
fn replace_nested_reuses_equal_bodies() {
    let (grammar, _) = normalize("@entry Number <- ('0' / '1') ('0' / '1')* x:Number?");
    let generated: Vec<NodeId> = grammar
        .rules()
        .into_iter()
        .filter(|rule| grammar.tree.rule_name(*rule).contains("__GEN_"))
        .collect();
    assert_eq!(generated.len(), 1, "equal nested bodies share one rule");
}

#[test]
fn check_undef_reports_the_enclosing_rule() {
    let errors = normalize_err("@entry A <- B");
    assert!(errors.iter().any(|error| matches!(
        error,
        SemanticError::UndefRules(rules)
            if rules == &vec![("B".to_string(), "A".to_string())]
    )));
}

#[test]
fn check_redef_reports_every_definition() {
    let errors = normalize_err("@entry R <- 'a'\nR <- 'b'");
    let found = errors.iter().find_map(|error| match error {
        SemanticError::RedefRules(rules) => Some(rules.clone()),
        _ => None,
    });
    let rules = found.expect("a redefinition error should be recorded");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].0, "R");
    assert_eq!(rules[0].1.len(), 2);
}

#[test]
fn entry_rule_is_designated() {
    let (grammar, warnings) = normalize("@entry Start <- 'a'");
    let entry = grammar.entry().expect("the entry should be set");
    assert_eq!(grammar.tree.rule_name(entry), "Start");
    assert_eq!(grammar.rules().len(), 2, "the user rule plus AnyChar__GEN");
    assert!(grammar.rule_named(ANY_CHAR_RULE).is_some());
    assert!(warnings.is_empty());
}

#[test]
fn two_entry_directives_are_rejected() {
    let errors = normalize_err("@entry A <- 'a'\n@entry B <- A");
    assert!(errors
        .iter()
        .any(|error| matches!(error, SemanticError::RedefEntry(_))));
}

#[test]
fn missing_entry_directive_is_rejected() {
    let errors = normalize_err("A <- 'a'");
    assert!(errors
        .iter()
        .any(|error| matches!(error, SemanticError::EntryNotDefined)));
}

#[test]
fn classes_lower_to_sorted_char_alternatives() {
    let (grammar, _) = normalize("@entry Digit <- [0-9]");
    assert!(
        find_tag(&grammar, NodeTag::Class).is_none(),
        "no class survives normalization"
    );

    let rule = grammar.rule_named("Digit").unwrap();
    let expr = grammar.tree.rule_expr(rule);
    let alts = grammar.tree.children(expr);
    assert_eq!(alts.len(), 10);
    for (index, alt) in alts.iter().enumerate() {
        let parts = grammar.tree.children(*alt);
        assert_eq!(parts.len(), 1);
        let prime = match grammar.tree.kind(parts[0]) {
            NodeKind::Part { prime, .. } => *prime,
            _ => unreachable!(),
        };
        let expected = char::from_u32('0' as u32 + index as u32).unwrap();
        assert!(matches!(
            grammar.tree.kind(prime),
            NodeKind::Ch { value } if *value == expected
        ));
    }
}

#[test]
fn bounded_repetition_lowers_to_concatenation() {
    let (grammar, _) = normalize("@entry Triple <- 'a'{3}");
    let parts = alt_parts(&grammar, "Triple");
    assert_eq!(parts.len(), 3);
    for part in parts {
        match grammar.tree.kind(part) {
            NodeKind::Part {
                prime, quant: None, ..
            } => assert!(matches!(
                grammar.tree.kind(*prime),
                NodeKind::Ch { value: 'a' }
            )),
            other => panic!("expected a bare char part, got {:?}", other),
        }
    }
}

#[test]
fn ranged_repetition_keeps_an_optional_tail() {
    let (grammar, _) = normalize("@entry Opt <- 'a'{2,4}");
    let parts = alt_parts(&grammar, "Opt");
    assert_eq!(parts.len(), 3);

    match grammar.tree.kind(parts[2]) {
        NodeKind::Part {
            prime,
            quant: Some(Quantifier::ZeroOrOne),
            ..
        } => {
            // The optional tail was extracted into a generated rule.
            let tail = match grammar.tree.kind(*prime) {
                NodeKind::Identifier { name } => name.clone(),
                other => panic!("expected a rule reference, got {:?}", other),
            };
            assert!(tail.contains("__GEN_"));
            let tail_parts = alt_parts(&grammar, &tail);
            assert_eq!(tail_parts.len(), 2);
        }
        other => panic!("expected an optional tail, got {:?}", other),
    }
}

#[test]
fn wildcards_redirect_to_the_generated_rule() {
    let (grammar, _) = normalize("@entry S <- .");
    let parts = alt_parts(&grammar, "S");
    match grammar.tree.kind(parts[0]) {
        NodeKind::Part { prime, .. } => assert!(matches!(
            grammar.tree.kind(*prime),
            NodeKind::Identifier { name } if name == ANY_CHAR_RULE
        )),
        _ => unreachable!(),
    }

    let generated = alt_parts(&grammar, ANY_CHAR_RULE);
    match grammar.tree.kind(generated[0]) {
        NodeKind::Part { prime, .. } => {
            assert_eq!(grammar.tree.tag(*prime), NodeTag::AnyChar)
        }
        _ => unreachable!(),
    }
}

#[test]
fn metanames_cover_every_part() {
    let (grammar, _) = normalize(
        "@entry S <- Foo Bar Foo 'x' name:Baz _:Qux\n\
         Foo <- 'f'\nBar <- 'b'\nBaz <- 'z'\nQux <- 'q'",
    );
    assert_eq!(
        part_names(&grammar, "S"),
        vec!["foo", "bar", "foo1", "_1", "name", "_"]
    );
}

#[test]
fn reserved_identifiers_are_prefixed() {
    let (grammar, _) = normalize("@entry S <- Fn\nFn <- 'f'");
    assert_eq!(part_names(&grammar, "S"), vec!["_fn"]);
}

#[test]
fn ignored_rules_lose_their_captures() {
    let (grammar, _) = normalize("@entry S <- Sp 'a' Sp\n@ignore Sp <- ' '");
    assert_eq!(part_names(&grammar, "S"), vec!["_", "_1", "_"]);
}

#[test]
fn lookahead_captures_warn_and_blank() {
    let (grammar, warnings) = normalize("@entry S <- n:!Foo Foo\nFoo <- 'f'");
    assert_eq!(part_names(&grammar, "S"), vec!["_", "foo"]);
    assert!(warnings
        .iter()
        .any(|warning| matches!(warning, SemanticWarning::LookaheadMetaname(_))));
}

#[test]
fn colliding_captures_are_rejected() {
    let errors = normalize_err("@entry S <- x:Foo x:Bar\nFoo <- 'f'\nBar <- 'b'");
    assert!(errors
        .iter()
        .any(|error| matches!(error, SemanticError::MetanameRedef(_))));
}

#[test]
fn unreferenced_rules_warn() {
    let (_, warnings) = normalize("@entry S <- 'a'\nDead <- 'd'");
    assert!(warnings.iter().any(|warning| matches!(
        warning,
        SemanticWarning::UnusedRules(rules) if rules == &vec!["Dead".to_string()]
    )));
}

#[test]
fn action_references_are_inlined() {
    let (grammar, _) = normalize("@entry S <- 'a' $act\n$act {ret}");
    let rule = grammar.rule_named("S").unwrap();
    let alt = grammar.tree.children(grammar.tree.rule_expr(rule))[0];
    assert!(matches!(
        grammar.tree.kind(alt),
        NodeKind::Alt {
            action: Some(MetaAction::Inline(body)),
            ..
        } if body == "ret"
    ));
}

#[test]
fn undefined_action_references_are_reported() {
    let errors = normalize_err("@entry S <- 'a' $nope");
    assert!(errors.iter().any(|error| matches!(
        error,
        SemanticError::UndefMetaRefs(name, rule) if name == "nope" && rule == "S"
    )));
}

#[test]
fn predicates_keep_their_parts() {
    let (grammar, _) = normalize("@entry S <- !End Any End\nEnd <- 'e'\nAny <- .");
    let parts = alt_parts(&grammar, "S");
    assert!(matches!(
        grammar.tree.kind(parts[0]),
        NodeKind::Part {
            pred: Some(Predicate::Not),
            ..
        }
    ));
}

#[test]
fn normalization_is_idempotent_over_reserialization() {
    let source = "\
@entry Expr <- Expr '+' Term / Term
Term <- [ab]{1,2} (Term / '.') $act
$act {build}
";
    let (first, _) = normalize(source);
    let rendered = first.tree.display(first.root).to_string();
    let (second, _) = normalize(&rendered);
    assert!(
        first.tree.deep_eq(first.root, &second.tree, second.root),
        "re-parsing the rendered grammar should reproduce the tree:\n{}",
        rendered
    );
}

#[test]
fn driver_dispatches_by_variant() {
    let mut grammar = parse("@entry S <- 'a'");
    let mut check = CheckUndefRedef::new();
    let rule = grammar.rule_named("S").unwrap();
    assert!(!dispatch(&mut check, &mut grammar, rule).unwrap());
    assert_eq!(check.defined.len(), 1);
}
