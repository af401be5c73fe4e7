use crate::grammar::{MetaAction, NodeKind, NodeTag, Predicate, Quantifier, Range};
use crate::parser::{GrammarParser, MetaValue};
use crate::runtime::StrSource;

fn parser(text: &str) -> GrammarParser<StrSource> {
    GrammarParser::new(StrSource::new(text))
}

fn parsed_char(text: &str) -> Option<char> {
    let mut p = parser(text);
    let value = p.char_rule()?;
    p.end_of_file()?;
    match value {
        MetaValue::Ch(c) => Some(c),
        other => panic!("unexpected value {:?}", other),
    }
}

fn parsed_quant(text: &str) -> Option<Quantifier> {
    let mut p = parser(text);
    let value = p.repetition()?;
    p.end_of_file()?;
    match value {
        MetaValue::Quant(q) => Some(q),
        other => panic!("unexpected value {:?}", other),
    }
}

#[test]
fn end_of_file() {
    assert!(parser("").end_of_file().is_some());
    assert!(parser("x").end_of_file().is_none());
}

#[test]
fn spacing_and_comments() {
    for text in [" ", "\t", "\n", "\r\n", "\r", "# abc\n", "#\n", " \t# c\n "] {
        let mut p = parser(text);
        assert!(p.spacing().is_some(), "spacing failed on {:?}", text);
        assert!(p.end_of_file().is_some(), "input {:?} left unconsumed", text);
    }
    // A comment without its line ending is not spacing.
    let mut p = parser("# abc");
    p.spacing().unwrap();
    assert!(p.end_of_file().is_none());
}

#[test]
fn tokens() {
    assert!(parser("<-").left_arrow().is_some());
    assert!(parser("<").left_arrow().is_none());
    assert!(parser("/").slash().is_some());
    assert!(matches!(
        parser("&").and_op(),
        Some(MetaValue::Pred(Predicate::And))
    ));
    assert!(matches!(
        parser("!").not_op(),
        Some(MetaValue::Pred(Predicate::Not))
    ));
}

#[test]
fn numbers() {
    for (text, expected) in [("1", 1), ("12", 12), ("123", 123)] {
        let mut p = parser(text);
        assert!(matches!(p.number(), Some(MetaValue::Num(n)) if n == expected));
        assert!(p.end_of_file().is_some());
    }
    assert!(parser("a").number().is_none());
}

#[test]
fn repetitions() {
    assert_eq!(parsed_quant("{1}"), Some(Quantifier::Repetition(1, None)));
    assert_eq!(parsed_quant("{123}"), Some(Quantifier::Repetition(123, None)));
    assert_eq!(parsed_quant("{1,2}"), Some(Quantifier::Repetition(1, Some(2))));
    assert_eq!(
        parsed_quant("{12,34}"),
        Some(Quantifier::Repetition(12, Some(34)))
    );
    assert_eq!(parsed_quant("{4}\n"), Some(Quantifier::Repetition(4, None)));

    for text in ["{}", "{a}", "{1,}", "{,1}", "{1,a}", "{1, 2}", "1,2}", "{1"] {
        assert!(parsed_quant(text).is_none(), "{:?} should not parse", text);
    }
}

#[test]
fn char_escapes() {
    assert_eq!(parsed_char(r"\141"), Some('a'));
    assert_eq!(parsed_char(r"\147"), Some('g'));
    assert_eq!(parsed_char(r"\47"), Some('\''));
    assert_eq!(parsed_char(r"\0"), Some('\0'));
    assert_eq!(parsed_char("a"), Some('a'));
    assert_eq!(parsed_char(r"\n"), Some('\n'));
    assert_eq!(parsed_char(r"\r"), Some('\r'));
    assert_eq!(parsed_char(r"\t"), Some('\t'));
    assert_eq!(parsed_char(r"\\"), Some('\\'));
    assert_eq!(parsed_char(r"\u03c0"), Some('\u{03c0}'));
    assert_eq!(parsed_char(r"\u03C0"), Some('\u{03c0}'));
    assert_eq!(parsed_char(r"\u03C4"), Some('\u{03c4}'));

    for text in [r"\148", r"\a41", "", r"\u123", r"\u12g4", r"\b"] {
        assert!(parsed_char(text).is_none(), "{:?} should not parse", text);
    }
}

#[test]
fn ranges_in_classes() {
    let cases = [
        ("a-z", ('a', Some('z'))),
        ("0-9", ('0', Some('9'))),
        ("a", ('a', None)),
        ("--z", ('-', Some('z'))),
        ("---", ('-', Some('-'))),
    ];
    for (text, (beg, end)) in cases {
        let mut p = parser(text);
        match p.range() {
            Some(MetaValue::Range(b, e)) => assert_eq!((b, e), (beg, end), "on {:?}", text),
            other => panic!("range failed on {:?}: {:?}", text, other),
        }
        assert!(p.end_of_file().is_some());
    }
    assert!(parser("").range().is_none());
}

#[test]
fn classes() {
    let cases: [(&str, Vec<Range>); 5] = [
        ("[]", vec![]),
        ("[a]", vec![Range::new('a', None)]),
        ("[a-z]", vec![Range::new('a', Some('z'))]),
        (
            "[a-z0-9]",
            vec![Range::new('a', Some('z')), Range::new('0', Some('9'))],
        ),
        (
            "[a-zA-Z0-9_]",
            vec![
                Range::new('a', Some('z')),
                Range::new('A', Some('Z')),
                Range::new('0', Some('9')),
                Range::new('_', None),
            ],
        ),
    ];
    for (text, expected) in cases {
        let mut p = parser(text);
        let node = p.class().expect("class should parse").node();
        assert!(p.end_of_file().is_some());
        match p.tree().kind(node) {
            NodeKind::Class { ranges } => assert_eq!(ranges, &expected, "on {:?}", text),
            other => panic!("unexpected node {:?}", other),
        }
    }
}

#[test]
fn literals() {
    let mut p = parser("''");
    let node = p.literal().unwrap().node();
    assert!(matches!(p.tree().kind(node), NodeKind::Str { chars } if chars.is_empty()));

    let mut p = parser("'a'");
    let node = p.literal().unwrap().node();
    assert!(matches!(p.tree().kind(node), NodeKind::Ch { value: 'a' }));

    let mut p = parser("'ab'");
    let node = p.literal().unwrap().node();
    assert!(
        matches!(p.tree().kind(node), NodeKind::Str { chars } if chars == &vec!['a', 'b'])
    );

    for (text, expected) in [
        (r"'\''", '\''),
        (r"'\\'", '\\'),
        (r#""\"""#, '"'),
        (r#""\n""#, '\n'),
        (r"'\141'", 'a'),
        (r"'\u03c0'", '\u{03c0}'),
    ] {
        let mut p = parser(text);
        let node = p.literal().expect(text).node();
        match p.tree().kind(node) {
            NodeKind::Ch { value } => assert_eq!(*value, expected, "on {:?}", text),
            other => panic!("unexpected node {:?} on {:?}", other, text),
        }
    }

    for text in ["'\"", "\"'", r"'\'", r#""\""#, r"'\u3c0'"] {
        let mut p = parser(text);
        let failed = p.literal().is_none() || p.end_of_file().is_none();
        assert!(failed, "{:?} should not parse", text);
    }
}

#[test]
fn identifiers() {
    for text in ["a", "abc", "a1", "a_123bc"] {
        let mut p = parser(text);
        assert!(
            matches!(p.identifier(), Some(MetaValue::Text(name)) if name == text),
            "on {:?}",
            text
        );
        assert!(p.end_of_file().is_some());
    }
    for text in ["1", "(", ""] {
        assert!(parser(text).identifier().is_none(), "{:?} should not parse", text);
    }
}

#[test]
fn primaries() {
    let mut p = parser("abc");
    let node = p.primary().unwrap().node();
    assert!(matches!(p.tree().kind(node), NodeKind::Identifier { name } if name == "abc"));

    let mut p = parser(".");
    let node = p.primary().unwrap().node();
    assert_eq!(p.tree().tag(node), NodeTag::AnyChar);

    let mut p = parser("(Id)");
    let node = p.primary().unwrap().node();
    assert_eq!(p.tree().tag(node), NodeTag::Expression);
    let alts = p.tree().children(node);
    assert_eq!(alts.len(), 1);
    let parts = p.tree().children(alts[0]);
    assert_eq!(parts.len(), 1);

    // An identifier followed by a left arrow is the next definition, not a
    // reference.
    let mut p = parser("Id <- 'a'");
    assert!(p.primary().is_none());
}

#[test]
fn nested_primaries() {
    let mut p = parser("((Id))");
    let node = p.primary().unwrap().node();
    assert!(p.end_of_file().is_some());
    let outer_part = p.tree().children(p.tree().children(node)[0])[0];
    let inner = match p.tree().kind(outer_part) {
        NodeKind::Part { prime, .. } => *prime,
        other => panic!("unexpected node {:?}", other),
    };
    assert_eq!(p.tree().tag(inner), NodeTag::Expression);

    for text in ["((Id)", "(Id))"] {
        let mut p = parser(text);
        let failed = p.primary().is_none() || p.end_of_file().is_none();
        assert!(failed, "{:?} should not parse", text);
    }
}

#[test]
fn sequences() {
    let read_part = |text: &str| {
        let mut p = parser(text);
        let alt = p.sequence().expect(text).node();
        assert!(p.end_of_file().is_some(), "input {:?} left unconsumed", text);
        let parts = p.tree().children(alt);
        assert_eq!(parts.len(), 1, "on {:?}", text);
        match p.tree().kind(parts[0]) {
            NodeKind::Part {
                name, pred, quant, ..
            } => (name.clone(), *pred, *quant),
            other => panic!("unexpected node {:?}", other),
        }
    };

    assert_eq!(read_part("Id"), (None, None, None));
    assert_eq!(read_part("!Id"), (None, Some(Predicate::Not), None));
    assert_eq!(read_part("&Id"), (None, Some(Predicate::And), None));
    assert_eq!(read_part("Id?"), (None, None, Some(Quantifier::ZeroOrOne)));
    assert_eq!(read_part("Id*"), (None, None, Some(Quantifier::ZeroOrMore)));
    assert_eq!(read_part("Id+"), (None, None, Some(Quantifier::OneOrMore)));
    assert_eq!(
        read_part("Id{1}"),
        (None, None, Some(Quantifier::Repetition(1, None)))
    );
    assert_eq!(
        read_part("!Id?"),
        (None, Some(Predicate::Not), Some(Quantifier::ZeroOrOne))
    );
    assert_eq!(
        read_part("& Id *"),
        (None, Some(Predicate::And), Some(Quantifier::ZeroOrMore))
    );
    assert_eq!(
        read_part("&\rId\n+"),
        (None, Some(Predicate::And), Some(Quantifier::OneOrMore))
    );
    assert_eq!(
        read_part("name:Id"),
        (Some("name".to_string()), None, None)
    );
}

#[test]
fn expressions() {
    let mut p = parser("Alt1 / Alt2");
    let node = p.expression().unwrap().node();
    assert!(p.end_of_file().is_some());
    assert_eq!(p.tree().children(node).len(), 2);

    // A leading or dangling slash produces empty alternatives.
    let mut p = parser("/ Alt");
    let node = p.expression().unwrap().node();
    let alts = p.tree().children(node);
    assert_eq!(alts.len(), 2);
    assert!(p.tree().children(alts[0]).is_empty());

    let mut p = parser("/");
    let node = p.expression().unwrap().node();
    let alts = p.tree().children(node);
    assert_eq!(alts.len(), 2);
    assert!(alts.iter().all(|alt| p.tree().children(*alt).is_empty()));
}

#[test]
fn definitions() {
    let mut p = parser("Id <- Rule");
    let node = p.definition().unwrap().node();
    assert!(p.end_of_file().is_some());
    assert_eq!(p.tree().rule_name(node), "Id");

    let mut p = parser("Id <-");
    let node = p.definition().unwrap().node();
    assert!(p.end_of_file().is_some());
    let expr = p.tree().rule_expr(node);
    let alts = p.tree().children(expr);
    assert_eq!(alts.len(), 1);
    assert!(p.tree().children(alts[0]).is_empty());

    let mut p = parser("Number <- ('0' / '1') ('0' / '1')*");
    let node = p.definition().unwrap().node();
    assert!(p.end_of_file().is_some());
    let expr = p.tree().rule_expr(node);
    let parts = p.tree().children(p.tree().children(expr)[0]);
    assert_eq!(parts.len(), 2);
    assert!(matches!(
        p.tree().kind(parts[1]),
        NodeKind::Part {
            quant: Some(Quantifier::ZeroOrMore),
            ..
        }
    ));

    for text in ["Id Rule", "<- Rule", "Number <- (0 / 1) (0 / 1)*"] {
        let mut p = parser(text);
        let failed = p.definition().is_none() || p.end_of_file().is_none();
        assert!(failed, "{:?} should not parse", text);
    }
}

#[test]
fn directives_set_rule_flags() {
    let mut p = parser("@entry Start <- 'a'");
    let node = p.definition().unwrap().node();
    assert!(matches!(
        p.tree().kind(node),
        NodeKind::Rule {
            entry: true,
            ignore: false,
            ..
        }
    ));

    let mut p = parser("@ignore @entry Spacing <- ' '");
    let node = p.definition().unwrap().node();
    assert!(matches!(
        p.tree().kind(node),
        NodeKind::Rule {
            entry: true,
            ignore: true,
            ..
        }
    ));
}

#[test]
fn whole_grammars() {
    let grammar = parser("Expr <- Expr '+' Term / Expr '-' Term / Term")
        .parse()
        .unwrap();
    assert_eq!(grammar.rules().len(), 1);

    let grammar = parser(
        "
        # This grammar was stolen from Guido Van Rossum:
        # https://medium.com/@gvanrossum_83706/building-a-peg-parser-d4869b5958fb
        Statement  <- Assignment / Expr
        Expr       <- Expr '+' Term / Expr '-' Term / Term
        Term       <- Term '*' Atom / Term '/' Atom / Atom
        Assignment <- Target '=' Expr
        Target     <- ID
        ",
    )
    .parse()
    .unwrap();
    assert_eq!(grammar.rules().len(), 5);

    let grammar = parser(
        "
        Empty <-
        Rule  <- E1 E2
        ",
    )
    .parse()
    .unwrap();
    assert_eq!(grammar.rules().len(), 2);

    assert!(parser("<- Rule").parse().is_err());
    assert!(parser("").parse().is_err());
}

#[test]
fn meta_definitions_and_references() {
    let grammar = parser("@entry S <- 'a' $act\n$act {ret self}\n")
        .parse()
        .unwrap();
    assert_eq!(grammar.rules().len(), 1);
    assert_eq!(grammar.metadef("act"), Some("ret self"));

    let rule = grammar.rule_named("S").unwrap();
    let expr = grammar.tree.rule_expr(rule);
    let alt = grammar.tree.children(expr)[0];
    assert!(matches!(
        grammar.tree.kind(alt),
        NodeKind::Alt {
            action: Some(MetaAction::Ref(name)),
            ..
        } if name == "act"
    ));
}

#[test]
fn meta_bodies_keep_nested_braces() {
    let grammar = parser("$fmt { a { b { c } } d }\nS <- 'x'\n").parse().unwrap();
    assert_eq!(grammar.metadef("fmt"), Some(" a { b { c } } d "));
}

#[test]
fn inline_actions() {
    let grammar = parser("S <- 'a' ${ make(a) }\n").parse().unwrap();
    let rule = grammar.rule_named("S").unwrap();
    let alt = grammar.tree.children(grammar.tree.rule_expr(rule))[0];
    assert!(matches!(
        grammar.tree.kind(alt),
        NodeKind::Alt {
            action: Some(MetaAction::Inline(body)),
            ..
        } if body == " make(a) "
    ));
}
