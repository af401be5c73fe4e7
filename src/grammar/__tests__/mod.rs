use crate::grammar::{NodeId, NodeKind, NodeTag, Quantifier, Range, Tree};

fn ch_part(tree: &mut Tree, c: char) -> NodeId {
    let prime = tree.alloc(NodeKind::Ch { value: c });
    tree.alloc(NodeKind::Part {
        name: None,
        pred: None,
        prime,
        quant: None,
    })
}

fn alt_of(tree: &mut Tree, parts: Vec<NodeId>) -> NodeId {
    tree.alloc(NodeKind::Alt {
        parts,
        action: None,
    })
}

fn expr_of(tree: &mut Tree, alts: Vec<NodeId>) -> NodeId {
    tree.alloc(NodeKind::Expression { alts })
}

#[test]
fn alloc_rehomes_children() {
    let mut tree = Tree::new();
    let part = ch_part(&mut tree, 'a');
    let alt = alt_of(&mut tree, vec![part]);
    let expr = expr_of(&mut tree, vec![alt]);

    assert_eq!(tree.parent(alt), Some(expr));
    assert_eq!(tree.parent(part), Some(alt));
    assert_eq!(tree.parent(expr), None);
}

#[test]
fn post_order_visits_children_first() {
    let mut tree = Tree::new();
    let part = ch_part(&mut tree, 'a');
    let alt = alt_of(&mut tree, vec![part]);
    let expr = expr_of(&mut tree, vec![alt]);

    let order = tree.post_order(expr);
    let alt_index = order.iter().position(|n| *n == alt).unwrap();
    let part_index = order.iter().position(|n| *n == part).unwrap();
    assert!(part_index < alt_index);
    assert_eq!(order.last(), Some(&expr));
}

#[test]
fn class_equality_is_stable_under_range_reordering() {
    let mut tree = Tree::new();
    let forward = tree.alloc(NodeKind::Class {
        ranges: vec![
            Range::new('a', Some('z')),
            Range::new('0', Some('9')),
        ],
    });
    let backward = tree.alloc(NodeKind::Class {
        ranges: vec![
            Range::new('0', Some('9')),
            Range::new('a', Some('z')),
        ],
    });
    assert!(tree.deep_eq(forward, &tree, backward));
}

#[test]
fn char_equality_is_by_code_point() {
    let mut tree = Tree::new();
    let escaped = tree.alloc(NodeKind::Ch { value: '\u{03c0}' });
    let verbatim = tree.alloc(NodeKind::Ch { value: 'π' });
    let other = tree.alloc(NodeKind::Ch { value: 'τ' });
    assert!(tree.deep_eq(escaped, &tree, verbatim));
    assert!(!tree.deep_eq(escaped, &tree, other));
}

#[test]
fn clone_subtree_is_deep_and_detached() {
    let mut tree = Tree::new();
    let part = ch_part(&mut tree, 'a');
    let alt = alt_of(&mut tree, vec![part]);
    let expr = expr_of(&mut tree, vec![alt]);

    let copy = tree.clone_subtree(expr);
    assert_ne!(copy, expr);
    assert_eq!(tree.parent(copy), None);
    assert!(tree.deep_eq(expr, &tree, copy));

    // Mutating the copy must not touch the original.
    let copied_part = tree.children(tree.children(copy)[0])[0];
    tree.set_quant(copied_part, Some(Quantifier::ZeroOrMore));
    assert!(!tree.deep_eq(expr, &tree, copy));
}

#[test]
fn take_alts_detaches_the_subtree() {
    let mut tree = Tree::new();
    let part = ch_part(&mut tree, 'a');
    let alt = alt_of(&mut tree, vec![part]);
    let inner = expr_of(&mut tree, vec![alt]);
    let outer_part = tree.alloc(NodeKind::Part {
        name: None,
        pred: None,
        prime: inner,
        quant: None,
    });
    let outer_alt = alt_of(&mut tree, vec![outer_part]);
    let outer = expr_of(&mut tree, vec![outer_alt]);

    let alts = tree.take_alts(inner);
    tree.replace_alts(outer, alts);
    assert_eq!(tree.parent(alt), Some(outer));
    assert!(tree.is_attached(part, outer));
    assert!(
        !tree.is_attached(outer_alt, outer),
        "the old singleton chain must be detached"
    );
}

#[test]
fn display_renders_the_meta_grammar_syntax() {
    let mut tree = Tree::new();
    let prime = tree.alloc(NodeKind::Identifier {
        name: "Term".to_string(),
    });
    let part = tree.alloc(NodeKind::Part {
        name: Some("term".to_string()),
        pred: None,
        prime,
        quant: Some(Quantifier::ZeroOrMore),
    });
    let alt = alt_of(&mut tree, vec![part]);
    let expr = expr_of(&mut tree, vec![alt]);
    let rule = tree.alloc(NodeKind::Rule {
        name: "Sum".to_string(),
        expr,
        entry: true,
        ignore: false,
    });
    assert_eq!(tree.display(rule).to_string(), "@entry Sum <- term:Term*");
}

#[test]
fn display_escapes_literals() {
    let mut tree = Tree::new();
    let newline = tree.alloc(NodeKind::Ch { value: '\n' });
    assert_eq!(tree.display(newline).to_string(), r"'\n'");

    let pi = tree.alloc(NodeKind::Ch { value: 'π' });
    assert_eq!(tree.display(pi).to_string(), r"'π'");

    let string = tree.alloc(NodeKind::Str {
        chars: vec!['a', '"', 'b'],
    });
    assert_eq!(tree.display(string).to_string(), r#""a\"b""#);

    let class = tree.alloc(NodeKind::Class {
        ranges: vec![Range::new('0', Some('9')), Range::new('_', None)],
    });
    assert_eq!(tree.display(class).to_string(), "[0-9_]");
}

#[test]
fn tags_match_variants() {
    let mut tree = Tree::new();
    let any = tree.alloc(NodeKind::AnyChar);
    assert_eq!(tree.tag(any), NodeTag::AnyChar);
    let part = ch_part(&mut tree, 'x');
    assert_eq!(tree.tag(part), NodeTag::Part);
}
