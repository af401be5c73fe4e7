use super::{Grammar, MetaAction, NodeId, NodeKind, Predicate, Quantifier, Range, Tree};
use ptree::TreeItem;
use std::borrow::Cow;
use std::fmt::{Display, Formatter, Write};

/// A borrowed view of one node rendered in the meta-grammar syntax.
///
/// Re-parsing the rendered text of a normalized grammar yields a tree that
/// is structurally equal to the original.
pub struct NodeDisplay<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl Tree {
    pub fn display(&self, id: NodeId) -> NodeDisplay {
        NodeDisplay { tree: self, id }
    }
}

fn escape_literal(c: char, quote: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\\' => "\\\\".to_string(),
        c if c == quote => format!("\\{}", c),
        c => escape_plain(c),
    }
}

fn escape_class(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\\' => "\\\\".to_string(),
        '[' => "\\[".to_string(),
        ']' => "\\]".to_string(),
        // A dash separates range bounds, so render it as an octal escape.
        '-' => "\\55".to_string(),
        c => escape_plain(c),
    }
}

fn escape_plain(c: char) -> String {
    let code = c as u32;
    if (0x20..0x7f).contains(&code) {
        c.to_string()
    } else if code <= 0xffff {
        format!("\\u{:04x}", code)
    } else {
        // Above the four hex digit escape form; written verbatim.
        c.to_string()
    }
}

fn write_range(f: &mut Formatter<'_>, range: &Range) -> std::fmt::Result {
    write!(f, "{}", escape_class(range.beg))?;
    if let Some(end) = range.end {
        write!(f, "-{}", escape_class(end))?;
    }
    Ok(())
}

impl<'t> NodeDisplay<'t> {
    fn write_node(&self, f: &mut Formatter<'_>, id: NodeId) -> std::fmt::Result {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Grammar {
                rules, metadefs, ..
            } => {
                for rule in rules {
                    self.write_node(f, *rule)?;
                    writeln!(f)?;
                }
                for (name, body) in metadefs {
                    writeln!(f, "${} {{{}}}", name, body)?;
                }
                Ok(())
            }
            NodeKind::Rule {
                name,
                expr,
                entry,
                ignore,
            } => {
                if *entry {
                    write!(f, "@entry ")?;
                }
                if *ignore {
                    write!(f, "@ignore ")?;
                }
                write!(f, "{} <- ", name)?;
                self.write_node(f, *expr)
            }
            NodeKind::Expression { alts } => {
                for (index, alt) in alts.iter().enumerate() {
                    if index > 0 {
                        write!(f, " / ")?;
                    }
                    self.write_node(f, *alt)?;
                }
                Ok(())
            }
            NodeKind::Alt { parts, action } => {
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }
                    self.write_node(f, *part)?;
                }
                match action {
                    Some(MetaAction::Inline(body)) => {
                        if !parts.is_empty() {
                            write!(f, " ")?;
                        }
                        write!(f, "${{{}}}", body)
                    }
                    Some(MetaAction::Ref(name)) => {
                        if !parts.is_empty() {
                            write!(f, " ")?;
                        }
                        write!(f, "${}", name)
                    }
                    None => Ok(()),
                }
            }
            NodeKind::Part {
                name,
                pred,
                prime,
                quant,
            } => {
                if let Some(name) = name {
                    write!(f, "{}:", name)?;
                }
                match pred {
                    Some(Predicate::And) => write!(f, "&")?,
                    Some(Predicate::Not) => write!(f, "!")?,
                    None => {}
                }
                if let NodeKind::Expression { .. } = tree.kind(*prime) {
                    write!(f, "(")?;
                    self.write_node(f, *prime)?;
                    write!(f, ")")?;
                } else {
                    self.write_node(f, *prime)?;
                }
                match quant {
                    Some(Quantifier::ZeroOrOne) => write!(f, "?"),
                    Some(Quantifier::ZeroOrMore) => write!(f, "*"),
                    Some(Quantifier::OneOrMore) => write!(f, "+"),
                    Some(Quantifier::Repetition(beg, None)) => write!(f, "{{{}}}", beg),
                    Some(Quantifier::Repetition(beg, Some(end))) => {
                        write!(f, "{{{},{}}}", beg, end)
                    }
                    None => Ok(()),
                }
            }
            NodeKind::Identifier { name } => write!(f, "{}", name),
            NodeKind::Str { chars } => {
                write!(f, "\"")?;
                for c in chars {
                    write!(f, "{}", escape_literal(*c, '"'))?;
                }
                write!(f, "\"")
            }
            NodeKind::Ch { value } => write!(f, "'{}'", escape_literal(*value, '\'')),
            NodeKind::Class { ranges } => {
                write!(f, "[")?;
                for range in ranges {
                    write_range(f, range)?;
                }
                write!(f, "]")
            }
            NodeKind::AnyChar => write!(f, "."),
        }
    }
}

impl<'t> Display for NodeDisplay<'t> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write_node(f, self.id)
    }
}

#[derive(Debug, Clone)]
struct PrintNode {
    label: String,
    children: Vec<PrintNode>,
}

impl TreeItem for PrintNode {
    type Child = Self;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(&self.children)
    }
}

fn print_node(tree: &Tree, id: NodeId) -> PrintNode {
    let mut label = String::new();
    match tree.kind(id) {
        NodeKind::Grammar { .. } => label.push_str("Grammar"),
        NodeKind::Rule {
            name,
            entry,
            ignore,
            ..
        } => {
            write!(label, "Rule {}", name).ok();
            if *entry {
                label.push_str(" @entry");
            }
            if *ignore {
                label.push_str(" @ignore");
            }
        }
        NodeKind::Expression { .. } => label.push_str("Expression"),
        NodeKind::Alt { .. } => label.push_str("Alt"),
        NodeKind::Part { name, pred, quant, .. } => {
            label.push_str("Part");
            if let Some(name) = name {
                write!(label, " {}:", name).ok();
            }
            if let Some(pred) = pred {
                write!(label, " {:?}", pred).ok();
            }
            if let Some(quant) = quant {
                write!(label, " {:?}", quant).ok();
            }
        }
        _ => {
            write!(label, "{}", tree.display(id)).ok();
        }
    }
    PrintNode {
        label,
        children: tree
            .children(id)
            .into_iter()
            .map(|c| print_node(tree, c))
            .collect(),
    }
}

impl Grammar {
    /// Print the grammar tree to the standard output.
    pub fn print(&self) -> Result<(), std::io::Error> {
        ptree::print_tree(&print_node(&self.tree, self.root))
    }
}
