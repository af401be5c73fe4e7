use super::{GrammarParser, MetaKey, MetaValue};
use crate::grammar::{Grammar, MetaAction, NodeId, NodeKind, Predicate, Quantifier, Tree};
use crate::runtime::{CharSource, IRecognizer, Packrat};
use crate::util::Log;
use crate::ParseError;
use once_cell::unsync::OnceCell;

impl<S: CharSource> IRecognizer for GrammarParser<S> {
    type Key = MetaKey;
    type Value = MetaValue;
    type Source = S;

    fn source(&mut self) -> &mut S {
        &mut self.src
    }

    fn packrat(&mut self) -> &mut Packrat<MetaKey, MetaValue> {
        &mut self.state
    }
}

impl<S: CharSource> GrammarParser<S> {
    pub fn new(src: S) -> Self {
        Self {
            src,
            state: Packrat::new(),
            tree: Tree::new(),
            debugger: OnceCell::new(),
        }
    }

    /// Set a log label to debug the parser based on the level of
    /// [Log](crate::util::Log).
    pub fn set_log(&self, debugger: Log<&'static str>) -> Result<(), String> {
        self.debugger
            .set(debugger)
            .map_err(|_| "Log is already set for the grammar parser.".to_string())
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Recognize a whole grammar file. On failure the error points at the
    /// furthest position any rule reached.
    pub fn parse(mut self) -> Result<Grammar, ParseError> {
        let result = self.grammar();

        #[cfg(debug_assertions)]
        if let Some(log) = self.debugger.get() {
            if log.order() >= Log::Default(()).order() {
                println!(
                    "[{}; GrammarParser]: parsing {}.",
                    log,
                    if result.is_some() { "successful" } else { "failed" }
                );
            }
        }

        match result {
            Some(MetaValue::Node(root)) => Ok(Grammar::new(self.tree, root)),
            _ => {
                let pointer = self.state.max_parsed_point();
                Err(ParseError::new(
                    pointer,
                    format!("Failed to parse grammar at offset {}.", pointer),
                ))
            }
        }
    }

    // Grammar <- Spacing Entity+ EndOfFile

    pub fn grammar(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Grammar, Self::grammar_body)
    }

    fn grammar_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'grammar: {
            self.spacing()?;
            let Some(entities) = self.repeat(1, Self::entity) else {
                break 'grammar;
            };
            if self.end_of_file().is_none() {
                break 'grammar;
            }
            let mut rules = Vec::new();
            let mut metadefs = Vec::new();
            for entity in entities {
                match entity {
                    MetaValue::Node(rule) => rules.push(rule),
                    MetaValue::MetaDef(name, body) => metadefs.push((name, body)),
                    other => panic!("Bug! unexpected entity value {:?}", other),
                }
            }
            let root = self.tree.alloc(NodeKind::Grammar {
                rules,
                metadefs,
                entry: None,
            });
            return Some(MetaValue::Node(root));
        }
        self.reset(begin);
        None
    }

    // Entity <- Definition / MetaDef

    pub fn entity(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Entity, Self::entity_body)
    }

    fn entity_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        if let Some(definition) = self.definition() {
            return Some(definition);
        }
        self.reset(begin);
        if let Some(metadef) = self.meta_def() {
            return Some(metadef);
        }
        self.reset(begin);
        None
    }

    // Definition <- Directive* Identifier LEFTARROW Expression / MetaDef

    pub fn definition(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Definition, Self::definition_body)
    }

    fn definition_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'definition: {
            let Some(directives) = self.repeat(0, Self::directive) else {
                break 'definition;
            };
            let Some(MetaValue::Text(name)) = self.identifier() else {
                break 'definition;
            };
            if self.left_arrow().is_none() {
                break 'definition;
            }
            let Some(MetaValue::Node(expr)) = self.expression() else {
                break 'definition;
            };
            let directives: Vec<String> = directives.into_iter().map(MetaValue::text).collect();
            let entry = directives.iter().any(|d| d == "entry");
            let ignore = directives.iter().any(|d| d == "ignore");
            let rule = self.tree.alloc(NodeKind::Rule {
                name,
                expr,
                entry,
                ignore,
            });
            return Some(MetaValue::Node(rule));
        }
        self.reset(begin);
        if let Some(metadef) = self.meta_def() {
            return Some(metadef);
        }
        self.reset(begin);
        None
    }

    // Directive <- AT Identifier

    pub fn directive(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Directive, Self::directive_body)
    }

    fn directive_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'directive: {
            if self.at().is_none() {
                break 'directive;
            }
            let Some(MetaValue::Text(name)) = self.identifier() else {
                break 'directive;
            };
            return Some(MetaValue::Text(name));
        }
        self.reset(begin);
        None
    }

    // Expression <- Sequence (SLASH Sequence)*

    pub fn expression(&mut self) -> Option<MetaValue> {
        self.memoized_lr(MetaKey::Expression, Self::expression_body)
    }

    fn expression_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'expression: {
            let Some(MetaValue::Node(first)) = self.sequence() else {
                break 'expression;
            };
            let Some(rest) = self.repeat(0, Self::expression_tail) else {
                break 'expression;
            };
            let mut alts = vec![first];
            alts.extend(rest.into_iter().map(MetaValue::node));
            let expr = self.tree.alloc(NodeKind::Expression { alts });
            return Some(MetaValue::Node(expr));
        }
        self.reset(begin);
        None
    }

    fn expression_tail(&mut self) -> Option<MetaValue> {
        self.memoized_lr(MetaKey::ExpressionTail, Self::expression_tail_body)
    }

    fn expression_tail_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'tail: {
            if self.slash().is_none() {
                break 'tail;
            }
            let Some(MetaValue::Node(alt)) = self.sequence() else {
                break 'tail;
            };
            return Some(MetaValue::Node(alt));
        }
        self.reset(begin);
        None
    }

    // Sequence <- Prefix* MetaRule?

    pub fn sequence(&mut self) -> Option<MetaValue> {
        self.memoized_lr(MetaKey::Sequence, Self::sequence_body)
    }

    fn sequence_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'sequence: {
            let Some(parts) = self.repeat(0, Self::prefix) else {
                break 'sequence;
            };
            let Some(action) = self.maybe(Self::meta_action) else {
                break 'sequence;
            };
            let parts: Vec<NodeId> = parts.into_iter().map(MetaValue::node).collect();
            let action = action.map(|value| match value {
                MetaValue::Action(action) => action,
                other => panic!("Bug! unexpected action value {:?}", other),
            });
            let alt = self.tree.alloc(NodeKind::Alt { parts, action });
            return Some(MetaValue::Node(alt));
        }
        self.reset(begin);
        None
    }

    // Prefix <- MetaName? (AND / NOT)? Suffix

    pub fn prefix(&mut self) -> Option<MetaValue> {
        self.memoized_lr(MetaKey::Prefix, Self::prefix_body)
    }

    fn prefix_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'prefix: {
            let Some(name) = self.maybe(Self::meta_name) else {
                break 'prefix;
            };
            let Some(pred) = self.maybe(Self::prefix_op) else {
                break 'prefix;
            };
            let Some(MetaValue::Node(part)) = self.suffix() else {
                break 'prefix;
            };
            let name = name.map(MetaValue::text);
            let pred = pred.map(|value| match value {
                MetaValue::Pred(pred) => pred,
                other => panic!("Bug! unexpected predicate value {:?}", other),
            });
            if let NodeKind::Part {
                name: name_slot,
                pred: pred_slot,
                ..
            } = self.tree.kind_mut(part)
            {
                *name_slot = name;
                *pred_slot = pred;
            }
            return Some(MetaValue::Node(part));
        }
        self.reset(begin);
        None
    }

    fn prefix_op(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        if let Some(and) = self.and_op() {
            return Some(and);
        }
        self.reset(begin);
        if let Some(not) = self.not_op() {
            return Some(not);
        }
        self.reset(begin);
        None
    }

    // Suffix <- Primary (QUESTION / STAR / PLUS / Repetition)?

    pub fn suffix(&mut self) -> Option<MetaValue> {
        self.memoized_lr(MetaKey::Suffix, Self::suffix_body)
    }

    fn suffix_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'suffix: {
            let Some(MetaValue::Node(prime)) = self.primary() else {
                break 'suffix;
            };
            let Some(quant) = self.maybe(Self::suffix_op) else {
                break 'suffix;
            };
            let quant = quant.map(|value| match value {
                MetaValue::Quant(quant) => quant,
                other => panic!("Bug! unexpected quantifier value {:?}", other),
            });
            let part = self.tree.alloc(NodeKind::Part {
                name: None,
                pred: None,
                prime,
                quant,
            });
            return Some(MetaValue::Node(part));
        }
        self.reset(begin);
        None
    }

    fn suffix_op(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        if let Some(question) = self.question() {
            return Some(question);
        }
        self.reset(begin);
        if let Some(star) = self.star() {
            return Some(star);
        }
        self.reset(begin);
        if let Some(plus) = self.plus() {
            return Some(plus);
        }
        self.reset(begin);
        if let Some(repetition) = self.repetition() {
            return Some(repetition);
        }
        self.reset(begin);
        None
    }

    // Primary <- Identifier !LEFTARROW / OPEN Expression CLOSE
    //          / Literal / Class / DOT

    pub fn primary(&mut self) -> Option<MetaValue> {
        self.memoized_lr(MetaKey::Primary, Self::primary_body)
    }

    fn primary_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'reference: {
            let Some(MetaValue::Text(name)) = self.identifier() else {
                break 'reference;
            };
            if self.lookahead(false, Self::left_arrow).is_none() {
                break 'reference;
            }
            let id = self.tree.alloc(NodeKind::Identifier { name });
            return Some(MetaValue::Node(id));
        }
        self.reset(begin);
        'nested: {
            if self.open().is_none() {
                break 'nested;
            }
            let Some(MetaValue::Node(expr)) = self.expression() else {
                break 'nested;
            };
            if self.close().is_none() {
                break 'nested;
            }
            return Some(MetaValue::Node(expr));
        }
        self.reset(begin);
        if let Some(literal) = self.literal() {
            return Some(literal);
        }
        self.reset(begin);
        if let Some(class) = self.class() {
            return Some(class);
        }
        self.reset(begin);
        if let Some(dot) = self.dot() {
            return Some(dot);
        }
        self.reset(begin);
        None
    }

    // MetaName <- Identifier SEMI

    pub fn meta_name(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::MetaName, Self::meta_name_body)
    }

    fn meta_name_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'name: {
            let Some(MetaValue::Text(name)) = self.identifier() else {
                break 'name;
            };
            if self.semi().is_none() {
                break 'name;
            }
            return Some(MetaValue::Text(name));
        }
        self.reset(begin);
        None
    }

    // MetaRule <- "${" Body '}' Spacing / '$' Spacing Identifier !'{'

    pub fn meta_action(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::MetaAction, Self::meta_action_body)
    }

    fn meta_action_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'inline: {
            if self.expects("${").is_none() {
                break 'inline;
            }
            let Some(body) = self.meta_body_text() else {
                break 'inline;
            };
            if self.expectc(Some('}')).is_none() {
                break 'inline;
            }
            self.spacing()?;
            return Some(MetaValue::Action(MetaAction::Inline(body)));
        }
        self.reset(begin);
        'reference: {
            if self.expectc(Some('$')).is_none() {
                break 'reference;
            }
            self.spacing()?;
            let Some(MetaValue::Text(name)) = self.identifier() else {
                break 'reference;
            };
            if self
                .lookahead(false, |p: &mut Self| p.expectc(Some('{')))
                .is_none()
            {
                break 'reference;
            }
            return Some(MetaValue::Action(MetaAction::Ref(name)));
        }
        self.reset(begin);
        None
    }

    // MetaDef <- '$' Spacing Identifier '{' Body '}' Spacing

    pub fn meta_def(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::MetaDef, Self::meta_def_body)
    }

    fn meta_def_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'definition: {
            if self.expectc(Some('$')).is_none() {
                break 'definition;
            }
            self.spacing()?;
            let Some(MetaValue::Text(name)) = self.identifier() else {
                break 'definition;
            };
            let Some(MetaValue::Text(body)) = self.meta_def_block() else {
                break 'definition;
            };
            return Some(MetaValue::MetaDef(name, body));
        }
        self.reset(begin);
        None
    }

    fn meta_def_block(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::MetaDefBody, Self::meta_def_block_body)
    }

    fn meta_def_block_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'block: {
            if self.expectc(Some('{')).is_none() {
                break 'block;
            }
            let Some(body) = self.meta_body_text() else {
                break 'block;
            };
            if self.expectc(Some('}')).is_none() {
                break 'block;
            }
            self.spacing()?;
            return Some(MetaValue::Text(body));
        }
        self.reset(begin);
        None
    }

    // NestedBody <- '{' Body '}', braces preserved in the collected text.

    pub fn nested_body(&mut self) -> Option<MetaValue> {
        self.memoized_lr(MetaKey::NestedBody, Self::nested_body_body)
    }

    fn nested_body_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'nested: {
            if self.expectc(Some('{')).is_none() {
                break 'nested;
            }
            let Some(body) = self.meta_body_text() else {
                break 'nested;
            };
            if self.expectc(Some('}')).is_none() {
                break 'nested;
            }
            return Some(MetaValue::Text(format!("{{{}}}", body)));
        }
        self.reset(begin);
        None
    }

    fn meta_body_text(&mut self) -> Option<String> {
        let mut text = String::new();
        loop {
            let pos = self.mark();
            match self.meta_body_item() {
                Some(MetaValue::Text(part)) => text.push_str(&part),
                Some(MetaValue::Ch(c)) => text.push(c),
                Some(other) => panic!("Bug! unexpected body item {:?}", other),
                None => {
                    self.reset(pos);
                    break;
                }
            }
        }
        Some(text)
    }

    fn meta_body_item(&mut self) -> Option<MetaValue> {
        self.memoized_lr(MetaKey::MetaBodyItem, Self::meta_body_item_body)
    }

    fn meta_body_item_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        if let Some(nested) = self.nested_body() {
            return Some(nested);
        }
        self.reset(begin);
        'chr: {
            if self
                .lookahead(false, |p: &mut Self| p.expectc(Some('}')))
                .is_none()
            {
                break 'chr;
            }
            let Some(c) = self.expectc(None) else {
                break 'chr;
            };
            return Some(MetaValue::Ch(c));
        }
        self.reset(begin);
        None
    }

    // Identifier <- [a-zA-Z_] ([a-zA-Z_] / [0-9])* Spacing

    pub fn identifier(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Identifier, Self::identifier_body)
    }

    fn identifier_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'identifier: {
            let Some(start) = self.ident_start() else {
                break 'identifier;
            };
            let mut name = String::new();
            name.push(start);
            while let Some(c) = self.ident_cont() {
                name.push(c);
            }
            self.spacing()?;
            return Some(MetaValue::Text(name));
        }
        self.reset(begin);
        None
    }

    fn ident_start(&mut self) -> Option<char> {
        self.ranges(&[('a', 'z'), ('A', 'Z'), ('_', '_')])
    }

    fn ident_cont(&mut self) -> Option<char> {
        let begin = self.mark();
        if let Some(c) = self.ident_start() {
            return Some(c);
        }
        self.reset(begin);
        self.ranges(&[('0', '9')])
    }

    // Literal <- ['] (!['] Char)* ['] Spacing / ["] (!["] Char)* ["] Spacing
    //
    // One code point gives a Ch node, anything else gives a Str node.

    pub fn literal(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Literal, Self::literal_body)
    }

    fn literal_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        if let Some(literal) = self.literal_quoted('\'') {
            return Some(literal);
        }
        self.reset(begin);
        if let Some(literal) = self.literal_quoted('"') {
            return Some(literal);
        }
        self.reset(begin);
        None
    }

    fn literal_quoted(&mut self, quote: char) -> Option<MetaValue> {
        let begin = self.mark();
        'literal: {
            if self.expectc(Some(quote)).is_none() {
                break 'literal;
            }
            let mut chars = Vec::new();
            loop {
                let pos = self.mark();
                if self.peek_char() == Some(quote) {
                    break;
                }
                match self.char_value() {
                    Some(c) => chars.push(c),
                    None => {
                        self.reset(pos);
                        break;
                    }
                }
            }
            if self.expectc(Some(quote)).is_none() {
                break 'literal;
            }
            self.spacing()?;
            let node = if chars.len() == 1 {
                self.tree.alloc(NodeKind::Ch { value: chars[0] })
            } else {
                self.tree.alloc(NodeKind::Str { chars })
            };
            return Some(MetaValue::Node(node));
        }
        self.reset(begin);
        None
    }

    // Class <- '[' (!']' Range)* ']' Spacing

    pub fn class(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Class, Self::class_body)
    }

    fn class_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'class: {
            if self.expectc(Some('[')).is_none() {
                break 'class;
            }
            let mut ranges = Vec::new();
            loop {
                let pos = self.mark();
                if self.peek_char() == Some(']') {
                    break;
                }
                match self.range() {
                    Some(MetaValue::Range(beg, end)) => {
                        ranges.push(crate::grammar::Range::new(beg, end))
                    }
                    _ => {
                        self.reset(pos);
                        break;
                    }
                }
            }
            if self.expectc(Some(']')).is_none() {
                break 'class;
            }
            self.spacing()?;
            let node = self.tree.alloc(NodeKind::Class { ranges });
            return Some(MetaValue::Node(node));
        }
        self.reset(begin);
        None
    }

    // Range <- Char '-' Char / Char

    pub fn range(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Range, Self::range_body)
    }

    fn range_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'interval: {
            let Some(beg) = self.char_value() else {
                break 'interval;
            };
            if self.expectc(Some('-')).is_none() {
                break 'interval;
            }
            let Some(end) = self.char_value() else {
                break 'interval;
            };
            return Some(MetaValue::Range(beg, Some(end)));
        }
        self.reset(begin);
        'single: {
            let Some(beg) = self.char_value() else {
                break 'single;
            };
            return Some(MetaValue::Range(beg, None));
        }
        self.reset(begin);
        None
    }

    // Char <- '\' [nrt'"\[\]\\] / '\' [0-2][0-7][0-7] / '\' [0-7][0-7]?
    //       / "\u" HexDigit{4} / !'\' .

    fn char_value(&mut self) -> Option<char> {
        match self.char_rule()? {
            MetaValue::Ch(c) => Some(c),
            other => panic!("Bug! char rule produced {:?}", other),
        }
    }

    pub fn char_rule(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Char, Self::char_rule_body)
    }

    fn char_rule_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'escape: {
            if self.expectc(Some('\\')).is_none() {
                break 'escape;
            }
            let Some(c) = self.ranges(&[
                ('n', 'n'),
                ('r', 'r'),
                ('t', 't'),
                ('\'', '\''),
                ('"', '"'),
                ('[', '['),
                (']', ']'),
                ('\\', '\\'),
            ]) else {
                break 'escape;
            };
            let value = match c {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            };
            return Some(MetaValue::Ch(value));
        }
        self.reset(begin);
        'octal3: {
            if self.expectc(Some('\\')).is_none() {
                break 'octal3;
            }
            let Some(d1) = self.ranges(&[('0', '2')]) else {
                break 'octal3;
            };
            let Some(d2) = self.ranges(&[('0', '7')]) else {
                break 'octal3;
            };
            let Some(d3) = self.ranges(&[('0', '7')]) else {
                break 'octal3;
            };
            let code = (d1 as u32 - '0' as u32) * 64
                + (d2 as u32 - '0' as u32) * 8
                + (d3 as u32 - '0' as u32);
            match char::from_u32(code) {
                Some(value) => return Some(MetaValue::Ch(value)),
                None => break 'octal3,
            }
        }
        self.reset(begin);
        'octal2: {
            if self.expectc(Some('\\')).is_none() {
                break 'octal2;
            }
            let Some(d1) = self.ranges(&[('0', '7')]) else {
                break 'octal2;
            };
            let Some(d2) = self.maybe(|p: &mut Self| p.ranges(&[('0', '7')])) else {
                break 'octal2;
            };
            let mut code = d1 as u32 - '0' as u32;
            if let Some(d2) = d2 {
                code = code * 8 + (d2 as u32 - '0' as u32);
            }
            match char::from_u32(code) {
                Some(value) => return Some(MetaValue::Ch(value)),
                None => break 'octal2,
            }
        }
        self.reset(begin);
        'unicode: {
            if self.expects("\\u").is_none() {
                break 'unicode;
            }
            let Some(digits) = self.rep(4, None, Self::hex_digit) else {
                break 'unicode;
            };
            let mut code = 0u32;
            for digit in digits {
                code = code * 16 + digit.to_digit(16).unwrap();
            }
            match char::from_u32(code) {
                Some(value) => return Some(MetaValue::Ch(value)),
                None => break 'unicode,
            }
        }
        self.reset(begin);
        'any: {
            if self
                .lookahead(false, |p: &mut Self| p.expectc(Some('\\')))
                .is_none()
            {
                break 'any;
            }
            let Some(c) = self.expectc(None) else {
                break 'any;
            };
            return Some(MetaValue::Ch(c));
        }
        self.reset(begin);
        None
    }

    fn hex_digit(&mut self) -> Option<char> {
        self.ranges(&[('a', 'f'), ('A', 'F'), ('0', '9')])
    }

    // Repetition <- '{' (Number ',' Number / Number) '}' Spacing
    //
    // No spacing is allowed inside the braces: `{1, 2}` is rejected.

    pub fn repetition(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Repetition, Self::repetition_body)
    }

    fn repetition_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        'repetition: {
            if self.expectc(Some('{')).is_none() {
                break 'repetition;
            }
            let group_begin = self.mark();
            let mut bounds: Option<(u32, Option<u32>)> = None;
            'bounded: {
                let Some(MetaValue::Num(beg)) = self.number() else {
                    break 'bounded;
                };
                if self.expectc(Some(',')).is_none() {
                    break 'bounded;
                }
                let Some(MetaValue::Num(end)) = self.number() else {
                    break 'bounded;
                };
                bounds = Some((beg, Some(end)));
            }
            if bounds.is_none() {
                self.reset(group_begin);
                if let Some(MetaValue::Num(beg)) = self.number() {
                    bounds = Some((beg, None));
                }
            }
            let Some((beg, end)) = bounds else {
                break 'repetition;
            };
            if self.expectc(Some('}')).is_none() {
                break 'repetition;
            }
            self.spacing()?;
            return Some(MetaValue::Quant(Quantifier::Repetition(beg, end)));
        }
        self.reset(begin);
        None
    }

    // Number <- [0-9]+

    pub fn number(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Number, Self::number_body)
    }

    fn number_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        let digits = match self.repeat(1, |p: &mut Self| p.ranges(&[('0', '9')])) {
            Some(digits) => digits,
            None => {
                self.reset(begin);
                return None;
            }
        };
        let text: String = digits.into_iter().collect();
        match text.parse::<u32>() {
            Ok(value) => Some(MetaValue::Num(value)),
            Err(_) => {
                self.reset(begin);
                None
            }
        }
    }

    // Token level rules. Each consumes its lexeme and any trailing spacing.

    fn token_char(&mut self, c: char) -> Option<MetaValue> {
        let begin = self.mark();
        if self.expectc(Some(c)).is_some() {
            self.spacing()?;
            return Some(MetaValue::Unit);
        }
        self.reset(begin);
        None
    }

    pub fn left_arrow(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::LeftArrow, Self::left_arrow_body)
    }

    fn left_arrow_body(&mut self) -> Option<MetaValue> {
        let begin = self.mark();
        if self.expects("<-").is_some() {
            self.spacing()?;
            return Some(MetaValue::Unit);
        }
        self.reset(begin);
        None
    }

    pub fn slash(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Slash, |p| p.token_char('/'))
    }

    pub fn and_op(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::AndOp, |p| {
            p.token_char('&')
                .map(|_| MetaValue::Pred(Predicate::And))
        })
    }

    pub fn not_op(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::NotOp, |p| {
            p.token_char('!')
                .map(|_| MetaValue::Pred(Predicate::Not))
        })
    }

    pub fn question(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Question, |p| {
            p.token_char('?')
                .map(|_| MetaValue::Quant(Quantifier::ZeroOrOne))
        })
    }

    pub fn star(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Star, |p| {
            p.token_char('*')
                .map(|_| MetaValue::Quant(Quantifier::ZeroOrMore))
        })
    }

    pub fn plus(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Plus, |p| {
            p.token_char('+')
                .map(|_| MetaValue::Quant(Quantifier::OneOrMore))
        })
    }

    pub fn open(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Open, |p| p.token_char('('))
    }

    pub fn close(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Close, |p| p.token_char(')'))
    }

    pub fn dot(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Dot, Self::dot_body)
    }

    fn dot_body(&mut self) -> Option<MetaValue> {
        self.token_char('.')?;
        let node = self.tree.alloc(NodeKind::AnyChar);
        Some(MetaValue::Node(node))
    }

    pub fn at(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::At, |p| p.token_char('@'))
    }

    pub fn semi(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Semi, |p| p.token_char(':'))
    }

    // Spacing <- (Space / Comment)*

    pub fn spacing(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::Spacing, Self::spacing_body)
    }

    fn spacing_body(&mut self) -> Option<MetaValue> {
        loop {
            let pos = self.mark();
            if self.space().is_some() {
                continue;
            }
            self.reset(pos);
            if self.comment().is_some() {
                continue;
            }
            self.reset(pos);
            break;
        }
        Some(MetaValue::Unit)
    }

    fn space(&mut self) -> Option<()> {
        let begin = self.mark();
        if self.expectc(Some('\u{0020}')).is_some() {
            return Some(());
        }
        self.reset(begin);
        if self.expectc(Some('\u{0009}')).is_some() {
            return Some(());
        }
        self.reset(begin);
        self.end_of_line()
    }

    // Comment <- '#' (!EndOfLine .)* EndOfLine

    fn comment(&mut self) -> Option<()> {
        let begin = self.mark();
        'comment: {
            if self.expectc(Some('#')).is_none() {
                break 'comment;
            }
            loop {
                let pos = self.mark();
                if self.end_of_line().is_some() {
                    return Some(());
                }
                self.reset(pos);
                if self.expectc(None).is_none() {
                    break 'comment;
                }
            }
        }
        self.reset(begin);
        None
    }

    fn end_of_line(&mut self) -> Option<()> {
        let begin = self.mark();
        if self.expects("\u{000d}\u{000a}").is_some() {
            return Some(());
        }
        self.reset(begin);
        if self.expectc(Some('\u{000a}')).is_some() {
            return Some(());
        }
        self.reset(begin);
        if self.expectc(Some('\u{000d}')).is_some() {
            return Some(());
        }
        self.reset(begin);
        None
    }

    // EndOfFile <- !.

    pub fn end_of_file(&mut self) -> Option<MetaValue> {
        self.memoized(MetaKey::EndOfFile, Self::end_of_file_body)
    }

    fn end_of_file_body(&mut self) -> Option<MetaValue> {
        self.lookahead(false, |p: &mut Self| p.expectc(None))
            .map(|_| MetaValue::Unit)
    }
}
