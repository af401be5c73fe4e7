use super::{CharSource, StrSource};
use crate::util::Position;
use once_cell::unsync::OnceCell;

impl<'c> StrSource<'c> {
    pub fn new(text: &'c str) -> Self {
        Self {
            text,
            chars: Vec::new(),
            rest: text.chars(),
            pos: 0,
            line_breaks: OnceCell::new(),
        }
    }

    fn obtain_line_breaks(&self) -> &Vec<usize> {
        self.line_breaks.get_or_init(|| {
            self.text
                .chars()
                .enumerate()
                .filter_map(|(index, c)| if c == '\n' { Some(index) } else { None })
                .collect()
        })
    }

    /// Line and column of a code point position.
    pub fn obtain_position(&self, pointer: usize) -> Position {
        let line_breaks = self.obtain_line_breaks();
        let index = match line_breaks.binary_search(&pointer) {
            Ok(index) | Err(index) => index,
        };
        if index == 0 {
            Position::new(1, pointer + 1)
        } else {
            let break_point = line_breaks[index - 1] + 1;
            Position::new(index + 1, pointer - break_point + 1)
        }
    }
}

impl<'c> From<&'c str> for StrSource<'c> {
    fn from(text: &'c str) -> Self {
        StrSource::new(text)
    }
}

impl<'c> CharSource for StrSource<'c> {
    fn peek(&mut self) -> Option<char> {
        if self.pos == self.chars.len() {
            match self.rest.next() {
                Some(c) => self.chars.push(c),
                None => return None,
            }
        }
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) {
        if self.peek().is_some() {
            self.pos += 1;
        }
    }

    fn mark(&self) -> usize {
        self.pos
    }

    fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }
}
