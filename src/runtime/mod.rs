//! The packrat runtime: memoization and left recursion support shared by
//! the meta-parser and embedded into every generated parser.
//!
//! The left recursion algorithm is the seed-growing technique from
//! "Packrat parsers can support left recursion" (Warth, Douglass,
//! Millstein). A left recursive invocation is first answered with a
//! sentinel, the non-recursive seed is computed, and the seed is then grown
//! by re-evaluating the rule body until the match stops extending.
mod packrat;
mod source;


use once_cell::unsync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

/// A lazy stream of code points with position marking and resetting.
///
/// The source must stay seekable for the lifetime of one parse: `reset`
/// with a previously marked position always succeeds.
pub trait CharSource {
    fn peek(&mut self) -> Option<char>;
    fn advance(&mut self);
    fn mark(&self) -> usize;
    fn reset(&mut self, pos: usize);
}

/// A [CharSource] over a string slice with a lazily filled code point
/// buffer and lazily computed line break table.
pub struct StrSource<'c> {
    text: &'c str,
    chars: Vec<char>,
    rest: std::str::Chars<'c>,
    pos: usize,
    line_breaks: OnceCell<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// A wrapper to indicate the index of a left recursion sentinel in the
/// [Packrat] state.
pub struct LrId(pub(crate) usize);

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// A wrapper to indicate the index of a [HeadRec] in the [Packrat] state.
pub struct HeadId(pub(crate) usize);

#[derive(Debug, Clone)]
/// One memo table entry: a settled result with its end position, or a left
/// recursion sentinel while its seed parse is in flight.
pub enum MemoEntry<V> {
    Parsed(Option<V>, usize),
    Lr(LrId, usize),
}

#[derive(Debug)]
/// A left recursion sentinel: the seed result of the recursive rule and the
/// head of the recursion cluster it belongs to, once detected.
pub struct LrRec<K, V> {
    pub rule: K,
    pub seed: Option<V>,
    pub head: Option<HeadId>,
}

#[derive(Debug)]
/// Bookkeeping for one left recursion cluster at one position: the rule
/// that heads the cluster, the rules involved in the cycle, and the rules
/// still to be re-evaluated during the current growth iteration.
pub struct HeadRec<K> {
    pub rule: K,
    pub involved: HashSet<K>,
    pub eval: HashSet<K>,
}

/// The memoization state of one parse. Owned by a single parser instance
/// and never shared; reusing a parser object requires a fresh state.
pub struct Packrat<K, V> {
    memos: HashMap<(K, usize), MemoEntry<V>>,
    heads: HashMap<usize, HeadId>,
    lr_stack: Vec<LrId>,
    lrs: Vec<LrRec<K, V>>,
    head_recs: Vec<HeadRec<K>>,
    max_parsed_point: usize,
}

/// The recognizer interface implemented by packrat parsers.
///
/// Implementors provide access to their [CharSource] and [Packrat] state;
/// the provided methods are the whole runtime contract: terminal matchers,
/// lookahead, greedy loops with a cursor advancement guard, plain
/// memoization and the left recursion entry point.
pub trait IRecognizer: Sized {
    type Key: Copy + Eq + Hash + Debug;
    type Value: Clone;
    type Source: CharSource;

    fn source(&mut self) -> &mut Self::Source;
    fn packrat(&mut self) -> &mut Packrat<Self::Key, Self::Value>;

    fn mark(&mut self) -> usize {
        self.source().mark()
    }

    fn reset(&mut self, pos: usize) {
        self.source().reset(pos)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.source().peek()
    }

    /// Match one code point. With `want` unset any code point matches; at
    /// the end of input the match fails.
    fn expectc(&mut self, want: Option<char>) -> Option<char> {
        if let Some(c) = self.peek_char() {
            if want.map_or(true, |w| w == c) {
                self.source().advance();
                return Some(c);
            }
        }
        None
    }

    /// Match a string code point by code point, restoring the cursor on a
    /// mismatch.
    fn expects(&mut self, string: &str) -> Option<()> {
        let pos = self.mark();
        for want in string.chars() {
            if self.peek_char() != Some(want) {
                self.reset(pos);
                return None;
            }
            self.source().advance();
        }
        Some(())
    }

    /// Match one code point lying in any of the inclusive ranges.
    fn ranges(&mut self, ranges: &[(char, char)]) -> Option<char> {
        let c = self.peek_char()?;
        if ranges.iter().any(|(beg, end)| c >= *beg && c <= *end) {
            self.source().advance();
            Some(c)
        } else {
            None
        }
    }

    /// Evaluate `body` without consuming input; succeed iff the body's
    /// success matches `positive`.
    fn lookahead<T>(
        &mut self,
        positive: bool,
        mut body: impl FnMut(&mut Self) -> Option<T>,
    ) -> Option<()> {
        let pos = self.mark();
        let matched = body(self).is_some();
        self.reset(pos);
        if matched == positive {
            Some(())
        } else {
            None
        }
    }

    /// Always succeeds; the inner result may be absent.
    fn maybe<T>(&mut self, mut body: impl FnMut(&mut Self) -> Option<T>) -> Option<Option<T>> {
        Some(body(self))
    }

    /// Greedy loop. Stops when the body fails or succeeds without advancing
    /// the cursor; succeeds iff at least `minimum` items were collected.
    fn repeat<T>(
        &mut self,
        minimum: usize,
        mut body: impl FnMut(&mut Self) -> Option<T>,
    ) -> Option<Vec<T>> {
        let pos = self.mark();
        let mut lastpos = pos;
        let mut items = Vec::new();
        while let Some(item) = body(self) {
            if self.mark() <= lastpos {
                break;
            }
            items.push(item);
            lastpos = self.mark();
        }
        if items.len() >= minimum {
            Some(items)
        } else {
            self.reset(pos);
            None
        }
    }

    /// Bounded repetition: succeed iff the greedy match count lies in
    /// `beg..=end`. An absent end bounds the count to exactly `beg`.
    fn rep<T>(
        &mut self,
        beg: usize,
        end: Option<usize>,
        mut body: impl FnMut(&mut Self) -> Option<T>,
    ) -> Option<Vec<T>> {
        let end = end.unwrap_or(beg);
        let pos = self.mark();
        let mut lastpos = pos;
        let mut items = Vec::new();
        while let Some(item) = body(self) {
            if self.mark() <= lastpos {
                break;
            }
            items.push(item);
            lastpos = self.mark();
        }
        if items.len() >= beg && items.len() <= end {
            Some(items)
        } else {
            self.reset(pos);
            None
        }
    }

    /// Plain memoization: evaluate the rule body at most once per position.
    fn memoized(
        &mut self,
        rule: Self::Key,
        mut body: impl FnMut(&mut Self) -> Option<Self::Value>,
    ) -> Option<Self::Value> {
        let pos = self.mark();
        if let Some((result, endpos)) = self.packrat().recall_plain(rule, pos) {
            self.reset(endpos);
            return result;
        }
        let result = body(self);
        let endpos = self.mark();
        self.packrat()
            .memo_insert(rule, pos, MemoEntry::Parsed(result.clone(), endpos));
        result
    }

    /// Memoization with left recursion support. Must wrap every rule whose
    /// right-hand side can reach itself at the same position.
    fn memoized_lr(
        &mut self,
        rule: Self::Key,
        mut body: impl FnMut(&mut Self) -> Option<Self::Value>,
    ) -> Option<Self::Value> {
        let pos = self.mark();
        match self.recall(rule, pos, &mut body) {
            None => {
                let lr = self.packrat().push_lr(rule);
                self.packrat()
                    .memo_insert(rule, pos, MemoEntry::Lr(lr, pos));
                let result = body(self);
                self.packrat().pop_lr();
                let endpos = self.mark();
                self.packrat()
                    .memo_insert(rule, pos, MemoEntry::Lr(lr, endpos));
                if self.packrat().lr_head(lr).is_some() {
                    self.packrat().set_seed(lr, result);
                    self.lr_answer(rule, pos, &mut body)
                } else {
                    self.packrat()
                        .memo_insert(rule, pos, MemoEntry::Parsed(result.clone(), endpos));
                    result
                }
            }
            Some(MemoEntry::Lr(lr, endpos)) => {
                self.reset(endpos);
                self.setup_lr(rule, lr);
                self.packrat().seed(lr)
            }
            Some(MemoEntry::Parsed(result, endpos)) => {
                self.reset(endpos);
                result
            }
        }
    }

    /// Recall phase: consult the memo table, honouring an active growth at
    /// this position. Rules not involved in the growing recursion are
    /// answered with a failure; involved rules are re-evaluated once per
    /// growth iteration.
    fn recall(
        &mut self,
        rule: Self::Key,
        pos: usize,
        body: &mut impl FnMut(&mut Self) -> Option<Self::Value>,
    ) -> Option<MemoEntry<Self::Value>> {
        let memo = self.packrat().memo_entry(rule, pos);
        let head = match self.packrat().head_at(pos) {
            Some(head) => head,
            None => return memo,
        };
        if memo.is_none() && !self.packrat().involves(head, rule) {
            return Some(MemoEntry::Parsed(None, pos));
        }
        if self.packrat().take_eval(head, rule) {
            let result = body(self);
            let endpos = self.mark();
            return Some(MemoEntry::Parsed(result, endpos));
        }
        memo
    }

    /// Setup phase: tag every frame of the invocation stack between the
    /// recursive call and its head, accumulating the involved rule set.
    fn setup_lr(&mut self, rule: Self::Key, lr: LrId) {
        let state = self.packrat();
        let head = match state.lr_head(lr) {
            Some(head) => head,
            None => {
                let head = state.new_head(rule);
                state.set_lr_head(lr, head);
                head
            }
        };
        for frame in state.stack_top_down() {
            if state.lr_head(frame) == Some(head) {
                break;
            }
            state.set_lr_head(frame, head);
            let involved = state.lr_rule(frame);
            state.add_involved(head, involved);
        }
    }

    /// Answer phase: a sentinel that does not head its own recursion
    /// returns its seed untouched; the head replaces the memo with the seed
    /// and enters the growth loop.
    fn lr_answer(
        &mut self,
        rule: Self::Key,
        pos: usize,
        body: &mut impl FnMut(&mut Self) -> Option<Self::Value>,
    ) -> Option<Self::Value> {
        let (lr, lastpos) = self.packrat().expect_lr(rule, pos);
        let head = match self.packrat().lr_head(lr) {
            Some(head) => head,
            None => panic!("Bug! answering a sentinel with no head"),
        };
        let seed = self.packrat().seed(lr);
        if self.packrat().head_rule(head) != rule {
            return seed;
        }
        self.packrat()
            .memo_insert(rule, pos, MemoEntry::Parsed(seed.clone(), lastpos));
        seed.as_ref()?;
        self.grow_lr(rule, pos, head, body)
    }

    /// Growth phase: re-evaluate the rule body from the start position
    /// until the match no longer extends; every iteration re-arms the
    /// involved rules for exactly one evaluation.
    fn grow_lr(
        &mut self,
        rule: Self::Key,
        pos: usize,
        head: HeadId,
        body: &mut impl FnMut(&mut Self) -> Option<Self::Value>,
    ) -> Option<Self::Value> {
        self.packrat().register_head(pos, head);
        let (mut best, _) = self.packrat().expect_parsed(rule, pos);
        let mut lastpos = pos;
        self.packrat()
            .memo_insert(rule, pos, MemoEntry::Parsed(best.clone(), lastpos));
        loop {
            self.reset(pos);
            self.packrat().refill_eval(head);
            let result = body(self);
            let endpos = self.mark();
            if result.is_none() || endpos <= lastpos {
                break;
            }
            best = result;
            lastpos = endpos;
            self.packrat()
                .memo_insert(rule, pos, MemoEntry::Parsed(best.clone(), lastpos));
        }
        self.reset(lastpos);
        self.packrat().remove_head(pos);
        best
    }
}
