use super::{HeadId, HeadRec, LrId, LrRec, MemoEntry, Packrat};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

impl<K: Copy + Eq + Hash + Debug, V: Clone> Packrat<K, V> {
    pub fn new() -> Self {
        Self {
            memos: HashMap::new(),
            heads: HashMap::new(),
            lr_stack: Vec::new(),
            lrs: Vec::new(),
            head_recs: Vec::new(),
            max_parsed_point: 0,
        }
    }

    /// Drop all per-parse state so the parser object can be reused.
    pub fn clear(&mut self) {
        self.memos.clear();
        self.heads.clear();
        self.lr_stack.clear();
        self.lrs.clear();
        self.head_recs.clear();
        self.max_parsed_point = 0;
    }

    /// The furthest position any memoized result has reached. Used for
    /// error reporting.
    pub fn max_parsed_point(&self) -> usize {
        self.max_parsed_point
    }

    pub fn memo_entry(&self, rule: K, pos: usize) -> Option<MemoEntry<V>> {
        self.memos.get(&(rule, pos)).cloned()
    }

    pub fn memo_insert(&mut self, rule: K, pos: usize, entry: MemoEntry<V>) {
        let endpos = match &entry {
            MemoEntry::Parsed(_, endpos) | MemoEntry::Lr(_, endpos) => *endpos,
        };
        if endpos > self.max_parsed_point {
            self.max_parsed_point = endpos;
        }
        self.memos.insert((rule, pos), entry);
    }

    /// Recall for plain memoization; a left recursion sentinel under a key
    /// that is never wrapped in `memoized_lr` would be a bug.
    pub fn recall_plain(&self, rule: K, pos: usize) -> Option<(Option<V>, usize)> {
        match self.memos.get(&(rule, pos)) {
            Some(MemoEntry::Parsed(result, endpos)) => Some((result.clone(), *endpos)),
            Some(MemoEntry::Lr(_, _)) => {
                panic!("Bug! plain memo recall hit a left recursion sentinel")
            }
            None => None,
        }
    }

    pub fn expect_lr(&self, rule: K, pos: usize) -> (LrId, usize) {
        match self.memos.get(&(rule, pos)) {
            Some(MemoEntry::Lr(lr, endpos)) => (*lr, *endpos),
            _ => panic!("Bug! expected a left recursion sentinel for {:?}", rule),
        }
    }

    pub fn expect_parsed(&self, rule: K, pos: usize) -> (Option<V>, usize) {
        match self.memos.get(&(rule, pos)) {
            Some(MemoEntry::Parsed(result, endpos)) => (result.clone(), *endpos),
            _ => panic!("Bug! expected a settled memo entry for {:?}", rule),
        }
    }

    pub fn head_at(&self, pos: usize) -> Option<HeadId> {
        self.heads.get(&pos).copied()
    }

    pub fn register_head(&mut self, pos: usize, head: HeadId) {
        self.heads.insert(pos, head);
    }

    pub fn remove_head(&mut self, pos: usize) {
        self.heads.remove(&pos);
    }

    pub fn new_head(&mut self, rule: K) -> HeadId {
        let id = HeadId(self.head_recs.len());
        self.head_recs.push(HeadRec {
            rule,
            involved: HashSet::new(),
            eval: HashSet::new(),
        });
        id
    }

    pub fn head_rule(&self, head: HeadId) -> K {
        self.head_recs[head.0].rule
    }

    /// Whether `rule` belongs to the recursion cluster: the involved set
    /// plus the head rule itself.
    pub fn involves(&self, head: HeadId, rule: K) -> bool {
        let rec = &self.head_recs[head.0];
        rec.rule == rule || rec.involved.contains(&rule)
    }

    pub fn add_involved(&mut self, head: HeadId, rule: K) {
        self.head_recs[head.0].involved.insert(rule);
    }

    /// Remove `rule` from the evaluation set; true iff it was armed.
    pub fn take_eval(&mut self, head: HeadId, rule: K) -> bool {
        self.head_recs[head.0].eval.remove(&rule)
    }

    pub fn refill_eval(&mut self, head: HeadId) {
        let involved = self.head_recs[head.0].involved.clone();
        self.head_recs[head.0].eval = involved;
    }

    /// Create a sentinel for `rule` and push it onto the invocation stack.
    pub fn push_lr(&mut self, rule: K) -> LrId {
        let id = LrId(self.lrs.len());
        self.lrs.push(LrRec {
            rule,
            seed: None,
            head: None,
        });
        self.lr_stack.push(id);
        id
    }

    pub fn pop_lr(&mut self) {
        if self.lr_stack.pop().is_none() {
            panic!("Bug! popping an empty invocation stack");
        }
    }

    pub fn stack_top_down(&self) -> Vec<LrId> {
        self.lr_stack.iter().rev().copied().collect()
    }

    pub fn lr_rule(&self, lr: LrId) -> K {
        self.lrs[lr.0].rule
    }

    pub fn lr_head(&self, lr: LrId) -> Option<HeadId> {
        self.lrs[lr.0].head
    }

    pub fn set_lr_head(&mut self, lr: LrId, head: HeadId) {
        self.lrs[lr.0].head = Some(head);
    }

    pub fn seed(&self, lr: LrId) -> Option<V> {
        self.lrs[lr.0].seed.clone()
    }

    pub fn set_seed(&mut self, lr: LrId, seed: Option<V>) {
        self.lrs[lr.0].seed = seed;
    }
}

impl<K: Copy + Eq + Hash + Debug, V: Clone> Default for Packrat<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
