use super::{Grammar, NodeData, NodeId, NodeKind, NodeTag, Quantifier, Range, Tree};

impl Tree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Allocate a node and re-home its children: every child's back-link is
    /// set to the new node.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let children = Self::kind_children(&kind);
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { kind, parent: None });
        for child in children {
            self.nodes[child.0].parent = Some(id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn tag(&self, id: NodeId) -> NodeTag {
        match &self.nodes[id.0].kind {
            NodeKind::Grammar { .. } => NodeTag::Grammar,
            NodeKind::Rule { .. } => NodeTag::Rule,
            NodeKind::Expression { .. } => NodeTag::Expression,
            NodeKind::Alt { .. } => NodeTag::Alt,
            NodeKind::Part { .. } => NodeTag::Part,
            NodeKind::Identifier { .. } => NodeTag::Identifier,
            NodeKind::Str { .. } => NodeTag::Str,
            NodeKind::Ch { .. } => NodeTag::Ch,
            NodeKind::Class { .. } => NodeTag::Class,
            NodeKind::AnyChar => NodeTag::AnyChar,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.nodes[id.0].parent = parent;
    }

    fn kind_children(kind: &NodeKind) -> Vec<NodeId> {
        match kind {
            NodeKind::Grammar { rules, .. } => rules.clone(),
            NodeKind::Rule { expr, .. } => vec![*expr],
            NodeKind::Expression { alts } => alts.clone(),
            NodeKind::Alt { parts, .. } => parts.clone(),
            NodeKind::Part { prime, .. } => vec![*prime],
            _ => Vec::new(),
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        Self::kind_children(&self.nodes[id.0].kind)
    }

    /// Collect the subtree below `root` in post order: children before
    /// their parent.
    pub fn post_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        self.collect_post_order(root, &mut order);
        order
    }

    fn collect_post_order(&self, id: NodeId, order: &mut Vec<NodeId>) {
        for child in self.children(id) {
            self.collect_post_order(child, order);
        }
        order.push(id);
    }

    /// Whether `id` is still reachable from `root`. A spliced-out node can
    /// keep a stale back-link, so each step checks the actual child slot.
    pub fn is_attached(&self, id: NodeId, root: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => {
                    if !self.children(parent).contains(&current) {
                        return false;
                    }
                    current = parent;
                }
                None => return false,
            }
        }
    }

    /// Structural equality between two subtrees, possibly of different
    /// arenas. Back-links are ignored; sequences compare in order; classes
    /// compare as sets after sorting their ranges; characters compare by
    /// code point.
    pub fn deep_eq(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        match (self.kind(a), other.kind(b)) {
            (
                NodeKind::Grammar {
                    rules: ra,
                    metadefs: ma,
                    entry: ea,
                },
                NodeKind::Grammar {
                    rules: rb,
                    metadefs: mb,
                    entry: eb,
                },
            ) => {
                let entry_a = ea.and_then(|e| ra.iter().position(|r| *r == e));
                let entry_b = eb.and_then(|e| rb.iter().position(|r| *r == e));
                ma == mb
                    && entry_a == entry_b
                    && self.seq_eq(ra, other, rb)
            }
            (
                NodeKind::Rule {
                    name: na,
                    expr: xa,
                    entry: ea,
                    ignore: ia,
                },
                NodeKind::Rule {
                    name: nb,
                    expr: xb,
                    entry: eb,
                    ignore: ib,
                },
            ) => na == nb && ea == eb && ia == ib && self.deep_eq(*xa, other, *xb),
            (NodeKind::Expression { alts: aa }, NodeKind::Expression { alts: ab }) => {
                self.seq_eq(aa, other, ab)
            }
            (
                NodeKind::Alt {
                    parts: pa,
                    action: xa,
                },
                NodeKind::Alt {
                    parts: pb,
                    action: xb,
                },
            ) => xa == xb && self.seq_eq(pa, other, pb),
            (
                NodeKind::Part {
                    name: na,
                    pred: da,
                    prime: ra,
                    quant: qa,
                },
                NodeKind::Part {
                    name: nb,
                    pred: db,
                    prime: rb,
                    quant: qb,
                },
            ) => na == nb && da == db && qa == qb && self.deep_eq(*ra, other, *rb),
            (NodeKind::Identifier { name: na }, NodeKind::Identifier { name: nb }) => na == nb,
            (NodeKind::Str { chars: ca }, NodeKind::Str { chars: cb }) => ca == cb,
            (NodeKind::Ch { value: va }, NodeKind::Ch { value: vb }) => va == vb,
            (NodeKind::Class { ranges: ra }, NodeKind::Class { ranges: rb }) => {
                let mut sa = ra.clone();
                let mut sb = rb.clone();
                sa.sort();
                sb.sort();
                sa == sb
            }
            (NodeKind::AnyChar, NodeKind::AnyChar) => true,
            _ => false,
        }
    }

    fn seq_eq(&self, a: &[NodeId], other: &Tree, b: &[NodeId]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b.iter())
                .all(|(x, y)| self.deep_eq(*x, other, *y))
    }

    /// Deep copy of a subtree into fresh arena nodes. The copy is detached:
    /// its root has no parent.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let kind = match self.kind(id).clone() {
            NodeKind::Grammar {
                rules,
                metadefs,
                entry,
            } => {
                let copies: Vec<NodeId> =
                    rules.iter().map(|r| self.clone_subtree(*r)).collect();
                let entry = entry
                    .and_then(|e| rules.iter().position(|r| *r == e))
                    .map(|i| copies[i]);
                NodeKind::Grammar {
                    rules: copies,
                    metadefs,
                    entry,
                }
            }
            NodeKind::Rule {
                name,
                expr,
                entry,
                ignore,
            } => NodeKind::Rule {
                name,
                expr: self.clone_subtree(expr),
                entry,
                ignore,
            },
            NodeKind::Expression { alts } => NodeKind::Expression {
                alts: alts.iter().map(|a| self.clone_subtree(*a)).collect(),
            },
            NodeKind::Alt { parts, action } => NodeKind::Alt {
                parts: parts.iter().map(|p| self.clone_subtree(*p)).collect(),
                action,
            },
            NodeKind::Part {
                name,
                pred,
                prime,
                quant,
            } => NodeKind::Part {
                name,
                pred,
                prime: self.clone_subtree(prime),
                quant,
            },
            leaf => leaf,
        };
        self.alloc(kind)
    }

    /// Replace the primary of a part, re-homing the new primary.
    pub fn set_prime(&mut self, part: NodeId, prime: NodeId) {
        match self.kind_mut(part) {
            NodeKind::Part { prime: slot, .. } => *slot = prime,
            _ => panic!("Bug! set_prime on a non-part node"),
        }
        self.set_parent(prime, Some(part));
    }

    pub fn set_quant(&mut self, part: NodeId, quant: Option<Quantifier>) {
        match self.kind_mut(part) {
            NodeKind::Part { quant: slot, .. } => *slot = quant,
            _ => panic!("Bug! set_quant on a non-part node"),
        }
    }

    pub fn set_metaname(&mut self, part: NodeId, name: Option<String>) {
        match self.kind_mut(part) {
            NodeKind::Part { name: slot, .. } => *slot = name,
            _ => panic!("Bug! set_metaname on a non-part node"),
        }
    }

    /// Replace the alternatives of an expression, re-homing each new
    /// alternative.
    pub fn replace_alts(&mut self, expr: NodeId, alts: Vec<NodeId>) {
        for alt in &alts {
            self.set_parent(*alt, Some(expr));
        }
        match self.kind_mut(expr) {
            NodeKind::Expression { alts: slot } => *slot = alts,
            _ => panic!("Bug! replace_alts on a non-expression node"),
        }
    }

    /// Detach and return the alternatives of an expression.
    pub fn take_alts(&mut self, expr: NodeId) -> Vec<NodeId> {
        match self.kind_mut(expr) {
            NodeKind::Expression { alts } => std::mem::take(alts),
            _ => panic!("Bug! take_alts on a non-expression node"),
        }
    }

    pub fn rule_name(&self, rule: NodeId) -> &str {
        match self.kind(rule) {
            NodeKind::Rule { name, .. } => name,
            _ => panic!("Bug! rule_name on a non-rule node"),
        }
    }

    pub fn rule_expr(&self, rule: NodeId) -> NodeId {
        match self.kind(rule) {
            NodeKind::Rule { expr, .. } => *expr,
            _ => panic!("Bug! rule_expr on a non-rule node"),
        }
    }

    /// Walk parent links up to the enclosing rule node.
    pub fn enclosing_rule(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if let NodeKind::Rule { .. } = self.kind(current) {
                return Some(current);
            }
            current = self.parent(current)?;
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Range {
    pub fn new(beg: char, end: Option<char>) -> Self {
        Self { beg, end }
    }
}

impl PartialOrd for Range {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Range {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.beg, self.end).cmp(&(other.beg, other.end))
    }
}

impl Grammar {
    pub fn new(tree: Tree, root: NodeId) -> Self {
        Self { tree, root }
    }

    pub fn rules(&self) -> Vec<NodeId> {
        match self.tree.kind(self.root) {
            NodeKind::Grammar { rules, .. } => rules.clone(),
            _ => panic!("Bug! grammar root is not a grammar node"),
        }
    }

    pub fn entry(&self) -> Option<NodeId> {
        match self.tree.kind(self.root) {
            NodeKind::Grammar { entry, .. } => *entry,
            _ => panic!("Bug! grammar root is not a grammar node"),
        }
    }

    pub fn set_entry(&mut self, rule: NodeId) {
        match self.tree.kind_mut(self.root) {
            NodeKind::Grammar { entry, .. } => *entry = Some(rule),
            _ => panic!("Bug! grammar root is not a grammar node"),
        }
    }

    /// Find the first rule bound to `name`.
    pub fn rule_named(&self, name: &str) -> Option<NodeId> {
        self.rules()
            .into_iter()
            .find(|r| self.tree.rule_name(*r) == name)
    }

    /// Append a rule node, re-homing it under the grammar root. Duplicated
    /// identifiers are allowed here and reported by the semantic checks.
    pub fn add_rule(&mut self, rule: NodeId) {
        let root = self.root;
        self.tree.set_parent(rule, Some(root));
        match self.tree.kind_mut(root) {
            NodeKind::Grammar { rules, .. } => rules.push(rule),
            _ => panic!("Bug! grammar root is not a grammar node"),
        }
    }

    /// Look up the body of a named action definition.
    pub fn metadef(&self, name: &str) -> Option<&str> {
        match self.tree.kind(self.root) {
            NodeKind::Grammar { metadefs, .. } => metadefs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, body)| body.as_str()),
            _ => panic!("Bug! grammar root is not a grammar node"),
        }
    }
}
