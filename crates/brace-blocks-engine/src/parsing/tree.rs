use std::sync::Arc;

use crate::text::{SnapshotSpan, Span, TextSnapshot};

use super::statement::contains_top_level_equals;

/// Index of a block in its tree's arena. The root is always index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    pub const ROOT: BlockId = BlockId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One `{ ... }` block as stored in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    /// From the opening brace up to and including the closing brace, or to
    /// the end of the document when the block is never closed.
    pub span: Span,
    /// Nesting depth: -1 for the root, 1 for top-level blocks.
    pub level: i32,
    /// First non-whitespace character of the statement that introduced the
    /// block.
    pub statement_start: usize,
    pub parent: Option<BlockId>,
    /// Directly nested blocks in document order.
    pub children: Vec<BlockId>,
}

/// The immutable result of one scan over one snapshot.
///
/// Nodes are stored in the order their opening braces appear, so arena order
/// is a pre-order walk of the tree.
#[derive(Debug)]
pub struct BlockTree {
    snapshot: TextSnapshot,
    nodes: Vec<BlockNode>,
}

impl BlockTree {
    pub(crate) fn new(snapshot: TextSnapshot, nodes: Vec<BlockNode>) -> Self {
        debug_assert!(!nodes.is_empty(), "a block tree always has a root");
        Self { snapshot, nodes }
    }

    pub fn snapshot(&self) -> &TextSnapshot {
        &self.snapshot
    }

    pub fn node(&self, id: BlockId) -> &BlockNode {
        &self.nodes[id.0]
    }

    /// Number of blocks, not counting the root.
    pub fn block_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Every node including the root, in document order.
    pub fn nodes(&self) -> impl Iterator<Item = (BlockId, &BlockNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (BlockId(i), node))
    }

    pub fn root(self: &Arc<Self>) -> BlockRef {
        self.get(BlockId::ROOT)
    }

    pub fn get(self: &Arc<Self>, id: BlockId) -> BlockRef {
        BlockRef {
            tree: Arc::clone(self),
            id,
        }
    }

    /// The deepest block whose span contains `position`, or the root.
    pub fn innermost_at(self: &Arc<Self>, position: usize) -> BlockRef {
        let mut current = BlockId::ROOT;
        loop {
            let children = &self.node(current).children;
            // Children are sorted and disjoint: only the last one starting at
            // or before `position` can contain it.
            let idx = children.partition_point(|&child| self.node(child).span.start <= position);
            match idx.checked_sub(1).map(|i| children[i]) {
                Some(child) if self.node(child).span.contains(position) => current = child,
                _ => return self.get(current),
            }
        }
    }
}

/// A shared handle to one block of a published tree: the block tag handed
/// to collaborators.
#[derive(Clone)]
pub struct BlockRef {
    tree: Arc<BlockTree>,
    id: BlockId,
}

impl std::fmt::Debug for BlockRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = self.node();
        f.debug_struct("BlockRef")
            .field("id", &self.id)
            .field("span", &node.span)
            .field("level", &node.level)
            .field("statement_start", &node.statement_start)
            .finish()
    }
}

impl PartialEq for BlockRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.id == other.id
    }
}

impl Eq for BlockRef {}

impl BlockRef {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn tree(&self) -> &Arc<BlockTree> {
        &self.tree
    }

    pub fn node(&self) -> &BlockNode {
        self.tree.node(self.id)
    }

    pub fn snapshot(&self) -> &TextSnapshot {
        self.tree.snapshot()
    }

    pub fn span(&self) -> Span {
        self.node().span
    }

    pub fn snapshot_span(&self) -> SnapshotSpan {
        SnapshotSpan::new(self.tree.snapshot().clone(), self.span())
    }

    pub fn level(&self) -> i32 {
        self.node().level
    }

    pub fn statement_start(&self) -> usize {
        self.node().statement_start
    }

    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    pub fn parent(&self) -> Option<BlockRef> {
        self.node().parent.map(|id| self.tree.get(id))
    }

    pub fn children(&self) -> impl Iterator<Item = BlockRef> + '_ {
        self.node().children.iter().map(|&id| self.tree.get(id))
    }

    /// This block and every enclosing block up to, but excluding, the root;
    /// innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = BlockRef> {
        std::iter::successors(Some(self.clone()), BlockRef::parent).take_while(|b| !b.is_root())
    }

    /// The introducing statement, from its first character up to the opening
    /// brace with trailing whitespace removed.
    pub fn statement_span(&self) -> Span {
        let node = self.node();
        if self.is_root() {
            return Span::new(0, 0);
        }
        let raw = Span::from_bounds(node.statement_start.min(node.span.start), node.span.start);
        let text = self.snapshot().slice(raw);
        Span::new(raw.start, text.trim_end().len())
    }

    pub fn statement_text(&self) -> String {
        self.snapshot().slice(self.statement_span()).into_owned()
    }

    /// The introducing statement contains an `=` outside parentheses, as in
    /// `var p = new Point {` or `x => {`.
    pub fn is_initializer(&self) -> bool {
        contains_top_level_equals(&self.statement_text())
    }
}

#[cfg(test)]
mod tests {
    use crate::cancel::CancellationToken;
    use crate::parsing::parse;
    use crate::text::{Span, TextBuffer};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn tree(text: &str) -> Arc<super::BlockTree> {
        let snapshot = TextBuffer::new(text).current_snapshot();
        Arc::new(parse(&snapshot, &CancellationToken::new()).unwrap())
    }

    #[test]
    fn innermost_at_descends_to_the_deepest_block() {
        let text = "a { b { c } d { e } }";
        let tree = tree(text);

        let c = tree.innermost_at(text.find('c').unwrap());
        assert_eq!(c.level(), 2);
        assert_eq!(c.statement_text(), "b");

        let e = tree.innermost_at(text.find('e').unwrap());
        assert_eq!(e.statement_text(), "d");

        let outside = tree.innermost_at(0);
        assert!(outside.is_root());
    }

    #[test]
    fn innermost_at_treats_the_closing_brace_as_inside() {
        let text = "x { }";
        let tree = tree(text);
        assert_eq!(tree.innermost_at(4).level(), 1);
        assert!(tree.innermost_at(5).is_root());
    }

    #[test]
    fn ancestors_stop_before_the_root() {
        let text = "ns { class C { void M() { } } }";
        let tree = tree(text);
        let inner = tree.innermost_at(text.find("{ }").unwrap());
        let chain: Vec<_> = inner.ancestors().map(|b| b.statement_text()).collect();
        assert_eq!(chain, vec!["void M()", "class C", "ns"]);
    }

    #[test]
    fn statement_span_excludes_trailing_whitespace_and_brace() {
        let text = "  if (x)\n  {\n  }";
        let tree = tree(text);
        let block = tree.root().children().next().unwrap();
        assert_eq!(block.statement_span(), Span::from_bounds(2, 8));
        assert_eq!(block.statement_text(), "if (x)");
    }

    #[test]
    fn initializer_detection_ignores_equals_in_parentheses() {
        let tree = tree("var p = new P { } if (a == b) { } Action f = () => { }");
        let flags: Vec<_> = tree.root().children().map(|b| b.is_initializer()).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn block_refs_compare_by_tree_and_id() {
        let tree = tree("a { }");
        let again = tree.root().children().next().unwrap();
        assert_eq!(tree.innermost_at(2), again);
        assert_ne!(tree.root(), again);
    }
}
