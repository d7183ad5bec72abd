use crate::cancel::CancellationToken;
use crate::text::{Span, TextSnapshot};

use super::scanner::{ScannedChar, StatementScanner};
use super::tree::{BlockId, BlockNode, BlockTree};

/// Builds a [`BlockTree`] from the scanner's character stream.
///
/// Every unquoted `{` opens a child of the innermost open block and every
/// unquoted `}` closes the innermost open block. Unmatched `}` are ignored;
/// blocks still open at the end are closed at the end of the document.
pub struct BlockTreeBuilder {
    nodes: Vec<BlockNode>,
    open: Vec<BlockId>,
    leading_whitespace: bool,
    statement_start: usize,
}

impl BlockTreeBuilder {
    pub fn new() -> Self {
        let root = BlockNode {
            span: Span::new(0, 0),
            level: -1,
            statement_start: 0,
            parent: None,
            children: vec![],
        };
        Self {
            nodes: vec![root],
            open: vec![],
            leading_whitespace: true,
            statement_start: 0,
        }
    }

    fn innermost(&self) -> BlockId {
        self.open.last().copied().unwrap_or(BlockId::ROOT)
    }

    pub fn push(&mut self, c: &ScannedChar) {
        if self.leading_whitespace {
            self.leading_whitespace = c.ch.is_whitespace();
            self.statement_start = c.position;
        }

        if !c.in_literal {
            match c.ch {
                '{' => self.open_block(c.position),
                '}' => self.close_block(c.position),
                _ => {}
            }
        }

        if c.end_of_statement {
            self.leading_whitespace = true;
        }
    }

    fn open_block(&mut self, position: usize) {
        let parent = self.innermost();
        let id = BlockId(self.nodes.len());
        self.nodes.push(BlockNode {
            // Provisional until the matching `}` is seen.
            span: Span::new(position, 0),
            level: self.open.len() as i32 + 1,
            statement_start: self.statement_start,
            parent: Some(parent),
            children: vec![],
        });
        self.nodes[parent.0].children.push(id);
        self.open.push(id);
    }

    fn close_block(&mut self, position: usize) {
        if let Some(id) = self.open.pop() {
            self.nodes[id.0].span.end = position + 1;
        }
    }

    pub fn finish(mut self, snapshot: TextSnapshot) -> BlockTree {
        let len = snapshot.len();
        // EOF flush: unbalanced `{` run to the end of the document.
        for id in self.open.drain(..) {
            self.nodes[id.0].span.end = len;
        }
        self.nodes[BlockId::ROOT.0].span = Span::new(0, len);
        BlockTree::new(snapshot, self.nodes)
    }
}

impl Default for BlockTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scans `snapshot` and builds its block tree.
///
/// Returns `None` as soon as `token` is cancelled; a partial tree is never
/// returned.
pub fn parse(snapshot: &TextSnapshot, token: &CancellationToken) -> Option<BlockTree> {
    let text = snapshot.text();
    let mut builder = BlockTreeBuilder::new();

    for c in StatementScanner::new(&text) {
        builder.push(&c);
        if token.is_cancelled() {
            return None;
        }
    }

    if token.is_cancelled() {
        return None;
    }
    Some(builder.finish(snapshot.clone()))
}
