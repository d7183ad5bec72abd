use super::tree::{BlockId, BlockTree};

/// Asserts the structural invariants of a finished tree.
///
/// Panics with a description of the first violation. Meant for tests.
pub fn check(tree: &BlockTree) {
    let n = tree.snapshot().len();
    let root = tree.node(BlockId::ROOT);
    assert_eq!(root.level, -1, "root level must be -1");
    assert!(root.parent.is_none(), "root must not have a parent");
    assert_eq!((root.span.start, root.span.end), (0, n), "root must cover the document");

    for (id, b) in tree.nodes().skip(1) {
        assert!(
            b.span.start <= b.span.end && b.span.end <= n,
            "block span out of bounds: {:?} (document len: {})",
            b.span,
            n
        );
        assert!(
            b.statement_start <= b.span.start,
            "statement starts after its block: {} > {:?}",
            b.statement_start,
            b.span
        );

        let parent_id = b.parent.expect("non-root block without parent");
        let parent = tree.node(parent_id);
        assert!(
            parent.children.contains(&id),
            "block {id:?} missing from its parent's children"
        );
        assert!(
            parent_id == BlockId::ROOT || parent.span.contains_span(b.span),
            "block span not contained in parent span: block {:?}, parent {:?}",
            b.span,
            parent.span
        );
        assert_eq!(
            b.level,
            parent.level.max(0) + 1,
            "block {id:?} level does not follow its parent"
        );

        for pair in b.children.windows(2) {
            let (first, second) = (tree.node(pair[0]).span, tree.node(pair[1]).span);
            assert!(
                first.end <= second.start,
                "sibling spans overlap or are out of order: {first:?}, {second:?}"
            );
        }
    }
}
