use std::fmt::Write;

use crate::text::preview;

use super::tree::{BlockRef, BlockTree};

/// Renders every block as one line of an indented outline:
///
/// ```text
/// 1 [10..95) namespace Demo
///   2 [30..93) class Widget
/// ```
///
/// Statement previews are truncated to `width` characters. Blocks whose
/// statement is an initializer are marked with `=`.
pub fn render(tree: &std::sync::Arc<BlockTree>, width: usize) -> String {
    let mut out = String::new();
    for child in tree.root().children() {
        render_block(&mut out, &child, width);
    }
    // No trailing newline: keeps inline snapshots tidy.
    out.truncate(out.trim_end().len());
    out
}

fn render_block(out: &mut String, block: &BlockRef, width: usize) {
    let span = block.span();
    let indent = "  ".repeat((block.level() - 1).max(0) as usize);
    let marker = if block.is_initializer() { " =" } else { "" };
    let statement = preview(block.snapshot(), block.statement_span(), width);
    let _ = writeln!(
        out,
        "{indent}{} [{}..{}){marker} {statement}",
        block.level(),
        span.start,
        span.end
    );
    for child in block.children() {
        render_block(out, &child, width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::parsing::parse;
    use crate::text::TextBuffer;
    use std::sync::Arc;

    fn outline(text: &str, width: usize) -> String {
        let snapshot = TextBuffer::new(text).current_snapshot();
        let tree = Arc::new(parse(&snapshot, &CancellationToken::new()).unwrap());
        render(&tree, width)
    }

    #[test]
    fn outline_nests_by_level() {
        insta::assert_snapshot!(outline("ns { class C { int[] a = new int[] { 1 }; } }", 40), @r"
        1 [3..45) ns
          2 [13..43) class C
            3 [35..40) = int[] a = new int[]
        ");
    }

    #[test]
    fn outline_truncates_long_statements() {
        insta::assert_snapshot!(outline("public static void Main(string[] args) { }", 12), @"1 [39..42) public stati...");
    }

    #[test]
    fn empty_outline_for_text_without_blocks() {
        assert_eq!(outline("int x = 1;", 10), "");
    }
}
