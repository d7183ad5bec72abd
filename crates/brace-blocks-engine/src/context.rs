//! Breadcrumb text for a block: the declaring line of every enclosing block,
//! outermost first.

use std::thread::{self, JoinHandle};

use crate::cancel::CancellationToken;
use crate::parsing::BlockRef;
use crate::text::{TextBuffer, TextLine, TextSnapshot};

/// The computed context of one block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockContext {
    pub tag: BlockRef,
    pub content: String,
}

/// Builds the breadcrumb for `tag` from the snapshot its tree was built from.
///
/// Each entry after the first goes on a new line indented by its 1-based
/// position in the chain. The root has an empty breadcrumb.
pub fn create_context(tag: &BlockRef) -> String {
    let mut chain: Vec<BlockRef> = tag.ancestors().collect();
    chain.reverse();

    let snapshot = tag.snapshot();
    let mut content = String::new();
    for (indent, block) in chain.iter().enumerate() {
        if indent > 0 {
            content.push('\n');
            content.extend(std::iter::repeat_n(' ', indent));
        }
        content.push_str(&declaring_line(snapshot, block));
    }
    content
}

/// The line holding the start of `block`'s statement, or the line above it
/// when that line opens with a brace, as for a bare `{` after a `;`.
///
/// A header split over several lines shows its first line, not the line
/// just before the brace.
fn declaring_line(snapshot: &TextSnapshot, block: &BlockRef) -> String {
    let line = snapshot.line_from_position(block.statement_start());
    if starts_with_brace(&line) && line.number > 0 {
        if let Some(previous) = snapshot.line_from_line_number(line.number - 1) {
            return previous.text;
        }
    }
    line.text
}

fn starts_with_brace(line: &TextLine) -> bool {
    line.text.trim_start().starts_with('{')
}

/// Computes block contexts for one buffer off the calling thread.
#[derive(Debug, Clone)]
pub struct BlockContextSource {
    buffer: TextBuffer,
}

impl BlockContextSource {
    pub fn new(buffer: TextBuffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Starts computing the context of `tag` for a view showing
    /// `view_buffer`. The result is discarded if the view shows another
    /// buffer or `token` is cancelled.
    pub fn get_block_context(
        &self,
        tag: BlockRef,
        view_buffer: &TextBuffer,
        token: CancellationToken,
    ) -> ContextTask {
        let same_buffer = view_buffer.id() == self.buffer.id();
        let spawned = thread::Builder::new()
            .name("brace-context".into())
            .spawn(move || {
                if !same_buffer || token.is_cancelled() {
                    tracing::trace!("context request is stale");
                    return None;
                }
                let content = create_context(&tag);
                if token.is_cancelled() {
                    return None;
                }
                Some(BlockContext { tag, content })
            });

        match spawned {
            Ok(handle) => ContextTask {
                handle: Some(handle),
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to start context thread");
                ContextTask { handle: None }
            }
        }
    }
}

/// A context computation in flight.
#[derive(Debug)]
pub struct ContextTask {
    handle: Option<JoinHandle<Option<BlockContext>>>,
}

impl ContextTask {
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the result. `None` when the request went stale.
    pub fn join(self) -> Option<BlockContext> {
        let handle = self.handle?;
        match handle.join() {
            Ok(context) => context,
            Err(_) => {
                tracing::error!("context thread panicked");
                None
            }
        }
    }
}
