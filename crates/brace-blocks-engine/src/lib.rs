//! Incremental brace-block tagging.
//!
//! Text flows through [`parsing`] (scanner, then tree builder) into a
//! [`tagger::BlockTagger`] that keeps the latest tree per buffer, and
//! [`context`] turns a block into a breadcrumb of its enclosing statements.

pub mod cancel;
pub mod context;
pub mod parsing;
pub mod tagger;
pub mod text;

pub use cancel::CancellationToken;
pub use context::{BlockContext, BlockContextSource, ContextTask, create_context};
pub use parsing::{BlockId, BlockRef, BlockTree, parse};
pub use tagger::{BlockTagger, TagSpan, TaggerError, TaggerHandle, TaggerRegistry, TagsChanged};
pub use text::{SnapshotSpan, Span, TextBuffer, TextSnapshot};
