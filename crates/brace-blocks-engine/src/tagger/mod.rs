//! # Incremental Tagging
//!
//! Keeps a published [`BlockTree`](crate::parsing::BlockTree) per buffer and
//! answers span queries against it.
//!
//! ## Lifecycle
//!
//! A [`BlockTagger`] is dormant until attached. The first attach subscribes
//! to the buffer and scans the current snapshot; every text-changing edit
//! cancels the running scan and starts a new one; the last detach
//! unsubscribes and drops the tree.
//!
//! Scans run on their own threads and hand finished trees back over a
//! channel. Only the owner publishes, in
//! [`BlockTagger::process_events`] or [`BlockTagger::wait_for_scan`], and
//! only the result of the newest scan.

mod block_tagger;
mod registry;
mod scan;

pub use block_tagger::{BlockTagger, TagSpan, TaggerError, TagsChanged};
pub use registry::{TaggerHandle, TaggerRegistry};
