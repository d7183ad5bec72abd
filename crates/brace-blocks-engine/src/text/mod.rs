//! # Text Model
//!
//! Immutable snapshots over an `xi_rope::Rope`, linked by a forward version
//! chain, plus the mutable [`TextBuffer`] that produces them.
//!
//! ## Modules
//!
//! - **`span`**: `Span` byte ranges and `SnapshotSpan` translation
//! - **`version`**: `TextVersion` chain, `TextEdit` steps and position mapping
//! - **`snapshot`**: `TextSnapshot` with character and line lookup
//! - **`buffer`**: `TextBuffer` edits and change subscriptions
//!
//! ## Key Invariants
//!
//! - Snapshots are never mutated; every edit creates a new version
//! - Positions are byte offsets on UTF-8 character boundaries
//! - Mapping only succeeds between versions of the same buffer

pub mod buffer;
pub mod slice;
pub mod snapshot;
pub mod span;
pub mod version;

pub use buffer::{ChangeSubscription, EditError, SubscriptionId, TextBuffer, TextChange};
pub use slice::preview;
pub use snapshot::{TextLine, TextSnapshot};
pub use span::{SnapshotSpan, Span, SpanTrackingMode};
pub use version::{
    BufferId, MapError, TextEdit, TextVersion, TrackingMode, any_text_changes, map_position,
};
