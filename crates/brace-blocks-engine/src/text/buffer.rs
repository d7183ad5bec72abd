use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;
use xi_rope::delta::Builder;
use xi_rope::{Delta, Rope, RopeInfo};

use super::snapshot::TextSnapshot;
use super::span::Span;
use super::version::{BufferId, TextEdit, TextVersion};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("edit {span:?} lies outside the document (length {len})")]
    OutOfBounds { span: Span, len: usize },

    #[error("edit {span:?} does not start and end on character boundaries")]
    NotCharBoundary { span: Span },

    #[error("edits {first:?} and {second:?} overlap")]
    Overlapping { first: Span, second: Span },

    #[error("delta expects a document of length {expected}, buffer has {actual}")]
    BaseLengthMismatch { expected: usize, actual: usize },
}

/// A change notification: the snapshot before and after one version step.
#[derive(Debug, Clone)]
pub struct TextChange {
    pub before: TextSnapshot,
    pub after: TextSnapshot,
}

impl TextChange {
    /// The edits of this step (empty for a no-op transaction).
    pub fn edits(&self) -> &[TextEdit] {
        self.before.version().edits().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A live subscription to a buffer's change notifications.
///
/// Notifications queue on the channel until the owner drains them.
#[derive(Debug)]
pub struct ChangeSubscription {
    id: SubscriptionId,
    receiver: Receiver<TextChange>,
}

impl ChangeSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn receiver(&self) -> &Receiver<TextChange> {
        &self.receiver
    }

    /// Drains every queued notification without blocking.
    pub fn pending(&self) -> Vec<TextChange> {
        self.receiver.try_iter().collect()
    }
}

struct BufferState {
    current: TextSnapshot,
    listeners: Vec<(SubscriptionId, Sender<TextChange>)>,
    next_subscription: u64,
}

/// The mutable document: a handle to the current snapshot plus the change
/// feed. Clones share the same document.
///
/// Every edit produces a new immutable [`TextSnapshot`] linked to the
/// previous one through the version chain.
#[derive(Clone)]
pub struct TextBuffer {
    id: BufferId,
    state: Arc<Mutex<BufferState>>,
}

impl std::fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBuffer").field("id", &self.id).finish()
    }
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        let id = BufferId::next();
        let rope = Rope::from(text);
        let version = TextVersion::initial(id, rope.len());
        Self {
            id,
            state: Arc::new(Mutex::new(BufferState {
                current: TextSnapshot::new(rope, version),
                listeners: Vec::new(),
                next_subscription: 0,
            })),
        }
    }

    /// Create a buffer from raw bytes, which must be valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::new(text))
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn current_snapshot(&self) -> TextSnapshot {
        self.state.lock().current.clone()
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut state = self.state.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.listeners.push((id, sender));
        ChangeSubscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.state.lock().listeners.retain(|(sid, _)| *sid != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().listeners.len()
    }

    pub fn insert(&self, at: usize, text: &str) -> Result<TextSnapshot, EditError> {
        self.edit([(Span::new(at, 0), text)])
    }

    pub fn delete(&self, span: Span) -> Result<TextSnapshot, EditError> {
        self.edit([(span, "")])
    }

    pub fn replace(&self, span: Span, text: &str) -> Result<TextSnapshot, EditError> {
        self.edit([(span, text)])
    }

    /// Applies several replacements, all measured against the current
    /// snapshot, as one version step.
    pub fn edit<'a>(
        &self,
        edits: impl IntoIterator<Item = (Span, &'a str)>,
    ) -> Result<TextSnapshot, EditError> {
        let mut edits: Vec<(Span, &str)> = edits.into_iter().collect();
        edits.sort_by_key(|(span, _)| (span.start, span.end));

        let mut state = self.state.lock();
        let current = &state.current;
        let len = current.len();

        for (span, _) in &edits {
            if span.start > span.end || span.end > len {
                return Err(EditError::OutOfBounds { span: *span, len });
            }
            if !current.is_char_boundary(span.start) || !current.is_char_boundary(span.end) {
                return Err(EditError::NotCharBoundary { span: *span });
            }
        }
        for pair in edits.windows(2) {
            let (first, second) = (pair[0].0, pair[1].0);
            if first.end > second.start {
                return Err(EditError::Overlapping { first, second });
            }
        }

        let mut builder = Builder::new(len);
        for (span, text) in edits {
            builder.replace(span.start..span.end, Rope::from(text));
        }
        let delta = builder.build();

        Ok(Self::commit(&mut state, &delta))
    }

    /// Applies an arbitrary xi-rope delta built against the current snapshot.
    pub fn apply_delta(&self, delta: &Delta<RopeInfo>) -> Result<TextSnapshot, EditError> {
        let mut state = self.state.lock();
        let actual = state.current.len();
        if delta.base_len != actual {
            return Err(EditError::BaseLengthMismatch {
                expected: delta.base_len,
                actual,
            });
        }
        Ok(Self::commit(&mut state, delta))
    }

    /// Advances the version without changing any text.
    pub fn touch(&self) -> TextSnapshot {
        let mut state = self.state.lock();
        let before = state.current.clone();
        let version = before.version().create_next(Vec::new(), before.len());
        let after = TextSnapshot::new(before.rope().clone(), version);
        Self::publish(&mut state, before, after)
    }

    fn commit(state: &mut BufferState, delta: &Delta<RopeInfo>) -> TextSnapshot {
        let before = state.current.clone();
        let rope = delta.apply(before.rope());
        let edits = TextEdit::from_delta(delta);
        let version = before.version().create_next(edits, rope.len());
        let after = TextSnapshot::new(rope, version);
        Self::publish(state, before, after)
    }

    fn publish(state: &mut BufferState, before: TextSnapshot, after: TextSnapshot) -> TextSnapshot {
        tracing::trace!(
            buffer = ?after.buffer_id(),
            version = after.version().number(),
            edits = before.version().edits().map_or(0, <[TextEdit]>::len),
            "buffer changed"
        );

        state.current = after.clone();
        let change = TextChange {
            before,
            after: after.clone(),
        };
        // Listeners whose receiver is gone are dropped here.
        state
            .listeners
            .retain(|(_, sender)| sender.send(change.clone()).is_ok());
        after
    }
}
