use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use xi_rope::delta::DeltaElement;
use xi_rope::{Delta, RopeInfo};

/// Identity of a text buffer. Every version and snapshot carries the id of
/// the buffer that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        BufferId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which way a point sitting exactly on an edit boundary moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// The point ends up after the inserted text.
    Positive,
    /// The point stays before the inserted text.
    Negative,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("versions belong to different buffers ({from:?} and {to:?})")]
    UnrelatedVersions { from: BufferId, to: BufferId },

    #[error("version {0} has no link to a later version")]
    BrokenChain(u64),

    #[error("position {position} is past the end of version {version} (length {length})")]
    OutOfRange {
        position: usize,
        version: u64,
        length: usize,
    },
}

/// One replaced range in a single version step.
///
/// `old_*` is measured in the earlier version, `new_*` in the later one.
/// Insertions have `old_length == 0`, deletions `new_length == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEdit {
    pub old_position: usize,
    pub old_length: usize,
    pub new_position: usize,
    pub new_length: usize,
}

impl TextEdit {
    pub fn old_end(&self) -> usize {
        self.old_position + self.old_length
    }

    pub fn new_end(&self) -> usize {
        self.new_position + self.new_length
    }

    /// The same edit seen from the later version looking back.
    pub fn inverted(&self) -> TextEdit {
        TextEdit {
            old_position: self.new_position,
            old_length: self.new_length,
            new_position: self.old_position,
            new_length: self.old_length,
        }
    }

    /// Collapses an xi-rope delta into the replaced ranges it describes.
    ///
    /// Key concepts:
    /// - Gaps between `Copy` elements are deletions in the old document
    /// - `Insert` elements are new text at the current old position
    /// - An insertion directly followed by a gap is one replacement
    pub fn from_delta(delta: &Delta<RopeInfo>) -> Vec<TextEdit> {
        let mut edits = Vec::new();
        let mut old_pos = 0;
        let mut new_pos = 0;
        let mut inserted = 0;

        for el in &delta.els {
            match el {
                DeltaElement::Copy(from, to) => {
                    if *from > old_pos || inserted > 0 {
                        edits.push(TextEdit {
                            old_position: old_pos,
                            old_length: from - old_pos,
                            new_position: new_pos,
                            new_length: inserted,
                        });
                        new_pos += inserted;
                        inserted = 0;
                    }
                    new_pos += to - from;
                    old_pos = *to;
                }
                DeltaElement::Insert(node) => inserted += node.len(),
            }
        }

        if delta.base_len > old_pos || inserted > 0 {
            edits.push(TextEdit {
                old_position: old_pos,
                old_length: delta.base_len - old_pos,
                new_position: new_pos,
                new_length: inserted,
            });
        }

        edits
    }
}

struct VersionLink {
    edits: Vec<TextEdit>,
    next: Arc<TextVersion>,
}

/// One point in a buffer's version chain.
///
/// Versions link forward only: an old version keeps every later version
/// alive, a new version never pins old ones.
pub struct TextVersion {
    buffer: BufferId,
    number: u64,
    length: usize,
    next: OnceLock<VersionLink>,
}

impl std::fmt::Debug for TextVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextVersion")
            .field("buffer", &self.buffer)
            .field("number", &self.number)
            .field("length", &self.length)
            .field("linked", &self.next.get().is_some())
            .finish()
    }
}

impl TextVersion {
    pub(crate) fn initial(buffer: BufferId, length: usize) -> Arc<Self> {
        Arc::new(Self {
            buffer,
            number: 0,
            length,
            next: OnceLock::new(),
        })
    }

    /// Appends the version reached by applying `edits` to this one.
    pub(crate) fn create_next(&self, edits: Vec<TextEdit>, length: usize) -> Arc<TextVersion> {
        let next = Arc::new(TextVersion {
            buffer: self.buffer,
            number: self.number + 1,
            length,
            next: OnceLock::new(),
        });
        let link = VersionLink {
            edits,
            next: Arc::clone(&next),
        };
        if self.next.set(link).is_err() {
            tracing::error!(
                version = self.number,
                "version already linked; the new branch is detached from the chain"
            );
        }
        next
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// The later version, once one exists.
    pub fn next(&self) -> Option<&Arc<TextVersion>> {
        self.next.get().map(|link| &link.next)
    }

    /// The edits that turn this version into [`TextVersion::next`].
    pub fn edits(&self) -> Option<&[TextEdit]> {
        self.next.get().map(|link| link.edits.as_slice())
    }

    pub fn same_as(&self, other: &TextVersion) -> bool {
        self.buffer == other.buffer && self.number == other.number
    }

    /// Edit lists of every step from `self` up to the later version `to`.
    fn steps_until<'a>(&'a self, to: &TextVersion) -> Result<Vec<&'a [TextEdit]>, MapError> {
        let mut steps = Vec::new();
        let mut version = self;
        while version.number < to.number {
            let link = version
                .next
                .get()
                .ok_or(MapError::BrokenChain(version.number))?;
            steps.push(link.edits.as_slice());
            version = &link.next;
        }
        Ok(steps)
    }

    /// Maps `position` in this version to the equivalent position in `to`,
    /// folding over every version step in between. `to` may be older or
    /// newer than `self`.
    pub fn map_position(
        &self,
        position: usize,
        to: &TextVersion,
        mode: TrackingMode,
    ) -> Result<usize, MapError> {
        if self.buffer != to.buffer {
            return Err(MapError::UnrelatedVersions {
                from: self.buffer,
                to: to.buffer,
            });
        }
        if position > self.length {
            return Err(MapError::OutOfRange {
                position,
                version: self.number,
                length: self.length,
            });
        }

        if self.number <= to.number {
            let steps = self.steps_until(to)?;
            Ok(steps.into_iter().fold(position, |pos, edits| {
                map_through(edits.iter().copied(), pos, mode)
            }))
        } else {
            let steps = to.steps_until(self)?;
            Ok(steps.into_iter().rev().fold(position, |pos, edits| {
                map_through(edits.iter().map(TextEdit::inverted), pos, mode)
            }))
        }
    }
}

impl Drop for TextVersion {
    // Unlink iteratively so a long edit history does not recurse once per version.
    fn drop(&mut self) {
        let mut next = self.next.take().map(|link| link.next);
        while let Some(version) = next {
            match Arc::try_unwrap(version) {
                Ok(mut version) => next = version.next.take().map(|link| link.next),
                Err(_) => break,
            }
        }
    }
}

/// Maps a position across one step. `edits` must be sorted and
/// non-overlapping.
fn map_through(edits: impl Iterator<Item = TextEdit>, position: usize, mode: TrackingMode) -> usize {
    let mut last: Option<TextEdit> = None;
    for edit in edits {
        if position < edit.old_position {
            return edit.new_position - (edit.old_position - position);
        }

        let old_end = edit.old_end();
        let inside = position < old_end || (edit.old_length == 0 && position == old_end);
        if inside {
            return match mode {
                TrackingMode::Positive => edit.new_end(),
                TrackingMode::Negative => edit.new_position,
            };
        }
        last = Some(edit);
    }

    match last {
        Some(edit) => position - edit.old_end() + edit.new_end(),
        None => position,
    }
}

/// Maps `position` from version `from` into version `to` of the same buffer.
pub fn map_position(
    position: usize,
    from: &TextVersion,
    to: &TextVersion,
    mode: TrackingMode,
) -> Result<usize, MapError> {
    from.map_position(position, to, mode)
}

/// True when at least one step between `from` and the later version `to`
/// changed text. Steps with an empty edit list (no-op transactions) do not
/// count. Versions from different buffers always count as changed.
pub fn any_text_changes(from: &TextVersion, to: &TextVersion) -> bool {
    if from.buffer != to.buffer {
        return true;
    }

    let mut version = from;
    while version.number < to.number {
        let Some(link) = version.next.get() else {
            return true;
        };
        if !link.edits.is_empty() {
            return true;
        }
        version = &link.next;
    }
    false
}
