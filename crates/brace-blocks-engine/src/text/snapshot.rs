use std::borrow::Cow;
use std::cmp::Ordering;
use std::sync::Arc;

use xi_rope::Rope;

use super::span::Span;
use super::version::{BufferId, TextVersion};

/// An immutable view of a buffer's full text at one version.
///
/// Cloning is cheap: the rope and the version are both shared.
#[derive(Clone)]
pub struct TextSnapshot {
    rope: Rope,
    version: Arc<TextVersion>,
}

impl std::fmt::Debug for TextSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSnapshot")
            .field("buffer", &self.version.buffer())
            .field("version", &self.version.number())
            .field("len", &self.rope.len())
            .finish()
    }
}

/// A single line of a snapshot with its byte extents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    /// Zero-based line number.
    pub number: usize,
    /// The line without its line break.
    pub extent: Span,
    /// The line including its line break, if any.
    pub extent_including_line_break: Span,
    pub text: String,
}

impl TextLine {
    pub fn start(&self) -> usize {
        self.extent.start
    }

    pub fn end(&self) -> usize {
        self.extent.end
    }

    pub fn end_including_line_break(&self) -> usize {
        self.extent_including_line_break.end
    }
}

impl TextSnapshot {
    pub(crate) fn new(rope: Rope, version: Arc<TextVersion>) -> Self {
        debug_assert_eq!(rope.len(), version.length());
        Self { rope, version }
    }

    pub fn version(&self) -> &Arc<TextVersion> {
        &self.version
    }

    pub fn buffer_id(&self) -> BufferId {
        self.version.buffer()
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    pub fn len(&self) -> usize {
        self.rope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The character starting at byte offset `position`. `None` past the end
    /// or inside a multi-byte character.
    pub fn char_at(&self, position: usize) -> Option<char> {
        if position >= self.len() || !self.is_char_boundary(position) {
            return None;
        }
        self.rope
            .iter_chunks(position..self.len())
            .next()
            .and_then(|chunk| chunk.chars().next())
    }

    /// Slices the snapshot, clamping the span to the document bounds. Ends
    /// inside a multi-byte character are moved back to its first byte.
    pub fn slice(&self, span: Span) -> Cow<'_, str> {
        let start = self.floor_char_boundary(span.start);
        let end = self.floor_char_boundary(span.end).max(start);
        self.rope.slice_to_cow(start..end)
    }

    /// True when `position` does not split a UTF-8 sequence.
    pub fn is_char_boundary(&self, position: usize) -> bool {
        match position.cmp(&self.len()) {
            Ordering::Greater => false,
            Ordering::Equal => true,
            Ordering::Less => position == 0 || self.rope.is_codepoint_boundary(position),
        }
    }

    /// The largest char boundary at or before `position`, clamped to the
    /// document length.
    pub fn floor_char_boundary(&self, position: usize) -> usize {
        let position = position.min(self.len());
        if self.is_char_boundary(position) {
            return position;
        }
        self.rope.prev_codepoint_offset(position).unwrap_or(0)
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn line_count(&self) -> usize {
        self.rope.line_of_offset(self.len()) + 1
    }

    pub fn line_number_from_position(&self, position: usize) -> usize {
        self.rope.line_of_offset(self.floor_char_boundary(position))
    }

    pub fn line_from_line_number(&self, number: usize) -> Option<TextLine> {
        let count = self.line_count();
        if number >= count {
            return None;
        }

        let start = self.rope.offset_of_line(number);
        let end_including_line_break = if number + 1 < count {
            self.rope.offset_of_line(number + 1)
        } else {
            self.len()
        };

        let raw = self.rope.slice_to_cow(start..end_including_line_break);
        let text = raw
            .strip_suffix('\n')
            .map(|s| s.strip_suffix('\r').unwrap_or(s))
            .unwrap_or(&*raw)
            .to_string();

        Some(TextLine {
            number,
            extent: Span::new(start, text.len()),
            extent_including_line_break: Span::from_bounds(start, end_including_line_break),
            text,
        })
    }

    pub fn line_from_position(&self, position: usize) -> TextLine {
        let number = self.line_number_from_position(position);
        self.line_from_line_number(number)
            .unwrap_or_else(|| TextLine {
                number,
                extent: Span::new(self.len(), 0),
                extent_including_line_break: Span::new(self.len(), 0),
                text: String::new(),
            })
    }

    /// Iterates over every line with its byte extents.
    ///
    /// Uses `lines_raw` to preserve newline characters, which keeps the
    /// extents exact.
    pub fn lines(&self) -> impl Iterator<Item = TextLine> + '_ {
        let mut offset = 0usize;
        self.rope
            .lines_raw(..)
            .enumerate()
            .map(move |(number, raw)| {
                let start = offset;
                offset += raw.len();
                let text = raw
                    .strip_suffix('\n')
                    .map(|s| s.strip_suffix('\r').unwrap_or(s))
                    .unwrap_or(&*raw)
                    .to_string();
                TextLine {
                    number,
                    extent: Span::new(start, text.len()),
                    extent_including_line_break: Span::from_bounds(start, offset),
                    text,
                }
            })
    }
}
