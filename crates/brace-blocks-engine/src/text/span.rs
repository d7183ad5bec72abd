use super::snapshot::TextSnapshot;
use super::version::{MapError, TrackingMode};

/// A byte range `[start, end)` into a snapshot's rope.
///
/// Block tags store spans rather than copied text; slicing the snapshot with
/// a span reproduces the exact source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    pub fn from_bounds(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span bounds reversed: {start}..{end}");
        Self { start, end }
    }

    /// Returns the length in bytes. Uses saturating subtraction for safety.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty (start >= end).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(self, position: usize) -> bool {
        self.start <= position && position < self.end
    }

    #[must_use]
    pub fn contains_span(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// True if the spans share at least one position or touch at an edge.
    ///
    /// `[0, 5)` intersects `[5, 8)`, and an empty span intersects any span
    /// whose bounds include it.
    #[must_use]
    pub fn intersects_with(self, other: Span) -> bool {
        other.start <= self.end && other.end >= self.start
    }

    /// True if the spans share at least one position. Touching spans do not
    /// overlap.
    #[must_use]
    pub fn overlaps_with(self, other: Span) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::from_bounds(range.start, range.end)
    }
}

/// How a span's edges behave when text is inserted exactly at them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanTrackingMode {
    /// Insertions at either edge stay outside the span.
    EdgeExclusive,
    /// Insertions at either edge are pulled inside the span.
    EdgeInclusive,
}

impl SpanTrackingMode {
    fn edges(self) -> (TrackingMode, TrackingMode) {
        match self {
            SpanTrackingMode::EdgeExclusive => (TrackingMode::Positive, TrackingMode::Negative),
            SpanTrackingMode::EdgeInclusive => (TrackingMode::Negative, TrackingMode::Positive),
        }
    }
}

/// A span bound to the snapshot it was measured against.
#[derive(Debug, Clone)]
pub struct SnapshotSpan {
    pub snapshot: TextSnapshot,
    pub span: Span,
}

impl SnapshotSpan {
    pub fn new(snapshot: TextSnapshot, span: Span) -> Self {
        debug_assert!(span.end <= snapshot.len(), "span {span:?} past snapshot end");
        Self { snapshot, span }
    }

    /// The whole document of `snapshot`.
    pub fn full(snapshot: &TextSnapshot) -> Self {
        let len = snapshot.len();
        Self::new(snapshot.clone(), Span::new(0, len))
    }

    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }

    pub fn text(&self) -> String {
        self.snapshot.slice(self.span).into_owned()
    }

    /// Maps this span into `target`, which must share this span's buffer.
    pub fn translate_to(
        &self,
        target: &TextSnapshot,
        mode: SpanTrackingMode,
    ) -> Result<SnapshotSpan, MapError> {
        if self.snapshot.version().same_as(target.version()) {
            return Ok(self.clone());
        }

        let (start_mode, end_mode) = mode.edges();
        let start = self
            .snapshot
            .version()
            .map_position(self.span.start, target.version(), start_mode)?;
        let end = self
            .snapshot
            .version()
            .map_position(self.span.end, target.version(), end_mode)?;

        // An edge-exclusive span can collapse past itself when a deletion eats it.
        let end = end.max(start);
        Ok(SnapshotSpan::new(target.clone(), Span::from_bounds(start, end)))
    }
}

impl PartialEq for SnapshotSpan {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.snapshot.version().same_as(other.snapshot.version())
    }
}

impl Eq for SnapshotSpan {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Span::from_bounds(0, 5), Span::from_bounds(5, 8), true)]
    #[case(Span::from_bounds(0, 5), Span::from_bounds(6, 8), false)]
    #[case(Span::from_bounds(3, 3), Span::from_bounds(0, 5), true)]
    #[case(Span::from_bounds(2, 4), Span::from_bounds(0, 10), true)]
    fn intersects_with_counts_touching_edges(
        #[case] a: Span,
        #[case] b: Span,
        #[case] expected: bool,
    ) {
        assert_eq!(a.intersects_with(b), expected);
        assert_eq!(b.intersects_with(a), expected);
    }

    #[test]
    fn overlaps_with_excludes_touching_edges() {
        assert!(!Span::from_bounds(0, 5).overlaps_with(Span::from_bounds(5, 8)));
        assert!(Span::from_bounds(0, 6).overlaps_with(Span::from_bounds(5, 8)));
    }

    #[test]
    fn contains_is_half_open() {
        let sp = Span::from_bounds(2, 4);
        assert!(!sp.contains(1));
        assert!(sp.contains(2));
        assert!(sp.contains(3));
        assert!(!sp.contains(4));
    }

    #[test]
    fn len_saturates_on_reversed_bounds() {
        let sp = Span { start: 5, end: 3 };
        assert_eq!(sp.len(), 0);
        assert!(sp.is_empty());
    }
}
