use super::snapshot::TextSnapshot;
use super::span::Span;

/// Extracts text for a span, truncating to `max` characters with "..." suffix
/// if needed. Line breaks are shown as spaces.
///
/// Used for human-readable outline output.
pub fn preview(snapshot: &TextSnapshot, sp: Span, max: usize) -> String {
    let text = snapshot.slice(sp);
    let mut s: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(max)
        .collect();
    if text.chars().count() > max {
        s.push_str("...");
    }
    s
}
