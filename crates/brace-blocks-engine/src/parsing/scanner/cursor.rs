/// A cursor for character-by-character scanning with position tracking.
///
/// Operates over the full text of one snapshot; positions are byte offsets
/// into that text.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The string being scanned.
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor at the start of `s`.
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Returns the current byte position.
    pub fn pos(&self) -> usize {
        self.i
    }

    /// Returns true if at end of string.
    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// The full character at the current position.
    pub fn current(&self) -> Option<char> {
        self.s.get(self.i..)?.chars().next()
    }

    /// Checks if the remaining input starts with the given byte pattern.
    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.s.as_bytes().get(self.i..).is_some_and(|rest| rest.starts_with(pat))
    }

    /// Advances past the current character, returning it.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.current()?;
        self.i += c.len_utf8();
        Some(c)
    }

    /// Advances by `n` bytes. Only used to step over ASCII delimiters.
    pub fn bump_n(&mut self, n: usize) {
        self.i = (self.i + n).min(self.s.len());
    }

    /// Moves to the line break ending the current line (or end of input),
    /// leaving the break itself unconsumed.
    pub fn skip_to_line_end(&mut self) {
        let rest = &self.s.as_bytes()[self.i..];
        let offset = rest
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')
            .unwrap_or(rest.len());
        self.i += offset;
    }

    /// Consumes input up to and including the next `pat`, or to the end of
    /// input when `pat` never appears.
    pub fn skip_past(&mut self, pat: &str) {
        match self.s[self.i..].find(pat) {
            Some(offset) => self.i += offset + pat.len(),
            None => self.i = self.s.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_basics() {
        let mut cur = Cursor::new("hello");
        assert_eq!(cur.pos(), 0);
        assert!(!cur.eof());
        assert_eq!(cur.current(), Some('h'));
        assert_eq!(cur.bump(), Some('h'));
        assert_eq!(cur.pos(), 1);
    }

    #[test]
    fn bump_steps_over_multibyte_characters() {
        let mut cur = Cursor::new("é{");
        assert_eq!(cur.bump(), Some('é'));
        assert_eq!(cur.pos(), 2);
        assert_eq!(cur.bump(), Some('{'));
        assert!(cur.eof());
        assert_eq!(cur.bump(), None);
    }

    #[test]
    fn skip_to_line_end_stops_before_the_break() {
        let mut cur = Cursor::new("# define X\r\nnext");
        cur.skip_to_line_end();
        assert_eq!(cur.current(), Some('\r'));

        let mut last_line = Cursor::new("// trailing");
        last_line.skip_to_line_end();
        assert!(last_line.eof());
    }

    #[test]
    fn skip_past_consumes_the_terminator() {
        let mut cur = Cursor::new("/* a { */}");
        cur.bump_n(2);
        cur.skip_past("*/");
        assert_eq!(cur.current(), Some('}'));

        let mut unterminated = Cursor::new("/* never closed {");
        unterminated.bump_n(2);
        unterminated.skip_past("*/");
        assert!(unterminated.eof());
    }

    #[test]
    fn starts_with_at_eof() {
        let mut cur = Cursor::new("ab");
        cur.bump_n(2);
        assert!(cur.eof());
        assert!(cur.starts_with(b""));
        assert!(!cur.starts_with(b"a"));
    }

    #[test]
    fn bump_n_clamps_to_end() {
        let mut cur = Cursor::new("hi");
        cur.bump_n(10);
        assert!(cur.eof());
        assert_eq!(cur.current(), None);
    }
}
