use super::cursor::Cursor;

/// The literal the scanner is currently inside, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    None,
    /// `'...'`
    Single,
    /// `"..."`
    Double,
    /// `@"..."`: no escapes, may span lines.
    Verbatim,
}

/// One character as seen by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedChar {
    /// Byte offset of the character in the snapshot.
    pub position: usize,
    pub ch: char,
    /// The character is part of a string or character literal.
    pub in_literal: bool,
    /// The character ends a statement (set by the statement layer only).
    pub end_of_statement: bool,
}

/// Quote/comment layer of the scanner.
///
/// Comments and `#` directives are consumed whole and never reported; the
/// character that follows them is classified like any other. Literal
/// characters are reported with `in_literal` set so callers can ignore
/// braces inside them.
pub struct QuoteScanner<'a> {
    cursor: Cursor<'a>,
    quote: QuoteMode,
    escape: bool,
}

impl<'a> QuoteScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            cursor: Cursor::new(text),
            quote: QuoteMode::None,
            escape: false,
        }
    }

    pub fn in_literal(&self) -> bool {
        self.quote != QuoteMode::None
    }

    fn skip_comment_or_directive(&mut self) -> bool {
        if self.cursor.starts_with(b"#") || self.cursor.starts_with(b"//") {
            self.cursor.skip_to_line_end();
            true
        } else if self.cursor.starts_with(b"/*") {
            self.cursor.bump_n(2);
            // Unterminated block comments run to the end of the document.
            self.cursor.skip_past("*/");
            true
        } else {
            false
        }
    }
}

impl Iterator for QuoteScanner<'_> {
    type Item = ScannedChar;

    fn next(&mut self) -> Option<ScannedChar> {
        loop {
            if self.cursor.eof() {
                return None;
            }
            if self.quote == QuoteMode::None && self.skip_comment_or_directive() {
                continue;
            }

            let was_escaped = std::mem::take(&mut self.escape);
            let mut position = self.cursor.pos();
            let mut ch = self.cursor.current()?;

            match self.quote {
                QuoteMode::None => match ch {
                    '\'' => self.quote = QuoteMode::Single,
                    '"' => self.quote = QuoteMode::Double,
                    '@' if self.cursor.starts_with(b"@\"") => {
                        self.quote = QuoteMode::Verbatim;
                        self.cursor.bump_n(1);
                        position = self.cursor.pos();
                        ch = '"';
                    }
                    _ => {}
                },
                QuoteMode::Verbatim => {
                    if ch == '"' {
                        self.quote = QuoteMode::None;
                    }
                }
                QuoteMode::Single | QuoteMode::Double => {
                    let closing = if self.quote == QuoteMode::Single { '\'' } else { '"' };
                    if ch == '\\' && !was_escaped {
                        self.escape = true;
                    } else if ch == closing && !was_escaped {
                        self.quote = QuoteMode::None;
                    } else if ch == '\n' || ch == '\r' {
                        // Simple literals end at the end of the line.
                        self.quote = QuoteMode::None;
                    }
                }
            }

            self.cursor.bump();
            return Some(ScannedChar {
                position,
                ch,
                in_literal: self.in_literal(),
                end_of_statement: false,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Characters that are visible (not in a comment) and not in a literal.
    fn code_chars(text: &str) -> String {
        QuoteScanner::new(text)
            .filter(|c| !c.in_literal)
            .map(|c| c.ch)
            .collect()
    }

    #[rstest]
    #[case::line_comment("a // { b\nc", "a \nc")]
    #[case::block_comment("a /* { */ c", "a  c")]
    #[case::directive("#region {\nx", "\nx")]
    #[case::double_quote(r#"a "{" b"#, r#"a " b"#)]
    #[case::single_quote("a '{' b", "a ' b")]
    #[case::verbatim(r#"a @"{\" b"#, r#"a " b"#)]
    #[case::escaped_quote(r#"a "\"{" b"#, r#"a " b"#)]
    #[case::escaped_backslash(r#"a "\\" {"#, r#"a " {"#)]
    #[case::unterminated_literal_ends_at_line("a \"{\n{", "a \n{")]
    #[case::verbatim_spans_lines("@\"{\n}\" x", "\" x")]
    #[case::unterminated_block_comment("a /* {", "a ")]
    #[case::quote_after_block_comment("/**/\"{\"}", "\"}")]
    fn literals_and_comments_are_suppressed(#[case] text: &str, #[case] visible: &str) {
        assert_eq!(code_chars(text), visible);
    }

    #[test]
    fn positions_are_byte_offsets() {
        let positions: Vec<_> = QuoteScanner::new("é{/*x*/}")
            .map(|c| (c.position, c.ch))
            .collect();
        assert_eq!(positions, vec![(0, 'é'), (2, '{'), (8, '}')]);
    }

    #[test]
    fn opening_quote_is_inside_closing_quote_is_outside() {
        let flags: Vec<_> = QuoteScanner::new("'a'").map(|c| c.in_literal).collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn verbatim_reports_the_quote_not_the_at_sign() {
        let first = QuoteScanner::new("@\"x\"").next().unwrap();
        assert_eq!((first.position, first.ch, first.in_literal), (1, '"', true));
    }

    #[test]
    fn doubled_quote_in_verbatim_string_exits_and_reenters() {
        // `@"a""{"` is read as `@"a"` followed by the literal `"{"`.
        assert_eq!(code_chars("@\"a\"\"{\" }"), "\"\" }");
    }
}
