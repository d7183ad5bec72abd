use super::quote::{QuoteScanner, ScannedChar};

/// Statement/brace layer of the scanner, wrapping [`QuoteScanner`].
///
/// Whether a `;` ends a statement depends on context:
///
/// ```text
/// foo();                          <- this one does
/// for (int i = 0; (i < 10); ++i)  <- these don't
///     bar(delegate {
///             baz();              <- this one does
/// ```
///
/// A `;` ends a statement unless it sits inside a parenthesis that was
/// opened at the current brace depth. Braces always end a statement.
pub struct StatementScanner<'a> {
    quotes: QuoteScanner<'a>,
    brace_depth: i32,
    /// Brace depth at which each still-open `(` was seen.
    paren_depths: Vec<i32>,
}

impl<'a> StatementScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            quotes: QuoteScanner::new(text),
            brace_depth: 0,
            paren_depths: Vec::new(),
        }
    }

    pub fn brace_depth(&self) -> i32 {
        self.brace_depth
    }

    fn classify(&mut self, ch: char) -> bool {
        match ch {
            ';' => self
                .paren_depths
                .last()
                .is_none_or(|&depth| depth < self.brace_depth),
            '(' => {
                self.paren_depths.push(self.brace_depth);
                false
            }
            ')' => {
                // Unbalanced close parens are tolerated.
                self.paren_depths.pop();
                false
            }
            '{' => {
                self.brace_depth += 1;
                true
            }
            '}' => {
                self.brace_depth -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Iterator for StatementScanner<'_> {
    type Item = ScannedChar;

    fn next(&mut self) -> Option<ScannedChar> {
        let mut scanned = self.quotes.next()?;
        if !scanned.in_literal {
            scanned.end_of_statement = self.classify(scanned.ch);
        }
        Some(scanned)
    }
}
