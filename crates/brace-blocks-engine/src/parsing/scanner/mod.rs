//! # Scanner
//!
//! Single forward pass over one snapshot's text, in two layers:
//!
//! 1. **Quote/comment layer** (`quote`): consumes `//`, `/* */` and `#`
//!    lines, and flags characters inside `'...'`, `"..."` and `@"..."`
//! 2. **Statement layer** (`statement`): tracks brace depth and open
//!    parentheses to flag end-of-statement characters
//!
//! Malformed input never fails: unterminated simple literals end at the line
//! break, unterminated block comments and verbatim strings run to the end of
//! the document.

pub mod cursor;
pub mod quote;
pub mod statement;

pub use quote::{QuoteMode, QuoteScanner, ScannedChar};
pub use statement::StatementScanner;
