//! # Block Parsing
//!
//! Turns one snapshot into an immutable tree of brace-delimited blocks.
//!
//! ## Parsing Phases
//!
//! 1. **Scanning** (`scanner`): each character is classified as literal or
//!    code, and as end-of-statement or not
//! 2. **Tree construction** (`builder`): a `BlockTreeBuilder` keeps a stack
//!    of open blocks and records the statement that introduced each one
//!
//! ## Modules
//!
//! - **`tree`**: Arena types (`BlockTree`, `BlockNode`, `BlockId`) and the
//!   `BlockRef` handle
//! - **`statement`**: Helpers over introducing-statement text
//! - **`outline`**: Indented text rendering of a tree
//! - **`invariants`**: Structural checks used by tests
//!
//! ## Key Invariants
//!
//! - Every block's span lies inside its parent's span
//! - Siblings are disjoint and ordered by start offset
//! - A scan either completes and yields a whole tree or yields nothing

pub mod builder;
pub mod invariants;
pub mod outline;
pub mod scanner;
pub mod statement;
pub mod tree;

pub use builder::{BlockTreeBuilder, parse};
pub use tree::{BlockId, BlockNode, BlockRef, BlockTree};
