//! # matex Syntax
//!
//! Span-level scanning for the matex LaTeX dialect.
//!
//! ## Overview
//!
//! This crate is the single source of truth for "what is a command and what
//! are its argument blocks". It contains:
//!
//! - **Span reader** ([`reader::read_command`]): scans raw text for a
//!   backslash-introduced command and collects its brace-delimited argument
//!   blocks with exact byte spans. No recursion, no expansion.
//! - **Bracket matching** ([`reader::find_close_bracket`]): a balanced-counter
//!   scan used everywhere a `{...}` group has to be closed.
//! - **Macro table** ([`defs::MacroTable`]): the `\newcommand` definitions
//!   parsed from a user file into `(arity, template)` pairs. Built once and
//!   immutable afterwards; the expander only ever reads it.
//!
//! The reader works on byte offsets but only ever splits at ASCII delimiters,
//! so all produced spans lie on UTF-8 character boundaries.
//!
//! ## Examples
//!
//! ```
//! use matex_syntax::read_command;
//!
//! let cmd = read_command(r"\frac{a}{b}", 0).unwrap().unwrap();
//! assert_eq!(cmd.name(), r"\frac");
//! assert_eq!(cmd.block(0).unwrap().inner, "a");
//! assert_eq!(cmd.block(1).unwrap().inner, "b");
//! ```

use thiserror::Error;

pub mod defs;
pub mod reader;

pub use defs::{MacroDef, MacroTable, RESERVED_COMMANDS};
pub use reader::{Block, Command, find_close_bracket, normalize, read_command, skip_spaces};

/// Errors raised while scanning command syntax.
///
/// Every variant is fatal to the request that triggered it, never to the
/// process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// A `{` was opened without a balancing `}` before end of input.
    #[error("matching close bracket not found")]
    UnmatchedBracket,
    /// A command name is followed by a character outside the allowed
    /// delimiter set `( ) { } [ ] \` and space.
    #[error("unexpected symbol after {command}: '{found}'")]
    UnexpectedSymbol { command: String, found: char },
    /// A block index was requested that the command does not have, either
    /// directly or through a `#k` template placeholder.
    #[error("unable to find block number {index} of {command}")]
    MissingBlock { command: String, index: usize },
}
