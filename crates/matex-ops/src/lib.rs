//! # matex Elementary Operations
//!
//! Parser for the elementary row/column operation mini-language carried by
//! `\simop`, `\eqop` and `\arrop` blocks.
//!
//! Each operation line is matched, in order, against exactly one of three
//! mutually exclusive grammars (first match wins):
//!
//! - **Swap**: `(n) \lra (m)`
//! - **Scale**: `(n) \cdot k`
//! - **Add-multiple**: `(n) + k (m)` (or `-`; a bare sign means `±1`)
//!
//! A `col` marker inside a parenthesized index (`(2col)` or `(2 col)`)
//! selects the column axis. Surface indices are 1-based; records store them
//! 0-based. Coefficients are kept as raw scalar-expression text for the
//! algebra engine to parse later.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use matex_syntax::{Command, SyntaxError};

/// Names a command may carry to introduce an operation block. All three are
/// equivalent; they exist so documents can pick the separator glyph they
/// render with.
pub const OPERATION_COMMANDS: &[&str] = &[r"\simop", r"\eqop", r"\arrop"];

const ROW_BREAK: &str = r"\\";
const SWAP_TOKEN: &str = r"\lra";
const SCALE_TOKEN: &str = r"\cdot";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Row,
    Col,
}

/// What an operation does to its target line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    /// Exchange the target with `with`.
    Swap { with: usize },
    /// Multiply the target by `factor`.
    Scale { factor: String },
    /// Accumulate `factor * source` into the target.
    AddMultiple { source: usize, factor: String },
}

/// One normalized operation record. Order of records is semantically
/// significant: later operations act on the state left by earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementaryOp {
    pub axis: Axis,
    /// 0-based index of the row or column the operation targets.
    pub target: usize,
    pub kind: OpKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("cannot parse ({0}) as elementary operation")]
    InvalidOperation(String),
    #[error("cannot find correct elementary operation LaTeX command")]
    UnknownCommand(String),
}

/// Parses the operation block of `command` into an ordered record list.
///
/// The command must be one of [`OPERATION_COMMANDS`] and carry the operation
/// lines, separated by `\\`, in its first block.
pub fn parse_el_ops(command: &Command) -> Result<Vec<ElementaryOp>, OpError> {
    if !OPERATION_COMMANDS.contains(&command.name()) {
        return Err(OpError::UnknownCommand(command.name().to_string()));
    }
    parse_operation_lines(&command.block(0)?.inner)
}

/// Parses raw operation text: one operation per `\\`-separated line, blank
/// lines skipped.
pub fn parse_operation_lines(text: &str) -> Result<Vec<ElementaryOp>, OpError> {
    text.split(ROW_BREAK)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_operation)
        .collect()
}

/// One parenthesized operand: a 1-based index plus the optional `col` marker.
struct IndexRef {
    index: usize,
    col: bool,
}

fn parse_operation(line: &str) -> Result<ElementaryOp, OpError> {
    let invalid = || OpError::InvalidOperation(line.to_string());

    let (first, rest) = parse_index_group(line).ok_or_else(invalid)?;
    let rest = rest.trim_start();

    // Swap: the whole remainder must be `\lra (m)`.
    if let Some(tail) = rest.strip_prefix(SWAP_TOKEN) {
        let (second, leftover) = parse_index_group(tail.trim_start()).ok_or_else(invalid)?;
        if !leftover.trim().is_empty() {
            return Err(invalid());
        }
        return Ok(ElementaryOp {
            axis: axis_of(&[&first, &second]),
            target: first.index,
            kind: OpKind::Swap { with: second.index },
        });
    }

    // Scale: everything after `\cdot` is the coefficient expression.
    if let Some(tail) = rest.strip_prefix(SCALE_TOKEN) {
        let factor = tail.trim();
        if factor.is_empty() {
            return Err(invalid());
        }
        return Ok(ElementaryOp {
            axis: axis_of(&[&first]),
            target: first.index,
            kind: OpKind::Scale {
                factor: factor.to_string(),
            },
        });
    }

    // Add-multiple: `(n) <signed coefficient> (m)`, the source operand closing
    // the line. The coefficient is everything strictly between the operands.
    if rest.starts_with(['+', '-']) {
        let first_end = line.len() - rest.len();
        let open = line.rfind('(').ok_or_else(invalid)?;
        if open <= first_end {
            return Err(invalid());
        }
        let (second, leftover) = parse_index_group(&line[open..]).ok_or_else(invalid)?;
        if !leftover.trim().is_empty() {
            return Err(invalid());
        }
        let factor = match line[first_end..open].trim() {
            "+" => "+1".to_string(),
            "-" => "-1".to_string(),
            "" => return Err(invalid()),
            other => other.to_string(),
        };
        return Ok(ElementaryOp {
            axis: axis_of(&[&first, &second]),
            target: first.index,
            kind: OpKind::AddMultiple {
                source: second.index,
                factor,
            },
        });
    }

    Err(invalid())
}

fn axis_of(operands: &[&IndexRef]) -> Axis {
    if operands.iter().any(|r| r.col) {
        Axis::Col
    } else {
        Axis::Row
    }
}

/// Parses a leading `( <int> [col] )` group, returning the 0-based reference
/// and the remainder of the line.
fn parse_index_group(text: &str) -> Option<(IndexRef, &str)> {
    let mut rest = text.strip_prefix('(')?.trim_start();

    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let surface: usize = rest[..digits].parse().ok()?;
    rest = rest[digits..].trim_start();

    let col = if let Some(after) = rest.strip_prefix("col") {
        rest = after.trim_start();
        true
    } else {
        false
    };

    rest = rest.strip_prefix(')')?;
    // Surface indices are 1-based; zero has no internal counterpart.
    let index = surface.checked_sub(1)?;
    Some((IndexRef { index, col }, rest))
}
