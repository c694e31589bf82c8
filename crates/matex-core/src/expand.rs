//! Macro expansion.
//!
//! Expansion is a single left-to-right scan that copies literal runs
//! verbatim and rewrites commands through one recursive function. Block
//! contents are expanded *before* the surrounding command substitutes its
//! template (post-order), so substituted text is never re-scanned for
//! macros.
//!
//! With extraction enabled, matrix-family commands bypass the macro table:
//! the matrix is built, collapsed to its value, pushed onto a side list and
//! replaced by an opaque placeholder token the surrounding expression can be
//! parsed around.

use crate::engine::{AlgebraEngine, Value};
use crate::error::Error;
use crate::matrix::{MatrixKind, matrix_from_blocks};
use matex_syntax::{Command, MacroTable, read_command};

/// Leading part of the placeholder token. The full token for slot `i` is
/// `M_{r_{e_{p_{l_{i}}}}}` — nested subscripts no ordinary input produces,
/// and a shape the expression parser reads as a single symbol.
const PLACEHOLDER_PREFIX: &str = "M_{r_{e_{p_{l_{";
const PLACEHOLDER_SUFFIX: &str = "}}}}}";

/// One matrix lifted out of the text, keyed by its placeholder token.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMatrix<E> {
    pub token: String,
    pub value: Value<E>,
}

/// Result of one expansion pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Expansion<E> {
    /// Extraction was disabled; matrix commands passed through textually.
    Text(String),
    /// Extraction was enabled; matrices appear in order of appearance.
    WithMatrices {
        text: String,
        matrices: Vec<ExtractedMatrix<E>>,
    },
}

/// Expands every user macro in `text`. With `extract_matrices` set,
/// matrix-family commands are additionally lifted into a side list.
pub fn expand<A: AlgebraEngine>(
    text: &str,
    table: &MacroTable,
    engine: &A,
    extract_matrices: bool,
) -> Result<Expansion<A::Expr>, Error> {
    let mut pass = ExpandPass {
        table,
        engine,
        matrices: extract_matrices.then(Vec::new),
        depth: 0,
    };
    let text = pass.expand_text(text)?;
    Ok(match pass.matrices {
        Some(matrices) => Expansion::WithMatrices { text, matrices },
        None => Expansion::Text(text),
    })
}

/// Expansion without extraction, unwrapped to the expanded text.
pub fn expand_text<A: AlgebraEngine>(
    text: &str,
    table: &MacroTable,
    engine: &A,
) -> Result<String, Error> {
    match expand(text, table, engine, false)? {
        Expansion::Text(text) | Expansion::WithMatrices { text, .. } => Ok(text),
    }
}

/// Expansion with extraction, unwrapped to text plus side list.
pub fn expand_with_matrices<A: AlgebraEngine>(
    text: &str,
    table: &MacroTable,
    engine: &A,
) -> Result<(String, Vec<ExtractedMatrix<A::Expr>>), Error> {
    match expand(text, table, engine, true)? {
        Expansion::WithMatrices { text, matrices } => Ok((text, matrices)),
        Expansion::Text(text) => Ok((text, Vec::new())),
    }
}

/// Recursion bound: expansion depth equals macro nesting depth, and
/// runaway nesting must surface as an error, not a blown stack.
const MAX_NESTING: usize = 256;

struct ExpandPass<'a, A: AlgebraEngine> {
    table: &'a MacroTable,
    engine: &'a A,
    matrices: Option<Vec<ExtractedMatrix<A::Expr>>>,
    depth: usize,
}

impl<A: AlgebraEngine> ExpandPass<'_, A> {
    fn expand_text(&mut self, text: &str) -> Result<String, Error> {
        if self.depth >= MAX_NESTING {
            return Err(Error::NestingTooDeep);
        }
        self.depth += 1;
        let result = self.expand_text_inner(text);
        self.depth -= 1;
        result
    }

    fn expand_text_inner(&mut self, text: &str) -> Result<String, Error> {
        let mut out = String::new();
        let mut pos = 0;
        while let Some(off) = text[pos..].find('\\') {
            let at = pos + off;
            out.push_str(&text[pos..at]);

            // An escaped backslash is the row-break token; it never starts a
            // command.
            if text[at + 1..].starts_with('\\') {
                out.push_str(r"\\");
                pos = at + 2;
                continue;
            }

            match read_command(text, at)? {
                Some(command) => {
                    out.push_str(&self.expand_command(&command)?);
                    pos = command.end();
                }
                None => {
                    out.push('\\');
                    pos = at + 1;
                }
            }
        }
        out.push_str(&text[pos..]);
        Ok(out)
    }

    fn expand_command(&mut self, command: &Command) -> Result<String, Error> {
        // Post-order: blocks are fully expanded before any substitution, so
        // template output is never re-scanned.
        let mut inners = Vec::with_capacity(command.len());
        for block in command.blocks() {
            inners.push(self.expand_text(&block.inner)?);
        }

        let kind = MatrixKind::from_command(command.name());
        let (consumed, mut expr) = match (&mut self.matrices, kind) {
            (Some(list), Some(kind)) => {
                let blocks: Vec<&str> = inners.iter().map(String::as_str).collect();
                let (consumed, matrix) = matrix_from_blocks(self.engine, kind, &blocks)?;
                let token = placeholder_token(list.len());
                let value = matrix.calculate(self.engine)?;
                list.push(ExtractedMatrix {
                    token: token.clone(),
                    value,
                });
                (consumed, token)
            }
            _ => {
                let (arity, template) = match self.table.get(command.name()) {
                    Some(def) => (def.arity, def.template.as_str()),
                    // Unrecognized commands stand for themselves.
                    None => (0, command.name()),
                };
                (arity, substitute_template(template, &inners, command.name())?)
            }
        };

        // Blocks beyond the consumed count reappear as literal brace groups.
        for inner in inners.iter().skip(consumed) {
            expr.push('{');
            expr.push_str(inner);
            expr.push('}');
        }
        Ok(expr)
    }
}

/// Replaces every `#k` in `template` with block `k-1`'s expanded text.
fn substitute_template(
    template: &str,
    blocks: &[String],
    command: &str,
) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(off) = rest.find('#') {
        out.push_str(&rest[..off]);
        rest = &rest[off + 1..];
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            out.push('#');
            continue;
        }
        let k: usize = rest[..digits]
            .parse()
            .map_err(|_| missing_block(command, 0))?;
        let index = k.checked_sub(1).ok_or_else(|| missing_block(command, 0))?;
        let inner = blocks.get(index).ok_or_else(|| missing_block(command, index))?;
        out.push_str(inner);
        rest = &rest[digits..];
    }
    out.push_str(rest);
    Ok(out)
}

fn missing_block(command: &str, index: usize) -> Error {
    Error::Syntax(matex_syntax::SyntaxError::MissingBlock {
        command: command.to_string(),
        index,
    })
}

fn placeholder_token(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}{PLACEHOLDER_SUFFIX}")
}

/// Resolves `^T` and `^{-1}` markers attached directly to placeholder
/// tokens, mutating the corresponding extracted values in place. Transpose
/// markers are resolved in one pass over the whole text, then inverse
/// markers in a second, so `M^T^{-1}` applies both.
pub fn resolve_value_markers<A: AlgebraEngine>(
    text: &str,
    matrices: &mut [ExtractedMatrix<A::Expr>],
    engine: &A,
) -> Result<String, Error> {
    let text = marker_pass(text, matrices, engine, Marker::Transpose)?;
    marker_pass(&text, matrices, engine, Marker::Inverse)
}

#[derive(Clone, Copy)]
enum Marker {
    Transpose,
    Inverse,
}

fn marker_pass<A: AlgebraEngine>(
    text: &str,
    matrices: &mut [ExtractedMatrix<A::Expr>],
    engine: &A,
    marker: Marker,
) -> Result<String, Error> {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(off) = text[pos..].find(PLACEHOLDER_PREFIX) {
        let start = pos + off;
        out.push_str(&text[pos..start]);

        let Some((index, token_len)) = parse_placeholder(&text[start..]) else {
            out.push_str(PLACEHOLDER_PREFIX);
            pos = start + PLACEHOLDER_PREFIX.len();
            continue;
        };
        let token_end = start + token_len;
        out.push_str(&text[start..token_end]);
        pos = token_end;

        let marker_len = match marker {
            Marker::Transpose => match_transpose_marker(&text[token_end..]),
            Marker::Inverse => match_inverse_marker(&text[token_end..]),
        };
        if let Some(len) = marker_len {
            let entry = matrices
                .get_mut(index)
                .ok_or(Error::UnknownPlaceholder(index))?;
            entry.value = match (&entry.value, marker) {
                (Value::Matrix(grid), Marker::Transpose) => Value::Matrix(engine.transpose(grid)),
                (Value::Matrix(grid), Marker::Inverse) => Value::Matrix(engine.inverse(grid)?),
                (Value::Scalar(_), Marker::Transpose) => {
                    return Err(Error::RestrictedOperation(
                        "cannot transpose a scalar value".into(),
                    ));
                }
                (Value::Scalar(_), Marker::Inverse) => {
                    return Err(Error::RestrictedOperation(
                        "cannot inverse a scalar value".into(),
                    ));
                }
            };
            pos += len;
        }
    }
    out.push_str(&text[pos..]);
    Ok(out)
}

/// Matches a full placeholder token at the start of `text`, returning the
/// slot index and the token length.
fn parse_placeholder(text: &str) -> Option<(usize, usize)> {
    let rest = text.strip_prefix(PLACEHOLDER_PREFIX)?;
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || !rest[digits..].starts_with(PLACEHOLDER_SUFFIX) {
        return None;
    }
    let index = rest[..digits].parse().ok()?;
    Some((
        index,
        PLACEHOLDER_PREFIX.len() + digits + PLACEHOLDER_SUFFIX.len(),
    ))
}

/// `^T`, `^{T}`, `^ T` and friends: caret, optional brace, `T`, optional
/// closing brace, spaces allowed around the letter.
fn match_transpose_marker(text: &str) -> Option<usize> {
    let mut rest = text.strip_prefix('^')?;
    let braced = rest.starts_with('{');
    if braced {
        rest = &rest[1..];
    }
    rest = rest.trim_start_matches(' ');
    rest = rest.strip_prefix('T')?;
    if braced {
        rest = rest.trim_start_matches(' ');
        rest = rest.strip_prefix('}')?;
    }
    Some(text.len() - rest.len())
}

/// `^{-1}`: braces required, spaces allowed inside.
fn match_inverse_marker(text: &str) -> Option<usize> {
    let rest = text.strip_prefix("^{")?;
    let rest = rest.trim_start_matches(' ');
    let rest = rest.strip_prefix("-1")?;
    let rest = rest.trim_start_matches(' ');
    let rest = rest.strip_prefix('}')?;
    Some(text.len() - rest.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_round_trip() {
        let token = placeholder_token(17);
        assert_eq!(token, "M_{r_{e_{p_{l_{17}}}}}");
        assert_eq!(parse_placeholder(&token), Some((17, token.len())));
    }

    #[test]
    fn test_placeholder_rejects_malformed() {
        assert_eq!(parse_placeholder("M_{r_{e_{p_{l_{x}}}}}"), None);
        assert_eq!(parse_placeholder("M_{r_{e_{p_{l_{1}}}}"), None);
    }

    #[test]
    fn test_transpose_marker_shapes() {
        assert_eq!(match_transpose_marker("^T rest"), Some(2));
        assert_eq!(match_transpose_marker("^{T}"), Some(4));
        assert_eq!(match_transpose_marker("^{ T }"), Some(6));
        assert_eq!(match_transpose_marker("^ T"), Some(3));
        assert_eq!(match_transpose_marker("^{-1}"), None);
        assert_eq!(match_transpose_marker("T"), None);
    }

    #[test]
    fn test_inverse_marker_shapes() {
        assert_eq!(match_inverse_marker("^{-1}"), Some(5));
        assert_eq!(match_inverse_marker("^{ -1 }"), Some(7));
        assert_eq!(match_inverse_marker("^-1"), None);
        assert_eq!(match_inverse_marker("^{T}"), None);
    }

    #[test]
    fn test_substitute_template() {
        let blocks = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            substitute_template("#2-#1", &blocks, r"\f").unwrap(),
            "b-a"
        );
        assert_eq!(
            substitute_template("x#1x", &blocks, r"\f").unwrap(),
            "xax"
        );
        // A lone `#` is literal.
        assert_eq!(substitute_template("a#b", &blocks, r"\f").unwrap(), "a#b");
    }

    #[test]
    fn test_substitute_template_arity_mismatch() {
        let blocks = vec!["a".to_string()];
        assert!(substitute_template("#2", &blocks, r"\f").is_err());
        assert!(substitute_template("#0", &blocks, r"\f").is_err());
    }
}
