use thiserror::Error;

use crate::engine::EngineError;
use matex_ops::OpError;
use matex_syntax::SyntaxError;

/// Everything that can fail while serving one request.
///
/// Errors propagate from the point of detection straight to the request
/// boundary; the transport renders them as an error response and keeps
/// serving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Op(#[from] OpError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// A matrix command was required but the text starts with something else.
    #[error("cannot find matrix command")]
    MissingMatrixCommand,
    #[error("{0} is not a matrix command")]
    NotMatrixCommand(String),
    /// The operation command after the matrix block is missing entirely.
    #[error("elementary operation command not found")]
    MissingOperationCommand,
    /// Matrix rows of unequal length, or augmented grids whose row counts
    /// disagree.
    #[error("{0}")]
    ShapeMismatch(String),
    /// An operation the matrix kind does not admit, such as transposing an
    /// augmented matrix.
    #[error("{0}")]
    RestrictedOperation(String),
    /// A placeholder token referenced an extraction slot that does not exist.
    #[error("unknown matrix placeholder {0}")]
    UnknownPlaceholder(usize),
    /// Macro nesting deeper than the expander is willing to follow.
    #[error("macro nesting exceeds depth limit")]
    NestingTooDeep,
}
