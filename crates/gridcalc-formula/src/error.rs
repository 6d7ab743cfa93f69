//! Engine fault types
//!
//! These are disjoint from the spreadsheet error codes (`#DIV/0!` and
//! friends): a formula that evaluates to an error code still evaluates
//! successfully, carrying [`gridcalc_core::ErrorKind`] as data. An
//! [`EngineError`] means the engine itself could not proceed (malformed
//! formula text, an evaluator bug, or runaway recursion).

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Faults raised by the tokenizer, parser, or evaluator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Formula text could not be tokenized
    #[error("Lex error at offset {offset}: {message}")]
    Lex { message: String, offset: usize },

    /// Token stream does not form a valid formula
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// Evaluation recursed past the depth cap
    #[error("Formula nesting exceeds the evaluation depth limit")]
    RecursionLimit,

    /// Internal invariant violation; indicates a bug, not bad input
    #[error("Internal error: {0}")]
    Internal(String),
}
