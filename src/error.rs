//! Crate-wide error taxonomy.
//!
//! One enum per spec error kind family (Syntax, Binding, Structural, Semantic,
//! Resource, Data integrity), following the teacher's convention of a single
//! `#[derive(Error)]` enum with `#[from]` conversions and a local `Result`
//! alias (see `storage::error::StorageError`).

use thiserror::Error;

/// Crate-wide result alias.
pub type CoreResult<T> = Result<T, CoreError>;

/// A single DSL syntax error with source position.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SyntaxError {
    pub line: usize,
    pub col: usize,
    pub expected: String,
    pub found: String,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}: expected {}, found {}",
            self.line, self.col, self.expected, self.found
        )
    }
}

/// Crate-wide error taxonomy.
///
/// Reasoning "failure to prove" is not modeled here — it is a legitimate
/// `ProveOutcome`/`{valid:false,...}` return value, not an `Err`. Resource
/// limits (`Timeout`, `SolutionCapReached`, `DepthExceeded`) likewise surface
/// as flags on ordinary return values, never as `Err`; they exist in this
/// enum only historically where a caller needs to short-circuit hard
/// (e.g. an executor abort mid-`learn`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    // --- Syntax ---
    #[error("syntax error: {0}")]
    Syntax(SyntaxError),

    // --- Binding ---
    #[error("unbound reference: ${0}")]
    UnboundReference(String),

    #[error("name already defined in current scope: {0}")]
    NameAlreadyDefined(String),

    #[error("hole ?{0} used outside a query context")]
    HoleInNonQueryContext(String),

    // --- Structural ---
    #[error("arity mismatch for operator {operator}: expected {expected}, found {found}")]
    ArityMismatch {
        operator: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("recursion limit exceeded (depth {0})")]
    RecursionLimit(usize),

    // --- Semantic ---
    #[error("contradiction: {operator}({args:?}) conflicts with an existing fact of opposite polarity")]
    Contradiction { operator: String, args: Vec<String> },

    #[error("strategy mismatch: {0} vs {1}")]
    StrategyMismatch(String, String),

    // --- Resource ---
    #[error("depth exceeded: {0}")]
    DepthExceeded(usize),

    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    #[error("solution cap reached: {0}")]
    SolutionCapReached(usize),

    // --- Data integrity (fatal; closes the session) ---
    #[error("vocabulary hash collision for name {0}")]
    VocabularyHashCollision(String),

    #[error("vector corruption detected: {0}")]
    VectorCorruption(String),

    // --- Config / host-facing ---
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl From<SyntaxError> for CoreError {
    fn from(e: SyntaxError) -> Self {
        CoreError::Syntax(e)
    }
}

impl CoreError {
    /// True for the subset of errors that close the session outright
    /// (spec.md §7: "Data-integrity errors are unrecoverable and close the
    /// session").
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::VocabularyHashCollision(_) | CoreError::VectorCorruption(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let e = SyntaxError {
            line: 3,
            col: 7,
            expected: "IDENT".into(),
            found: "NEWLINE".into(),
        };
        assert_eq!(format!("{e}"), "3:7: expected IDENT, found NEWLINE");
    }

    #[test]
    fn data_integrity_errors_are_fatal() {
        assert!(CoreError::VectorCorruption("x".into()).is_fatal());
        assert!(!CoreError::Timeout(10).is_fatal());
    }
}
