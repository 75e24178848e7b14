//! Compiler errors
//!
//! These are host-side failures, distinct from the JS `SyntaxError`s the
//! parser reports: the engine facade converts both into JS error values at
//! the eval boundary, but an `Internal` compile error indicates a compiler
//! bug rather than bad input.

use thiserror::Error;

/// Errors produced while lowering an AST to bytecode.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// A deferred early error (e.g. an assignment target only detectable
    /// during lowering)
    #[error("{message} (line {line}, column {column})")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
    },

    /// Too many locals, constants, or arguments for the encoding
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),

    /// Internal consistency failure
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CompileError {
    /// Syntax-class error at a source position.
    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    /// Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
