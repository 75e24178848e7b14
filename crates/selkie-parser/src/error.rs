//! Parse errors

use thiserror::Error;

/// Message category of a syntax error.
///
/// Categories keep lexer and parser failures distinguishable without
/// string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnexpectedToken,
    UnexpectedEof,
    InvalidNumber,
    InvalidBigInt,
    InvalidString,
    InvalidTemplate,
    InvalidRegExp,
    InvalidEscape,
    InvalidIdentifier,
    UnterminatedComment,
    InvalidAssignmentTarget,
    DuplicateDeclaration,
    DuplicateParameter,
    DuplicatePrivateName,
    UndeclaredPrivateName,
    RestrictedProduction,
    IllegalReturn,
    IllegalBreak,
    IllegalContinue,
    IllegalAwait,
    IllegalYield,
    IllegalSuper,
    IllegalNewTarget,
    StrictModeViolation,
    Unsupported,
}

/// A syntax error with its source position.
#[derive(Debug, Clone, Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    /// Create an error at an explicit position.
    pub fn new(kind: SyntaxErrorKind, message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
        }
    }
}

/// Result type for lexing and parsing.
pub type ParseResult<T> = Result<T, ParseError>;
