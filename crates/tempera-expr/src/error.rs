//! Expression errors.

use thiserror::Error;

/// An error produced while parsing or evaluating an expression.
#[derive(Debug, Clone, Error)]
pub enum ExprError {
    /// The expression source could not be parsed.
    #[error("expression syntax error: {message}")]
    Syntax {
        /// A description of the problem.
        message: String,
        /// Byte offset into the expression source.
        offset: usize,
    },

    /// A free identifier resolved neither to a local, a context property,
    /// nor the context itself.
    #[error("undefined identifier: {name}")]
    UndefinedIdentifier {
        /// The unresolved name.
        name: String,
    },

    /// An operation was applied to values of the wrong type.
    #[error("type error: {message}")]
    Type {
        /// A description of the problem.
        message: String,
    },

    /// A call expression targeted a value that is not callable.
    #[error("not callable: {target}")]
    NotCallable {
        /// A description of the call target.
        target: String,
    },

    /// The left-hand side of an assignment or increment was not a name.
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
}

impl ExprError {
    /// Creates a syntax error at the given offset.
    pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            offset,
        }
    }

    /// Creates a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }
}
