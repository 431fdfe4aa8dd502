//! Compile error types.

use tempera_expr::ExprError;
use thiserror::Error;

/// An error that aborts template compilation.
///
/// Line numbers are 1-based and approximate: they point at the start of the
/// offending tag or marker.
#[derive(Debug, Clone, Error)]
#[error("line {line}: {kind}")]
pub struct CompileError {
    /// The kind of error.
    pub kind: CompileErrorKind,
    /// 1-based source line.
    pub line: u32,
}

impl CompileError {
    /// Creates a new compile error.
    pub fn new(kind: CompileErrorKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// The kind of compile error.
#[derive(Debug, Clone, Error)]
pub enum CompileErrorKind {
    /// A `</template>` with no matching open tag.
    #[error("unmatched closing </template> tag")]
    UnmatchedClosingTag,

    /// An open `<template>` left unclosed at end of input.
    #[error("unclosed <template> tag at end of input")]
    UnclosedTag,

    /// An attribute the tag grammar does not recognize.
    #[error("unknown template attribute: {name}")]
    UnknownAttribute {
        /// The offending attribute name.
        name: String,
    },

    /// An attribute that requires a value was written without one.
    #[error("attribute '{name}' requires a value")]
    MissingAttributeValue {
        /// The attribute name.
        name: String,
    },

    /// A `define` value that is not a valid identifier.
    #[error("invalid mixin name: {name:?}")]
    InvalidMixinName {
        /// The rejected name.
        name: String,
    },

    /// A `use` value that does not name a mixin.
    #[error("invalid mixin reference: {value:?}")]
    InvalidMixinReference {
        /// The rejected value.
        value: String,
    },

    /// A partial/wrap reference in a template with no file origin to
    /// resolve it against.
    #[error("partial reference requires the template to have a file origin")]
    PartialWithoutOrigin,

    /// An embedded expression failed to parse.
    #[error(transparent)]
    Expression(#[from] ExprError),
}
