//! Engine error types.

use camino::Utf8PathBuf;
use tempera_expr::ExprError;
use tempera_parser::CompileError;
use thiserror::Error;

/// An error from compiling or rendering a template.
///
/// There is no partial-success mode: a failing instruction aborts the whole
/// render and no output is returned.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The template source failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// An embedded expression failed during rendering.
    #[error("line {line}: {source}")]
    Eval {
        /// 1-based line of the failing instruction.
        line: u32,
        /// The underlying expression error.
        source: ExprError,
    },

    /// A template or partial file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that failed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A `use` tag named a mixin that is not defined at the call site.
    #[error("line {line}: unknown mixin: {name}")]
    UnknownMixin {
        /// The missing mixin name.
        name: String,
        /// 1-based line of the call.
        line: u32,
    },

    /// An include instruction referenced a partial that resolution never
    /// produced. Indicates a compilation that was not run to completion.
    #[error("unresolved partial: {path}")]
    UnresolvedPartial {
        /// The path as written in the tag.
        path: String,
    },
}

impl EngineError {
    /// Wraps an I/O failure with the path it concerned.
    pub(crate) fn io(path: impl AsRef<camino::Utf8Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_owned(),
            source,
        }
    }

    /// Wraps an expression error with the line of the failing instruction.
    pub(crate) fn eval(line: u32) -> impl FnOnce(ExprError) -> Self {
        move |source| Self::Eval { line, source }
    }
}
