//! Tag tokenizer and structural parser for tempera templates.
//!
//! This crate turns template source text into an intermediate program:
//! - Tokenizer: splits source into literal text, `<template>` tag
//!   boundaries and opaque `<script>` elements.
//! - Structural parser: interprets tag attributes (`if`/`for`/`while`,
//!   `html`, `define`/`use`, `partial`/`wrap`, `context`), tracks nesting
//!   with an explicit stack of deferred closing obligations, and rewrites
//!   `{{ expr }}` markers in literal text.
//!
//! Partial references are collected, not resolved; the engine crate owns
//! file I/O and recursive compilation.
//!
//! # Example
//!
//! ```
//! let program = tempera_parser::parse("Hello {{ name }}").unwrap();
//! assert_eq!(program.instrs.len(), 2);
//! ```

mod error;
mod parser;
mod program;
mod span;
mod tokenizer;

pub use error::{CompileError, CompileErrorKind};
pub use parser::parse;
pub use program::{Instr, PartialRef, Program, ScopeKind};
pub use span::{LineIndex, Span};
pub use tokenizer::{tokenize, ScriptElement, Segment, TemplateClose, TemplateOpen, Text};
