//! The intermediate program produced by the structural parser.
//!
//! Instructions form a tree: control-flow scopes, mixin definitions and
//! content-capturing calls/inclusions carry their bodies inline. The
//! matched open/close invariant of the tag language is therefore structural
//! here; the parser's nesting stack is what enforces it.

use smol_str::SmolStr;
use std::sync::Arc;
use tempera_expr::{Expr, ForSpec, Stmt};

/// A compiled template program.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Top-level instructions, in document order.
    pub instrs: Vec<Instr>,
    /// Every partial path referenced anywhere in the program, with the line
    /// of the referencing tag. The engine resolves these before rendering.
    pub partial_refs: Vec<PartialRef>,
}

/// A partial/wrap reference found during parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialRef {
    /// The path exactly as written in the tag.
    pub path: String,
    /// 1-based line of the referencing tag.
    pub line: u32,
}

/// One instruction.
#[derive(Debug, Clone)]
pub enum Instr {
    /// Append literal text to the current output accumulator.
    Text(String),
    /// Evaluate an expression and append its stringified result, escaped
    /// unless the tag used the `html` attribute.
    Emit {
        /// The expression to evaluate.
        expr: Expr,
        /// Whether to HTML-entity-escape the result.
        escape: bool,
        /// 1-based source line, for runtime error context.
        line: u32,
    },
    /// Execute `<script in-template>` statements; emits nothing.
    Stmts {
        /// The statements, in order.
        stmts: Vec<Stmt>,
        /// 1-based source line of the script tag.
        line: u32,
    },
    /// A control-flow scope (`if` / `for` / `while`).
    Scope {
        /// The kind and its expression(s).
        kind: ScopeKind,
        /// The scope body.
        body: Vec<Instr>,
        /// 1-based source line of the opening tag.
        line: u32,
    },
    /// Install a named mixin. The body is shared so an installed mixin can
    /// outlive the defining instruction and cross partial boundaries.
    Define {
        /// The mixin name.
        name: SmolStr,
        /// The mixin body.
        body: Arc<[Instr]>,
        /// 1-based source line of the defining tag.
        line: u32,
    },
    /// Invoke a mixin by name.
    Call {
        /// The mixin name.
        name: SmolStr,
        /// Explicit `context` attribute expression, if any.
        context: Option<Expr>,
        /// Captured inner content for non-self-closing tags.
        body: Option<Vec<Instr>>,
        /// 1-based source line of the tag.
        line: u32,
    },
    /// Include a partial template.
    Include {
        /// The path exactly as written; resolved by the engine.
        path: String,
        /// Explicit `context` attribute expression, if any.
        context: Option<Expr>,
        /// Captured inner content for non-self-closing tags.
        body: Option<Vec<Instr>>,
        /// 1-based source line of the tag.
        line: u32,
    },
}

/// The kind of a control-flow scope.
#[derive(Debug, Clone)]
pub enum ScopeKind {
    /// Render the body once if the condition is truthy.
    If(Expr),
    /// Re-evaluate the condition before each iteration.
    While(Expr),
    /// C-style clauses (or a bare condition) in a fresh local frame.
    For(ForSpec),
}
