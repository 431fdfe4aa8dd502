//! Embedded expression sub-language for the tempera template engine.
//!
//! This crate implements the closed expression language that tempera
//! templates embed in `{{ }}` markers, tag attributes and
//! `<script in-template>` blocks:
//! - literals (numbers, strings, booleans, null, arrays, objects)
//! - arithmetic, comparison and logic operators, ternaries
//! - property access, indexing
//! - `let` declarations, assignment, postfix `++`/`--`, statement sequences
//!
//! Evaluation runs against a scope chain: local frames first, then the
//! context value's own properties as unqualified names, then the context
//! itself under the name `context`.
//!
//! # Example
//!
//! ```
//! use tempera_expr::{eval, parse_expr, Env, Value};
//!
//! let json: serde_json::Value = serde_json::from_str(r#"{"n": 20}"#).unwrap();
//! let mut env = Env::new(Value::from_json(&json));
//! let expr = parse_expr("n * 2 + 2").unwrap();
//! assert_eq!(eval(&expr, &mut env).unwrap().to_output_string(), "42");
//! ```

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;
mod value;

pub use ast::{BinaryOp, Expr, ForSpec, Stmt, UnaryOp};
pub use error::ExprError;
pub use eval::{eval, exec, Env};
pub use parser::{parse_expr, parse_for_spec, parse_stmts};
pub use value::Value;

/// Returns true if `name` is a valid identifier of the expression language,
/// and therefore a valid mixin name.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
