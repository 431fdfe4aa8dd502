//! AST types for the expression sub-language.

use smol_str::SmolStr;

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// A numeric literal.
    Number(f64),
    /// A string literal (unescaped).
    Str(String),
    /// A free identifier, resolved through the scope chain at evaluation.
    Ident(SmolStr),
    /// Property access, `base.name`.
    Member(Box<Expr>, SmolStr),
    /// Index access, `base[index]`.
    Index(Box<Expr>, Box<Expr>),
    /// A call, `target(args…)`.
    Call(Box<Expr>, Vec<Expr>),
    /// A unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// A binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `cond ? then : else`
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// An array literal.
    Array(Vec<Expr>),
    /// An object literal with ordered entries.
    Object(Vec<(SmolStr, Expr)>),
    /// Assignment to a name, `name = value`.
    Assign(SmolStr, Box<Expr>),
    /// Postfix increment, `name++`.
    PostIncrement(SmolStr),
    /// Postfix decrement, `name--`.
    PostDecrement(SmolStr),
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+` (numeric addition, or concatenation when either side is a string)
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&` (short-circuiting)
    And,
    /// `||` (short-circuiting)
    Or,
}

/// A statement, as found in `<script in-template>` blocks and `for` clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `let name = expr` (initializer optional).
    Let(SmolStr, Option<Expr>),
    /// A bare expression evaluated for its effect.
    Expr(Expr),
}

/// The clauses of a `for` scope.
///
/// Either C-style `init; cond; update` or a bare condition (in which case the
/// loop behaves like `while`).
#[derive(Debug, Clone, PartialEq)]
pub struct ForSpec {
    /// Run once, in a fresh local frame, before the first iteration.
    pub init: Vec<Stmt>,
    /// Checked before each iteration; absent means loop forever.
    pub cond: Option<Expr>,
    /// Run after each iteration.
    pub update: Vec<Stmt>,
}
