//! Tree-walking evaluator over a scope chain.

use crate::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::error::ExprError;
use crate::value::Value;
use indexmap::IndexMap;
use smol_str::SmolStr;

/// The name under which the whole context value is addressable.
const CONTEXT_NAME: &str = "context";

/// An evaluation environment: the context value plus a stack of local
/// frames.
///
/// Name resolution order for a free identifier: local frames innermost
/// first, then the context's own properties, then `context` for the context
/// value itself. An identifier that resolves nowhere is an error, unlike a
/// missing object property, which is null.
#[derive(Debug, Clone)]
pub struct Env {
    ctx: Value,
    frames: Vec<IndexMap<SmolStr, Value>>,
}

impl Env {
    /// Creates an environment over the given context value.
    pub fn new(ctx: Value) -> Self {
        Self {
            ctx,
            frames: vec![IndexMap::new()],
        }
    }

    /// Returns the context value.
    pub fn context(&self) -> &Value {
        &self.ctx
    }

    /// Opens a new local frame (entering a `for` scope).
    pub fn push_frame(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// Closes the innermost local frame.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Declares a binding in the innermost frame, shadowing outer bindings.
    pub fn declare(&mut self, name: impl Into<SmolStr>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value.clone());
            }
        }
        if let Some(value) = self.ctx.get_property(name) {
            return Some(value);
        }
        if name == CONTEXT_NAME {
            return Some(self.ctx.clone());
        }
        None
    }

    /// Assigns to the nearest existing binding. An unbound name is created
    /// in the innermost frame, matching how undeclared assignment behaves in
    /// the source templating language.
    fn assign(&mut self, name: &SmolStr, value: Value) {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return;
            }
        }
        if let Value::Object(map) = &mut self.ctx {
            if let Some(slot) = map.get_mut(name.as_str()) {
                *slot = value;
                return;
            }
        }
        self.declare(name.clone(), value);
    }
}

/// Evaluates an expression against an environment.
pub fn eval(expr: &Expr, env: &mut Env) -> Result<Value, ExprError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Ident(name) => env
            .lookup(name)
            .ok_or_else(|| ExprError::UndefinedIdentifier {
                name: name.to_string(),
            }),
        Expr::Member(base, name) => {
            let base = eval(base, env)?;
            Ok(base.get_property(name).unwrap_or(Value::Null))
        }
        Expr::Index(base, index) => {
            let base = eval(base, env)?;
            let index = eval(index, env)?;
            let key = match &index {
                Value::Number(_) => index.to_output_string(),
                Value::Str(s) => s.clone(),
                other => {
                    return Err(ExprError::type_error(format!(
                        "cannot index with a {}",
                        other.type_name()
                    )))
                }
            };
            Ok(base.get_property(&key).unwrap_or(Value::Null))
        }
        Expr::Call(target, _args) => Err(ExprError::NotCallable {
            target: describe(target),
        }),
        Expr::Unary(op, operand) => {
            let operand = eval(operand, env)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                UnaryOp::Neg => Ok(Value::Number(-operand.as_number()?)),
            }
        }
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, env),
        Expr::Ternary(cond, then, otherwise) => {
            if eval(cond, env)?.is_truthy() {
                eval(then, env)
            } else {
                eval(otherwise, env)
            }
        }
        Expr::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval(item, env)?);
            }
            Ok(Value::Array(values))
        }
        Expr::Object(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.to_string(), eval(value, env)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Assign(name, value) => {
            let value = eval(value, env)?;
            env.assign(name, value.clone());
            Ok(value)
        }
        Expr::PostIncrement(name) => step(name, 1.0, env),
        Expr::PostDecrement(name) => step(name, -1.0, env),
    }
}

/// Executes a statement sequence for its effects.
pub fn exec(stmts: &[Stmt], env: &mut Env) -> Result<(), ExprError> {
    for stmt in stmts {
        match stmt {
            Stmt::Let(name, init) => {
                let value = match init {
                    Some(expr) => eval(expr, env)?,
                    None => Value::Null,
                };
                env.declare(name.clone(), value);
            }
            Stmt::Expr(expr) => {
                eval(expr, env)?;
            }
        }
    }
    Ok(())
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &mut Env) -> Result<Value, ExprError> {
    // && and || short-circuit and yield an operand, not a coerced bool
    match op {
        BinaryOp::And => {
            let left = eval(lhs, env)?;
            if !left.is_truthy() {
                return Ok(left);
            }
            return eval(rhs, env);
        }
        BinaryOp::Or => {
            let left = eval(lhs, env)?;
            if left.is_truthy() {
                return Ok(left);
            }
            return eval(rhs, env);
        }
        _ => {}
    }

    let left = eval(lhs, env)?;
    let right = eval(rhs, env)?;
    match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!(
                "{}{}",
                left.to_output_string(),
                right.to_output_string()
            ))),
            _ => Ok(Value::Number(left.as_number()? + right.as_number()?)),
        },
        BinaryOp::Sub => Ok(Value::Number(left.as_number()? - right.as_number()?)),
        BinaryOp::Mul => Ok(Value::Number(left.as_number()? * right.as_number()?)),
        BinaryOp::Div => Ok(Value::Number(left.as_number()? / right.as_number()?)),
        BinaryOp::Rem => Ok(Value::Number(left.as_number()? % right.as_number()?)),
        BinaryOp::Eq => Ok(Value::Bool(left.equals(&right))),
        BinaryOp::Ne => Ok(Value::Bool(!left.equals(&right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&left, &right)?;
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn compare(left: &Value, right: &Value) -> Result<std::cmp::Ordering, ExprError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            Ok(a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        }
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(ExprError::type_error(format!(
            "cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn step(name: &SmolStr, delta: f64, env: &mut Env) -> Result<Value, ExprError> {
    let current = env
        .lookup(name)
        .ok_or_else(|| ExprError::UndefinedIdentifier {
            name: name.to_string(),
        })?;
    let n = current.as_number()?;
    env.assign(name, Value::Number(n + delta));
    Ok(Value::Number(n))
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.to_string(),
        Expr::Member(_, name) => format!(".{name}"),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expr, parse_stmts};

    fn ctx(json: &str) -> Env {
        Env::new(Value::from_json(&serde_json::from_str(json).unwrap()))
    }

    fn eval_str(source: &str, env: &mut Env) -> Result<Value, ExprError> {
        eval(&parse_expr(source).unwrap(), env)
    }

    #[test]
    fn test_context_properties_unqualified() {
        let mut env = ctx(r#"{"name": "World", "n": 2}"#);
        let value = eval_str("name + '!'", &mut env).unwrap();
        assert!(value.equals(&Value::Str("World!".into())));
        let value = eval_str("n * 3", &mut env).unwrap();
        assert!(value.equals(&Value::Number(6.0)));
    }

    #[test]
    fn test_context_addressable_explicitly() {
        let mut env = ctx(r#"{"x": 1}"#);
        let value = eval_str("context.x", &mut env).unwrap();
        assert!(value.equals(&Value::Number(1.0)));
    }

    #[test]
    fn test_undefined_identifier_is_error() {
        let mut env = ctx("{}");
        assert!(matches!(
            eval_str("nope", &mut env),
            Err(ExprError::UndefinedIdentifier { .. })
        ));
    }

    #[test]
    fn test_missing_property_is_null() {
        let mut env = ctx(r#"{"user": {}}"#);
        let value = eval_str("user.missing", &mut env).unwrap();
        assert!(value.equals(&Value::Null));
    }

    #[test]
    fn test_locals_shadow_context() {
        let mut env = ctx(r#"{"x": 1}"#);
        env.push_frame();
        env.declare("x", Value::Number(9.0));
        assert!(eval_str("x", &mut env).unwrap().equals(&Value::Number(9.0)));
        env.pop_frame();
        assert!(eval_str("x", &mut env).unwrap().equals(&Value::Number(1.0)));
    }

    #[test]
    fn test_statements_mutate_locals() {
        let mut env = ctx("{}");
        exec(&parse_stmts("let x = 1; x = x + 2").unwrap(), &mut env).unwrap();
        assert!(eval_str("x", &mut env).unwrap().equals(&Value::Number(3.0)));
    }

    #[test]
    fn test_post_increment_returns_old_value() {
        let mut env = ctx("{}");
        env.declare("i", Value::Number(0.0));
        let value = eval_str("i++", &mut env).unwrap();
        assert!(value.equals(&Value::Number(0.0)));
        assert!(eval_str("i", &mut env).unwrap().equals(&Value::Number(1.0)));
    }

    #[test]
    fn test_short_circuit() {
        let mut env = ctx("{}");
        // rhs would be an undefined-identifier error if evaluated
        let value = eval_str("false && nope", &mut env).unwrap();
        assert!(!value.is_truthy());
        let value = eval_str("true || nope", &mut env).unwrap();
        assert!(value.is_truthy());
    }

    #[test]
    fn test_object_literal_and_index() {
        let mut env = ctx("{}");
        let value = eval_str("{x: 1}.x", &mut env).unwrap();
        assert!(value.equals(&Value::Number(1.0)));
        let value = eval_str("[10, 20][1]", &mut env).unwrap();
        assert!(value.equals(&Value::Number(20.0)));
    }

    #[test]
    fn test_call_is_not_callable() {
        let mut env = ctx(r#"{"f": 1}"#);
        assert!(matches!(
            eval_str("f()", &mut env),
            Err(ExprError::NotCallable { .. })
        ));
    }
}
