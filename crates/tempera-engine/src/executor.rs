//! The async render executor.
//!
//! Walks a compiled program's instruction tree against an expression
//! environment, appending to a single output accumulator. Recursion into
//! scope bodies, mixin bodies and included partials is boxed so the
//! interpreter can follow arbitrarily nested programs.
//!
//! Context derivation rules:
//! - mixin call or inclusion with an explicit `context` attribute: the
//!   evaluated value becomes the entire context; inclusions additionally
//!   start with no visible mixins.
//! - mixin call without `context`: the current context merged with
//!   `content` set to the captured inner output (empty for self-closing).
//! - inclusion without `context` and without inner content: the current
//!   context merged with an empty `content`.
//! - inclusion without `context` but with inner content (wrapping): the
//!   context is only `{content: <captured>}`. Surrounding properties do
//!   not leak into the wrapped file; mixins defined in the inner content
//!   do carry across, which is how wrap layouts receive blocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

use tempera_expr::{eval, exec, Env, Value};
use tempera_parser::{Instr, ScopeKind};

use crate::error::EngineError;
use crate::escape::escape_html;
use crate::template::{CompiledProgram, PartialMap};

/// Mixins visible at a point of execution, in definition order.
pub(crate) type Mixins = IndexMap<SmolStr, MixinDef>;

/// An installed mixin. It keeps the partial map of the program that
/// defined it, so its body renders inclusions against the defining file's
/// references even when called from another template.
#[derive(Clone)]
pub(crate) struct MixinDef {
    body: Arc<[Instr]>,
    partials: Arc<PartialMap>,
}

/// Renders a compiled program to a string.
pub(crate) async fn run(compiled: &CompiledProgram, ctx: Value) -> Result<String, EngineError> {
    let mut out = String::new();
    let mut env = Env::new(ctx);
    let mut mixins = Mixins::new();
    exec_block(
        &compiled.program.instrs,
        &mut env,
        &mut mixins,
        &compiled.partials,
        &mut out,
    )
    .await?;
    Ok(out)
}

fn exec_block<'a>(
    instrs: &'a [Instr],
    env: &'a mut Env,
    mixins: &'a mut Mixins,
    partials: &'a Arc<PartialMap>,
    out: &'a mut String,
) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
    Box::pin(async move {
        for instr in instrs {
            match instr {
                Instr::Text(text) => out.push_str(text),

                Instr::Emit { expr, escape, line } => {
                    let value = eval(expr, env).map_err(EngineError::eval(*line))?;
                    let text = value.to_output_string();
                    if *escape {
                        out.push_str(&escape_html(&text));
                    } else {
                        out.push_str(&text);
                    }
                }

                Instr::Stmts { stmts, line } => {
                    exec(stmts, env).map_err(EngineError::eval(*line))?;
                }

                Instr::Scope { kind, body, line } => match kind {
                    ScopeKind::If(cond) => {
                        if eval(cond, env).map_err(EngineError::eval(*line))?.is_truthy() {
                            exec_block(body, env, mixins, partials, out).await?;
                        }
                    }
                    ScopeKind::While(cond) => {
                        while eval(cond, env).map_err(EngineError::eval(*line))?.is_truthy() {
                            exec_block(body, env, mixins, partials, out).await?;
                        }
                    }
                    ScopeKind::For(spec) => {
                        env.push_frame();
                        let result: Result<(), EngineError> = async {
                            exec(&spec.init, env).map_err(EngineError::eval(*line))?;
                            loop {
                                if let Some(cond) = &spec.cond {
                                    if !eval(cond, env)
                                        .map_err(EngineError::eval(*line))?
                                        .is_truthy()
                                    {
                                        break;
                                    }
                                }
                                exec_block(body, env, mixins, partials, out).await?;
                                exec(&spec.update, env).map_err(EngineError::eval(*line))?;
                            }
                            Ok(())
                        }
                        .await;
                        env.pop_frame();
                        result?;
                    }
                },

                Instr::Define { name, body, line: _ } => {
                    mixins.insert(
                        name.clone(),
                        MixinDef {
                            body: Arc::clone(body),
                            partials: Arc::clone(partials),
                        },
                    );
                }

                Instr::Call {
                    name,
                    context,
                    body,
                    line,
                } => {
                    let mixin = mixins.get(name).cloned().ok_or_else(|| {
                        EngineError::UnknownMixin {
                            name: name.to_string(),
                            line: *line,
                        }
                    })?;
                    let captured = match body {
                        Some(inner) => {
                            let mut buf = String::new();
                            exec_block(inner, env, mixins, partials, &mut buf).await?;
                            buf
                        }
                        None => String::new(),
                    };
                    let ctx = match context {
                        Some(expr) => eval(expr, env).map_err(EngineError::eval(*line))?,
                        None => with_content(env.context(), captured),
                    };
                    let mut sub_env = Env::new(ctx);
                    let mut sub_mixins = mixins.clone();
                    let mixin_body: &[Instr] = &mixin.body;
                    exec_block(mixin_body, &mut sub_env, &mut sub_mixins, &mixin.partials, out)
                        .await?;
                }

                Instr::Include {
                    path,
                    context,
                    body,
                    line,
                } => {
                    let template = partials.get(path).cloned().ok_or_else(|| {
                        EngineError::UnresolvedPartial { path: path.clone() }
                    })?;
                    let captured = match body {
                        Some(inner) => {
                            let mut buf = String::new();
                            exec_block(inner, env, mixins, partials, &mut buf).await?;
                            Some(buf)
                        }
                        None => None,
                    };
                    let (ctx, mut sub_mixins) = match (context, captured) {
                        // Explicit context isolates the partial completely.
                        (Some(expr), _) => (
                            eval(expr, env).map_err(EngineError::eval(*line))?,
                            Mixins::new(),
                        ),
                        (None, None) => {
                            (with_content(env.context(), String::new()), mixins.clone())
                        }
                        (None, Some(content)) => {
                            let mut map = IndexMap::new();
                            map.insert("content".to_string(), Value::Str(content));
                            (Value::Object(map), mixins.clone())
                        }
                    };
                    let compiled = template.compiled().await?;
                    let mut sub_env = Env::new(ctx);
                    exec_block(
                        &compiled.program.instrs,
                        &mut sub_env,
                        &mut sub_mixins,
                        &compiled.partials,
                        out,
                    )
                    .await?;
                }
            }
        }
        Ok(())
    })
}

/// The current context merged with a `content` property. Non-object
/// contexts are replaced by a fresh object.
fn with_content(ctx: &Value, content: String) -> Value {
    let mut map = match ctx {
        Value::Object(map) => map.clone(),
        _ => IndexMap::new(),
    };
    map.insert("content".to_string(), Value::Str(content));
    Value::Object(map)
}
