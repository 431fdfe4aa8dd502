//! Structural parser / program generator.
//!
//! Consumes the tokenizer's segments left to right, keeping an explicit
//! nesting stack of open `<template>` tags. Each open tag queues its
//! closing obligations (a single tag may combine several, e.g. `if` and
//! `for`); the matching close tag, or the tag's own `/>`, pops them in
//! innermost-first order.

use crate::error::{CompileError, CompileErrorKind};
use crate::program::{Instr, PartialRef, Program, ScopeKind};
use crate::span::LineIndex;
use crate::tokenizer::{tokenize, ScriptElement, Segment, TemplateOpen};
use smol_str::SmolStr;
use std::sync::Arc;
use tempera_expr::{is_valid_identifier, parse_expr, parse_for_spec, parse_stmts, Expr};
use text_size::TextSize;

/// Parses template source into an intermediate program.
pub fn parse(source: &str) -> Result<Program, CompileError> {
    StructuralParser::new(source).run(tokenize(source))
}

/// A queued closing obligation of an open tag.
enum Closer {
    Scope {
        kind: ScopeKind,
        line: u32,
    },
    Define {
        name: SmolStr,
        line: u32,
    },
    Call {
        name: SmolStr,
        context: Option<Expr>,
        line: u32,
    },
    Include {
        path: String,
        context: Option<Expr>,
        line: u32,
    },
}

/// One entry of the nesting stack.
struct OpenTag {
    line: u32,
    closers: Vec<Closer>,
}

struct StructuralParser {
    line_index: LineIndex,
    /// Instructions being accumulated for the innermost open body.
    current: Vec<Instr>,
    /// Suspended outer bodies, one per queued closer.
    saved: Vec<Vec<Instr>>,
    stack: Vec<OpenTag>,
    partial_refs: Vec<PartialRef>,
}

impl StructuralParser {
    fn new(source: &str) -> Self {
        Self {
            line_index: LineIndex::new(source),
            current: Vec::new(),
            saved: Vec::new(),
            stack: Vec::new(),
            partial_refs: Vec::new(),
        }
    }

    fn run(mut self, segments: Vec<Segment>) -> Result<Program, CompileError> {
        for segment in segments {
            match segment {
                Segment::Text(text) => self.literal(&text.text, text.span.start)?,
                Segment::TemplateOpen(tag) => self.open_tag(&tag)?,
                Segment::TemplateClose(tag) => {
                    let line = self.line_index.line_of(tag.span.start);
                    let entry = self.stack.pop().ok_or_else(|| {
                        CompileError::new(CompileErrorKind::UnmatchedClosingTag, line)
                    })?;
                    self.unwind(entry);
                }
                Segment::Script(script) => self.script(&script)?,
            }
        }

        if let Some(entry) = self.stack.pop() {
            return Err(CompileError::new(CompileErrorKind::UnclosedTag, entry.line));
        }
        Ok(Program {
            instrs: self.current,
            partial_refs: self.partial_refs,
        })
    }

    // === Sink management ===

    fn push_sink(&mut self) {
        self.saved.push(std::mem::take(&mut self.current));
    }

    fn pop_sink(&mut self) -> Vec<Instr> {
        std::mem::replace(&mut self.current, self.saved.pop().unwrap_or_default())
    }

    /// Emits the queued closing instructions for an open tag, innermost
    /// obligations first.
    fn unwind(&mut self, entry: OpenTag) {
        for closer in entry.closers.into_iter().rev() {
            let body = self.pop_sink();
            let instr = match closer {
                Closer::Scope { kind, line } => Instr::Scope { kind, body, line },
                Closer::Define { name, line } => Instr::Define {
                    name,
                    body: Arc::from(body),
                    line,
                },
                Closer::Call {
                    name,
                    context,
                    line,
                } => Instr::Call {
                    name,
                    context,
                    body: Some(body),
                    line,
                },
                Closer::Include {
                    path,
                    context,
                    line,
                } => Instr::Include {
                    path,
                    context,
                    body: Some(body),
                    line,
                },
            };
            self.current.push(instr);
        }
    }

    // === Segment handlers ===

    /// Literal text: rewrite `{{ expr }}` markers into escaped emits and
    /// pass the remaining text through verbatim.
    fn literal(&mut self, text: &str, base: TextSize) -> Result<(), CompileError> {
        let mut cursor = 0;
        while let Some(open) = text[cursor..].find("{{") {
            let open = cursor + open;
            if open > cursor {
                self.current.push(Instr::Text(text[cursor..open].to_string()));
            }
            let expr_start = open + 2;
            let Some(close) = text[expr_start..].find("}}") else {
                // No closing marker; the rest is literal
                self.current.push(Instr::Text(text[open..].to_string()));
                return Ok(());
            };
            // Tolerate one literal '}' inside the expression before the
            // true closing '}}' (object literals: `{{ {x: 1}}}`)
            let mut close = expr_start + close;
            if text.as_bytes().get(close + 2) == Some(&b'}') {
                close += 1;
            }
            let line = self
                .line_index
                .line_of(base + TextSize::from(open as u32));
            let expr = parse_expr(text[expr_start..close].trim())
                .map_err(|e| CompileError::new(e.into(), line))?;
            self.current.push(Instr::Emit {
                expr,
                escape: true,
                line,
            });
            cursor = close + 2;
        }
        if cursor < text.len() {
            self.current.push(Instr::Text(text[cursor..].to_string()));
        }
        Ok(())
    }

    /// `<script>` elements: an `in-template` marker makes the body
    /// executable statements; anything else passes through to the output
    /// verbatim, unexecuted.
    fn script(&mut self, script: &ScriptElement) -> Result<(), CompileError> {
        let line = self.line_index.line_of(script.span.start);
        let marked = parse_attrs(&script.attrs)
            .iter()
            .any(|attr| attr.name == "in-template");
        if marked {
            let stmts = parse_stmts(&script.body)
                .map_err(|e| CompileError::new(e.into(), line))?;
            self.current.push(Instr::Stmts { stmts, line });
        } else {
            self.current.push(Instr::Text(script.raw.clone()));
        }
        Ok(())
    }

    fn open_tag(&mut self, tag: &TemplateOpen) -> Result<(), CompileError> {
        let line = self.line_index.line_of(tag.span.start);
        let mut closers: Vec<Closer> = Vec::new();
        let mut pending_use: Option<SmolStr> = None;
        let mut pending_partial: Option<String> = None;
        let mut context_override: Option<Expr> = None;

        for attr in parse_attrs(&tag.attrs) {
            match attr.name.as_str() {
                "if" => {
                    let expr = attr_expr(&attr, line)?;
                    self.push_sink();
                    closers.push(Closer::Scope {
                        kind: ScopeKind::If(expr),
                        line,
                    });
                }
                "while" => {
                    let expr = attr_expr(&attr, line)?;
                    self.push_sink();
                    closers.push(Closer::Scope {
                        kind: ScopeKind::While(expr),
                        line,
                    });
                }
                "for" => {
                    let value = attr_value(&attr, line)?;
                    let spec = parse_for_spec(strip_markers(value))
                        .map_err(|e| CompileError::new(e.into(), line))?;
                    self.push_sink();
                    closers.push(Closer::Scope {
                        kind: ScopeKind::For(spec),
                        line,
                    });
                }
                "html" => {
                    let expr = attr_expr(&attr, line)?;
                    self.current.push(Instr::Emit {
                        expr,
                        escape: false,
                        line,
                    });
                }
                "define" => {
                    let name = strip_markers(attr_value(&attr, line)?);
                    if !is_valid_identifier(name) {
                        return Err(CompileError::new(
                            CompileErrorKind::InvalidMixinName {
                                name: name.to_string(),
                            },
                            line,
                        ));
                    }
                    self.push_sink();
                    closers.push(Closer::Define {
                        name: SmolStr::new(name),
                        line,
                    });
                }
                "use" => {
                    pending_use = Some(mixin_reference(&attr, line)?);
                }
                "partial" | "wrap" => {
                    pending_partial = Some(partial_path(&attr, line)?);
                }
                "context" => {
                    context_override = Some(attr_expr(&attr, line)?);
                }
                other => {
                    return Err(CompileError::new(
                        CompileErrorKind::UnknownAttribute {
                            name: other.to_string(),
                        },
                        line,
                    ));
                }
            }
        }

        // use/partial resolve only after every attribute is processed, so a
        // `context` attribute applies regardless of its position in the tag
        if let Some(name) = pending_use {
            if tag.self_closing {
                self.current.push(Instr::Call {
                    name,
                    context: context_override.clone(),
                    body: None,
                    line,
                });
            } else {
                self.push_sink();
                closers.push(Closer::Call {
                    name,
                    context: context_override.clone(),
                    line,
                });
            }
        }
        if let Some(path) = pending_partial {
            self.partial_refs.push(PartialRef {
                path: path.clone(),
                line,
            });
            if tag.self_closing {
                self.current.push(Instr::Include {
                    path,
                    context: context_override,
                    body: None,
                    line,
                });
            } else {
                self.push_sink();
                closers.push(Closer::Include {
                    path,
                    context: context_override,
                    line,
                });
            }
        }

        if tag.self_closing {
            self.unwind(OpenTag { line, closers });
        } else {
            self.stack.push(OpenTag { line, closers });
        }
        Ok(())
    }
}

/// A raw attribute from a tag.
#[derive(Debug, Clone, PartialEq)]
struct RawAttr {
    name: String,
    value: Option<String>,
}

/// Splits a tag's attribute source into name/value pairs. Values may be
/// quoted with `"` or `'` (and may then contain any character, including
/// `>`), or bare.
fn parse_attrs(source: &str) -> Vec<RawAttr> {
    let bytes = source.as_bytes();
    let mut attrs = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let name_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' {
            i += 1;
        }
        let name = source[name_start..i].to_string();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = None;
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                value = Some(source[value_start..i].to_string());
                if i < bytes.len() {
                    i += 1;
                }
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = Some(source[value_start..i].to_string());
            }
        }
        if !name.is_empty() {
            attrs.push(RawAttr { name, value });
        }
    }
    attrs
}

/// Strips an optional `{{ }}` wrapper: attribute values may be written as
/// raw expressions or marker-wrapped, and both forms mean the same thing.
fn strip_markers(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("{{")
        .and_then(|inner| inner.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn attr_value(attr: &RawAttr, line: u32) -> Result<&str, CompileError> {
    attr.value.as_deref().ok_or_else(|| {
        CompileError::new(
            CompileErrorKind::MissingAttributeValue {
                name: attr.name.clone(),
            },
            line,
        )
    })
}

fn attr_expr(attr: &RawAttr, line: u32) -> Result<Expr, CompileError> {
    let value = attr_value(attr, line)?;
    parse_expr(strip_markers(value)).map_err(|e| CompileError::new(e.into(), line))
}

/// A `use` value must name a mixin: a bare identifier, or a string literal
/// holding one.
fn mixin_reference(attr: &RawAttr, line: u32) -> Result<SmolStr, CompileError> {
    let value = strip_markers(attr_value(attr, line)?);
    if is_valid_identifier(value) {
        return Ok(SmolStr::new(value));
    }
    if let Ok(Expr::Str(name)) = parse_expr(value) {
        if is_valid_identifier(&name) {
            return Ok(SmolStr::new(name));
        }
    }
    Err(CompileError::new(
        CompileErrorKind::InvalidMixinReference {
            value: value.to_string(),
        },
        line,
    ))
}

/// A partial path: a string literal when the value parses as one, otherwise
/// the raw attribute text.
fn partial_path(attr: &RawAttr, line: u32) -> Result<String, CompileError> {
    let value = strip_markers(attr_value(attr, line)?);
    if let Ok(Expr::Str(path)) = parse_expr(value) {
        return Ok(path);
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_literal_only() {
        let program = parse("hello world").unwrap();
        assert_eq!(program.instrs.len(), 1);
        assert!(matches!(&program.instrs[0], Instr::Text(t) if t == "hello world"));
    }

    #[test]
    fn test_interpolation_split() {
        let program = parse("a {{ x }} b").unwrap();
        assert_eq!(program.instrs.len(), 3);
        assert!(matches!(&program.instrs[0], Instr::Text(t) if t == "a "));
        assert!(matches!(&program.instrs[1], Instr::Emit { escape: true, .. }));
        assert!(matches!(&program.instrs[2], Instr::Text(t) if t == " b"));
    }

    #[test]
    fn test_interpolation_tolerates_one_brace() {
        let program = parse("{{ {x: 1}}}").unwrap();
        assert_eq!(program.instrs.len(), 1);
        let Instr::Emit { expr, .. } = &program.instrs[0] else {
            panic!("expected emit");
        };
        assert!(matches!(expr, Expr::Object(entries) if entries.len() == 1));
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let program = parse("x {{ y").unwrap();
        assert_eq!(program.instrs.len(), 2);
        assert!(matches!(&program.instrs[1], Instr::Text(t) if t == "{{ y"));
    }

    #[test]
    fn test_if_scope() {
        let program = parse(r#"<template if="x">body</template>"#).unwrap();
        assert_eq!(program.instrs.len(), 1);
        let Instr::Scope { kind, body, .. } = &program.instrs[0] else {
            panic!("expected scope");
        };
        assert!(matches!(kind, ScopeKind::If(_)));
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_combined_if_and_for() {
        let program = parse(r#"<template if="x" for="let i=0;i<3;i++">{{ i }}</template>"#)
            .unwrap();
        assert_eq!(program.instrs.len(), 1);
        let Instr::Scope { kind, body, .. } = &program.instrs[0] else {
            panic!("expected outer if scope");
        };
        assert!(matches!(kind, ScopeKind::If(_)));
        assert_eq!(body.len(), 1);
        assert!(matches!(
            &body[0],
            Instr::Scope { kind: ScopeKind::For(_), .. }
        ));
    }

    #[test]
    fn test_html_attribute_is_unescaped_emit() {
        let program = parse(r#"<template html="markup"/>"#).unwrap();
        assert!(matches!(&program.instrs[0], Instr::Emit { escape: false, .. }));
    }

    #[test]
    fn test_define_and_use() {
        let program =
            parse(r#"<template define="hi">Hi {{ content }}</template><template use="hi">World</template>"#)
                .unwrap();
        assert_eq!(program.instrs.len(), 2);
        assert!(matches!(&program.instrs[0], Instr::Define { name, .. } if name == "hi"));
        let Instr::Call { name, body, context, .. } = &program.instrs[1] else {
            panic!("expected call");
        };
        assert_eq!(name, "hi");
        assert!(context.is_none());
        assert!(body.is_some());
    }

    #[test]
    fn test_self_closing_use_has_no_body() {
        let program = parse(r#"<template use="hi"/>"#).unwrap();
        assert!(matches!(&program.instrs[0], Instr::Call { body: None, .. }));
    }

    #[test]
    fn test_define_requires_identifier() {
        let err = parse(r#"<template define="not a name">x</template>"#).unwrap_err();
        assert!(matches!(
            err.kind,
            CompileErrorKind::InvalidMixinName { .. }
        ));
    }

    #[test]
    fn test_partial_collects_reference() {
        let program = parse(r#"<template partial="./header.html"/>"#).unwrap();
        assert_eq!(
            program.partial_refs,
            vec![PartialRef {
                path: "./header.html".to_string(),
                line: 1
            }]
        );
        assert!(matches!(&program.instrs[0], Instr::Include { body: None, .. }));
    }

    #[test]
    fn test_wrap_is_alias_for_partial() {
        let program = parse(r#"<template wrap="./layout.html">inner</template>"#).unwrap();
        let Instr::Include { path, body, .. } = &program.instrs[0] else {
            panic!("expected include");
        };
        assert_eq!(path, "./layout.html");
        assert!(body.is_some());
    }

    #[test]
    fn test_context_attribute_before_use() {
        let program = parse(r#"<template context="{{ {x: 1} }}" use="hi"/>"#).unwrap();
        assert!(matches!(
            &program.instrs[0],
            Instr::Call { context: Some(_), .. }
        ));
    }

    #[test]
    fn test_unknown_attribute_with_line() {
        let err = parse("line one\n<template bogus=\"x\">y</template>").unwrap_err();
        assert!(matches!(
            &err.kind,
            CompileErrorKind::UnknownAttribute { name } if name == "bogus"
        ));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unmatched_close() {
        let err = parse("text</template>").unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::UnmatchedClosingTag));
    }

    #[test]
    fn test_unclosed_at_eof() {
        let err = parse(r#"<template if="x">never closed"#).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::UnclosedTag));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_nested_scopes_close_in_order() {
        let program = parse(
            r#"<template if="a"><template while="b">x</template></template>"#,
        )
        .unwrap();
        let Instr::Scope { body, .. } = &program.instrs[0] else {
            panic!("expected if scope");
        };
        assert!(matches!(
            &body[0],
            Instr::Scope { kind: ScopeKind::While(_), .. }
        ));
    }

    #[test]
    fn test_script_in_template_is_statements() {
        let program = parse("<script in-template>let x = 1;</script>").unwrap();
        assert!(matches!(&program.instrs[0], Instr::Stmts { stmts, .. } if stmts.len() == 1));
    }

    #[test]
    fn test_plain_script_passes_through() {
        let source = "<script>alert(1)</script>";
        let program = parse(source).unwrap();
        assert!(matches!(&program.instrs[0], Instr::Text(t) if t == source));
    }

    #[test]
    fn test_attr_value_marker_and_raw_equivalent() {
        let raw = parse(r#"<template if="x">y</template>"#).unwrap();
        let wrapped = parse(r#"<template if="{{ x }}">y</template>"#).unwrap();
        let (Instr::Scope { kind: ScopeKind::If(a), .. }, Instr::Scope { kind: ScopeKind::If(b), .. }) =
            (&raw.instrs[0], &wrapped.instrs[0])
        else {
            panic!("expected scopes");
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_attrs_quoted_gt() {
        let attrs = parse_attrs(r#" if="a > b" html='c'"#);
        assert_eq!(
            attrs,
            vec![
                RawAttr {
                    name: "if".to_string(),
                    value: Some("a > b".to_string())
                },
                RawAttr {
                    name: "html".to_string(),
                    value: Some("c".to_string())
                },
            ]
        );
    }

    #[test]
    fn test_parse_attrs_bare_value_and_flag() {
        let attrs = parse_attrs(" in-template type=module");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "in-template");
        assert_eq!(attrs[0].value, None);
        assert_eq!(attrs[1].value.as_deref(), Some("module"));
    }
}
