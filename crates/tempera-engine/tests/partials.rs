//! Partial resolution and wrapping against real files.

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use tempera_engine::{render_file, RenderOptions, Template};
use tempera_expr::Value;

fn ctx(json: &str) -> Value {
    Value::from_json(&serde_json::from_str(json).unwrap())
}

fn no_minify() -> RenderOptions {
    RenderOptions {
        minify: false,
        ..RenderOptions::default()
    }
}

struct Fixture {
    // Held so the directory outlives the test body.
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        Self { _dir: dir, root }
    }

    fn write(&self, name: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    async fn render(&self, path: &Utf8Path, json: &str) -> String {
        render_file(path, &ctx(json), &no_minify()).await.unwrap()
    }
}

#[tokio::test]
async fn test_partial_default_context_sees_parent_properties() {
    let fx = Fixture::new();
    fx.write("part.html", "[{{ name }}]");
    let page = fx.write("page.html", r#"A<template partial="./part.html"/>B"#);
    assert_eq!(fx.render(&page, r#"{"name": "x"}"#).await, "A[x]B");
}

#[tokio::test]
async fn test_partial_path_gets_default_extension() {
    let fx = Fixture::new();
    fx.write("part.html", "ok");
    let page = fx.write("page.html", r#"<template partial="part"/>"#);
    assert_eq!(fx.render(&page, "{}").await, "ok");
}

#[tokio::test]
async fn test_partial_exact_path_preferred_over_extension() {
    let fx = Fixture::new();
    fx.write("part", "exact");
    fx.write("part.html", "extended");
    let page = fx.write("page.html", r#"<template partial="part"/>"#);
    assert_eq!(fx.render(&page, "{}").await, "exact");
}

#[tokio::test]
async fn test_explicit_context_isolates_partial() {
    let fx = Fixture::new();
    fx.write("part.html", "[{{ context.name }}|{{ other }}]");
    let page = fx.write(
        "page.html",
        r#"<template partial="./part.html" context="{{ {other: 7} }}"/>"#,
    );
    assert_eq!(fx.render(&page, r#"{"name": "x"}"#).await, "[|7]");
}

#[tokio::test]
async fn test_wrap_passes_captured_content_only() {
    let fx = Fixture::new();
    fx.write("layout.html", "H[{{ content }}][{{ context.name }}]");
    let page = fx.write(
        "page.html",
        r#"<template wrap="./layout.html">Body {{ name }}</template>"#,
    );
    // Inner content renders with the page context; the layout sees only
    // the captured content.
    assert_eq!(fx.render(&page, r#"{"name": "x"}"#).await, "H[Body x][]");
}

#[tokio::test]
async fn test_mixins_defined_in_wrap_body_reach_layout() {
    let fx = Fixture::new();
    fx.write("layout.html", r#"<template use="block"/>"#);
    let page = fx.write(
        "page.html",
        r#"<template wrap="./layout.html"><template define="block">B!</template></template>"#,
    );
    assert_eq!(fx.render(&page, "{}").await, "B!");
}

#[tokio::test]
async fn test_partial_resolves_relative_to_its_own_file() {
    let fx = Fixture::new();
    fx.write("sub/inner.html", "deep");
    fx.write("sub/mid.html", r#"<template partial="./inner.html"/>"#);
    let page = fx.write("page.html", r#"<template partial="./sub/mid.html"/>"#);
    assert_eq!(fx.render(&page, "{}").await, "deep");
}

#[tokio::test]
async fn test_mutually_referencing_partials_compile() {
    let fx = Fixture::new();
    fx.write(
        "a.html",
        r#"A<template if="deep"><template partial="./b.html" context="{{ {deep: false} }}"/></template>"#,
    );
    fx.write(
        "b.html",
        r#"B<template if="deep"><template partial="./a.html" context="{{ {deep: false} }}"/></template>"#,
    );
    let page = fx.root.join("a.html");
    assert_eq!(fx.render(&page, r#"{"deep": true}"#).await, "AB");
}

#[tokio::test]
async fn test_cycle_back_to_entry_template_resolves_in_memory() {
    let fx = Fixture::new();
    let page = fx.write(
        "page.html",
        r#"P<template if="deep"><template partial="layout" context="{{ {deep: false} }}"/></template>"#,
    );
    fx.write(
        "layout.html",
        r#"L<template if="deep"><template partial="page" context="{{ {deep: false} }}"/></template>"#,
    );
    let template = Template::load(&page, false).await.unwrap();
    // The entry file disappears before first compilation; the layout's
    // reference back to it must reuse the already-loaded template instead
    // of reading the file again.
    std::fs::remove_file(&page).unwrap();
    let out = template.render(&ctx(r#"{"deep": true}"#)).await.unwrap();
    assert_eq!(out, "PL");
}

#[tokio::test]
async fn test_missing_partial_reports_io_error() {
    let fx = Fixture::new();
    let page = fx.write("page.html", r#"<template partial="./gone.html"/>"#);
    let err = render_file(&page, &ctx("{}"), &no_minify()).await.unwrap_err();
    assert!(matches!(err, tempera_engine::EngineError::Io { .. }));
}
