//! Process-wide template cache behavior.

use std::sync::Arc;

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use serial_test::serial;
use tempera_engine::{render_file, RenderOptions, Template};
use tempera_expr::Value;

fn empty_ctx() -> Value {
    Value::from_json(&serde_json::Value::Object(Default::default()))
}

fn options(cache: bool) -> RenderOptions {
    RenderOptions {
        minify: false,
        cache,
        ..RenderOptions::default()
    }
}

fn temp_template(contents: &str) -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let path = root.join("page.html");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

#[tokio::test]
#[serial]
async fn test_cached_template_survives_file_change() {
    let (_dir, path) = temp_template("one");
    let first = render_file(&path, &empty_ctx(), &options(true)).await.unwrap();
    assert_eq!(first, "one");

    std::fs::write(&path, "two").unwrap();
    let second = render_file(&path, &empty_ctx(), &options(true)).await.unwrap();
    assert_eq!(second, "one");
}

#[tokio::test]
#[serial]
async fn test_cache_bypass_rereads_file() {
    let (_dir, path) = temp_template("one");
    let first = render_file(&path, &empty_ctx(), &options(false)).await.unwrap();
    assert_eq!(first, "one");

    std::fs::write(&path, "two").unwrap();
    let second = render_file(&path, &empty_ctx(), &options(false)).await.unwrap();
    assert_eq!(second, "two");
}

#[tokio::test]
#[serial]
async fn test_bypass_does_not_populate_cache() {
    let (_dir, path) = temp_template("one");
    render_file(&path, &empty_ctx(), &options(false)).await.unwrap();

    std::fs::write(&path, "two").unwrap();
    // First cached load happens now, after the change
    let cached = render_file(&path, &empty_ctx(), &options(true)).await.unwrap();
    assert_eq!(cached, "two");
}

#[tokio::test]
#[serial]
async fn test_cached_loads_share_one_instance() {
    let (_dir, path) = temp_template("x");
    let a = Template::load(&path, true).await.unwrap();
    let b = Template::load(&path, true).await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let fresh = Template::load(&path, false).await.unwrap();
    assert!(!Arc::ptr_eq(&a, &fresh));
    assert_eq!(fresh.source(), a.source());
}

#[tokio::test]
#[serial]
async fn test_concurrent_uncached_loads_coalesce() {
    let (_dir, path) = temp_template("x");
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let path = path.clone();
        tasks.spawn(async move { Template::load(&path, true).await.unwrap() });
    }
    let mut loaded = Vec::new();
    while let Some(template) = tasks.join_next().await {
        loaded.push(template.unwrap());
    }
    assert_eq!(loaded.len(), 16);
    // Every task must get the same instance: the first load wins and the
    // rest wait on it rather than reading the file themselves.
    let first = &loaded[0];
    assert!(loaded.iter().all(|t| Arc::ptr_eq(first, t)));
}

#[tokio::test]
#[serial]
async fn test_concurrent_renders_agree() {
    let (_dir, path) = temp_template("n = {{ n }}");
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let path = path.clone();
        tasks.spawn(async move {
            let ctx = Value::from_json(&serde_json::json!({"n": 1}));
            render_file(&path, &ctx, &options(true)).await.unwrap()
        });
    }
    while let Some(out) = tasks.join_next().await {
        assert_eq!(out.unwrap(), "n = 1");
    }
}
