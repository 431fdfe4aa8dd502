//! Partial resolution: turning the paths collected by the parser into
//! loaded, compiled templates.
//!
//! Resolution is origin-relative. A path is tried exactly as written
//! against the referencing template's directory; if no file exists there,
//! `.html` is appended. Every resolved path is loaded at most once per
//! top-level compilation through a [`Registry`], which also keeps
//! mutually-referencing partials from recursing forever: a path already in
//! the registry is reused without compiling it again.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use tempera_parser::{CompileError, CompileErrorKind, Program};

use crate::error::EngineError;
use crate::template::{PartialMap, Template};

/// Appended when the path as written does not name an existing file.
pub(crate) const DEFAULT_EXTENSION: &str = "html";

/// Templates loaded during one top-level compilation, keyed by resolved
/// absolute path.
pub(crate) struct Registry {
    entries: Mutex<FxHashMap<Utf8PathBuf, Arc<Template>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Pre-registers a template under a path, so references resolving to
    /// the compilation's entry file reuse it instead of reloading.
    pub(crate) async fn seed(&self, path: Utf8PathBuf, template: Arc<Template>) {
        self.entries.lock().await.entry(path).or_insert(template);
    }

    /// Returns the template for `path`, reading the file only on first
    /// sight. The flag reports whether this call created the entry, in
    /// which case the caller still has to compile it.
    async fn load(&self, path: Utf8PathBuf) -> Result<(Arc<Template>, bool), EngineError> {
        let mut entries = self.entries.lock().await;
        if let Some(template) = entries.get(&path) {
            return Ok((Arc::clone(template), false));
        }
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| EngineError::io(&path, e))?;
        let template = Arc::new(Template::with_origin(source, path.clone()));
        entries.insert(path, Arc::clone(&template));
        Ok((template, true))
    }
}

/// Loads and compiles every partial a program references.
pub(crate) async fn resolve_partials(
    program: &Program,
    origin: Option<&Utf8Path>,
    registry: &Registry,
) -> Result<PartialMap, EngineError> {
    let mut partials = PartialMap::default();
    for partial_ref in &program.partial_refs {
        if partials.contains_key(&partial_ref.path) {
            continue;
        }
        let origin = origin.ok_or_else(|| {
            EngineError::Compile(CompileError::new(
                CompileErrorKind::PartialWithoutOrigin,
                partial_ref.line,
            ))
        })?;
        let resolved = resolve_path(origin, &partial_ref.path).await;
        let (template, fresh) = registry.load(resolved).await?;
        if fresh {
            compile_recursive(&template, registry).await?;
        }
        partials.insert(partial_ref.path.clone(), template);
    }
    Ok(partials)
}

/// Compiles a freshly loaded partial. Boxed because partial compilation
/// recurses through `resolve_partials`.
fn compile_recursive<'a>(
    template: &'a Arc<Template>,
    registry: &'a Registry,
) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
    Box::pin(async move {
        template.compiled_with(registry).await?;
        Ok(())
    })
}

/// Resolves a reference path against the referencing template's directory,
/// falling back to the default extension when the exact path does not
/// exist. The fallback path is returned even if it does not exist either;
/// the subsequent read reports the I/O error.
async fn resolve_path(origin: &Utf8Path, raw: &str) -> Utf8PathBuf {
    let dir = origin.parent().unwrap_or(Utf8Path::new("."));
    let candidate = dir.join(raw);
    if tokio::fs::metadata(&candidate).await.is_ok() {
        return candidate;
    }
    Utf8PathBuf::from(format!("{candidate}.{DEFAULT_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_appends_default_extension() {
        let resolved = resolve_path(Utf8Path::new("/views/page.html"), "header").await;
        assert_eq!(resolved, Utf8PathBuf::from("/views/header.html"));
    }

    #[tokio::test]
    async fn test_resolve_keeps_existing_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::write(root.join("footer.tpl"), "x").unwrap();
        let origin = root.join("page.html");
        let resolved = resolve_path(&origin, "footer.tpl").await;
        assert_eq!(resolved, root.join("footer.tpl"));
    }
}
