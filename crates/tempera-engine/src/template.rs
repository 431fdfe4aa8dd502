//! Templates and their compiled programs.
//!
//! A [`Template`] holds source text plus an optional file origin, and
//! memoizes its compiled program behind an async [`OnceCell`]: concurrent
//! first renders compile once, later renders reuse the program. A failed
//! compilation leaves the cell empty so a later render retries.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;

use tempera_expr::Value;
use tempera_parser::Program;

use crate::cache;
use crate::error::EngineError;
use crate::executor;
use crate::resolver::{self, Registry};

/// Partial references of one program, resolved to loaded templates, keyed by
/// the path exactly as written in the referencing tag.
pub(crate) type PartialMap = FxHashMap<String, Arc<Template>>;

/// A template: source text, an optional file origin for resolving partial
/// references, and the memoized compiled program.
#[derive(Debug)]
pub struct Template {
    name: String,
    origin: Option<Utf8PathBuf>,
    source: Arc<str>,
    program: Arc<OnceCell<Arc<CompiledProgram>>>,
}

/// A parsed program together with its resolved partials.
#[derive(Debug)]
pub(crate) struct CompiledProgram {
    pub(crate) program: Program,
    pub(crate) partials: Arc<PartialMap>,
}

impl Template {
    /// Creates a template from a source string. It has no file origin, so
    /// any `partial`/`wrap` reference in it fails to compile.
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            name: "<inline>".to_string(),
            origin: None,
            source: source.into().into(),
            program: Arc::new(OnceCell::new()),
        }
    }

    /// Creates a template whose partial references resolve relative to the
    /// directory of `origin`.
    pub fn with_origin(source: impl Into<String>, origin: Utf8PathBuf) -> Self {
        Self {
            name: origin
                .file_name()
                .unwrap_or(origin.as_str())
                .to_string(),
            origin: Some(origin),
            source: source.into().into(),
            program: Arc::new(OnceCell::new()),
        }
    }

    /// A handle that shares this template's source and compiled program.
    /// Seeded into the registry so that a partial chain referencing back to
    /// the entry file reuses it instead of reloading from disk.
    fn alias(&self) -> Self {
        Self {
            name: self.name.clone(),
            origin: self.origin.clone(),
            source: Arc::clone(&self.source),
            program: Arc::clone(&self.program),
        }
    }

    /// Loads a template file. With `use_cache` the process-wide cache is
    /// consulted first and the loaded template is shared; without it the
    /// file is read fresh and the cache is left untouched.
    pub async fn load(path: &Utf8Path, use_cache: bool) -> Result<Arc<Self>, EngineError> {
        let abs = absolutize(path)?;
        if use_cache {
            cache::global().load(&abs).await
        } else {
            let source = tokio::fs::read_to_string(&abs)
                .await
                .map_err(|e| EngineError::io(&abs, e))?;
            Ok(Arc::new(Self::with_origin(source, abs)))
        }
    }

    /// A short name for diagnostics: the origin file name, or `<inline>`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file this template was loaded from, if any.
    pub fn origin(&self) -> Option<&Utf8Path> {
        self.origin.as_deref()
    }

    /// The raw source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders the template against a context value. The output is raw;
    /// minification is layered on by the crate-level entry points.
    pub async fn render(&self, ctx: &Value) -> Result<String, EngineError> {
        let compiled = self.compiled().await?;
        executor::run(&compiled, ctx.clone()).await
    }

    /// Compiles (or returns the memoized program), using a fresh partial
    /// registry scoped to this compilation. The entry template itself is
    /// pre-registered under its origin so cycles back to it resolve
    /// in-memory.
    pub(crate) async fn compiled(&self) -> Result<Arc<CompiledProgram>, EngineError> {
        if let Some(program) = self.program.get() {
            return Ok(Arc::clone(program));
        }
        let registry = Registry::new();
        if let Some(origin) = &self.origin {
            registry.seed(origin.clone(), Arc::new(self.alias())).await;
        }
        self.compiled_with(&registry).await
    }

    /// Compiles within an existing compilation's registry, so that every
    /// path is loaded at most once even across mutually-referencing
    /// partials.
    pub(crate) async fn compiled_with(
        &self,
        registry: &Registry,
    ) -> Result<Arc<CompiledProgram>, EngineError> {
        self.program
            .get_or_try_init(|| async {
                let program = tempera_parser::parse(&self.source)?;
                let partials =
                    resolver::resolve_partials(&program, self.origin.as_deref(), registry).await?;
                Ok(Arc::new(CompiledProgram {
                    program,
                    partials: Arc::new(partials),
                }))
            })
            .await
            .cloned()
    }
}

/// Resolves a possibly-relative path against the current working directory.
/// Cache keys and partial resolution both want absolute paths.
pub(crate) fn absolutize(path: &Utf8Path) -> Result<Utf8PathBuf, EngineError> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }
    let cwd = std::env::current_dir().map_err(|e| EngineError::io(path, e))?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|_| {
        EngineError::io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "working directory is not valid UTF-8",
            ),
        )
    })?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inline_template_name() {
        let t = Template::from_source("hi");
        assert_eq!(t.name(), "<inline>");
        assert!(t.origin().is_none());
    }

    #[test]
    fn test_origin_template_name_is_file_name() {
        let t = Template::with_origin("hi", Utf8PathBuf::from("/views/page.html"));
        assert_eq!(t.name(), "page.html");
        assert_eq!(t.origin().map(|p| p.as_str()), Some("/views/page.html"));
    }
}
