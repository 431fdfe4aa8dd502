//! A view engine rooted at a template directory, for embedding in web
//! servers.

use camino::Utf8PathBuf;

use tempera_expr::Value;

use crate::error::EngineError;
use crate::{render_file, RenderOptions};

/// Renders named views from a root directory with fixed options.
#[derive(Debug)]
pub struct ViewEngine {
    root: Utf8PathBuf,
    options: RenderOptions,
}

impl ViewEngine {
    /// Creates a view engine with default render options.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self::with_options(root, RenderOptions::default())
    }

    /// Creates a view engine with explicit render options.
    pub fn with_options(root: impl Into<Utf8PathBuf>, options: RenderOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    /// The root directory views are resolved under.
    pub fn root(&self) -> &Utf8PathBuf {
        &self.root
    }

    /// Renders the view at `root/name` against `ctx`.
    pub async fn render(&self, name: &str, ctx: &Value) -> Result<String, EngineError> {
        render_file(self.root.join(name), ctx, &self.options).await
    }

    /// Renders and hands the result to a completion callback, for callers
    /// bridging into callback-shaped server APIs.
    pub async fn render_with<F>(&self, name: &str, ctx: &Value, done: F)
    where
        F: FnOnce(Result<String, EngineError>),
    {
        done(self.render(name, ctx).await);
    }
}
