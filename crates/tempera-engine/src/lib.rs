//! Async template engine for tempera templates.
//!
//! The engine compiles template source (via `tempera-parser`) into an
//! instruction tree, resolves `partial`/`wrap` references relative to the
//! template's file, and renders asynchronously against a context value.
//! File-backed templates are shared through a process-wide cache, and
//! rendered output is minified by default.
//!
//! # Example
//!
//! ```
//! use tempera_engine::{render_str, RenderOptions};
//! use tempera_expr::Value;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let json: serde_json::Value = serde_json::from_str(r#"{"name": "World"}"#).unwrap();
//! let out = render_str("Hello {{ name }}", &Value::from_json(&json), &RenderOptions::default())
//!     .await
//!     .unwrap();
//! assert_eq!(out, "Hello World");
//! # }
//! ```

mod cache;
mod error;
mod escape;
mod executor;
mod minify;
mod resolver;
mod template;
mod view;

pub use error::EngineError;
pub use escape::escape_html;
pub use minify::{BasicMinifier, Minifier, MinifyOptions};
pub use template::Template;
pub use view::ViewEngine;

use camino::Utf8Path;
use tempera_expr::Value;

/// Options for the crate-level render entry points.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Minify the rendered output. On by default.
    pub minify: bool,
    /// Options forwarded to the minifier when `minify` is set.
    pub minifier_options: MinifyOptions,
    /// Use the process-wide template cache for file loads. On by default.
    pub cache: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            minify: true,
            minifier_options: MinifyOptions::default(),
            cache: true,
        }
    }
}

/// Renders template source given as a string. Such templates have no file
/// origin, so `partial`/`wrap` references in them are compile errors.
pub async fn render_str(
    source: &str,
    ctx: &Value,
    options: &RenderOptions,
) -> Result<String, EngineError> {
    let template = Template::from_source(source);
    finish(template.render(ctx).await?, options)
}

/// Renders a template file. Relative paths resolve against the working
/// directory.
pub async fn render_file(
    path: impl AsRef<Utf8Path>,
    ctx: &Value,
    options: &RenderOptions,
) -> Result<String, EngineError> {
    let template = Template::load(path.as_ref(), options.cache).await?;
    finish(template.render(ctx).await?, options)
}

fn finish(output: String, options: &RenderOptions) -> Result<String, EngineError> {
    if options.minify {
        Ok(BasicMinifier.minify(&output, &options.minifier_options))
    } else {
        Ok(output)
    }
}
