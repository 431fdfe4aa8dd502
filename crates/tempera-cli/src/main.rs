//! tempera: command-line renderer for tempera templates.

mod cli;

use clap::Parser;
use cli::Args;
use miette::{miette, IntoDiagnostic, Result};
use tempera_engine::{render_file, RenderOptions};
use tempera_expr::Value;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let ctx = load_context(&args).await?;
    let options = RenderOptions {
        minify: !args.no_minify,
        cache: !args.no_cache,
        ..RenderOptions::default()
    };

    let output = render_file(&args.template, &ctx, &options)
        .await
        .map_err(|e| miette!("{e}"))?;

    match &args.output {
        Some(path) => tokio::fs::write(path, output).await.into_diagnostic()?,
        None => println!("{output}"),
    }
    Ok(())
}

/// Builds the render context from `--context` or `--context-file`; with
/// neither, the context is an empty object.
async fn load_context(args: &Args) -> Result<Value> {
    let json = match (&args.context, &args.context_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path).await.into_diagnostic()?,
        (None, None) => "{}".to_string(),
    };
    let parsed: serde_json::Value =
        serde_json::from_str(&json).map_err(|e| miette!("invalid context JSON: {e}"))?;
    Ok(Value::from_json(&parsed))
}
