//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::Parser;

/// Render a tempera template to HTML.
#[derive(Debug, Parser)]
#[command(name = "tempera")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Template file to render
    pub template: Utf8PathBuf,

    /// Context as inline JSON
    #[arg(long, conflicts_with = "context_file")]
    pub context: Option<String>,

    /// Context from a JSON file
    #[arg(long = "context-file")]
    pub context_file: Option<Utf8PathBuf>,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Skip output minification
    #[arg(long = "no-minify")]
    pub no_minify: bool,

    /// Bypass the template cache
    #[arg(long = "no-cache")]
    pub no_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_is_positional() {
        let args = Args::parse_from(["tempera", "page.html"]);
        assert_eq!(args.template.as_str(), "page.html");
        assert!(args.context.is_none());
        assert!(!args.no_minify);
    }

    #[test]
    fn test_inline_context() {
        let args = Args::parse_from(["tempera", "page.html", "--context", r#"{"a": 1}"#]);
        assert_eq!(args.context.as_deref(), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_context_sources_conflict() {
        let result = Args::try_parse_from([
            "tempera",
            "page.html",
            "--context",
            "{}",
            "--context-file",
            "ctx.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from(["tempera", "page.html", "--no-minify", "--no-cache"]);
        assert!(args.no_minify);
        assert!(args.no_cache);
    }
}
