//! Output minification.
//!
//! Minification is a collaborator behind a trait so callers can plug in a
//! full HTML minifier. The built-in [`BasicMinifier`] covers comment
//! removal and whitespace collapsing while leaving `<script>`, `<pre>` and
//! `<textarea>` content untouched; the remaining options exist for richer
//! implementations and are ignored by it.

/// Options forwarded to the minifier.
#[derive(Debug, Clone)]
pub struct MinifyOptions {
    /// Collapse runs of whitespace in text to a single space.
    pub collapse_whitespace: bool,
    /// Strip `<!-- -->` comments.
    pub remove_comments: bool,
    /// Minify embedded stylesheet content.
    pub minify_css: bool,
    /// Minify embedded script content.
    pub minify_js: bool,
    /// Drop attribute quotes where the value allows it.
    pub remove_attribute_quotes: bool,
    /// Treat tag names case-sensitively (for XML-ish output).
    pub case_sensitive: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
            remove_comments: true,
            minify_css: false,
            minify_js: false,
            remove_attribute_quotes: false,
            case_sensitive: false,
        }
    }
}

/// A pluggable HTML minifier.
pub trait Minifier {
    /// Minifies rendered output according to `options`.
    fn minify(&self, html: &str, options: &MinifyOptions) -> String;
}

/// Elements whose text content must never be rewritten.
const PROTECTED: &[&str] = &["script", "pre", "textarea"];

/// The built-in minifier.
#[derive(Debug, Default)]
pub struct BasicMinifier;

impl Minifier for BasicMinifier {
    fn minify(&self, html: &str, options: &MinifyOptions) -> String {
        let mut out = String::with_capacity(html.len());
        let mut rest = html;
        while !rest.is_empty() {
            if options.remove_comments && rest.starts_with("<!--") {
                match rest[4..].find("-->") {
                    Some(end) => {
                        rest = &rest[4 + end + 3..];
                        continue;
                    }
                    None => {
                        // Unterminated comment: drop the remainder.
                        break;
                    }
                }
            }
            if rest.starts_with('<') {
                if let Some(end) = protected_span(rest, options.case_sensitive) {
                    out.push_str(&rest[..end]);
                    rest = &rest[end..];
                    continue;
                }
            }
            let mut chars = rest.char_indices();
            let (_, c) = match chars.next() {
                Some(pair) => pair,
                None => break,
            };
            if options.collapse_whitespace && c.is_whitespace() {
                let after = rest.trim_start();
                out.push(' ');
                rest = after;
            } else {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
        out
    }
}

/// If `rest` starts with an opening protected element, returns the offset
/// just past its closing tag (or the end of input when unclosed).
fn protected_span(rest: &str, case_sensitive: bool) -> Option<usize> {
    let tag = PROTECTED.iter().find(|tag| {
        let open = &rest[1..];
        let matches = if case_sensitive {
            open.starts_with(**tag)
        } else {
            open.len() >= tag.len() && open[..tag.len()].eq_ignore_ascii_case(tag)
        };
        matches
            && matches!(
                open.as_bytes().get(tag.len()),
                Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/')
            )
    })?;
    let close = format!("</{tag}");
    let haystack;
    let needle;
    if case_sensitive {
        haystack = rest.to_string();
        needle = close;
    } else {
        haystack = rest.to_ascii_lowercase();
        needle = close.to_ascii_lowercase();
    }
    match haystack.find(&needle) {
        Some(at) => match rest[at..].find('>') {
            Some(gt) => Some(at + gt + 1),
            None => Some(rest.len()),
        },
        None => Some(rest.len()),
    }
}
