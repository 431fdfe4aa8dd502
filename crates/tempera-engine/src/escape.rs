//! HTML entity escaping for emitted expression values.

/// Escapes `&`, `<` and `>`. Applied to every `{{ }}` emission; the
/// `html` attribute path bypasses it.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_markup_characters() {
        assert_eq!(escape_html("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn test_quotes_pass_through() {
        assert_eq!(escape_html(r#"a "b" 'c'"#), r#"a "b" 'c'"#);
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(escape_html("plain text"), "plain text");
    }
}
