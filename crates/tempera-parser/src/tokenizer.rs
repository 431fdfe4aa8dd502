//! Tag tokenizer.
//!
//! Splits raw template source into a flat segment sequence: literal text,
//! `<template …>` open tags, `</template>` close tags, and whole `<script>`
//! elements. Concatenating the raw text of all segments reproduces the
//! source exactly. The tokenizer never fails; malformed structure is the
//! structural parser's problem.

use crate::span::Span;

/// One segment of template source.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text between tags.
    Text(Text),
    /// An opening `<template …>` tag.
    TemplateOpen(TemplateOpen),
    /// A closing `</template>` tag.
    TemplateClose(TemplateClose),
    /// A whole `<script …>…</script>` element; the body is opaque.
    Script(ScriptElement),
}

impl Segment {
    /// The raw source text of this segment.
    pub fn raw(&self) -> &str {
        match self {
            Segment::Text(t) => &t.text,
            Segment::TemplateOpen(t) => &t.raw,
            Segment::TemplateClose(t) => &t.raw,
            Segment::Script(s) => &s.raw,
        }
    }
}

/// Literal text.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    /// The text, verbatim.
    pub text: String,
    /// Source range.
    pub span: Span,
}

/// An opening `<template>` tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateOpen {
    /// The attribute source between the tag name and the closing `>`,
    /// excluding a trailing `/`.
    pub attrs: String,
    /// Whether the tag is written `<template …/>`.
    pub self_closing: bool,
    /// The whole tag, verbatim.
    pub raw: String,
    /// Source range of the whole tag.
    pub span: Span,
}

/// A closing `</template>` tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateClose {
    /// The whole tag, verbatim.
    pub raw: String,
    /// Source range.
    pub span: Span,
}

/// A `<script>` element, body read verbatim up to `</script>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptElement {
    /// The attribute source of the opening tag.
    pub attrs: String,
    /// The body between the tags, verbatim.
    pub body: String,
    /// The whole element including both tags, verbatim.
    pub raw: String,
    /// Source range of the whole element.
    pub span: Span,
}

/// Tokenizes template source into segments.
pub fn tokenize(source: &str) -> Vec<Segment> {
    Tokenizer::new(source).run()
}

struct Tokenizer<'src> {
    source: &'src str,
    pos: usize,
    segments: Vec<Segment>,
    text_start: usize,
}

impl<'src> Tokenizer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            segments: Vec::new(),
            text_start: 0,
        }
    }

    fn run(mut self) -> Vec<Segment> {
        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            if !rest.starts_with('<') {
                // Jump to the next '<'; everything before it is text
                match rest[1..].find('<') {
                    Some(i) => self.pos += 1 + i,
                    None => self.pos = self.source.len(),
                }
                continue;
            }

            if let Some(end) = self.match_tag_open(rest, "<template") {
                self.consume_template_open(end);
            } else if rest.starts_with("</template")
                && matches!(
                    rest.as_bytes().get("</template".len()),
                    Some(b'>' | b' ' | b'\t' | b'\n' | b'\r')
                )
            {
                self.consume_template_close();
            } else if let Some(end) = self.match_tag_open(rest, "<script") {
                self.consume_script(end);
            } else {
                self.pos += 1;
            }
        }
        self.flush_text(self.source.len());
        self.segments
    }

    /// Checks whether `rest` starts a `name` tag and returns the offset of
    /// its closing `>` relative to `rest`. Quoted attribute values may
    /// contain `>` without ending the tag. An unterminated tag is not a tag.
    fn match_tag_open(&self, rest: &str, name: &str) -> Option<usize> {
        let after = rest.strip_prefix(name)?;
        match after.chars().next() {
            Some('>') | Some('/') => {}
            Some(c) if c.is_whitespace() => {}
            _ => return None,
        }
        let mut quote: Option<char> = None;
        for (i, c) in after.char_indices() {
            match quote {
                Some(q) => {
                    if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '"' | '\'' => quote = Some(c),
                    '>' => return Some(name.len() + i),
                    _ => {}
                },
            }
        }
        None
    }

    fn flush_text(&mut self, end: usize) {
        if end > self.text_start {
            self.segments.push(Segment::Text(Text {
                text: self.source[self.text_start..end].to_string(),
                span: Span::new(self.text_start, end),
            }));
        }
    }

    /// `gt` is the offset of `>` relative to the current position.
    fn consume_template_open(&mut self, gt: usize) {
        self.flush_text(self.pos);
        let start = self.pos;
        let raw = &self.source[start..start + gt + 1];
        let mut attrs = &raw["<template".len()..raw.len() - 1];
        let self_closing = attrs.trim_end().ends_with('/');
        if self_closing {
            attrs = &attrs[..attrs.rfind('/').unwrap_or(attrs.len())];
        }
        self.segments.push(Segment::TemplateOpen(TemplateOpen {
            attrs: attrs.to_string(),
            self_closing,
            raw: raw.to_string(),
            span: Span::new(start, start + gt + 1),
        }));
        self.pos = start + gt + 1;
        self.text_start = self.pos;
    }

    fn consume_template_close(&mut self) {
        self.flush_text(self.pos);
        let start = self.pos;
        let rest = &self.source[start..];
        let end = match rest.find('>') {
            Some(i) => start + i + 1,
            None => self.source.len(),
        };
        self.segments.push(Segment::TemplateClose(TemplateClose {
            raw: self.source[start..end].to_string(),
            span: Span::new(start, end),
        }));
        self.pos = end;
        self.text_start = self.pos;
    }

    /// `gt` is the offset of the opening tag's `>` relative to the current
    /// position. The body is read verbatim until `</script>`: script content
    /// is never re-tokenized.
    fn consume_script(&mut self, gt: usize) {
        self.flush_text(self.pos);
        let start = self.pos;
        let open_raw = &self.source[start..start + gt + 1];
        let attrs = &open_raw["<script".len()..open_raw.len() - 1];

        let body_start = start + gt + 1;
        let (body_end, end) = match self.source[body_start..].find("</script") {
            Some(i) => {
                let close_start = body_start + i;
                let close_end = match self.source[close_start..].find('>') {
                    Some(j) => close_start + j + 1,
                    None => self.source.len(),
                };
                (close_start, close_end)
            }
            None => (self.source.len(), self.source.len()),
        };

        self.segments.push(Segment::Script(ScriptElement {
            attrs: attrs.to_string(),
            body: self.source[body_start..body_end].to_string(),
            raw: self.source[start..end].to_string(),
            span: Span::new(start, end),
        }));
        self.pos = end;
        self.text_start = self.pos;
    }
}
