// SPDX-License-Identifier: PMPL-1.0-or-later
//! Markdown scanning primitives shared by the rules and the remediator.
//!
//! Cells are parsed with pulldown-cmark (CommonMark plus GFM tables). Every
//! scanner reports byte offsets into the cell source, so the remediator can
//! rewrite exactly the span a rule reported. Code blocks and inline code are
//! never read as markup, and `<img>` tags are only looked up inside raw HTML.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use scraper::{Html, Selector};
use std::ops::Range;
use std::sync::LazyLock;
use thiserror::Error;

/// Markup that could not be analysed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("markup analysis failed: {0}")]
pub struct MarkupError(pub String);

static IMG_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img\b").expect("valid regex"));

/// An `alt` attribute inside a single tag, with its value in one of the
/// three quoting styles
static ALT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\salt\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]*)"#).expect("valid regex")
});

static ANCHOR_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<a\b").expect("valid regex"));

static ANCHOR_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^</a\s*>").expect("valid regex"));

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z!/][^>]*>").expect("valid regex"));

/// A URL token; balanced `(...)` groups are part of the URL, a lone
/// closing parenthesis is not
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:https?|ftp)://(?:[^\s<>()\[\]{}"'`|]|\([^\s<>()\[\]{}"'`|]*\))+"#)
        .expect("valid regex")
});

static HTML_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table\b.*?</table>").expect("valid regex"));

/// Parse a cell with byte ranges attached to every event
fn parse(source: &str) -> impl Iterator<Item = (Event<'_>, Range<usize>)> {
    Parser::new_ext(source, Options::ENABLE_TABLES).into_offset_iter()
}

/// Byte ranges of code blocks (fenced or indented) and inline code spans
pub fn code_spans(source: &str) -> Vec<Range<usize>> {
    parse(source)
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(_)) | Event::Code(_) => Some(range),
            _ => None,
        })
        .collect()
}

fn code_blocks(source: &str) -> Vec<Range<usize>> {
    parse(source)
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(_)) => Some(range),
            _ => None,
        })
        .collect()
}

fn in_spans(spans: &[Range<usize>], pos: usize) -> bool {
    spans.iter().any(|span| span.contains(&pos))
}

/// Lines outside code blocks, with their byte offset and without the line
/// terminator
fn prose_lines(source: &str) -> Vec<(usize, &str)> {
    let blocks = code_blocks(source);
    let mut lines = Vec::new();
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        if !in_spans(&blocks, offset) {
            lines.push((offset, line.trim_end_matches(['\n', '\r'])));
        }
        offset += line.len();
    }
    lines
}

/// A heading (ATX or setext)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub text: String,
}

/// Headings in source order. A heading without any text is ignored.
pub fn headings(source: &str) -> Vec<Heading> {
    let mut found = Vec::new();
    let mut current: Option<Heading> = None;

    for (event, _) in parse(source) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some(Heading {
                    level: level as usize,
                    text: String::new(),
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = current.as_mut() {
                    heading.text.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(mut heading) = current.take() {
                    heading.text = heading.text.trim().to_string();
                    if !heading.text.is_empty() {
                        found.push(heading);
                    }
                }
            }
            _ => {}
        }
    }
    found
}

/// How an image was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSyntax {
    /// `![alt](url)`
    Markdown,
    /// `<img ... alt="...">`
    Html,
}

/// Classification of an image's alternative text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AltText {
    /// No alt text at all
    Missing,
    /// Alt text of whitespace only
    Blank,
    /// `alt=""` on an HTML image: an explicit decorative declaration
    Empty,
    /// Usable alt text
    Present(String),
}

impl AltText {
    fn from_attribute(raw: Option<&str>) -> Self {
        match raw {
            None => AltText::Missing,
            Some("") => AltText::Empty,
            Some(text) if text.trim().is_empty() => AltText::Blank,
            Some(text) => AltText::Present(text.to_string()),
        }
    }

    /// Classify a markdown image from the plain text of its description and
    /// the raw label between `![` and `]`
    fn from_label(text: &str, raw_label: Option<&str>) -> Self {
        if !text.trim().is_empty() {
            return AltText::Present(text.to_string());
        }
        match raw_label {
            Some(label) if !label.is_empty() && label.trim().is_empty() => AltText::Blank,
            _ => AltText::Missing,
        }
    }

    /// Missing or blank; what the remediator fills in
    pub fn needs_text(&self) -> bool {
        matches!(self, AltText::Missing | AltText::Blank)
    }
}

/// One image reference in a markdown cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub span: Range<usize>,
    pub syntax: ImageSyntax,
    pub alt: AltText,
}

impl ImageRef {
    /// The image's source text
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }
}

/// Image references in offset order, both markdown and HTML syntax.
///
/// Markdown images come from the parser. HTML images are looked up inside
/// raw HTML (blocks and inline tags), with the tag end found by
/// [`tag_len`] so a `>` inside a quoted attribute does not cut it short.
pub fn image_refs(source: &str) -> Result<Vec<ImageRef>, MarkupError> {
    let selector =
        Selector::parse("img").map_err(|e| MarkupError(format!("img selector: {:?}", e)))?;

    let mut images = Vec::new();
    let mut open: Vec<(Range<usize>, String)> = Vec::new();
    let mut html_regions: Vec<Range<usize>> = Vec::new();
    let mut in_html_block = false;

    for (event, range) in parse(source) {
        match event {
            Event::Start(Tag::Image { .. }) => open.push((range, String::new())),
            Event::End(TagEnd::Image) => {
                if let Some((span, text)) = open.pop() {
                    let alt = AltText::from_label(&text, raw_label(&source[span.clone()]));
                    images.push(ImageRef {
                        span,
                        syntax: ImageSyntax::Markdown,
                        alt,
                    });
                }
            }
            Event::Text(text) | Event::Code(text) => {
                for (_, alt) in open.iter_mut() {
                    alt.push_str(&text);
                }
            }
            Event::Start(Tag::HtmlBlock) => {
                in_html_block = true;
                html_regions.push(range);
            }
            Event::End(TagEnd::HtmlBlock) => in_html_block = false,
            Event::Html(_) if !in_html_block => html_regions.push(range),
            Event::InlineHtml(_) => html_regions.push(range),
            _ => {}
        }
    }

    for region in html_regions {
        let mut resume = region.start;
        for m in IMG_OPEN_RE.find_iter(&source[region.clone()]) {
            let start = region.start + m.start();
            if start < resume {
                continue;
            }
            // an unterminated tag is text, not an image
            let Some(len) = tag_len(&source[start..region.end]) else {
                continue;
            };
            resume = start + len;

            let fragment = Html::parse_fragment(&source[start..resume]);
            let alt = fragment
                .select(&selector)
                .next()
                .and_then(|img| img.value().attr("alt").map(str::to_string));
            images.push(ImageRef {
                span: start..resume,
                syntax: ImageSyntax::Html,
                alt: AltText::from_attribute(alt.as_deref()),
            });
        }
    }

    images.sort_by_key(|img| img.span.start);
    Ok(images)
}

/// Text between `![` and the first `]` of a markdown image
pub fn raw_label(image: &str) -> Option<&str> {
    let rest = image.strip_prefix("![")?;
    rest.find(']').map(|end| &rest[..end])
}

/// Length of the HTML tag at the start of `text` (which begins with `<`),
/// or `None` when it is never closed.
///
/// Attribute values in single or double quotes may contain `>`.
pub fn tag_len(text: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut after_equals = false;

    for (i, &byte) in text.as_bytes().iter().enumerate().skip(1) {
        if let Some(q) = quote {
            if byte == q {
                quote = None;
            }
            continue;
        }
        match byte {
            b'>' => return Some(i + 1),
            b'"' | b'\'' if after_equals => {
                quote = Some(byte);
                after_equals = false;
            }
            b'=' => after_equals = true,
            b if b.is_ascii_whitespace() => {}
            _ => after_equals = false,
        }
    }
    None
}

/// Byte ranges of `alt` attributes (including the leading whitespace)
/// within a single HTML tag
pub fn alt_attributes(tag: &str) -> Vec<Range<usize>> {
    ALT_ATTR_RE.find_iter(tag).map(|m| m.range()).collect()
}

/// Attributes of the single `<img>` element in `tag`, sorted by name.
///
/// `None` when the text holds no image or more than one.
pub fn img_attributes(tag: &str) -> Option<Vec<(String, String)>> {
    let selector = Selector::parse("img").ok()?;
    let fragment = Html::parse_fragment(tag);
    let mut found = fragment.select(&selector);

    let img = found.next()?;
    if found.next().is_some() {
        return None;
    }

    let mut attributes: Vec<(String, String)> = img
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    attributes.sort();
    Some(attributes)
}

/// A markdown link that is not an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub span: Range<usize>,
    pub label: String,
    pub target: String,
}

/// Markdown links (inline, reference and autolinks) in offset order
pub fn links(source: &str) -> Vec<LinkRef> {
    let mut found = Vec::new();
    let mut open: Option<LinkRef> = None;

    for (event, range) in parse(source) {
        match event {
            Event::Start(Tag::Link { dest_url, .. }) => {
                open = Some(LinkRef {
                    span: range,
                    label: String::new(),
                    target: dest_url.trim().to_string(),
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(link) = open.as_mut() {
                    link.label.push_str(&text);
                }
            }
            Event::End(TagEnd::Link) => found.extend(open.take()),
            _ => {}
        }
    }
    found
}

/// Ranges of rendered prose text: outside links, images, code, raw HTML
/// blocks and inline `<a>` elements
fn prose_text(source: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut link_depth = 0usize;
    let mut anchor_depth = 0usize;
    let mut in_code = false;

    for (event, range) in parse(source) {
        match event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. }) => link_depth += 1,
            Event::End(TagEnd::Link | TagEnd::Image) => {
                link_depth = link_depth.saturating_sub(1);
            }
            Event::Start(Tag::CodeBlock(_)) => in_code = true,
            Event::End(TagEnd::CodeBlock) => in_code = false,
            Event::InlineHtml(html) => {
                if ANCHOR_OPEN_RE.is_match(&html) {
                    anchor_depth += 1;
                } else if ANCHOR_CLOSE_RE.is_match(&html) {
                    anchor_depth = anchor_depth.saturating_sub(1);
                }
            }
            Event::Text(_) if link_depth == 0 && anchor_depth == 0 && !in_code => {
                ranges.push(range);
            }
            _ => {}
        }
    }
    ranges
}

/// URLs written as plain prose text.
///
/// A URL counts only when it starts in rendered text, so link labels and
/// targets, autolinks, reference definitions, code, HTML attributes and raw
/// HTML blocks are all excluded. Trailing sentence punctuation is not part
/// of the URL.
pub fn bare_urls(source: &str) -> Vec<Range<usize>> {
    let prose = prose_text(source);

    URL_RE
        .find_iter(source)
        .filter(|m| in_spans(&prose, m.start()))
        .filter_map(|m| {
            let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', '*', '_', '~']);
            // a bare scheme with nothing after it is not a URL
            if url.len() <= url.find("://")? + 3 {
                return None;
            }
            Some(m.start()..m.start() + url.len())
        })
        .collect()
}

/// A block of consecutive pipe-delimited rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    /// Byte offset of the first row
    pub start: usize,
    pub rows: Vec<String>,
    header: bool,
}

impl TableBlock {
    /// Whether the block parses as a table whose header is its first row
    pub fn has_header(&self) -> bool {
        self.header
    }
}

/// Maximal runs of at least two lines whose trimmed text starts with `|`.
///
/// A run has a header when the parser reads a table starting on its first
/// row, which requires a delimiter row (`|---|:-:|`) right after it.
pub fn pipe_tables(source: &str) -> Vec<TableBlock> {
    let parsed: Vec<usize> = parse(source)
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::Table(_)) => Some(range.start),
            _ => None,
        })
        .collect();

    let mut blocks: Vec<(TableBlock, usize)> = Vec::new();
    let mut current: Option<(TableBlock, usize)> = None;
    let mut last_end = 0;

    for (offset, line) in prose_lines(source) {
        let contiguous = offset == last_end;
        last_end = offset + line.len();
        // account for the terminator that prose_lines trimmed
        if source[last_end..].starts_with("\r\n") {
            last_end += 2;
        } else if source[last_end..].starts_with('\n') {
            last_end += 1;
        }

        let is_row = line.trim_start().starts_with('|');
        if is_row && contiguous {
            if let Some((block, _)) = current.as_mut() {
                block.rows.push(line.trim().to_string());
                continue;
            }
        }

        blocks.extend(current.take());
        if is_row {
            let block = TableBlock {
                start: offset,
                rows: vec![line.trim().to_string()],
                header: false,
            };
            current = Some((block, offset + line.len()));
        }
    }
    blocks.extend(current);

    blocks
        .into_iter()
        .filter(|(block, _)| block.rows.len() >= 2)
        .map(|(mut block, first_row_end)| {
            block.header = parsed
                .iter()
                .any(|&start| (block.start..=first_row_end).contains(&start));
            block
        })
        .collect()
}

/// HTML `<table>` elements outside code spans
pub fn html_tables(source: &str) -> Vec<&str> {
    let code = code_spans(source);
    HTML_TABLE_RE
        .find_iter(source)
        .filter(|m| !in_spans(&code, m.start()))
        .map(|m| m.as_str())
        .collect()
}

/// Plain text of a markdown cell: link and image labels kept, tags and
/// markup removed, whitespace collapsed
pub fn strip_markup(source: &str) -> String {
    let mut text = String::new();

    for (event, _) in parse(source) {
        match event {
            Event::Text(part) | Event::Code(part) => text.push_str(&part),
            Event::Html(html) | Event::InlineHtml(html) => {
                text.push(' ');
                text.push_str(&HTML_TAG_RE.replace_all(&html, " "));
                text.push(' ');
            }
            Event::SoftBreak
            | Event::HardBreak
            | Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::TableCell) => {
                text.push(' ');
            }
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shorten a snippet for display
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let cut: String = single_line.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
