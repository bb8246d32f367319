// HTML <-> Styled Text conversion
// from_html walks a sanitized Document and lays it out as a flat character
// sequence with style ranges; to_html serializes a buffer back to markup that
// converts to the same buffer again.

use std::sync::Arc;

use crate::error::EditError;
use crate::html::{Document, Element, Node, SanitizePolicy, Sanitizer, escape_attribute};
use crate::image::{ImageElement, ImageResolver, PlaceholderResolver};
use crate::styled_buffer::{ImageSpan, OBJECT_REPLACEMENT, StyleKind, StyleRange, StyledBuffer};
use crate::theme::{Theme, css_color};

/// Elements laid out on lines of their own
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "blockquote",
    "center",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "ol",
    "p",
    "pre",
    "table",
    "tr",
    "ul",
];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Sanitize + convert in one step. Shared with the conversion worker.
pub struct HtmlConverter {
    sanitizer: Sanitizer,
    theme: Theme,
    resolver: Arc<dyn ImageResolver>,
}

impl HtmlConverter {
    pub fn new(policy: SanitizePolicy, theme: Theme, resolver: Arc<dyn ImageResolver>) -> Self {
        HtmlConverter {
            sanitizer: Sanitizer::new(policy),
            theme,
            resolver,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn sanitize(&self, html: &str) -> Document {
        self.sanitizer.sanitize(html)
    }

    /// Styled text for arbitrary markup
    pub fn spanned(&self, html: &str) -> StyledBuffer {
        let document = self.sanitizer.sanitize(html);
        from_html(&document, self.resolver.as_ref(), &self.theme)
    }
}

impl Default for HtmlConverter {
    fn default() -> Self {
        Self::new(
            SanitizePolicy::default(),
            Theme::default(),
            Arc::new(PlaceholderResolver),
        )
    }
}

/// Lay out a sanitized document as styled text
pub fn from_html(document: &Document, resolver: &dyn ImageResolver, theme: &Theme) -> StyledBuffer {
    let mut builder = SpanBuilder {
        resolver,
        theme,
        out: StyledBuffer::new(),
        ranges: Vec::new(),
        pre_depth: 0,
        pending_space: false,
        block_break_at_end: false,
    };
    builder.walk(document.children());
    builder.finish()
}

struct SpanBuilder<'a> {
    resolver: &'a dyn ImageResolver,
    theme: &'a Theme,
    out: StyledBuffer,
    ranges: Vec<StyleRange>,
    pre_depth: usize,
    /// Collapsed whitespace not yet written
    pending_space: bool,
    /// The last character written is the break closing a block
    block_break_at_end: bool,
}

impl SpanBuilder<'_> {
    fn walk(&mut self, nodes: &[Node]) {
        for node in nodes {
            match node {
                Node::Text(text) => self.text(text),
                Node::Element(element) => self.element(element),
            }
        }
    }

    fn element(&mut self, element: &Element) {
        let tag = element.tag.as_str();
        match tag {
            "br" => self.push_newline(),
            "hr" => self.separator(),
            "img" => self.image(element),
            _ if BLOCK_ELEMENTS.contains(&tag) => self.block(element),
            "td" | "th" => {
                self.walk(&element.children);
                self.pending_space = true;
            }
            _ => match inline_kind(element) {
                Some(kind) => {
                    let start = self.inline_start();
                    self.walk(&element.children);
                    self.add_range(kind, start, self.out.len());
                }
                None => self.walk(&element.children),
            },
        }
    }

    fn block(&mut self, element: &Element) {
        let tag = element.tag.as_str();
        self.ensure_newline();
        let start = self.out.len();

        if tag == "pre" {
            self.pre_depth += 1;
        }
        self.walk(&element.children);
        if tag == "pre" {
            self.pre_depth -= 1;
        }

        if HEADINGS.contains(&tag) {
            self.add_range(StyleKind::Bold, start, self.out.len());
        }
        if self.ensure_newline() {
            self.block_break_at_end = true;
        }
        if tag == "blockquote" {
            self.add_range(
                StyleKind::Quote(self.theme.quote_style()),
                start,
                self.out.len(),
            );
        }
    }

    fn separator(&mut self) {
        self.ensure_newline();
        let start = self.out.len();
        self.push_char(OBJECT_REPLACEMENT);
        self.add_range(
            StyleKind::Separator(self.theme.separator_style()),
            start,
            start + 1,
        );
        self.push_newline();
        self.block_break_at_end = true;
    }

    fn image(&mut self, element: &Element) {
        let Some(src) = element.attribute("src").filter(|src| !src.is_empty()) else {
            return;
        };
        let image = ImageElement {
            src: src.to_string(),
            alt: element.attribute("alt").map(str::to_string),
            width: element.attribute("width").and_then(parse_dimension),
            height: element.attribute("height").and_then(parse_dimension),
        };
        let handle = self.resolver.resolve(&image);
        if handle.is_placeholder() {
            log::debug!("Image {} left as placeholder", image.src);
        }

        let start = self.out.len();
        self.push_char(OBJECT_REPLACEMENT);
        self.add_range(
            StyleKind::Image(ImageSpan {
                element: image,
                handle,
            }),
            start,
            start + 1,
        );
    }

    fn text(&mut self, text: &str) {
        if self.pre_depth > 0 {
            for ch in text.chars() {
                match ch {
                    '\r' => {}
                    '\n' => self.push_newline(),
                    _ => self.push_char(ch),
                }
            }
            return;
        }

        for ch in text.chars() {
            if is_html_whitespace(ch) {
                self.pending_space = true;
            } else {
                self.push_char(ch);
            }
        }
    }

    fn push_char(&mut self, ch: char) {
        if self.pending_space && !self.at_line_start() {
            self.out.push_char(' ');
        }
        self.pending_space = false;
        self.out.push_char(ch);
        self.block_break_at_end = false;
    }

    fn push_newline(&mut self) {
        self.pending_space = false;
        self.out.push_char('\n');
        self.block_break_at_end = false;
    }

    /// Start a new line unless already at one; returns whether a break was
    /// written
    fn ensure_newline(&mut self) -> bool {
        self.pending_space = false;
        if self.at_line_start() {
            return false;
        }
        self.push_newline();
        true
    }

    /// Where the content of an inline element begins. A pending space is
    /// written before it and stays outside of the element.
    fn inline_start(&self) -> usize {
        if self.pending_space && !self.at_line_start() {
            self.out.len() + 1
        } else {
            self.out.len()
        }
    }

    fn at_line_start(&self) -> bool {
        matches!(self.out.last_char(), None | Some('\n'))
    }

    fn add_range(&mut self, kind: StyleKind, start: usize, end: usize) {
        if end > start {
            self.ranges.push(StyleRange::new(kind, start, end));
        }
    }

    fn finish(mut self) -> StyledBuffer {
        if self.block_break_at_end {
            self.out.trim_trailing_newline();
        }
        let len = self.out.len();
        for range in self.ranges {
            let end = range.end.min(len);
            if end <= range.start {
                continue;
            }
            if let Err(err) = self.out.add_range(range.kind, range.start, end) {
                log::warn!("Dropping style range: {err}");
            }
        }
        self.out.normalize();
        self.out.restyle_quotes(self.theme.quote_style());
        self.out
    }
}

fn inline_kind(element: &Element) -> Option<StyleKind> {
    match element.tag.as_str() {
        "b" | "strong" => Some(StyleKind::Bold),
        "i" | "em" | "cite" | "dfn" => Some(StyleKind::Italic),
        "u" | "ins" => Some(StyleKind::Underline),
        "s" | "strike" | "del" => Some(StyleKind::Strikethrough),
        "a" => element
            .attribute("href")
            .map(|href| StyleKind::Link(href.to_string())),
        _ => None,
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    value.trim().trim_end_matches("px").parse().ok()
}

fn is_html_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Serialize the whole buffer
pub fn to_html(buffer: &StyledBuffer) -> String {
    HtmlWriter::new(buffer).write()
}

/// Serialize `[start, end)`; ranges reaching outside are clipped
pub fn to_html_range(
    buffer: &StyledBuffer,
    start: usize,
    end: usize,
) -> Result<String, EditError> {
    Ok(to_html(&buffer.sub_range(start, end)?))
}

struct HtmlWriter<'a> {
    chars: &'a [char],
    ranges: Vec<&'a StyleRange>,
    out: String,
    open: Vec<&'a StyleKind>,
    /// Start and end of the quote being written
    quote: Option<(usize, usize)>,
}

impl<'a> HtmlWriter<'a> {
    fn new(buffer: &'a StyledBuffer) -> Self {
        HtmlWriter {
            chars: buffer.chars(),
            ranges: buffer.ranges(),
            out: String::new(),
            open: Vec::new(),
            quote: None,
        }
    }

    fn write(mut self) -> String {
        for pos in 0..self.chars.len() {
            if let Some((_, end)) = self.quote
                && end == pos
            {
                self.close_quote();
            }
            if self.quote.is_none() {
                self.open_quote(pos);
            }

            let ch = self.chars[pos];
            if ch == '\n' && self.newline_is_implied(pos) {
                continue;
            }
            if ch == OBJECT_REPLACEMENT && self.write_object(pos) {
                continue;
            }

            self.sync_inline(pos);
            match ch {
                '\n' => self.out.push_str("<br>"),
                ' ' if self.space_needs_entity(pos) => self.out.push_str("&nbsp;"),
                '\t' | '\r' | '\x0c' | '\u{a0}' => self.out.push_str("&nbsp;"),
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                _ => self.out.push(ch),
            }
        }
        self.close_inline();
        if self.quote.is_some() {
            self.close_quote();
        }
        self.out
    }

    fn open_quote(&mut self, pos: usize) {
        let quote = self
            .ranges
            .iter()
            .filter(|range| range.start == pos && range.end > pos)
            .filter_map(|range| match &range.kind {
                StyleKind::Quote(style) => Some((*style, range.end)),
                _ => None,
            })
            .max_by_key(|(_, end)| *end);
        let Some((style, end)) = quote else {
            return;
        };

        self.close_inline();
        self.out.push_str(&format!(
            "<blockquote style=\"margin: 0; padding-left: {}px; border-left: {}px solid {}\">",
            style.indent.saturating_sub(style.stripe_width),
            style.stripe_width,
            css_color(style.color),
        ));
        self.quote = Some((pos, end));
    }

    fn close_quote(&mut self) {
        self.close_inline();
        self.out.push_str("</blockquote>");
        self.quote = None;
    }

    /// Separators and images; returns false for a bare placeholder glyph
    fn write_object(&mut self, pos: usize) -> bool {
        let object = self.ranges.iter().copied().find(|range| {
            range.start == pos
                && range.end == pos + 1
                && matches!(range.kind, StyleKind::Separator(_) | StyleKind::Image(_))
        });
        match object.map(|range| &range.kind) {
            Some(StyleKind::Separator(_)) => {
                self.close_inline();
                self.out.push_str("<hr>");
                true
            }
            Some(StyleKind::Image(span)) => {
                self.sync_inline(pos);
                let element = &span.element;
                self.out.push_str("<img src=\"");
                escape_attribute(&element.src, &mut self.out);
                self.out.push('"');
                if let Some(alt) = &element.alt {
                    self.out.push_str(" alt=\"");
                    escape_attribute(alt, &mut self.out);
                    self.out.push('"');
                }
                if let Some(width) = element.width {
                    self.out.push_str(&format!(" width=\"{width}\""));
                }
                if let Some(height) = element.height {
                    self.out.push_str(&format!(" height=\"{height}\""));
                }
                self.out.push('>');
                true
            }
            _ => false,
        }
    }

    /// Breaks that the surrounding block markup already produces
    fn newline_is_implied(&self, pos: usize) -> bool {
        let single = pos > 0 && self.chars[pos - 1] != '\n';

        if pos > 0 && self.is_separator(pos - 1) {
            return true;
        }
        if single && self.is_separator(pos + 1) {
            return true;
        }
        if let Some((start, end)) = self.quote
            && end == pos + 1
            && pos > start
            && self.chars[pos - 1] != '\n'
        {
            return true;
        }
        single
            && self.ranges.iter().any(|range| {
                matches!(range.kind, StyleKind::Quote(_))
                    && range.start == pos + 1
                    && range.end > range.start
            })
    }

    fn is_separator(&self, pos: usize) -> bool {
        self.chars.get(pos) == Some(&OBJECT_REPLACEMENT)
            && self.ranges.iter().any(|range| {
                range.start == pos && matches!(range.kind, StyleKind::Separator(_))
            })
    }

    /// Spaces that collapsing whitespace would otherwise swallow
    fn space_needs_entity(&self, pos: usize) -> bool {
        let line_start = pos == 0 || matches!(self.chars[pos - 1], '\n' | ' ');
        let line_end = match self.chars.get(pos + 1) {
            None | Some('\n') => true,
            Some(_) => self.is_separator(pos + 1),
        };
        line_start || line_end
    }

    fn sync_inline(&mut self, pos: usize) {
        let mut wanted: Vec<&'a StyleKind> = Vec::new();
        for range in self.ranges.iter().copied() {
            if !range.kind.is_inline() || range.start > pos || pos >= range.end {
                continue;
            }
            let duplicate = wanted.iter().any(|kind| {
                **kind == range.kind
                    || (matches!(kind, StyleKind::Link(_))
                        && matches!(range.kind, StyleKind::Link(_)))
            });
            if !duplicate {
                wanted.push(&range.kind);
            }
        }
        wanted.sort_by_key(|kind| tag_order(kind));

        let common = self
            .open
            .iter()
            .zip(&wanted)
            .take_while(|(open, wanted)| open == wanted)
            .count();
        while self.open.len() > common {
            self.close_top();
        }
        for kind in &wanted[common..] {
            self.out.push_str(&open_tag(kind));
            self.open.push(*kind);
        }
    }

    fn close_inline(&mut self) {
        while !self.open.is_empty() {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        if let Some(kind) = self.open.pop() {
            self.out.push_str("</");
            self.out.push_str(tag_name(kind));
            self.out.push('>');
        }
    }
}

fn tag_order(kind: &StyleKind) -> u8 {
    match kind {
        StyleKind::Link(_) => 0,
        StyleKind::Bold => 1,
        StyleKind::Italic => 2,
        StyleKind::Underline => 3,
        StyleKind::Strikethrough => 4,
        _ => 5,
    }
}

fn tag_name(kind: &StyleKind) -> &'static str {
    match kind {
        StyleKind::Link(_) => "a",
        StyleKind::Bold => "b",
        StyleKind::Italic => "i",
        StyleKind::Underline => "u",
        StyleKind::Strikethrough => "s",
        _ => "span",
    }
}

fn open_tag(kind: &StyleKind) -> String {
    match kind {
        StyleKind::Link(href) => {
            let mut tag = String::from("<a href=\"");
            escape_attribute(href, &mut tag);
            tag.push_str("\">");
            tag
        }
        other => format!("<{}>", tag_name(other)),
    }
}
