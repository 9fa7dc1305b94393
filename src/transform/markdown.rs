//! Markdown outline to mind-map tree using pulldown-cmark.
//!
//! Headings nest by level, list items nest under the heading (or item) that
//! owns them, and leaf blocks (paragraphs, fenced code, tables) hang off the
//! nearest open node.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::{FeatureTag, Features, Node, NodeKind, RenderResult, TransformError, Transformer};
use crate::utils::html::escape;

/// Default transformer for markdown sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownTransformer;

impl Transformer for MarkdownTransformer {
    fn transform(&self, content: &str) -> Result<RenderResult, TransformError> {
        if let Some(offset) = content.find('\0') {
            return Err(TransformError::Rejected(format!(
                "NUL byte at offset {offset}, not a text outline"
            )));
        }
        Ok(TreeBuilder::new(content).build())
    }
}

fn parser_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_MATH);
    opts.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    opts
}

/// Block whose events are being buffered until its end tag.
enum CaptureKind {
    Heading(u32),
    Paragraph,
    /// First paragraph of a loose list item becomes the item's label.
    ItemText,
    Code(Option<String>),
    Table,
    Html,
    /// Front matter; swallowed.
    Metadata,
}

struct Capture<'a> {
    kind: CaptureKind,
    events: Vec<Event<'a>>,
    lines: (usize, usize),
}

/// Byte offset → line number lookup.
struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let newlines = source
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| (b == b'\n').then_some(i))
            .collect();
        Self { newlines }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.newlines.partition_point(|&nl| nl < offset)
    }

    /// Zero-based `[start, end)` line span of a byte range.
    fn span(&self, range: &Range<usize>) -> (usize, usize) {
        let start = self.line_of(range.start);
        let end = self.line_of(range.end.saturating_sub(1).max(range.start)) + 1;
        (start, end)
    }
}

struct TreeBuilder<'a> {
    source: &'a str,
    lines: LineIndex,
    /// Open nodes; `stack[0]` is the root.
    stack: Vec<Node>,
    capture: Option<Capture<'a>>,
    /// Inline events of a tight list item, flushed into its label.
    item_text: Vec<Event<'a>>,
    features: Features,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lines: LineIndex::new(source),
            stack: vec![Node::root()],
            capture: None,
            item_text: Vec::new(),
            features: Features::default(),
        }
    }

    fn build(mut self) -> RenderResult {
        let parser = Parser::new_ext(self.source, parser_options());
        for (event, range) in parser.into_offset_iter() {
            self.handle(event, range);
        }

        self.flush_item_text();
        self.close_while(|_| true);

        let root = self.stack.pop().unwrap_or_else(Node::root);
        RenderResult {
            root,
            features: self.features,
        }
    }

    fn handle(&mut self, event: Event<'a>, range: Range<usize>) {
        self.note_features(&event);

        if let Some(capture) = self.capture.as_mut() {
            if closes(&capture.kind, &event) {
                if matches!(capture.kind, CaptureKind::Table) {
                    capture.events.push(event);
                }
                self.finish_capture();
            } else {
                capture.events.push(event);
            }
            return;
        }

        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let depth = heading_depth(level);
                self.flush_item_text();
                self.close_while(|node| {
                    node.kind != NodeKind::Heading || node.depth >= depth
                });
                self.begin(CaptureKind::Heading(depth), &range, Vec::new());
            }
            Event::Start(Tag::Paragraph) => {
                let kind = if self.awaiting_item_text() {
                    CaptureKind::ItemText
                } else {
                    self.flush_item_text();
                    CaptureKind::Paragraph
                };
                self.begin(kind, &range, Vec::new());
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                self.flush_item_text();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.begin(CaptureKind::Code(lang), &range, Vec::new());
            }
            Event::Start(tag @ Tag::Table(_)) => {
                self.flush_item_text();
                self.begin(CaptureKind::Table, &range, vec![Event::Start(tag)]);
            }
            Event::Start(Tag::MetadataBlock(_)) => {
                self.begin(CaptureKind::Metadata, &range, Vec::new());
            }
            Event::Start(Tag::List(_)) => self.flush_item_text(),
            Event::Start(Tag::Item) => {
                self.flush_item_text();
                let depth = self.top().depth + 1;
                let (start, end) = self.lines.span(&range);
                self.stack
                    .push(Node::new(NodeKind::ListItem, depth, String::new()).with_lines(start, end));
            }
            Event::End(TagEnd::Item) => {
                self.flush_item_text();
                if self.top().kind == NodeKind::ListItem {
                    self.close_top();
                }
            }
            Event::Start(Tag::HtmlBlock) => {
                self.flush_item_text();
                self.begin(CaptureKind::Html, &range, Vec::new());
            }
            event if is_inline(&event) && self.top().kind == NodeKind::ListItem => {
                self.item_text.push(event);
            }
            _ => {}
        }
    }

    fn note_features(&mut self, event: &Event<'_>) {
        match event {
            Event::InlineMath(_) | Event::DisplayMath(_) => self.features.insert(FeatureTag::Katex),
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                if !info.trim().is_empty() =>
            {
                self.features.insert(FeatureTag::Prism)
            }
            _ => {}
        }
    }

    fn begin(&mut self, kind: CaptureKind, range: &Range<usize>, events: Vec<Event<'a>>) {
        self.capture = Some(Capture {
            kind,
            events,
            lines: self.lines.span(range),
        });
    }

    fn finish_capture(&mut self) {
        let Some(Capture {
            kind,
            events,
            lines: (start, end),
        }) = self.capture.take()
        else {
            return;
        };

        match kind {
            CaptureKind::Heading(depth) => {
                let node = Node::new(NodeKind::Heading, depth, render_inline(events))
                    .with_lines(start, end);
                self.stack.push(node);
            }
            CaptureKind::ItemText => {
                self.top_mut().content = render_inline(events);
            }
            CaptureKind::Paragraph => {
                let depth = self.top().depth + 1;
                let node = Node::new(NodeKind::Paragraph, depth, render_inline(events))
                    .with_lines(start, end);
                self.top_mut().children.push(node);
            }
            CaptureKind::Code(lang) => {
                let depth = self.top().depth + 1;
                let node = Node::new(NodeKind::Code, depth, render_code(events, lang.as_deref()))
                    .with_lines(start, end);
                self.top_mut().children.push(node);
            }
            CaptureKind::Table => {
                let depth = self.top().depth + 1;
                let node = Node::new(NodeKind::Table, depth, render_inline(events))
                    .with_lines(start, end);
                self.top_mut().children.push(node);
            }
            CaptureKind::Html => {
                let depth = self.top().depth + 1;
                let raw: String = events
                    .iter()
                    .filter_map(|e| match e {
                        Event::Html(html) => Some(html.as_ref()),
                        _ => None,
                    })
                    .collect();
                let node = Node::new(NodeKind::Paragraph, depth, raw.trim_end().to_string())
                    .with_lines(start, end);
                self.top_mut().children.push(node);
            }
            CaptureKind::Metadata => {}
        }
    }

    /// A list item that has not received its label yet.
    fn awaiting_item_text(&self) -> bool {
        let top = self.top();
        top.kind == NodeKind::ListItem
            && top.content.is_empty()
            && top.children.is_empty()
            && self.item_text.is_empty()
    }

    fn flush_item_text(&mut self) {
        if self.item_text.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.item_text);
        let label = render_inline(events);
        let top = self.top_mut();
        if top.content.is_empty() {
            top.content = label;
        } else {
            top.content.push_str(&label);
        }
    }

    /// Pop open nodes while `pred` holds, attaching each to its parent.
    fn close_while(&mut self, pred: impl Fn(&Node) -> bool) {
        while self.stack.len() > 1 && pred(self.top()) {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(node) = self.stack.pop() {
            self.top_mut().children.push(node);
        }
    }

    fn top(&self) -> &Node {
        // stack always holds the root
        &self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Node {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }
}

fn closes(kind: &CaptureKind, event: &Event<'_>) -> bool {
    matches!(
        (kind, event),
        (CaptureKind::Heading(_), Event::End(TagEnd::Heading(_)))
            | (CaptureKind::Paragraph | CaptureKind::ItemText, Event::End(TagEnd::Paragraph))
            | (CaptureKind::Code(_), Event::End(TagEnd::CodeBlock))
            | (CaptureKind::Table, Event::End(TagEnd::Table))
            | (CaptureKind::Html, Event::End(TagEnd::HtmlBlock))
            | (CaptureKind::Metadata, Event::End(TagEnd::MetadataBlock(_)))
    )
}

fn is_inline(event: &Event<'_>) -> bool {
    match event {
        Event::Text(_)
        | Event::Code(_)
        | Event::InlineMath(_)
        | Event::DisplayMath(_)
        | Event::InlineHtml(_)
        | Event::SoftBreak
        | Event::HardBreak
        | Event::FootnoteReference(_)
        | Event::TaskListMarker(_) => true,
        Event::Start(tag) => matches!(
            tag,
            Tag::Emphasis
                | Tag::Strong
                | Tag::Strikethrough
                | Tag::Superscript
                | Tag::Subscript
                | Tag::Link { .. }
                | Tag::Image { .. }
        ),
        Event::End(tag) => matches!(
            tag,
            TagEnd::Emphasis
                | TagEnd::Strong
                | TagEnd::Strikethrough
                | TagEnd::Superscript
                | TagEnd::Subscript
                | TagEnd::Link
                | TagEnd::Image
        ),
        _ => false,
    }
}

fn heading_depth(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn render_inline(events: Vec<Event<'_>>) -> String {
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    html.trim_end().to_string()
}

fn render_code(events: Vec<Event<'_>>, lang: Option<&str>) -> String {
    let code: String = events
        .iter()
        .filter_map(|e| match e {
            Event::Text(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect();
    let class = lang
        .map(|l| format!(" class=\"language-{}\"", escape(l)))
        .unwrap_or_default();
    format!("<pre><code{class}>{}</code></pre>", escape(code.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(source: &str) -> RenderResult {
        MarkdownTransformer.transform(source).unwrap()
    }

    #[test]
    fn test_headings_nest_by_level() {
        let result = tree("# A\n## B");
        let root = &result.root;

        assert_eq!(root.kind, NodeKind::Root);
        assert_eq!(root.child_contents(), vec!["A"]);
        let a = &root.children[0];
        assert_eq!(a.depth, 1);
        assert_eq!(a.child_contents(), vec!["B"]);
        assert!(a.children[0].children.is_empty());
    }

    #[test]
    fn test_sibling_headings() {
        let result = tree("# A\n## B\n## C\n# D\n");
        let root = &result.root;

        assert_eq!(root.child_contents(), vec!["A", "D"]);
        assert_eq!(root.children[0].child_contents(), vec!["B", "C"]);
    }

    #[test]
    fn test_skipped_heading_level() {
        let result = tree("# A\n### deep\n## B\n");
        let a = &result.root.children[0];

        assert_eq!(a.child_contents(), vec!["deep", "B"]);
        assert_eq!(a.children[0].depth, 3);
    }

    #[test]
    fn test_tight_list_under_heading() {
        let result = tree("# A\n- one\n- two\n  - nested\n");
        let a = &result.root.children[0];

        assert_eq!(a.child_contents(), vec!["one", "two"]);
        let two = &a.children[1];
        assert_eq!(two.kind, NodeKind::ListItem);
        assert_eq!(two.depth, 2);
        assert_eq!(two.child_contents(), vec!["nested"]);
        assert_eq!(two.children[0].depth, 3);
    }

    #[test]
    fn test_loose_list_item_label() {
        let result = tree("- first\n\n  more text\n\n- second\n");
        let root = &result.root;

        assert_eq!(root.child_contents(), vec!["first", "second"]);
        let first = &root.children[0];
        assert_eq!(first.child_contents(), vec!["more text"]);
        assert_eq!(first.children[0].kind, NodeKind::Paragraph);
    }

    #[test]
    fn test_inline_markup_rendered_as_html() {
        let result = tree("# *A* and `b`\n- [link](https://example.com)\n");
        let a = &result.root.children[0];

        assert_eq!(a.content, "<em>A</em> and <code>b</code>");
        assert_eq!(
            a.children[0].content,
            "<a href=\"https://example.com\">link</a>"
        );
    }

    #[test]
    fn test_paragraph_under_heading() {
        let result = tree("# A\nsome words\n");
        let a = &result.root.children[0];

        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].kind, NodeKind::Paragraph);
        assert_eq!(a.children[0].content, "some words");
    }

    #[test]
    fn test_fenced_code_sets_prism() {
        let result = tree("# A\n```rust\nfn main() {}\n```\n");
        let a = &result.root.children[0];

        assert!(result.features.contains(FeatureTag::Prism));
        assert_eq!(a.children[0].kind, NodeKind::Code);
        assert_eq!(
            a.children[0].content,
            "<pre><code class=\"language-rust\">fn main() {}</code></pre>"
        );
    }

    #[test]
    fn test_code_is_escaped() {
        let result = tree("```\n<b>&</b>\n```\n");
        let code = &result.root.children[0];

        assert!(!result.features.contains(FeatureTag::Prism));
        assert_eq!(code.content, "<pre><code>&lt;b&gt;&amp;&lt;/b&gt;</code></pre>");
    }

    #[test]
    fn test_math_sets_katex() {
        let result = tree("# Euler $e^{i\\pi} = -1$\n");
        assert!(result.features.contains(FeatureTag::Katex));
        assert!(!result.features.contains(FeatureTag::Prism));
    }

    #[test]
    fn test_table_leaf() {
        let result = tree("# A\n| x | y |\n|---|---|\n| 1 | 2 |\n");
        let a = &result.root.children[0];

        assert_eq!(a.children[0].kind, NodeKind::Table);
        assert!(a.children[0].content.starts_with("<table>"));
        assert!(a.children[0].content.ends_with("</table>"));
    }

    #[test]
    fn test_front_matter_ignored() {
        let result = tree("---\ntitle: notes\n---\n# A\n");
        assert_eq!(result.root.child_contents(), vec!["A"]);
    }

    #[test]
    fn test_line_payloads() {
        let result = tree("# A\n\n## B\n- x\n- y\n");
        let a = &result.root.children[0];
        let b = &a.children[0];

        assert_eq!(a.payload.unwrap().lines, [0, 1]);
        assert_eq!(b.payload.unwrap().lines, [2, 3]);
        assert_eq!(b.children[0].payload.unwrap().lines, [3, 4]);
        assert_eq!(b.children[1].payload.unwrap().lines, [4, 5]);
    }

    #[test]
    fn test_html_block_is_single_leaf() {
        let result = tree("# A\n<div>\nraw\n</div>\n");
        let a = &result.root.children[0];

        assert_eq!(a.children.len(), 1);
        assert_eq!(a.children[0].content, "<div>\nraw\n</div>");
    }

    #[test]
    fn test_binary_input_rejected() {
        let err = MarkdownTransformer.transform("# A\0B").unwrap_err();
        assert!(err.to_string().contains("offset 3"));
    }

    #[test]
    fn test_empty_document() {
        let result = tree("");
        assert_eq!(result.root.kind, NodeKind::Root);
        assert!(result.root.children.is_empty());
        assert!(result.features.is_empty());
    }

    #[test]
    fn test_line_index_span() {
        let index = LineIndex::new("ab\ncd\nef");
        assert_eq!(index.span(&(0..2)), (0, 1));
        assert_eq!(index.span(&(0..3)), (0, 1));
        assert_eq!(index.span(&(3..8)), (1, 3));
    }
}
