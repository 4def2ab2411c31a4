//! Document parsing.
//!
//! Turns MDX-flavoured Markdown into a [`Document`] tree:
//!
//! - a leading `---` YAML block becomes a [`Node::Frontmatter`]
//! - top-level paragraphs starting with `import`/`export` become [`Node::Esm`]
//! - capitalized tags inside markup (`<Card title="x">`, `<Foo.Bar />`) become
//!   [`Node::Element`]s; their children are everything up to the closing tag
//! - everything else is regular Markdown, parsed with pulldown-cmark

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;

use super::document::split_front_matter;
use super::tree::{Attribute, AttributeValue, Block, Document, Element, Image, Link, Node, is_component_name};

/// Matches any opening, closing or self-closing tag.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Za-z][\w.$-]*)([^<>]*?)(/?)>").unwrap());

/// Matches a single attribute inside a tag.
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([A-Za-z_:$][\w:.$-]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|\{([^}]*)\}|([^\s"'=<>`]+)))?"#,
    )
    .unwrap()
});

/// Matches member-expression component tags like `<Foo.Bar`.
static MEMBER_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)([A-Z][A-Za-z0-9]*(?:\.[A-Za-z0-9]+)+)").unwrap());

/// CommonMark tag names cannot contain dots, so member tags are encoded
/// before Markdown parsing and decoded when the tree is built.
const MEMBER_DOT: &str = "-x2e-";

/// Parse a complete document.
pub fn parse_document(source: &str) -> Document {
    let split = split_front_matter(source);

    let mut children = Vec::new();
    if let Some(yaml) = split.front_matter {
        children.push(Node::Frontmatter(yaml.to_string()));
    }

    for segment in segment_body(split.body) {
        match segment {
            Segment::Esm(esm) => children.push(Node::Esm(esm)),
            Segment::Markdown(markdown) => children.extend(parse_markdown(&markdown)),
        }
    }

    Document::new(children)
}

// =============================================================================
// ESM segmentation
// =============================================================================

#[derive(Debug, PartialEq)]
enum Segment {
    Esm(String),
    Markdown(String),
}

/// Split a body into Markdown chunks and import/export blocks.
///
/// An ESM block starts at the beginning of a paragraph (outside code fences)
/// with `import ` or `export ` and runs until the next blank line.
fn segment_body(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut markdown = String::new();
    let mut esm: Option<String> = None;
    let mut fence: Option<&str> = None;
    let mut at_paragraph_start = true;

    for line in body.lines() {
        if let Some(block) = esm.as_mut() {
            if line.trim().is_empty() {
                segments.push(Segment::Esm(std::mem::take(block)));
                esm = None;
                at_paragraph_start = true;
            } else {
                block.push('\n');
                block.push_str(line);
            }
            continue;
        }

        let trimmed = line.trim_start();
        match fence {
            Some(marker) => {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
            }
            None if trimmed.starts_with("```") => fence = Some("```"),
            None if trimmed.starts_with("~~~") => fence = Some("~~~"),
            None if at_paragraph_start
                && (line.starts_with("import ") || line.starts_with("export ")) =>
            {
                if !markdown.trim().is_empty() {
                    segments.push(Segment::Markdown(std::mem::take(&mut markdown)));
                }
                markdown.clear();
                esm = Some(line.to_string());
                continue;
            }
            None => {}
        }

        at_paragraph_start = fence.is_none() && line.trim().is_empty();
        markdown.push_str(line);
        markdown.push('\n');
    }

    if let Some(block) = esm {
        segments.push(Segment::Esm(block));
    }
    if !markdown.trim().is_empty() {
        segments.push(Segment::Markdown(markdown));
    }

    segments
}

// =============================================================================
// Markdown → tree
// =============================================================================

/// Parse a Markdown chunk into top-level nodes.
fn parse_markdown(markdown: &str) -> Vec<Node> {
    let encoded = MEMBER_TAG_RE.replace_all(markdown, |caps: &regex::Captures| {
        format!("<{}{}", &caps[1], caps[2].replace('.', MEMBER_DOT))
    });

    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(&encoded, options) {
        builder.event(event);
    }
    builder.finish()
}

fn decode(s: &str) -> String {
    s.replace(MEMBER_DOT, ".")
}

enum FrameKind {
    Root,
    Block(&'static str),
    Link { href: String, title: String },
    Image { src: String, title: String },
    Element { name: String, attributes: Vec<Attribute> },
    Code { lang: String },
}

struct Frame {
    kind: FrameKind,
    children: Vec<Node>,
    /// Accumulated code text for code block frames.
    text: String,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn into_node(self) -> Option<Node> {
        match self.kind {
            FrameKind::Root => None,
            FrameKind::Block(tag) => Some(Node::Block(Block {
                tag,
                children: self.children,
            })),
            FrameKind::Link { href, title } => Some(Node::Link(Link {
                href,
                title,
                children: self.children,
            })),
            FrameKind::Image { src, title } => Some(Node::Image(Image {
                src,
                alt: plain_text(&self.children),
                title,
            })),
            FrameKind::Element { name, attributes } => Some(Node::Element(Element {
                name,
                attributes,
                children: self.children,
            })),
            FrameKind::Code { lang } => Some(Node::Code {
                lang,
                code: self.text,
            }),
        }
    }
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::new(FrameKind::Root)],
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(TagEnd::HtmlBlock) => {}
            Event::End(_) => self.close_frame(),
            Event::Text(text) => {
                if let Some(Frame {
                    kind: FrameKind::Code { .. },
                    text: code,
                    ..
                }) = self.stack.last_mut()
                {
                    code.push_str(&decode(&text));
                } else {
                    self.push_text(&decode(&text));
                }
            }
            Event::Code(code) => self.push(Node::InlineCode(decode(&code))),
            Event::Html(html) | Event::InlineHtml(html) => self.markup(&html),
            Event::SoftBreak => self.push(Node::SoftBreak),
            Event::HardBreak => self.push(Node::HardBreak),
            Event::Rule => self.push(Node::Rule),
            Event::TaskListMarker(checked) => {
                let checked = if checked { " checked" } else { "" };
                self.push(Node::Html(format!(
                    "<input type=\"checkbox\" disabled{checked} />"
                )));
            }
            Event::FootnoteReference(label) => self.push_text(&format!("[^{label}]")),
            Event::InlineMath(math) | Event::DisplayMath(math) => self.push_text(&math),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            // Markup inside an HTML block is handled by `markup`
            Tag::HtmlBlock => return,
            Tag::Paragraph => FrameKind::Block("p"),
            Tag::Heading { level, .. } => FrameKind::Block(heading_tag(level)),
            Tag::BlockQuote(_) => FrameKind::Block("blockquote"),
            Tag::CodeBlock(kind) => FrameKind::Code {
                lang: match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                },
            },
            Tag::List(Some(_)) => FrameKind::Block("ol"),
            Tag::List(None) => FrameKind::Block("ul"),
            Tag::Item => FrameKind::Block("li"),
            Tag::Emphasis => FrameKind::Block("em"),
            Tag::Strong => FrameKind::Block("strong"),
            Tag::Strikethrough => FrameKind::Block("del"),
            Tag::Table(_) => FrameKind::Block("table"),
            Tag::TableHead => FrameKind::Block("thead"),
            Tag::TableRow => FrameKind::Block("tr"),
            Tag::TableCell => FrameKind::Block("td"),
            Tag::Link {
                dest_url, title, ..
            } => FrameKind::Link {
                href: dest_url.to_string(),
                title: title.to_string(),
            },
            Tag::Image {
                dest_url, title, ..
            } => FrameKind::Image {
                src: dest_url.to_string(),
                title: title.to_string(),
            },
            _ => FrameKind::Block("div"),
        };
        self.stack.push(Frame::new(kind));
    }

    /// Close the innermost Markdown frame, auto-closing any component
    /// elements left open inside it.
    fn close_frame(&mut self) {
        while self.stack.len() > 1 {
            let Some(frame) = self.stack.pop() else {
                return;
            };
            let was_element = matches!(frame.kind, FrameKind::Element { .. });
            if let Some(node) = frame.into_node() {
                self.push(node);
            }
            if !was_element {
                return;
            }
        }
    }

    /// Close the innermost open element with the given name.
    ///
    /// Returns false if no such element is open.
    fn close_element(&mut self, name: &str) -> bool {
        let open = self.stack.iter().rposition(|frame| {
            matches!(&frame.kind, FrameKind::Element { name: open, .. } if open == name)
        });
        let Some(position) = open else {
            return false;
        };
        // Only elements may be closed implicitly on the way
        if self.stack[position + 1..]
            .iter()
            .any(|frame| !matches!(frame.kind, FrameKind::Element { .. }))
        {
            return false;
        }
        while self.stack.len() > position {
            if let Some(node) = self.stack.pop().and_then(Frame::into_node) {
                self.push(node);
            }
        }
        true
    }

    /// Split a markup chunk into raw HTML and component elements.
    fn markup(&mut self, html: &str) {
        let mut last = 0;
        for caps in TAG_RE.captures_iter(html) {
            let Some(whole) = caps.get(0) else { continue };
            let name = decode(&caps[2]);
            if !is_component_name(&name) {
                continue;
            }

            self.push_html(&html[last..whole.start()]);
            last = whole.end();

            let closing = !caps[1].is_empty();
            let self_closing = !caps[4].is_empty();

            if closing {
                if !self.close_element(&name) {
                    self.push_html(whole.as_str());
                }
            } else if self_closing {
                self.push(Node::Element(Element {
                    name,
                    attributes: parse_attributes(&caps[3]),
                    children: Vec::new(),
                }));
            } else {
                self.stack.push(Frame::new(FrameKind::Element {
                    name,
                    attributes: parse_attributes(&caps[3]),
                }));
            }
        }
        self.push_html(&html[last..]);
    }

    fn push_html(&mut self, html: &str) {
        if html.trim().is_empty() {
            return;
        }
        self.push(Node::Html(decode(html)));
    }

    fn push_text(&mut self, text: &str) {
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        if let Some(Node::Text(previous)) = frame.children.last_mut() {
            previous.push_str(text);
        } else {
            frame.children.push(Node::Text(text.to_string()));
        }
    }

    fn push(&mut self, node: Node) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while self.stack.len() > 1 {
            if let Some(node) = self.stack.pop().and_then(Frame::into_node) {
                self.push(node);
            }
        }
        self.stack.pop().map(|root| root.children).unwrap_or_default()
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// Parse the attribute section of a tag.
pub fn parse_attributes(source: &str) -> Vec<Attribute> {
    ATTR_RE
        .captures_iter(source)
        .map(|caps| {
            let value = if let Some(v) = caps.get(2).or_else(|| caps.get(3)) {
                AttributeValue::String(v.as_str().to_string())
            } else if let Some(v) = caps.get(4) {
                AttributeValue::Expression(v.as_str().trim().to_string())
            } else if let Some(v) = caps.get(5) {
                AttributeValue::String(v.as_str().to_string())
            } else {
                AttributeValue::Flag
            };
            Attribute {
                name: caps[1].to_string(),
                value,
            }
        })
        .collect()
}

/// Concatenated text content of a node list.
fn plain_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    super::tree::walk(nodes, &mut |node| match node {
        Node::Text(text) | Node::InlineCode(text) => out.push_str(text),
        _ => {}
    });
    out
}
