//! Document tree types.
//!
//! A parsed content document is a strictly top-down owned tree of [`Node`]s.
//! Transforms walk it pre-order with [`walk`] / [`walk_mut`].

use std::path::{Path, PathBuf};

// =============================================================================
// Nodes
// =============================================================================

/// A node in a parsed document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Plain text content.
    Text(String),
    /// Raw markup passed through verbatim (lowercase HTML).
    Html(String),
    /// A component or structured element invocation: `<Card title="x">...</Card>`.
    Element(Element),
    /// An import/export declaration block.
    Esm(String),
    /// The YAML frontmatter block, without its `---` fences.
    Frontmatter(String),
    /// A generic container rendered as the given HTML tag (`p`, `h2`, `li`, ...).
    Block(Block),
    /// A Markdown image.
    Image(Image),
    /// A Markdown hyperlink.
    Link(Link),
    /// A fenced or indented code block.
    Code { lang: String, code: String },
    /// Inline code span.
    InlineCode(String),
    SoftBreak,
    HardBreak,
    Rule,
}

/// An element invocation with attributes and children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Component-like elements start with an uppercase letter.
    pub fn is_component(&self) -> bool {
        is_component_name(&self.name)
    }

    /// The identifier a component invocation binds to.
    ///
    /// `Foo.Bar` resolves through `Foo`, so only the root counts.
    pub fn root_name(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Returns true if a tag name refers to a component rather than plain markup.
pub fn is_component_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// A single element attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::String(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// `name="value"` or `name='value'`
    String(String),
    /// `name={expression}`, stored without the braces
    Expression(String),
    /// Bare `name`
    Flag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub tag: &'static str,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub src: String,
    pub alt: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub href: String,
    pub title: String,
    pub children: Vec<Node>,
}

impl Node {
    /// Child nodes, for the kinds that have any.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            Node::Block(block) => &block.children,
            Node::Link(link) => &link.children,
            Node::Text(_)
            | Node::Html(_)
            | Node::Esm(_)
            | Node::Frontmatter(_)
            | Node::Image(_)
            | Node::Code { .. }
            | Node::InlineCode(_)
            | Node::SoftBreak
            | Node::HardBreak
            | Node::Rule => &[],
        }
    }

    /// Mutable child nodes, or `None` for leaf kinds.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Element(el) => Some(&mut el.children),
            Node::Block(block) => Some(&mut block.children),
            Node::Link(link) => Some(&mut link.children),
            Node::Text(_)
            | Node::Html(_)
            | Node::Esm(_)
            | Node::Frontmatter(_)
            | Node::Image(_)
            | Node::Code { .. }
            | Node::InlineCode(_)
            | Node::SoftBreak
            | Node::HardBreak
            | Node::Rule => None,
        }
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Visit every node pre-order.
pub fn walk<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a Node)) {
    for node in nodes {
        visit(node);
        walk(node.children(), visit);
    }
}

/// Visit every node pre-order with mutable access.
///
/// The visitor runs on a node before its children, so it may replace a
/// node's children and the walk continues into the new ones.
pub fn walk_mut(nodes: &mut [Node], visit: &mut impl FnMut(&mut Node)) {
    for node in nodes.iter_mut() {
        visit(node);
        if let Some(children) = node.children_mut() {
            walk_mut(children, visit);
        }
    }
}

// =============================================================================
// Documents
// =============================================================================

/// A parsed content document: the root of the tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// The raw frontmatter block, if the document has one.
    pub fn frontmatter(&self) -> Option<&str> {
        self.children.iter().find_map(|node| match node {
            Node::Frontmatter(yaml) => Some(yaml.as_str()),
            _ => None,
        })
    }

    /// All import/export declaration sources in document order.
    pub fn esm_blocks(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|node| match node {
            Node::Esm(source) => Some(source.as_str()),
            _ => None,
        })
    }
}

/// The file a document was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path as discovered.
    pub path: PathBuf,
    /// Path with symlinks resolved; equals `path` if resolution fails.
    pub real_path: PathBuf,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let real_path = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        Self { path, real_path }
    }

    /// Directory containing the document.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Node> {
        vec![
            Node::Esm("import A from './a'".to_string()),
            Node::Block(Block {
                tag: "p",
                children: vec![
                    Node::Text("hi ".to_string()),
                    Node::Element(Element {
                        name: "Foo.Bar".to_string(),
                        attributes: vec![],
                        children: vec![Node::Text("inner".to_string())],
                    }),
                ],
            }),
        ]
    }

    #[test]
    fn test_walk_is_pre_order() {
        let nodes = sample();
        let mut seen = Vec::new();
        walk(&nodes, &mut |node| {
            seen.push(match node {
                Node::Esm(_) => "esm",
                Node::Block(_) => "block",
                Node::Text(_) => "text",
                Node::Element(_) => "element",
                _ => "other",
            })
        });
        assert_eq!(seen, vec!["esm", "block", "text", "element", "text"]);
    }

    #[test]
    fn test_walk_mut_rewrites_text() {
        let mut nodes = sample();
        walk_mut(&mut nodes, &mut |node| {
            if let Node::Text(text) = node {
                *text = text.to_uppercase();
            }
        });
        let mut texts = Vec::new();
        walk(&nodes, &mut |node| {
            if let Node::Text(text) = node {
                texts.push(text.clone());
            }
        });
        assert_eq!(texts, vec!["HI ", "INNER"]);
    }

    #[test]
    fn test_element_root_name() {
        assert_eq!(Element::new("Foo.Bar.Baz").root_name(), "Foo");
        assert_eq!(Element::new("Card").root_name(), "Card");
        assert!(Element::new("Card").is_component());
        assert!(!Element::new("div").is_component());
    }

    #[test]
    fn test_document_frontmatter_and_esm() {
        let doc = Document::new(vec![
            Node::Frontmatter("title: Hi".to_string()),
            Node::Esm("import A from './a'".to_string()),
            Node::Text("body".to_string()),
        ]);
        assert_eq!(doc.frontmatter(), Some("title: Hi"));
        assert_eq!(doc.esm_blocks().count(), 1);
    }
}
