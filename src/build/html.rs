//! Render a document tree to an HTML fragment.
//!
//! Components render as hydration placeholders:
//! `<div data-component="Card" data-props="{...}">children</div>`.
//! Frontmatter and import/export blocks produce no output.

use serde_json::{Map, Value};
use tera::escape_html;

use super::tree::{AttributeValue, Document, Element, Node};

/// Tags followed by a newline so the fragment stays readable.
const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "ul", "ol", "li", "table", "thead",
    "tr", "div",
];

pub fn render_document(doc: &Document) -> String {
    let mut out = String::new();
    render_nodes(&doc.children, &mut out);
    out
}

fn render_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        render_node(node, out);
    }
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape_html(text)),
        Node::Html(html) => out.push_str(html),
        Node::Element(el) if el.is_component() => render_component(el, out),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for attr in &el.attributes {
                match &attr.value {
                    AttributeValue::String(value) | AttributeValue::Expression(value) => {
                        push_attr(out, &attr.name, value)
                    }
                    AttributeValue::Flag => {
                        out.push(' ');
                        out.push_str(&attr.name);
                    }
                }
            }
            out.push('>');
            render_nodes(&el.children, out);
            out.push_str(&format!("</{}>", el.name));
        }
        Node::Esm(_) | Node::Frontmatter(_) => {}
        Node::Block(block) => {
            out.push_str(&format!("<{}>", block.tag));
            render_nodes(&block.children, out);
            out.push_str(&format!("</{}>", block.tag));
            if BLOCK_TAGS.contains(&block.tag) {
                out.push('\n');
            }
        }
        Node::Image(image) => {
            out.push_str("<img");
            push_attr(out, "src", &image.src);
            push_attr(out, "alt", &image.alt);
            if !image.title.is_empty() {
                push_attr(out, "title", &image.title);
            }
            out.push_str(" />");
        }
        Node::Link(link) => {
            out.push_str("<a");
            push_attr(out, "href", &link.href);
            if !link.title.is_empty() {
                push_attr(out, "title", &link.title);
            }
            out.push('>');
            render_nodes(&link.children, out);
            out.push_str("</a>");
        }
        Node::Code { lang, code } => {
            if lang.is_empty() {
                out.push_str("<pre><code>");
            } else {
                out.push_str(&format!(
                    "<pre><code class=\"language-{}\">",
                    escape_html(lang)
                ));
            }
            out.push_str(&escape_html(code));
            out.push_str("</code></pre>\n");
        }
        Node::InlineCode(code) => {
            out.push_str("<code>");
            out.push_str(&escape_html(code));
            out.push_str("</code>");
        }
        Node::SoftBreak => out.push('\n'),
        Node::HardBreak => out.push_str("<br />\n"),
        Node::Rule => out.push_str("<hr />\n"),
    }
}

fn render_component(el: &Element, out: &mut String) {
    out.push_str("<div");
    push_attr(out, "data-component", &el.name);
    if !el.attributes.is_empty() {
        push_attr(out, "data-props", &component_props(el).to_string());
    }
    out.push('>');
    render_nodes(&el.children, out);
    out.push_str("</div>\n");
}

/// Component attributes as a JSON object.
///
/// Expression values that are valid JSON literals keep their type; other
/// expressions are passed through as source text.
pub fn component_props(el: &Element) -> Value {
    let mut props = Map::new();
    for attr in &el.attributes {
        let value = match &attr.value {
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::Expression(expr) => {
                serde_json::from_str(expr).unwrap_or_else(|_| Value::String(expr.clone()))
            }
            AttributeValue::Flag => Value::Bool(true),
        };
        props.insert(attr.name.clone(), value);
    }
    Value::Object(props)
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
}
