//! Image and link path rewriting.
//!
//! Authored content refers to images relative to the document
//! (`./diagram.png`) and to pages by site-absolute path (`/docs/intro`).
//! Compiled pages are served from `<base>/<url>/`, so both forms are
//! rewritten:
//!
//! - image targets (`![](..)`, `src=` on elements and raw markup): relative
//!   paths resolve against the document's directory under the content root,
//!   then get the base path; root-absolute paths just get the base path
//! - link targets (`[](..)`, `href=`): only root-absolute paths are touched,
//!   and only when a base path is configured
//!
//! External URLs, protocol-relative URLs, anchors, `mailto:` and `data:`
//! references are never rewritten.

use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::build::paths::{is_external_reference, normalize_url_path, to_slash, with_base_path};
use crate::build::tree::{AttributeValue, Document, Node, SourceFile, walk_mut};

/// `src`/`href` attributes with quoted values in raw markup.
static MARKUP_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|\s)(src|href)(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

pub struct RewriteContext<'a> {
    pub content_root: &'a Path,
    pub base_path: Option<&'a str>,
}

/// Rewrite every image and link target in a document.
pub fn rewrite_paths(doc: &mut Document, file: &SourceFile, cx: &RewriteContext<'_>) {
    let doc_dir = document_dir(file, cx.content_root);
    let base = cx.base_path;

    walk_mut(&mut doc.children, &mut |node| match node {
        Node::Image(image) => image.src = rewrite_image_path(&image.src, &doc_dir, base),
        Node::Link(link) => link.href = rewrite_link_path(&link.href, base),
        Node::Element(el) => {
            for attr in &mut el.attributes {
                let AttributeValue::String(value) = &mut attr.value else {
                    continue;
                };
                match attr.name.as_str() {
                    "src" => *value = rewrite_image_path(value, &doc_dir, base),
                    "href" => *value = rewrite_link_path(value, base),
                    _ => {}
                }
            }
        }
        Node::Html(html) => {
            if let Cow::Owned(rewritten) = rewrite_markup(html, &doc_dir, base) {
                *html = rewritten;
            }
        }
        Node::Text(_)
        | Node::Esm(_)
        | Node::Frontmatter(_)
        | Node::Block(_)
        | Node::Code { .. }
        | Node::InlineCode(_)
        | Node::SoftBreak
        | Node::HardBreak
        | Node::Rule => {}
    });
}

/// Rewrite an image reference found in a document in `doc_dir` (content
/// relative, slash separated, empty for the content root).
pub fn rewrite_image_path(reference: &str, doc_dir: &str, base_path: Option<&str>) -> String {
    if reference.is_empty() || is_external_reference(reference) {
        return reference.to_string();
    }
    if reference.starts_with('/') {
        return with_base_path(reference, base_path);
    }
    let resolved = normalize_url_path(&format!("/{doc_dir}/{reference}"));
    with_base_path(&resolved, base_path)
}

/// Rewrite a hyperlink target. Relative links are left as authored.
pub fn rewrite_link_path(reference: &str, base_path: Option<&str>) -> String {
    if base_path.is_some() && reference.starts_with('/') && !is_external_reference(reference) {
        with_base_path(reference, base_path)
    } else {
        reference.to_string()
    }
}

/// Rewrite `src=` and `href=` attributes inside raw markup.
fn rewrite_markup<'h>(html: &'h str, doc_dir: &str, base: Option<&str>) -> Cow<'h, str> {
    MARKUP_ATTR_RE.replace_all(html, |caps: &Captures| {
        let (value, quote) = match (caps.get(4), caps.get(5)) {
            (Some(v), _) => (v.as_str(), '"'),
            (None, Some(v)) => (v.as_str(), '\''),
            (None, None) => ("", '"'),
        };
        let rewritten = if &caps[2] == "src" {
            rewrite_image_path(value, doc_dir, base)
        } else {
            rewrite_link_path(value, base)
        };
        format!("{}{}{}{quote}{rewritten}{quote}", &caps[1], &caps[2], &caps[3])
    })
}

/// The document's directory relative to the content root.
///
/// Falls back to resolved paths when the document was reached through a
/// symlink, and to the root itself when it lies outside the content tree.
fn document_dir(file: &SourceFile, content_root: &Path) -> String {
    if let Ok(relative) = file.dir().strip_prefix(content_root) {
        return to_slash(relative);
    }

    let real_root = std::fs::canonicalize(content_root).ok();
    let relative = file
        .real_path
        .parent()
        .zip(real_root.as_deref())
        .and_then(|(dir, root)| dir.strip_prefix(root).ok());

    match relative {
        Some(relative) => to_slash(relative),
        None => {
            debug!(document = %file.path.display(), "document outside content root");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::parse::parse_document;
    use crate::build::tree::{Attribute, Element, Image, Link, walk};

    #[test]
    fn test_relative_image_under_base() {
        assert_eq!(rewrite_image_path("./a.png", "blog", Some("/site")), "/site/blog/a.png");
        assert_eq!(rewrite_image_path("a.png", "blog", Some("/site")), "/site/blog/a.png");
        assert_eq!(rewrite_image_path("../img/a.png", "blog/2024", None), "/blog/img/a.png");
        assert_eq!(rewrite_image_path("./a.png", "", None), "/a.png");
    }

    #[test]
    fn test_external_references_untouched() {
        for reference in [
            "https://x.com/a.png",
            "#anchor",
            "mailto:me@example.com",
            "data:image/png;base64,AAAA",
            "//cdn.example.com/a.png",
        ] {
            assert_eq!(rewrite_image_path(reference, "blog", Some("/site")), reference);
            assert_eq!(rewrite_link_path(reference, Some("/site")), reference);
        }
    }

    #[test]
    fn test_absolute_paths_get_base() {
        assert_eq!(
            rewrite_image_path("/already/absolute.png", "blog", Some("/site")),
            "/site/already/absolute.png"
        );
        assert_eq!(
            rewrite_image_path("/already/absolute.png", "blog", None),
            "/already/absolute.png"
        );
        assert_eq!(rewrite_link_path("/docs/intro", Some("/site")), "/site/docs/intro");
        assert_eq!(rewrite_link_path("/docs/intro", None), "/docs/intro");
    }

    #[test]
    fn test_relative_links_untouched() {
        assert_eq!(rewrite_link_path("./sibling", Some("/site")), "./sibling");
        assert_eq!(rewrite_link_path("../up", Some("/site")), "../up");
        assert_eq!(rewrite_link_path("other", Some("/site")), "other");
    }

    #[test]
    fn test_directory_named_like_base_keeps_its_segment() {
        assert_eq!(rewrite_image_path("./a.png", "docs", Some("/docs")), "/docs/docs/a.png");
        assert_eq!(rewrite_link_path("/docs/intro", Some("/docs")), "/docs/docs/intro");
    }

    #[test]
    fn test_absolute_path_starting_with_base_segment_is_prefixed() {
        assert_eq!(
            rewrite_image_path("/site/logo.png", "blog", Some("/site")),
            "/site/site/logo.png"
        );
    }

    #[test]
    fn test_rewrite_markup() {
        let html = r#"<img src="./a.png" data-src="./b.png"> <a href='/docs'>x</a> <a href="https://x.com">y</a>"#;
        assert_eq!(
            rewrite_markup(html, "blog", Some("/site")),
            r#"<img src="/site/blog/a.png" data-src="./b.png"> <a href='/site/docs'>x</a> <a href="https://x.com">y</a>"#
        );
    }

    #[test]
    fn test_rewrite_document() {
        let mut doc = parse_document(
            "![a](./a.png) [next](./next) [docs](/docs)\n\n<img src=\"pic.jpg\">\n",
        );
        doc.children.push(Node::Element(Element {
            name: "Hero".to_string(),
            attributes: vec![
                Attribute::string("src", "./hero.png"),
                Attribute::string("href", "/start"),
                Attribute::string("alt", "./not-a-path"),
            ],
            children: Vec::new(),
        }));

        let file = SourceFile::new("/project/content/blog/post.mdx");
        rewrite_paths(
            &mut doc,
            &file,
            &RewriteContext {
                content_root: Path::new("/project/content"),
                base_path: Some("/site"),
            },
        );

        let mut images = Vec::new();
        let mut links = Vec::new();
        let mut html = String::new();
        let mut hero = None;
        walk(&doc.children, &mut |node| match node {
            Node::Image(Image { src, .. }) => images.push(src.clone()),
            Node::Link(Link { href, .. }) => links.push(href.clone()),
            Node::Html(raw) => html.push_str(raw),
            Node::Element(el) if el.name == "Hero" => hero = Some(el.clone()),
            _ => {}
        });

        assert_eq!(images, vec!["/site/blog/a.png"]);
        assert_eq!(links, vec!["./next", "/site/docs"]);
        assert!(html.contains("src=\"/site/blog/pic.jpg\""));

        let hero = hero.unwrap();
        assert_eq!(hero.attributes[0], Attribute::string("src", "/site/blog/hero.png"));
        assert_eq!(hero.attributes[1], Attribute::string("href", "/site/start"));
        assert_eq!(hero.attributes[2], Attribute::string("alt", "./not-a-path"));
    }

    #[test]
    fn test_document_outside_content_root() {
        let file = SourceFile::new("/elsewhere/post.mdx");
        assert_eq!(document_dir(&file, Path::new("/project/content")), "");
    }
}
