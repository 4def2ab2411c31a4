//! Automatic component imports.
//!
//! Authors write `<Card />` without importing `Card`. For every component a
//! document invokes but never binds, this transform looks the name up in the
//! component registry and prepends the matching import declaration. It also
//! wraps the page body in the configured page wrapper component.
//!
//! Problems are pushed to the diagnostics sink rather than returned: an
//! ambiguous name (defined by several files) or a synthesized import that
//! does not parse fails the build once every document has been compiled.
//! Components found neither in the document nor in the registry are left
//! alone for the bundler to report.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::esm::{ExportCache, ImportKind, bound_identifiers, parse_import, synthesize_import};
use crate::build::diagnostics::{Diagnostic, Diagnostics};
use crate::build::paths::relative_specifier;
use crate::build::registry::ComponentRegistry;
use crate::build::tree::{Document, Element, Node, SourceFile, walk};

/// Everything the transform needs besides the document itself.
pub struct ImportContext<'a> {
    pub registry: &'a ComponentRegistry,
    pub page_wrapper: Option<&'a str>,
    pub exports: &'a ExportCache,
    pub diagnostics: &'a Diagnostics,
}

/// Component names a document uses and the identifiers it already binds.
#[derive(Debug, Default, PartialEq)]
pub struct References {
    pub invoked: BTreeSet<String>,
    pub imported: BTreeSet<String>,
}

/// Collect invoked component roots and bound identifiers in one pass.
pub fn collect_references(doc: &Document) -> References {
    let mut refs = References::default();
    walk(&doc.children, &mut |node| match node {
        Node::Element(el) if el.is_component() => {
            refs.invoked.insert(el.root_name().to_string());
        }
        Node::Esm(source) => refs.imported.extend(bound_identifiers(source)),
        _ => {}
    });
    refs
}

/// Wrap the page and inject missing imports. Returns how many imports were
/// added.
pub fn inject_imports(doc: &mut Document, file: &SourceFile, cx: &ImportContext<'_>) -> usize {
    let mut refs = collect_references(doc);

    if let Some(wrapper) = cx.page_wrapper
        && cx.registry.contains(wrapper)
        && !refs.invoked.contains(wrapper)
        && !refs.imported.contains(wrapper)
    {
        wrap_document(doc, wrapper);
        refs.invoked.insert(wrapper.to_string());
    }

    let mut statements = Vec::new();
    for name in refs.invoked.difference(&refs.imported) {
        if !cx.registry.contains(name) {
            continue;
        }

        if cx.registry.is_conflict(name) {
            cx.diagnostics.push(Diagnostic::AmbiguousReference {
                document: file.path.clone(),
                component: name.clone(),
                candidates: cx.registry.candidates(name).to_vec(),
            });
            continue;
        }

        let Some(path) = cx.registry.resolve(name) else {
            continue;
        };
        let specifier = relative_specifier(file.dir(), path);
        let kind = match cx.exports.has_default_export(path) {
            Ok(true) => ImportKind::Default,
            Ok(false) => ImportKind::Named,
            Err(e) => {
                warn!(component = %name, path = %path.display(), error = %e, "cannot read component, assuming a named export");
                ImportKind::Named
            }
        };

        let statement = synthesize_import(name, &specifier, kind);
        match parse_import(&statement) {
            Ok(_) => statements.push(statement),
            Err(e) => cx.diagnostics.push(Diagnostic::MalformedImport {
                document: file.path.clone(),
                component: name.clone(),
                statement,
                reason: e.to_string(),
            }),
        }
    }

    let injected = statements.len();
    if injected > 0 {
        debug!(document = %file.path.display(), injected, "injected component imports");
        // Imports go after the frontmatter, ahead of all other content
        let at = doc
            .children
            .iter()
            .take_while(|node| matches!(node, Node::Frontmatter(_)))
            .count();
        doc.children
            .splice(at..at, statements.into_iter().map(Node::Esm));
    }
    injected
}

/// Move the page body into a wrapper element. Frontmatter and declarations
/// stay at the top level.
fn wrap_document(doc: &mut Document, wrapper: &str) {
    let (mut top, body): (Vec<Node>, Vec<Node>) = std::mem::take(&mut doc.children)
        .into_iter()
        .partition(|node| matches!(node, Node::Frontmatter(_) | Node::Esm(_)));

    let mut element = Element::new(wrapper);
    element.children = body;
    top.push(Node::Element(element));
    doc.children = top;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::parse::parse_document;
    use std::path::Path;

    struct Fixture {
        dir: tempfile::TempDir,
        registry: ComponentRegistry,
        exports: ExportCache,
        diagnostics: Diagnostics,
    }

    impl Fixture {
        fn new(components: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            for (path, source) in components {
                let path = dir.path().join("components").join(path);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, source).unwrap();
            }
            let registry = ComponentRegistry::scan(&dir.path().join("components")).unwrap();
            Self {
                dir,
                registry,
                exports: ExportCache::new(),
                diagnostics: Diagnostics::new(),
            }
        }

        fn file(&self) -> SourceFile {
            SourceFile::new(self.dir.path().join("content/blog/post.mdx"))
        }

        fn run(&self, doc: &mut Document, wrapper: Option<&str>) -> usize {
            let cx = ImportContext {
                registry: &self.registry,
                page_wrapper: wrapper,
                exports: &self.exports,
                diagnostics: &self.diagnostics,
            };
            inject_imports(doc, &self.file(), &cx)
        }
    }

    fn esm(doc: &Document) -> Vec<String> {
        doc.esm_blocks().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_injects_default_and_named_imports() {
        let fx = Fixture::new(&[
            ("Card.tsx", "export default function Card() {}"),
            ("Alert.tsx", "export function Alert() {}"),
        ]);
        let mut doc = parse_document("<Card />\n\n<Alert>hi</Alert>\n");

        assert_eq!(fx.run(&mut doc, None), 2);
        assert_eq!(
            esm(&doc),
            vec![
                "import { Alert } from \"../../components/Alert.tsx\";".to_string(),
                "import Card from \"../../components/Card.tsx\";".to_string(),
            ]
        );
        assert!(fx.diagnostics.is_empty());
    }

    #[test]
    fn test_member_expression_imports_root() {
        let fx = Fixture::new(&[("Tabs/index.tsx", "export default Tabs;")]);
        let mut doc = parse_document("<Tabs.Panel>one</Tabs.Panel>\n");

        fx.run(&mut doc, None);
        assert_eq!(
            esm(&doc),
            vec!["import Tabs from \"../../components/Tabs/index.tsx\";".to_string()]
        );
    }

    #[test]
    fn test_existing_imports_are_respected() {
        let fx = Fixture::new(&[("Card.tsx", "export default function Card() {}")]);
        let mut doc = parse_document("import Card from '~/ui/Card'\n\n<Card />\n");

        assert_eq!(fx.run(&mut doc, None), 0);
        assert_eq!(esm(&doc), vec!["import Card from '~/ui/Card'".to_string()]);
    }

    #[test]
    fn test_second_run_injects_nothing() {
        let fx = Fixture::new(&[
            ("Layout.tsx", "export default function Layout() {}"),
            ("Card.tsx", "export default function Card() {}"),
        ]);
        let mut doc = parse_document("# Title\n\n<Card />\n");

        assert_eq!(fx.run(&mut doc, Some("Layout")), 2);
        let once = doc.clone();
        assert_eq!(fx.run(&mut doc, Some("Layout")), 0);
        assert_eq!(doc, once);
    }

    #[test]
    fn test_wraps_page_and_hoists_declarations() {
        let fx = Fixture::new(&[("Layout.tsx", "export default function Layout() {}")]);
        let mut doc = parse_document("---\ntitle: T\n---\nexport const x = 1\n\n# Heading\n");

        fx.run(&mut doc, Some("Layout"));

        assert!(matches!(doc.children[0], Node::Frontmatter(_)));
        assert_eq!(
            doc.children[1],
            Node::Esm("import Layout from \"../../components/Layout.tsx\";".to_string())
        );
        assert_eq!(doc.children[2], Node::Esm("export const x = 1".to_string()));
        let Node::Element(wrapper) = &doc.children[3] else {
            panic!("expected wrapper element, got {:?}", doc.children[3]);
        };
        assert_eq!(wrapper.name, "Layout");
        assert!(matches!(&wrapper.children[0], Node::Block(b) if b.tag == "h1"));
        assert_eq!(doc.children.len(), 4);
    }

    #[test]
    fn test_no_double_wrap_when_wrapper_invoked() {
        let fx = Fixture::new(&[("Layout.tsx", "export default function Layout() {}")]);
        let mut doc = parse_document("<Layout>\n\nbody\n\n</Layout>\n");
        let before: Vec<Node> = doc.children.clone();

        assert_eq!(fx.run(&mut doc, Some("Layout")), 1);
        assert_eq!(&doc.children[1..], before.as_slice());
    }

    #[test]
    fn test_no_wrap_when_wrapper_imported() {
        let fx = Fixture::new(&[("Layout.tsx", "export default function Layout() {}")]);
        let mut doc = parse_document("import Layout from './Custom'\n\nbody\n");
        let before = doc.clone();

        assert_eq!(fx.run(&mut doc, Some("Layout")), 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_no_wrap_when_wrapper_unregistered() {
        let fx = Fixture::new(&[]);
        let mut doc = parse_document("body\n");
        let before = doc.clone();

        assert_eq!(fx.run(&mut doc, Some("Layout")), 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_ambiguous_component_reported_once() {
        let fx = Fixture::new(&[
            ("a/Button.tsx", "export default function Button() {}"),
            ("b/Button.tsx", "export default function Button() {}"),
        ]);
        let mut doc = parse_document("<Button />\n\n<Button>again</Button>\n");

        assert_eq!(fx.run(&mut doc, None), 0);
        assert!(esm(&doc).is_empty());

        let diagnostics = fx.diagnostics.drain();
        assert_eq!(diagnostics.len(), 1);
        match &diagnostics[0] {
            Diagnostic::AmbiguousReference {
                component,
                candidates,
                document,
            } => {
                assert_eq!(component, "Button");
                assert_eq!(candidates.len(), 2);
                assert_eq!(document, &fx.file().path);
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
    }

    #[test]
    fn test_malformed_import_collected_with_statement() {
        let fx = Fixture::new(&[("My-Card.tsx", "export default function MyCard() {}")]);
        let mut doc = parse_document("<My-Card />\n");

        assert_eq!(fx.run(&mut doc, None), 0);
        let diagnostics = fx.diagnostics.drain();
        assert_eq!(diagnostics.len(), 1);
        match &diagnostics[0] {
            Diagnostic::MalformedImport {
                component,
                statement,
                ..
            } => {
                assert_eq!(component, "My-Card");
                assert_eq!(statement, "import My-Card from \"../../components/My-Card.tsx\";");
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
    }

    #[test]
    fn test_unknown_component_left_for_bundler() {
        let fx = Fixture::new(&[]);
        let mut doc = parse_document("<Mystery />\n");

        assert_eq!(fx.run(&mut doc, None), 0);
        assert!(fx.diagnostics.is_empty());
    }

    #[test]
    fn test_unreadable_component_falls_back_to_named() {
        let mut fx = Fixture::new(&[]);
        let ghost = fx.dir.path().join("components/Ghost.tsx");
        fx.registry.insert("Ghost", &ghost);
        let mut doc = parse_document("<Ghost />\n");

        fx.run(&mut doc, None);
        assert_eq!(
            esm(&doc),
            vec!["import { Ghost } from \"../../components/Ghost.tsx\";".to_string()]
        );
        assert!(!Path::new(&ghost).exists());
    }

    #[test]
    fn test_collect_references() {
        let doc = parse_document(
            "import A, { B as C } from './x'\n\n<A />\n\n<D.E>x</D.E>\n\n<div>raw</div>\n",
        );
        let refs = collect_references(&doc);
        assert_eq!(
            refs.invoked.into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "D".to_string()]
        );
        assert_eq!(
            refs.imported.into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "C".to_string()]
        );
    }
}
