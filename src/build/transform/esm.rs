//! Lightweight import/export handling.
//!
//! This is not a JavaScript parser. It splits import clauses well enough to
//! know which identifiers a document already binds, detects whether a
//! component file has a default export, and validates the import statements
//! the auto-import transform synthesizes.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::{Captures, Regex};

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)\bimport\s+([^'";]+?)\s+from\s*["']"#).unwrap());

static EXPORT_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bexport\s+(?:default\s+)?(?:async\s+)?(?:const|let|var|function\*?|class)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

/// String literals and comments, scanned left to right so comment markers
/// inside strings (`"./*.css"`, `"a//b"`) are not mistaken for comments.
static STRING_OR_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""(?:[^"\\\n]|\\[\s\S])*"|'(?:[^'\\\n]|\\[\s\S])*'|`(?:[^`\\]|\\[\s\S])*`|/\*[\s\S]*?\*/|//[^\n]*"#,
    )
    .unwrap()
});

static DEFAULT_EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bexport\s+default\b|\bexport\s*\{[^}]*\bas\s+default\b[^}]*\}|\bexport\s*\{\s*default\s*\}\s*from\b",
    )
    .unwrap()
});

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

static SYNTHESIZED_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^import\s+(?:(\S+?)|\{\s*(\S+?)\s*\})\s+from\s+"([^"\r\n]*)";$"#).unwrap()
});

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true",
    "try", "typeof", "var", "void", "while", "with", "yield", "let", "static", "await",
];

// =============================================================================
// Bound identifiers
// =============================================================================

/// Identifiers bound by the import/export declarations in an ESM block.
///
/// Handles default (`import A from`), namespace (`import * as A from`),
/// named (`import { a, b as c } from`) and mixed forms, plus exported
/// declarations (`export const A = ...`).
pub fn bound_identifiers(source: &str) -> BTreeSet<String> {
    let mut bound = BTreeSet::new();

    for caps in IMPORT_RE.captures_iter(source) {
        bound.extend(split_import_clause(&caps[1]));
    }
    for caps in EXPORT_DECL_RE.captures_iter(source) {
        bound.insert(caps[1].to_string());
    }

    bound
}

/// Split an import clause into the local names it binds.
fn split_import_clause(clause: &str) -> Vec<String> {
    let clause = clause.trim();
    let clause = clause.strip_prefix("type ").unwrap_or(clause).trim();

    let (head, named) = match clause.find('{') {
        Some(open) => {
            let close = clause[open..].find('}').map(|c| open + c).unwrap_or(clause.len());
            (&clause[..open], Some(&clause[open + 1..close]))
        }
        None => (clause, None),
    };

    let mut names = Vec::new();

    for part in head.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some(namespace) = part.strip_prefix('*') {
            if let Some(alias) = namespace.trim().strip_prefix("as") {
                names.push(alias.trim().to_string());
            }
        } else {
            names.push(part.to_string());
        }
    }

    for item in named.unwrap_or("").split(',') {
        let item = item.trim();
        let item = item.strip_prefix("type ").unwrap_or(item).trim();
        if item.is_empty() {
            continue;
        }
        let local = match item.split_once(" as ") {
            Some((_, alias)) => alias.trim(),
            None => item,
        };
        names.push(local.to_string());
    }

    names.retain(|name| IDENT_RE.is_match(name));
    names
}

// =============================================================================
// Default export detection
// =============================================================================

/// Returns true if module source text declares a default export.
///
/// Comments and string contents are blanked first, so documentation or
/// string data mentioning `export default` does not count.
pub fn has_default_export(source: &str) -> bool {
    let stripped = STRING_OR_COMMENT_RE.replace_all(source, |caps: &Captures| {
        let text = &caps[0];
        if text.starts_with("//") || text.starts_with("/*") {
            " ".to_string()
        } else {
            // Keep the quotes, drop the contents
            let quote = &text[..1];
            format!("{quote}{quote}")
        }
    });
    DEFAULT_EXPORT_RE.is_match(&stripped)
}

/// Memoized default-export detection, keyed by component file path.
///
/// Owned by the transform stage; cleared at the start of every build so
/// edits between builds are picked up.
#[derive(Debug, Default)]
pub struct ExportCache {
    entries: Mutex<HashMap<PathBuf, bool>>,
}

impl ExportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect a default export in the file at `path`, reading it at most once.
    pub fn has_default_export(&self, path: &Path) -> std::io::Result<bool> {
        if let Some(cached) = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(*cached);
        }

        let source = std::fs::read_to_string(path)?;
        let detected = has_default_export(&source);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), detected);
        Ok(detected)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

// =============================================================================
// Synthesized imports
// =============================================================================

/// How a synthesized import binds its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Default,
    Named,
}

/// Build the import statement for a component.
pub fn synthesize_import(name: &str, specifier: &str, kind: ImportKind) -> String {
    match kind {
        ImportKind::Default => format!("import {name} from \"{specifier}\";"),
        ImportKind::Named => format!("import {{ {name} }} from \"{specifier}\";"),
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ImportSyntaxError {
    #[error("not a single-binding import statement")]
    Unrecognized,

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("reserved word '{0}' cannot be imported")]
    ReservedWord(String),

    #[error("empty module specifier")]
    EmptySpecifier,
}

/// A parsed single-binding import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedImport {
    pub binding: String,
    pub kind: ImportKind,
    pub specifier: String,
}

/// Parse a synthesized import statement back, rejecting malformed ones.
pub fn parse_import(statement: &str) -> Result<ParsedImport, ImportSyntaxError> {
    let caps = SYNTHESIZED_IMPORT_RE
        .captures(statement)
        .ok_or(ImportSyntaxError::Unrecognized)?;

    let (binding, kind) = match (caps.get(1), caps.get(2)) {
        (Some(default), _) => (default.as_str(), ImportKind::Default),
        (None, Some(named)) => (named.as_str(), ImportKind::Named),
        (None, None) => return Err(ImportSyntaxError::Unrecognized),
    };

    if !IDENT_RE.is_match(binding) {
        return Err(ImportSyntaxError::InvalidIdentifier(binding.to_string()));
    }
    if RESERVED_WORDS.contains(&binding) {
        return Err(ImportSyntaxError::ReservedWord(binding.to_string()));
    }

    let specifier = caps.get(3).map(|m| m.as_str()).unwrap_or("");
    if specifier.is_empty() {
        return Err(ImportSyntaxError::EmptySpecifier);
    }

    Ok(ParsedImport {
        binding: binding.to_string(),
        kind,
        specifier: specifier.to_string(),
    })
}
