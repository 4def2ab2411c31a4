//! Path and URL conversion utilities.
//!
//! This module handles conversions between:
//! - Source file paths (relative paths within the content directory)
//! - Entry names (the logical name of a page, e.g. `blog/post`)
//! - URL paths (the URL at which a page will be served, under the base path)
//! - Output file paths (where files are written in the output directory)

use std::path::{Component, Path, PathBuf};

/// Convert a content-relative document path to its logical entry name.
///
/// # Examples
/// ```ignore
/// entry_name(Path::new("blog/post.mdx")) => "blog/post"
/// entry_name(Path::new("index.md")) => "index"
/// ```
pub fn entry_name(relative: &Path) -> String {
    to_slash(&relative.with_extension(""))
}

/// Convert an entry name to a URL path under the base path.
///
/// Index entries become the directory URL.
///
/// # Examples
/// ```ignore
/// entry_url("installation", None) => "/installation"
/// entry_url("guides/index", Some("/docs")) => "/docs/guides"
/// entry_url("index", None) => "/"
/// ```
pub fn entry_url(entry: &str, base_path: Option<&str>) -> String {
    let mut url = base_path.unwrap_or("").to_string();
    url.push('/');

    // Handle index files - they become the directory URL
    let entry = if entry.ends_with("/index") || entry == "index" {
        entry.trim_end_matches("index").trim_end_matches('/')
    } else {
        entry
    };

    url.push_str(entry);

    // Normalize: remove trailing slash unless it's the root
    if url.len() > 1 && url.ends_with('/') {
        url.pop();
    }

    url
}

/// Convert a URL path to an output file path.
///
/// Documents (no extension) become `path/index.html`.
/// Static files (with extension) keep their path.
///
/// # Examples
/// ```ignore
/// url_to_output_path("/cli/installation", output_dir) => output_dir/cli/installation/index.html
/// url_to_output_path("/", output_dir) => output_dir/index.html
/// url_to_output_path("/cli/style.css", output_dir) => output_dir/cli/style.css
/// ```
pub fn url_to_output_path(url_path: &str, output_dir: &Path) -> PathBuf {
    let url_path = url_path.trim_start_matches('/');

    if url_path.is_empty() {
        // Root path
        output_dir.join("index.html")
    } else if url_path.contains('.') {
        // Already has extension (static file)
        output_dir.join(url_path)
    } else {
        // Document - create directory with index.html
        output_dir.join(url_path).join("index.html")
    }
}

/// Normalize a configured base path.
///
/// Empty and `/` mean "no base path". Otherwise the result has a leading
/// slash and no trailing slash.
pub fn normalize_base_path(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim().trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!("/{trimmed}"))
}

/// Prefix a root-absolute URL path with the base path.
///
/// The prefix is applied unconditionally: `/site/logo.png` under base
/// `/site` becomes `/site/site/logo.png`.
pub fn with_base_path(path: &str, base_path: Option<&str>) -> String {
    match base_path {
        None => path.to_string(),
        Some(base) if path.starts_with('/') => format!("{base}{path}"),
        Some(base) => format!("{base}/{path}"),
    }
}

/// Collapse `.` and `..` segments in a slash-separated path.
///
/// `..` segments that would escape the root are dropped. A leading slash
/// is preserved.
pub fn normalize_url_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Returns true for URL-like references that must never be rewritten:
/// anything with a scheme (`https:`, `data:`, `mailto:`), protocol-relative
/// `//host` references, and same-page `#anchors`.
pub fn is_external_reference(reference: &str) -> bool {
    if reference.starts_with('#') || reference.starts_with("//") {
        return true;
    }
    has_scheme(reference)
}

/// RFC 3986 scheme: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`.
fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Relative path from `from_dir` to `to`, as an ES module specifier.
///
/// Always starts with `./` or `../` and uses forward slashes.
///
/// # Examples
/// ```ignore
/// relative_specifier("/p/content/blog", "/p/components/Card.tsx") => "../../components/Card.tsx"
/// relative_specifier("/p/content", "/p/content/Note.mdx") => "./Note.mdx"
/// ```
pub fn relative_specifier(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let target: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        parts.push(component.as_os_str().to_string_lossy().to_string());
    }

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}

/// Render a relative path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
