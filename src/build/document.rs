use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Front matter
// =============================================================================

/// Front matter metadata parsed from a document.
///
/// Everything here ends up in the page `<head>`; the head injection step
/// escapes every value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    /// Page title (can override filename-derived title)
    pub title: Option<String>,
    /// Page description for SEO/previews
    pub description: Option<String>,
    /// Social preview image (Open Graph / Twitter)
    pub image: Option<String>,
    /// Document language, overriding the site default
    pub lang: Option<String>,
    /// Explicit canonical URL
    pub canonical: Option<String>,
    /// Open Graph object type (defaults to "website")
    #[serde(rename = "type")]
    pub og_type: Option<String>,
    /// Additional arbitrary metadata
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    /// Parse a raw YAML block.
    ///
    /// An empty block yields the default front matter.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }
}

/// A document split into its front matter block and body.
#[derive(Debug)]
pub struct SplitContent<'a> {
    /// The raw YAML between the `---` fences, if present
    pub front_matter: Option<&'a str>,
    /// The content without the front matter block
    pub body: &'a str,
}

/// Split the front matter block off the top of a document.
///
/// Front matter is a YAML block delimited by `---` at the start of the file:
///
/// ```markdown
/// ---
/// title: My Page
/// description: A description
/// ---
///
/// # Content starts here
/// ```
pub fn split_front_matter(content: &str) -> SplitContent<'_> {
    let trimmed = content.trim_start();

    // Check if content starts with front matter delimiter
    let Some(after_opening) = trimmed.strip_prefix("---") else {
        return SplitContent {
            front_matter: None,
            body: content,
        };
    };

    // The opening fence must be alone on its line
    if !after_opening.starts_with('\n') && !after_opening.starts_with("\r\n") {
        return SplitContent {
            front_matter: None,
            body: content,
        };
    }

    // Find the closing delimiter; an empty block closes immediately
    let (yaml, rest) = if let Some(rest) = after_opening.trim_start_matches(['\r', '\n']).strip_prefix("---") {
        ("", rest)
    } else {
        let Some(closing_pos) = after_opening.find("\n---") else {
            // No closing delimiter found, treat entire content as markdown
            return SplitContent {
                front_matter: None,
                body: content,
            };
        };
        (
            after_opening[..closing_pos].trim_start_matches(['\r', '\n']),
            &after_opening[closing_pos + 4..],
        )
    };

    // Skip the remainder of the closing fence line
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => "",
    };

    SplitContent {
        front_matter: Some(yaml),
        body: body.trim_start_matches(['\r', '\n']),
    }
}
