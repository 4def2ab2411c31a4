//! Head metadata injection.
//!
//! Runs on the written shells once every page has been compiled, so the
//! frontmatter of every page is available. Every user-supplied value is
//! HTML-escaped before it lands in the markup.

use std::sync::LazyLock;

use regex::Regex;
use tera::escape_html;
use tracing::{debug, info};

use crate::build::document::FrontMatter;
use crate::build::paths::{entry_url, is_external_reference, with_base_path};
use crate::build::pipeline::{BuildContext, PipelineState, Step, StepError, keys};
use crate::build::render::SiteContext;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title>.*?</title>").unwrap());

static HEAD_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head\s*>").unwrap());

static HTML_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html(\s[^>]*)?>").unwrap());

static LANG_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\slang\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).unwrap()
});

/// Resolved head values for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub og_type: String,
    /// Absolute page URL, when the site URL is known or the page sets one.
    pub url: Option<String>,
    pub lang: Option<String>,
}

impl HeadData {
    /// Combine a page's frontmatter with site defaults.
    pub fn resolve(
        front_matter: &FrontMatter,
        site: &SiteContext,
        page_url: &str,
        base_path: Option<&str>,
    ) -> Self {
        let url = front_matter.canonical.clone().or_else(|| {
            site.url
                .as_deref()
                .map(|site_url| format!("{}{}", site_url.trim_end_matches('/'), page_url))
        });
        // Root-absolute images need the base path and, for social cards,
        // the site origin
        let image = front_matter.image.as_deref().map(|image| {
            if is_external_reference(image) || !image.starts_with('/') {
                image.to_string()
            } else {
                let path = with_base_path(image, base_path);
                match site.url.as_deref() {
                    Some(site_url) => format!("{}{}", site_url.trim_end_matches('/'), path),
                    None => path,
                }
            }
        });

        Self {
            title: front_matter.title.clone(),
            description: front_matter
                .description
                .clone()
                .or_else(|| site.description.clone()),
            image,
            og_type: front_matter
                .og_type
                .clone()
                .unwrap_or_else(|| "website".to_string()),
            url,
            lang: front_matter.lang.clone(),
        }
    }

    /// The tags to insert into `<head>`, values escaped.
    fn tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        let meta_name = |name: &str, content: &str| {
            format!(r#"<meta name="{}" content="{}" />"#, name, escape_html(content))
        };
        let meta_property = |property: &str, content: &str| {
            format!(
                r#"<meta property="{}" content="{}" />"#,
                property,
                escape_html(content)
            )
        };

        if let Some(description) = &self.description {
            tags.push(meta_name("description", description));
        }
        if let Some(title) = &self.title {
            tags.push(meta_property("og:title", title));
        }
        if let Some(description) = &self.description {
            tags.push(meta_property("og:description", description));
        }
        if let Some(image) = &self.image {
            tags.push(meta_property("og:image", image));
        }
        tags.push(meta_property("og:type", &self.og_type));
        if let Some(url) = &self.url {
            tags.push(meta_property("og:url", url));
        }

        let card = if self.image.is_some() {
            "summary_large_image"
        } else {
            "summary"
        };
        tags.push(meta_name("twitter:card", card));
        if let Some(title) = &self.title {
            tags.push(meta_name("twitter:title", title));
        }
        if let Some(description) = &self.description {
            tags.push(meta_name("twitter:description", description));
        }
        if let Some(image) = &self.image {
            tags.push(meta_name("twitter:image", image));
        }

        if let Some(url) = &self.url {
            tags.push(format!(r#"<link rel="canonical" href="{}" />"#, escape_html(url)));
        }
        tags
    }
}

/// Apply head data to a page.
///
/// Replaces the `<title>` (or adds one), appends the metadata tags before
/// `</head>` and sets the `lang` attribute on `<html>`. A page without a
/// `</head>` gets only the title and language changes.
pub fn inject_head(html: &str, head: &HeadData) -> String {
    let mut html = html.to_string();
    let mut tags = Vec::new();

    if let Some(title) = &head.title {
        let element = format!("<title>{}</title>", escape_html(title));
        if TITLE_RE.is_match(&html) {
            html = TITLE_RE.replace(&html, regex::NoExpand(&element)).into_owned();
        } else {
            tags.push(element);
        }
    }
    tags.extend(head.tags());

    if let Some(close) = HEAD_CLOSE_RE.find(&html) {
        let block: String = tags.iter().map(|tag| format!("  {tag}\n")).collect();
        html.insert_str(close.start(), &block);
    }

    if let Some(lang) = &head.lang {
        html = set_lang(&html, lang);
    }
    html
}

fn set_lang(html: &str, lang: &str) -> String {
    let Some(caps) = HTML_OPEN_RE.captures(html) else {
        return html.to_string();
    };
    let Some(whole) = caps.get(0) else {
        return html.to_string();
    };
    let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let lang_attr = format!(r#" lang="{}""#, escape_html(lang));
    let attrs = if LANG_ATTR_RE.is_match(attrs) {
        LANG_ATTR_RE
            .replace(attrs, regex::NoExpand(&lang_attr))
            .into_owned()
    } else {
        format!("{lang_attr}{attrs}")
    };

    let mut out = String::with_capacity(html.len() + lang_attr.len());
    out.push_str(&html[..whole.start()]);
    out.push_str(&format!("<html{attrs}>"));
    out.push_str(&html[whole.end()..]);
    out
}

/// Inject each page's metadata into its written shell.
pub struct InjectHead;

impl Step for InjectHead {
    fn name(&self) -> &'static str {
        "inject-head"
    }

    fn execute(&self, ctx: &BuildContext, state: &PipelineState) -> Result<(), StepError> {
        let html_files = state.outputs.get(keys::HTML_FILES)?;
        let metadata = state.outputs.get(keys::PAGE_METADATA)?;
        let base = state.options().base_path.as_deref();

        for (entry, path) in html_files.iter() {
            let front_matter = metadata.get(entry).cloned().unwrap_or_default();
            let head = HeadData::resolve(&front_matter, &ctx.site, &entry_url(entry, base), base);

            let html = std::fs::read_to_string(path).map_err(|e| StepError::io(path, e))?;
            std::fs::write(path, inject_head(&html, &head)).map_err(|e| StepError::io(path, e))?;
            debug!(entry = %entry, "injected head metadata");
        }

        info!(pages = html_files.len(), "injected head metadata");
        Ok(())
    }
}
