//! Configuration type definitions.
//!
//! Pure data: every field has a default, so an empty or missing
//! `pagewright.yaml` is a valid project.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub paths: PathsConfig,
    pub build: BuildConfig,
}

/// Site-wide metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    /// Absolute site URL, used for canonical and Open Graph URLs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// URL prefix the site is deployed under, e.g. `/docs`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Site".to_string(),
            url: None,
            base_path: None,
            lang: "en".to_string(),
            description: None,
        }
    }
}

/// Project directories, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub content: PathBuf,
    pub components: PathBuf,
    pub public: PathBuf,
    pub styles: PathBuf,
    pub output: PathBuf,
    /// Custom HTML shell template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: PathBuf::from("content"),
            components: PathBuf::from("components"),
            public: PathBuf::from("public"),
            styles: PathBuf::from("styles"),
            output: PathBuf::from("dist"),
            shell: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub prerender: bool,
    pub static_copy: bool,
    /// Component wrapped around every page; empty disables wrapping
    pub page_wrapper: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            prerender: true,
            static_copy: true,
            page_wrapper: "Layout".to_string(),
        }
    }
}
