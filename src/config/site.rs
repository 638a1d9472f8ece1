//! Site configuration (_config.yml)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

use super::notion::NotionConfig;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Listing
    pub per_page: usize,
    pub top_page_posts: usize,
    pub feed_limit: usize,

    // Rendering
    pub date_format: String,
    pub highlight_theme: String,
    pub more_label: String,
    pub back_label: String,
    pub nav: Vec<NavLink>,

    // Content source
    pub notion: NotionConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Notion Blog".to_string(),
            description: String::new(),
            author: String::new(),
            language: "ja".to_string(),
            timezone: "UTC".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            per_page: 4,
            top_page_posts: 4,
            feed_limit: 20,

            date_format: "YYYY-MM-DD".to_string(),
            highlight_theme: "InspiredGitHub".to_string(),
            more_label: "...もっと見る".to_string(),
            back_label: "←ホームに戻る".to_string(),
            nav: vec![NavLink {
                name: "Home".to_string(),
                url: "/".to_string(),
            }],

            notion: NotionConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides for the Notion credentials
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("NOTION_TOKEN").filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using NOTION_TOKEN from environment");
            self.notion.token = Some(token);
        }
        if let Some(id) = lookup("NOTION_DATABASE_ID").filter(|v| !v.trim().is_empty()) {
            tracing::debug!("Using NOTION_DATABASE_ID from environment");
            self.notion.database_id = Some(id);
        }
    }

    /// Check values that would otherwise fail deep inside generation
    pub fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            bail!("per_page must be at least 1");
        }
        if self.top_page_posts == 0 {
            bail!("top_page_posts must be at least 1");
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            bail!("Unknown timezone: {}", self.timezone);
        }
        if !crate::helpers::is_valid_date_format(&self.date_format) {
            bail!("Invalid date_format: {}", self.date_format);
        }
        Ok(())
    }

    /// Parsed timezone, UTC when the name is unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    /// Hash of everything that affects rendered output.
    ///
    /// The token is skipped during serialization, so rotating it does not
    /// trigger a rebuild.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        serde_json::to_string(self)
            .unwrap_or_default()
            .hash(&mut hasher);
        hasher.finish()
    }
}

/// A navbar entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavLink {
    pub name: String,
    pub url: String,
}
