//! Notion connection settings (`notion:` section of _config.yml)

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::notion::NotionError;

lazy_static! {
    static ref NOTION_ID: Regex = Regex::new(
        r"([0-9a-fA-F]{8})-?([0-9a-fA-F]{4})-?([0-9a-fA-F]{4})-?([0-9a-fA-F]{4})-?([0-9a-fA-F]{12})"
    )
    .unwrap();
}

/// Notion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    /// Integration token, usually supplied through `NOTION_TOKEN`
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Database id or a full notion.so URL pointing at the database
    pub database_id: Option<String>,
    pub api_base: String,
    pub api_version: String,
    pub page_size: usize,
    pub max_retries: u32,
    pub properties: PropertyNames,
    pub slug_filter: SlugFilter,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            token: None,
            database_id: None,
            api_base: "https://api.notion.com/v1".to_string(),
            api_version: "2022-06-28".to_string(),
            page_size: 100,
            max_retries: 3,
            properties: PropertyNames::default(),
            slug_filter: SlugFilter::default(),
        }
    }
}

impl NotionConfig {
    /// The integration token
    pub fn token(&self) -> Result<&str, NotionError> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(NotionError::MissingToken)
    }

    /// The database id as 32 lowercase hex digits
    pub fn database_id(&self) -> Result<String, NotionError> {
        let raw = self
            .database_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(NotionError::MissingDatabaseId)?;
        normalize_id(raw).ok_or_else(|| NotionError::InvalidDatabaseId(raw.to_string()))
    }

    /// Page size sent with queries; the API caps it at 100
    pub fn page_size(&self) -> usize {
        self.page_size.clamp(1, 100)
    }
}

/// Extract a Notion id from a raw id, a dashed UUID or a notion.so URL
pub fn normalize_id(raw: &str) -> Option<String> {
    // `?v=` carries the view id, which is also 32 hex digits
    let path = raw.split('?').next().unwrap_or(raw);
    let caps = NOTION_ID.captures_iter(path).last()?;
    let id: String = (1..=5)
        .filter_map(|i| caps.get(i))
        .map(|m| m.as_str().to_ascii_lowercase())
        .collect();
    Some(id)
}

/// Names of the database properties a post is read from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PropertyNames {
    pub title: String,
    pub description: String,
    pub date: String,
    pub slug: String,
    pub tags: String,
    pub published: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: "Name".to_string(),
            description: "Description".to_string(),
            date: "Date".to_string(),
            slug: "Slug".to_string(),
            tags: "Tags".to_string(),
            published: "Published".to_string(),
        }
    }
}

/// Property type of the slug column, which decides the filter shape
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlugFilter {
    #[default]
    Formula,
    RichText,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_and_dashed_ids() {
        assert_eq!(
            normalize_id("0123456789ABCDEF0123456789abcdef").as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(
            normalize_id("01234567-89ab-cdef-0123-456789abcdef").as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
    }

    #[test]
    fn test_normalize_url() {
        let url = "https://www.notion.so/sho/Blog-0123456789abcdef0123456789abcdef?v=ffffffffffffffffffffffffffffffff";
        assert_eq!(
            normalize_id(url).as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
    }

    #[test]
    fn test_invalid_ids() {
        assert_eq!(normalize_id("not-an-id"), None);

        let config = NotionConfig::default();
        assert!(matches!(
            config.database_id(),
            Err(NotionError::MissingDatabaseId)
        ));
        assert!(matches!(config.token(), Err(NotionError::MissingToken)));

        let config = NotionConfig {
            database_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.database_id(),
            Err(NotionError::InvalidDatabaseId(_))
        ));
    }

    #[test]
    fn test_slug_filter_parse() {
        let config: NotionConfig = serde_yaml::from_str("slug_filter: rich_text").unwrap();
        assert_eq!(config.slug_filter, SlugFilter::RichText);
        assert_eq!(NotionConfig::default().slug_filter, SlugFilter::Formula);
    }
}
