//! Post model built from a Notion database row

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PropertyNames;
use crate::notion::Page;

/// Why a row could not become a post
#[derive(Error, Debug, PartialEq)]
pub enum MetadataError {
    #[error("page {page} has no `{property}` property")]
    MissingProperty { page: String, property: String },
    #[error("page {page} has an empty title")]
    EmptyTitle { page: String },
    #[error("page {page} has no date")]
    MissingDate { page: String },
    #[error("page {page} has an unparseable date `{value}`")]
    InvalidDate { page: String, value: String },
}

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Notion page id
    pub id: String,

    /// Post title
    pub title: String,

    /// Short summary shown on cards
    pub description: String,

    /// Publication date
    pub date: NaiveDate,

    /// URL-friendly name
    pub slug: String,

    /// Post tags, in the order Notion stores them
    pub tags: Vec<String>,

    /// Notion's last edit timestamp, used for cache invalidation
    pub last_edited_time: String,

    /// Markdown converted from the page blocks
    pub markdown: String,

    /// Rendered HTML content
    pub content: String,
}

impl Post {
    /// Create a new post with minimal required fields
    pub fn new(id: &str, title: &str, date: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            date,
            slug: slug::slugify(title),
            tags: Vec::new(),
            last_edited_time: String::new(),
            markdown: String::new(),
            content: String::new(),
        }
    }

    /// Extract post metadata from a database row
    pub fn from_page(page: &Page, names: &PropertyNames) -> Result<Self, MetadataError> {
        let title = page
            .property(&names.title)
            .ok_or_else(|| MetadataError::MissingProperty {
                page: page.id.clone(),
                property: names.title.clone(),
            })?
            .plain_text()
            .trim()
            .to_string();
        if title.is_empty() {
            return Err(MetadataError::EmptyTitle {
                page: page.id.clone(),
            });
        }

        let date_value = page
            .property(&names.date)
            .and_then(|p| p.date_start())
            .ok_or_else(|| MetadataError::MissingDate {
                page: page.id.clone(),
            })?;
        let date = parse_date(date_value).ok_or_else(|| MetadataError::InvalidDate {
            page: page.id.clone(),
            value: date_value.to_string(),
        })?;

        let description = page
            .property(&names.description)
            .map(|p| p.plain_text().trim().to_string())
            .unwrap_or_default();

        let slug = page
            .property(&names.slug)
            .map(|p| p.plain_text().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slug::slugify(&title));

        let tags = page
            .property(&names.tags)
            .map(|p| p.option_names())
            .unwrap_or_default();

        Ok(Self {
            id: page.id.clone(),
            title,
            description,
            date,
            slug,
            tags,
            last_edited_time: page.last_edited_time.clone(),
            markdown: String::new(),
            content: String::new(),
        })
    }

    /// Whether the post carries `tag` (exact match)
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Parse a Notion date or datetime start (`2023-05-30`, `2023-05-30T09:00:00.000+09:00`)
fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
