//! Errors raised while talking to the Notion API

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Notion API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Rate limited by Notion after {0} attempts")]
    RateLimited(u32),
    #[error("Notion token is not set (NOTION_TOKEN or notion.token)")]
    MissingToken,
    #[error("Notion token contains characters not allowed in a header")]
    InvalidToken,
    #[error("Notion database id is not set (NOTION_DATABASE_ID or notion.database_id)")]
    MissingDatabaseId,
    #[error("Invalid Notion database id: {0}")]
    InvalidDatabaseId(String),
    #[error("Failed to decode Notion response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Error body returned by the API on non-2xx responses
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
