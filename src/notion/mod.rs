//! Notion content source: API client, wire types and block-to-Markdown conversion

mod client;
mod error;
pub mod markdown;
pub mod types;

use std::future::Future;

pub use client::NotionClient;
pub use error::NotionError;
pub use types::{Block, BlockKind, Page, PropertyValue, RichText};

/// Where posts come from.
///
/// `NotionClient` is the real implementation; the loader is generic over this
/// so it can run against in-memory fixtures.
pub trait PostSource {
    /// Published rows, newest first
    fn published_posts(&self) -> impl Future<Output = Result<Vec<Page>, NotionError>> + Send;

    /// The published row with the given slug
    fn post_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Page>, NotionError>> + Send;

    /// The full block tree of a page
    fn page_blocks(
        &self,
        page_id: &str,
    ) -> impl Future<Output = Result<Vec<Block>, NotionError>> + Send;
}
