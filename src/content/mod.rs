//! Content module - handles posts, queries and content processing

pub mod loader;
mod markdown;
mod post;
pub mod query;
#[cfg(test)]
pub(crate) mod testing;

pub use loader::{ContentLoader, LoadedPosts};
pub use markdown::MarkdownRenderer;
pub use post::{MetadataError, Post};
