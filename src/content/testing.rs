//! In-memory post source for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::notion::{Block, BlockKind, NotionError, Page, PostSource, RichText};
use crate::notion::types::TextBlock;

pub struct FakeSource {
    pub pages: Vec<Page>,
    pub blocks: HashMap<String, Vec<Block>>,
    pub block_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(pages: Vec<Page>, blocks: HashMap<String, Vec<Block>>) -> Self {
        Self {
            pages,
            blocks,
            block_calls: AtomicUsize::new(0),
        }
    }
}

impl PostSource for FakeSource {
    async fn published_posts(&self) -> Result<Vec<Page>, NotionError> {
        Ok(self.pages.clone())
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Page>, NotionError> {
        Ok(self
            .pages
            .iter()
            .find(|p| p.property("Slug").map(|v| v.plain_text()).as_deref() == Some(slug))
            .cloned())
    }

    async fn page_blocks(&self, page_id: &str) -> Result<Vec<Block>, NotionError> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.blocks.get(page_id).cloned().unwrap_or_default())
    }
}

/// A database row with the default property names
pub fn page(id: &str, title: &str, slug: &str, date: &str, edited: &str) -> Page {
    let json = format!(
        r#"{{
            "id": "{id}",
            "last_edited_time": "{edited}",
            "properties": {{
                "Name": {{"type": "title", "title": [{{"plain_text": "{title}"}}]}},
                "Slug": {{"type": "rich_text", "rich_text": [{{"plain_text": "{slug}"}}]}},
                "Date": {{"type": "date", "date": {{"start": "{date}"}}}},
                "Tags": {{"type": "multi_select", "multi_select": [{{"name": "Rust"}}]}}
            }}
        }}"#
    );
    serde_json::from_str(&json).unwrap()
}

pub fn paragraph(text: &str) -> Block {
    Block::new(BlockKind::Paragraph {
        paragraph: TextBlock {
            rich_text: vec![RichText::text(text)],
        },
    })
}
