//! Content loader - turns Notion rows and blocks into rendered posts

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use super::{MarkdownRenderer, Post};
use crate::cache::CacheDb;
use crate::config::SiteConfig;
use crate::notion::markdown::blocks_to_markdown;
use crate::notion::{Block, BlockKind, Page, PostSource};

/// Posts loaded for one generation run
#[derive(Debug, Default)]
pub struct LoadedPosts {
    /// Posts sorted by date, newest first, with markdown and HTML filled in
    pub posts: Vec<Post>,
    /// Cache built from this run
    pub cache: CacheDb,
    /// Posts whose blocks were fetched from Notion
    pub fetched: usize,
    /// Posts whose markdown came from the cache
    pub reused: usize,
}

/// Loads posts from a `PostSource`
pub struct ContentLoader<'a, S> {
    source: &'a S,
    config: &'a SiteConfig,
    renderer: MarkdownRenderer,
}

impl<'a, S: PostSource> ContentLoader<'a, S> {
    /// Create a new content loader
    pub fn new(source: &'a S, config: &'a SiteConfig) -> Self {
        let renderer = MarkdownRenderer::with_theme(&config.highlight_theme);
        Self {
            source,
            config,
            renderer,
        }
    }

    /// Metadata of every published post, newest first
    pub async fn load_post_list(&self) -> Result<Vec<Post>> {
        let pages = self
            .source
            .published_posts()
            .await
            .context("Failed to query published posts")?;
        Ok(self.posts_from_pages(&pages))
    }

    /// Every published post with its content.
    ///
    /// Markdown is reused from `cache` when the page has not been edited
    /// since, unless `force` is set.
    pub async fn load_posts(&self, cache: &CacheDb, force: bool) -> Result<LoadedPosts> {
        let mut posts = self.load_post_list().await?;
        let now = Utc::now();

        let mut loaded = LoadedPosts {
            cache: CacheDb::new(),
            ..Default::default()
        };
        loaded.cache.config_hash = self.config.fingerprint();

        for post in &mut posts {
            let cached = if force {
                None
            } else {
                cache
                    .markdown_for(&post.id, &post.last_edited_time, now)
                    .map(|md| (md.to_string(), cache.entries.get(&post.id).and_then(|e| e.expires_at)))
            };

            let expires_at = match cached {
                Some((markdown, expires_at)) => {
                    tracing::debug!("Reusing cached content for {}", post.slug);
                    post.markdown = markdown;
                    loaded.reused += 1;
                    expires_at
                }
                None => {
                    tracing::debug!("Fetching content for {}", post.slug);
                    let blocks = self
                        .source
                        .page_blocks(&post.id)
                        .await
                        .with_context(|| format!("Failed to fetch blocks of post {}", post.slug))?;
                    post.markdown = blocks_to_markdown(&blocks);
                    loaded.fetched += 1;
                    earliest_expiry(&blocks)
                }
            };

            post.content = self
                .renderer
                .render(&post.markdown)
                .with_context(|| format!("Failed to render post {}", post.slug))?;
            loaded.cache.record(post, expires_at);
        }

        loaded.posts = posts;
        Ok(loaded)
    }

    /// One published post, with markdown and HTML
    pub async fn load_single(&self, slug: &str) -> Result<Option<Post>> {
        let Some(page) = self
            .source
            .post_by_slug(slug)
            .await
            .with_context(|| format!("Failed to query post {}", slug))?
        else {
            return Ok(None);
        };

        let mut post = Post::from_page(&page, &self.config.notion.properties)?;
        let blocks = self.source.page_blocks(&post.id).await?;
        post.markdown = blocks_to_markdown(&blocks);
        post.content = self.renderer.render(&post.markdown)?;
        Ok(Some(post))
    }

    /// Build posts from rows, skipping rows with broken metadata and
    /// duplicate slugs
    fn posts_from_pages(&self, pages: &[Page]) -> Vec<Post> {
        let names = &self.config.notion.properties;
        let mut seen_slugs = HashSet::new();
        let mut posts = Vec::with_capacity(pages.len());

        for page in pages {
            match Post::from_page(page, names) {
                Ok(post) => {
                    if !seen_slugs.insert(post.slug.clone()) {
                        tracing::warn!(
                            "Skipping page {}: slug {:?} is already used by a newer post",
                            post.id,
                            post.slug
                        );
                        continue;
                    }
                    posts.push(post);
                }
                Err(e) => tracing::warn!("Skipping page: {}", e),
            }
        }

        // Stable, so rows on the same day keep Notion's order
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        posts
    }
}

/// Earliest expiry among Notion-hosted files in a block tree
fn earliest_expiry(blocks: &[Block]) -> Option<DateTime<Utc>> {
    blocks
        .iter()
        .flat_map(|block| {
            let own = match &block.kind {
                BlockKind::Image { image: f }
                | BlockKind::Video { video: f }
                | BlockKind::File { file: f }
                | BlockKind::Pdf { pdf: f } => f
                    .file
                    .as_ref()
                    .and_then(|u| u.expiry_time.as_deref())
                    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                    .map(|t| t.with_timezone(&Utc)),
                _ => None,
            };
            own.into_iter().chain(earliest_expiry(&block.children))
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::testing::{page, paragraph, FakeSource};
    use crate::notion::types::{FileBlock, FileUrl};
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    fn source() -> FakeSource {
        let mut blocks = HashMap::new();
        blocks.insert("a".to_string(), vec![paragraph("alpha body")]);
        blocks.insert("b".to_string(), vec![paragraph("beta body")]);
        FakeSource::new(
            vec![
                page("a", "Alpha", "alpha", "2023-01-01", "t1"),
                page("b", "Beta", "beta", "2023-02-01", "t1"),
                page("c", "Dup", "alpha", "2022-12-01", "t1"),
                serde_json::from_str(r#"{"id": "broken", "properties": {}}"#).unwrap(),
            ],
            blocks,
        )
    }

    #[tokio::test]
    async fn test_load_post_list_sorts_and_skips() {
        let source = source();
        let config = SiteConfig::default();
        let loader = ContentLoader::new(&source, &config);

        let posts = loader.load_post_list().await.unwrap();
        let slugs: Vec<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["beta", "alpha"]);
        assert_eq!(source.block_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_load_posts_uses_cache() {
        let source = source();
        let config = SiteConfig::default();
        let loader = ContentLoader::new(&source, &config);

        let first = loader.load_posts(&CacheDb::new(), false).await.unwrap();
        assert_eq!(first.fetched, 2);
        assert_eq!(first.reused, 0);
        assert_eq!(first.posts[1].markdown, "alpha body");
        assert!(first.posts[1].content.contains("<p>alpha body</p>"));
        assert_eq!(first.cache.config_hash, config.fingerprint());

        let second = loader.load_posts(&first.cache, false).await.unwrap();
        assert_eq!(second.fetched, 0);
        assert_eq!(second.reused, 2);
        assert!(second.posts[0].content.contains("beta body"));
        assert_eq!(source.block_calls.load(Ordering::SeqCst), 2);

        let forced = loader.load_posts(&first.cache, true).await.unwrap();
        assert_eq!(forced.fetched, 2);
    }

    #[tokio::test]
    async fn test_load_single() {
        let source = source();
        let config = SiteConfig::default();
        let loader = ContentLoader::new(&source, &config);

        let post = loader.load_single("beta").await.unwrap().unwrap();
        assert_eq!(post.title, "Beta");
        assert_eq!(post.markdown, "beta body");

        assert!(loader.load_single("nope").await.unwrap().is_none());
    }

    #[test]
    fn test_earliest_expiry() {
        let hosted = |expiry: &str| {
            Block::new(BlockKind::Image {
                image: FileBlock {
                    file: Some(FileUrl {
                        url: "https://s3/x.png".to_string(),
                        expiry_time: Some(expiry.to_string()),
                    }),
                    ..Default::default()
                },
            })
        };
        let blocks = vec![
            paragraph("x"),
            hosted("2023-06-01T12:00:00.000Z"),
            paragraph("y").with_children(vec![hosted("2023-06-01T11:00:00.000Z")]),
        ];
        let expiry = earliest_expiry(&blocks).unwrap();
        assert_eq!(expiry.to_rfc3339(), "2023-06-01T11:00:00+00:00");
        assert_eq!(earliest_expiry(&[paragraph("x")]), None);
    }
}
