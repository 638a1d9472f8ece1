//! Generate static files

use anyhow::Result;
use std::time::Instant;

use crate::cache::{detect_changes, CacheDb, ChangeSet};
use crate::content::{ContentLoader, LoadedPosts};
use crate::generator::Generator;
use crate::notion::{NotionClient, PostSource};
use crate::Blog;

/// Generate the static site from Notion.
///
/// Returns whether any output was written.
pub async fn run(blog: &Blog, force: bool) -> Result<bool> {
    let client = NotionClient::new(&blog.config.notion)?;
    run_with_source(blog, &client, force).await
}

/// Generate the static site from any post source
pub async fn run_with_source<S: PostSource>(blog: &Blog, source: &S, force: bool) -> Result<bool> {
    let start = Instant::now();

    let cache = CacheDb::load(&blog.base_dir);
    let loader = ContentLoader::new(source, &blog.config);
    let loaded = loader.load_posts(&cache, force).await?;

    tracing::info!(
        "Loaded {} posts ({} fetched, {} from cache)",
        loaded.posts.len(),
        loaded.fetched,
        loaded.reused
    );

    let changes = if force {
        tracing::info!("Full generation (forced)");
        ChangeSet::full_rebuild()
    } else {
        changes_since(&cache, &loaded)
    };

    if !changes.has_changes() && blog.public_dir.exists() {
        loaded.cache.save(&blog.base_dir)?;
        tracing::info!(
            "No changes detected, skipping generation ({:.2}s)",
            start.elapsed().as_secs_f64()
        );
        return Ok(false);
    }

    tracing::info!("Changes detected: {}", changes.summary());

    let generator = Generator::new(blog)?;
    generator.remove_stale(&changes)?;
    generator.generate(&loaded.posts)?;

    loaded.cache.save(&blog.base_dir)?;

    tracing::info!("Generated in {:.2}s", start.elapsed().as_secs_f64());
    Ok(true)
}

/// Changes against the previous run, counting posts whose markdown was
/// re-fetched with different content (refreshed file links) as edited
fn changes_since(cache: &CacheDb, loaded: &LoadedPosts) -> ChangeSet {
    let mut changes = detect_changes(cache, loaded.cache.config_hash, &loaded.posts);

    for post in &loaded.posts {
        let same = cache
            .entries
            .get(&post.id)
            .is_some_and(|e| e.markdown == post.markdown);
        if !same && !changes.changed_posts.contains(&post.id) {
            changes.changed_posts.push(post.id.clone());
        }
    }

    changes
}
