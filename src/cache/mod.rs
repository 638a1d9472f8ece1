//! Cache module for incremental generation
//!
//! Remembers, per Notion page, the last edit timestamp and the converted
//! Markdown. Unchanged posts are not re-fetched block by block, and a run in
//! which nothing changed skips rendering altogether.

use anyhow::Result;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::Post;

/// Cache directory, relative to the site directory
pub const CACHE_DIR: &str = ".notion-blog-cache";

/// Cache file name inside `CACHE_DIR`
const CACHE_FILE: &str = "db.json";

/// Cached state of one post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Notion last edit timestamp when the markdown was produced
    pub last_edited_time: String,
    /// Slug the post was written under
    pub slug: String,
    /// Tags the post carried (for removing stale tag pages)
    pub tags: Vec<String>,
    /// Converted markdown
    pub markdown: String,
    /// Earliest expiry of Notion-hosted file URLs embedded in the markdown
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Cache database for tracking post changes
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    /// Version of the cache format
    pub version: u32,
    /// Fingerprint of the site config (changes trigger full rebuild)
    pub config_hash: u64,
    /// Cached entries keyed by Notion page id
    pub entries: HashMap<String, CacheEntry>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Path of the cache file for a site
    pub fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(CACHE_DIR).join(CACHE_FILE)
    }

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = Self::path(base_dir);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<CacheDb>(&content) {
                Ok(cache) if cache.version == Self::VERSION => return cache,
                Ok(_) => tracing::info!("Cache version mismatch, rebuilding cache"),
                Err(e) => tracing::warn!("Ignoring unreadable cache {:?}: {}", cache_path, e),
            }
        }
        Self::new()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(base_dir), content)?;
        Ok(())
    }

    /// Create a new cache with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// No generation has recorded this cache yet. A run always stores the
    /// config fingerprint, even when the database has no posts.
    pub fn is_fresh(&self) -> bool {
        self.config_hash == 0
    }

    /// Cached markdown for a post, if it was produced from the same edit and
    /// its file links have not expired yet
    pub fn markdown_for(&self, id: &str, last_edited_time: &str, now: DateTime<Utc>) -> Option<&str> {
        let entry = self.entries.get(id)?;
        if entry.last_edited_time != last_edited_time {
            return None;
        }
        if entry.expires_at.is_some_and(|expiry| expiry <= now) {
            return None;
        }
        Some(&entry.markdown)
    }

    /// Record a post after its markdown has been produced
    pub fn record(&mut self, post: &Post, expires_at: Option<DateTime<Utc>>) {
        self.entries.insert(
            post.id.clone(),
            CacheEntry {
                last_edited_time: post.last_edited_time.clone(),
                slug: post.slug.clone(),
                tags: post.tags.clone(),
                markdown: post.markdown.clone(),
                expires_at,
            },
        );
    }
}

/// Change detection result
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Posts that are new or were edited (page ids)
    pub changed_posts: Vec<String>,
    /// Posts that were unpublished or deleted (page ids)
    pub deleted_posts: Vec<String>,
    /// Slugs whose output directory no longer belongs to any post
    pub stale_slugs: Vec<String>,
    /// Tags no longer carried by any post
    pub stale_tags: Vec<String>,
    /// Whether to regenerate everything (config changed or no cache)
    pub full_rebuild: bool,
}

impl ChangeSet {
    /// Create a changeset indicating full rebuild is needed
    pub fn full_rebuild() -> Self {
        Self {
            full_rebuild: true,
            ..Default::default()
        }
    }

    /// Check if any changes were detected
    pub fn has_changes(&self) -> bool {
        self.full_rebuild || !self.changed_posts.is_empty() || !self.deleted_posts.is_empty()
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.full_rebuild {
            parts.push("full rebuild".to_string());
        }
        if !self.changed_posts.is_empty() {
            parts.push(format!("{} posts changed", self.changed_posts.len()));
        }
        if !self.deleted_posts.is_empty() {
            parts.push(format!("{} posts removed", self.deleted_posts.len()));
        }
        if !self.stale_tags.is_empty() {
            parts.push(format!("{} tags removed", self.stale_tags.len()));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Compare the freshly loaded posts against the cache
pub fn detect_changes(cache: &CacheDb, config_hash: u64, posts: &[Post]) -> ChangeSet {
    let mut changes = ChangeSet {
        full_rebuild: cache.is_fresh() || cache.config_hash != config_hash,
        ..Default::default()
    };

    for post in posts {
        let unchanged = cache
            .entries
            .get(&post.id)
            .is_some_and(|e| e.last_edited_time == post.last_edited_time);
        if !unchanged {
            changes.changed_posts.push(post.id.clone());
        }
    }

    let live_ids: IndexSet<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    let live_slugs: IndexSet<&str> = posts.iter().map(|p| p.slug.as_str()).collect();
    let live_tags: IndexSet<&str> = posts
        .iter()
        .flat_map(|p| p.tags.iter().map(String::as_str))
        .collect();

    let mut stale_slugs = IndexSet::new();
    let mut stale_tags = IndexSet::new();
    for (id, entry) in &cache.entries {
        if !live_ids.contains(id.as_str()) {
            changes.deleted_posts.push(id.clone());
        }
        if !live_slugs.contains(entry.slug.as_str()) {
            stale_slugs.insert(entry.slug.clone());
        }
        for tag in &entry.tags {
            if !live_tags.contains(tag.as_str()) {
                stale_tags.insert(tag.clone());
            }
        }
    }

    changes.deleted_posts.sort();
    changes.stale_slugs = stale_slugs.into_iter().collect();
    changes.stale_slugs.sort();
    changes.stale_tags = stale_tags.into_iter().collect();
    changes.stale_tags.sort();
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn post(id: &str, slug: &str, edited: &str, tags: &[&str]) -> Post {
        let mut post = Post::new(id, id, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        post.slug = slug.to_string();
        post.last_edited_time = edited.to_string();
        post.tags = tags.iter().map(|t| t.to_string()).collect();
        post.markdown = format!("# {}", id);
        post
    }

    fn cached(posts: &[Post], config_hash: u64) -> CacheDb {
        let mut cache = CacheDb::new();
        cache.config_hash = config_hash;
        for p in posts {
            cache.record(p, None);
        }
        cache
    }

    #[test]
    fn test_empty_cache_is_full_rebuild() {
        let changes = detect_changes(&CacheDb::new(), 1, &[post("a", "a", "t1", &[])]);
        assert!(changes.full_rebuild);
        assert!(changes.has_changes());
        assert_eq!(changes.changed_posts, vec!["a"]);
    }

    #[test]
    fn test_empty_database_after_first_run() {
        let cache = cached(&[], 7);
        assert!(cache.is_empty());
        assert!(!cache.is_fresh());

        let changes = detect_changes(&cache, 7, &[]);
        assert!(!changes.full_rebuild);
        assert!(!changes.has_changes());
    }

    #[test]
    fn test_no_changes() {
        let posts = vec![post("a", "a", "t1", &["x"]), post("b", "b", "t1", &["y"])];
        let cache = cached(&posts, 7);
        let changes = detect_changes(&cache, 7, &posts);
        assert!(!changes.has_changes());
        assert_eq!(changes.summary(), "no changes");

        let changes = detect_changes(&cache, 8, &posts);
        assert!(changes.full_rebuild);
    }

    #[test]
    fn test_edits_removals_and_stale_paths() {
        let before = vec![
            post("a", "a", "t1", &["x"]),
            post("b", "b", "t1", &["y"]),
            post("c", "c", "t1", &["x"]),
        ];
        let cache = cached(&before, 7);
        let after = vec![
            post("a", "a-renamed", "t2", &["x"]),
            post("c", "c", "t1", &["x"]),
            post("d", "d", "t1", &["z"]),
        ];
        let changes = detect_changes(&cache, 7, &after);
        assert!(!changes.full_rebuild);
        assert_eq!(changes.changed_posts, vec!["a", "d"]);
        assert_eq!(changes.deleted_posts, vec!["b"]);
        assert_eq!(changes.stale_slugs, vec!["a", "b"]);
        assert_eq!(changes.stale_tags, vec!["y"]);
        assert_eq!(changes.summary(), "2 posts changed, 1 posts removed, 1 tags removed");
    }

    #[test]
    fn test_markdown_for_respects_edit_time_and_expiry() {
        let now = Utc::now();
        let mut cache = CacheDb::new();
        let p = post("a", "a", "t1", &[]);
        cache.record(&p, Some(now + Duration::minutes(30)));

        assert_eq!(cache.markdown_for("a", "t1", now), Some("# a"));
        assert_eq!(cache.markdown_for("a", "t2", now), None);
        assert_eq!(cache.markdown_for("missing", "t1", now), None);
        assert_eq!(cache.markdown_for("a", "t1", now + Duration::hours(1)), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cached(&[post("a", "a", "t1", &["x"])], 42);
        cache.save(dir.path()).unwrap();

        let loaded = CacheDb::load(dir.path());
        assert_eq!(loaded.config_hash, 42);
        assert_eq!(loaded.entries["a"].slug, "a");

        cache.version = 99;
        cache.save(dir.path()).unwrap();
        assert!(CacheDb::load(dir.path()).is_empty());

        fs::write(CacheDb::path(dir.path()), "not json").unwrap();
        assert!(CacheDb::load(dir.path()).is_empty());
    }
}
