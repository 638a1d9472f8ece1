//! Initialize a new blog site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::cache::CACHE_DIR;
use crate::CONFIG_FILE;

const CONFIG_TEMPLATE: &str = r#"# notion-blog configuration

# Site
title: Notion Blog
description: ''
author: ''
language: ja
timezone: Asia/Tokyo

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public
static_dir: static

# Listing
per_page: 4
top_page_posts: 4
feed_limit: 20

# Display
date_format: YYYY-MM-DD
highlight_theme: InspiredGitHub
more_label: ...もっと見る
back_label: ←ホームに戻る
nav:
  - name: Home
    url: /

# Notion
## The token and database id are better kept in the NOTION_TOKEN and
## NOTION_DATABASE_ID environment variables.
notion:
  database_id: ''
  slug_filter: formula
  properties:
    title: Name
    description: Description
    date: Date
    slug: Slug
    tags: Tags
    published: Published
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("{:?} already exists", config_path);
    }

    fs::create_dir_all(target_dir.join("static"))?;
    fs::write(&config_path, CONFIG_TEMPLATE)?;

    let gitignore = target_dir.join(".gitignore");
    if !gitignore.exists() {
        fs::write(&gitignore, format!("public/\n{}/\n", CACHE_DIR))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("blog");
        init_site(&target).unwrap();

        assert!(target.join("static").is_dir());
        let config = SiteConfig::load(target.join(CONFIG_FILE)).unwrap();
        config.validate().unwrap();
        assert_eq!(config.per_page, 4);
        assert_eq!(config.timezone, "Asia/Tokyo");
        assert_eq!(config.notion.properties.published, "Published");
        assert!(fs::read_to_string(target.join(".gitignore"))
            .unwrap()
            .contains(CACHE_DIR));
    }

    #[test]
    fn test_init_refuses_existing_site() {
        let dir = tempfile::tempdir().unwrap();
        init_site(dir.path()).unwrap();
        assert!(init_site(dir.path()).is_err());
    }
}
