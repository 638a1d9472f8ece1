//! Show a single post

use anyhow::{bail, Result};
use std::fmt::Write;

use crate::content::{ContentLoader, Post};
use crate::notion::NotionClient;
use crate::Blog;

/// Print one post's metadata and markdown
pub async fn run(blog: &Blog, slug: &str) -> Result<()> {
    let client = NotionClient::new(&blog.config.notion)?;
    let loader = ContentLoader::new(&client, &blog.config);

    match loader.load_single(slug).await? {
        Some(post) => {
            print!("{}", describe(&post)?);
            Ok(())
        }
        None => bail!("No published post with slug {:?}", slug),
    }
}

fn describe(post: &Post) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "title:       {}", post.title)?;
    writeln!(out, "slug:        {}", post.slug)?;
    writeln!(out, "date:        {}", post.date.format("%Y-%m-%d"))?;
    writeln!(out, "tags:        {}", post.tags.join(", "))?;
    writeln!(out, "description: {}", post.description)?;
    writeln!(out, "id:          {}", post.id)?;
    writeln!(out, "---")?;
    writeln!(out, "{}", post.markdown)?;
    Ok(out)
}
