//! List site content

use anyhow::{bail, Result};
use std::fmt::Write;

use crate::content::query::{all_tags, posts_by_tag};
use crate::content::{ContentLoader, Post};
use crate::notion::NotionClient;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let client = NotionClient::new(&blog.config.notion)?;
    let posts = ContentLoader::new(&client, &blog.config)
        .load_post_list()
        .await?;
    print!("{}", listing(&posts, content_type)?);
    Ok(())
}

/// Text listing of posts or tags
fn listing(posts: &[Post], content_type: &str) -> Result<String> {
    let mut out = String::new();

    match content_type {
        "post" | "posts" => {
            writeln!(out, "Posts ({}):", posts.len())?;
            for post in posts {
                write!(
                    out,
                    "  {} - {} [{}]",
                    post.date.format("%Y-%m-%d"),
                    post.title,
                    post.slug
                )?;
                if !post.tags.is_empty() {
                    write!(out, " #{}", post.tags.join(" #"))?;
                }
                out.push('\n');
            }
        }
        "tag" | "tags" => {
            let tags = all_tags(posts);
            writeln!(out, "Tags ({}):", tags.len())?;
            for tag in &tags {
                writeln!(out, "  {} ({})", tag, posts_by_tag(posts, tag).len())?;
            }
        }
        _ => bail!("Unknown type: {}. Available: post, tag", content_type),
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn posts() -> Vec<Post> {
        let mut a = Post::new("a", "First", NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        a.tags = vec!["Rust".to_string(), "Notion".to_string()];
        let mut b = Post::new("b", "Second", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        b.tags = vec!["Rust".to_string()];
        vec![a, b]
    }

    #[test]
    fn test_list_posts() {
        let out = listing(&posts(), "post").unwrap();
        assert_eq!(
            out,
            "Posts (2):\n  2024-02-01 - First [first] #Rust #Notion\n  2024-01-01 - Second [second] #Rust\n"
        );
    }

    #[test]
    fn test_list_tags() {
        let out = listing(&posts(), "tags").unwrap();
        assert_eq!(out, "Tags (2):\n  Rust (2)\n  Notion (1)\n");
    }

    #[test]
    fn test_unknown_type() {
        assert!(listing(&posts(), "category").is_err());
    }
}
