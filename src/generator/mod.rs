//! Generator module - writes the static site using built-in Tera templates

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use tera::Context;
use walkdir::WalkDir;

use crate::cache::ChangeSet;
use crate::content::query::{
    all_tags, number_of_pages, number_of_pages_by_tag, posts_by_page, posts_by_tag_and_page,
    posts_for_top_page,
};
use crate::content::Post;
use crate::helpers::{
    format_date, full_url_for, list_page_path, path_segment, post_path, start_of_day,
    tag_page_path, url_for,
};
use crate::templates::{
    NavItem, PageLink, PaginationData, PostCard, PostPage, SiteData, TagLink, TemplateRenderer,
    STYLESHEET,
};
use crate::Blog;

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
        })
    }

    /// Generate the entire site from posts sorted newest first
    pub fn generate(&self, posts: &[Post]) -> Result<()> {
        fs::create_dir_all(&self.blog.public_dir)?;

        // Listings are rebuilt from scratch so shrinking tags leave no pages behind
        self.remove_dir(&self.blog.public_dir.join("posts/page"))?;
        self.remove_dir(&self.blog.public_dir.join("posts/tag"))?;

        let site_data = self.build_site_data(posts);

        self.generate_index(posts, &site_data)?;
        self.generate_list_pages(posts, &site_data)?;
        self.generate_tag_pages(posts, &site_data)?;
        self.generate_post_pages(posts, &site_data)?;
        self.generate_atom_feed(posts)?;

        self.copy_assets()
    }

    /// Write the stylesheet, then copy the static directory over the output
    pub fn copy_assets(&self) -> Result<()> {
        self.write_stylesheet()?;
        self.copy_static_assets()
    }

    /// Remove output of posts that no longer exist under their old slug
    pub fn remove_stale(&self, changes: &ChangeSet) -> Result<()> {
        for slug in &changes.stale_slugs {
            let dir = self.blog.public_dir.join("posts").join(path_segment(slug));
            self.remove_dir(&dir)?;
        }
        Ok(())
    }

    fn remove_dir(&self, dir: &Path) -> Result<()> {
        if dir.exists() {
            fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {:?}", dir))?;
            tracing::debug!("Removed: {:?}", dir);
        }
        Ok(())
    }

    /// Build site data for templates
    fn build_site_data(&self, posts: &[Post]) -> SiteData {
        let config = &self.blog.config;
        let now = Utc::now().with_timezone(&config.tz());

        SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            home_url: url_for(config, ""),
            css_url: url_for(config, "css/style.css"),
            feed_url: url_for(config, "atom.xml"),
            more_label: config.more_label.clone(),
            back_label: config.back_label.clone(),
            nav: config
                .nav
                .iter()
                .map(|link| NavItem {
                    name: link.name.clone(),
                    url: if link.url.starts_with('/') {
                        url_for(config, &link.url)
                    } else {
                        link.url.clone()
                    },
                })
                .collect(),
            tags: all_tags(posts).iter().map(|t| self.tag_link(t)).collect(),
            generated_at: now.format("%Y-%m-%d %H:%M").to_string(),
        }
    }

    fn tag_link(&self, tag: &str) -> TagLink {
        TagLink {
            name: tag.to_string(),
            url: url_for(&self.blog.config, &tag_page_path(tag, 1)),
        }
    }

    fn post_card(&self, post: &Post) -> PostCard {
        PostCard {
            title: post.title.clone(),
            description: post.description.clone(),
            date: format_date(&post.date, &self.blog.config.date_format),
            url: url_for(&self.blog.config, &post_path(&post.slug)),
            tags: post.tags.iter().map(|t| self.tag_link(t)).collect(),
        }
    }

    fn base_context(&self, site_data: &SiteData) -> Context {
        let mut context = Context::new();
        context.insert("site", site_data);
        context
    }

    /// Write `html` to `<public>/<dir>/index.html`
    fn write_page(&self, dir: &str, html: &str) -> Result<()> {
        let output_path = self.blog.public_dir.join(dir).join("index.html");
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(&output_path, html)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Generate the top page
    fn generate_index(&self, posts: &[Post], site_data: &SiteData) -> Result<()> {
        let cards: Vec<PostCard> = posts_for_top_page(posts, self.blog.config.top_page_posts)
            .iter()
            .map(|p| self.post_card(p))
            .collect();

        let mut context = self.base_context(site_data);
        context.insert("posts", &cards);
        context.insert("more_url", &url_for(&self.blog.config, &list_page_path(1)));

        let html = self.renderer.render("index.html", &context)?;
        self.write_page("", &html)
    }

    /// Generate `posts/page/{n}/`, always at least page 1
    fn generate_list_pages(&self, posts: &[Post], site_data: &SiteData) -> Result<()> {
        let per_page = self.blog.config.per_page;
        let total = number_of_pages(posts.len(), per_page).max(1);

        for page in 1..=total {
            let cards: Vec<PostCard> = posts_by_page(posts, page, per_page)
                .iter()
                .map(|p| self.post_card(p))
                .collect();

            let mut context = self.base_context(site_data);
            context.insert("heading", &self.blog.config.title);
            context.insert("posts", &cards);
            context.insert(
                "pagination",
                &self.pagination(page, total, list_page_path),
            );

            let html = self.renderer.render("list.html", &context)?;
            self.write_page(&format!("posts/page/{}", page), &html)?;
        }

        tracing::info!("Generated {} list pages", total);
        Ok(())
    }

    /// Generate `posts/tag/{tag}/page/{n}/` for every tag
    fn generate_tag_pages(&self, posts: &[Post], site_data: &SiteData) -> Result<()> {
        let per_page = self.blog.config.per_page;
        let tags = all_tags(posts);

        for tag in &tags {
            let total = number_of_pages_by_tag(posts, tag, per_page);

            for page in 1..=total {
                let cards: Vec<PostCard> = posts_by_tag_and_page(posts, tag, page, per_page)
                    .into_iter()
                    .map(|p| self.post_card(p))
                    .collect();

                let mut context = self.base_context(site_data);
                context.insert("heading", &format!("#{}", tag));
                context.insert("posts", &cards);
                context.insert(
                    "pagination",
                    &self.pagination(page, total, |n| tag_page_path(tag, n)),
                );

                let html = self.renderer.render("list.html", &context)?;
                self.write_page(
                    &format!("posts/tag/{}/page/{}", path_segment(tag), page),
                    &html,
                )?;
            }
        }

        tracing::info!("Generated pages for {} tags", tags.len());
        Ok(())
    }

    /// Generate individual post pages
    fn generate_post_pages(&self, posts: &[Post], site_data: &SiteData) -> Result<()> {
        for post in posts {
            let page = PostPage {
                title: post.title.clone(),
                description: post.description.clone(),
                date: format_date(&post.date, &self.blog.config.date_format),
                tags: post.tags.iter().map(|t| self.tag_link(t)).collect(),
                content: post.content.clone(),
            };

            let mut context = self.base_context(site_data);
            context.insert("post", &page);

            let html = self.renderer.render("post.html", &context)?;
            self.write_page(&format!("posts/{}", path_segment(&post.slug)), &html)?;
        }

        tracing::info!("Generated {} posts", posts.len());
        Ok(())
    }

    fn pagination<F>(&self, current: usize, total: usize, path: F) -> PaginationData
    where
        F: Fn(usize) -> String,
    {
        let config = &self.blog.config;
        PaginationData {
            current,
            total,
            pages: (1..=total)
                .map(|number| PageLink {
                    number,
                    url: url_for(config, &path(number)),
                    current: number == current,
                })
                .collect(),
            prev_url: (current > 1).then(|| url_for(config, &path(current - 1))),
            next_url: (current < total).then(|| url_for(config, &path(current + 1))),
        }
    }

    /// Generate Atom feed
    fn generate_atom_feed(&self, posts: &[Post]) -> Result<()> {
        let config = &self.blog.config;
        let tz = config.tz();
        let entries = &posts[..config.feed_limit.min(posts.len())];

        let updated_of = |post: &Post| -> DateTime<Utc> {
            DateTime::parse_from_rfc3339(&post.last_edited_time)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| start_of_day(&post.date, tz))
        };
        let feed_updated = entries
            .iter()
            .map(updated_of)
            .max()
            .unwrap_or_else(Utc::now);

        let home = full_url_for(config, "");
        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        if !config.description.is_empty() {
            feed.push_str(&format!(
                "  <subtitle>{}</subtitle>\n",
                escape_xml(&config.description)
            ));
        }
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            escape_xml(&full_url_for(config, "atom.xml"))
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", escape_xml(&home)));
        feed.push_str(&format!("  <updated>{}</updated>\n", feed_updated.to_rfc3339()));
        feed.push_str(&format!("  <id>{}</id>\n", escape_xml(&home)));
        if !config.author.is_empty() {
            feed.push_str(&format!(
                "  <author><name>{}</name></author>\n",
                escape_xml(&config.author)
            ));
        }

        let base_url = config.url.trim_end_matches('/');
        for post in entries {
            let link = escape_xml(&full_url_for(config, &post_path(&post.slug)));
            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
            feed.push_str(&format!("    <id>{}</id>\n", link));
            feed.push_str(&format!(
                "    <published>{}</published>\n",
                start_of_day(&post.date, tz).to_rfc3339()
            ));
            feed.push_str(&format!(
                "    <updated>{}</updated>\n",
                updated_of(post).to_rfc3339()
            ));
            for tag in &post.tags {
                feed.push_str(&format!("    <category term=\"{}\"/>\n", escape_xml(tag)));
            }
            if !post.description.is_empty() {
                feed.push_str(&format!(
                    "    <summary>{}</summary>\n",
                    escape_xml(&strip_invalid_xml_chars(&post.description))
                ));
            }
            let content = convert_relative_urls_to_absolute(&post.content, base_url);
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                escape_cdata(&strip_invalid_xml_chars(&content))
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        let output_path = self.blog.public_dir.join("atom.xml");
        fs::write(&output_path, feed)?;
        tracing::info!("Generated atom.xml with {} entries", entries.len());

        Ok(())
    }

    fn write_stylesheet(&self) -> Result<()> {
        let css_dir = self.blog.public_dir.join("css");
        fs::create_dir_all(&css_dir)?;
        fs::write(css_dir.join("style.css"), STYLESHEET)?;
        Ok(())
    }

    /// Copy everything under the static directory into the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest: PathBuf = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest).with_context(|| format!("Failed to copy {:?}", path))?;
            copied += 1;
        }

        tracing::debug!("Copied {} static files", copied);
        Ok(())
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Split any `]]>` so the content cannot close its CDATA section early
fn escape_cdata(s: &str) -> String {
    s.replace("]]>", "]]]]><![CDATA[>")
}

/// Make root-relative href/src attributes absolute
fn convert_relative_urls_to_absolute(content: &str, base_url: &str) -> String {
    content
        .replace("href=\"/", &format!("href=\"{}/", base_url))
        .replace("src=\"/", &format!("src=\"{}/", base_url))
        .replace("href='/", &format!("href='{}/", base_url))
        .replace("src='/", &format!("src='{}/", base_url))
}

/// Strip characters XML 1.0 does not allow
fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            c == '\t'
                || c == '\n'
                || c == '\r'
                || ('\u{0020}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}
