//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/');

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/posts/page/1/") // -> "/blog/posts/page/1/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/posts/hello/") // -> "https://example.com/blog/posts/hello/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Directory name for a slug or tag coming from Notion.
///
/// Path separators would nest directories, so they become dashes.
pub fn path_segment(value: &str) -> String {
    let segment: String = value
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    match segment.as_str() {
        "" | "." | ".." => "-".to_string(),
        _ => segment,
    }
}

/// Percent-encoded form of `path_segment`, for hrefs
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(&path_segment(value), SEGMENT).to_string()
}

/// Site-relative path of a post
pub fn post_path(slug: &str) -> String {
    format!("posts/{}/", encode_segment(slug))
}

/// Site-relative path of list page `page`
pub fn list_page_path(page: usize) -> String {
    format!("posts/page/{}/", page)
}

/// Site-relative path of tag page `page`
pub fn tag_page_path(tag: &str, page: usize) -> String {
    format!("posts/tag/{}/page/{}/", encode_segment(tag), page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        SiteConfig {
            url: "https://example.com".to_string(),
            root: "/blog/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/css/style.css"), "/blog/css/style.css");
        assert_eq!(url_for(&config, "posts/page/1/"), "/blog/posts/page/1/");
        assert_eq!(url_for(&config, ""), "/blog/");
        assert_eq!(url_for(&SiteConfig::default(), "posts/a/"), "/posts/a/");
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/posts/hello/"),
            "https://example.com/blog/posts/hello/"
        );
    }

    #[test]
    fn test_segments() {
        assert_eq!(path_segment("C/C++"), "C-C++");
        assert_eq!(path_segment(" .. "), "-");
        assert_eq!(encode_segment("Next.js"), "Next.js");
        assert_eq!(encode_segment("C/C++"), "C-C++");
        assert_eq!(encode_segment("日記"), "%E6%97%A5%E8%A8%98");
        assert_eq!(encode_segment("a b?"), "a%20b%3F");
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(post_path("hello-world"), "posts/hello-world/");
        assert_eq!(list_page_path(3), "posts/page/3/");
        assert_eq!(tag_page_path("Rust Lang", 1), "posts/tag/Rust%20Lang/page/1/");
    }
}
