//! Pagination and tag filtering over the date-sorted post list
//!
//! Page numbers are 1-based. Out-of-range pages yield an empty slice rather
//! than an error, so callers can render "no posts" pages uniformly.

use indexmap::IndexSet;

use super::Post;

/// The newest `count` posts
pub fn posts_for_top_page(posts: &[Post], count: usize) -> &[Post] {
    &posts[..count.min(posts.len())]
}

/// Number of list pages needed for `count` posts
pub fn number_of_pages(count: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    count.div_ceil(per_page)
}

/// Posts shown on list page `page`
pub fn posts_by_page(posts: &[Post], page: usize, per_page: usize) -> &[Post] {
    match page_range(posts.len(), page, per_page) {
        Some((start, end)) => &posts[start..end],
        None => &[],
    }
}

/// Posts carrying `tag`, in list order
pub fn posts_by_tag<'a>(posts: &'a [Post], tag: &str) -> Vec<&'a Post> {
    posts.iter().filter(|p| p.has_tag(tag)).collect()
}

/// Posts carrying `tag` shown on tag page `page`
pub fn posts_by_tag_and_page<'a>(
    posts: &'a [Post],
    tag: &str,
    page: usize,
    per_page: usize,
) -> Vec<&'a Post> {
    let tagged = posts_by_tag(posts, tag);
    match page_range(tagged.len(), page, per_page) {
        Some((start, end)) => tagged[start..end].to_vec(),
        None => Vec::new(),
    }
}

/// Number of tag pages for `tag`
pub fn number_of_pages_by_tag(posts: &[Post], tag: &str, per_page: usize) -> usize {
    let count = posts.iter().filter(|p| p.has_tag(tag)).count();
    number_of_pages(count, per_page)
}

/// Distinct tags in order of first appearance
pub fn all_tags(posts: &[Post]) -> Vec<String> {
    let tags: IndexSet<&str> = posts
        .iter()
        .flat_map(|p| p.tags.iter().map(String::as_str))
        .collect();
    tags.into_iter().map(str::to_string).collect()
}

/// Bounds of a 1-based page within `len` items
fn page_range(len: usize, page: usize, per_page: usize) -> Option<(usize, usize)> {
    if page == 0 || per_page == 0 {
        return None;
    }
    let start = (page - 1).checked_mul(per_page)?;
    if start >= len {
        return None;
    }
    Some((start, (start + per_page).min(len)))
}
