//! HTTP client for the Notion REST API

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::error::ApiErrorBody;
use super::types::{Block, BlockKind, Page, PaginatedList};
use super::{NotionError, PostSource};
use crate::config::{NotionConfig, PropertyNames, SlugFilter};

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type BlockTreeFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Block>, NotionError>> + Send + 'a>>;

/// Client bound to one blog database
pub struct NotionClient {
    client: Client,
    base_url: String,
    database_id: String,
    properties: PropertyNames,
    slug_filter: SlugFilter,
    page_size: usize,
    max_retries: u32,
}

impl NotionClient {
    /// Create a new client from the `notion:` configuration
    pub fn new(config: &NotionConfig) -> Result<Self, NotionError> {
        let token = config.token()?;
        let database_id = config.database_id()?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| NotionError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            "Notion-Version",
            HeaderValue::from_str(&config.api_version)
                .unwrap_or_else(|_| HeaderValue::from_static("2022-06-28")),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("notion-blog/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            database_id,
            properties: config.properties.clone(),
            slug_filter: config.slug_filter,
            page_size: config.page_size(),
            max_retries: config.max_retries,
        })
    }

    /// All published rows, newest first, following every cursor
    pub async fn query_published_posts(&self) -> Result<Vec<Page>, NotionError> {
        let path = format!("databases/{}/query", self.database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = published_query(&self.properties, self.page_size, cursor.as_deref());
            let list: PaginatedList<Page> = self.execute(Method::POST, &path, &[], Some(&body)).await?;
            pages.extend(list.results.into_iter().filter(|p| !p.archived));

            match list.next_cursor {
                Some(next) if list.has_more => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} published pages", pages.len());
        Ok(pages)
    }

    /// The published row whose slug equals `slug`
    pub async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Page>, NotionError> {
        let path = format!("databases/{}/query", self.database_id);
        let body = slug_query(&self.properties, self.slug_filter, slug);
        let list: PaginatedList<Page> = self.execute(Method::POST, &path, &[], Some(&body)).await?;
        Ok(list.results.into_iter().next())
    }

    /// Direct children of a block or page
    pub async fn block_children(&self, block_id: &str) -> Result<Vec<Block>, NotionError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        let path = format!("blocks/{}/children", block_id);

        loop {
            let mut query = vec![("page_size", "100")];
            if let Some(c) = cursor.as_deref() {
                query.push(("start_cursor", c));
            }
            let list: PaginatedList<Block> =
                self.execute(Method::GET, &path, &query, None).await?;
            blocks.extend(list.results);

            match list.next_cursor {
                Some(next) if list.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blocks)
    }

    /// Children of a block with every nested child list populated.
    ///
    /// Child pages are separate documents and are not descended into.
    pub fn block_tree<'a>(&'a self, block_id: &'a str) -> BlockTreeFuture<'a> {
        Box::pin(async move {
            let mut blocks = self.block_children(block_id).await?;
            for block in &mut blocks {
                if block.has_children && !matches!(block.kind, BlockKind::ChildPage { .. }) {
                    block.children = self.block_tree(&block.id).await?;
                }
            }
            Ok(blocks)
        })
    }

    /// Send a request, retrying rate limits and server errors
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T, NotionError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut request = self.client.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                let bytes = response.bytes().await?;
                return Ok(serde_json::from_slice(&bytes)?);
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt <= self.max_retries {
                let delay = retry_delay(response.headers(), attempt);
                tracing::warn!(
                    "Notion returned {} for {}, retrying in {:?} ({}/{})",
                    status,
                    path,
                    delay,
                    attempt,
                    self.max_retries
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(NotionError::RateLimited(attempt));
            }

            let text = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<ApiErrorBody>(&text).unwrap_or(ApiErrorBody {
                code: String::new(),
                message: text,
            });
            return Err(NotionError::Api {
                status: status.as_u16(),
                code: error.code,
                message: error.message,
            });
        }
    }
}

impl PostSource for NotionClient {
    async fn published_posts(&self) -> Result<Vec<Page>, NotionError> {
        self.query_published_posts().await
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Page>, NotionError> {
        self.find_post_by_slug(slug).await
    }

    async fn page_blocks(&self, page_id: &str) -> Result<Vec<Block>, NotionError> {
        self.block_tree(page_id).await
    }
}

/// Body of the "all published posts" database query
fn published_query(properties: &PropertyNames, page_size: usize, cursor: Option<&str>) -> Value {
    let mut body = json!({
        "page_size": page_size,
        "filter": published_condition(properties),
        "sorts": [
            { "property": properties.date, "direction": "descending" }
        ],
    });
    if let Some(cursor) = cursor {
        body["start_cursor"] = json!(cursor);
    }
    body
}

/// Body of the single-post query
fn slug_query(properties: &PropertyNames, filter: SlugFilter, slug: &str) -> Value {
    let slug_condition = match filter {
        SlugFilter::Formula => json!({
            "property": properties.slug,
            "formula": { "string": { "equals": slug } },
        }),
        SlugFilter::RichText => json!({
            "property": properties.slug,
            "rich_text": { "equals": slug },
        }),
    };
    json!({
        "page_size": 1,
        "filter": { "and": [slug_condition, published_condition(properties)] },
    })
}

fn published_condition(properties: &PropertyNames) -> Value {
    json!({
        "property": properties.published,
        "checkbox": { "equals": true },
    })
}

/// Delay before retry `attempt` (1-based): `Retry-After` when present,
/// otherwise exponential backoff from 500ms
fn retry_delay(headers: &HeaderMap, attempt: u32) -> Duration {
    let from_header = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64);

    let delay = from_header.unwrap_or_else(|| {
        let exp = attempt.saturating_sub(1).min(16);
        Duration::from_millis(500u64 << exp)
    });
    delay.min(MAX_BACKOFF)
}
