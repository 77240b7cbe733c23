// NewsData.io client — thin reqwest wrapper over the public REST API.
//
// Every request costs one credit. `collect_news` follows the `nextPage`
// cursor until the credit budget is spent or the API runs out of pages.
// An error status or a transport failure ends the loop; whatever was
// already fetched is kept. The loop only sees the `NewsPageSource` trait,
// so it runs the same against the live client and a scripted one.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Credits spent by a default collection run.
pub const DEFAULT_MAX_CREDITS: usize = 12;

/// Unauthenticated-by-header HTTP client; the key travels as `apikey`.
pub struct NewsDataClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Filters for the `/news` endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsQuery {
    pub language: String,
    pub country: Option<String>,
    pub category: Option<String>,
}

impl NewsQuery {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Self::default()
        }
    }

    /// Query parameters, without the key or page cursor.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("language", self.language.clone())];
        if let Some(country) = &self.country {
            params.push(("country", country.clone()));
        }
        if let Some(category) = &self.category {
            params.push(("category", category.clone()));
        }
        params
    }
}

/// Envelope shared by every endpoint. On error `results` holds
/// `{"message": ..., "code": ...}` instead of a list.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub results: Value,
    #[serde(rename = "totalResults", default)]
    pub total_results: Option<u64>,
    #[serde(rename = "nextPage", default)]
    pub next_page: Option<String>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// The API's own error message, if it sent one.
    pub fn error_message(&self) -> String {
        self.results
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string()
    }

    /// The result list, or empty when `results` is not an array.
    pub fn items(&self) -> &[Value] {
        self.results.as_array().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The flattened record saved to `articles_YYYY-MM-DD.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub article_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub link: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub source_id: Option<String>,
    pub source_url: Option<String>,
    pub creator: Option<Value>,
    pub category: Option<Value>,
    pub language: Option<String>,
    pub country: Option<Value>,
}

impl StoredArticle {
    /// Keep only the stored fields of a raw API result.
    ///
    /// String fields that arrive as something else are stringified so the
    /// file stays loadable; list fields (creator, category, country) are
    /// kept as-is.
    pub fn from_api(raw: &Value) -> Self {
        let text = |key: &str| -> Option<String> {
            match raw.get(key)? {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }
        };
        let any = |key: &str| -> Option<Value> {
            raw.get(key).filter(|v| !v.is_null()).cloned()
        };

        Self {
            article_id: text("article_id"),
            title: text("title"),
            description: text("description"),
            content: text("content"),
            link: text("link"),
            pub_date: text("pubDate"),
            source_id: text("source_id"),
            source_url: text("source_url"),
            creator: any("creator"),
            category: any("category"),
            language: text("language"),
            country: any("country"),
        }
    }
}

/// One entry of the `/sources` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub language: Vec<String>,
}

/// Result of a paginated collection.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub articles: Vec<StoredArticle>,
    pub credits_used: usize,
    /// Why the loop ended early, if it did
    pub stopped_by: Option<String>,
}

impl NewsDataClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("notizie/0.1 (topic-modeling)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// GET an endpoint (`news`, `sources`) and deserialize the body.
    ///
    /// The API reports most failures as HTTP 4xx with a JSON envelope, so
    /// non-success statuses still try to parse it.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, "NewsData GET request");

        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .with_context(|| format!("NewsData request failed: {endpoint}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read NewsData {endpoint} response"))?;

        match serde_json::from_str::<T>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => {
                anyhow::bail!("NewsData {endpoint} returned {status}: {body}")
            }
            Err(e) => Err(e).with_context(|| format!("Failed to deserialize {endpoint} response")),
        }
    }

    /// Collect articles, one credit per page, up to `max_credits`.
    pub async fn fetch_news(&self, query: &NewsQuery, max_credits: usize) -> Result<Collection> {
        collect_news(self, query, max_credits).await
    }

    /// List sources for a language and, optionally, a country.
    pub async fn fetch_sources(
        &self,
        language: &str,
        country: Option<&str>,
    ) -> Result<Vec<NewsSource>> {
        let mut params = vec![("language", language.to_string())];
        if let Some(country) = country {
            params.push(("country", country.to_string()));
        }

        let response: ApiResponse = self.get("sources", &params).await?;
        if !response.is_success() {
            anyhow::bail!("NewsData sources error: {}", response.error_message());
        }

        serde_json::from_value(response.results).context("Failed to parse source list")
    }
}

/// One page of `/news` results. The live implementation is `NewsDataClient`.
#[async_trait]
pub trait NewsPageSource: Send + Sync {
    /// Fetch a page for `params` (the query plus, after the first page, the
    /// `page` cursor).
    async fn fetch_page(&self, params: &[(&str, String)]) -> Result<ApiResponse>;
}

#[async_trait]
impl NewsPageSource for NewsDataClient {
    async fn fetch_page(&self, params: &[(&str, String)]) -> Result<ApiResponse> {
        self.get("news", params).await
    }
}

/// Follow the page cursor, spending one credit per successful page.
///
/// Never fails: an error ends the loop, the reason lands in `stopped_by`
/// and the pages fetched so far are returned.
pub async fn collect_news(
    source: &dyn NewsPageSource,
    query: &NewsQuery,
    max_credits: usize,
) -> Result<Collection> {
    let mut collection = Collection::default();
    let mut next_page: Option<String> = None;

    while collection.credits_used < max_credits {
        let mut params = query.params();
        if let Some(page) = &next_page {
            params.push(("page", page.clone()));
        }

        info!(
            credit = collection.credits_used + 1,
            max_credits, "Fetching news page"
        );

        let response = match source.fetch_page(&params).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "News request failed, keeping what was fetched");
                collection.stopped_by = Some(e.to_string());
                break;
            }
        };

        if !response.is_success() {
            let message = response.error_message();
            warn!(api_message = %message, "News API returned an error");
            collection.stopped_by = Some(message);
            break;
        }

        collection.credits_used += 1;
        collection
            .articles
            .extend(response.items().iter().map(StoredArticle::from_api));
        info!(
            fetched = response.items().len(),
            total = collection.articles.len(),
            "Fetched news page"
        );

        next_page = response.next_page.filter(|p| !p.is_empty());
        if next_page.is_none() {
            break;
        }
    }

    info!(credits_used = collection.credits_used, "News collection finished");
    Ok(collection)
}
