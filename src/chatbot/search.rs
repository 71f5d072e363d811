//! Web search collaborator (Google Custom Search).

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug)]
pub enum SearchError {
    /// Credentials not configured.
    Unavailable,
    Http(String),
    Parse(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Unavailable => write!(f, "search is not configured"),
            SearchError::Http(e) => write!(f, "search HTTP error: {e}"),
            SearchError::Parse(e) => write!(f, "search parse error: {e}"),
        }
    }
}

impl std::error::Error for SearchError {}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Ordered web results for a query.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;

    /// First direct image link for a query, if any.
    async fn search_image(&self, query: &str) -> Result<Option<String>, SearchError>;
}

impl SearchResult {
    /// Title, snippet and link all present.
    fn is_complete(&self) -> bool {
        [&self.title, &self.snippet, &self.link].iter().all(|s| !s.trim().is_empty())
    }
}

/// Numbered digest of the first `limit` complete results.
pub fn summarize_results(results: &[SearchResult], limit: usize) -> String {
    results
        .iter()
        .filter(|r| r.is_complete())
        .take(limit)
        .enumerate()
        .map(|(i, r)| format!("{}. **{}**\n{}\n<{}>", i + 1, r.title.trim(), r.snippet.trim(), r.link.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn is_image_link(link: &str) -> bool {
    let path = link.split(['?', '#']).next().unwrap_or(link).to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

pub struct GoogleSearch {
    credentials: Option<(String, String)>,
    http: reqwest::Client,
}

impl GoogleSearch {
    /// Both the API key and the engine id are needed; otherwise every call
    /// reports `Unavailable`.
    pub fn new(api_key: Option<String>, cse_id: Option<String>) -> Self {
        Self {
            credentials: api_key.zip(cse_id),
            http: reqwest::Client::new(),
        }
    }

    async fn query(&self, query: &str, extra: &[(&str, &str)]) -> Result<Vec<SearchResult>, SearchError> {
        let (key, cx) = self.credentials.as_ref().ok_or(SearchError::Unavailable)?;
        let mut params: Vec<(&str, &str)> = vec![("key", key.as_str()), ("cx", cx.as_str()), ("q", query)];
        params.extend_from_slice(extra);

        let response = self
            .http
            .get(ENDPOINT)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Http(response.status().to_string()));
        }

        let body: ApiResponse = response.json().await.map_err(|e| SearchError::Parse(e.to_string()))?;
        debug!("Search '{}' returned {} item(s)", query, body.items.len());
        Ok(body.items)
    }
}

#[async_trait]
impl WebSearch for GoogleSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.query(query, &[("num", "5")]).await
    }

    async fn search_image(&self, query: &str) -> Result<Option<String>, SearchError> {
        let items = self.query(query, &[("searchType", "image"), ("num", "5"), ("safe", "active")]).await?;
        Ok(items.into_iter().map(|r| r.link).find(|l| is_image_link(l)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(i: usize) -> SearchResult {
        SearchResult {
            title: format!("title {i}"),
            snippet: format!("snippet {i}"),
            link: format!("https://example.com/{i}"),
        }
    }

    #[test]
    fn test_summary_is_bounded() {
        let results: Vec<_> = (1..=5).map(result).collect();
        let summary = summarize_results(&results, 3);
        assert!(summary.starts_with("1. **title 1**\nsnippet 1\n<https://example.com/1>"));
        assert!(summary.contains("3. **title 3**"));
        assert!(!summary.contains("title 4"));
    }

    #[test]
    fn test_summary_skips_incomplete_results() {
        let mut results: Vec<_> = (1..=4).map(result).collect();
        results[0].title = String::new();
        results[1].link = "  ".into();
        let summary = summarize_results(&results, 3);
        assert!(summary.starts_with("1. **title 3**"));
        assert!(summary.contains("2. **title 4**"));
        assert!(!summary.contains("****"));
        assert!(!summary.contains("<>"));
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(summarize_results(&[], 3), "");
    }

    #[test]
    fn test_image_link_detection() {
        assert!(is_image_link("https://a.b/cat.JPG"));
        assert!(is_image_link("https://a.b/cat.png?size=large"));
        assert!(!is_image_link("https://a.b/gallery"));
    }

    #[test]
    fn test_items_missing_fields_decode() {
        let body: ApiResponse = serde_json::from_str(r#"{"items": [{"link": "https://x"}]}"#).unwrap();
        assert_eq!(body.items[0].title, "");
        let empty: ApiResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.items.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_unavailable() {
        let search = GoogleSearch::new(Some("key".into()), None);
        assert!(matches!(search.search("x").await, Err(SearchError::Unavailable)));
        assert!(matches!(search.search_image("x").await, Err(SearchError::Unavailable)));
    }
}
