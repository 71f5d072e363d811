//! Direct-answer data providers, one per lookup topic.

use std::fmt;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsScope {
    Domestic,
    Global,
}

impl NewsScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsScope::Domestic => "domestic",
            NewsScope::Global => "global",
        }
    }
}

#[derive(Debug)]
pub enum LookupError {
    /// Provider credentials not configured.
    Unavailable,
    Http(String),
    Parse(String),
    /// The provider answered but had nothing usable.
    NotFound,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Unavailable => write!(f, "provider is not configured"),
            LookupError::Http(e) => write!(f, "HTTP error: {e}"),
            LookupError::Parse(e) => write!(f, "parse error: {e}"),
            LookupError::NotFound => write!(f, "no data"),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            LookupError::Parse(e.to_string())
        } else {
            LookupError::Http(e.to_string())
        }
    }
}

/// Every method returns ready-to-display text.
#[async_trait]
pub trait DataLookup: Send + Sync {
    async fn oil_price(&self) -> Result<String, LookupError>;
    async fn gold_price(&self) -> Result<String, LookupError>;
    async fn exchange_rates(&self) -> Result<String, LookupError>;
    async fn lottery(&self) -> Result<String, LookupError>;
    /// `city` is an English name as understood by the weather service.
    async fn weather(&self, city: &str) -> Result<String, LookupError>;
    async fn news(&self, scope: NewsScope) -> Result<String, LookupError>;
    /// Three-card reading for one subject (ความรัก, การงาน, ...).
    async fn tarot(&self, subject: &str) -> Result<String, LookupError>;
    /// URL of an image matching `query`.
    async fn image(&self, query: &str) -> Result<String, LookupError>;
}
