//! HTTP-backed implementations of [`DataLookup`].

pub mod lottery;
pub mod news;
pub mod prices;
pub mod tarot;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::chatbot::localize;
use crate::chatbot::lookup::{DataLookup, LookupError, NewsScope};
use crate::chatbot::search::{SearchError, WebSearch};
use crate::openai::{CompletionParams, LanguageModel};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TAROT_SUMMARY_MAX_TOKENS: u32 = 400;

pub struct HttpLookups {
    http: reqwest::Client,
    openweather_api_key: Option<String>,
    search: Arc<dyn WebSearch>,
    model: Arc<dyn LanguageModel>,
    model_name: String,
}

impl HttpLookups {
    pub fn new(
        openweather_api_key: Option<String>,
        search: Arc<dyn WebSearch>,
        model: Arc<dyn LanguageModel>,
        model_name: String,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            openweather_api_key,
            search,
            model,
            model_name,
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, LookupError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Http(response.status().to_string()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl DataLookup for HttpLookups {
    async fn oil_price(&self) -> Result<String, LookupError> {
        let body = self.get_text(prices::OIL_URL).await?;
        prices::format_oil(&body, &localize::now_in(None))
    }

    async fn gold_price(&self) -> Result<String, LookupError> {
        let body = self.get_text(prices::GOLD_URL).await?;
        prices::format_gold(&body, &localize::now_in(None))
    }

    async fn exchange_rates(&self) -> Result<String, LookupError> {
        let body = self.get_text(prices::EXCHANGE_URL).await?;
        prices::format_exchange(&body)
    }

    async fn lottery(&self) -> Result<String, LookupError> {
        let body = self.get_text(lottery::LOTTERY_URL).await?;
        lottery::format_lottery(&body)
    }

    async fn weather(&self, city: &str) -> Result<String, LookupError> {
        let key = self.openweather_api_key.as_deref().ok_or(LookupError::Unavailable)?;
        let response = self
            .http
            .get(weather::WEATHER_URL)
            .query(&[("q", city), ("appid", key), ("units", "metric"), ("lang", "th")])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }
        if !response.status().is_success() {
            return Err(LookupError::Http(response.status().to_string()));
        }
        let body = response.text().await?;
        weather::format_weather(city, &body)
    }

    async fn news(&self, scope: NewsScope) -> Result<String, LookupError> {
        let body = self.get_text(&news::feed_url(scope)).await?;
        news::format_news(scope, &body)
    }

    async fn tarot(&self, subject: &str) -> Result<String, LookupError> {
        let draws = tarot::draw_cards(&mut rand::thread_rng(), tarot::CARDS_PER_READING);
        let messages = tarot::summary_messages(subject, &draws);
        let params = CompletionParams::new(&self.model_name, TAROT_SUMMARY_MAX_TOKENS);

        let summary = match self.model.complete(&messages, &params).await {
            Ok(completion) => Some(completion.text),
            Err(e) => {
                warn!("Tarot summary failed, sending cards only: {}", e);
                None
            }
        };
        Ok(tarot::format_reading(subject, &draws, summary.as_deref()))
    }

    async fn image(&self, query: &str) -> Result<String, LookupError> {
        match self.search.search_image(query).await {
            Ok(Some(url)) => {
                debug!("Image for '{}': {}", query, url);
                Ok(url)
            }
            Ok(None) => Err(LookupError::NotFound),
            Err(SearchError::Unavailable) => Err(LookupError::Unavailable),
            Err(SearchError::Http(e)) => Err(LookupError::Http(e)),
            Err(SearchError::Parse(e)) => Err(LookupError::Parse(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::testing::{FakeSearch, ScriptedModel};
    use crate::openai::Error;

    fn lookups(model: Arc<ScriptedModel>, search: Arc<FakeSearch>) -> HttpLookups {
        HttpLookups::new(None, search, model, "gpt-4o-mini".into())
    }

    #[tokio::test]
    async fn test_weather_without_key_is_unavailable() {
        let l = lookups(Arc::new(ScriptedModel::new(vec![])), Arc::new(FakeSearch::with_results(0)));
        assert!(matches!(l.weather("Bangkok").await, Err(LookupError::Unavailable)));
    }

    #[tokio::test]
    async fn test_tarot_includes_model_summary() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("ความรักกำลังไปได้ดี".into())]));
        let l = lookups(model.clone(), Arc::new(FakeSearch::with_results(0)));
        let text = l.tarot("ความรัก").await.unwrap();
        assert_eq!(text.matches("🔹").count(), 3);
        assert!(text.ends_with("ความรักกำลังไปได้ดี"));
        assert_eq!(model.calls()[0].1.max_tokens, TAROT_SUMMARY_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_tarot_survives_model_failure() {
        let model = Arc::new(ScriptedModel::new(vec![Err(Error::Http("down".into()))]));
        let l = lookups(model, Arc::new(FakeSearch::with_results(0)));
        let text = l.tarot("การเงิน").await.unwrap();
        assert_eq!(text.matches("🔹").count(), 3);
        assert!(!text.contains("สรุปคำทำนาย"));
    }

    #[tokio::test]
    async fn test_image_maps_search_outcomes() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let found = lookups(model.clone(), Arc::new(FakeSearch::with_image("https://img/cat.jpg")));
        assert_eq!(found.image("แมว").await.unwrap(), "https://img/cat.jpg");

        let none = lookups(model.clone(), Arc::new(FakeSearch::with_results(0)));
        assert!(matches!(none.image("แมว").await, Err(LookupError::NotFound)));

        let off = lookups(model, Arc::new(FakeSearch::unavailable()));
        assert!(matches!(off.image("แมว").await, Err(LookupError::Unavailable)));
    }
}
