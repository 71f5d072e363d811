//! In-process fakes for the collaborator traits.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::chatbot::lookup::{DataLookup, LookupError, NewsScope};
use crate::chatbot::message::Message;
use crate::chatbot::search::{SearchError, SearchResult, WebSearch};
use crate::openai::{Completion, CompletionParams, Error, LanguageModel, TokenUsage};

/// Replays a fixed script of replies; records every request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, Error>>>,
    calls: Mutex<Vec<(Vec<Message>, CompletionParams)>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, Error>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Vec<Message>, CompletionParams)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, messages: &[Message], params: &CompletionParams) -> Result<Completion, Error> {
        self.calls.lock().unwrap().push((messages.to_vec(), params.clone()));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Http("script exhausted".into())));
        reply.map(|text| Completion {
            text,
            usage: Some(TokenUsage { prompt_tokens: 10, completion_tokens: 5, total_tokens: 15 }),
        })
    }
}

/// Returns `count` numbered results, or `Unavailable` when not configured.
pub struct FakeSearch {
    available: bool,
    count: usize,
    titled: bool,
    image: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn with_results(count: usize) -> Self {
        Self { available: true, count, titled: true, image: None, queries: Mutex::new(Vec::new()) }
    }

    /// Results with snippets and links but blank titles.
    pub fn with_untitled_results(count: usize) -> Self {
        Self { titled: false, ..Self::with_results(count) }
    }

    pub fn unavailable() -> Self {
        Self { available: false, ..Self::with_results(0) }
    }

    pub fn with_image(url: &str) -> Self {
        Self { image: Some(url.to_string()), ..Self::with_results(0) }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if !self.available {
            return Err(SearchError::Unavailable);
        }
        Ok((1..=self.count)
            .map(|i| SearchResult {
                title: if self.titled { format!("title {i}") } else { String::new() },
                snippet: format!("snippet {i}"),
                link: format!("https://example.com/{i}"),
            })
            .collect())
    }

    async fn search_image(&self, query: &str) -> Result<Option<String>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if !self.available {
            return Err(SearchError::Unavailable);
        }
        Ok(self.image.clone())
    }
}

/// Answers every lookup with `"<provider>:<argument>"` and records the call.
#[derive(Default)]
pub struct RecordingLookups {
    calls: Mutex<Vec<String>>,
    failing: bool,
}

impl RecordingLookups {
    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: String) -> Result<String, LookupError> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failing {
            return Err(LookupError::Http("offline".into()));
        }
        Ok(call)
    }
}

#[async_trait]
impl DataLookup for RecordingLookups {
    async fn oil_price(&self) -> Result<String, LookupError> {
        self.answer("oil".into())
    }

    async fn gold_price(&self) -> Result<String, LookupError> {
        self.answer("gold".into())
    }

    async fn exchange_rates(&self) -> Result<String, LookupError> {
        self.answer("exchange".into())
    }

    async fn lottery(&self) -> Result<String, LookupError> {
        self.answer("lottery".into())
    }

    async fn weather(&self, city: &str) -> Result<String, LookupError> {
        self.answer(format!("weather:{city}"))
    }

    async fn news(&self, scope: NewsScope) -> Result<String, LookupError> {
        self.answer(format!("news:{}", scope.as_str()))
    }

    async fn tarot(&self, subject: &str) -> Result<String, LookupError> {
        self.answer(format!("tarot:{subject}"))
    }

    async fn image(&self, query: &str) -> Result<String, LookupError> {
        self.answer(format!("https://img.example/{query}.jpg"))
    }
}
