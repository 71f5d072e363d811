//! Resilient completion: bounded retries, plus one search-augmented retry
//! when the first usable answer hedges.
//!
//! Each call walks a small state machine:
//!
//! ```text
//! Attempting(n) --ok, confident--------------------> Done(Answered)
//! Attempting(n) --ok, hedging, self-referential----> Done(Answered)
//! Attempting(n) --ok, hedging----------------------> Augmenting --> Done(Answered)
//! Attempting(n) --error, n < max------(sleep)------> Attempting(n + 1)
//! Attempting(n) --error, n = max-------------------> Done(Exhausted)
//! ```
//!
//! Augmentation happens at most once per call. If the search or the fallback
//! model fails, the unaugmented draft is the answer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::chatbot::cleaner::postprocess;
use crate::chatbot::message::{Message, Role};
use crate::chatbot::search::{SearchError, WebSearch, summarize_results};
use crate::openai::{Completion, CompletionParams, LanguageModel};

/// Shown when every attempt failed.
pub const APOLOGY: &str = "⚠️ พี่หลามงงเลย ตอบไม่ได้จริง ๆ จ้า";

/// Hedging or refusal phrases that mark an answer as low-confidence.
const LOW_CONFIDENCE_MARKERS: &[&str] = &[
    "ไม่แน่ใจ",
    "ไม่ทราบ",
    "ไม่รู้",
    "ยังไม่รู้",
    "ไม่สามารถตอบได้",
    "ไม่มีข้อมูล",
    "ขอโทษ",
    "ตอบไม่ได้",
    "หาไม่เจอ",
    "ไม่พบคำตอบ",
    "ไม่สามารถให้ข้อมูลได้",
    "ยังไม่มีข้อมูล",
    "ไม่มีคำตอบที่แน่ชัด",
    "ขอเวลาค้นหาก่อน",
    "ยังไม่มีข้อมูลแน่นอน",
    "ต้องค้นเพิ่มเติม",
    "ไม่สามารถคาดการณ์",
    "คาดการณ์ไม่ได้",
    "เป็นไปไม่ได้ที่จะรู้แน่ชัด",
    "หากมีข้อมูลใหม่จะมีการประกาศ",
    "เป็นเหตุการณ์ที่ไม่สามารถคาดเดาได้",
    "ขึ้นอยู่กับข้อมูลในอนาคต",
    "อาจจะ",
    "น่าจะ",
    "เป็นไปได้ว่า",
    "ไม่มีใครทราบแน่ชัด",
    "ไม่มีแหล่งข่าวยืนยัน",
    "ข้อมูลยังไม่สมบูรณ์",
    "ขออภัย",
    "ขออภัยด้วยครับ",
    "เกรงว่าจะไม่มีข้อมูลในขณะนี้",
    "จากข้อมูลที่มีในตอนนี้",
    "ไม่พบข้อมูลเพิ่มเติม",
    "ไม่มีข้อมูลล่าสุด",
    "ยังไม่มีเหตุการณ์เกิดขึ้นจริง ๆ",
    "ยังไม่สามารถคาดเดาเหตุการณ์ในอนาคตได้",
    "แนะนำให้ติดตามข่าวสาร",
    "แนะนำให้ติดตามข่าว",
    "แนะนำให้ติดตามสื่อมวลชน",
    "ควรติดตามจากหน่วยงานที่เกี่ยวข้อง",
    "ลองตรวจสอบกับกรมอุตุนิยมวิทยา",
    "ตรวจสอบเว็บไซต์ข่าว",
    "ยังไม่สามารถยืนยันได้แน่ชัด",
    "ถ้ามีอะไรเพิ่มเติมที่อยากรู้ บอกได้เลย",
    "i'm not sure",
    "i don't know",
    "as an ai",
];

/// Names the bot answers to. Questions about itself never go to search.
const SELF_NAMES: &[&str] = &["พี่หลาม", "พรี่หลาม", "คุณหลาม", "gpt", "บอท"];

const SEARCH_TOOL_NAME: &str = "web_search";
const SEARCH_SUMMARY_RESULTS: usize = 3;
const FALLBACK_MAX_TOKENS: u32 = 1500;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub model: String,
    pub fallback_model: String,
    /// Total attempts, at least 1.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Trailing messages sent along with search results.
    pub fallback_window: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            fallback_model: "gpt-4o-mini-search-preview".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            fallback_window: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Answered(String),
    Exhausted(String),
}

impl Outcome {
    pub fn text(&self) -> &str {
        match self {
            Outcome::Answered(t) | Outcome::Exhausted(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Outcome::Answered(t) | Outcome::Exhausted(t) => t,
        }
    }
}

enum Phase {
    Attempting(u32),
    /// `attempt` is the attempt that produced the hedging draft.
    Augmenting { draft: String, attempt: u32 },
    Done(Outcome),
}

pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn WebSearch>,
    config: OrchestratorConfig,
}

pub fn is_low_confidence(text: &str) -> bool {
    let lowered = text.to_lowercase();
    LOW_CONFIDENCE_MARKERS.iter().any(|m| lowered.contains(m))
}

pub fn is_self_referential(query: &str) -> bool {
    let lowered = query.to_lowercase();
    SELF_NAMES.iter().any(|n| lowered.contains(n))
}

fn latest_user_query(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

fn log_usage(attempt: u32, phase: &str, model: &str, completion: &Completion) {
    match completion.usage {
        Some(u) => info!(
            attempt,
            phase,
            model,
            prompt_tokens = u.prompt_tokens,
            completion_tokens = u.completion_tokens,
            total_tokens = u.total_tokens,
            "🤖 Completion received"
        ),
        None => info!(attempt, phase, model, "🤖 Completion received"),
    }
}

impl Orchestrator {
    pub fn new(model: Arc<dyn LanguageModel>, search: Arc<dyn WebSearch>, config: OrchestratorConfig) -> Self {
        Self { model, search, config }
    }

    /// Run one completion call to a terminal state. Never fails.
    pub async fn complete(&self, messages: &[Message]) -> Outcome {
        let params = CompletionParams::conversational(&self.config.model);
        let max_retries = self.config.max_retries.max(1);
        let mut augmented = false;
        let mut phase = Phase::Attempting(1);

        loop {
            phase = match phase {
                Phase::Attempting(attempt) => match self.model.complete(messages, &params).await {
                    Ok(completion) => {
                        log_usage(attempt, "primary", &params.model, &completion);
                        self.review(messages, completion.text, attempt, augmented)
                    }
                    Err(e) if attempt < max_retries => {
                        warn!(attempt, model = %params.model, error = %e, "Completion failed, retrying");
                        tokio::time::sleep(self.config.retry_delay).await;
                        Phase::Attempting(attempt + 1)
                    }
                    Err(e) => {
                        warn!(attempt, model = %params.model, error = %e, "Completion attempts exhausted");
                        Phase::Done(Outcome::Exhausted(APOLOGY.to_string()))
                    }
                },
                Phase::Augmenting { draft, attempt } => {
                    augmented = true;
                    let text = self.augment(messages, draft, attempt).await;
                    Phase::Done(Outcome::Answered(postprocess(&text)))
                }
                Phase::Done(outcome) => return outcome,
            };
        }
    }

    fn review(&self, messages: &[Message], text: String, attempt: u32, augmented: bool) -> Phase {
        if augmented || !is_low_confidence(&text) {
            return Phase::Done(Outcome::Answered(postprocess(&text)));
        }
        if is_self_referential(latest_user_query(messages)) {
            info!(reason = "self-referential", "Low-confidence answer kept without search");
            return Phase::Done(Outcome::Answered(postprocess(&text)));
        }
        info!(reason = "low-confidence", "Augmenting answer with web search");
        Phase::Augmenting { draft: text, attempt }
    }

    /// Search for the latest query and re-ask the fallback model with the
    /// results. Any failure returns `draft` unchanged.
    async fn augment(&self, messages: &[Message], draft: String, attempt: u32) -> String {
        let query = latest_user_query(messages);
        let results = match self.search.search(query).await {
            Ok(results) if !results.is_empty() => results,
            Ok(_) => {
                info!(reason = "no-results", "Search returned nothing, keeping draft");
                return draft;
            }
            Err(SearchError::Unavailable) => {
                info!(reason = "search-unavailable", "Search not configured, keeping draft");
                return draft;
            }
            Err(e) => {
                warn!(reason = "search-failed", error = %e, "Search failed, keeping draft");
                return draft;
            }
        };

        let summary = summarize_results(&results, SEARCH_SUMMARY_RESULTS);
        if summary.is_empty() {
            info!(reason = "no-usable-results", "Search results incomplete, keeping draft");
            return draft;
        }
        let start = messages.len().saturating_sub(self.config.fallback_window);
        let mut window = messages[start..].to_vec();
        window.push(Message::tool(SEARCH_TOOL_NAME, summary));
        debug!("Fallback window: {} message(s)", window.len());

        let params = CompletionParams::new(&self.config.fallback_model, FALLBACK_MAX_TOKENS);
        match self.model.complete(&window, &params).await {
            Ok(completion) => {
                log_usage(attempt, "fallback", &params.model, &completion);
                completion.text
            }
            Err(e) => {
                warn!(attempt, reason = "fallback-failed", model = %params.model, error = %e, "Fallback completion failed, keeping draft");
                draft
            }
        }
    }
}
