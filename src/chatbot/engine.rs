//! Chatbot engine - routes each message to a data lookup or a completion.

use std::sync::{Arc, LazyLock};

use chrono::DateTime;
use chrono_tz::Tz;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::chatbot::cleaner::{clean_output_text, clean_url};
use crate::chatbot::context::{ContextAssembler, ContextConfig};
use crate::chatbot::database::{Database, IMAGE_QUERY_TTL_SECS, SESSION_TTL_SECS, keys};
use crate::chatbot::localize::{self, thai_datetime};
use crate::chatbot::lookup::{DataLookup, LookupError, NewsScope};
use crate::chatbot::message::Turn;
use crate::chatbot::orchestrator::{APOLOGY, Orchestrator, OrchestratorConfig, Outcome};
use crate::chatbot::providers::tarot;
use crate::chatbot::search::WebSearch;
use crate::chatbot::tone::{Style, ToneResolver};
use crate::classifier::{Topic, TopicClassifier};
use crate::openai::LanguageModel;

const BASE_PERSONA: &str = "คุณคือ 'พี่หลาม' หรือ 'พรี่หลาม' เป็นบอทผู้ช่วยที่พูดจาเป็นกันเองเหมือนมนุษย์ไทย \
ใช้ภาษาพูดธรรมดา ไม่เป็นทางการมาก มีอารมณ์ขันบ้างแต่ไม่เกรียน \
ตอบคำถามด้วยความจริงใจ เข้าใจง่าย และไม่แสดงตัวว่าเป็น AI เว้นแต่มีคนถามตรง ๆ\n\n\
หากมีคำถามเกี่ยวกับตัวคุณ เช่น ใครสร้างพี่หลาม หรือพี่หลามทำงานยังไง \
ให้ตอบสั้น ๆ แบบมีบุคลิก ไม่ต้องบอกว่าเป็นโมเดลภาษา";

const WEATHER_HINT: &str = "📍 พิมพ์ว่า `อากาศที่ เชียงใหม่`";
const IMAGE_HINT: &str = "📷 พิมพ์ว่า `ดูรูป: แมว` ลองดูสิ";
const LOOKUP_FAILED: &str = "❌ พี่หลามดึงข้อมูลไม่ได้ตอนนี้ ลองใหม่อีกทีนะ";
const LOOKUP_UNAVAILABLE: &str = "❌ ยังไม่ได้ตั้งค่าบริการนี้ ใช้งานไม่ได้ตอนนี้";
const LOOKUP_EMPTY: &str = "❌ ไม่พบข้อมูลในตอนนี้";

static IMAGE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:ดูรูป|ค้นรูป|หารูป|ขอรูป)[:,\s]*").unwrap());

/// Chatbot configuration.
#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    /// Replaces the built-in persona text.
    pub personality: Option<String>,
    pub context: ContextConfig,
    pub orchestrator: OrchestratorConfig,
    /// IANA zone used when the user has not picked one.
    pub default_timezone: Tz,
    /// Store the apology as the turn's response when no answer was produced.
    pub store_failed_turns: bool,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            personality: None,
            context: ContextConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            default_timezone: localize::DEFAULT_TIMEZONE,
            store_failed_turns: true,
        }
    }
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Lookup(Topic),
    Completion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Photo { url: String, caption: String },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(t) => t,
            Reply::Photo { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub route: Route,
    pub reply: Reply,
}

/// The chatbot engine.
pub struct ChatbotEngine {
    config: ChatbotConfig,
    database: Arc<Database>,
    classifier: TopicClassifier,
    tone: ToneResolver,
    context: ContextAssembler,
    orchestrator: Orchestrator,
    lookups: Arc<dyn DataLookup>,
}

impl ChatbotEngine {
    pub fn new(
        config: ChatbotConfig,
        database: Arc<Database>,
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn WebSearch>,
        lookups: Arc<dyn DataLookup>,
    ) -> Self {
        Self {
            classifier: TopicClassifier::default(),
            tone: ToneResolver::new(database.clone()),
            context: ContextAssembler::new(database.clone(), config.context.clone()),
            orchestrator: Orchestrator::new(model, search, config.orchestrator.clone()),
            config,
            database,
            lookups,
        }
    }

    /// Handle one inbound text. `None` for blank input.
    pub async fn handle_message(&self, user_id: i64, text: &str) -> Option<Response> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        match self.classifier.classify(text) {
            Some(topic) => {
                info!("📨 User {}: lookup '{}'", user_id, topic);
                let reply = self.lookup(user_id, topic, text).await;
                Some(Response { route: Route::Lookup(topic), reply })
            }
            None => {
                info!("📨 User {}: completion", user_id);
                let reply = self.complete(user_id, text).await;
                Some(Response { route: Route::Completion, reply: Reply::Text(reply) })
            }
        }
    }

    async fn lookup(&self, user_id: i64, topic: Topic, text: &str) -> Reply {
        let result = match topic {
            Topic::PriceOil => self.lookups.oil_price().await,
            Topic::PriceGold => self.lookups.gold_price().await,
            Topic::Exchange => self.lookups.exchange_rates().await,
            Topic::Lottery => self.lookups.lottery().await,
            Topic::NewsDomestic => self.lookups.news(NewsScope::Domestic).await,
            Topic::NewsGlobal => self.lookups.news(NewsScope::Global).await,
            Topic::Weather => match localize::extract_city(&text.to_lowercase()) {
                Some(city) => self.lookups.weather(&city).await,
                None => Ok(WEATHER_HINT.to_string()),
            },
            Topic::Tarot => Ok(tarot::SUBJECT_PROMPT.to_string()),
            Topic::TarotReading => self.lookups.tarot(&text.to_lowercase()).await,
            Topic::ImageSearch => return self.image(user_id, text).await,
            Topic::Today => Ok(format!("📅 วันนี้คือ {}", thai_datetime(&self.now_for(user_id)))),
            Topic::Clock => Ok(format!("🕒 ขณะนี้คือ {}", thai_datetime(&self.now_for(user_id)))),
        };

        let text = result.unwrap_or_else(|e| {
            warn!("Lookup '{}' failed for user {}: {}", topic, user_id, e);
            lookup_failure_text(&e).to_string()
        });
        Reply::Text(clean_output_text(&text))
    }

    /// Image search with a short per-user memory of the last query.
    async fn image(&self, user_id: i64, text: &str) -> Reply {
        let mut query = IMAGE_PREFIX.replace(&text.to_lowercase(), "").trim().to_string();
        if query.is_empty() {
            query = self
                .database
                .get_session(user_id, keys::LAST_IMAGE_QUERY)
                .unwrap_or_else(|e| {
                    warn!("Image memory unavailable for user {}: {}", user_id, e);
                    None
                })
                .unwrap_or_default();
        }
        if query.is_empty() {
            return Reply::Text(IMAGE_HINT.to_string());
        }

        if let Err(e) = self
            .database
            .set_session(user_id, keys::LAST_IMAGE_QUERY, &query, IMAGE_QUERY_TTL_SECS)
        {
            warn!("Failed to remember image query for user {}: {}", user_id, e);
        }

        match self.lookups.image(&query).await {
            Ok(url) => Reply::Photo { url: clean_url(&url), caption: query },
            Err(LookupError::NotFound) => Reply::Text(format!("😿 ไม่พบรูปเกี่ยวกับ “{query}”")),
            Err(e) => {
                warn!("Image lookup failed for user {}: {}", user_id, e);
                Reply::Text(lookup_failure_text(&e).to_string())
            }
        }
    }

    /// Tone, context, orchestrated completion, then persist the turn.
    async fn complete(&self, user_id: i64, text: &str) -> String {
        let style = self.tone.resolve(user_id, text);
        let zone = self.timezone_for(user_id);
        let now = chrono::Utc::now().with_timezone(&zone);
        let prompt = system_prompt(self.config.personality.as_deref(), style, zone, &now);

        let messages = self.context.assemble(user_id, text, &prompt);
        debug!("Context for user {}: {} message(s), style '{}'", user_id, messages.len(), style);

        let (reply, answered) = match self.orchestrator.complete(&messages).await {
            Outcome::Answered(t) if !t.trim().is_empty() => (t, true),
            Outcome::Answered(_) => {
                warn!("❌ Model returned nothing for user {}", user_id);
                (APOLOGY.to_string(), false)
            }
            Outcome::Exhausted(t) => (t, false),
        };

        if answered || self.config.store_failed_turns {
            if let Err(e) = self.database.append(user_id, &Turn::new(text, reply.as_str())) {
                warn!("Failed to store turn for user {}: {}", user_id, e);
            }
        } else {
            debug!("Not storing failed turn for user {}", user_id);
        }
        reply
    }

    fn timezone_for(&self, user_id: i64) -> Tz {
        match self.database.get_session(user_id, keys::TIMEZONE) {
            Ok(Some(name)) => localize::parse_timezone(&name).unwrap_or(self.config.default_timezone),
            Ok(None) => self.config.default_timezone,
            Err(e) => {
                warn!("Timezone lookup failed for user {}: {}", user_id, e);
                self.config.default_timezone
            }
        }
    }

    fn now_for(&self, user_id: i64) -> DateTime<Tz> {
        chrono::Utc::now().with_timezone(&self.timezone_for(user_id))
    }

    /// Explicitly set a user's style (`auto`/`multi` resume inference).
    pub fn set_style(&self, user_id: i64, value: &str) -> Result<(), String> {
        self.tone.set(user_id, value)?;
        info!("🎭 User {} style set to '{}'", user_id, value.trim());
        Ok(())
    }

    /// Set a user's timezone after validating the IANA name.
    pub fn set_timezone(&self, user_id: i64, name: &str) -> Result<Tz, String> {
        let zone = localize::parse_timezone(name).ok_or_else(|| format!("unknown timezone '{}'", name.trim()))?;
        self.database
            .set_session(user_id, keys::TIMEZONE, zone.name(), SESSION_TTL_SECS)
            .map_err(|e| e.to_string())?;
        info!("🌏 User {} timezone set to {}", user_id, zone.name());
        Ok(zone)
    }
}

fn lookup_failure_text(e: &LookupError) -> &'static str {
    match e {
        LookupError::Unavailable => LOOKUP_UNAVAILABLE,
        LookupError::NotFound => LOOKUP_EMPTY,
        LookupError::Http(_) | LookupError::Parse(_) => LOOKUP_FAILED,
    }
}

/// Persona, style modifier and the user's local time.
pub fn system_prompt(personality: Option<&str>, style: Style, zone: Tz, now: &DateTime<Tz>) -> String {
    let persona = personality.unwrap_or(BASE_PERSONA);
    format!(
        "{persona}\n\n{}\n\n⏰ timezone: {}\n🕒 {}",
        style.instruction(),
        zone.name(),
        thai_datetime(now)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_prompt_parts() {
        let zone = chrono_tz::Asia::Tokyo;
        let now = zone.with_ymd_and_hms(2024, 1, 1, 9, 5, 0).unwrap();
        let prompt = system_prompt(None, Style::Troll, zone, &now);
        assert!(prompt.starts_with("คุณคือ 'พี่หลาม'"));
        assert!(prompt.contains(Style::Troll.instruction()));
        assert!(prompt.contains("⏰ timezone: Asia/Tokyo"));
        assert!(prompt.ends_with("🕒 วันจันทร์ที่ 1 มกราคม 2567 เวลา 09:05 น."));
    }

    #[test]
    fn test_custom_personality() {
        let zone = localize::DEFAULT_TIMEZONE;
        let now = zone.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let prompt = system_prompt(Some("You are a pirate."), Style::Neutral, zone, &now);
        assert!(prompt.starts_with("You are a pirate."));
        assert!(!prompt.contains("พี่หลาม'"));
    }

    #[test]
    fn test_image_prefix() {
        assert_eq!(IMAGE_PREFIX.replace("ดูรูป: แมว", ""), "แมว");
        assert_eq!(IMAGE_PREFIX.replace("ขอรูปหมา", ""), "หมา");
        assert_eq!(IMAGE_PREFIX.replace("ดูรูป", ""), "");
    }

    #[test]
    fn test_failure_text_hides_details() {
        let text = lookup_failure_text(&LookupError::Http("secret 500 body".into()));
        assert!(!text.contains("secret"));
    }
}
