//! Topic classification by ordered pattern rules.
//!
//! Topics are tried in declaration order and the first topic with any
//! matching rule wins. Priority is purely positional: a broad rule declared
//! early shadows a narrower one declared later.

use std::fmt;

use regex::Regex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    PriceOil,
    PriceGold,
    Lottery,
    Exchange,
    Weather,
    NewsGlobal,
    NewsDomestic,
    Tarot,
    ImageSearch,
    /// A bare tarot subject such as "ความรัก".
    TarotReading,
    Today,
    Clock,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::PriceOil => "price-oil",
            Topic::PriceGold => "price-gold",
            Topic::Lottery => "lottery",
            Topic::Exchange => "exchange",
            Topic::Weather => "weather",
            Topic::NewsGlobal => "news-global",
            Topic::NewsDomestic => "news-domestic",
            Topic::Tarot => "tarot",
            Topic::ImageSearch => "image-search",
            Topic::TarotReading => "tarot-reading",
            Topic::Today => "today",
            Topic::Clock => "clock",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default rule table, in priority order.
const RULES: &[(Topic, &[&str])] = &[
    (Topic::PriceOil, &[r"ราคาน้ำมัน", r"น้ำมัน.*วันนี้", r"น้ำมันเท่าไหร่", r"ตอนนี้.*น้ำมัน", r"เบนซิน", r"ดีเซล"]),
    (Topic::PriceGold, &[r"ราคาทอง", r"ทอง.*วันนี้", r"ทองขึ้น", r"ทองลง", r"ทองคำแท่ง", r"gold"]),
    (Topic::Lottery, &[r"หวย", r"สลากกินแบ่ง", r"ผล.*หวย", r"ตรวจ.*หวย", r"เลข.*ออก"]),
    (Topic::Exchange, &[r"แลกเงิน", r"อัตราแลกเปลี่ยน", r"ค่าเงิน", r"เรทเงิน", r"exchange"]),
    (Topic::Weather, &[r"อากาศ", r"พยากรณ์อากาศ", r"ฝนตก", r"อุณหภูมิ", r"ฟ้า", r"weather"]),
    (
        Topic::NewsGlobal,
        &[r"ข่าวต่างประเทศ", r"ข่าวจากต่างประเทศ", r"ข่าวทั่วโลก", r"ข่าวเมืองนอก", r"ข่าวโลก", r"international news", r"world news"],
    ),
    (Topic::NewsDomestic, &[r"ข่าว", r"ข่าวด่วน", r"ข่าววันนี้", r"ข่าวเด่น", r"ข่าวล่าสุด", r"อัปเดตข่าว"]),
    (Topic::Tarot, &[r"ดูดวง", r"เปิดไพ่", r"ไพ่ยิปซี", r"ไพ่", r"ทำนาย"]),
    (Topic::ImageSearch, &[r"^ดูรูป", r"^ค้นรูป", r"หารูป", r"ขอรูป", r"รูปภาพ"]),
    (Topic::TarotReading, &[r"^(?:ความรัก|การงาน|การเงิน|สุขภาพ)$"]),
    (Topic::Today, &[r"วันนี้วันอะไร", r"วันอะไรวันนี้"]),
    (Topic::Clock, &[r"กี่โมง", r"เวลากี่โมง"]),
];

/// Ordered topic → patterns table.
pub struct TopicClassifier {
    rules: Vec<(Topic, Vec<Regex>)>,
}

impl TopicClassifier {
    /// Build from `(topic, patterns)` pairs; order is priority.
    pub fn from_rules(rules: &[(Topic, &[&str])]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(topic, patterns)| {
                let compiled = patterns
                    .iter()
                    .map(|p| Regex::new(&format!("(?i){p}")))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((*topic, compiled))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Classify raw input. Trims and case-folds once, then searches.
    pub fn classify(&self, text: &str) -> Option<Topic> {
        let normalized = text.trim().to_lowercase();
        for (topic, patterns) in &self.rules {
            if let Some(pattern) = patterns.iter().find(|p| p.is_match(&normalized)) {
                debug!("Topic '{}' matched by /{}/", topic, pattern.as_str());
                return Some(*topic);
            }
        }
        debug!("No topic matched");
        None
    }
}

impl Default for TopicClassifier {
    fn default() -> Self {
        Self::from_rules(RULES).expect("built-in topic patterns are valid")
    }
}
