//! Conversational style: inferred from keywords, persisted per user.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::chatbot::database::{Database, SESSION_TTL_SECS, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Formal,
    Troll,
    Teacher,
    Neutral,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Formal => "formal",
            Style::Troll => "troll",
            Style::Teacher => "teacher",
            Style::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "formal" => Some(Style::Formal),
            "troll" => Some(Style::Troll),
            "teacher" => Some(Style::Teacher),
            "neutral" => Some(Style::Neutral),
            _ => None,
        }
    }

    /// Persona modifier appended to the system prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Style::Formal => {
                "พี่หลามยังคุยแบบกันเอง แต่ใช้ภาษาสุภาพขึ้น เคารพคนฟัง เหมาะกับคนที่ชอบความเรียบร้อย ไม่หยาบ ไม่แซะ"
            }
            Style::Troll => "พี่หลามสายกวน มุกมาเต็ม ฮาแบบเนียน ๆ เหมาะกับคนชอบคลายเครียด",
            Style::Teacher => {
                "พี่หลามโหมดครูใจดี อธิบายช้า ๆ ทีละขั้น ยกตัวอย่างง่าย ๆ ให้กำลังใจ ไม่ทำให้คนฟังรู้สึกแย่ที่ยังไม่เข้าใจ"
            }
            Style::Neutral => "พี่หลามเป็นวัยรุ่นไทยคนนึง คุยง่าย สบาย ๆ มีมุกบ้าง เข้าใจเร็ว ตรงประเด็น",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored values that mean "keep inferring".
pub const WILDCARD_STYLES: &[&str] = &["auto", "multi"];

/// Keyword buckets in tie-break order.
const STYLE_KEYWORDS: &[(Style, &[&str])] = &[
    (Style::Formal, &["ครับ", "ค่ะ", "กรุณา", "รบกวน", "ขอบพระคุณ", "สอบถาม", "เรียนถาม"]),
    (Style::Troll, &["555", "ฮา", "กวน", "เกรียน", "มุก", "แซว", "lol", "ขำ"]),
    (Style::Teacher, &["อธิบาย", "สอน", "หมายความว่า", "ยกตัวอย่าง", "explain", "ทำไม"]),
];

const FATIGUE_CUES: &[&str] = &["เหนื่อย", "งง", "ไม่เข้าใจ", "ปวดหัว", "มึน", "ท้อ", "tired", "confused"];
const EXPLAIN_CUES: &[&str] = &["อธิบาย", "สอน", "explain"];

/// Infer a style from text alone.
pub fn infer_style(text: &str) -> Style {
    let lowered = text.to_lowercase();

    let tired = FATIGUE_CUES.iter().any(|k| lowered.contains(k));
    let wants_explanation = EXPLAIN_CUES.iter().any(|k| lowered.contains(k));
    if tired && wants_explanation {
        return Style::Teacher;
    }

    let mut best = (Style::Neutral, 0usize);
    for (style, words) in STYLE_KEYWORDS {
        let score = words.iter().filter(|k| lowered.contains(*k)).count();
        // Strictly greater keeps the first-declared style on ties.
        if score > best.1 {
            best = (*style, score);
        }
    }
    best.0
}

/// Resolves and persists each user's style.
pub struct ToneResolver {
    database: Arc<Database>,
}

impl ToneResolver {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }

    /// A persisted, non-wildcard style is sticky. Otherwise infer, and
    /// persist the inference only if nothing is stored yet.
    pub fn resolve(&self, user_id: i64, text: &str) -> Style {
        let stored = self.database.get_session(user_id, keys::STYLE).unwrap_or_else(|e| {
            warn!("Style lookup failed for user {}: {}", user_id, e);
            None
        });

        if let Some(style) = stored
            .as_deref()
            .filter(|s| !WILDCARD_STYLES.contains(s))
            .and_then(Style::parse)
        {
            return style;
        }

        let style = infer_style(text);
        debug!("Inferred style '{}' for user {}", style, user_id);

        if stored.is_none() {
            match self.database.set_session_if_absent(user_id, keys::STYLE, style.as_str(), SESSION_TTL_SECS) {
                Ok(true) => debug!("Persisted style '{}' for user {}", style, user_id),
                Ok(false) => {}
                Err(e) => warn!("Failed to persist style for user {}: {}", user_id, e),
            }
        }
        style
    }

    /// Explicitly overwrite the stored style (`auto`/`multi` included).
    pub fn set(&self, user_id: i64, value: &str) -> Result<(), String> {
        let value = value.trim().to_lowercase();
        if Style::parse(&value).is_none() && !WILDCARD_STYLES.contains(&value.as_str()) {
            return Err(format!("unknown style '{value}'"));
        }
        self.database
            .set_session(user_id, keys::STYLE, &value, SESSION_TTL_SECS)
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ToneResolver {
        ToneResolver::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_infer_neutral_by_default() {
        assert_eq!(infer_style("สวัสดี"), Style::Neutral);
        assert_eq!(infer_style(""), Style::Neutral);
    }

    #[test]
    fn test_infer_highest_score() {
        assert_eq!(infer_style("555 มุกนี้ฮามาก"), Style::Troll);
        assert_eq!(infer_style("รบกวนสอบถามหน่อยครับ"), Style::Formal);
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        // One formal keyword, one troll keyword.
        assert_eq!(infer_style("ครับ 555"), Style::Formal);
    }

    #[test]
    fn test_fatigue_plus_explain_forces_teacher() {
        // Formal keywords outscore teacher ones, but the override wins.
        assert_eq!(infer_style("งงมากครับ รบกวนกรุณาอธิบายอีกที"), Style::Teacher);
        // Explain alone goes through normal scoring.
        assert_eq!(infer_style("รบกวนกรุณาอธิบายครับ"), Style::Formal);
    }

    #[test]
    fn test_persisted_style_is_sticky() {
        let r = resolver();
        let first = r.resolve(1, "555 ขำมาก");
        let second = r.resolve(1, "รบกวนสอบถามครับ");
        assert_eq!(first, Style::Troll);
        assert_eq!(second, Style::Troll);
    }

    #[test]
    fn test_wildcard_keeps_inferring_without_overwrite() {
        let r = resolver();
        r.set(1, "auto").unwrap();
        assert_eq!(r.resolve(1, "555"), Style::Troll);
        assert_eq!(r.resolve(1, "รบกวนครับ"), Style::Formal);
        assert_eq!(
            r.database.get_session(1, keys::STYLE).unwrap().as_deref(),
            Some("auto")
        );
    }

    #[test]
    fn test_explicit_set_overrides() {
        let r = resolver();
        r.resolve(1, "555");
        r.set(1, "teacher").unwrap();
        assert_eq!(r.resolve(1, "555"), Style::Teacher);
        assert!(r.set(1, "pirate").is_err());
    }
}
