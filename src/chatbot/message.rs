//! Model-facing message types and stored conversation turns.

use serde::{Deserialize, Serialize};

/// Who authored a message in the assembled context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One entry of the ordered sequence sent to the language model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Function name for tool results.
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into(), name: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), name: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), name: None }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self { role: Role::Tool, content: content.into(), name: Some(name.into()) }
    }
}

/// A stored (question, response) pair.
///
/// Both halves are optional on the wire so that half-written or hand-edited
/// rows still decode; only complete turns contribute to context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

impl Turn {
    pub fn new(question: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            question: Some(question.into()),
            response: Some(response.into()),
        }
    }

    /// Both halves, if both are present and non-empty.
    pub fn pair(&self) -> Option<(&str, &str)> {
        let q = self.question.as_deref().filter(|s| !s.is_empty())?;
        let r = self.response.as_deref().filter(|s| !s.is_empty())?;
        Some((q, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_requires_both_halves() {
        assert!(Turn::new("q", "r").pair().is_some());

        let question_only = Turn { question: Some("q".into()), response: None };
        assert!(question_only.pair().is_none());

        let empty_response = Turn { question: Some("q".into()), response: Some(String::new()) };
        assert!(empty_response.pair().is_none());
    }

    #[test]
    fn test_turn_decodes_missing_fields() {
        let turn: Turn = serde_json::from_str(r#"{"question":"สวัสดี"}"#).unwrap();
        assert_eq!(turn.question.as_deref(), Some("สวัสดี"));
        assert!(turn.response.is_none());
    }
}
