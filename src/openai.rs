//! Chat-completions client for OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chatbot::message::{Message, Role};

/// Per-call model settings. Unset sampling knobs are omitted from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl CompletionParams {
    /// Bare request: model and length cap only.
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    /// Sampling used for regular conversation.
    pub fn conversational(model: impl Into<String>) -> Self {
        Self {
            temperature: Some(0.6),
            top_p: Some(1.0),
            frequency_penalty: Some(0.2),
            presence_penalty: Some(0.3),
            ..Self::new(model, 1800)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Anything that can turn a message list into a completion.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, messages: &[Message], params: &CompletionParams) -> Result<Completion, Error>;
}

pub struct Client {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Tool results go out as legacy `function` messages, which need no
/// preceding tool call in the conversation.
fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "function",
    }
}

fn build_request<'a>(messages: &'a [Message], params: &'a CompletionParams) -> ApiRequest<'a> {
    ApiRequest {
        model: &params.model,
        max_tokens: params.max_tokens,
        messages: messages
            .iter()
            .map(|m| ApiMessage {
                role: wire_role(m.role),
                content: &m.content,
                name: m.name.as_deref(),
            })
            .collect(),
        temperature: params.temperature,
        top_p: params.top_p,
        frequency_penalty: params.frequency_penalty,
        presence_penalty: params.presence_penalty,
    }
}

fn parse_response(body: &str) -> Result<Completion, Error> {
    let api_response: ApiResponse = serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;
    let text = api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(Error::Empty)?;
    Ok(Completion {
        text,
        usage: api_response.usage,
    })
}

impl Client {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LanguageModel for Client {
    async fn complete(&self, messages: &[Message], params: &CompletionParams) -> Result<Completion, Error> {
        let request = build_request(messages, params);

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let body = response.text().await.map_err(|e| Error::Http(e.to_string()))?;
        parse_response(&body)
    }
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_sampling() {
        let messages = vec![Message::system("sys"), Message::user("hi")];
        let params = CompletionParams::new("gpt-4o-mini", 1500);
        let json = serde_json::to_value(build_request(&messages, &params)).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 1500);
        assert!(json.get("temperature").is_none());
        assert!(json["messages"][0].get("name").is_none());
    }

    #[test]
    fn test_conversational_params() {
        let params = CompletionParams::conversational("m");
        let json = serde_json::to_value(build_request(&[], &params)).unwrap();
        assert_eq!(json["max_tokens"], 1800);
        assert!(json["temperature"].as_f64().unwrap() > 0.5);
        assert!(json.get("presence_penalty").is_some());
    }

    #[test]
    fn test_tool_message_wire_format() {
        let messages = vec![Message::tool("web_search", "1. result")];
        let params = CompletionParams::new("m", 10);
        let json = serde_json::to_value(build_request(&messages, &params)).unwrap();
        assert_eq!(json["messages"][0]["role"], "function");
        assert_eq!(json["messages"][0]["name"], "web_search");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "  สวัสดีจ้า \n"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        }"#;
        let completion = parse_response(body).unwrap();
        assert_eq!(completion.text, "สวัสดีจ้า");
        assert_eq!(completion.usage.unwrap().total_tokens, 17);
    }

    #[test]
    fn test_parse_empty_content() {
        let body = r#"{"choices": [{"message": {"content": null}}]}"#;
        assert!(matches!(parse_response(body), Err(Error::Empty)));
        assert!(matches!(parse_response(r#"{"choices": []}"#), Err(Error::Empty)));
        assert!(matches!(parse_response("not json"), Err(Error::Parse(_))));
    }
}
