//! Token counting for chat-completion requests.
//!
//! Text is encoded with the o200k_base BPE used by the GPT-4o models
//! (cl100k_base if o200k cannot be built). Each message costs a fixed framing
//! overhead, and the reply is primed with a few more tokens. If neither BPE is
//! available, text cost falls back to a per-script character estimate.

use std::sync::LazyLock;

use tiktoken_rs::CoreBPE;
use tracing::warn;

use crate::chatbot::message::Message;

/// Framing tokens around every message (`<|start|>{role}\n ... <|end|>`).
pub const TOKENS_PER_MESSAGE: usize = 3;

/// Extra token when a message carries a `name`.
pub const TOKENS_PER_NAME: usize = 1;

/// Tokens that prime the assistant reply.
pub const REPLY_PRIMING_TOKENS: usize = 3;

static BPE: LazyLock<Option<CoreBPE>> = LazyLock::new(|| {
    tiktoken_rs::o200k_base()
        .or_else(|_| tiktoken_rs::cl100k_base())
        .map_err(|e| warn!(error = %e, "BPE unavailable, estimating tokens by character"))
        .ok()
});

/// Character-based estimate: ASCII runs average about four characters per
/// token, Thai and other non-Latin scripts about one token per character.
fn heuristic_tokens(text: &str) -> usize {
    let mut ascii = 0usize;
    let mut other = 0usize;
    for c in text.chars() {
        if c.is_ascii() {
            ascii += 1;
        } else {
            other += 1;
        }
    }
    ascii.div_ceil(4) + other
}

/// Token count of a string.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    match BPE.as_ref() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => heuristic_tokens(text),
    }
}

/// Cost of a single message, excluding reply priming.
pub fn estimate_message_tokens(message: &Message) -> usize {
    let mut tokens = TOKENS_PER_MESSAGE
        + estimate_tokens(message.role.as_str())
        + estimate_tokens(&message.content);
    if let Some(ref name) = message.name {
        tokens += TOKENS_PER_NAME + estimate_tokens(name);
    }
    tokens
}

/// Cost of a whole request.
pub fn count_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum::<usize>() + REPLY_PRIMING_TOKENS
}
