//! Telegram delivery using teloxide.

use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, MessageId, ReplyParameters};
use tracing::{debug, warn};

use crate::chatbot::engine::Reply;

/// Telegram's per-message character limit.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Split text into chunks of at most `limit` chars, breaking at the last
/// newline inside each window when there is one.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + limit).min(chars.len());
        let cut = if end == chars.len() {
            end
        } else {
            chars[start..end]
                .iter()
                .rposition(|c| *c == '\n')
                .filter(|pos| *pos > 0)
                .map(|pos| start + pos)
                .unwrap_or(end)
        };
        let chunk: String = chars[start..cut].iter().collect();
        let chunk = chunk.trim_matches('\n');
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        start = cut;
    }
    chunks
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_typing(&self, chat_id: i64) {
        if let Err(e) = self.bot.send_chat_action(ChatId(chat_id), ChatAction::Typing).await {
            debug!("Typing indicator failed: {e}");
        }
    }

    /// Deliver a reply to `reply_to` in `chat_id`, chunked as needed.
    pub async fn deliver(&self, chat_id: i64, reply_to: i32, reply: &Reply) -> Result<(), String> {
        match reply {
            Reply::Text(text) => {
                for chunk in chunk_text(text, MAX_MESSAGE_CHARS) {
                    self.send_text(chat_id, &chunk, Some(reply_to)).await?;
                }
                Ok(())
            }
            Reply::Photo { url, caption } => self.send_photo(chat_id, url, caption, reply_to).await,
        }
    }

    /// Send text as a reply, falling back to a plain message when the
    /// original can't be replied to.
    pub async fn send_text(&self, chat_id: i64, text: &str, reply_to: Option<i32>) -> Result<(), String> {
        let chat = ChatId(chat_id);
        if let Some(msg_id) = reply_to {
            let request = self
                .bot
                .send_message(chat, text)
                .reply_parameters(ReplyParameters::new(MessageId(msg_id)));
            match request.await {
                Ok(_) => return Ok(()),
                Err(e) => warn!("Reply failed, sending plain message: {e}"),
            }
        }

        self.bot.send_message(chat, text).await.map(|_| ()).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn send_photo(&self, chat_id: i64, url: &str, caption: &str, reply_to: i32) -> Result<(), String> {
        let parsed = match reqwest::Url::parse(url) {
            Ok(u) => u,
            Err(_) => return self.send_text(chat_id, url, Some(reply_to)).await,
        };

        let result = self
            .bot
            .send_photo(ChatId(chat_id), InputFile::url(parsed))
            .caption(caption)
            .reply_parameters(ReplyParameters::new(MessageId(reply_to)))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                // Telegram refuses some remote images; the link still helps.
                warn!("Photo send failed, sending link: {e}");
                self.send_text(chat_id, url, Some(reply_to)).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(chunk_text("สวัสดี", 4096), vec!["สวัสดี".to_string()]);
        assert!(chunk_text("", 4096).is_empty());
    }

    #[test]
    fn test_prefers_newline_boundary() {
        let text = "aaaa\nbbbb\ncc";
        assert_eq!(chunk_text(text, 7), vec!["aaaa", "bbbb", "cc"]);
    }

    #[test]
    fn test_hard_split_without_newline() {
        let text = "x".repeat(10);
        let chunks = chunk_text(&text, 4);
        assert_eq!(chunks, vec!["xxxx", "xxxx", "xx"]);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let text = "ก".repeat(5000);
        let chunks = chunk_text(&text, MAX_MESSAGE_CHARS);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), MAX_MESSAGE_CHARS);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_MESSAGE_CHARS));
    }
}
