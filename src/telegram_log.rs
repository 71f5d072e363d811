//! Ships this crate's log events to a Telegram chat.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::chatbot::telegram::{MAX_MESSAGE_CHARS, chunk_text};

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BUFFERED: usize = 50;

/// Log message with priority.
#[derive(Debug, PartialEq, Eq)]
enum LogMessage {
    /// WARN/ERROR - send immediately
    Urgent(String),
    /// INFO - batched
    Info(String),
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<LogMessage>,
}

impl TelegramLogLayer {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogMessage>();

        tokio::spawn(async move {
            let mut info_buffer: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);

            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        match msg {
                            Some(LogMessage::Urgent(text)) => {
                                // Keep ordering: pending INFO first
                                flush_buffer(&bot, chat_id, &mut info_buffer).await;
                                send_log(&bot, chat_id, &text).await;
                            }
                            Some(LogMessage::Info(text)) => {
                                info_buffer.push(text);
                                if info_buffer.len() >= MAX_BUFFERED {
                                    flush_buffer(&bot, chat_id, &mut info_buffer).await;
                                }
                            }
                            None => {
                                flush_buffer(&bot, chat_id, &mut info_buffer).await;
                                break;
                            }
                        }
                    }
                    _ = interval.tick() => {
                        flush_buffer(&bot, chat_id, &mut info_buffer).await;
                    }
                }
            }
        });

        Self { tx }
    }
}

async fn send_log(bot: &Bot, chat_id: ChatId, text: &str) {
    for chunk in chunk_text(text, MAX_MESSAGE_CHARS) {
        if let Err(e) = bot.send_message(chat_id, chunk).await {
            eprintln!("Failed to send log to Telegram: {e}");
            return;
        }
    }
}

async fn flush_buffer(bot: &Bot, chat_id: ChatId, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(bot, chat_id, &combined).await;
}

/// Collects the message plus any structured fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields.join(" "),
            (false, false) => format!("{} [{}]", self.message, self.fields.join(" ")),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

/// Only this crate's events are shipped; transport crates would echo
/// their own send failures back into the channel.
fn is_shipped(target: &str, level: Level) -> bool {
    level <= Level::INFO && (target == "philam" || target.starts_with("philam::"))
}

fn prioritize(level: Level, text: String) -> LogMessage {
    match level {
        Level::ERROR => LogMessage::Urgent(format!("❌ {text}")),
        Level::WARN => LogMessage::Urgent(format!("⚠️ {text}")),
        _ => LogMessage::Info(text),
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();
        if !is_shipped(metadata.target(), level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if self.tx.send(prioritize(level, visitor.finish())).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_own_targets_at_info_or_above() {
        assert!(is_shipped("philam::chatbot::engine", Level::INFO));
        assert!(is_shipped("philam", Level::ERROR));
        assert!(!is_shipped("philam::chatbot::engine", Level::DEBUG));
        assert!(!is_shipped("teloxide::dispatching", Level::WARN));
        assert!(!is_shipped("philamx", Level::WARN));
    }

    #[test]
    fn test_prioritize() {
        assert_eq!(prioritize(Level::ERROR, "boom".into()), LogMessage::Urgent("❌ boom".into()));
        assert_eq!(prioritize(Level::WARN, "hmm".into()), LogMessage::Urgent("⚠️ hmm".into()));
        assert_eq!(prioritize(Level::INFO, "ok".into()), LogMessage::Info("ok".into()));
    }

    #[test]
    fn test_visitor_output() {
        let with_fields = MessageVisitor {
            message: "Completion received".into(),
            fields: vec!["attempt=1".into(), "model=gpt-4o-mini".into()],
        };
        assert_eq!(with_fields.finish(), "Completion received [attempt=1 model=gpt-4o-mini]");

        let bare = MessageVisitor { message: "hi".into(), fields: vec![] };
        assert_eq!(bare.finish(), "hi");
    }
}
