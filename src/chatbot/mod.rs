//! Chatbot module - classifies messages and answers them from data
//! providers or the language model.

pub mod cleaner;
pub mod context;
pub mod database;
pub mod engine;
pub mod localize;
pub mod lookup;
pub mod message;
pub mod orchestrator;
pub mod providers;
pub mod search;
pub mod telegram;
pub mod token;
pub mod tone;

#[cfg(test)]
mod testing;

pub use database::Database;
pub use engine::{ChatbotConfig, ChatbotEngine, Reply, Response, Route, system_prompt};
pub use message::{Message, Role, Turn};
pub use providers::HttpLookups;
pub use search::GoogleSearch;
pub use telegram::TelegramClient;
