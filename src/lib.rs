pub mod chatbot;
pub mod classifier;
pub mod config;
pub mod openai;
pub mod telegram_log;
