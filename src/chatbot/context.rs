//! Context assembly: system prompt, recent turns, new input, trimmed to a
//! token budget.
//!
//! The system message and the new user message are never evicted. When the
//! sequence is over budget the oldest message after the system prompt is
//! dropped, one at a time, so whole turns leave from the front and the most
//! recent exchanges survive.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chatbot::database::Database;
use crate::chatbot::message::{Message, Turn};
use crate::chatbot::token::count_tokens;

/// Assembly settings.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Ceiling on the estimated request size. `None` disables trimming.
    pub token_budget: Option<usize>,
    /// How many stored turns to fetch before trimming.
    pub initial_fetch: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: Some(3000),
            initial_fetch: 3,
        }
    }
}

pub struct ContextAssembler {
    database: Arc<Database>,
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(database: Arc<Database>, config: ContextConfig) -> Self {
        Self { database, config }
    }

    /// Build the ordered message list for one completion.
    pub fn assemble(&self, user_id: i64, new_input: &str, system_prompt: &str) -> Vec<Message> {
        let history = match self.database.recent(user_id, self.config.initial_fetch) {
            Ok(turns) => turns,
            Err(e) => {
                warn!("History unavailable for user {}: {}", user_id, e);
                Vec::new()
            }
        };

        let mut messages = build_messages(system_prompt, &history, new_input);
        if let Some(budget) = self.config.token_budget {
            let evicted = trim_to_budget(&mut messages, budget);
            if evicted > 0 {
                debug!("Evicted {} message(s) to fit {} token budget", evicted, budget);
            }
        }
        messages
    }
}

/// `[system, (user, assistant)*, user]`. Incomplete turns contribute nothing.
pub fn build_messages(system_prompt: &str, history: &[Turn], new_input: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(Message::system(system_prompt));
    for (question, response) in history.iter().filter_map(Turn::pair) {
        messages.push(Message::user(question));
        messages.push(Message::assistant(response));
    }
    messages.push(Message::user(new_input));
    messages
}

/// Drop the oldest non-system messages until the request fits the budget or
/// only system + new input remain. Returns how many were dropped.
pub fn trim_to_budget(messages: &mut Vec<Message>, budget: usize) -> usize {
    let mut evicted = 0;
    while messages.len() > 2 && count_tokens(messages) > budget {
        messages.remove(1);
        evicted += 1;
    }
    evicted
}
