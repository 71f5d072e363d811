use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use philam::chatbot::{ChatbotEngine, Database, GoogleSearch, HttpLookups, TelegramClient};
use philam::config::Config;
use philam::openai::Client as OpenAiClient;
use philam::telegram_log;

/// How often expired turns and session keys are reclaimed.
const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

const GREETING: &str = "สวัสดีจ้า พี่หลามเอง 🐍\n\
ถามอะไรก็ได้ หรือลองพิมพ์ `ราคาน้ำมัน`, `ราคาทอง`, `หวย`, `อากาศที่ เชียงใหม่`, `ข่าว`, `ดูดวง`, `ดูรูป: แมว`\n\
ปรับสไตล์: /style formal | troll | teacher | neutral | auto\n\
ตั้งเขตเวลา: /timezone Asia/Bangkok";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    /// Greeting and usage.
    Start,
    /// Set conversation style.
    Style(String),
    /// Set your timezone (IANA name).
    Timezone(String),
}

struct BotState {
    config: Config,
    engine: ChatbotEngine,
    telegram: TelegramClient,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "philam.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("philam.log"))
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("❌ Failed to open log file: {e}");
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let tg_layer = telegram_log::TelegramLogLayer::new(bot.clone(), log_chat_id);
        registry.with(tg_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting philam...");
    info!("Loaded config from {config_path}");
    if config.allowed_chats.is_empty() {
        info!("Answering in every chat");
    } else {
        info!("Allowed chats: {:?}", config.allowed_chats);
    }
    if config.google_api_key.is_none() || config.google_cse_id.is_none() {
        warn!("Google search not configured: no web fallback or image lookup");
    }
    if config.openweather_api_key.is_none() {
        warn!("OpenWeatherMap key not configured: weather lookups disabled");
    }

    let database = match Database::open(&config.database_path()) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };
    spawn_purge_task(database.clone());

    let model = Arc::new(OpenAiClient::new(config.openai_api_key.clone(), config.openai_base_url.clone()));
    let search = Arc::new(GoogleSearch::new(config.google_api_key.clone(), config.google_cse_id.clone()));
    let lookups = Arc::new(HttpLookups::new(
        config.openweather_api_key.clone(),
        search.clone(),
        model.clone(),
        config.model.clone(),
    ));
    let engine = ChatbotEngine::new(config.chatbot_config(), database, model, search, lookups);

    let state = Arc::new(BotState {
        config,
        engine,
        telegram: TelegramClient::new(bot.clone()),
    });

    let handler = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
        .branch(dptree::endpoint(handle_new_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn spawn_purge_task(database: Arc<Database>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match database.purge_expired() {
                Ok(0) => {}
                Ok(n) => info!("🧹 Purged {} expired row(s)", n),
                Err(e) => warn!("Purge failed: {e}"),
            }
        }
    });
}

/// Sender id for messages we should answer; `None` for bots, anonymous
/// senders and chats outside the allow-list.
fn accepted_sender(msg: &Message, state: &BotState) -> Option<i64> {
    if !state.config.is_allowed_chat(msg.chat.id) {
        return None;
    }
    let user = msg.from.as_ref()?;
    if user.is_bot {
        return None;
    }
    Some(user.id.0 as i64)
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user_id) = accepted_sender(&msg, &state) else {
        return Ok(());
    };

    let reply = match cmd {
        Command::Start => GREETING.to_string(),
        Command::Style(value) => match state.engine.set_style(user_id, &value) {
            Ok(()) => format!("🎭 ตั้งสไตล์เป็น `{}` แล้วจ้า", value.trim().to_lowercase()),
            Err(e) => {
                info!("Rejected /style from {}: {}", user_id, e);
                "🎭 ใช้ได้: formal, troll, teacher, neutral, auto, multi".to_string()
            }
        },
        Command::Timezone(name) => match state.engine.set_timezone(user_id, &name) {
            Ok(zone) => format!("⏰ ตั้งเขตเวลาเป็น {} แล้วจ้า", zone.name()),
            Err(e) => {
                info!("Rejected /timezone from {}: {}", user_id, e);
                "⏰ ไม่รู้จักเขตเวลานี้ ลองแบบ `Asia/Bangkok` ดูนะ".to_string()
            }
        },
    };

    if let Err(e) = state.telegram.send_text(msg.chat.id.0, &reply, Some(msg.id.0)).await {
        warn!("Failed to answer command: {e}");
    }
    Ok(())
}

async fn handle_new_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user_id) = accepted_sender(&msg, &state) else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if text.trim().is_empty() {
        return Ok(());
    }

    let preview: String = text.chars().take(100).collect();
    info!("Message from {} in {}: \"{}\"", user_id, msg.chat.id, preview);

    state.telegram.send_typing(msg.chat.id.0).await;

    if let Some(response) = state.engine.handle_message(user_id, text).await
        && let Err(e) = state.telegram.deliver(msg.chat.id.0, msg.id.0, &response.reply).await
    {
        warn!("Failed to deliver reply to {}: {e}", msg.chat.id);
    }

    Ok(())
}
