//! Dialog Stack demo - a catalog bot driven from the terminal
//!
//! Each stdin line becomes an update for one chat: `/cmd` is a command,
//! `:N` presses inline button N as printed by the console transport, and
//! anything else is free text.

mod demo;

use dialog_stack::observer::TracingObserver;
use dialog_stack::store::{MemoryStore, SessionStore, SqliteStore};
use dialog_stack::transport::{ChatTransport, ConsoleTransport, TelegramTransport};
use dialog_stack::update::Sender;
use dialog_stack::{AppConfig, Bot, BotRuntime, ChatId, MessageId, Update};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dialog_stack=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = AppConfig::from_env();

    let store: Arc<dyn SessionStore> = match &config.db_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening session database");
            Arc::new(SqliteStore::open(path)?)
        }
        None => {
            tracing::info!("Keeping sessions in memory");
            Arc::new(MemoryStore::new())
        }
    };

    // Button numbers only exist on the console
    let console = Arc::new(ConsoleTransport::new());
    let transport: Arc<dyn ChatTransport> = match &config.telegram_token {
        Some(token) => {
            tracing::info!(chat_id = config.chat_id, "Sending to Telegram");
            Arc::new(TelegramTransport::new(token)?)
        }
        None => console.clone(),
    };

    let shop = Arc::new(demo::Shop::new());
    let bot = Bot::builder(
        demo::registry(&shop)?,
        demo::config(config.environment, config.page_size),
        transport,
    )
    .store(store)
    .translator(Arc::new(demo::translator()?))
    .observer(Arc::new(TracingObserver::new(config.environment)))
    .build()?;
    let runtime = BotRuntime::new(Arc::new(bot));

    let chat_id = ChatId(config.chat_id);
    let sender = Sender {
        user_id: config.chat_id,
        language_code: std::env::var("DIALOG_LANGUAGE").ok(),
    };
    println!("Type /start to begin, :N to press button N, Ctrl-D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut next_message_id = 1;
    let mut next_callback_id = 1;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let update = if let Some(number) = line.strip_prefix(':') {
            let data = number
                .parse::<usize>()
                .ok()
                .and_then(|n| console.button_data(n))
                // Raw callback data, for transports without numbered buttons
                .unwrap_or_else(|| number.to_string());
            next_callback_id += 1;
            Update::callback(chat_id, format!("console-{next_callback_id}"), Some(data))
        } else {
            next_message_id += 1;
            Update::message(chat_id, MessageId(next_message_id), line)
        };
        runtime.submit(update.with_sender(sender.clone())).await;
    }

    runtime.shutdown().await;
    Ok(())
}
