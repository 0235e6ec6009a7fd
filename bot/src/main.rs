/// Linkdeck Bot - Main Entry Point
///
/// Telegram bot built with teloxide that turns uploaded `Name: URL` text
/// lists into self-contained HTML link pages.
mod callback_state;
mod commands;
mod force_sub;
mod workers;

use std::sync::Arc;
use std::time::{Duration, Instant};
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info, warn};

use callback_state::UploadWaitStore;
use commands::{AppState, Command, UPLOAD_PROMPT_TTL};
use linkdeck_shared::config::BotConfig;
use linkdeck_shared::conversion_queue::ConversionQueue;
use linkdeck_shared::Converter;

#[tokio::main]
async fn main() {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("linkdeck_bot=info".parse().unwrap())
                .add_directive("linkdeck_shared=info".parse().unwrap()),
        )
        .init();

    info!("=== Linkdeck Bot Starting ===");

    let config = match BotConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.download_dir) {
        error!("Failed to create download directory {}: {}", config.download_dir.display(), e);
        std::process::exit(1);
    }

    let converter = match Converter::new(config.convert_options()) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load page templates: {}", e);
            std::process::exit(1);
        }
    };

    // Connect to the history database; the bot keeps working without it.
    let database_path = std::path::Path::new(&config.database_path)
        .canonicalize()
        .unwrap_or_else(|_| std::path::PathBuf::from(&config.database_path));
    // Strip Windows UNC prefix (\\?\) which breaks SQLite URL parsing
    let db_path_str = database_path.display().to_string();
    let db_path_str = db_path_str.strip_prefix(r"\\?\").unwrap_or(&db_path_str).to_string();
    let database_url = format!("sqlite://{}?mode=rwc", db_path_str);
    info!("Database path: {}", db_path_str);
    let db_pool = match linkdeck_shared::db::create_pool(&database_url).await {
        Ok(pool) => {
            if let Err(e) = linkdeck_shared::db::run_migrations(&pool).await {
                error!("DB migration error: {}", e);
            }
            Some(pool)
        }
        Err(e) => {
            error!("Failed to connect to database (history disabled): {}", e);
            None
        }
    };

    let max_concurrent = config.max_concurrent;
    let admin_chat_id = config.admin_chat_id;
    let bot_token = config.bot_token.clone();

    match &config.force_sub_channel {
        Some(channel) => info!("Force-subscribe enabled for @{}", channel),
        None => info!("Force-subscribe disabled (FORCE_SUB_CHANNEL not set)"),
    }
    info!("Page layout: {}", converter.layout());

    let state = Arc::new(AppState {
        config,
        converter,
        queue: ConversionQueue::new(max_concurrent),
        uploads: UploadWaitStore::new(),
        db_pool: db_pool.clone(),
        started_at: Instant::now(),
    });

    let bot = Bot::new(bot_token);

    // Explicitly delete any existing webhook before polling
    // (prevents 409 Conflict if a webhook was previously set)
    match bot.delete_webhook().send().await {
        Ok(_) => info!("Webhook cleared (ready for polling)"),
        Err(e) => warn!("Failed to delete webhook: {} (continuing anyway)", e),
    }

    use teloxide::utils::command::BotCommands;
    match bot.set_my_commands(Command::bot_commands()).await {
        Ok(_) => info!("Bot commands synced with Telegram"),
        Err(e) => error!("Failed to sync bot commands: {}", e),
    }

    if let Some(admin_id) = admin_chat_id {
        let db_status = if db_pool.is_some() { "connected" } else { "offline" };
        let msg = format!(
            "Linkdeck Bot online\nDB: {}\nQueue: {} slots",
            db_status, max_concurrent
        );
        match bot.send_message(ChatId(admin_id), msg).await {
            Ok(_) => info!("Admin startup notification sent"),
            Err(e) => warn!("Failed to send admin notification: {}", e),
        }
    }

    info!("Bot initialized, starting dispatcher...");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint({
                    let state = state.clone();
                    move |bot: Bot, msg: Message, cmd: Command| {
                        let state = state.clone();
                        async move { commands::handle_command(bot, msg, cmd, state).await }
                    }
                }),
        )
        .branch(
            Update::filter_message()
                .endpoint({
                    let state = state.clone();
                    move |bot: Bot, msg: Message| {
                        let state = state.clone();
                        async move { commands::handle_message(bot, msg, state).await }
                    }
                }),
        )
        .branch(
            Update::filter_callback_query()
                .endpoint({
                    let state = state.clone();
                    move |bot: Bot, q: CallbackQuery| {
                        let state = state.clone();
                        async move { commands::handle_callback_query(bot, q, state).await }
                    }
                }),
        );

    // Background cleanup: stale upload prompts and finished jobs
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            cleanup_state.uploads.cleanup_expired(UPLOAD_PROMPT_TTL).await;
            cleanup_state.queue.cleanup_old(3600).await;
        }
    });

    Dispatcher::builder(bot, handler)
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.kind);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot shutting down...");
    if let Some(pool) = db_pool {
        pool.close().await;
    }
    info!("Linkdeck Bot stopped.");
}
