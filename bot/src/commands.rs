/// Telegram bot command, message and callback handlers.
///
/// Handles /start, /help, /convert, /status, /history, /ping, /chatid, /stats
/// plus uploaded documents and inline button presses.
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::SqlitePool;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{info, warn};

use linkdeck_shared::config::BotConfig;
use linkdeck_shared::conversion_queue::{ConversionQueue, JobState};
use linkdeck_shared::db;
use linkdeck_shared::Converter;

use crate::callback_state::{CallbackAction, UploadWaitStore};
use crate::force_sub::{self, Membership};
use crate::workers::conversion::{self, is_txt_file};

/// How long a "please upload" prompt stays valid.
pub const UPLOAD_PROMPT_TTL: Duration = Duration::from_secs(300);

/// Bot command definitions.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Linkdeck commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Show help")]
    Help,
    #[command(description = "Convert a .txt link list to HTML")]
    Convert,
    #[command(description = "Show conversion queue status")]
    Status,
    #[command(description = "Show your recent conversions")]
    History,
    #[command(description = "Health check")]
    Ping,
    #[command(description = "Show your Telegram Chat ID")]
    Chatid,
    #[command(description = "Usage statistics (admin)")]
    Stats,
}

/// Shared application state passed to handlers.
pub struct AppState {
    pub config: BotConfig,
    pub converter: Converter,
    pub queue: ConversionQueue,
    pub uploads: UploadWaitStore,
    pub db_pool: Option<SqlitePool>,
    pub started_at: Instant,
}

impl AppState {
    /// Photo sent with the welcome and gate messages, if configured.
    pub fn welcome_photo(&self) -> Option<url::Url> {
        self.config
            .welcome_photo_url
            .as_deref()
            .and_then(|u| url::Url::parse(u).ok())
    }

    async fn track_user(&self, msg: &Message) {
        if let Some(pool) = &self.db_pool {
            let username = msg.from().and_then(|u| u.username.as_deref());
            if let Err(e) = db::upsert_user(pool, msg.chat.id.0, username).await {
                warn!("Failed to track user {}: {}", msg.chat.id.0, e);
            }
        }
    }
}

/// Handle incoming commands.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    state.track_user(&msg).await;

    match cmd {
        Command::Start => cmd_start(bot, msg, state).await,
        Command::Help => cmd_help(bot, msg).await,
        Command::Convert => cmd_convert(bot, msg, state).await,
        Command::Status => cmd_status(bot, msg, state).await,
        Command::History => cmd_history(bot, msg, state).await,
        Command::Ping => cmd_ping(bot, msg, state).await,
        Command::Chatid => cmd_chatid(bot, msg).await,
        Command::Stats => cmd_stats(bot, msg, state).await,
    }
}

/// Keyboard under the welcome message.
pub fn welcome_keyboard(channel_url: Option<url::Url>) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Some(url) = channel_url {
        rows.push(vec![InlineKeyboardButton::url("📢 Updates", url)]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "🚀 Start Conversion",
        CallbackAction::StartConversion.as_str(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// /start - Welcome message
async fn cmd_start(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if !force_sub::ensure_subscribed(&bot, &msg, &state).await? {
        return Ok(());
    }

    let name = msg
        .from()
        .map(|u| html::escape(&u.first_name))
        .unwrap_or_else(|| "there".to_string());
    let caption = format!(
        "👋 Hello {}!\n\n\
         Welcome to the <b>TXT → HTML Extractor Bot</b> 🪄\n\
         Just upload a <code>.txt</code> file containing links (videos, pdfs, etc.) \
         and I'll convert it into a neat HTML file.\n\n\
         ✨ Let's get started!",
        name
    );
    let keyboard = welcome_keyboard(
        state
            .config
            .channel_url()
            .and_then(|u| url::Url::parse(&u).ok()),
    );

    send_card(&bot, msg.chat.id, state.welcome_photo(), caption, Some(keyboard)).await
}

/// Send an HTML caption, as a photo when one is given and as text otherwise.
pub async fn send_card(
    bot: &Bot,
    chat_id: ChatId,
    photo: Option<url::Url>,
    caption: String,
    keyboard: Option<InlineKeyboardMarkup>,
) -> ResponseResult<()> {
    match photo {
        Some(photo) => {
            let mut request = bot
                .send_photo(chat_id, InputFile::url(photo))
                .caption(caption)
                .parse_mode(ParseMode::Html);
            if let Some(kb) = keyboard {
                request = request.reply_markup(kb);
            }
            request.await?;
        }
        None => {
            let mut request = bot.send_message(chat_id, caption).parse_mode(ParseMode::Html);
            if let Some(kb) = keyboard {
                request = request.reply_markup(kb);
            }
            request.await?;
        }
    }
    Ok(())
}

/// /help - Show help
async fn cmd_help(bot: Bot, msg: Message) -> ResponseResult<()> {
    let help_text = "\
📄 TXT → HTML Extractor

Send a .txt file where every line looks like:
  Lecture name: https://link

I'll reply with an HTML page that plays the videos and links the PDFs.

Naming tips:
  (Subject) Title  — groups lectures by subject
  Subject by Sir || Title  — same, lecturer style
  Topic - Title  — groups videos by topic

Commands:
/convert — Upload a list to convert
/status — Conversion queue status
/history — Your recent conversions
/chatid — Show your Chat ID
/ping — Health check
/help — Show this message";
    bot.send_message(msg.chat.id, help_text).await?;
    Ok(())
}

/// /convert - Prompt for a .txt upload
async fn cmd_convert(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if !force_sub::ensure_subscribed(&bot, &msg, &state).await? {
        return Ok(());
    }
    prompt_upload(&bot, msg.chat.id, &state).await
}

async fn prompt_upload(bot: &Bot, chat_id: ChatId, state: &AppState) -> ResponseResult<()> {
    state.uploads.begin(chat_id.0).await;
    bot.send_message(
        chat_id,
        "📤 Please upload a .txt file containing links (videos/pdf/others).",
    )
    .await?;
    Ok(())
}

/// /status - Queue status
async fn cmd_status(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let stats = state.queue.stats().await;
    let mut text = format!(
        "Queue Status:\n\
         Running: {}/{}\n\
         Queued: {}\n\
         Completed: {}\n\
         Failed: {}\n",
        stats.running, stats.max_concurrent, stats.queued, stats.completed, stats.failed,
    );

    match state.queue.active_for_chat(msg.chat.id.0).await {
        Some(job) => {
            let what = if job.state == JobState::Running { "converting" } else { "waiting" };
            text.push_str(&format!("\nYour job: {} ({})", job.file_name, what));
        }
        None => text.push_str("\nNo active conversions."),
    }

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// /history - Recent conversions
async fn cmd_history(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let pool = match &state.db_pool {
        Some(p) => p,
        None => {
            bot.send_message(msg.chat.id, "History is unavailable (no database).").await?;
            return Ok(());
        }
    };

    let text = match db::get_user_conversions(pool, msg.chat.id.0, 10).await {
        Ok(records) if records.is_empty() => "No conversions yet. Send me a .txt file!".to_string(),
        Ok(records) => {
            let mut text = String::from("🗂 Recent conversions:\n");
            for r in records {
                let icon = if r.status == "done" { "✅" } else { "❌" };
                text.push_str(&format!(
                    "\n{} {} — {} links ({} videos, {} pdfs)\n   {}",
                    icon,
                    r.file_name,
                    r.entries,
                    r.videos,
                    r.pdfs,
                    r.created_at.format("%Y-%m-%d %H:%M"),
                ));
            }
            text
        }
        Err(e) => {
            warn!("History lookup failed for {}: {}", msg.chat.id.0, e);
            format!("❌ Could not load history: {}", e)
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// /ping - Health check
async fn cmd_ping(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let stats = state.queue.stats().await;
    let db_status = if state.db_pool.is_some() { "connected" } else { "offline" };
    let uptime = state.started_at.elapsed().as_secs();
    bot.send_message(
        msg.chat.id,
        format!(
            "✅ System Status\n\n\
             ⏱ Uptime: {}h {}m\n\
             🗄 DB: {}\n\
             ⏳ Queue: {}/{} running\n\
             🧩 Layout: {}",
            uptime / 3600,
            (uptime % 3600) / 60,
            db_status,
            stats.running,
            stats.max_concurrent,
            state.converter.layout(),
        ),
    )
    .await?;
    Ok(())
}

/// /chatid - Send the user their Telegram Chat ID
async fn cmd_chatid(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(msg.chat.id, format!("🔐 Your Chat ID: <code>{}</code>", msg.chat.id.0))
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// /stats - Usage statistics (admin only)
async fn cmd_stats(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if state.config.admin_chat_id != Some(msg.chat.id.0) {
        bot.send_message(msg.chat.id, "🔒 Access Denied\n\nYou are not authorized to use this command.")
            .await?;
        return Ok(());
    }

    let text = match &state.db_pool {
        Some(pool) => match db::get_system_stats(pool).await {
            Ok(s) => format!(
                "📊 Usage\n\nUsers: {}\nConversions: {} ({} ok, {} failed)\nLinks processed: {}",
                s.total_users,
                s.total_conversions,
                s.completed_conversions,
                s.failed_conversions,
                s.total_links,
            ),
            Err(e) => format!("❌ Failed to load stats: {}", e),
        },
        None => "❌ Database unavailable".to_string(),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Handle plain messages: uploaded documents and stray text.
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id;

    if let Some(document) = msg.document() {
        state.track_user(&msg).await;
        let was_prompted = state.uploads.take(chat_id.0, UPLOAD_PROMPT_TTL).await;

        if !is_txt_file(document.file_name.as_deref()) {
            if was_prompted {
                bot.send_message(chat_id, "• Invalid file input. Please upload a .txt file.")
                    .await?;
            }
            return Ok(());
        }

        if !force_sub::ensure_subscribed(&bot, &msg, &state).await? {
            return Ok(());
        }

        info!(
            "Received {:?} ({} bytes) from chat {}",
            document.file_name, document.file.size, chat_id.0
        );
        return conversion::start_conversion(bot, chat_id, document.clone(), state).await;
    }

    if msg.text().is_some() && state.uploads.is_waiting(chat_id.0, UPLOAD_PROMPT_TTL).await {
        bot.send_message(chat_id, "📤 Waiting for your .txt file. Send it as a document.")
            .await?;
    }
    Ok(())
}

/// Handle callback query from inline keyboard button press.
pub async fn handle_callback_query(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let action = match q.data.as_deref().and_then(CallbackAction::parse) {
        Some(a) => a,
        None => {
            bot.answer_callback_query(&q.id).await?;
            return Ok(());
        }
    };

    match action {
        CallbackAction::CheckSubscription => {
            match force_sub::check_membership(&bot, &state, q.from.id).await {
                Membership::Allowed => {}
                Membership::NotJoined => {
                    bot.answer_callback_query(&q.id)
                        .text("💀 Please join the channel first...")
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
                Membership::Unknown(err) => {
                    bot.answer_callback_query(&q.id)
                        .text(format!("🚫 Error: {}", err))
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
            }

            bot.answer_callback_query(&q.id)
                .text("✅ Thank you for joining!")
                .await?;
            if let Some(m) = &q.message {
                let _ = bot.delete_message(m.chat.id, m.id).await;
            }
            bot.send_message(
                ChatId(q.from.id.0 as i64),
                "Welcome! 🎉\nSend me a file to get started.",
            )
            .await?;
        }
        CallbackAction::StartConversion => {
            bot.answer_callback_query(&q.id).await?;
            let chat_id = match &q.message {
                Some(m) => {
                    let _ = bot.delete_message(m.chat.id, m.id).await;
                    m.chat.id
                }
                None => ChatId(q.from.id.0 as i64),
            };
            prompt_upload(&bot, chat_id, &state).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_keyboard_without_channel() {
        let kb = welcome_keyboard(None);
        assert_eq!(kb.inline_keyboard.len(), 1);
        assert_eq!(kb.inline_keyboard[0][0].text, "🚀 Start Conversion");
    }

    #[test]
    fn test_welcome_keyboard_with_channel() {
        let kb = welcome_keyboard(Some(url::Url::parse("https://t.me/updates").unwrap()));
        assert_eq!(kb.inline_keyboard.len(), 2);
        assert_eq!(kb.inline_keyboard[0][0].text, "📢 Updates");
    }

    fn state(photo: Option<&str>) -> AppState {
        let config = BotConfig::from_lookup(|key| match key {
            "TELOXIDE_TOKEN" => Some("123:abc".to_string()),
            "WELCOME_PHOTO_URL" => photo.map(str::to_string),
            _ => None,
        })
        .unwrap();
        AppState {
            converter: Converter::new(config.convert_options()).unwrap(),
            config,
            queue: ConversionQueue::new(1),
            uploads: UploadWaitStore::new(),
            db_pool: None,
            started_at: Instant::now(),
        }
    }

    #[test]
    fn test_welcome_photo() {
        assert!(state(None).welcome_photo().is_none());
        assert!(state(Some("not a url")).welcome_photo().is_none());
        assert_eq!(
            state(Some("https://x.io/welcome.jpg")).welcome_photo().unwrap().as_str(),
            "https://x.io/welcome.jpg"
        );
    }

    #[test]
    fn test_command_descriptions() {
        let text = Command::descriptions().to_string();
        assert!(text.contains("/convert"));
        assert!(text.contains("/history"));
    }
}
