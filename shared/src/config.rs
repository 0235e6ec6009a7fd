/// Environment-driven configuration for the bot.
///
/// Values come from the process environment after `.env` has been loaded
/// with dotenvy.
use std::path::PathBuf;

use crate::catalog::Layout;
use crate::convert::ConvertOptions;
use crate::errors::{LinkdeckError, LinkdeckResult};

/// Telegram bots may only download files up to 20 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    /// Channel username (without `@`) users must join first. `None` disables the gate.
    pub force_sub_channel: Option<String>,
    pub credit: Option<String>,
    pub credit_url: Option<String>,
    pub welcome_photo_url: Option<String>,
    pub download_dir: PathBuf,
    pub database_path: String,
    pub max_concurrent: usize,
    pub max_file_bytes: u64,
    pub admin_chat_id: Option<i64>,
    pub pw_token: Option<String>,
    pub layout: Layout,
}

impl BotConfig {
    /// Load `.env` (if present) and read the configuration from the environment.
    pub fn from_env() -> LinkdeckResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> LinkdeckResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("TELOXIDE_TOKEN")
            .ok_or_else(|| LinkdeckError::Config("TELOXIDE_TOKEN must be set".into()))?;

        let force_sub_channel = get("FORCE_SUB_CHANNEL")
            .map(|c| c.trim_start_matches('@').to_string())
            .filter(|c| !c.is_empty());

        let max_concurrent = match get("MAX_CONCURRENT_CONVERSIONS") {
            Some(v) => v.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                LinkdeckError::Config(format!("MAX_CONCURRENT_CONVERSIONS must be a positive integer, got '{}'", v))
            })?,
            None => 3,
        };

        let max_file_bytes = match get("MAX_FILE_BYTES") {
            Some(v) => v.parse::<u64>().map_err(|_| {
                LinkdeckError::Config(format!("MAX_FILE_BYTES must be a number, got '{}'", v))
            })?,
            None => DEFAULT_MAX_FILE_BYTES,
        };

        let admin_chat_id = match get("ADMIN_CHAT_ID") {
            Some(v) => Some(v.parse::<i64>().map_err(|_| {
                LinkdeckError::Config(format!("ADMIN_CHAT_ID must be a chat id, got '{}'", v))
            })?),
            None => None,
        };

        let layout = match get("PAGE_LAYOUT") {
            Some(v) => v.parse::<Layout>()?,
            None => Layout::default(),
        };

        Ok(Self {
            bot_token,
            force_sub_channel,
            credit: get("CREDIT"),
            credit_url: get("CREDIT_URL"),
            welcome_photo_url: get("WELCOME_PHOTO_URL"),
            download_dir: PathBuf::from(get("DOWNLOAD_DIR").unwrap_or_else(|| "./downloads".to_string())),
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "./linkdeck.db".to_string()),
            max_concurrent,
            max_file_bytes,
            admin_chat_id,
            pw_token: get("PW_TOKEN"),
            layout,
        })
    }

    /// Page options derived from this configuration.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            layout: self.layout,
            pw_token: self.pw_token.clone(),
            credit: self.credit.clone(),
            credit_url: self.credit_url.clone(),
        }
    }

    /// Public link to the force-subscribe channel, if one is configured.
    pub fn channel_url(&self) -> Option<String> {
        self.force_sub_channel
            .as_ref()
            .map(|c| format!("https://t.me/{}", c))
    }
}
