/// Data models shared across all Linkdeck crates.
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One `Name: URL` line from an uploaded list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub url: String,
}

impl Entry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// What a URL points at, judged from its text alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Pdf,
    Other,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Pdf => write!(f, "pdf"),
            MediaKind::Other => write!(f, "other"),
        }
    }
}

/// A named link as it appears on the rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
    /// Only meaningful for videos: the page streams these through hls.js.
    #[serde(default)]
    pub hls: bool,
    /// False for non-http(s) URLs; those are shown as text, never as a link.
    #[serde(default)]
    pub web: bool,
}

/// Outcome of a conversion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Done,
    Error,
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionStatus::Done => write!(f, "done"),
            ConversionStatus::Error => write!(f, "error"),
        }
    }
}

/// Conversion history record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversionRecord {
    pub id: String,
    pub chat_id: i64,
    pub file_name: String,
    pub entries: i64,
    pub videos: i64,
    pub pdfs: i64,
    pub others: i64,
    pub status: String,
    pub error_msg: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Counts reported back to the user after a conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub entries: usize,
    pub videos: usize,
    pub pdfs: usize,
    pub others: usize,
    /// Topics (tabs layout) or subjects (subjects layout).
    pub groups: usize,
}
