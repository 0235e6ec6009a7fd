/// Unified error types for Linkdeck.
use thiserror::Error;

/// Top-level error type for Linkdeck.
#[derive(Debug, Error)]
pub enum LinkdeckError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("No `Name: URL` lines found in {0}")]
    NoEntries(String),

    #[error("Telegram error: {0}")]
    Telegram(String),
}

impl LinkdeckError {
    /// Short message suitable for showing to a chat user.
    pub fn user_message(&self) -> String {
        match self {
            LinkdeckError::NoEntries(_) => {
                "No links found. Each line must look like `Name: URL`.".to_string()
            }
            LinkdeckError::Io(_) => "Could not read the uploaded file.".to_string(),
            LinkdeckError::Telegram(m) => format!("Telegram request failed: {}", m),
            other => format!("Conversion failed: {}", other),
        }
    }
}

/// Result type alias for Linkdeck operations.
pub type LinkdeckResult<T> = Result<T, LinkdeckError>;
