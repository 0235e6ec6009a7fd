/// Callback data for inline buttons, and the per-chat "awaiting upload" state.
///
/// Pressing "Start Conversion" puts the chat into an awaiting state so the
/// next document it sends is checked for a `.txt` extension.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// "I've Joined" button on the force-subscribe gate.
pub const CB_CHECK_SUB: &str = "checksub";
/// "Start Conversion" button on the welcome message.
pub const CB_START_CONVERSION: &str = "close_data";

/// Inline button actions the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    CheckSubscription,
    StartConversion,
}

impl CallbackAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackAction::CheckSubscription => CB_CHECK_SUB,
            CallbackAction::StartConversion => CB_START_CONVERSION,
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        match data {
            CB_CHECK_SUB => Some(CallbackAction::CheckSubscription),
            CB_START_CONVERSION => Some(CallbackAction::StartConversion),
            _ => None,
        }
    }
}

/// Chats that were prompted for a `.txt` upload, with the prompt time.
#[derive(Clone, Default)]
pub struct UploadWaitStore {
    inner: Arc<Mutex<HashMap<i64, Instant>>>,
}

impl UploadWaitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a chat as waiting for an upload.
    pub async fn begin(&self, chat_id: i64) {
        debug!("Chat {} is now awaiting an upload", chat_id);
        self.inner.lock().await.insert(chat_id, Instant::now());
    }

    /// Remove the waiting mark; returns whether one was set and still fresh.
    pub async fn take(&self, chat_id: i64, ttl: Duration) -> bool {
        match self.inner.lock().await.remove(&chat_id) {
            Some(since) => since.elapsed() < ttl,
            None => false,
        }
    }

    pub async fn is_waiting(&self, chat_id: i64, ttl: Duration) -> bool {
        self.inner
            .lock()
            .await
            .get(&chat_id)
            .map(|since| since.elapsed() < ttl)
            .unwrap_or(false)
    }

    /// Remove entries older than the TTL.
    pub async fn cleanup_expired(&self, ttl: Duration) {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, since| since.elapsed() < ttl);
        let removed = before - map.len();
        if removed > 0 {
            debug!("Cleaned up {} expired upload prompts", removed);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_roundtrip() {
        for action in [CallbackAction::CheckSubscription, CallbackAction::StartConversion] {
            assert_eq!(CallbackAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(CallbackAction::parse("dv:abc:1"), None);
    }

    #[tokio::test]
    async fn test_begin_and_take() {
        let store = UploadWaitStore::new();
        let ttl = Duration::from_secs(300);
        assert!(!store.take(1, ttl).await);

        store.begin(1).await;
        assert!(store.is_waiting(1, ttl).await);
        assert!(store.take(1, ttl).await);
        assert!(!store.is_waiting(1, ttl).await);
    }

    #[tokio::test]
    async fn test_expired_prompt() {
        let store = UploadWaitStore::new();
        store.begin(5).await;
        assert!(!store.is_waiting(5, Duration::ZERO).await);

        store.cleanup_expired(Duration::ZERO).await;
        assert_eq!(store.len().await, 0);
    }
}
