use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

pub mod format;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("recipient unreachable or blocked the bot")]
    Unreachable,
    #[error("send failed: {0}")]
    Other(String),
}

/// Delivery port for the external messaging transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), SendError>;
}

/// Fans one message out to all recipients concurrently, isolating
/// failures per recipient. Returns the recipients that turned out
/// unreachable so the caller can unsubscribe them.
pub async fn dispatch_listing(notifier: &dyn Notifier, recipients: &[i64], text: &str) -> Vec<i64> {
    let sends = recipients.iter().map(|&chat_id| async move {
        match notifier.send(chat_id, text).await {
            Ok(()) => None,
            Err(SendError::RateLimited { retry_after_secs }) => {
                let wait = retry_after_secs + 1;
                warn!(chat_id, wait, "Rate limited, retrying once after delay");
                sleep(Duration::from_secs(wait)).await;
                if let Err(e) = notifier.send(chat_id, text).await {
                    error!(chat_id, error = %e, "Retry after rate limit failed");
                }
                None
            }
            Err(SendError::Unreachable) => {
                info!(chat_id, "Recipient unreachable, removing from subscribers");
                Some(chat_id)
            }
            Err(SendError::Other(e)) => {
                error!(chat_id, error = %e, "Send failed, skipping recipient for this message");
                None
            }
        }
    });

    join_all(sends).await.into_iter().flatten().collect()
}

/// Stand-in transport: writes every message to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        info!(chat_id, message = %text, "Notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted notifier: pops the next outcome per chat, records sends.
    struct ScriptedNotifier {
        outcomes: Mutex<HashMap<i64, Vec<Result<(), SendError>>>>,
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl ScriptedNotifier {
        fn new(outcomes: HashMap<i64, Vec<Result<(), SendError>>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent_count(&self, chat_id: i64) -> usize {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| *c == chat_id)
                .count()
        }
    }

    #[async_trait]
    impl Notifier for ScriptedNotifier {
        async fn send(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            let mut outcomes = self.outcomes.lock().unwrap();
            match outcomes.get_mut(&chat_id) {
                Some(script) if !script.is_empty() => script.remove(0),
                _ => Ok(()),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_send_is_retried_once() {
        let notifier = ScriptedNotifier::new(HashMap::from([(
            1,
            vec![Err(SendError::RateLimited { retry_after_secs: 3 }), Ok(())],
        )]));

        let removed = dispatch_listing(&notifier, &[1], "msg").await;
        assert!(removed.is_empty());
        assert_eq!(notifier.sent_count(1), 2);
    }

    #[tokio::test]
    async fn unreachable_recipient_is_reported_for_removal() {
        let notifier = ScriptedNotifier::new(HashMap::from([(7, vec![Err(SendError::Unreachable)])]));

        let removed = dispatch_listing(&notifier, &[7, 8], "msg").await;
        assert_eq!(removed, vec![7]);
        assert_eq!(notifier.sent_count(7), 1);
        assert_eq!(notifier.sent_count(8), 1);
    }

    #[tokio::test]
    async fn other_error_skips_without_removal() {
        let notifier = ScriptedNotifier::new(HashMap::from([(
            2,
            vec![Err(SendError::Other("boom".to_string()))],
        )]));

        let removed = dispatch_listing(&notifier, &[2, 3], "msg").await;
        assert!(removed.is_empty());
        assert_eq!(notifier.sent_count(2), 1);
        assert_eq!(notifier.sent_count(3), 1);
    }
}
