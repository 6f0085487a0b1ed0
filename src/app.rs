use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{error, info};

use crate::monitor::MonitorService;
use crate::storage::seen::SeenStore;

/// All cross-cycle state, explicitly owned and shared by `Arc` between the
/// monitor loop and the command handlers. No module globals.
pub struct AppState {
    pub subscribers: Mutex<HashSet<i64>>,
    pub seen: Mutex<SeenStore>,
    /// Set when the last cycle was a total fetch failure, so "could not
    /// fetch" is distinguishable from "zero new listings".
    pub last_cycle_failed: AtomicBool,
}

impl AppState {
    pub fn new(seen: SeenStore) -> Self {
        Self {
            subscribers: Mutex::new(HashSet::new()),
            seen: Mutex::new(seen),
            last_cycle_failed: AtomicBool::new(false),
        }
    }

    pub async fn subscribe(&self, chat_id: i64) -> bool {
        self.subscribers.lock().await.insert(chat_id)
    }

    pub async fn unsubscribe(&self, chat_id: i64) -> bool {
        self.subscribers.lock().await.remove(&chat_id)
    }

    pub async fn subscriber_ids(&self) -> Vec<i64> {
        self.subscribers.lock().await.iter().copied().collect()
    }

    pub async fn remove_subscribers(&self, chat_ids: &[i64]) {
        let mut subs = self.subscribers.lock().await;
        for id in chat_ids {
            subs.remove(id);
        }
    }

    pub async fn counts(&self) -> (usize, usize) {
        let subscribers = self.subscribers.lock().await.len();
        let seen = self.seen.lock().await.len();
        (subscribers, seen)
    }

    pub async fn flush_seen(&self) -> anyhow::Result<()> {
        self.seen.lock().await.flush().await
    }

    pub fn mark_cycle_failed(&self, failed: bool) {
        self.last_cycle_failed.store(failed, Ordering::SeqCst);
    }

    pub fn cycle_failed(&self) -> bool {
        self.last_cycle_failed.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Subscribe,
    Unsubscribe,
    Status,
    Search,
    /// Any non-command message; subscribes the sender when AUTO_NOTIFY is on.
    Message,
}

pub struct CommandRequest {
    pub chat_id: i64,
    pub kind: CommandKind,
    pub reply: oneshot::Sender<String>,
}

/// Handles subscriber commands from the transport side. Subscribe and
/// status acks are answered inline; a search runs as its own task so a
/// slow fetch never delays the next ack.
pub async fn run_command_loop(svc: Arc<MonitorService>, mut rx: mpsc::Receiver<CommandRequest>) {
    while let Some(req) = rx.recv().await {
        let state = svc.state();
        match req.kind {
            CommandKind::Subscribe => {
                state.subscribe(req.chat_id).await;
                info!(chat_id = req.chat_id, "Subscribed");
                let _ = req.reply.send("✅ Abonēts Toyota paziņojumiem!".to_string());
            }
            CommandKind::Unsubscribe => {
                state.unsubscribe(req.chat_id).await;
                info!(chat_id = req.chat_id, "Unsubscribed");
                let _ = req.reply.send("🔕 Abonēšana apturēta.".to_string());
            }
            CommandKind::Status => {
                let (subscribers, seen) = state.counts().await;
                let _ = req
                    .reply
                    .send(format!("👥 Subscribers: {subscribers}\n🔎 Seen listings: {seen}"));
            }
            CommandKind::Message => {
                if svc.config().auto_notify {
                    state.subscribe(req.chat_id).await;
                    let _ = req.reply.send("👋 Pievienots paziņojumiem!".to_string());
                } else {
                    let _ = req.reply.send(String::new());
                }
            }
            CommandKind::Search => {
                let svc = svc.clone();
                tokio::spawn(async move {
                    let reply = match svc.search().await {
                        Ok(messages) if messages.is_empty() => {
                            "Nav atbilstošu sludinājumu.".to_string()
                        }
                        Ok(messages) => {
                            let shown: Vec<&String> = messages.iter().take(10).collect();
                            let mut out = format!("🔍 Atrasti {} sludinājumi:\n\n", messages.len());
                            out.push_str(
                                &shown.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("\n\n"),
                            );
                            out
                        }
                        Err(e) => {
                            error!(chat_id = req.chat_id, error = %e, "On-demand search failed");
                            "⚠️ Neizdevās ielādēt sludinājumus, mēģiniet vēlāk.".to_string()
                        }
                    };
                    let _ = req.reply.send(reply);
                });
            }
        }
    }
}
