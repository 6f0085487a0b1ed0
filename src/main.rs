use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use toyota_monitor::app::{run_command_loop, AppState, CommandKind, CommandRequest};
use toyota_monitor::config::Config;
use toyota_monitor::crawler::fetcher::HttpFetcher;
use toyota_monitor::monitor::MonitorService;
use toyota_monitor::notifier::LogNotifier;
use toyota_monitor::phone::{CachedResolver, NoopResolver};
use toyota_monitor::storage::seen::SeenStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cfg = Config::from_env()?;
    info!(
        base_url = %cfg.base_url,
        interval_secs = cfg.check_interval.as_secs(),
        seen_file = %cfg.seen_file.display(),
        "Starting monitor"
    );

    let state = Arc::new(AppState::new(SeenStore::load(&cfg.seen_file)));
    let fetcher = Arc::new(HttpFetcher::new(cfg.request_timeout));
    let notifier = Arc::new(LogNotifier);
    let phones = Arc::new(CachedResolver::new(NoopResolver));

    let service = Arc::new(MonitorService::new(
        cfg,
        state.clone(),
        fetcher,
        notifier,
        phones,
    ));

    // Monitoring runs as a background task so a slow fetch never delays
    // command handling.
    tokio::spawn(service.clone().run());

    let (tx, rx) = mpsc::channel::<CommandRequest>(32);
    tokio::spawn(run_command_loop(service, rx));
    tokio::spawn(read_stdin_commands(tx));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, flushing seen-set");
    if let Err(e) = state.flush_seen().await {
        error!(error = %e, "Final seen-set flush failed");
    }
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Minimal interactive surface: `subscribe <chat>`, `unsubscribe <chat>`,
/// `status`, `search <chat>`. The real chat transport plugs into the same
/// command channel from outside this crate.
async fn read_stdin_commands(tx: mpsc::Sender<CommandRequest>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let mut parts = line.split_whitespace();
        let Some(word) = parts.next() else { continue };
        let chat_id: i64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);

        let kind = match word {
            "subscribe" => CommandKind::Subscribe,
            "unsubscribe" => CommandKind::Unsubscribe,
            "status" => CommandKind::Status,
            "search" => CommandKind::Search,
            _ => CommandKind::Message,
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if tx
            .send(CommandRequest {
                chat_id,
                kind,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            break;
        }
        if let Ok(reply) = reply_rx.await {
            if !reply.is_empty() {
                println!("{reply}");
            }
        }
    }
}
