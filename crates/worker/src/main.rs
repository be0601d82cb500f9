use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textq_queue::QueueConnectionManager;
use textq_store::RedisStore;
use textq_worker::config::WorkerConfig;
use textq_worker::consumer::Consumer;

/// Upper bound on closing the broker connection after the consumer stops.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        broker = %config.amqp.redacted_uri(),
        prefetch = config.prefetch,
        "Loaded worker configuration",
    );

    // --- Status store ---
    let store = RedisStore::connect(&config.redis)
        .await
        .expect("Failed to connect to status store");

    // --- Work queue ---
    let manager = Arc::new(QueueConnectionManager::new(config.amqp.clone()));

    // --- Shutdown wiring ---
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    // --- Consume ---
    let consumer = Consumer::new(Arc::new(store), Arc::clone(&manager), &config);
    consumer.run(cancel).await;

    if tokio::time::timeout(CLOSE_TIMEOUT, manager.close())
        .await
        .is_err()
    {
        tracing::warn!("Timed out closing broker connection");
    }

    tracing::info!("Worker shutdown complete");
}

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "textq_worker=debug,textq_queue=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), finishing current task");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, finishing current task");
        }
    }
}
