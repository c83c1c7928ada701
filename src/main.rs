use anyhow::Result;
use clusterwatch::*;
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{broadcast, watch};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let (updates_tx, _) =
        broadcast::channel::<models::FrameUpdate>(app_config.publishing.broadcast_capacity);
    let (board_tx, board_rx) = watch::channel(poller::Board::default());

    // Both are validated non-zero by AppConfig::load.
    let window = NonZeroUsize::new(app_config.polling.window_size)
        .ok_or_else(|| anyhow::anyhow!("polling.window_size must be > 0"))?;
    let seconds_since = NonZeroU64::new(app_config.polling.cluster_seconds_since)
        .unwrap_or(NonZeroU64::MIN);
    let (controls, command_rx) = poller::PollerControls::new(window, seconds_since);

    let source = Arc::new(source::HttpSource::new(&app_config.source)?);
    tracing::info!(
        source = %app_config.source.base_url,
        interval_ms = app_config.polling.interval_ms,
        window_size = window.get(),
        "Polling cluster master"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let poller_handle = poller::spawn(
        poller::PollerDeps {
            source,
            controls: controls.clone(),
            board_tx,
            updates_tx: updates_tx.clone(),
        },
        poller::PollerConfig {
            interval_ms: app_config.polling.interval_ms,
            filter_all_zero: app_config.polling.filter_all_zero,
            metrics: models::Category::ALL
                .into_iter()
                .map(|c| (c, app_config.polling.metric_for(c)))
                .collect(),
            cluster_enabled: app_config.polling.cluster_enabled,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
        },
        command_rx,
        shutdown_rx,
    );

    let ws_connections = Arc::new(AtomicUsize::new(0));
    let app = routes::app(
        board_rx,
        updates_tx,
        controls,
        ws_connections,
        app_config.clone(),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = poller_handle.await;
        }
    }

    Ok(())
}
