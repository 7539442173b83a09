use anyhow::Result;
use common::client::ApiClient;
use common::config::DashboardConfig;
use common::store::SqliteStore;
use engine::poller::Poller;
use engine::view::{NoticeLevel, ViewEvent};
use engine::{DashboardEngine, EngineOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(DashboardConfig::default_config_path);
    let config = DashboardConfig::load(&config_path)?;

    common::observability::init("dashboard", &config.logging);
    info!(path = %config_path, "dashboard starting");

    if let Some(port) = config.observability.prometheus_port {
        engine::metrics::install_prometheus(port)?;
        engine::metrics::describe();
        info!(port, "prometheus exporter listening");
    }

    let client = Arc::new(ApiClient::new(
        &config.api.base_url,
        &config.pool_resolution.lookup_url,
        Duration::from_secs(config.api.request_timeout_secs),
    )?);
    let store = Arc::new(SqliteStore::open(&config.storage.path)?);

    let mut dashboard = DashboardEngine::new(client, store, EngineOptions::from_config(&config));
    if let Err(e) = dashboard.bootstrap().await {
        // Each tick retries the wallet roster until it loads, then fetches positions.
        warn!(error = %e, "initial load failed");
    }
    let snapshot = dashboard.snapshot();
    info!(
        tokens = snapshot.aggregates.len(),
        selected = snapshot.selected.as_ref().map_or("-", |a| a.symbol.as_str()),
        holdings = snapshot.selected_holdings(),
        "initial snapshot"
    );

    let engine = Arc::new(Mutex::new(dashboard));
    let (tx, mut rx) = mpsc::channel::<ViewEvent>(16);
    let mut poller = Poller::new();
    poller.start(Arc::clone(&engine), config.polling.interval(), tx);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            event = rx.recv() => match event {
                Some(ViewEvent::Rebuild(snap)) => info!(
                    tokens = snap.aggregates.len(),
                    selected = snap.selected.as_ref().map_or("-", |a| a.symbol.as_str()),
                    wallets_selected = snap.wallets.iter().filter(|w| w.selected).count(),
                    "view rebuilt"
                ),
                Some(ViewEvent::Refresh(_)) => {}
                Some(ViewEvent::Notice(notice)) => match notice.level {
                    NoticeLevel::Error => warn!(message = %notice.message, "notice"),
                    NoticeLevel::Info | NoticeLevel::Success => info!(message = %notice.message, "notice"),
                },
                None => {
                    error!("poller exited unexpectedly");
                    break;
                }
            },
        }
    }

    poller.shutdown().await;
    Ok(())
}
