use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use wallet_session_sync::config::{BackendKind, WalletConfig};
use wallet_session_sync::daemon::DaemonRpcClient;
use wallet_session_sync::transaction::COIN_DECIMALS;
use wallet_session_sync::utils::format_coin_amount;
use wallet_session_sync::wallet::sync::TracingObserver;
use wallet_session_sync::wallet::{
    Backend, HistoryCursor, RemoteBackend, SessionLifecycle, SyncCoordinator, WalletError,
    WalletResult, next_page,
};

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if let Ok(directive) = "wallet_session_sync=debug".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            on_interrupt.cancel();
        }
    });

    if let Err(e) = run(cancel).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cancel: CancellationToken) -> WalletResult<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WALLET_CONFIG").ok())
        .map(PathBuf::from)
        .ok_or_else(|| {
            WalletError::InvalidInput(
                "usage: wallet-session-sync <settings.json> (or set WALLET_CONFIG)".to_string(),
            )
        })?;

    let config = WalletConfig::load(&config_path)?;
    info!("Starting wallet session for {}", config.network);

    let backend = match &config.backend {
        BackendKind::Remote { rpc_url, ws_url } => {
            let client = DaemonRpcClient::new(rpc_url.clone(), ws_url.clone())?;
            Backend::remote(RemoteBackend::new(Arc::new(client), config.network.clone()))
        }
        BackendKind::Embedded => {
            return Err(WalletError::Unsupported(
                "this build has no embedded light client; configure a remote backend".to_string(),
            ));
        }
    };

    let session = SessionLifecycle::new(backend.clone()).with_watchdog(config.open_watchdog());
    if !session.open_if_exists(&cancel).await? {
        info!("No {} wallet found, create one first", config.network);
        return Ok(());
    }

    let coordinator = SyncCoordinator::new(backend.clone());
    let run = coordinator.start(Some(Arc::new(TracingObserver::new()))).await?;
    let report = tokio::select! {
        report = run.wait() => report?,
        _ = cancel.cancelled() => {
            return Err(WalletError::Cancelled("wallet sync".to_string()));
        }
    };
    info!("{}", report.status_line());

    let (connection, err) = backend.connection_info().await;
    if let Some(e) = err {
        warn!("Connection info incomplete: {}", e);
    }
    info!(
        "Network {}, block {}, {} peers",
        connection.network_type, connection.latest_block, connection.peers_connected
    );

    let page = next_page(&backend, &cancel, HistoryCursor::START, config.history_page_size).await?;
    for tx in &page.transactions {
        let (confirmations, status) = tx.confirmations(connection.latest_block, config.required_confirmations);
        info!(
            "{} {:?} {} ({} confirmations, {:?})",
            tx.hash,
            tx.direction,
            format_coin_amount(tx.amount, COIN_DECIMALS),
            confirmations,
            status
        );
    }
    if let Some(next) = page.next_cursor {
        info!("More history from {}", next);
    }

    Ok(())
}
