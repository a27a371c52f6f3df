mod common;

use common::{NETWORK, ScriptedDaemon, received};

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use wallet_session_sync::daemon::SpvSyncNotification;
use wallet_session_sync::transaction::{ATOMS_PER_COIN, TransactionDestination, allocate_change};
use wallet_session_sync::wallet::sync::{BroadcastHub, Packet, PacketEvent, SyncStage};
use wallet_session_sync::wallet::{
    Backend, ConfirmationStatus, ErrorKind, HistoryCursor, RemoteBackend, SessionLifecycle,
    SyncCoordinator, next_page,
};

fn backend(daemon: Arc<ScriptedDaemon>) -> Backend {
    Backend::remote(RemoteBackend::new(daemon, NETWORK))
}

#[tokio::test]
async fn test_create_open_sync_and_page_history() {
    let now = chrono::Utc::now().timestamp();
    let history: Vec<_> = (1..=45).map(|h| received(&format!("tx{}", h), h, 5_000)).collect();
    let daemon = Arc::new(
        ScriptedDaemon::new(45, history).with_notifications(vec![
            SpvSyncNotification::PeerConnected { peer_count: 3 },
            SpvSyncNotification::FetchedHeaders {
                fetched_headers_count: 5,
                last_header_time: now,
            },
            SpvSyncNotification::DiscoverAddresses { finished: true },
            SpvSyncNotification::RescanProgress { rescanned_through: 50 },
            SpvSyncNotification::Synced { synced: true },
        ]),
    );
    let backend = backend(daemon.clone());
    let session = SessionLifecycle::new(backend.clone());
    let cancel = CancellationToken::new();

    assert!(!session.open_if_exists(&cancel).await.unwrap());

    let seed = session.generate_seed().unwrap();
    session.create("correct horse", &seed).await.unwrap();
    let err = session.create("correct horse", &seed).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    // Already loaded by the daemon counts as opened
    assert!(session.open_if_exists(&cancel).await.unwrap());
    assert!(session.is_open());

    let hub = Arc::new(BroadcastHub::new(32));
    let (_client, mut frames) = hub.register();
    let coordinator = SyncCoordinator::new(backend.clone());
    coordinator.register_observer(hub.clone());

    let run = coordinator.start(None).await.unwrap();
    let report = run.wait().await.unwrap();
    assert_eq!(report.stage, SyncStage::Success);
    assert_eq!(report.connected_peers, Some(3));
    assert_eq!(daemon.hook_calls.load(Ordering::SeqCst), 2);

    let mut stages = Vec::new();
    while let Some(frame) = frames.try_recv() {
        let packet: Packet = serde_json::from_str(&frame).unwrap();
        assert_eq!(packet.event, PacketEvent::SyncProgress);
        stages.push(packet.message["stage"].as_str().unwrap().to_string());
    }
    assert_eq!(stages.first().map(String::as_str), Some("notStarted"));
    assert_eq!(stages.last().map(String::as_str), Some("success"));

    let (info, err) = backend.connection_info().await;
    assert!(err.is_none());
    assert_eq!(info.latest_block, 45);
    assert_eq!(info.peers_connected, 3);

    let mut cursor = HistoryCursor::START;
    let mut seen = HashSet::new();
    loop {
        let page = next_page(&backend, &cancel, cursor, 20).await.unwrap();
        for tx in &page.transactions {
            assert!(seen.insert(tx.hash.clone()));
        }
        match page.next_cursor {
            Some(next) => cursor = next,
            None => break,
        }
    }
    assert_eq!(seen.len(), 45);

    let newest = received("tx45", 45, 5_000);
    assert_eq!(newest.confirmations(info.latest_block, 2), (1, ConfirmationStatus::Pending));
    let oldest = received("tx1", 1, 5_000);
    assert_eq!(oldest.confirmations(info.latest_block, 2), (45, ConfirmationStatus::Confirmed));
}

#[tokio::test]
async fn test_change_allocation_through_daemon() {
    let daemon = Arc::new(ScriptedDaemon::new(10, Vec::new()));
    let backend = backend(daemon);
    let destinations = vec![TransactionDestination::new("TsPayee", 1.5)];

    let change = allocate_change(&backend, 3, 2 * ATOMS_PER_COIN, 0, 2, &destinations)
        .await
        .unwrap();
    assert_eq!(change.len(), 3);
    let total: f64 = change.iter().map(|d| d.amount).sum();
    assert!((total - 2.0).abs() < 1e-8);
    let addresses: HashSet<&String> = change.iter().map(|d| &d.address).collect();
    assert_eq!(addresses.len(), 3);
}
