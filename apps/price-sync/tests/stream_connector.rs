//! Stream Connector Integration Tests
//!
//! Runs an in-process WebSocket server and verifies that the connector
//! pumps decoded frames into the store, discards unusable frames, and
//! releases its connection when the handle is closed.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use price_sync::{FrameSink, PhaseCell, PriceStore, ProductId, StreamConnector, SyncPhase, WsStreamConnector};

/// Events observed by the test server.
enum ServerEvent {
    ClientConnected,
    ClientGone,
}

/// One-connection WebSocket server that sends the given frames on connect.
async fn spawn_server(frames: Vec<String>) -> (String, mpsc::Receiver<ServerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (event_tx, event_rx) = mpsc::channel(8);

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        event_tx.send(ServerEvent::ClientConnected).await.unwrap();

        for frame in frames {
            ws.send(Message::Text(frame.into())).await.unwrap();
        }

        // Hold the connection open until the client goes away
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
        let _ = event_tx.send(ServerEvent::ClientGone).await;
    });

    (format!("ws://{addr}"), event_rx)
}

fn sink_for(store: &Arc<PriceStore>, phase: &Arc<PhaseCell>) -> FrameSink {
    FrameSink::new(Arc::clone(store), Arc::clone(phase))
}

async fn wait_for_paise(store: &PriceStore, id: &ProductId, paise: i64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if store
            .entry(id)
            .and_then(|e| e.snapshot)
            .is_some_and(|s| s.display_paise == paise)
        {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {paise} paise"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn frames_flow_into_store() {
    let id = ProductId::from("sku-1");
    let (base, mut events) = spawn_server(vec![
        r#"{"type": "price_update", "product_id": "sku-1", "display_paise": 49900}"#.to_string(),
        r#"{"type": "price_update", "product_id": "sku-1", "display_paise": 48500}"#.to_string(),
    ])
    .await;

    let store = Arc::new(PriceStore::default());
    store.ensure(&id);
    let phase = Arc::new(PhaseCell::new());

    let connector = WsStreamConnector::new(base);
    let _handle = connector.open(&id, sink_for(&store, &phase));

    assert!(matches!(
        events.recv().await,
        Some(ServerEvent::ClientConnected)
    ));
    wait_for_paise(&store, &id, 48500).await;
    assert_eq!(phase.get(), SyncPhase::Streaming);
    assert_eq!(store.display_rupees(&id), Some(Decimal::new(48500, 2)));
}

#[tokio::test]
async fn unusable_frames_are_ignored() {
    let id = ProductId::from("sku-1");
    let (base, mut events) = spawn_server(vec![
        "not json".to_string(),
        r#"{"type": "heartbeat"}"#.to_string(),
        r#"{"type": "price_update", "product_id": "sku-2", "display_paise": 11111}"#.to_string(),
        r#"{"type": "price_update", "product_id": "sku-1", "display_paise": 42000}"#.to_string(),
    ])
    .await;

    let store = Arc::new(PriceStore::default());
    store.ensure(&id);
    let phase = Arc::new(PhaseCell::new());

    let connector = WsStreamConnector::new(base);
    let _handle = connector.open(&id, sink_for(&store, &phase));

    assert!(matches!(
        events.recv().await,
        Some(ServerEvent::ClientConnected)
    ));
    // Only the final well-formed frame for sku-1 lands
    wait_for_paise(&store, &id, 42000).await;
}

#[tokio::test]
async fn closing_handle_releases_connection() {
    let id = ProductId::from("sku-1");
    let (base, mut events) = spawn_server(vec![
        r#"{"type": "price_update", "product_id": "sku-1", "display_paise": 100}"#.to_string(),
    ])
    .await;

    let store = Arc::new(PriceStore::default());
    store.ensure(&id);
    let phase = Arc::new(PhaseCell::new());

    let connector = WsStreamConnector::new(base);
    let handle = connector.open(&id, sink_for(&store, &phase));

    assert!(matches!(
        events.recv().await,
        Some(ServerEvent::ClientConnected)
    ));
    wait_for_paise(&store, &id, 100).await;

    handle.close();

    let gone = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("server never observed disconnect");
    assert!(matches!(gone, Some(ServerEvent::ClientGone)));
}
