//! Connected-client registry and per-connection WebSocket lifecycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use courier_core::{ClientFrame, ClientId, DeliveryError};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::relay::Relay;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// A connected relay client: its id, its outbound frame queue, and the
/// liveness state the heartbeat sweep reads.
pub struct Client {
    pub id: ClientId,
    tx: mpsc::Sender<String>,
    connected: AtomicBool,
    last_pong: AtomicU64,
}

impl Client {
    fn new(id: ClientId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected: AtomicBool::new(true),
            last_pong: AtomicU64::new(now_secs()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Returns whether this call performed the Connected → Disconnected
    /// transition (false if some other signal already did).
    fn mark_disconnected(&self) -> bool {
        self.connected.swap(false, Ordering::Relaxed)
    }

    pub fn record_pong(&self) {
        self.last_pong.store(now_secs(), Ordering::Relaxed);
    }

    pub fn is_alive(&self) -> bool {
        let last = self.last_pong.load(Ordering::Relaxed);
        now_secs().saturating_sub(last) < CLIENT_TIMEOUT.as_secs()
    }

    /// Queue a frame for this client without blocking. A stalled client
    /// fills its own queue and starts shedding frames; it never delays
    /// the caller.
    pub fn push(&self, frame: String) -> Result<(), DeliveryError> {
        if !self.is_connected() {
            return Err(DeliveryError::TransportClosed);
        }
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(DeliveryError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeliveryError::TransportClosed),
        }
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Registry of currently connected clients.
///
/// Membership invariant: an id is present exactly while its connection is
/// open: inserted on upgrade, removed on the first close/error/timeout
/// signal. The WebSocket task is the only mutator.
pub struct ClientRegistry {
    clients: DashMap<ClientId, Arc<Client>>,
    max_send_queue: usize,
}

impl ClientRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            clients: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register a new connection: fresh id plus the receiving end of its
    /// outbound queue.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<String>) {
        let id = ClientId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        let client = Arc::new(Client::new(id.clone(), tx));
        self.clients.insert(id.clone(), client);
        (id, rx)
    }

    /// Remove a client. Idempotent: repeated disconnect signals for the
    /// same id collapse into a single removal, and the return value tells
    /// the caller whether this call was the one that removed it.
    pub fn unregister(&self, id: &ClientId) -> bool {
        if let Some((_, client)) = self.clients.remove(id) {
            client.mark_disconnected();
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: &ClientId) -> Option<Arc<Client>> {
        self.clients.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    /// Queue a frame for one client.
    pub fn send_to(&self, id: &ClientId, frame: String) -> Result<(), DeliveryError> {
        let client = self.get(id).ok_or(DeliveryError::UnknownRecipient)?;
        client.push(frame)
    }

    /// Point-in-time snapshot of every client other than `except`, in
    /// unspecified order. Broadcasts iterate the snapshot: a client
    /// joining mid-broadcast is not included, and a client leaving
    /// mid-broadcast fails only its own delivery.
    pub fn snapshot_except(&self, except: &ClientId) -> Vec<Arc<Client>> {
        self.clients
            .iter()
            .filter(|entry| entry.key() != except)
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of connected clients.
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Drop clients whose transport went silent past the pong timeout.
    pub fn sweep_dead_clients(&self) -> usize {
        let dead: Vec<ClientId> = self
            .clients
            .iter()
            .filter(|entry| !entry.value().is_alive())
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for id in dead {
            if self.unregister(&id) {
                removed += 1;
                tracing::info!(client_id = %id, "Dropped unresponsive client");
            }
        }
        removed
    }
}

/// Drive one WebSocket connection through its lifecycle.
///
/// Registration already happened in the upgrade handler; this runs the
/// reader/writer pair and deregisters exactly once on the first
/// close/error/timeout signal from either side.
pub async fn handle_socket(
    socket: WebSocket,
    client_id: ClientId,
    mut rx: mpsc::Receiver<String>,
    registry: Arc<ClientRegistry>,
    relay: Arc<Relay>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer task: drain the outbound queue into the socket + heartbeat.
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Some(text) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Reader task: inbound frames feed the relay, pongs feed liveness.
    let reader_id = client_id.clone();
    let reader_registry = Arc::clone(&registry);
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => match serde_json::from_str::<ClientFrame>(text.as_str()) {
                    Ok(ClientFrame::SendEncryptedMessage { encrypted_message }) => {
                        relay.dispatch(&reader_id, encrypted_message);
                    }
                    Err(error) => {
                        // Blind relay: no error channel back to the sender.
                        tracing::debug!(client_id = %reader_id, %error, "Dropped unparseable frame");
                    }
                },
                WsMessage::Pong(_) => {
                    if let Some(client) = reader_registry.get(&reader_id) {
                        client.record_pong();
                    }
                }
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) => {} // axum replies automatically
                _ => {}
            }
        }
    });

    // First side to finish tears the connection down.
    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }

    if registry.unregister(&client_id) {
        tracing::info!(
            client_id = %client_id,
            remaining = registry.count(),
            "Client disconnected"
        );
    }
}

/// Background task that periodically drops unresponsive clients.
pub fn start_sweep_task(
    registry: Arc<ClientRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = registry.sweep_dead_clients();
            if removed > 0 {
                tracing::info!(removed, "Liveness sweep");
            }
        }
    })
}
