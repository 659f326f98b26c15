//! Reconnecting live-update receiver.
//!
//! Keeps one connection to the Broadcast Hub open. When the connection drops
//! or cannot be established, the next attempt is made after a fixed delay.
//! The most recent decoded message is kept in a single slot that every new
//! message overwrites.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use trackpro_core::LiveMessage;

use crate::error::{ClientError, ClientResult};

/// Configuration for the live-update receiver.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// WebSocket endpoint of the hub.
    pub url: String,
    /// Fixed wait between a disconnect and the next connection attempt.
    pub reconnect_delay: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:5000/ws".to_string(),
            reconnect_delay: Duration::from_secs(8),
        }
    }
}

/// Connection lifecycle of a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// An established transport as a pair of text-frame channels.
///
/// The transport is closed once `inbound` yields `None`. Dropping
/// `outbound` closes it from the client side.
pub struct Connection {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

/// Opens transports to the hub.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> ClientResult<Connection>;
}

/// Callbacks driven by the receiver.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Called for every decoded message, after it lands in the slot.
    async fn on_message(&self, msg: &LiveMessage);

    async fn on_connect(&self) {}

    async fn on_disconnect(&self) {}
}

/// Default limit on the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`Connector`] over `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    /// An attempt still pending after this long fails, so the receiver
    /// falls back to its reconnect delay.
    pub connect_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> ClientResult<Connection> {
        let url = Url::parse(url)?;
        let (stream, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url.as_str()))
                .await
                .map_err(|_| ClientError::ConnectTimeout(self.connect_timeout))??;
        let (mut write, mut read) = stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    debug!(error = %e, "WebSocket write failed");
                    return;
                }
            }
            let _ = write.send(Message::Close(None)).await;
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if in_tx.send(text.to_string()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        debug!(?frame, "Received close frame");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "WebSocket read failed");
                        break;
                    }
                }
            }
        });

        Ok(Connection {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    last_message: watch::Sender<Option<LiveMessage>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl Shared {
    fn set_outbound(&self, outbound: Option<mpsc::UnboundedSender<String>>) {
        let mut slot = self.outbound.lock().unwrap_or_else(|p| p.into_inner());
        *slot = outbound;
    }
}

/// Builder for a running receiver.
pub struct LiveReceiver<C: Connector> {
    config: ReceiverConfig,
    connector: C,
    handler: Option<Arc<dyn MessageHandler>>,
}

impl<C: Connector> LiveReceiver<C> {
    pub fn new(config: ReceiverConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            handler: None,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Start connecting in the background.
    pub fn start(self) -> ReceiverHandle {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (last_message, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            state,
            last_message,
            outbound: Mutex::new(None),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run(
            self.connector,
            self.config,
            self.handler,
            shared.clone(),
            shutdown_rx,
        ));

        ReceiverHandle {
            shared,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Control surface of a running receiver.
pub struct ReceiverHandle {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReceiverHandle {
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// The most recently received message, if any.
    pub fn last_message(&self) -> Option<LiveMessage> {
        self.shared.last_message.borrow().clone()
    }

    /// Watch the last-message slot.
    pub fn watch_messages(&self) -> watch::Receiver<Option<LiveMessage>> {
        self.shared.last_message.subscribe()
    }

    /// Serialize and send `payload`. Returns `false` without queuing
    /// anything unless currently connected.
    pub fn send_message<T: Serialize>(&self, payload: &T) -> bool {
        match self.try_send(payload) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Message not sent");
                false
            }
        }
    }

    fn try_send<T: Serialize>(&self, payload: &T) -> ClientResult<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let json = serde_json::to_string(payload)?;
        let outbound = self.shared.outbound.lock().unwrap_or_else(|p| p.into_inner());
        match outbound.as_ref() {
            Some(tx) => tx.send(json).map_err(|_| ClientError::NotConnected),
            None => Err(ClientError::NotConnected),
        }
    }

    /// Close the connection and cancel any pending reconnect.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

async fn run<C: Connector>(
    connector: C,
    config: ReceiverConfig,
    handler: Option<Arc<dyn MessageHandler>>,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        shared.state.send_replace(ConnectionState::Connecting);
        debug!(url = %config.url, "Connecting to live updates");

        let attempt = tokio::select! {
            attempt = connector.connect(&config.url) => attempt,
            _ = shutdown.changed() => break,
        };

        match attempt {
            Ok(connection) => {
                shared.set_outbound(Some(connection.outbound));
                shared.state.send_replace(ConnectionState::Connected);
                info!(url = %config.url, "Live updates connected");
                if let Some(handler) = &handler {
                    handler.on_connect().await;
                }

                let stopped = pump(connection.inbound, &shared, handler.as_deref(), &mut shutdown).await;

                shared.set_outbound(None);
                shared.state.send_replace(ConnectionState::Disconnected);
                if let Some(handler) = &handler {
                    handler.on_disconnect().await;
                }
                if stopped {
                    break;
                }
            }
            Err(e) => {
                shared.state.send_replace(ConnectionState::Disconnected);
                warn!(url = %config.url, error = %e, "Live updates connection failed");
            }
        }

        info!(delay = ?config.reconnect_delay, "Reconnecting to live updates");
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    shared.set_outbound(None);
    shared.state.send_replace(ConnectionState::Disconnected);
    debug!("Live updates receiver stopped");
}

/// Deliver inbound frames until the transport closes (`false`) or shutdown
/// is requested (`true`).
async fn pump(
    mut inbound: mpsc::UnboundedReceiver<String>,
    shared: &Shared,
    handler: Option<&dyn MessageHandler>,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        tokio::select! {
            frame = inbound.recv() => {
                let Some(text) = frame else {
                    info!("Live updates disconnected");
                    return false;
                };
                match serde_json::from_str::<LiveMessage>(&text) {
                    Ok(msg) => {
                        debug!(kind = %msg.kind(), "Live message received");
                        shared.last_message.send_replace(Some(msg.clone()));
                        if let Some(handler) = handler {
                            handler.on_message(&msg).await;
                        }
                    }
                    Err(e) => warn!(error = %e, "Dropped undecodable live message"),
                }
            }
            _ = shutdown.changed() => return true,
        }
    }
}
