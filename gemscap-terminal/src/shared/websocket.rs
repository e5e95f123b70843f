/// WebSocket client for the backend tick stream
///
/// Connects to `<ws-base>/ws/ticks/<symbol>`, decodes every text frame into a
/// [`TickerMessage`] and hands it to a callback. The connection is
/// re-established after a fixed delay whenever it drops, until the returned
/// [`TickFeedHandle`] is closed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use tokio::{sync::watch, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::shared::config::{TerminalConfig, DEFAULT_RECONNECT_DELAY, DEFAULT_WS_URL};
use crate::shared::error::FeedError;
use crate::shared::shutdown::shutdown_requested;
use crate::shared::types::TickerMessage;

/// Tick feed configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TickFeedConfig {
    /// WebSocket base URL, without the `/ws/ticks/<symbol>` path
    pub url: String,
    /// Reconnect after the connection drops
    pub reconnect: bool,
    /// Reconnection delay after disconnect
    pub reconnect_delay: Duration,
}

impl Default for TickFeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            reconnect: true,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

impl TickFeedConfig {
    /// Create a new configuration with custom base URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Enable or disable reconnection
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Stream URL for a symbol
    pub fn url_for(&self, symbol: &str) -> String {
        format!("{}/ws/ticks/{}", self.url.trim_end_matches('/'), symbol)
    }
}

impl From<&TerminalConfig> for TickFeedConfig {
    fn from(config: &TerminalConfig) -> Self {
        Self::new(config.ws_url.clone())
            .with_reconnect(config.reconnect)
            .with_reconnect_delay(config.reconnect_delay)
    }
}

/// Connection status updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    /// The handle was closed; no further attempts will be made
    Closed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport-neutral frame delivered by a [`FeedConnector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFrame {
    Text(String),
    Close,
    /// Ping, pong and binary frames
    Other,
}

pub type FrameStream = BoxStream<'static, Result<FeedFrame, FeedError>>;

/// Opens streaming connections for the tick feed
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<FrameStream, FeedError>;
}

/// [`FeedConnector`] backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl FeedConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream, FeedError> {
        let (ws_stream, _) = connect_async(url).await.map_err(|e| FeedError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let frames = ws_stream.map(|msg| match msg {
            Ok(Message::Text(text)) => Ok(FeedFrame::Text(text.as_str().to_owned())),
            Ok(Message::Close(_)) => Ok(FeedFrame::Close),
            // Heartbeats are answered by tungstenite itself
            Ok(_) => Ok(FeedFrame::Other),
            Err(e) => Err(FeedError::from(e)),
        });

        Ok(frames.boxed())
    }
}

/// Reconnecting tick feed client
#[derive(Clone)]
pub struct TickFeed {
    config: TickFeedConfig,
    connector: Arc<dyn FeedConnector>,
}

impl TickFeed {
    /// Create a new tick feed backed by a real WebSocket connection
    pub fn new(config: TickFeedConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Create a new tick feed with a custom transport
    pub fn with_connector(config: TickFeedConfig, connector: Arc<dyn FeedConnector>) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &TickFeedConfig {
        &self.config
    }

    /// Start streaming ticks for `symbol`
    ///
    /// `on_message` runs on the feed task for every decoded frame. Must be
    /// called from within a tokio runtime.
    pub fn connect<F>(&self, symbol: &str, on_message: F) -> TickFeedHandle
    where
        F: FnMut(TickerMessage) + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);

        let task = tokio::spawn(run_feed_loop(
            Arc::clone(&self.connector),
            self.config.clone(),
            self.config.url_for(symbol),
            on_message,
            status_tx,
            shutdown_rx,
        ));

        TickFeedHandle {
            shutdown_tx,
            status_rx,
            task,
        }
    }
}

/// Handle to a running tick feed
///
/// Dropping the handle has the same effect as [`TickFeedHandle::close`].
#[derive(Debug)]
pub struct TickFeedHandle {
    shutdown_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<ConnectionStatus>,
    task: JoinHandle<()>,
}

impl TickFeedHandle {
    /// Drop the live connection and suppress any further reconnect
    pub fn close(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Receiver for connection status updates
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// True once the feed loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the feed loop to exit, without closing it
    pub async fn closed(self) {
        let TickFeedHandle {
            shutdown_tx, task, ..
        } = self;
        if let Err(e) = task.await {
            error!("Tick feed task failed: {}", e);
        }
        drop(shutdown_tx);
    }
}

/// Main connection loop with auto-reconnect
async fn run_feed_loop<F>(
    connector: Arc<dyn FeedConnector>,
    config: TickFeedConfig,
    url: String,
    mut on_message: F,
    status_tx: watch::Sender<ConnectionStatus>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    F: FnMut(TickerMessage) + Send + 'static,
{
    info!("Starting tick feed for {}", url);

    'session: loop {
        status_tx.send_replace(ConnectionStatus::Connecting);

        let connected = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown_rx) => break 'session,
            result = connector.connect(&url) => result,
        };

        match connected {
            Ok(mut frames) => {
                info!("Connected to tick feed at {}", url);
                status_tx.send_replace(ConnectionStatus::Connected);

                loop {
                    let frame = tokio::select! {
                        biased;
                        _ = shutdown_requested(&mut shutdown_rx) => break 'session,
                        frame = frames.next() => frame,
                    };

                    match frame {
                        Some(Ok(FeedFrame::Text(text))) => {
                            match serde_json::from_str::<TickerMessage>(&text) {
                                Ok(tick) => on_message(tick),
                                Err(e) => {
                                    error!("Invalid tick message: {}", e);
                                    debug!("Raw message: {}", text);
                                }
                            }
                        }
                        Some(Ok(FeedFrame::Close)) => {
                            warn!("Tick feed closed by server: {}", url);
                            break;
                        }
                        Some(Ok(FeedFrame::Other)) => {}
                        Some(Err(e)) => {
                            error!("Tick feed error: {}", e);
                            break;
                        }
                        None => {
                            warn!("Tick feed stream ended: {}", url);
                            break;
                        }
                    }
                }

                status_tx.send_replace(ConnectionStatus::Disconnected);
            }
            Err(e) => {
                error!("{}", e);
                status_tx.send_replace(ConnectionStatus::Disconnected);
            }
        }

        if !config.reconnect {
            info!("Reconnect disabled, tick feed for {} stopped", url);
            return;
        }

        debug!(
            "Waiting {:?} before reconnecting...",
            config.reconnect_delay
        );
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown_rx) => break 'session,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }

    info!("Tick feed for {} closed", url);
    status_tx.send_replace(ConnectionStatus::Closed);
}
