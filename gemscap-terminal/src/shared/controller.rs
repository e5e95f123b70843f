/// Terminal controller
///
/// Owns the view-model and the lifecycle of the two client tasks. Mounting
/// starts the tick feed for `symbol_y` and the analytics poller; both write
/// into a `watch` channel that display code subscribes to.

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info};

use crate::shared::api::{AnalyticsApi, AnalyticsClient};
use crate::shared::config::TerminalConfig;
use crate::shared::poller::{PollUpdate, Poller, PollerHandle};
use crate::shared::state::TerminalState;
use crate::shared::websocket::{
    FeedConnector, TickFeed, TickFeedConfig, TickFeedHandle, WsConnector,
};

pub struct Terminal {
    config: TerminalConfig,
    connector: Arc<dyn FeedConnector>,
    api: Arc<dyn AnalyticsApi>,
}

impl Terminal {
    /// Terminal talking to the configured backend over WebSocket and HTTP
    pub fn new(config: TerminalConfig) -> Self {
        let api = AnalyticsClient::new(config.backend_url.clone())
            .with_timeout(config.request_timeout);
        Self::with_transports(config, Arc::new(WsConnector), Arc::new(api))
    }

    pub fn with_transports(
        config: TerminalConfig,
        connector: Arc<dyn FeedConnector>,
        api: Arc<dyn AnalyticsApi>,
    ) -> Self {
        Self {
            config,
            connector,
            api,
        }
    }

    pub fn config(&self) -> &TerminalConfig {
        &self.config
    }

    /// Start the tick feed and the poller
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(&self) -> MountedTerminal {
        info!(
            "Mounting terminal for {}/{}",
            self.config.symbol_y, self.config.symbol_x
        );

        let state_tx = Arc::new(watch::Sender::new(TerminalState::default()));

        let feed = TickFeed::with_connector(
            TickFeedConfig::from(&self.config),
            Arc::clone(&self.connector),
        );
        let feed = {
            let state_tx = Arc::clone(&state_tx);
            feed.connect(&self.config.symbol_y, move |tick| {
                state_tx.send_if_modified(|state| state.apply_ticker(&tick));
            })
        };

        let status_task = {
            let state_tx = Arc::clone(&state_tx);
            let mut status_rx = feed.status();
            tokio::spawn(async move {
                loop {
                    let status = *status_rx.borrow_and_update();
                    state_tx.send_if_modified(|state| state.apply_connection(status));
                    if status_rx.changed().await.is_err() {
                        break;
                    }
                }
            })
        };

        let poller = {
            let state_tx = Arc::clone(&state_tx);
            Poller::new(Arc::clone(&self.api), &self.config).spawn(move |update| match update {
                PollUpdate::Spread(spread) => {
                    state_tx.send_if_modified(|state| state.apply_spread(&spread));
                }
                PollUpdate::SignalQuality(quality) => {
                    debug!(quality = %quality.quality, "Signal quality fetched");
                }
                PollUpdate::TradeAllowed(trade) => {
                    state_tx.send_if_modified(|state| state.apply_trade_allowed(&trade));
                }
            })
        };

        MountedTerminal {
            state_tx,
            feed,
            poller,
            status_task,
        }
    }
}

/// A running terminal
///
/// Dropping it stops both client tasks, as does [`MountedTerminal::unmount`].
pub struct MountedTerminal {
    state_tx: Arc<watch::Sender<TerminalState>>,
    feed: TickFeedHandle,
    poller: PollerHandle,
    status_task: JoinHandle<()>,
}

impl MountedTerminal {
    /// Receiver notified on every view-model change
    pub fn subscribe(&self) -> watch::Receiver<TerminalState> {
        self.state_tx.subscribe()
    }

    /// Copy of the current view-model
    pub fn snapshot(&self) -> TerminalState {
        self.state_tx.borrow().clone()
    }

    /// Stop the tick feed and the poller and wait for both to exit
    pub async fn unmount(self) {
        let MountedTerminal {
            state_tx,
            feed,
            poller,
            status_task,
        } = self;

        feed.close();
        poller.stop();
        feed.closed().await;
        poller.stopped().await;
        if let Err(e) = status_task.await {
            error!("Connection status task failed: {}", e);
        }

        info!("Terminal unmounted");
        drop(state_tx);
    }
}
