/// Fixed-interval analytics poller
///
/// Every tick issues the spread, signal-quality and trade-allowed requests
/// one after another and forwards each result as soon as it arrives. A
/// failing request ends that tick early. Ticks run as independent tasks, so
/// a slow or hung tick never holds back the ones scheduled after it.

use std::sync::Arc;
use std::time::Duration;

use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::shared::api::AnalyticsApi;
use crate::shared::config::TerminalConfig;
use crate::shared::error::ApiError;
use crate::shared::shutdown::shutdown_requested;
use crate::shared::types::{SignalResponse, SpreadResponse, TradeAllowedResponse};

/// Result forwarded to the view-model
#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    Spread(SpreadResponse),
    SignalQuality(SignalResponse),
    TradeAllowed(TradeAllowedResponse),
}

/// Periodic spread / signal-quality / trade-allowed queries for one pair
#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn AnalyticsApi>,
    symbol_y: String,
    symbol_x: String,
    window: u32,
    interval: Duration,
}

impl Poller {
    pub fn new(api: Arc<dyn AnalyticsApi>, config: &TerminalConfig) -> Self {
        Self {
            api,
            symbol_y: config.symbol_y.clone(),
            symbol_x: config.symbol_x.clone(),
            window: config.window,
            // tokio intervals reject a zero period
            interval: config.poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single polling tick
    pub async fn poll_once<F>(&self, on_update: &mut F) -> Result<(), ApiError>
    where
        F: FnMut(PollUpdate),
    {
        let spread = self
            .api
            .fetch_spread(&self.symbol_y, &self.symbol_x, self.window)
            .await?;
        on_update(PollUpdate::Spread(spread));

        let quality = self
            .api
            .fetch_signal_quality(&self.symbol_y, &self.symbol_x)
            .await?;
        on_update(PollUpdate::SignalQuality(quality));

        let trade = self
            .api
            .fetch_trade_allowed(&self.symbol_y, &self.symbol_x)
            .await?;
        on_update(PollUpdate::TradeAllowed(trade));

        Ok(())
    }

    /// Start polling on the tokio runtime
    ///
    /// The first tick fires one interval after the call. Ticks may overlap
    /// when a request takes longer than the interval, so `on_update` can be
    /// called from several ticks concurrently.
    pub fn spawn<F>(self, on_update: F) -> PollerHandle
    where
        F: Fn(PollUpdate) + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_poll_loop(self, on_update, shutdown_rx));

        PollerHandle { shutdown_tx, task }
    }
}

/// Handle to a running poller
///
/// Dropping the handle stops the poller.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop polling; ticks in flight are aborted and their results dropped
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poll loop to exit, without stopping it
    pub async fn stopped(self) {
        let PollerHandle { shutdown_tx, task } = self;
        if let Err(e) = task.await {
            error!("Poller task failed: {}", e);
        }
        drop(shutdown_tx);
    }
}

async fn run_poll_loop<F>(poller: Poller, on_update: F, mut shutdown_rx: watch::Receiver<bool>)
where
    F: Fn(PollUpdate) + Send + Sync + 'static,
{
    info!(
        "Starting analytics poller for {}/{} every {:?}",
        poller.symbol_y, poller.symbol_x, poller.interval
    );

    let poller = Arc::new(poller);
    let on_update = Arc::new(on_update);
    let mut ticks: JoinSet<Result<(), ApiError>> = JoinSet::new();

    let mut ticker = interval_at(Instant::now() + poller.interval, poller.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown_rx) => break,
            Some(joined) = ticks.join_next() => match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_transport() => warn!("Polling error (backend unreachable): {}", e),
                Ok(Err(e)) => warn!("Polling error: {}", e),
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!("Polling tick failed: {}", e),
            },
            _ = ticker.tick() => {
                let poller = Arc::clone(&poller);
                let on_update = Arc::clone(&on_update);
                let stop_rx = shutdown_rx.clone();
                ticks.spawn(async move {
                    // A result landing between stop() and the abort is dropped here
                    poller
                        .poll_once(&mut |update| {
                            if !*stop_rx.borrow() {
                                (*on_update)(update);
                            }
                        })
                        .await
                });
            }
        }
    }

    if !ticks.is_empty() {
        debug!("Abandoning {} in-flight polling tick(s)", ticks.len());
    }
    ticks.abort_all();
    while ticks.join_next().await.is_some() {}

    info!("Analytics poller stopped");
}
