//! In-memory transports for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::time::Instant;

use crate::shared::api::AnalyticsApi;
use crate::shared::error::{ApiError, FeedError};
use crate::shared::types::{
    SignalQuality, SignalResponse, SpreadPoint, SpreadResponse, TradeAllowedResponse,
};
use crate::shared::websocket::{FeedConnector, FeedFrame, FrameStream};

/// One scripted connection attempt
pub(crate) enum Session {
    /// Connects, yields the frames, then stays open
    Open(Vec<FeedFrame>),
    /// Connects, yields the frames, then the stream ends
    Closing(Vec<FeedFrame>),
    /// Connect fails
    Fail(FeedError),
    /// Connects, then the stream errors
    Broken(FeedError),
}

impl Session {
    pub(crate) fn open(frames: Vec<FeedFrame>) -> Self {
        Session::Open(frames)
    }

    pub(crate) fn closing(frames: Vec<FeedFrame>) -> Self {
        Session::Closing(frames)
    }
}

/// Connector replaying a fixed script; once exhausted every connection stays
/// open without frames.
pub(crate) struct ScriptedConnector {
    script: Mutex<VecDeque<Session>>,
    connects: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedConnector {
    pub(crate) fn new(script: Vec<Session>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            connects: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.connects
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub(crate) fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl FeedConnector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream, FeedError> {
        self.connects
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let session = self.script.lock().unwrap().pop_front();
        match session {
            Some(Session::Open(frames)) => Ok(stream::iter(frames.into_iter().map(Ok::<_, FeedError>))
                .chain(stream::pending())
                .boxed()),
            Some(Session::Closing(frames)) => {
                Ok(stream::iter(frames.into_iter().map(Ok::<_, FeedError>)).boxed())
            }
            Some(Session::Fail(e)) => Err(e),
            Some(Session::Broken(e)) => Ok(stream::iter(vec![Err::<FeedFrame, _>(e)])
                .chain(stream::pending())
                .boxed()),
            None => Ok(stream::pending().boxed()),
        }
    }
}

pub(crate) fn status_error(label: &'static str) -> ApiError {
    ApiError::Status {
        label,
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: "internal error".to_string(),
    }
}

pub(crate) fn spread_response(points: &[(f64, f64)], half_life: Option<f64>) -> SpreadResponse {
    SpreadResponse {
        data: points
            .iter()
            .enumerate()
            .map(|(i, (spread, zscore))| SpreadPoint {
                ts: format!("2024-01-01T00:00:{:02}", i),
                spread: *spread,
                zscore: *zscore,
            })
            .collect(),
        half_life,
    }
}

pub(crate) fn signal_response() -> SignalResponse {
    SignalResponse {
        quality: SignalQuality::High,
        stationary: true,
        correlation: Some(0.91),
        hedge_ratio_stable: true,
        liquidity_ok: true,
    }
}

pub(crate) fn trade_response(allowed: bool, reason: Option<&str>) -> TradeAllowedResponse {
    TradeAllowedResponse {
        allowed,
        reason: reason.map(str::to_string),
        warnings: None,
    }
}

/// Analytics API replaying scripted results; exhausted scripts fall back to
/// an empty spread, a HIGH quality signal and an allowed trade.
#[derive(Default)]
pub(crate) struct FakeAnalytics {
    spread: Mutex<VecDeque<Result<SpreadResponse, ApiError>>>,
    signal: Mutex<VecDeque<Result<SignalResponse, ApiError>>>,
    trade: Mutex<VecDeque<Result<TradeAllowedResponse, ApiError>>>,
    latency: Duration,
    calls: Mutex<Vec<(&'static str, Instant)>>,
}

impl FakeAnalytics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_spread(mut self, results: Vec<Result<SpreadResponse, ApiError>>) -> Self {
        self.spread = Mutex::new(results.into());
        self
    }

    pub(crate) fn with_signal(mut self, results: Vec<Result<SignalResponse, ApiError>>) -> Self {
        self.signal = Mutex::new(results.into());
        self
    }

    pub(crate) fn with_trade(
        mut self,
        results: Vec<Result<TradeAllowedResponse, ApiError>>,
    ) -> Self {
        self.trade = Mutex::new(results.into());
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(name, _)| *name).collect()
    }

    pub(crate) fn call_times(&self, name: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, t)| *t)
            .collect()
    }

    async fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push((name, Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl AnalyticsApi for FakeAnalytics {
    async fn fetch_spread(
        &self,
        _symbol_y: &str,
        _symbol_x: &str,
        _window: u32,
    ) -> Result<SpreadResponse, ApiError> {
        self.record("spread").await;
        let next = self.spread.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(SpreadResponse::default()))
    }

    async fn fetch_signal_quality(
        &self,
        _symbol_y: &str,
        _symbol_x: &str,
    ) -> Result<SignalResponse, ApiError> {
        self.record("signal").await;
        let next = self.signal.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(signal_response()))
    }

    async fn fetch_trade_allowed(
        &self,
        _symbol_y: &str,
        _symbol_x: &str,
    ) -> Result<TradeAllowedResponse, ApiError> {
        self.record("trade").await;
        let next = self.trade.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(trade_response(true, None)))
    }
}
