//! Pair diagnostics: rolling hedge ratio, z-score alert and ADF test.
//!
//! These are queried on demand rather than by the poller, each with a
//! bounded timeout, and never touch the terminal view-model.

use std::fmt;

use tracing::debug;

use crate::shared::api::AnalyticsClient;
use crate::shared::config::TerminalConfig;
use crate::shared::error::ApiError;
use crate::shared::state::fixed;
use crate::shared::types::{AdfResult, BackendReply, HedgeRatioPoint, ZScoreAlert};

/// Outcome of the z-score alert check
#[derive(Debug, Clone, PartialEq)]
pub enum AlertStatus {
    /// |z| reached the threshold; `value` is the latest z-score
    Triggered { value: Option<f64> },
    Clear,
    /// Backend has not accumulated enough data yet
    Unavailable(String),
}

impl AlertStatus {
    pub fn from_reply(reply: BackendReply<Option<ZScoreAlert>>) -> Self {
        match reply {
            BackendReply::Ready(Some(alert)) if alert.triggered => AlertStatus::Triggered {
                value: alert.value,
            },
            BackendReply::Ready(Some(_)) => AlertStatus::Clear,
            BackendReply::Ready(None) => AlertStatus::Unavailable("No z-score yet".to_string()),
            BackendReply::Unavailable { error } => AlertStatus::Unavailable(error),
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, AlertStatus::Triggered { .. })
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Triggered { value: Some(value) } => {
                write!(f, "Z-score alert triggered: {}", fixed(*value, 2))
            }
            AlertStatus::Triggered { value: None } => write!(f, "Z-score alert triggered"),
            AlertStatus::Clear => write!(f, "No active alerts"),
            AlertStatus::Unavailable(reason) => write!(f, "Alert unavailable: {}", reason),
        }
    }
}

/// Outcome of the ADF stationarity test
#[derive(Debug, Clone, PartialEq)]
pub enum Stationarity {
    MeanReverting(AdfResult),
    NotStationary(AdfResult),
    /// Not enough data to run the test yet
    Unavailable(String),
}

impl Stationarity {
    pub fn from_reply(reply: BackendReply<AdfResult>) -> Self {
        match reply {
            BackendReply::Ready(adf) if adf.is_stationary() => Stationarity::MeanReverting(adf),
            BackendReply::Ready(adf) => Stationarity::NotStationary(adf),
            BackendReply::Unavailable { error } => Stationarity::Unavailable(error),
        }
    }
}

impl fmt::Display for Stationarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stationarity::MeanReverting(adf) => write!(
                f,
                "Spread is likely mean-reverting (ADF {}, p-value {})",
                fixed(adf.adf_stat, 4),
                fixed(adf.p_value, 4)
            ),
            Stationarity::NotStationary(adf) => write!(
                f,
                "Spread is NOT stationary (ADF {}, p-value {})",
                fixed(adf.adf_stat, 4),
                fixed(adf.p_value, 4)
            ),
            Stationarity::Unavailable(reason) => {
                write!(f, "Not enough data to run ADF test yet: {}", reason)
            }
        }
    }
}

/// Diagnostic queries for the configured pair
#[derive(Debug, Clone)]
pub struct PairDiagnostics {
    client: AnalyticsClient,
    symbol_y: String,
    symbol_x: String,
    window: u32,
    threshold: f64,
}

impl PairDiagnostics {
    pub fn new(client: AnalyticsClient, config: &TerminalConfig) -> Self {
        Self {
            client,
            symbol_y: config.symbol_y.clone(),
            symbol_x: config.symbol_x.clone(),
            window: config.window,
            threshold: config.zscore_threshold,
        }
    }

    /// Most recent point of the rolling hedge ratio, `None` while warming up
    pub async fn latest_hedge_ratio(&self) -> Result<Option<HedgeRatioPoint>, ApiError> {
        let reply = self
            .client
            .fetch_hedge_ratio(&self.symbol_y, &self.symbol_x, self.window)
            .await?;

        match reply {
            BackendReply::Ready(mut points) => Ok(points.pop()),
            BackendReply::Unavailable { error } => {
                debug!("Hedge ratio unavailable: {}", error);
                Ok(None)
            }
        }
    }

    pub async fn zscore_alert(&self) -> Result<AlertStatus, ApiError> {
        let reply = self
            .client
            .fetch_zscore_alert(&self.symbol_y, &self.symbol_x, self.window, self.threshold)
            .await?;
        Ok(AlertStatus::from_reply(reply))
    }

    pub async fn stationarity(&self) -> Result<Stationarity, ApiError> {
        let reply = self.client.fetch_adf(&self.symbol_y, &self.symbol_x).await?;
        Ok(Stationarity::from_reply(reply))
    }
}
