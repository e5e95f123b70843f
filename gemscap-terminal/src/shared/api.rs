/// REST client for the analytics backend
///
/// Endpoints live under `<base>/analytics` (and `<base>/alert`) and take the
/// symbol pair as query parameters. Every request is decorated with a label
/// so failures read like "Spread fetch failed: 502 Bad Gateway ...".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::shared::config::DEFAULT_BACKEND_URL;
use crate::shared::error::ApiError;
use crate::shared::types::{
    AdfResult, BackendReply, HedgeRatioPoint, SignalResponse, SpreadResponse,
    TradeAllowedResponse, ZScoreAlert,
};

pub const SPREAD_LABEL: &str = "Spread fetch";
pub const SIGNAL_QUALITY_LABEL: &str = "Signal quality fetch";
pub const TRADE_ALLOWED_LABEL: &str = "Trade allowed fetch";
pub const ZSCORE_ALERT_LABEL: &str = "Z-score alert fetch";
pub const HEDGE_RATIO_LABEL: &str = "Hedge ratio fetch";
pub const ADF_LABEL: &str = "ADF test";

/// Timeout for the on-demand diagnostic queries when none is configured
pub const DIAGNOSTICS_TIMEOUT: Duration = Duration::from_secs(5);

/// The three analytics queries issued on every polling tick
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn fetch_spread(
        &self,
        symbol_y: &str,
        symbol_x: &str,
        window: u32,
    ) -> Result<SpreadResponse, ApiError>;

    async fn fetch_signal_quality(
        &self,
        symbol_y: &str,
        symbol_x: &str,
    ) -> Result<SignalResponse, ApiError>;

    async fn fetch_trade_allowed(
        &self,
        symbol_y: &str,
        symbol_x: &str,
    ) -> Result<TradeAllowedResponse, ApiError>;
}

/// [`AnalyticsApi`] over HTTP
#[derive(Debug, Clone)]
pub struct AnalyticsClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl Default for AnalyticsClient {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

impl AnalyticsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            timeout: None,
        }
    }

    /// Apply a timeout to every request; `None` waits indefinitely
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        Ok(Url::parse(&url)?)
    }

    fn diagnostics_timeout(&self) -> Option<Duration> {
        Some(self.timeout.unwrap_or(DIAGNOSTICS_TIMEOUT))
    }

    /// GET `url` and decode the body as JSON
    async fn safe_fetch<T>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        label: &'static str,
        timeout: Option<Duration>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut request = self.client.get(url).query(query);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Request { label, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                label,
                status,
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Request { label, source })?;

        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { label, source })
    }

    /// Latest z-score checked against `threshold`
    ///
    /// `Ready(None)` means the backend has no z-score yet.
    pub async fn fetch_zscore_alert(
        &self,
        symbol_y: &str,
        symbol_x: &str,
        window: u32,
        threshold: f64,
    ) -> Result<BackendReply<Option<ZScoreAlert>>, ApiError> {
        let window = window.to_string();
        let threshold = threshold.to_string();
        self.safe_fetch(
            self.endpoint("alert/zscore")?,
            &[
                ("symbol_y", symbol_y),
                ("symbol_x", symbol_x),
                ("window", window.as_str()),
                ("threshold", threshold.as_str()),
            ],
            ZSCORE_ALERT_LABEL,
            self.diagnostics_timeout(),
        )
        .await
    }

    /// Rolling hedge ratio series, oldest first
    pub async fn fetch_hedge_ratio(
        &self,
        symbol_y: &str,
        symbol_x: &str,
        window: u32,
    ) -> Result<BackendReply<Vec<HedgeRatioPoint>>, ApiError> {
        let window = window.to_string();
        self.safe_fetch(
            self.endpoint("analytics/hedge_ratio")?,
            &[
                ("symbol_y", symbol_y),
                ("symbol_x", symbol_x),
                ("window", window.as_str()),
            ],
            HEDGE_RATIO_LABEL,
            self.diagnostics_timeout(),
        )
        .await
    }

    /// Augmented Dickey-Fuller test on the pair spread
    pub async fn fetch_adf(
        &self,
        symbol_y: &str,
        symbol_x: &str,
    ) -> Result<BackendReply<AdfResult>, ApiError> {
        self.safe_fetch(
            self.endpoint("analytics/adf")?,
            &[("symbol_y", symbol_y), ("symbol_x", symbol_x)],
            ADF_LABEL,
            self.diagnostics_timeout(),
        )
        .await
    }
}

#[async_trait]
impl AnalyticsApi for AnalyticsClient {
    async fn fetch_spread(
        &self,
        symbol_y: &str,
        symbol_x: &str,
        window: u32,
    ) -> Result<SpreadResponse, ApiError> {
        let window = window.to_string();
        self.safe_fetch(
            self.endpoint("analytics/spread")?,
            &[
                ("symbol_y", symbol_y),
                ("symbol_x", symbol_x),
                ("window", window.as_str()),
            ],
            SPREAD_LABEL,
            self.timeout,
        )
        .await
    }

    async fn fetch_signal_quality(
        &self,
        symbol_y: &str,
        symbol_x: &str,
    ) -> Result<SignalResponse, ApiError> {
        self.safe_fetch(
            self.endpoint("analytics/signal-quality")?,
            &[("symbol_y", symbol_y), ("symbol_x", symbol_x)],
            SIGNAL_QUALITY_LABEL,
            self.timeout,
        )
        .await
    }

    async fn fetch_trade_allowed(
        &self,
        symbol_y: &str,
        symbol_x: &str,
    ) -> Result<TradeAllowedResponse, ApiError> {
        self.safe_fetch(
            self.endpoint("analytics/trade-allowed")?,
            &[("symbol_y", symbol_y), ("symbol_x", symbol_x)],
            TRADE_ALLOWED_LABEL,
            self.timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let client = AnalyticsClient::new("http://localhost:8000/");
        assert_eq!(
            client.endpoint("analytics/spread").unwrap().as_str(),
            "http://localhost:8000/analytics/spread"
        );
        assert_eq!(
            client.endpoint("alert/zscore").unwrap().as_str(),
            "http://localhost:8000/alert/zscore"
        );

        let client = AnalyticsClient::new("http://backend:9000/api");
        assert_eq!(
            client.endpoint("analytics/trade-allowed").unwrap().as_str(),
            "http://backend:9000/api/analytics/trade-allowed"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let client = AnalyticsClient::new("localhost without scheme");
        assert!(matches!(client.endpoint("analytics/spread"), Err(ApiError::Url(_))));
    }

    #[test]
    fn test_default_client() {
        let client = AnalyticsClient::default();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert!(client.timeout.is_none());
    }

    #[test]
    fn test_diagnostics_timeout() {
        let client = AnalyticsClient::default();
        assert_eq!(client.diagnostics_timeout(), Some(Duration::from_secs(5)));

        let client = client.with_timeout(Some(Duration::from_millis(750)));
        assert_eq!(client.diagnostics_timeout(), Some(Duration::from_millis(750)));
    }
}
