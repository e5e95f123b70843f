/// Core data types for backend messages
///
/// These types match the JSON payloads served by the analytics backend:
/// the REST endpoints under `/analytics` and `/alert`, and the tick stream
/// at `/ws/ticks/<symbol>`.

use serde::{Deserialize, Serialize};

/// One streaming price update for a trading symbol
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TickerMessage {
    /// Last traded price
    pub price: f64,
    /// Session high
    pub high: f64,
    /// Session low
    pub low: f64,
    /// Traded volume
    pub volume: f64,
    /// Percentage change
    pub change: f64,
}

/// A single point of the spread series
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpreadPoint {
    /// Server timestamp, passed through untouched
    pub ts: String,
    pub spread: f64,
    pub zscore: f64,
}

/// Response of `GET /analytics/spread`
///
/// Points are ordered by time; consumers only look at the last one.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SpreadResponse {
    #[serde(default)]
    pub data: Vec<SpreadPoint>,
    #[serde(default)]
    pub half_life: Option<f64>,
}

impl SpreadResponse {
    /// Most recent spread point, if any
    pub fn latest(&self) -> Option<&SpreadPoint> {
        self.data.last()
    }
}

/// Server-side grading of the pair signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalQuality {
    High,
    Medium,
    Low,
}

impl SignalQuality {
    /// Convert to display string
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalQuality::High => "HIGH",
            SignalQuality::Medium => "MEDIUM",
            SignalQuality::Low => "LOW",
        }
    }
}

impl std::fmt::Display for SignalQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response of `GET /analytics/signal-quality`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SignalResponse {
    pub quality: SignalQuality,
    pub stationary: bool,
    #[serde(default)]
    pub correlation: Option<f64>,
    pub hedge_ratio_stable: bool,
    pub liquidity_ok: bool,
}

/// Response of `GET /analytics/trade-allowed`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TradeAllowedResponse {
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub warnings: Option<Vec<String>>,
}

/// Diagnostic endpoints answer `{"error": "..."}` with a 200 status while
/// the backend is still accumulating ticks
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BackendReply<T> {
    Ready(T),
    Unavailable { error: String },
}

impl<T> BackendReply<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            BackendReply::Ready(value) => Some(value),
            BackendReply::Unavailable { .. } => None,
        }
    }
}

/// Response of `GET /alert/zscore`
///
/// `value` and `threshold` are only sent when the alert fires.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ZScoreAlert {
    pub triggered: bool,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// One point of `GET /analytics/hedge_ratio`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HedgeRatioPoint {
    pub ts: String,
    pub hedge_ratio: f64,
}

/// p-value below which the spread counts as stationary
pub const ADF_SIGNIFICANCE: f64 = 0.05;

/// Response of `GET /analytics/adf`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AdfResult {
    pub adf_stat: f64,
    pub p_value: f64,
}

impl AdfResult {
    /// Spread is likely mean-reverting
    pub fn is_stationary(&self) -> bool {
        self.p_value < ADF_SIGNIFICANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_message_decode() {
        let text = r#"{"price":64000.5,"high":65000,"low":63000.25,"volume":1234.5,"change":-1.2}"#;
        let msg: TickerMessage = serde_json::from_str(text).unwrap();

        assert_eq!(msg.price, 64000.5);
        assert_eq!(msg.high, 65000.0);
        assert_eq!(msg.change, -1.2);
    }

    #[test]
    fn test_ticker_message_rejects_missing_fields() {
        assert!(serde_json::from_str::<TickerMessage>(r#"{"price":1.0}"#).is_err());
        assert!(serde_json::from_str::<TickerMessage>(r#"{"price":"abc","high":1,"low":1,"volume":1,"change":1}"#).is_err());
    }

    #[test]
    fn test_spread_response_null_half_life() {
        let resp: SpreadResponse =
            serde_json::from_str(r#"{"data":[],"half_life":null}"#).unwrap();
        assert!(resp.data.is_empty());
        assert!(resp.half_life.is_none());
        assert!(resp.latest().is_none());
    }

    #[test]
    fn test_spread_response_latest_point() {
        let text = r#"{
            "data": [
                {"ts":"2024-01-01T00:00:00","spread":1.0,"zscore":0.1},
                {"ts":"2024-01-01T00:00:01","spread":2.0,"zscore":0.2}
            ],
            "half_life": 12.5
        }"#;
        let resp: SpreadResponse = serde_json::from_str(text).unwrap();

        let last = resp.latest().unwrap();
        assert_eq!(last.ts, "2024-01-01T00:00:01");
        assert_eq!(last.spread, 2.0);
        assert_eq!(resp.half_life, Some(12.5));
    }

    #[test]
    fn test_signal_response_decode() {
        let text = r#"{"quality":"MEDIUM","stationary":true,"correlation":null,"hedge_ratio_stable":false,"liquidity_ok":true}"#;
        let resp: SignalResponse = serde_json::from_str(text).unwrap();

        assert_eq!(resp.quality, SignalQuality::Medium);
        assert_eq!(resp.quality.to_string(), "MEDIUM");
        assert!(resp.correlation.is_none());
        assert!(!resp.hedge_ratio_stable);
    }

    #[test]
    fn test_trade_allowed_optional_fields() {
        let resp: TradeAllowedResponse = serde_json::from_str(r#"{"allowed":false}"#).unwrap();
        assert!(!resp.allowed);
        assert!(resp.reason.is_none());
        assert!(resp.warnings.is_none());

        let resp: TradeAllowedResponse = serde_json::from_str(
            r#"{"allowed":true,"warnings":["wide spread"]}"#,
        )
        .unwrap();
        assert!(resp.allowed);
        assert_eq!(resp.warnings, Some(vec!["wide spread".to_string()]));
    }

    #[test]
    fn test_zscore_alert_replies() {
        let reply: BackendReply<Option<ZScoreAlert>> =
            serde_json::from_str(r#"{"triggered":true,"value":-2.41,"threshold":2.0}"#).unwrap();
        let alert = reply.ready().flatten().unwrap();
        assert!(alert.triggered);
        assert_eq!(alert.value, Some(-2.41));

        let reply: BackendReply<Option<ZScoreAlert>> =
            serde_json::from_str(r#"{"triggered":false}"#).unwrap();
        assert_eq!(
            reply,
            BackendReply::Ready(Some(ZScoreAlert {
                triggered: false,
                value: None,
                threshold: None,
            }))
        );

        // No z-score computed yet
        let reply: BackendReply<Option<ZScoreAlert>> = serde_json::from_str("null").unwrap();
        assert_eq!(reply, BackendReply::Ready(None));

        let reply: BackendReply<Option<ZScoreAlert>> =
            serde_json::from_str(r#"{"error":"Waiting for more data"}"#).unwrap();
        assert_eq!(
            reply,
            BackendReply::Unavailable {
                error: "Waiting for more data".to_string()
            }
        );
    }

    #[test]
    fn test_hedge_ratio_replies() {
        let reply: BackendReply<Vec<HedgeRatioPoint>> = serde_json::from_str(
            r#"[{"ts":"2024-01-01 00:00:00","hedge_ratio":17.2},{"ts":"2024-01-01 00:00:01","hedge_ratio":17.4}]"#,
        )
        .unwrap();
        let points = reply.ready().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].hedge_ratio, 17.4);

        let reply: BackendReply<Vec<HedgeRatioPoint>> =
            serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert!(reply.ready().is_none());
    }

    #[test]
    fn test_adf_result() {
        let reply: BackendReply<AdfResult> =
            serde_json::from_str(r#"{"adf_stat":-3.9,"p_value":0.002}"#).unwrap();
        let adf = reply.ready().unwrap();
        assert!(adf.is_stationary());

        let adf = AdfResult {
            adf_stat: -1.2,
            p_value: 0.05,
        };
        assert!(!adf.is_stationary());

        assert!(serde_json::from_str::<BackendReply<AdfResult>>(r#"{"adf_stat":1.0}"#).is_err());
    }
}
