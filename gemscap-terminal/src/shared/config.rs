/// Terminal configuration
///
/// Everything is read from environment variables with sensible local
/// defaults, the same way the tick feed and poller defaults are chosen.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000";
pub const DEFAULT_SYMBOL_Y: &str = "btcusdt";
pub const DEFAULT_SYMBOL_X: &str = "ethusdt";
pub const DEFAULT_SPREAD_WINDOW: u32 = 50;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 2.0;
pub const DEFAULT_DIAGNOSTICS_INTERVAL: Duration = Duration::from_millis(5000);

/// Configuration shared by the tick feed, the poller and the controller
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalConfig {
    /// Base URL of the analytics REST API
    pub backend_url: String,
    /// Base URL of the tick stream
    pub ws_url: String,
    /// Dependent leg of the pair; also the symbol streamed on the tick feed
    pub symbol_y: String,
    /// Independent leg of the pair
    pub symbol_x: String,
    /// Rolling window passed to the spread endpoint
    pub window: u32,
    /// Period between polling ticks
    pub poll_interval: Duration,
    /// Reconnect the tick feed after a disconnect
    pub reconnect: bool,
    /// Delay before each reconnect attempt
    pub reconnect_delay: Duration,
    /// Per-request HTTP timeout, `None` waits indefinitely
    pub request_timeout: Option<Duration>,
    /// Absolute z-score at which the alert fires
    pub zscore_threshold: f64,
    /// Refresh period of the hedge ratio and z-score alert, `None` disables
    pub diagnostics_interval: Option<Duration>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            symbol_y: DEFAULT_SYMBOL_Y.to_string(),
            symbol_x: DEFAULT_SYMBOL_X.to_string(),
            window: DEFAULT_SPREAD_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: true,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            request_timeout: None,
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            diagnostics_interval: Some(DEFAULT_DIAGNOSTICS_INTERVAL),
        }
    }
}

impl TerminalConfig {
    /// Build configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            backend_url: lookup("BACKEND_URL").unwrap_or(defaults.backend_url),
            ws_url: lookup("WS_URL").unwrap_or(defaults.ws_url),
            symbol_y: lookup("SYMBOL_Y")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or(defaults.symbol_y),
            symbol_x: lookup("SYMBOL_X")
                .map(|s| s.trim().to_lowercase())
                .unwrap_or(defaults.symbol_x),
            window: parse_or(&lookup, "SPREAD_WINDOW", defaults.window),
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL.as_millis() as u64,
            )),
            reconnect: parse_or(&lookup, "WS_RECONNECT", defaults.reconnect),
            reconnect_delay: Duration::from_millis(parse_or(
                &lookup,
                "WS_RECONNECT_DELAY_MS",
                DEFAULT_RECONNECT_DELAY.as_millis() as u64,
            )),
            request_timeout: lookup("HTTP_TIMEOUT_MS")
                .and_then(|raw| match raw.trim().parse::<u64>() {
                    Ok(ms) => Some(Duration::from_millis(ms)),
                    Err(_) => {
                        warn!("Ignoring invalid HTTP_TIMEOUT_MS value: {}", raw);
                        None
                    }
                }),
            zscore_threshold: parse_or(&lookup, "ZSCORE_ALERT_THRESHOLD", defaults.zscore_threshold),
            diagnostics_interval: match parse_or(
                &lookup,
                "DIAGNOSTICS_INTERVAL_MS",
                DEFAULT_DIAGNOSTICS_INTERVAL.as_millis() as u64,
            ) {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }

    /// Set the analytics base URL
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    /// Set the tick stream base URL
    pub fn with_ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Set the symbol pair
    pub fn with_symbols(mut self, symbol_y: impl Into<String>, symbol_x: impl Into<String>) -> Self {
        self.symbol_y = symbol_y.into();
        self.symbol_x = symbol_x.into();
        self
    }

    /// Set the spread window
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    /// Set the polling period
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enable or disable tick feed reconnection
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set a per-request HTTP timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the z-score alert threshold
    pub fn with_zscore_threshold(mut self, threshold: f64) -> Self {
        self.zscore_threshold = threshold;
        self
    }

    /// Set or disable the diagnostics refresh period
    pub fn with_diagnostics_interval(mut self, interval: Option<Duration>) -> Self {
        self.diagnostics_interval = interval;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {} value: {}", key, raw);
            default
        }),
        None => default,
    }
}
