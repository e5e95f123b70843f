//! View-model read by the display panels
//!
//! Every field is already formatted for display. Placeholders (`--`) stay in
//! place until the first successful update and are never reset by failures.

use crate::shared::types::{SpreadResponse, TickerMessage, TradeAllowedResponse};
use crate::shared::websocket::ConnectionStatus;

pub const PLACEHOLDER: &str = "--";
pub const WAITING_REASON: &str = "Waiting for data...";
pub const ALLOWED_REASON: &str = "Trade allowed";
pub const BLOCKED_REASON: &str = "Blocked by risk checks";

/// Format with a fixed number of decimals; negative zero prints as zero
///
/// Values exactly halfway between two outputs round away from zero, so
/// `0.125` prints as `0.13` where `{:.2}` alone would give `0.12`.
pub fn fixed(value: f64, decimals: usize) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    if !is_exact_tie(value, decimals) {
        return format!("{:.*}", decimals, value);
    }

    // A tie has exactly `decimals + 1` fractional digits, the last one a 5
    let exact = format!("{:.*}", decimals + 1, value.abs());
    let truncated = exact[..exact.len() - 1].trim_end_matches('.');
    let rounded = round_up_last_digit(truncated);

    if value < 0.0 {
        format!("-{}", rounded)
    } else {
        rounded
    }
}

/// Whether `value` sits exactly halfway between two `decimals`-digit numbers
fn is_exact_tie(value: f64, decimals: usize) -> bool {
    if value == 0.0 || !value.is_finite() {
        return false;
    }

    let bits = value.abs().to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };

    // value = odd * 2^lowest; a tie at d decimals is odd * 5^d / 10^d / 2
    let lowest = exponent + i64::from(mantissa.trailing_zeros());
    lowest == -(decimals as i64 + 1)
}

/// Add one unit in the last place of a plain decimal string
fn round_up_last_digit(digits: &str) -> String {
    let mut out: Vec<char> = digits.chars().collect();
    let mut carry = true;

    for c in out.iter_mut().rev() {
        match *c {
            '.' => continue,
            '9' => *c = '0',
            d => {
                *c = char::from(d as u8 + 1);
                carry = false;
                break;
            }
        }
    }

    let rounded: String = out.into_iter().collect();
    if carry {
        format!("1{}", rounded)
    } else {
        rounded
    }
}

/// Direction of the 24h change, drives the top bar colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDirection {
    Up,
    Down,
}

/// Ticker panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketStats {
    pub price: String,
    pub change: String,
    pub high: String,
    pub low: String,
    pub volume: String,
}

impl Default for MarketStats {
    fn default() -> Self {
        Self {
            price: PLACEHOLDER.to_string(),
            change: PLACEHOLDER.to_string(),
            high: PLACEHOLDER.to_string(),
            low: PLACEHOLDER.to_string(),
            volume: PLACEHOLDER.to_string(),
        }
    }
}

impl MarketStats {
    pub fn from_ticker(tick: &TickerMessage) -> Self {
        Self {
            price: fixed(tick.price, 2),
            change: fixed(tick.change, 2),
            high: fixed(tick.high, 2),
            low: fixed(tick.low, 2),
            volume: fixed(tick.volume, 2),
        }
    }

    /// Placeholders and unparseable values count as flat, i.e. `Up`
    pub fn direction(&self) -> PriceDirection {
        let change = self
            .change
            .parse::<f64>()
            .ok()
            .filter(|v| !v.is_nan())
            .unwrap_or(0.0);

        if change >= 0.0 {
            PriceDirection::Up
        } else {
            PriceDirection::Down
        }
    }
}

/// Spread / z-score / half-life panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsStats {
    pub spread: String,
    pub zscore: String,
    pub half_life: String,
}

impl Default for AnalyticsStats {
    fn default() -> Self {
        Self {
            spread: PLACEHOLDER.to_string(),
            zscore: PLACEHOLDER.to_string(),
            half_life: PLACEHOLDER.to_string(),
        }
    }
}

impl AnalyticsStats {
    /// `None` when the response carries no points
    pub fn from_spread(response: &SpreadResponse) -> Option<Self> {
        let last = response.latest()?;

        let half_life = match response.half_life {
            Some(h) if h != 0.0 && !h.is_nan() => fixed(h, 1),
            _ => PLACEHOLDER.to_string(),
        };

        Some(Self {
            spread: fixed(last.spread, 4),
            zscore: fixed(last.zscore, 2),
            half_life,
        })
    }
}

/// Allow/block indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeSignal {
    pub allowed: bool,
    pub reason: String,
    /// Risk warnings attached by the server, in server order
    pub warnings: Vec<String>,
}

impl Default for TradeSignal {
    fn default() -> Self {
        Self {
            allowed: false,
            reason: WAITING_REASON.to_string(),
            warnings: Vec::new(),
        }
    }
}

impl TradeSignal {
    pub fn from_response(response: &TradeAllowedResponse) -> Self {
        let reason = if response.allowed {
            ALLOWED_REASON.to_string()
        } else {
            response
                .reason
                .as_deref()
                .filter(|r| !r.is_empty())
                .unwrap_or(BLOCKED_REASON)
                .to_string()
        };

        Self {
            allowed: response.allowed,
            reason,
            warnings: response.warnings.clone().unwrap_or_default(),
        }
    }
}

/// Everything the panels render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalState {
    pub market: MarketStats,
    pub analytics: AnalyticsStats,
    pub signal: TradeSignal,
    pub connection: ConnectionStatus,
}

impl Default for TerminalState {
    fn default() -> Self {
        Self {
            market: MarketStats::default(),
            analytics: AnalyticsStats::default(),
            signal: TradeSignal::default(),
            connection: ConnectionStatus::Connecting,
        }
    }
}

// The apply_* methods return whether anything changed so they can be fed
// straight into `watch::Sender::send_if_modified`.
impl TerminalState {
    pub fn apply_ticker(&mut self, tick: &TickerMessage) -> bool {
        replace_if_changed(&mut self.market, MarketStats::from_ticker(tick))
    }

    /// Empty spread responses leave the analytics panel untouched
    pub fn apply_spread(&mut self, response: &SpreadResponse) -> bool {
        match AnalyticsStats::from_spread(response) {
            Some(analytics) => replace_if_changed(&mut self.analytics, analytics),
            None => false,
        }
    }

    pub fn apply_trade_allowed(&mut self, response: &TradeAllowedResponse) -> bool {
        replace_if_changed(&mut self.signal, TradeSignal::from_response(response))
    }

    pub fn apply_connection(&mut self, status: ConnectionStatus) -> bool {
        replace_if_changed(&mut self.connection, status)
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
