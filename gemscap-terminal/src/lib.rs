/// Gemscap Terminal - Shared Library
///
/// Client side of the pair-trading dashboard:
/// - tick feed: reconnecting WebSocket client for `/ws/ticks/<symbol>`
/// - poller: fixed-interval spread / signal-quality / trade-allowed queries
/// - diagnostics: hedge ratio, z-score alert and ADF test on demand
/// - controller: owns the view-model the display panels read
pub mod shared;

// Re-export commonly used types for convenience
pub use shared::types::{
    AdfResult, BackendReply, HedgeRatioPoint, SignalQuality, SignalResponse, SpreadPoint,
    SpreadResponse, TickerMessage, TradeAllowedResponse, ZScoreAlert,
};

pub use shared::api::{AnalyticsApi, AnalyticsClient};
pub use shared::config::TerminalConfig;
pub use shared::controller::{MountedTerminal, Terminal};
pub use shared::diagnostics::{AlertStatus, PairDiagnostics, Stationarity};
pub use shared::error::{ApiError, FeedError};
pub use shared::poller::{PollUpdate, Poller, PollerHandle};
pub use shared::websocket::{
    ConnectionStatus, FeedConnector, FeedFrame, TickFeed, TickFeedConfig, TickFeedHandle,
    WsConnector,
};

pub use shared::state::{
    AnalyticsStats, MarketStats, PriceDirection, TerminalState, TradeSignal,
};
