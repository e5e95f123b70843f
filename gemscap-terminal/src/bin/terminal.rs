/// Gemscap Terminal (headless)
///
/// Mounts the terminal against the configured backend and logs each panel
/// whenever its contents change. Pair diagnostics (ADF once, then hedge
/// ratio and z-score alert on their own period) run alongside. Ctrl-C
/// unmounts and exits.
use std::error::Error;
use std::time::Duration;

use gemscap_terminal::shared::state::fixed;
use gemscap_terminal::{
    AlertStatus, AnalyticsClient, PairDiagnostics, PriceDirection, Terminal, TerminalConfig,
    TerminalState,
};
use rustls::crypto::ring::default_provider;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    // Both reqwest and tungstenite pull in rustls; pin the process-wide provider
    if default_provider().install_default().is_err() {
        warn!("rustls crypto provider already installed");
    }

    let config = TerminalConfig::from_env();
    info!(
        backend = %config.backend_url,
        ws = %config.ws_url,
        pair = %format!("{}/{}", config.symbol_y, config.symbol_x),
        window = config.window,
        "Starting gemscap terminal"
    );

    let diagnostics = PairDiagnostics::new(
        AnalyticsClient::new(config.backend_url.clone()).with_timeout(config.request_timeout),
        &config,
    );
    let diagnostics_task = tokio::spawn(run_diagnostics(diagnostics, config.diagnostics_interval));

    let mounted = Terminal::new(config).mount();
    let mut updates = mounted.subscribe();
    let mut shown = updates.borrow_and_update().clone();
    log_panels(None, &shown);

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutdown requested");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                log_panels(Some(&shown), &state);
                shown = state;
            }
        }
    }

    diagnostics_task.abort();
    mounted.unmount().await;
    Ok(())
}

/// ADF test once, then hedge ratio and z-score alert every `interval`
async fn run_diagnostics(diagnostics: PairDiagnostics, interval: Option<Duration>) {
    match diagnostics.stationarity().await {
        Ok(result) => info!("{}", result),
        Err(e) => warn!("{}", e),
    }

    let Some(period) = interval else {
        return;
    };
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match diagnostics.latest_hedge_ratio().await {
            Ok(Some(point)) => info!(
                hedge_ratio = %fixed(point.hedge_ratio, 4),
                ts = %point.ts,
                "Hedge ratio"
            ),
            Ok(None) => info!("Waiting for hedge ratio data..."),
            Err(e) => warn!("{}", e),
        }

        match diagnostics.zscore_alert().await {
            Ok(status @ AlertStatus::Triggered { .. }) => warn!("{}", status),
            Ok(status) => info!("{}", status),
            Err(e) => warn!("{}", e),
        }
    }
}

/// Log the panels that differ from what was last shown
fn log_panels(previous: Option<&TerminalState>, state: &TerminalState) {
    if previous.map(|p| p.connection) != Some(state.connection) {
        info!(status = %state.connection, "Tick feed");
    }

    if previous.map(|p| &p.market) != Some(&state.market) {
        let direction = match state.market.direction() {
            PriceDirection::Up => "up",
            PriceDirection::Down => "down",
        };
        info!(
            last = %state.market.price,
            change = %format!("{}%", state.market.change),
            direction,
            high = %state.market.high,
            low = %state.market.low,
            volume = %state.market.volume,
            "Ticker"
        );
    }

    if previous.map(|p| &p.analytics) != Some(&state.analytics) {
        info!(
            spread = %state.analytics.spread,
            zscore = %state.analytics.zscore,
            half_life = %state.analytics.half_life,
            "Analytics"
        );
    }

    if previous.map(|p| &p.signal) != Some(&state.signal) {
        if state.signal.allowed {
            info!("Trade signal: allowed");
        } else {
            info!(reason = %state.signal.reason, "Trade signal: blocked");
        }
        for warning in &state.signal.warnings {
            warn!(warning = %warning, "Trade signal warning");
        }
    }
}

/// Initialize logging
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
