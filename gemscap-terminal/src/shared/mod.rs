/// Shared modules for the gemscap terminal
pub mod api;
pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod poller;
pub mod state;
pub mod types;
pub mod websocket;

mod shutdown;

#[cfg(test)]
pub(crate) mod testing;
