//! Stop signal shared by the long-running client tasks.

use tokio::sync::watch;

/// Resolves once shutdown was requested or the owning handle was dropped
pub(crate) async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            return;
        }
        if shutdown_rx.changed().await.is_err() {
            return;
        }
    }
}
