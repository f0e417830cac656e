use log::{info, warn};
use tokio::task::JoinHandle;

use crate::cancel::CancelHandle;

/// Cancels `handle` on Ctrl+C or, on Unix, SIGTERM.
///
/// Abort the returned task once the fetch is over.
pub fn cancel_on_shutdown(handle: CancelHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_shutdown().await;
        info!("Stopping...");
        handle.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("SIGINT (Ctrl+C) received");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
