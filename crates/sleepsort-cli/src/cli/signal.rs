use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Waits for Ctrl+C or SIGTERM, then fires `interrupt`.
///
/// A handler that fails to install is logged and never resolves, so the other
/// one still works.
pub async fn interrupt_on_signal(interrupt: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to install SIGTERM handler: {:?}", _e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Failed to install Ctrl+C handler: {:?}", _e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    interrupt.cancel();
}
