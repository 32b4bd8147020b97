//! TCP accept loop for the relay.

use std::{net::SocketAddr, time::Duration};

use relaychat_shared::SessionKey;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ServerConfig,
    error::{RelayError, ServerError},
    relay::Relay,
};

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin the loop
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Relay server bound to a TCP port
///
/// # Example
///
/// ```ignore
/// let shutdown = CancellationToken::new();
/// let server = RelayServer::bind(ServerConfig::default(), shutdown.clone()).await?;
/// tokio::spawn(async move {
///     shutdown_signal().await;
///     shutdown.cancel();
/// });
/// server.run().await?;
/// ```
pub struct RelayServer {
    listener: TcpListener,
    relay: Relay,
}

impl RelayServer {
    /// Bind the listening socket. Cancelling `shutdown` later stops the server.
    pub async fn bind(config: ServerConfig, shutdown: CancellationToken) -> Result<Self, ServerError> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            relay: Relay::new(config, shutdown),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the relay behind this server
    pub fn relay(&self) -> &Relay {
        &self.relay
    }

    /// Accept connections until shutdown, then close every session.
    ///
    /// Waits for all relay loops to finish before returning. The listening
    /// socket is released when this returns.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self { listener, relay } = self;
        let shutdown = relay.shutdown_token().clone();

        tracing::info!("Relay server listening on {}", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown signal received, stopping accept loop");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let key = SessionKey::from_peer(stream.peer_addr().ok());
                        if let Err(e) = stream.set_nodelay(true) {
                            tracing::debug!("Failed to set TCP_NODELAY: {}", e);
                        }
                        match relay.attach(stream, key).await {
                            Ok(session) => tracing::info!(
                                key = relay.display_key(session.key()),
                                "Client connected"
                            ),
                            Err(RelayError::DuplicateSession(_)) => {}
                            Err(e) => tracing::warn!("Connection refused: {}", e),
                        }
                    }
                    Err(e) => {
                        tracing::error!("Accept error: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        relay.shutdown().await;
        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
