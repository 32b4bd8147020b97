//! The relay hub: attaches sessions, fans messages out, and tears everything down.

use std::sync::Arc;

use relaychat_shared::{FrameCodec, Message, Session, SessionKey, SessionOptions};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::ServerConfig,
    error::RelayError,
    handler::relay_loop,
    registry::ClientRegistry,
    state::{Lifecycle, SessionState},
};

/// Relay state owned by one server instance.
///
/// Cloning yields another handle to the same registry, shutdown token, and
/// task set; each spawned relay loop holds one.
#[derive(Clone)]
pub struct Relay {
    registry: ClientRegistry,
    shutdown: CancellationToken,
    tasks: TaskTracker,
    config: Arc<ServerConfig>,
}

impl Relay {
    pub fn new(config: ServerConfig, shutdown: CancellationToken) -> Self {
        Self {
            registry: ClientRegistry::new(),
            shutdown,
            tasks: TaskTracker::new(),
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// How a key is written to the log
    pub(crate) fn display_key<'a>(&self, key: &'a SessionKey) -> &'a str {
        if self.config.redact_addresses {
            key.redacted()
        } else {
            key.as_str()
        }
    }

    /// Open a session on `stream`, register it, and start its relay loop.
    ///
    /// A duplicate key closes the new session and leaves the existing one
    /// untouched.
    pub async fn attach<S>(&self, stream: S, key: SessionKey) -> Result<Arc<Session>, RelayError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        if self.shutdown.is_cancelled() {
            return Err(RelayError::ShuttingDown);
        }

        let mut lifecycle = Lifecycle::new(self.display_key(&key));
        let options = SessionOptions {
            codec: FrameCodec::with_max_length(self.config.max_frame_length),
            send_timeout: Some(self.config.send_timeout),
            redact_key: self.config.redact_addresses,
        };
        let session = Arc::new(Session::with_options(
            stream,
            key.clone(),
            self.shutdown.child_token(),
            options,
        ));

        if !self.registry.register(key.clone(), session.clone()).await {
            tracing::warn!(
                event = "duplicate_session",
                key = self.display_key(&key),
                "Session key already registered, refusing the new connection"
            );
            session.close().await;
            lifecycle.advance(SessionState::Closed);
            return Err(RelayError::DuplicateSession(key));
        }
        lifecycle.advance(SessionState::Registered);

        self.tasks
            .spawn(relay_loop(self.clone(), session.clone(), lifecycle));
        Ok(session)
    }

    /// Deliver `message` to every registered session except `from`.
    ///
    /// Recipients are written to one after another. A recipient whose write
    /// fails is removed and closed; the others still get the message.
    /// Returns the number of successful deliveries.
    pub async fn broadcast(&self, from: &SessionKey, message: &Message) -> usize {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to serialize message {}: {}", message.id, e);
                return 0;
            }
        };

        let mut delivered = 0;
        for (key, session) in self.registry.broadcast_snapshot().await {
            if &key == from {
                continue;
            }
            match session.send_line(&frame).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        event = "broadcast_failure",
                        key = self.display_key(&key),
                        "Removing session after failed send: {}",
                        e
                    );
                    self.disconnect(&key, &session).await;
                }
            }
        }
        delivered
    }

    /// Remove and close one session. Safe to call from several paths at once.
    pub(crate) async fn disconnect(&self, key: &SessionKey, session: &Arc<Session>) {
        if self.registry.remove_entry(key, session).await {
            tracing::info!(key = self.display_key(key), "Session removed from registry");
        }
        session.close().await;
    }

    /// Stop every session and wait for all relay loops to finish
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let sessions = self.registry.drain().await;
        tracing::info!("Closing {} session(s)", sessions.len());
        for (_, session) in sessions {
            session.close().await;
        }

        self.tasks.close();
        self.tasks.wait().await;
    }
}
