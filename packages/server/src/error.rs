//! Error types for the relay server.

use std::io;

use relaychat_shared::SessionKey;
use thiserror::Error;

/// Per-connection failures raised while attaching a peer
#[derive(Debug, Error)]
pub enum RelayError {
    /// Another live session already uses this key; the new connection was closed
    #[error("session '{0}' is already registered")]
    DuplicateSession(SessionKey),

    /// The relay is shutting down and no longer accepts sessions
    #[error("relay is shutting down")]
    ShuttingDown,
}

/// Failures that stop the server as a whole
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server I/O error: {0}")]
    Io(#[from] io::Error),
}
