//! Error types for the chat client.

use std::io;

use relaychat_shared::ConnectionError;
use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The established connection broke
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}
