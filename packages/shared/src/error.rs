//! Error types shared by the relay server and the chat client.

use std::{io, time::Duration};

use thiserror::Error;

/// Errors raised by the newline-delimited frame codec
#[derive(Debug, Error)]
pub enum FrameError {
    /// The underlying stream failed
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A payload handed to the encoder contained a raw newline
    #[error("frame payload contains an embedded newline")]
    EmbeddedNewline,
}

/// The connection carrying a session is unusable.
///
/// Always terminal for the session it was raised on.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Reset, broken pipe, or any other stream failure
    #[error("connection I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The session was already closed (or is closing)
    #[error("session is closed")]
    Closed,

    /// A write did not complete within the configured bound
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    /// The outgoing payload could not be framed
    #[error("outgoing frame rejected: {0}")]
    InvalidFrame(String),

    /// The outgoing message could not be serialized
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<FrameError> for ConnectionError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(e) => Self::Io(e),
            other => Self::InvalidFrame(other.to_string()),
        }
    }
}

/// A single frame could not be turned into a message.
///
/// Local to that frame: the session keeps running.
#[derive(Debug, Error)]
pub enum MalformedMessage {
    /// The frame bytes are not UTF-8
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// The frame exceeded the maximum frame length and was discarded
    #[error("frame exceeds the maximum length of {limit} bytes")]
    TooLong { limit: usize },

    /// The frame is text but not a message object
    #[error("frame is not a valid message: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_io_error_maps_to_connection_io() {
        // テスト項目: FrameError::Io は ConnectionError::Io に変換される
        // given (前提条件):
        let err = FrameError::Io(io::Error::from(io::ErrorKind::BrokenPipe));

        // when (操作):
        let converted: ConnectionError = err.into();

        // then (期待する結果):
        assert!(matches!(converted, ConnectionError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_embedded_newline_maps_to_invalid_frame() {
        // テスト項目: 改行を含むペイロードのエラーは InvalidFrame に変換される
        // given (前提条件):
        let err = FrameError::EmbeddedNewline;

        // when (操作):
        let converted: ConnectionError = err.into();

        // then (期待する結果):
        assert!(matches!(converted, ConnectionError::InvalidFrame(_)));
    }
}
