//! The chat message relayed between peers and its wire representation.
//!
//! On the wire a message is a single JSON object on one line:
//!
//! ```text
//! {"id":1,"content":"hello","sender":"alice","timestamp":"2025-01-01T09:00:00Z"}
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::MalformedMessage,
    time::{Clock, SystemClock},
};

/// Display name used when the user does not provide one
pub const ANONYMOUS_SENDER: &str = "Anonymous";

/// Unit of relay. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Process-local, monotonically increasing identifier
    #[serde(alias = "Id")]
    pub id: u64,
    #[serde(alias = "Content")]
    pub content: String,
    /// Display name of the sender
    #[serde(alias = "Sender")]
    pub sender: String,
    #[serde(alias = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: u64, content: String, sender: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            content,
            sender,
            timestamp,
        }
    }

    /// Serialize into a single-line frame payload (no trailing newline).
    ///
    /// JSON escapes control characters inside strings, so the payload never
    /// contains a raw newline regardless of the content.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a frame payload back into a message
    pub fn from_frame(frame: &str) -> Result<Self, MalformedMessage> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// Creates messages with serialized id assignment.
///
/// Each factory owns its own counter, so ids are unique per factory even when
/// `create` is called from many tasks at once.
pub struct MessageFactory {
    last_id: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl MessageFactory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            last_id: AtomicU64::new(0),
            clock,
        }
    }

    /// Build a message stamped with the next id and the current time
    pub fn create(&self, content: impl Into<String>, sender: impl Into<String>) -> Message {
        let id = self.last_id.fetch_add(1, Ordering::Relaxed) + 1;
        Message::new(id, content.into(), sender.into(), self.clock.now())
    }
}

impl Default for MessageFactory {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
