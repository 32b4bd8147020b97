//! Per-session relay loop.

use std::sync::Arc;

use relaychat_shared::{Received, Session, time::format_local_time};

use crate::{
    relay::Relay,
    state::{Lifecycle, SessionState},
};

/// Read frames from one session until it ends, broadcasting every message.
///
/// Ends on end-of-stream, a read error, or a local close/shutdown. A malformed
/// frame is logged and skipped. On exit the session is removed and closed,
/// which is a no-op if a failed broadcast already did it.
pub(crate) async fn relay_loop(relay: Relay, session: Arc<Session>, mut lifecycle: Lifecycle) {
    let key = relay.display_key(session.key()).to_string();
    lifecycle.advance(SessionState::Relaying);

    loop {
        match session.receive().await {
            Ok(Received::Message(message)) => {
                tracing::info!(
                    "[{}] {}: {}",
                    format_local_time(&message.timestamp),
                    message.sender,
                    message.content
                );
                let delivered = relay.broadcast(session.key(), &message).await;
                tracing::debug!(key = %key, "Message {} delivered to {} peer(s)", message.id, delivered);
            }
            Ok(Received::Malformed(err)) => {
                tracing::warn!(
                    event = "malformed_frame",
                    key = %key,
                    "Dropping malformed frame: {}",
                    err
                );
            }
            Ok(Received::EndOfStream) => {
                tracing::info!(key = %key, "Peer closed the connection");
                break;
            }
            Ok(Received::Closed) => {
                tracing::debug!(key = %key, "Session closed locally");
                break;
            }
            Err(e) => {
                tracing::warn!(key = %key, "Read failed: {}", e);
                break;
            }
        }
    }

    lifecycle.advance(SessionState::Disconnecting);
    relay.disconnect(session.key(), &session).await;
    lifecycle.advance(SessionState::Closed);
    debug_assert!(lifecycle.state().is_terminal());
}
