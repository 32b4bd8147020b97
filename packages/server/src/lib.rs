//! Relay server: accepts TCP peers and relays each peer's messages to all others.
//!
//! Every accepted connection becomes a [`Session`](relaychat_shared::Session)
//! in the server's [`ClientRegistry`] and gets its own relay loop task. A
//! message read from one session is written to every other registered
//! session; a peer whose write fails is removed and closed.

pub mod config;
pub mod error;
mod handler;
pub mod registry;
pub mod relay;
pub mod server;
pub mod signal;
pub mod state;

pub use config::ServerConfig;
pub use error::{RelayError, ServerError};
pub use registry::ClientRegistry;
pub use relay::Relay;
pub use server::RelayServer;
pub use state::SessionState;
