//! Interactive chat client for the relay server.
//!
//! A [`ChatClient`] runs two loops over one session: received messages are
//! rendered, typed lines are sent. Whichever loop ends first stops the other.

pub mod config;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod input;
pub mod runner;
pub mod session;
pub mod ui;

pub use config::ClientConfig;
pub use error::ClientError;
pub use runner::{connect, run_client};
pub use session::{ChatClient, ClientExit};
