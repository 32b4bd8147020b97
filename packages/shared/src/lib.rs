//! Building blocks shared by the relay server and the chat client.
//!
//! - [`message`]: the relayed [`Message`] and its JSON wire form
//! - [`codec`]: newline-delimited framing over a byte stream
//! - [`session`]: one framed peer connection
//! - [`logger`] and [`time`]: ambient utilities

pub mod codec;
pub mod error;
pub mod logger;
pub mod message;
pub mod session;
pub mod time;

pub use codec::{DEFAULT_MAX_FRAME_LENGTH, Frame, FrameCodec};
pub use error::{ConnectionError, FrameError, MalformedMessage};
pub use message::{ANONYMOUS_SENDER, Message, MessageFactory};
pub use session::{Received, Session, SessionKey, SessionOptions};
