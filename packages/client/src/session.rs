//! Client session: a receive loop and a send loop over one connection.

use std::sync::Arc;

use relaychat_shared::{
    FrameCodec, MessageFactory, Received, Session, SessionKey, time::SystemClock,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::{
    domain::outgoing_content,
    error::ClientError,
    input::InputSource,
    ui::MessageRenderer,
};

/// Why a client session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// The server closed the connection
    ServerClosed,
    /// The local input ended (EOF or Ctrl+C)
    InputClosed,
    /// Shutdown was requested
    Shutdown,
}

/// One connection to the relay server, driven by local input
pub struct ChatClient {
    session: Session,
    display_name: String,
    messages: MessageFactory,
}

impl ChatClient {
    pub fn new<S>(
        stream: S,
        key: SessionKey,
        display_name: String,
        cancel: CancellationToken,
        max_frame_length: usize,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            session: Session::with_codec(
                stream,
                key,
                cancel,
                FrameCodec::with_max_length(max_frame_length),
            ),
            display_name,
            messages: MessageFactory::new(Arc::new(SystemClock)),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Run the receive and send loops until either ends, then close the session.
    pub async fn run<I, R>(&self, mut input: I, mut renderer: R) -> Result<ClientExit, ClientError>
    where
        I: InputSource,
        R: MessageRenderer,
    {
        // If any one of the loops completes, the other is dropped.
        let outcome = tokio::select! {
            received = self.receive_loop(&mut renderer) => received,
            sent = self.send_loop(&mut input) => sent,
        };

        self.session.close().await;

        match &outcome {
            Ok(ClientExit::ServerClosed) => renderer.render_notice("Server disconnected."),
            Ok(_) => {}
            Err(e) => renderer.render_notice(&format!("Connection lost: {}", e)),
        }
        outcome
    }

    async fn receive_loop<R: MessageRenderer>(
        &self,
        renderer: &mut R,
    ) -> Result<ClientExit, ClientError> {
        loop {
            match self.session.receive().await? {
                Received::Message(message) => renderer.render_message(&message),
                Received::Malformed(err) => {
                    tracing::warn!(event = "malformed_frame", "Received malformed message: {}", err);
                }
                Received::EndOfStream => {
                    tracing::info!("Server disconnected.");
                    return Ok(ClientExit::ServerClosed);
                }
                Received::Closed => return Ok(ClientExit::Shutdown),
            }
        }
    }

    async fn send_loop<I: InputSource>(&self, input: &mut I) -> Result<ClientExit, ClientError> {
        while let Some(line) = input.next_line().await {
            let Some(content) = outgoing_content(&line) else {
                continue;
            };
            let message = self.messages.create(content, self.display_name.as_str());
            self.session.send(&message).await?;
            tracing::debug!("Sent message {}", message.id);
        }
        Ok(ClientExit::InputClosed)
    }
}
