//! Client execution logic.

use relaychat_shared::SessionKey;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::{
    config::ClientConfig,
    error::ClientError,
    input::ReadlineInput,
    session::{ChatClient, ClientExit},
    ui::ConsoleRenderer,
};

/// Open the TCP connection to the relay server
pub async fn connect(config: &ClientConfig) -> Result<TcpStream, ClientError> {
    let addr = config.server_addr();
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| ClientError::Connect { addr, source })?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Failed to set TCP_NODELAY: {}", e);
    }
    Ok(stream)
}

/// Run the interactive client until the server, the user, or `shutdown` ends it
pub async fn run_client(
    config: ClientConfig,
    display_name: String,
    shutdown: CancellationToken,
) -> Result<ClientExit, ClientError> {
    tracing::info!(
        "Attempting to connect to {} as '{}'",
        config.server_addr(),
        display_name
    );
    let stream = connect(&config).await?;
    let key = SessionKey::from_peer(stream.peer_addr().ok());
    tracing::info!("Client connected: {}", key);

    println!(
        "\nYou are '{}'. Type messages and press Enter to send. Press Ctrl+C to exit.\n",
        display_name
    );

    let input = ReadlineInput::spawn(format!("{}> ", display_name));
    let renderer = ConsoleRenderer::new(display_name.clone());
    let client = ChatClient::new(
        stream,
        key,
        display_name,
        shutdown.child_token(),
        config.max_frame_length,
    );

    let exit = client.run(input, renderer).await?;
    tracing::info!("Client session ended: {:?}", exit);
    Ok(exit)
}
