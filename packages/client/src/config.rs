//! Chat client configuration.

use relaychat_shared::DEFAULT_MAX_FRAME_LENGTH;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Relay server host
    pub host: String,
    /// Relay server port
    pub port: u16,
    /// Longest accepted frame in bytes
    pub max_frame_length: usize,
}

impl ClientConfig {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}
