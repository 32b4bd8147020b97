//! Relay server configuration.

use std::time::Duration;

use relaychat_shared::DEFAULT_MAX_FRAME_LENGTH;

pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Interface to listen on (all interfaces by default)
    pub bind_host: String,
    /// Port to listen on; 0 picks a free port
    pub port: u16,
    /// Upper bound on one write to one recipient during a broadcast
    pub send_timeout: Duration,
    /// Longest accepted frame in bytes
    pub max_frame_length: usize,
    /// Hide peer addresses in log output
    pub redact_addresses: bool,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            redact_addresses: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_all_interfaces_on_port_8000() {
        // テスト項目: デフォルト設定は全インターフェースの 8000 番で待ち受ける
        // when (操作):
        let config = ServerConfig::default();

        // then (期待する結果):
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert!(!config.redact_addresses);
    }
}
