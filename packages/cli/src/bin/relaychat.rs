//! RelayChat: a newline-delimited JSON chat relay over TCP.
//!
//! One binary, two modes. `server` accepts peers and relays every message to
//! all other peers; `client` connects to a server and chats interactively.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin relaychat -- server
//! cargo run --bin relaychat -- server --bind 127.0.0.1 --port 9000
//! cargo run --bin relaychat -- client --name Alice
//! cargo run --bin relaychat -- client --host 192.168.0.10 -p 9000
//! ```

use std::{path::PathBuf, time::Duration};

use clap::{CommandFactory, Parser};
use relaychat_client::{ClientConfig, domain::resolve_display_name, input::prompt_display_name};
use relaychat_server::{RelayServer, ServerConfig, config::DEFAULT_SEND_TIMEOUT, signal::shutdown_signal};
use relaychat_shared::{DEFAULT_MAX_FRAME_LENGTH, logger::setup_logger};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "relaychat")]
#[command(about = "TCP chat relay: run the server or an interactive client", long_about = None)]
struct Args {
    /// Mode to run: `server` or `client` (case-insensitive)
    mode: Option<String>,

    /// Interface the server binds to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Server host the client connects to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on or connect to
    #[arg(short = 'p', long, default_value_t = 8000)]
    port: u16,

    /// Display name for the client; prompted for when omitted
    #[arg(long)]
    name: Option<String>,

    /// Also write log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Hide peer addresses in server logs
    #[arg(long)]
    redact_addresses: bool,

    /// Per-recipient write timeout for the server, in milliseconds
    #[arg(long, default_value_t = DEFAULT_SEND_TIMEOUT.as_millis() as u64)]
    send_timeout_ms: u64,

    /// Longest accepted frame in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LENGTH)]
    max_frame_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Server,
    Client,
}

impl Mode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "server" => Some(Mode::Server),
            "client" => Some(Mode::Client),
            _ => None,
        }
    }
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_host: self.bind.clone(),
            port: self.port,
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            max_frame_length: self.max_frame_length,
            redact_addresses: self.redact_addresses,
        }
    }

    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            max_frame_length: self.max_frame_length,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(
        env!("CARGO_BIN_NAME"),
        &args.log_level,
        args.log_file.as_deref(),
    );

    let Some(mode) = args.mode.as_deref().and_then(Mode::parse) else {
        if let Some(mode) = &args.mode {
            eprintln!("Unknown mode '{}'\n", mode);
        }
        Args::command().print_help().ok();
        println!();
        return;
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });

    match mode {
        Mode::Server => run_server(&args, shutdown).await,
        Mode::Client => run_client(&args, shutdown).await,
    }
}

async fn run_server(args: &Args, shutdown: CancellationToken) {
    let server = match RelayServer::bind(args.server_config(), shutdown).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run_client(args: &Args, shutdown: CancellationToken) {
    let raw_name = match &args.name {
        Some(name) => Some(name.clone()),
        None => tokio::task::spawn_blocking(prompt_display_name)
            .await
            .ok()
            .flatten(),
    };
    let display_name = resolve_display_name(raw_name.as_deref());

    if let Err(e) = relaychat_client::run_client(args.client_config(), display_name, shutdown).await
    {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_is_case_insensitive() {
        // テスト項目: モード名は大文字小文字を区別しない
        // then (期待する結果):
        assert_eq!(Mode::parse("server"), Some(Mode::Server));
        assert_eq!(Mode::parse("SERVER"), Some(Mode::Server));
        assert_eq!(Mode::parse("Client"), Some(Mode::Client));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        // テスト項目: 未知のモード名は None になる
        // then (期待する結果):
        assert_eq!(Mode::parse("relay"), None);
        assert_eq!(Mode::parse(""), None);
    }

    #[test]
    fn test_defaults_match_documented_values() {
        // テスト項目: 引数を省略した場合のデフォルト値
        // when (操作):
        let args = Args::try_parse_from(["relaychat", "server"]).unwrap();

        // then (期待する結果):
        assert_eq!(args.server_config(), ServerConfig::default());
        assert_eq!(args.client_config(), ClientConfig::default());
        assert_eq!(args.log_level, "info");
        assert!(args.name.is_none());
    }

    #[test]
    fn test_options_flow_into_configs() {
        // テスト項目: 指定したオプションがサーバー・クライアントの設定に反映される
        // when (操作):
        let args = Args::try_parse_from([
            "relaychat",
            "client",
            "--host",
            "10.0.0.5",
            "-p",
            "9000",
            "--name",
            "alice",
            "--send-timeout-ms",
            "250",
            "--max-frame-length",
            "4096",
            "--redact-addresses",
        ])
        .unwrap();

        // then (期待する結果):
        let client = args.client_config();
        assert_eq!(client.server_addr(), "10.0.0.5:9000");
        assert_eq!(client.max_frame_length, 4096);
        let server = args.server_config();
        assert_eq!(server.send_timeout, Duration::from_millis(250));
        assert!(server.redact_addresses);
        assert_eq!(args.name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_mode_may_be_omitted() {
        // テスト項目: モードを省略しても引数の解析は成功する
        // when (操作):
        let args = Args::try_parse_from(["relaychat"]).unwrap();

        // then (期待する結果):
        assert!(args.mode.is_none());
    }
}
