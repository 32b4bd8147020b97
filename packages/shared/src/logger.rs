//! Logging setup utilities for the relay chat binaries.

use std::{fs::OpenOptions, path::Path, sync::Mutex};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown at `default_log_level` unless `RUST_LOG` says otherwise
const LOGGED_CRATES: [&str; 3] = ["relaychat_shared", "relaychat_server", "relaychat_client"];

fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    LOGGED_CRATES
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={}", target.replace('-', "_"), default_log_level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
/// When `log_file` is given, every event is also appended to that file without
/// ANSI colors. Logging problems are never fatal: an unopenable file only
/// produces a warning, and a second initialization is ignored.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "relaychat")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
/// * `log_file` - Optional path that receives a copy of the log output
///
/// # Examples
///
/// ```no_run
/// use relaychat_shared::logger::setup_logger;
///
/// setup_logger("relaychat", "debug", None);
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str, log_file: Option<&Path>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into());

    let mut file_error = None;
    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                file_error = Some((path.display().to_string(), e));
                None
            }
        }
    });

    let initialized = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init();

    if initialized.is_ok()
        && let Some((path, e)) = file_error
    {
        tracing::warn!("Could not open log file '{}', logging to console only: {}", path, e);
    }
}
