//! Sources of user-typed lines.

use async_trait::async_trait;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

/// Anything that yields lines of user input.
///
/// `None` means the input is exhausted (EOF, Ctrl+C, or the producer went away).
#[async_trait]
pub trait InputSource: Send {
    async fn next_line(&mut self) -> Option<String>;
}

#[async_trait]
impl InputSource for mpsc::UnboundedReceiver<String> {
    async fn next_line(&mut self) -> Option<String> {
        self.recv().await
    }
}

/// Interactive line editor running on its own thread.
///
/// rustyline blocks, so lines are forwarded to the async side over a channel.
pub struct ReadlineInput {
    lines: mpsc::UnboundedReceiver<String>,
}

impl ReadlineInput {
    pub fn spawn(prompt: String) -> Self {
        let (tx, lines) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    tracing::error!("Failed to initialize readline: {}", e);
                    return;
                }
            };

            loop {
                match rl.readline(&prompt) {
                    Ok(line) => {
                        if !line.trim().is_empty() {
                            rl.add_history_entry(line.as_str()).ok();
                        }
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted) => {
                        tracing::info!("Interrupted");
                        break;
                    }
                    Err(ReadlineError::Eof) => {
                        tracing::info!("EOF");
                        break;
                    }
                    Err(err) => {
                        tracing::error!("Readline error: {}", err);
                        break;
                    }
                }
            }
        });

        Self { lines }
    }
}

#[async_trait]
impl InputSource for ReadlineInput {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}

/// Ask for a display name on the terminal. Blocking.
///
/// Returns `None` when the prompt could not be shown or input ended.
pub fn prompt_display_name() -> Option<String> {
    let mut rl = DefaultEditor::new().ok()?;
    rl.readline("Enter your name: ").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_input_yields_lines_then_none() {
        // テスト項目: チャネル入力は送られた行を順に返し、送信側が閉じると None を返す
        // given (前提条件):
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send("one".to_string()).unwrap();
        tx.send("two".to_string()).unwrap();
        drop(tx);

        // when (操作):
        let first = rx.next_line().await;
        let second = rx.next_line().await;
        let third = rx.next_line().await;

        // then (期待する結果):
        assert_eq!(first.as_deref(), Some("one"));
        assert_eq!(second.as_deref(), Some("two"));
        assert_eq!(third, None);
    }
}
