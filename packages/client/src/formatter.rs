//! Message formatting utilities for client display.

use relaychat_shared::{Message, time::format_local_time};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a chat message as `[HH:MM:SS] sender: content` in local time
    pub fn format_chat_message(message: &Message) -> String {
        format!(
            "\n[{}] {}: {}\n",
            format_local_time(&message.timestamp),
            message.sender,
            message.content
        )
    }

    /// Format a local notice such as a disconnection
    pub fn format_notice(notice: &str) -> String {
        format!("\n* {}\n", notice)
    }
}
