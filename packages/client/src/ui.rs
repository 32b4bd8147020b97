//! Rendering of received messages.

use std::io::Write;

use relaychat_shared::Message;

use crate::formatter::MessageFormatter;

/// Output side of the client
pub trait MessageRenderer: Send {
    fn render_message(&mut self, message: &Message);
    fn render_notice(&mut self, notice: &str);
}

/// Renders to stdout and redisplays the input prompt afterwards
pub struct ConsoleRenderer {
    display_name: String,
}

impl ConsoleRenderer {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
        }
    }
}

impl MessageRenderer for ConsoleRenderer {
    fn render_message(&mut self, message: &Message) {
        print!("{}", MessageFormatter::format_chat_message(message));
        redisplay_prompt(&self.display_name);
    }

    fn render_notice(&mut self, notice: &str) {
        print!("{}", MessageFormatter::format_notice(notice));
        std::io::stdout().flush().ok();
    }
}

/// Redisplay the prompt after receiving a message
pub fn redisplay_prompt(display_name: &str) {
    print!("{}> ", display_name);
    std::io::stdout().flush().ok();
}
