use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::message::Message;

pub const DEFAULT_TITLE: &str = "New Conversation";
const TITLE_CHARS: usize = 30;

/// An ordered, append-only message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(id: String) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// The first message, whoever sent it, names the session.
    pub fn push(&mut self, message: Message) {
        if self.messages.is_empty() {
            self.title = title_from(&message.text);
        }
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `window` messages, oldest first.
    pub fn recent(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }
}

fn title_from(text: &str) -> String {
    let truncated: String = text.chars().take(TITLE_CHARS).collect();
    if text.chars().count() > TITLE_CHARS {
        format!("{truncated}...")
    } else {
        truncated
    }
}
