use anyhow::{bail, Result};
use chrono::Utc;
use tracing::debug;

use crate::conversation::message::Message;
use crate::conversation::session::ChatSession;

/// All sessions of this process plus the one currently receiving messages.
#[derive(Debug, Default)]
pub struct ConversationState {
    sessions: Vec<ChatSession>,
    active: Option<usize>,
    last_id: i64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and make it active.
    pub fn create_session(&mut self) -> &ChatSession {
        // Millisecond ids, bumped so two sessions in the same tick stay distinct.
        let id = Utc::now().timestamp_millis().max(self.last_id + 1);
        self.last_id = id;

        self.sessions.push(ChatSession::new(id.to_string()));
        let index = self.sessions.len() - 1;
        self.active = Some(index);
        debug!(session_id = id, "Created chat session");
        &self.sessions[index]
    }

    pub fn select(&mut self, id: &str) -> Result<&ChatSession> {
        let Some(index) = self.sessions.iter().position(|s| s.id == id) else {
            bail!("No conversation with id {id}");
        };
        self.active = Some(index);
        Ok(&self.sessions[index])
    }

    pub fn active(&self) -> Option<&ChatSession> {
        self.active.map(|index| &self.sessions[index])
    }

    /// The active session, created on demand.
    pub fn ensure_active(&mut self) -> &mut ChatSession {
        let index = match self.active {
            Some(index) => index,
            None => {
                self.create_session();
                self.sessions.len() - 1
            }
        };
        &mut self.sessions[index]
    }

    pub fn append(&mut self, message: Message) {
        self.ensure_active().push(message);
    }

    /// Up to `window` trailing messages of the active session.
    pub fn recent(&self, window: usize) -> Vec<Message> {
        self.active()
            .map(|session| session.recent(window).to_vec())
            .unwrap_or_default()
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }
}
