use std::sync::Arc;

use tracing::{error, info, warn};

use crate::calendar::CalendarClient;
use crate::chat::{ChatEngine, ChatReply};
use crate::conversation::{ConversationState, Message};
use crate::memory::{analyze, MemoryStore};
use crate::prompt::MemoryContext;
use crate::service::snapshot::{gather_context, ContextLimits};

/// What the user sees after one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant message appended to the session.
    pub text: String,
    /// `None` when the model call failed and `text` is an apology.
    pub reply: Option<ChatReply>,
}

/// In-process turn driver. Owns the conversation and the memory store and
/// runs one user message at a time.
pub struct Assistant {
    engine: ChatEngine,
    calendar: Arc<dyn CalendarClient>,
    memory: Option<MemoryStore>,
    conversation: ConversationState,
    limits: ContextLimits,
    history_window: usize,
}

impl Assistant {
    pub fn new(
        engine: ChatEngine,
        calendar: Arc<dyn CalendarClient>,
        memory: Option<MemoryStore>,
        limits: ContextLimits,
        history_window: usize,
    ) -> Self {
        Self {
            engine,
            calendar,
            memory,
            conversation: ConversationState::new(),
            limits,
            history_window,
        }
    }

    pub async fn send(&mut self, text: &str) -> TurnOutcome {
        let session_id = self.conversation.ensure_active().id.clone();
        let history = self.conversation.recent(self.history_window);
        let context = self.context().await;

        self.conversation.append(Message::user(text));

        match self.engine.respond(text, &history, &context).await {
            Ok(reply) => {
                info!(
                    session_id = %session_id,
                    calls = reply.calls.len(),
                    total_tokens = reply.usage.total_tokens,
                    "Turn complete"
                );
                self.conversation.append(Message::assistant(reply.text.clone()));
                self.remember(text, &session_id);
                TurnOutcome {
                    text: reply.text.clone(),
                    reply: Some(reply),
                }
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Model call failed");
                let apology = format!("Sorry, I encountered an error: {e}");
                self.conversation.append(Message::assistant(apology.clone()));
                TurnOutcome {
                    text: apology,
                    reply: None,
                }
            }
        }
    }

    /// The context the next turn would be composed with.
    pub async fn context(&self) -> MemoryContext {
        gather_context(self.calendar.as_ref(), self.memory.as_ref(), self.limits).await
    }

    fn remember(&mut self, text: &str, session_id: &str) {
        let Some(store) = self.memory.as_mut() else {
            return;
        };

        let extraction = analyze(text);
        if extraction.is_empty() {
            return;
        }
        if let Err(e) = store.apply(&extraction, Some(session_id)) {
            warn!(?e, "Failed to update memory");
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut ConversationState {
        &mut self.conversation
    }

    pub fn memory(&self) -> Option<&MemoryStore> {
        self.memory.as_ref()
    }

    pub fn calendar(&self) -> &Arc<dyn CalendarClient> {
        &self.calendar
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }
}
