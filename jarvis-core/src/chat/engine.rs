use std::sync::Arc;

use tracing::{debug, info};

use crate::ai::{AiError, AiProvider, GenerationRequest, ModelSettings, TokenUsage};
use crate::chat::calls::{FunctionCallDescriptor, FunctionResult};
use crate::chat::dispatcher::FunctionDispatcher;
use crate::chat::parser::parse_response;
use crate::chat::reply::render_reply;
use crate::conversation::Message;
use crate::prompt::{MemoryContext, PromptComposer};

/// Outcome of one model round trip.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Text to show the user: model prose followed by one line per call result.
    pub text: String,
    /// Model prose with call blocks removed.
    pub visible_text: String,
    pub calls: Vec<FunctionCallDescriptor>,
    pub results: Vec<FunctionResult>,
    pub usage: TokenUsage,
}

/// Drives a single turn: compose the prompt, call the model once, then
/// execute whatever calls the reply contains.
#[derive(Clone)]
pub struct ChatEngine {
    provider: Arc<dyn AiProvider>,
    composer: PromptComposer,
    dispatcher: FunctionDispatcher,
    model: ModelSettings,
}

impl ChatEngine {
    pub fn new(
        provider: Arc<dyn AiProvider>,
        composer: PromptComposer,
        dispatcher: FunctionDispatcher,
        model: ModelSettings,
    ) -> Self {
        Self {
            provider,
            composer,
            dispatcher,
            model,
        }
    }

    pub fn composer(&self) -> &PromptComposer {
        &self.composer
    }

    pub fn dispatcher(&self) -> &FunctionDispatcher {
        &self.dispatcher
    }

    pub async fn respond(
        &self,
        question: &str,
        history: &[Message],
        context: &MemoryContext,
    ) -> Result<ChatReply, AiError> {
        let prompt = self.composer.compose(question, history, context);
        debug!(
            provider = self.provider.name(),
            model = %self.model.model,
            prompt_chars = prompt.len(),
            "Sending prompt"
        );

        let response = self
            .provider
            .generate(GenerationRequest::new(prompt, self.model.clone()))
            .await?;

        let parsed = parse_response(&response.text);
        let results = if parsed.has_calls() {
            info!(count = parsed.calls.len(), "Dispatching function calls");
            self.dispatcher.dispatch(&parsed.calls).await
        } else {
            Vec::new()
        };

        Ok(ChatReply {
            text: render_reply(&parsed.visible_text, &results),
            visible_text: parsed.visible_text,
            calls: parsed.calls,
            results,
            usage: response.usage,
        })
    }
}
