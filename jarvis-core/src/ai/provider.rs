use crate::ai::{error::AiError, types::*};

/// A language model that turns one composed prompt into one complete reply.
///
/// The whole conversation context is carried inside the prompt text, so
/// providers are stateless and a single call is made per user turn.
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, AiError>;
}
