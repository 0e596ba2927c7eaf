use crate::ai::{error::AiError, provider::AiProvider, types::*};
use std::sync::{Arc, Mutex};

/// Mock behavior for the mock provider
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MockBehavior {
    /// Return a fixed plain-text response
    #[default]
    Success,
    /// Return the given text verbatim as the model output
    Respond { text: String },
    /// Always return a retryable error
    AlwaysRetryableError,
    /// Always return a non-retryable error
    AlwaysNonRetryableError,
    /// Enables multi-turn testing by replaying predetermined responses in order
    BehaviorQueue { behaviors: Vec<MockBehavior> },
}

/// Mock AI provider for testing
#[derive(Clone)]
pub struct MockProvider {
    behavior: Arc<Mutex<MockBehavior>>,
    call_count: Arc<Mutex<usize>>,
    captured_requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Arc::new(Mutex::new(behavior)),
            call_count: Arc::new(Mutex::new(0)),
            captured_requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shorthand for a provider that always answers with `text`.
    pub fn responding(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Respond { text: text.into() })
    }

    fn pop_behavior_from_queue(behavior: &mut MockBehavior) -> MockBehavior {
        if let MockBehavior::BehaviorQueue { behaviors } = behavior {
            if behaviors.is_empty() {
                return MockBehavior::Success;
            }
            return behaviors.remove(0);
        }
        behavior.clone()
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_captured_requests(&self) -> Vec<GenerationRequest> {
        self.captured_requests.lock().unwrap().clone()
    }

    pub fn get_last_captured_request(&self) -> Option<GenerationRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl AiProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, AiError> {
        {
            let mut requests = self.captured_requests.lock().unwrap();
            requests.push(request);
        }

        {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
        }

        let effective = {
            let mut behavior = self.behavior.lock().unwrap();
            Self::pop_behavior_from_queue(&mut behavior)
        };

        match effective {
            MockBehavior::Success => Ok(GenerationResponse {
                text: "Mock response".to_string(),
                usage: TokenUsage::new(10, 10),
            }),
            MockBehavior::Respond { text } => Ok(GenerationResponse {
                text,
                usage: TokenUsage::new(10, 10),
            }),
            MockBehavior::AlwaysRetryableError => Err(AiError::Retryable(anyhow::anyhow!(
                "Mock retryable error (always fails)"
            ))),
            MockBehavior::AlwaysNonRetryableError => Err(AiError::Terminal(anyhow::anyhow!(
                "Mock non-retryable error"
            ))),
            MockBehavior::BehaviorQueue { .. } => Err(AiError::Terminal(anyhow::anyhow!(
                "Nested behavior queues are not supported"
            ))),
        }
    }
}
