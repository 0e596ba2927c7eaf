use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use jarvis_core::{
    ai::{
        mock::{MockBehavior, MockProvider},
        GenerationRequest,
    },
    calendar::InMemoryCalendar,
    chat::{ChatEngine, FunctionDispatcher},
    memory::MemoryStore,
    prompt::{FixedClock, PromptComposer},
    service::{Assistant, ContextLimits, TurnOutcome},
    settings::Settings,
};
use tempfile::TempDir;

pub struct Fixture {
    pub assistant: Assistant,
    pub calendar: Arc<InMemoryCalendar>,
    pub data_dir: TempDir,
    mock_provider: MockProvider,
}

impl Fixture {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::with_mock_behavior(MockBehavior::Success)
    }

    #[allow(dead_code)]
    pub fn with_mock_behavior(behavior: MockBehavior) -> Self {
        Self::with_calendar_and_behavior(InMemoryCalendar::new(), behavior)
    }

    pub fn with_calendar_and_behavior(calendar: InMemoryCalendar, behavior: MockBehavior) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let data_dir = TempDir::new().unwrap();
        let mock_provider = MockProvider::new(behavior);
        let calendar = Arc::new(calendar);
        let assistant = build_assistant(&data_dir, &mock_provider, calendar.clone());

        Fixture {
            assistant,
            calendar,
            data_dir,
            mock_provider,
        }
    }

    #[allow(dead_code)]
    pub fn set_mock_behavior(&self, behavior: MockBehavior) {
        self.mock_provider.set_behavior(behavior);
    }

    #[allow(dead_code)]
    pub fn memory_path(&self) -> PathBuf {
        self.data_dir.path().join("memory.json")
    }

    #[allow(dead_code)]
    pub fn last_request(&self) -> GenerationRequest {
        self.mock_provider
            .get_last_captured_request()
            .expect("No request was sent to the model")
    }

    /// A second assistant over the same data directory, as after a restart.
    #[allow(dead_code)]
    pub fn restart(&mut self) {
        self.assistant = build_assistant(&self.data_dir, &self.mock_provider, self.calendar.clone());
    }

    /// Sends one user message and returns what the user would see.
    pub async fn step(&mut self, message: impl Into<String>) -> TurnOutcome {
        let message = message.into();
        self.assistant.send(&message).await
    }
}

fn build_assistant(
    data_dir: &TempDir,
    provider: &MockProvider,
    calendar: Arc<InMemoryCalendar>,
) -> Assistant {
    let settings = Settings::default();
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 9, 20, 13, 0, 0).unwrap());
    let composer = PromptComposer::new(
        settings.assistant_name.clone(),
        settings.parsed_time_zone().unwrap(),
    )
    .with_clock(Arc::new(clock))
    .with_history_window(settings.history_window);

    let engine = ChatEngine::new(
        Arc::new(provider.clone()),
        composer,
        FunctionDispatcher::new(calendar.clone()),
        settings.gemini.model_settings(),
    );
    let memory = MemoryStore::load(&data_dir.path().join("memory.json")).unwrap();

    Assistant::new(
        engine,
        calendar,
        Some(memory),
        ContextLimits::from_settings(&settings),
        settings.history_window,
    )
}

#[allow(dead_code)]
pub fn run<F, Fut>(test_fn: F)
where
    F: FnOnce(Fixture) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    run_with_calendar(InMemoryCalendar::new(), test_fn)
}

pub fn run_with_calendar<F, Fut>(calendar: InMemoryCalendar, test_fn: F)
where
    F: FnOnce(Fixture) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    use tokio::time::{timeout, Duration};

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    runtime.block_on(async {
        let fixture = Fixture::with_calendar_and_behavior(calendar, MockBehavior::Success);
        let test_future = test_fn(fixture);
        timeout(Duration::from_secs(30), test_future)
            .await
            .expect("Test timed out after 30 seconds");
    });
}
