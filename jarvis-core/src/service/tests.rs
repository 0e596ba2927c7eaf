use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::ai::mock::{MockBehavior, MockProvider};
use crate::ai::ModelSettings;
use crate::calendar::mock::{CalendarCall, CalendarOperation};
use crate::calendar::InMemoryCalendar;
use crate::chat::{ChatEngine, FunctionDispatcher};
use crate::memory::MemoryStore;
use crate::prompt::{FixedClock, PromptComposer};
use crate::service::{AssistantService, ContextLimits, ServiceRequest};

struct Fixture {
    service: AssistantService,
    provider: MockProvider,
    calendar: Arc<InMemoryCalendar>,
    dir: TempDir,
}

fn fixture(provider: MockProvider, calendar: InMemoryCalendar) -> Fixture {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let dir = TempDir::new().unwrap();
    let calendar = Arc::new(calendar);
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 9, 20, 13, 0, 0).unwrap());
    let engine = ChatEngine::new(
        Arc::new(provider.clone()),
        PromptComposer::new("Jarvis", chrono_tz::America::New_York).with_clock(Arc::new(clock)),
        FunctionDispatcher::new(calendar.clone()),
        ModelSettings::default(),
    );
    let memory = MemoryStore::new(dir.path().join("memory.json"));
    let service = AssistantService::new(
        engine,
        calendar.clone(),
        Some(memory),
        ContextLimits::default(),
    );

    Fixture {
        service,
        provider,
        calendar,
        dir,
    }
}

async fn handle(fixture: &mut Fixture, request: Value) -> Value {
    let request: ServiceRequest = serde_json::from_value(request).unwrap();
    serde_json::to_value(fixture.service.handle(request).await).unwrap()
}

#[tokio::test]
async fn test_chat_without_calls_returns_plain_response() {
    let mut f = fixture(
        MockProvider::responding("<strong>Hi</strong> there"),
        InMemoryCalendar::new(),
    );

    let reply = handle(&mut f, json!({"type": "chat", "message": "hello"})).await;

    assert_eq!(reply, json!({"success": true, "response": "**Hi** there"}));
}

#[tokio::test]
async fn test_chat_with_calls_returns_descriptors_and_results() {
    let mut f = fixture(
        MockProvider::responding(concat!(
            "Done.\n",
            "[FUNCTION_CALL]{\"function\":\"createCalendarEvent\",\"parameters\":{\"title\":\"Dentist\",\"startTime\":\"2024-09-21T14:00:00\",\"endTime\":\"2024-09-21T15:00:00\"}}[/FUNCTION_CALL]\n",
            "[FUNCTION_CALL]{\"function\":\"launchRocket\",\"parameters\":{}}[/FUNCTION_CALL]",
        )),
        InMemoryCalendar::new(),
    );

    let reply = handle(&mut f, json!({"type": "chat", "message": "book it"})).await;

    assert_eq!(reply["success"], true);
    assert_eq!(reply["response"], "Done.");
    assert_eq!(reply["functionCalls"].as_array().unwrap().len(), 2);
    let results = reply["functionResults"].as_array().unwrap();
    assert_eq!(results[0]["success"], true);
    assert_eq!(results[0]["message"], "Event \"Dentist\" created successfully");
    assert_eq!(results[1]["success"], false);
    assert_eq!(results[1]["error"], "Unknown function: launchRocket");
    assert_eq!(f.calendar.events().len(), 1);
}

#[tokio::test]
async fn test_chat_passes_memory_context_into_prompt() {
    let mut f = fixture(MockProvider::responding("ok"), InMemoryCalendar::new());

    handle(
        &mut f,
        json!({
            "type": "chat",
            "message": "what do you know?",
            "memoryContext": {"userPreferences": {"name": "Alex"}},
        }),
    )
    .await;

    let prompt = f.provider.get_last_captured_request().unwrap().prompt;
    assert!(prompt.contains("Alex"));
}

#[tokio::test]
async fn test_chat_model_failure_is_reported() {
    let mut f = fixture(
        MockProvider::new(MockBehavior::AlwaysRetryableError),
        InMemoryCalendar::new(),
    );

    let reply = handle(&mut f, json!({"type": "chat", "message": "hello"})).await;

    assert_eq!(reply["success"], false);
    assert!(reply["error"]
        .as_str()
        .unwrap()
        .starts_with("Retryable error:"));
}

#[tokio::test]
async fn test_authentication_flow() {
    let mut f = fixture(MockProvider::responding("ok"), InMemoryCalendar::unauthenticated());

    let events = handle(&mut f, json!({"type": "calendarGetEvents"})).await;
    assert_eq!(
        events,
        json!({"success": false, "error": "Not authenticated with Google Calendar"})
    );

    let url = handle(&mut f, json!({"type": "calendarAuthenticate"})).await;
    assert_eq!(url["success"], true);
    assert!(url["authUrl"].is_string());

    let set = handle(
        &mut f,
        json!({"type": "calendarSetAuthCode", "code": " 4/abc "}),
    )
    .await;
    assert_eq!(set, json!({"success": true}));

    let events = handle(&mut f, json!({"type": "calendarGetEvents", "maxResults": 1})).await;
    assert_eq!(events, json!({"success": true, "data": []}));
}

#[tokio::test]
async fn test_task_passthroughs() {
    let mut f = fixture(MockProvider::responding("ok"), InMemoryCalendar::new());

    let created = handle(
        &mut f,
        json!({"type": "tasksCreateTask", "task": {"title": "Buy milk", "dueDate": "2024-09-21"}}),
    )
    .await;
    assert_eq!(created["success"], true);
    let task_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["due"], "2024-09-21T00:00:00Z");

    let lists = handle(&mut f, json!({"type": "tasksGetLists"})).await;
    assert_eq!(lists["data"][0]["id"], "@default");

    let open = handle(&mut f, json!({"type": "tasksGetTasks"})).await;
    assert_eq!(open["data"].as_array().unwrap().len(), 1);

    let completed = handle(
        &mut f,
        json!({"type": "tasksCompleteTask", "taskId": task_id}),
    )
    .await;
    assert_eq!(completed["data"]["status"], "completed");

    let open = handle(&mut f, json!({"type": "tasksGetTasks"})).await;
    assert_eq!(open["data"], json!([]));

    let deleted = handle(
        &mut f,
        json!({"type": "tasksDeleteTask", "taskId": task_id}),
    )
    .await;
    assert_eq!(deleted, json!({"success": true}));

    let missing = handle(&mut f, json!({"type": "tasksDeleteTask", "taskId": "nope"})).await;
    assert_eq!(missing["success"], false);

    assert!(matches!(
        f.calendar.calls().first(),
        Some(CalendarCall::CreateTask { task_list_id, .. }) if task_list_id == "@default"
    ));
}

#[tokio::test]
async fn test_calendar_failure_is_reported() {
    let calendar = InMemoryCalendar::new();
    calendar.fail_on(CalendarOperation::GetTaskLists);
    let mut f = fixture(MockProvider::responding("ok"), calendar);

    let lists = handle(&mut f, json!({"type": "tasksGetLists"})).await;

    assert_eq!(lists["success"], false);
    assert!(lists["error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn test_memory_record_then_context() {
    let mut f = fixture(MockProvider::responding("ok"), InMemoryCalendar::new());

    let recorded = handle(
        &mut f,
        json!({"type": "memoryRecord", "message": "remember that I hate mushrooms", "sessionId": "42"}),
    )
    .await;
    assert_eq!(recorded["success"], true);
    assert_eq!(recorded["data"]["fact"], "I hate mushrooms");
    assert_eq!(recorded["data"]["topic"], Value::Null);

    let context = handle(&mut f, json!({"type": "memoryContext"})).await;
    assert_eq!(context["success"], true);
    assert_eq!(context["data"]["recentFacts"][0]["text"], "I hate mushrooms");
    assert_eq!(context["data"]["recentFacts"][0]["sessionId"], "42");
    assert_eq!(context["data"]["previousTopics"], json!([]));
    assert_eq!(context["data"]["calendarEvents"], json!([]));

    assert!(f.dir.path().join("memory.json").exists());
    assert_eq!(f.service.memory().unwrap().facts().len(), 1);
}
