use jarvis_core::ai::mock::MockBehavior;
use jarvis_core::calendar::mock::CalendarCall;
use jarvis_core::calendar::InMemoryCalendar;

mod fixture;

#[test]
fn test_fixture() {
    fixture::run(|mut fixture| async move {
        let outcome = fixture.step("Hello").await;

        assert_eq!(outcome.text, "Mock response");
        assert!(outcome.reply.is_some());

        let prompt = fixture.last_request().prompt;
        assert!(prompt.contains("You are Jarvis"));
        assert!(prompt.contains("Current question: Hello"));
    });
}

#[test]
fn test_invalid_calls_do_not_stop_the_batch() {
    fixture::run(|mut fixture| async move {
        fixture.set_mock_behavior(MockBehavior::Respond {
            text: concat!(
                "Let me handle those.\n",
                "[FUNCTION_CALL]{\"function\":\"createTask\",\"parameters\":{\"title\":\"Pay rent\",\"dueDate\":\"2024-10-01\"}}[/FUNCTION_CALL]\n",
                "[FUNCTION_CALL]{not json}[/FUNCTION_CALL]\n",
                "[FUNCTION_CALL]{\"function\":\"completeTask\",\"parameters\":{\"taskId\":\"missing\"}}[/FUNCTION_CALL]\n",
                "[FUNCTION_CALL]{\"function\":\"createCalendarEvent\",\"parameters\":{\"title\":\"Standup\",\"startTime\":\"2024-09-23T09:00:00\",\"endTime\":\"2024-09-23T09:15:00\"}}[/FUNCTION_CALL]",
            )
            .to_string(),
        });

        let outcome = fixture.step("Set up my week").await;

        let reply = outcome.reply.expect("model call succeeded");
        assert_eq!(reply.calls.len(), 3);
        assert_eq!(reply.results.len(), 3);
        assert!(reply.results[0].success);
        assert!(!reply.results[1].success);
        assert!(reply.results[2].success);

        assert!(!outcome.text.contains("FUNCTION_CALL"));
        assert!(outcome.text.starts_with("Let me handle those."));
        assert!(outcome
            .text
            .contains("❌ Function failed: Failed to complete task:"));
        assert!(outcome
            .text
            .ends_with("✅ Event \"Standup\" created successfully"));

        assert_eq!(fixture.calendar.tasks("@default").len(), 1);
        assert_eq!(fixture.calendar.events().len(), 1);
    });
}

#[test]
fn test_created_task_is_visible_to_the_next_prompt() {
    fixture::run(|mut fixture| async move {
        fixture.set_mock_behavior(MockBehavior::BehaviorQueue {
            behaviors: vec![
                MockBehavior::Respond {
                    text: "[FUNCTION_CALL]{\"function\":\"createTask\",\"parameters\":{\"title\":\"Water plants\"}}[/FUNCTION_CALL]".to_string(),
                },
                MockBehavior::Success,
            ],
        });

        let first = fixture.step("Remind me to water the plants").await;
        assert_eq!(first.text, "✅ Task \"Water plants\" created successfully");

        fixture.step("What's on my list?").await;
        let prompt = fixture.last_request().prompt;
        assert!(prompt.contains("**Water plants** (taskId: task-1, taskListId: @default)"));
    });
}

#[test]
fn test_unauthenticated_calendar_still_answers() {
    fixture::run_with_calendar(InMemoryCalendar::unauthenticated(), |mut fixture| async move {
        let outcome = fixture.step("What's on today?").await;

        assert_eq!(outcome.text, "Mock response");
        let prompt = fixture.last_request().prompt;
        assert!(prompt.contains("no events"));
        assert!(prompt.contains("no open tasks"));
        assert!(matches!(
            fixture.calendar.calls().as_slice(),
            [CalendarCall::GetEvents { .. }, CalendarCall::GetTasks { .. }]
        ));
    });
}

#[test]
fn test_model_error_becomes_apology() {
    fixture::run(|mut fixture| async move {
        fixture.set_mock_behavior(MockBehavior::AlwaysRetryableError);

        let outcome = fixture.step("Hello").await;

        assert!(outcome.reply.is_none());
        assert_eq!(
            outcome.text,
            "Sorry, I encountered an error: Retryable error: Mock retryable error (always fails)"
        );
    });
}
