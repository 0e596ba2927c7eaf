mod fixture;

use jarvis_core::ai::mock::MockBehavior;

#[test]
fn test_sessions_keep_separate_histories() {
    fixture::run(|mut fixture| async move {
        fixture.step("Plan my trip to Lisbon").await;
        let first_id = fixture.assistant.conversation().active().unwrap().id.clone();

        let second_id = fixture.assistant.conversation_mut().create_session().id.clone();
        assert_ne!(first_id, second_id);

        fixture.step("What is on my calendar?").await;
        let prompt = fixture.last_request().prompt;
        assert!(!prompt.contains("Human: Plan my trip to Lisbon"));

        fixture.assistant.conversation_mut().select(&first_id).unwrap();
        fixture.step("Book the hotel too").await;
        let prompt = fixture.last_request().prompt;
        assert!(prompt.contains("Human: Plan my trip to Lisbon"));
        assert!(!prompt.contains("Human: What is on my calendar?"));

        let titles: Vec<&str> = fixture
            .assistant
            .conversation()
            .sessions()
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Plan my trip to Lisbon", "What is on my calendar?"]);
    });
}

#[test]
fn test_history_window_is_bounded() {
    fixture::run(|mut fixture| async move {
        fixture.set_mock_behavior(MockBehavior::Success);
        for i in 0..8 {
            fixture.step(format!("message number {i}")).await;
        }

        let session = fixture.assistant.conversation().active().unwrap();
        assert_eq!(session.messages().len(), 16);

        // 14 prior messages, only the last 10 reach the prompt.
        let prompt = fixture.last_request().prompt;
        assert!(!prompt.contains("Human: message number 0\n"));
        assert!(!prompt.contains("Human: message number 1\n"));
        assert!(prompt.contains("Human: message number 2\n"));
        assert!(prompt.contains("Current question: message number 7"));
    });
}

#[test]
fn test_long_first_message_is_truncated_in_title() {
    fixture::run(|mut fixture| async move {
        fixture
            .step("Can you help me organise the garage sale next weekend?")
            .await;

        let session = fixture.assistant.conversation().active().unwrap();
        assert_eq!(session.title, "Can you help me organise the g...");
    });
}

#[test]
fn test_switching_to_unknown_session_fails() {
    fixture::run(|mut fixture| async move {
        fixture.step("hello").await;
        assert!(fixture.assistant.conversation_mut().select("0").is_err());
    });
}
