//! Heuristics that pick memorable details out of a user message.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const REMEMBER_PREFIXES: [&str; 2] = ["remember that ", "remember: "];
const TOPIC_CHARS: usize = 50;

/// What one user message contributes to memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryExtraction {
    pub preferences: BTreeMap<&'static str, String>,
    pub fact: Option<String>,
    pub topic: Option<String>,
}

impl MemoryExtraction {
    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty() && self.fact.is_none() && self.topic.is_none()
    }
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid memory regex")
}

/// A message in any of these categories is stored whole as a fact.
static FACT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // possessive statements
        r"(?i)^my\b.*\b(is|are)\b",
        // ownership
        r"(?i)\bi (have|own)\b",
        // likes
        r"(?i)\bi (like|love|prefer)\b",
        // skills; "cannot" and "can't" are not
        r"(?i)\bi (know how to|can|have experience)([^\w'’]|$)",
        // goals and projects
        r"(?i)\b(i am working on|my goal is|i am building)\b",
    ]
    .into_iter()
    .map(regex)
    .collect()
});

static NAME: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bmy name is (\w+)"));

static JOB: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bi work at ([^.!?]+)",
        r"(?i)\bi am an? ([^.!?]+)",
        r"(?i)\bmy job is ([^.!?]+)",
    ]
    .into_iter()
    .map(regex)
    .collect()
});

static LOCATION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)\bi live in ([^.!?]+)", r"(?i)\bi am from ([^.!?]+)"]
        .into_iter()
        .map(regex)
        .collect()
});

/// Classify `message`. Pure; the caller applies the result to the store.
///
/// A leading "remember that " / "remember: " records the remainder as the
/// only fact and skips everything else, including the topic entry.
pub fn analyze(message: &str) -> MemoryExtraction {
    let message = message.trim_start();
    if message.is_empty() {
        return MemoryExtraction::default();
    }

    if let Some(remainder) = strip_remember_prefix(message) {
        let remainder = remainder.trim();
        return MemoryExtraction {
            fact: (!remainder.is_empty()).then(|| remainder.to_string()),
            ..MemoryExtraction::default()
        };
    }

    let message = message.trim_end();
    let mut extraction = MemoryExtraction {
        topic: Some(message.chars().take(TOPIC_CHARS).collect()),
        ..MemoryExtraction::default()
    };

    if FACT_PATTERNS.iter().any(|pattern| pattern.is_match(message)) {
        extraction.fact = Some(message.to_string());
    }

    if let Some(name) = first_capture(std::slice::from_ref(&*NAME), message) {
        extraction.preferences.insert("name", name);
    }
    if let Some(job) = first_capture(&JOB, message) {
        extraction.preferences.insert("job", job);
    }
    if let Some(location) = first_capture(&LOCATION, message) {
        extraction.preferences.insert("location", location);
    }

    extraction
}

fn strip_remember_prefix(message: &str) -> Option<&str> {
    REMEMBER_PREFIXES.iter().find_map(|prefix| {
        message
            .get(..prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(prefix))
            .map(|_| &message[prefix.len()..])
    })
}

fn first_capture(patterns: &[Regex], message: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(message)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_remember_command_short_circuits() {
        let extraction = analyze("remember that I hate mushrooms");

        assert_eq!(extraction.fact.as_deref(), Some("I hate mushrooms"));
        assert_eq!(extraction.topic, None);
        assert!(extraction.preferences.is_empty());
    }

    #[rstest]
    #[case("Remember: my name is Jo", Some("my name is Jo"))]
    #[case("REMEMBER THAT the gate code is 1234", Some("the gate code is 1234"))]
    #[case("remember:    ", None)]
    fn test_remember_variants(#[case] message: &str, #[case] fact: Option<&str>) {
        let extraction = analyze(message);
        assert_eq!(extraction.fact.as_deref(), fact);
        assert!(extraction.preferences.is_empty());
        assert_eq!(extraction.topic, None);
    }

    #[test]
    fn test_name_sets_preference_and_topic() {
        let extraction = analyze("My name is Alex.");

        assert_eq!(extraction.preferences.get("name").map(String::as_str), Some("Alex"));
        assert_eq!(extraction.topic.as_deref(), Some("My name is Alex."));
        // Also a possessive statement.
        assert_eq!(extraction.fact.as_deref(), Some("My name is Alex."));
    }

    #[rstest]
    #[case("I work at Acme Corp. It is fine.", "job", "Acme Corp")]
    #[case("Honestly I am a nurse!", "job", "nurse")]
    #[case("i am an architect", "job", "architect")]
    #[case("My job is teaching kids", "job", "teaching kids")]
    #[case("I live in Boston, near the river.", "location", "Boston, near the river")]
    #[case("I am from Ohio", "location", "Ohio")]
    fn test_preferences(#[case] message: &str, #[case] key: &str, #[case] value: &str) {
        let extraction = analyze(message);
        assert_eq!(extraction.preferences.get(key).map(String::as_str), Some(value));
        assert!(extraction.topic.is_some());
    }

    #[rstest]
    #[case("I have two cats")]
    #[case("i own a bike")]
    #[case("I love hiking and I like tea")]
    #[case("I prefer mornings")]
    #[case("I know how to sail")]
    #[case("I can juggle")]
    #[case("I am building a shed")]
    #[case("my goal is to run a marathon")]
    #[case("My kids are in school")]
    fn test_fact_categories(#[case] message: &str) {
        let extraction = analyze(message);
        assert_eq!(extraction.fact.as_deref(), Some(message));
    }

    #[rstest]
    #[case("What's on my calendar?")]
    #[case("Hi Icanthink")]
    #[case("The okapi lives in zoos")]
    #[case("Mystery novels are great")]
    fn test_no_fact_only_topic(#[case] message: &str) {
        let extraction = analyze(message);
        assert_eq!(extraction.fact, None);
        assert!(extraction.preferences.is_empty());
        assert_eq!(extraction.topic.as_deref(), Some(message));
    }

    #[rstest]
    #[case("I cannot come on Friday")]
    #[case("I can't make it tonight")]
    #[case("Sorry, i can’t help")]
    fn test_negated_can_is_not_a_skill(#[case] message: &str) {
        let extraction = analyze(message);
        assert_eq!(extraction.fact, None);
        assert_eq!(extraction.topic.as_deref(), Some(message));
    }

    #[test]
    fn test_topic_is_truncated() {
        let message = "a".repeat(70);
        assert_eq!(analyze(&message).topic.unwrap().len(), 50);
    }

    #[test]
    fn test_blank_message_records_nothing() {
        assert!(analyze("   ").is_empty());
    }
}
