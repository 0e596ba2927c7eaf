use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarEvent, Task};
use crate::memory::{Fact, MemorySnapshot, Topic};

/// Everything besides the conversation that the model gets to see.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryContext {
    #[serde(default)]
    pub user_preferences: BTreeMap<String, String>,
    #[serde(default)]
    pub recent_facts: Vec<Fact>,
    #[serde(default)]
    pub previous_topics: Vec<Topic>,
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,
    /// Open tasks of the default list.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl MemoryContext {
    pub fn new(memory: MemorySnapshot, calendar_events: Vec<CalendarEvent>, tasks: Vec<Task>) -> Self {
        Self {
            user_preferences: memory.user_preferences,
            recent_facts: memory.recent_facts,
            previous_topics: memory.previous_topics,
            calendar_events,
            tasks,
        }
    }

    pub fn has_memories(&self) -> bool {
        !self.user_preferences.is_empty()
            || !self.recent_facts.is_empty()
            || !self.previous_topics.is_empty()
    }
}
