use tracing::warn;

use crate::calendar::{CalendarClient, DEFAULT_TASK_LIST};
use crate::memory::MemoryStore;
use crate::prompt::MemoryContext;
use crate::settings::Settings;

/// How much of the stores and the calendar goes into each prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_events: u32,
    pub max_tasks: u32,
    pub recent_facts: usize,
    pub recent_topics: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ContextLimits {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_events: settings.calendar.max_events,
            max_tasks: settings.calendar.max_tasks,
            recent_facts: settings.memory.recent_facts,
            recent_topics: settings.memory.recent_topics,
        }
    }
}

/// Memory snapshot plus upcoming events and open default-list tasks.
///
/// Calendar failures, including not being authenticated yet, leave the
/// corresponding list empty.
pub async fn gather_context(
    calendar: &dyn CalendarClient,
    memory: Option<&MemoryStore>,
    limits: ContextLimits,
) -> MemoryContext {
    let snapshot = memory
        .map(|store| store.snapshot(limits.recent_facts, limits.recent_topics))
        .unwrap_or_default();

    let events = match calendar.get_events(limits.max_events).await {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "Continuing without calendar events");
            Vec::new()
        }
    };

    let tasks = match calendar.get_tasks(DEFAULT_TASK_LIST, limits.max_tasks).await {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(error = %e, "Continuing without tasks");
            Vec::new()
        }
    };

    MemoryContext::new(snapshot, events, tasks)
}
