use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

use crate::calendar::{CalendarEvent, EventWhen, Task, DEFAULT_TASK_LIST};
use crate::conversation::{Message, Sender};
use crate::prompt::clock::{Clock, SystemClock};
use crate::prompt::context::MemoryContext;

pub const DEFAULT_HISTORY_WINDOW: usize = 10;

const HUMAN_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";
const HUMAN_DATE_FORMAT: &str = "%-m/%-d/%Y";

const FUNCTION_GRAMMAR: &str = r#"AVAILABLE FUNCTIONS:

1. CREATE CALENDAR EVENT:
[FUNCTION_CALL]
{
  "function": "createCalendarEvent",
  "parameters": {
    "title": "Event Title",
    "description": "Optional description",
    "startTime": "YYYY-MM-DDTHH:MM:SS",
    "endTime": "YYYY-MM-DDTHH:MM:SS"
  }
}
[/FUNCTION_CALL]

2. CREATE TASK:
[FUNCTION_CALL]
{
  "function": "createTask",
  "parameters": {
    "title": "Task Title",
    "notes": "Optional notes",
    "dueDate": "YYYY-MM-DD"
  }
}
[/FUNCTION_CALL]

3. COMPLETE TASK:
[FUNCTION_CALL]
{
  "function": "completeTask",
  "parameters": {
    "taskId": "task id from the task list",
    "taskListId": "@default"
  }
}
[/FUNCTION_CALL]

4. DELETE TASK:
[FUNCTION_CALL]
{
  "function": "deleteTask",
  "parameters": {
    "taskId": "task id from the task list",
    "taskListId": "@default"
  }
}
[/FUNCTION_CALL]"#;

const MARKDOWN_RULES: &str = "MARKDOWN FORMATTING (MANDATORY):
- Use **bold** for important information
- Use *italics* for emphasis
- Use bullet points with -
- Use ## for headings
- Use `code` for technical terms
- Use > for quotes
- Never use HTML tags";

/// Builds the single text prompt sent to the model for one turn.
///
/// Output depends only on the arguments and the clock, so a fixed clock
/// gives byte-identical prompts for identical input.
#[derive(Clone)]
pub struct PromptComposer {
    assistant_name: String,
    time_zone: Tz,
    clock: Arc<dyn Clock>,
    history_window: usize,
}

impl PromptComposer {
    pub fn new(assistant_name: impl Into<String>, time_zone: Tz) -> Self {
        Self {
            assistant_name: assistant_name.into(),
            time_zone,
            clock: Arc::new(SystemClock),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window;
        self
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn compose(&self, question: &str, history: &[Message], context: &MemoryContext) -> String {
        let history = &history[history.len().saturating_sub(self.history_window)..];

        let sections = [
            self.persona(),
            self.function_rules(),
            MARKDOWN_RULES.to_string(),
            render_memory(context),
            self.render_schedule(context),
            self.render_history(history),
            format!("Current question: {question}"),
            self.reminder(),
        ];

        sections
            .into_iter()
            .filter(|section| !section.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn persona(&self) -> String {
        let now = self.clock.now().with_timezone(&self.time_zone);
        format!(
            "You are {name}, an intelligent AI assistant. You have access to the user's Google Calendar and Google Tasks.
The current date and time is {now} ({zone}).

CAPABILITIES:
- You CAN view existing calendar events and tasks
- You CAN help plan around existing events
- You CAN discuss calendar conflicts and availability
- You CAN create new calendar events by calling functions
- You CAN create, complete, and delete tasks by calling functions",
            name = self.assistant_name,
            now = now.format("%A, %B %-d, %Y at %-I:%M %p"),
            zone = self.time_zone.name(),
        )
    }

    fn function_rules(&self) -> String {
        format!(
            "{FUNCTION_GRAMMAR}

FUNCTION CALLING RULES:
- Use the EXACT format above with [FUNCTION_CALL] and [/FUNCTION_CALL] tags
- The user is in the {zone} time zone; write calendar times as local wall-clock time
- For calendar times use a format like \"2024-09-21T14:00:00\" (no Z, no offset)
- For task due dates use a format like \"2024-09-21\"
- Use the task ids listed under CURRENT TASKS when completing or deleting tasks
- Always provide required parameters
- If the user doesn't specify a date or time, ask them for specifics",
            zone = self.time_zone.name(),
        )
    }

    fn render_schedule(&self, context: &MemoryContext) -> String {
        let mut out = String::new();

        if context.calendar_events.is_empty() {
            out.push_str(
                "CALENDAR STATUS: There are no events on the upcoming calendar (or the calendar is not accessible).",
            );
        } else {
            out.push_str("CURRENT CALENDAR EVENTS:");
            for event in &context.calendar_events {
                self.render_event(&mut out, event);
            }
        }

        out.push_str("\n\n");
        if context.tasks.is_empty() {
            out.push_str("TASKS STATUS: There are no open tasks.");
        } else {
            out.push_str("CURRENT TASKS:");
            for task in &context.tasks {
                render_task(&mut out, task);
            }
        }

        out
    }

    fn render_event(&self, out: &mut String, event: &CalendarEvent) {
        let _ = write!(
            out,
            "\n- **{}**: {} to {}",
            event.summary,
            self.render_when(event.start.when()),
            self.render_when(event.end.when()),
        );
        if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(out, "\n  Description: {description}");
        }
    }

    fn render_when(&self, when: Option<EventWhen>) -> String {
        match when {
            Some(EventWhen::At(at)) => self.local(at).format(HUMAN_TIME_FORMAT).to_string(),
            Some(EventWhen::AllDay(date)) => date.format(HUMAN_DATE_FORMAT).to_string(),
            None => "unknown time".to_string(),
        }
    }

    fn local(&self, at: DateTime<FixedOffset>) -> DateTime<Tz> {
        at.with_timezone(&self.time_zone)
    }

    fn render_history(&self, history: &[Message]) -> String {
        if history.is_empty() {
            return String::new();
        }

        let mut out = String::from("Current conversation:");
        for message in history {
            let speaker = match message.sender {
                Sender::User => "Human",
                Sender::Assistant => self.assistant_name.as_str(),
            };
            let _ = write!(out, "\n{speaker}: {}", message.text);
        }
        out
    }

    fn reminder(&self) -> String {
        "IMPORTANT:
- You have access to the user's calendar events and tasks listed above
- When asked about the calendar or schedule, refer to the specific events shown
- Respond using ONLY Markdown syntax. Do not use any HTML tags. Use # for headings, **bold**, *italic*, - for lists
- Be helpful and specific about calendar information when available"
            .to_string()
    }
}

fn render_memory(context: &MemoryContext) -> String {
    let mut out = String::from("MEMORY CONTEXT:");

    if !context.has_memories() {
        out.push_str("\nNothing remembered about the user yet.");
        return out;
    }

    if !context.user_preferences.is_empty() {
        out.push_str("\nWhat I remember about you:");
        for (key, value) in &context.user_preferences {
            let _ = write!(out, "\n- {key}: {value}");
        }
    }
    if !context.recent_facts.is_empty() {
        out.push_str("\nRecent facts from our conversations:");
        for fact in &context.recent_facts {
            let _ = write!(out, "\n- {}", fact.text);
        }
    }
    if !context.previous_topics.is_empty() {
        out.push_str("\nPrevious topics:");
        for topic in &context.previous_topics {
            let _ = write!(out, "\n- {}", topic.topic);
        }
    }

    out
}

fn render_task(out: &mut String, task: &Task) {
    let _ = write!(
        out,
        "\n- **{}** (taskId: {}, taskListId: {DEFAULT_TASK_LIST})",
        task.title, task.id
    );
    if let Some(due) = task.due {
        let _ = write!(out, "\n  Due: {}", due.date_naive().format("%Y-%m-%d"));
    }
    if let Some(notes) = task.notes.as_deref().filter(|n| !n.is_empty()) {
        let _ = write!(out, "\n  Notes: {notes}");
    }
}
