use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::calendar::client::CalendarClient;
use crate::calendar::error::{CalendarError, CALENDAR_SERVICE, TASKS_SERVICE};
use crate::calendar::types::{
    CalendarEvent, EventTime, NewEvent, NewTask, Task, TaskList, TaskStatus, DEFAULT_TASK_LIST,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarOperation {
    GetEvents,
    CreateEvent,
    GetTaskLists,
    GetTasks,
    CreateTask,
    CompleteTask,
    DeleteTask,
}

/// One recorded invocation, in the order the client saw them.
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarCall {
    GetEvents {
        max_results: u32,
    },
    CreateEvent(NewEvent),
    GetTaskLists,
    GetTasks {
        task_list_id: String,
        max_results: u32,
    },
    CreateTask {
        task: NewTask,
        task_list_id: String,
    },
    CompleteTask {
        task_id: String,
        task_list_id: String,
    },
    DeleteTask {
        task_id: String,
        task_list_id: String,
    },
}

#[derive(Debug, Default)]
struct State {
    authenticated: bool,
    events: Vec<CalendarEvent>,
    /// (task list id, task)
    tasks: Vec<(String, Task)>,
    calls: Vec<CalendarCall>,
    failing: HashSet<CalendarOperation>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// In-process calendar used by tests and offline mode.
pub struct InMemoryCalendar {
    time_zone: Tz,
    state: Mutex<State>,
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self {
            time_zone: chrono_tz::America::New_York,
            state: Mutex::new(State {
                authenticated: true,
                ..State::default()
            }),
        }
    }

    pub fn unauthenticated() -> Self {
        let calendar = Self::new();
        calendar.lock().authenticated = false;
        calendar
    }

    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn with_events(self, events: Vec<CalendarEvent>) -> Self {
        self.lock().events = events;
        self
    }

    pub fn with_task(self, task_list_id: &str, task: Task) -> Self {
        self.lock().tasks.push((task_list_id.to_string(), task));
        self
    }

    /// Make every later call of `operation` fail with an API error.
    pub fn fail_on(&self, operation: CalendarOperation) {
        self.lock().failing.insert(operation);
    }

    pub fn calls(&self) -> Vec<CalendarCall> {
        self.lock().calls.clone()
    }

    pub fn events(&self) -> Vec<CalendarEvent> {
        self.lock().events.clone()
    }

    pub fn tasks(&self, task_list_id: &str) -> Vec<Task> {
        self.lock()
            .tasks
            .iter()
            .filter(|(list, _)| list == task_list_id)
            .map(|(_, task)| task.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the call, then applies the authentication and failure switches.
    fn begin(
        &self,
        call: CalendarCall,
        operation: CalendarOperation,
        service: &'static str,
    ) -> Result<MutexGuard<'_, State>, CalendarError> {
        let mut state = self.lock();
        state.calls.push(call);
        if !state.authenticated {
            return Err(CalendarError::NotAuthenticated { service });
        }
        if state.failing.contains(&operation) {
            return Err(CalendarError::Api {
                status: 500,
                body: format!("{operation:?} failed"),
            });
        }
        Ok(state)
    }

    fn not_found(task_id: &str) -> CalendarError {
        CalendarError::Api {
            status: 404,
            body: format!("Task {task_id} not found"),
        }
    }
}

fn resolve_list(task_list_id: &str) -> &str {
    if task_list_id.is_empty() {
        DEFAULT_TASK_LIST
    } else {
        task_list_id
    }
}

#[async_trait::async_trait]
impl CalendarClient for InMemoryCalendar {
    async fn is_authenticated(&self) -> bool {
        self.lock().authenticated
    }

    fn auth_url(&self) -> Result<String, CalendarError> {
        Ok("https://example.invalid/offline-auth".to_string())
    }

    async fn set_auth_code(&self, code: &str) -> Result<(), CalendarError> {
        if code.trim().is_empty() {
            return Err(CalendarError::Auth("Authorization code is empty".to_string()));
        }
        self.lock().authenticated = true;
        Ok(())
    }

    async fn get_events(&self, max_results: u32) -> Result<Vec<CalendarEvent>, CalendarError> {
        let state = self.begin(
            CalendarCall::GetEvents { max_results },
            CalendarOperation::GetEvents,
            CALENDAR_SERVICE,
        )?;
        Ok(state
            .events
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect())
    }

    async fn create_event(&self, event: &NewEvent) -> Result<CalendarEvent, CalendarError> {
        let mut state = self.begin(
            CalendarCall::CreateEvent(event.clone()),
            CalendarOperation::CreateEvent,
            CALENDAR_SERVICE,
        )?;

        let localize = |time: NaiveDateTime| {
            self.time_zone
                .from_local_datetime(&time)
                .earliest()
                .map(|local| local.fixed_offset())
                .ok_or_else(|| CalendarError::Api {
                    status: 400,
                    body: format!("Invalid local time {time}"),
                })
        };
        let start = localize(event.start_time)?;
        let end = localize(event.end_time)?;

        let created = CalendarEvent {
            id: Some(state.next_id("event")),
            summary: event.title.clone(),
            description: event.description.clone(),
            start: EventTime::at(start),
            end: EventTime::at(end),
            html_link: None,
        };
        state.events.push(created.clone());
        state.events.sort_by_key(|e| e.start.date_time);
        Ok(created)
    }

    async fn get_task_lists(&self) -> Result<Vec<TaskList>, CalendarError> {
        let state = self.begin(
            CalendarCall::GetTaskLists,
            CalendarOperation::GetTaskLists,
            TASKS_SERVICE,
        )?;

        let mut lists: Vec<TaskList> = vec![TaskList {
            id: DEFAULT_TASK_LIST.to_string(),
            title: "My Tasks".to_string(),
        }];
        for (list, _) in &state.tasks {
            if !lists.iter().any(|l| &l.id == list) {
                lists.push(TaskList {
                    id: list.clone(),
                    title: list.clone(),
                });
            }
        }
        Ok(lists)
    }

    async fn get_tasks(
        &self,
        task_list_id: &str,
        max_results: u32,
    ) -> Result<Vec<Task>, CalendarError> {
        let list = resolve_list(task_list_id);
        let state = self.begin(
            CalendarCall::GetTasks {
                task_list_id: list.to_string(),
                max_results,
            },
            CalendarOperation::GetTasks,
            TASKS_SERVICE,
        )?;

        Ok(state
            .tasks
            .iter()
            .filter(|(l, task)| l == list && task.status == TaskStatus::NeedsAction)
            .map(|(_, task)| task.clone())
            .take(max_results as usize)
            .collect())
    }

    async fn create_task(&self, task: &NewTask, task_list_id: &str) -> Result<Task, CalendarError> {
        let list = resolve_list(task_list_id);
        let mut state = self.begin(
            CalendarCall::CreateTask {
                task: task.clone(),
                task_list_id: list.to_string(),
            },
            CalendarOperation::CreateTask,
            TASKS_SERVICE,
        )?;

        let created = Task {
            id: state.next_id("task"),
            title: task.title.clone(),
            notes: task.notes.clone(),
            due: task.due_date.map(midnight_utc),
            status: TaskStatus::NeedsAction,
        };
        state.tasks.push((list.to_string(), created.clone()));
        Ok(created)
    }

    async fn complete_task(&self, task_id: &str, task_list_id: &str) -> Result<Task, CalendarError> {
        let list = resolve_list(task_list_id);
        let mut state = self.begin(
            CalendarCall::CompleteTask {
                task_id: task_id.to_string(),
                task_list_id: list.to_string(),
            },
            CalendarOperation::CompleteTask,
            TASKS_SERVICE,
        )?;

        let (_, task) = state
            .tasks
            .iter_mut()
            .find(|(l, task)| l == list && task.id == task_id)
            .ok_or_else(|| Self::not_found(task_id))?;
        task.status = TaskStatus::Completed;
        Ok(task.clone())
    }

    async fn delete_task(&self, task_id: &str, task_list_id: &str) -> Result<(), CalendarError> {
        let list = resolve_list(task_list_id);
        let mut state = self.begin(
            CalendarCall::DeleteTask {
                task_id: task_id.to_string(),
                task_list_id: list.to_string(),
            },
            CalendarOperation::DeleteTask,
            TASKS_SERVICE,
        )?;

        let before = state.tasks.len();
        state
            .tasks
            .retain(|(l, task)| !(l == list && task.id == task_id));
        if state.tasks.len() == before {
            return Err(Self::not_found(task_id));
        }
        Ok(())
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
