use crate::calendar::error::CalendarError;
use crate::calendar::types::{CalendarEvent, NewEvent, NewTask, Task, TaskList};

/// The calendar and task operations the assistant consumes.
///
/// Every data operation fails with `CalendarError::NotAuthenticated` until
/// an authorization code has been exchanged. Implementations own the
/// authenticated session and serialize access to it.
#[async_trait::async_trait]
pub trait CalendarClient: Send + Sync {
    async fn is_authenticated(&self) -> bool;

    /// URL the user visits to grant calendar and task access.
    fn auth_url(&self) -> Result<String, CalendarError>;

    /// Exchange an authorization code for a token and persist it.
    async fn set_auth_code(&self, code: &str) -> Result<(), CalendarError>;

    /// Upcoming events ordered by start time, recurring events expanded.
    async fn get_events(&self, max_results: u32) -> Result<Vec<CalendarEvent>, CalendarError>;

    async fn create_event(&self, event: &NewEvent) -> Result<CalendarEvent, CalendarError>;

    async fn get_task_lists(&self) -> Result<Vec<TaskList>, CalendarError>;

    /// Incomplete, non-hidden tasks of one list.
    async fn get_tasks(
        &self,
        task_list_id: &str,
        max_results: u32,
    ) -> Result<Vec<Task>, CalendarError>;

    async fn create_task(&self, task: &NewTask, task_list_id: &str)
        -> Result<Task, CalendarError>;

    async fn complete_task(&self, task_id: &str, task_list_id: &str)
        -> Result<Task, CalendarError>;

    async fn delete_task(&self, task_id: &str, task_list_id: &str) -> Result<(), CalendarError>;
}
