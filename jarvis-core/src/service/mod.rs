//! The request surface an out-of-process UI drives, and the in-process turn
//! driver the terminal UI uses.

pub mod assistant;
pub mod factory;
pub mod request;
pub mod snapshot;

use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};

use crate::calendar::CalendarClient;
use crate::chat::ChatEngine;
use crate::memory::{analyze, MemoryStore};

pub use assistant::{Assistant, TurnOutcome};
pub use request::{ServiceRequest, ServiceResponse};
pub use snapshot::{gather_context, ContextLimits};

/// Answers `ServiceRequest`s one at a time.
pub struct AssistantService {
    engine: ChatEngine,
    calendar: Arc<dyn CalendarClient>,
    memory: Option<MemoryStore>,
    limits: ContextLimits,
}

impl AssistantService {
    pub fn new(
        engine: ChatEngine,
        calendar: Arc<dyn CalendarClient>,
        memory: Option<MemoryStore>,
        limits: ContextLimits,
    ) -> Self {
        Self {
            engine,
            calendar,
            memory,
            limits,
        }
    }

    pub async fn handle(&mut self, request: ServiceRequest) -> ServiceResponse {
        let kind = request.kind();
        debug!(kind, "Handling request");

        let response = match request {
            ServiceRequest::Chat {
                message,
                history,
                memory_context,
            } => match self.engine.respond(&message, &history, &memory_context).await {
                Ok(reply) => {
                    let has_calls = !reply.calls.is_empty();
                    ServiceResponse::Chat {
                        success: true,
                        response: reply.visible_text,
                        function_calls: has_calls.then_some(reply.calls),
                        function_results: has_calls.then_some(reply.results),
                    }
                }
                Err(e) => ServiceResponse::failure(e.to_string()),
            },
            ServiceRequest::CalendarAuthenticate => match self.calendar.auth_url() {
                Ok(url) => ServiceResponse::auth_url(url),
                Err(e) => ServiceResponse::failure(e.to_string()),
            },
            ServiceRequest::CalendarSetAuthCode { code } => {
                match self.calendar.set_auth_code(code.trim()).await {
                    Ok(()) => ServiceResponse::ack(),
                    Err(e) => ServiceResponse::failure(e.to_string()),
                }
            }
            ServiceRequest::CalendarGetEvents { max_results } => {
                respond_with(self.calendar.get_events(max_results).await)
            }
            ServiceRequest::CalendarCreateEvent { event } => {
                respond_with(self.calendar.create_event(&event).await)
            }
            ServiceRequest::TasksGetLists => respond_with(self.calendar.get_task_lists().await),
            ServiceRequest::TasksGetTasks {
                task_list_id,
                max_results,
            } => respond_with(self.calendar.get_tasks(&task_list_id, max_results).await),
            ServiceRequest::TasksCreateTask { task, task_list_id } => {
                respond_with(self.calendar.create_task(&task, &task_list_id).await)
            }
            ServiceRequest::TasksCompleteTask {
                task_id,
                task_list_id,
            } => respond_with(self.calendar.complete_task(&task_id, &task_list_id).await),
            ServiceRequest::TasksDeleteTask {
                task_id,
                task_list_id,
            } => match self.calendar.delete_task(&task_id, &task_list_id).await {
                Ok(()) => ServiceResponse::ack(),
                Err(e) => ServiceResponse::failure(e.to_string()),
            },
            ServiceRequest::MemoryContext => {
                let context =
                    gather_context(self.calendar.as_ref(), self.memory.as_ref(), self.limits)
                        .await;
                ServiceResponse::data(&context)
            }
            ServiceRequest::MemoryRecord {
                message,
                session_id,
            } => self.record(&message, session_id.as_deref()),
        };

        if let ServiceResponse::Failure { error, .. } = &response {
            error!(kind, error = %error, "Request failed");
        }
        response
    }

    fn record(&mut self, message: &str, session_id: Option<&str>) -> ServiceResponse {
        let Some(store) = self.memory.as_mut() else {
            return ServiceResponse::failure("Memory is disabled");
        };

        let extraction = analyze(message);
        if !extraction.is_empty() {
            if let Err(e) = store.apply(&extraction, session_id) {
                return ServiceResponse::failure(format!("{e:#}"));
            }
        }
        ServiceResponse::data(&extraction)
    }

    pub fn memory(&self) -> Option<&MemoryStore> {
        self.memory.as_ref()
    }
}

fn respond_with<T: Serialize, E: Display>(result: Result<T, E>) -> ServiceResponse {
    match result {
        Ok(value) => ServiceResponse::data(&value),
        Err(e) => ServiceResponse::failure(e.to_string()),
    }
}

#[cfg(test)]
mod tests;
