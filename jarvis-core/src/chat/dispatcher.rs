use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::calendar::{CalendarClient, CalendarError, DEFAULT_TASK_LIST};
use crate::chat::calls::{
    CallError, FunctionCall, FunctionCallDescriptor, FunctionName, FunctionResult,
};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("{prefix}: {source}", prefix = .function.failure_prefix())]
    Invalid {
        function: FunctionName,
        source: CallError,
    },

    #[error("{prefix}: {source}", prefix = .function.failure_prefix())]
    Calendar {
        function: FunctionName,
        source: CalendarError,
    },
}

/// Executes call descriptors against the calendar, one at a time.
#[derive(Clone)]
pub struct FunctionDispatcher {
    calendar: Arc<dyn CalendarClient>,
}

impl FunctionDispatcher {
    pub fn new(calendar: Arc<dyn CalendarClient>) -> Self {
        Self { calendar }
    }

    /// Returns exactly one result per descriptor, in input order. A failing
    /// call never prevents the calls after it from running.
    pub async fn dispatch(&self, calls: &[FunctionCallDescriptor]) -> Vec<FunctionResult> {
        let mut results = Vec::with_capacity(calls.len());

        for descriptor in calls {
            let result = match self.execute(descriptor).await {
                Ok(result) => {
                    info!(function = %descriptor.function, message = %result.message, "Function call succeeded");
                    result
                }
                Err(e) => {
                    error!(function = %descriptor.function, error = %e, "Function call failed");
                    FunctionResult::failed(&descriptor.function, e.to_string())
                }
            };
            results.push(result);
        }

        results
    }

    async fn execute(
        &self,
        descriptor: &FunctionCallDescriptor,
    ) -> Result<FunctionResult, DispatchError> {
        let Ok(function) = FunctionName::from_str(&descriptor.function) else {
            warn!(function = %descriptor.function, "Model requested an unknown function");
            return Err(DispatchError::UnknownFunction(descriptor.function.clone()));
        };

        let call = FunctionCall::parse(function, &descriptor.parameters)
            .map_err(|source| DispatchError::Invalid { function, source })?;
        let calendar_failure = |source| DispatchError::Calendar { function, source };

        match call {
            FunctionCall::CreateCalendarEvent(event) => {
                let created = self
                    .calendar
                    .create_event(&event)
                    .await
                    .map_err(calendar_failure)?;
                Ok(FunctionResult::succeeded(
                    function,
                    payload(&created),
                    format!("Event \"{}\" created successfully", event.title),
                ))
            }
            FunctionCall::CreateTask(task) => {
                let created = self
                    .calendar
                    .create_task(&task, DEFAULT_TASK_LIST)
                    .await
                    .map_err(calendar_failure)?;
                Ok(FunctionResult::succeeded(
                    function,
                    payload(&created),
                    format!("Task \"{}\" created successfully", task.title),
                ))
            }
            FunctionCall::CompleteTask {
                task_id,
                task_list_id,
            } => {
                let updated = self
                    .calendar
                    .complete_task(&task_id, &task_list_id)
                    .await
                    .map_err(calendar_failure)?;
                Ok(FunctionResult::succeeded(
                    function,
                    payload(&updated),
                    "Task completed successfully".to_string(),
                ))
            }
            FunctionCall::DeleteTask {
                task_id,
                task_list_id,
            } => {
                self.calendar
                    .delete_task(&task_id, &task_list_id)
                    .await
                    .map_err(calendar_failure)?;
                Ok(FunctionResult::succeeded(
                    function,
                    None,
                    "Task deleted successfully".to_string(),
                ))
            }
        }
    }
}

fn payload<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}
