use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calendar::{NewEvent, NewTask, DEFAULT_TASK_LIST};
use crate::chat::{FunctionCallDescriptor, FunctionResult};
use crate::conversation::Message;
use crate::prompt::MemoryContext;

/// One request from an out-of-process UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServiceRequest {
    /// A user message with the context the UI has gathered for it.
    Chat {
        message: String,
        #[serde(default)]
        history: Vec<Message>,
        #[serde(default)]
        memory_context: MemoryContext,
    },
    CalendarAuthenticate,
    CalendarSetAuthCode {
        code: String,
    },
    CalendarGetEvents {
        #[serde(default = "default_max_events")]
        max_results: u32,
    },
    CalendarCreateEvent {
        event: NewEvent,
    },
    TasksGetLists,
    TasksGetTasks {
        #[serde(default = "default_task_list")]
        task_list_id: String,
        #[serde(default = "default_max_tasks")]
        max_results: u32,
    },
    TasksCreateTask {
        task: NewTask,
        #[serde(default = "default_task_list")]
        task_list_id: String,
    },
    TasksCompleteTask {
        task_id: String,
        #[serde(default = "default_task_list")]
        task_list_id: String,
    },
    TasksDeleteTask {
        task_id: String,
        #[serde(default = "default_task_list")]
        task_list_id: String,
    },
    /// Remembered details plus a live calendar and task snapshot.
    MemoryContext,
    /// Run memory extraction over a message the user sent.
    MemoryRecord {
        message: String,
        #[serde(default)]
        session_id: Option<String>,
    },
}

impl ServiceRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::CalendarAuthenticate => "calendarAuthenticate",
            Self::CalendarSetAuthCode { .. } => "calendarSetAuthCode",
            Self::CalendarGetEvents { .. } => "calendarGetEvents",
            Self::CalendarCreateEvent { .. } => "calendarCreateEvent",
            Self::TasksGetLists => "tasksGetLists",
            Self::TasksGetTasks { .. } => "tasksGetTasks",
            Self::TasksCreateTask { .. } => "tasksCreateTask",
            Self::TasksCompleteTask { .. } => "tasksCompleteTask",
            Self::TasksDeleteTask { .. } => "tasksDeleteTask",
            Self::MemoryContext => "memoryContext",
            Self::MemoryRecord { .. } => "memoryRecord",
        }
    }
}

fn default_task_list() -> String {
    DEFAULT_TASK_LIST.to_string()
}

fn default_max_events() -> u32 {
    10
}

fn default_max_tasks() -> u32 {
    20
}

/// Reply to a `ServiceRequest`. Every shape carries `success`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum ServiceResponse {
    Chat {
        success: bool,
        response: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        function_calls: Option<Vec<FunctionCallDescriptor>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        function_results: Option<Vec<FunctionResult>>,
    },
    AuthUrl {
        success: bool,
        auth_url: String,
    },
    Data {
        success: bool,
        data: Value,
    },
    Ack {
        success: bool,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl ServiceResponse {
    pub fn ack() -> Self {
        Self::Ack { success: true }
    }

    pub fn auth_url(auth_url: String) -> Self {
        Self::AuthUrl {
            success: true,
            auth_url,
        }
    }

    pub fn data<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(data) => Self::Data {
                success: true,
                data,
            },
            Err(e) => Self::failure(format!("Failed to serialize response: {e}")),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Self::Chat { success, .. }
            | Self::AuthUrl { success, .. }
            | Self::Data { success, .. }
            | Self::Ack { success }
            | Self::Failure { success, .. } => *success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_requests_default_to_default_list() {
        let request: ServiceRequest =
            serde_json::from_value(json!({"type": "tasksCompleteTask", "taskId": "t1"})).unwrap();

        assert_eq!(
            request,
            ServiceRequest::TasksCompleteTask {
                task_id: "t1".to_string(),
                task_list_id: "@default".to_string(),
            }
        );
    }

    #[test]
    fn test_chat_request_with_minimal_history() {
        let request: ServiceRequest = serde_json::from_value(json!({
            "type": "chat",
            "message": "What's on today?",
            "history": [{"text": "hi", "sender": "user"}],
        }))
        .unwrap();

        let ServiceRequest::Chat {
            message,
            history,
            memory_context,
        } = request
        else {
            panic!("expected chat request");
        };
        assert_eq!(message, "What's on today?");
        assert_eq!(history.len(), 1);
        assert_eq!(memory_context, MemoryContext::default());
    }

    #[test]
    fn test_unknown_request_type_is_rejected() {
        assert!(serde_json::from_value::<ServiceRequest>(json!({"type": "shutdown"})).is_err());
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_value(ServiceResponse::ack()).unwrap(),
            json!({"success": true})
        );
        assert_eq!(
            serde_json::to_value(ServiceResponse::auth_url("https://auth".to_string())).unwrap(),
            json!({"success": true, "authUrl": "https://auth"})
        );
        assert_eq!(
            serde_json::to_value(ServiceResponse::failure("boom")).unwrap(),
            json!({"success": false, "error": "boom"})
        );

        let chat = ServiceResponse::Chat {
            success: true,
            response: "Hello".to_string(),
            function_calls: None,
            function_results: None,
        };
        assert_eq!(
            serde_json::to_value(chat).unwrap(),
            json!({"success": true, "response": "Hello"})
        );
    }
}
