use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::calendar::{NewEvent, NewTask, DEFAULT_TASK_LIST};

/// A call block as decoded from model output, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallDescriptor {
    pub function: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::VariantArray,
)]
#[strum(serialize_all = "camelCase")]
pub enum FunctionName {
    CreateCalendarEvent,
    CreateTask,
    CompleteTask,
    DeleteTask,
}

impl FunctionName {
    /// Prefix put in front of any failure of this call.
    pub fn failure_prefix(self) -> &'static str {
        match self {
            FunctionName::CreateCalendarEvent => "Failed to create calendar event",
            FunctionName::CreateTask => "Failed to create task",
            FunctionName::CompleteTask => "Failed to complete task",
            FunctionName::DeleteTask => "Failed to delete task",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("parameter '{0}' must be a string")]
    NotAString(&'static str),

    #[error("parameter '{name}' has invalid value '{value}', expected {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("endTime {end} is before startTime {start}")]
    EndBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// The validated form of a call block.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionCall {
    CreateCalendarEvent(NewEvent),
    CreateTask(NewTask),
    CompleteTask {
        task_id: String,
        task_list_id: String,
    },
    DeleteTask {
        task_id: String,
        task_list_id: String,
    },
}

impl FunctionCall {
    pub fn from_descriptor(descriptor: &FunctionCallDescriptor) -> Result<Self, CallError> {
        let name = FunctionName::from_str(&descriptor.function)
            .map_err(|_| CallError::UnknownFunction(descriptor.function.clone()))?;
        Self::parse(name, &descriptor.parameters)
    }

    pub fn parse(name: FunctionName, parameters: &Map<String, Value>) -> Result<Self, CallError> {
        let params = Params(parameters);
        match name {
            FunctionName::CreateCalendarEvent => {
                let title = params.required("title")?.to_string();
                let start_time = parse_local_time("startTime", params.required("startTime")?)?;
                let end_time = parse_local_time("endTime", params.required("endTime")?)?;
                if end_time < start_time {
                    return Err(CallError::EndBeforeStart {
                        start: start_time,
                        end: end_time,
                    });
                }
                Ok(FunctionCall::CreateCalendarEvent(NewEvent {
                    title,
                    description: params.optional("description")?.map(str::to_string),
                    start_time,
                    end_time,
                }))
            }
            FunctionName::CreateTask => {
                let notes = match params.optional("notes")? {
                    Some(notes) => Some(notes),
                    None => params.optional("description")?,
                };
                Ok(FunctionCall::CreateTask(NewTask {
                    title: params.required("title")?.to_string(),
                    notes: notes.map(str::to_string),
                    due_date: params
                        .optional("dueDate")?
                        .map(|due| parse_due_date("dueDate", due))
                        .transpose()?,
                }))
            }
            FunctionName::CompleteTask => Ok(FunctionCall::CompleteTask {
                task_id: params.required("taskId")?.to_string(),
                task_list_id: params.task_list_id()?,
            }),
            FunctionName::DeleteTask => Ok(FunctionCall::DeleteTask {
                task_id: params.required("taskId")?.to_string(),
                task_list_id: params.task_list_id()?,
            }),
        }
    }

    pub fn name(&self) -> FunctionName {
        match self {
            FunctionCall::CreateCalendarEvent(_) => FunctionName::CreateCalendarEvent,
            FunctionCall::CreateTask(_) => FunctionName::CreateTask,
            FunctionCall::CompleteTask { .. } => FunctionName::CompleteTask,
            FunctionCall::DeleteTask { .. } => FunctionName::DeleteTask,
        }
    }
}

struct Params<'a>(&'a Map<String, Value>);

impl<'a> Params<'a> {
    /// Absent, null and blank values all count as not provided.
    fn optional(&self, name: &'static str) -> Result<Option<&'a str>, CallError> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => {
                let value = value.trim();
                Ok((!value.is_empty()).then_some(value))
            }
            Some(_) => Err(CallError::NotAString(name)),
        }
    }

    fn required(&self, name: &'static str) -> Result<&'a str, CallError> {
        self.optional(name)?
            .ok_or(CallError::MissingParameter(name))
    }

    fn task_list_id(&self) -> Result<String, CallError> {
        Ok(self
            .optional("taskListId")?
            .unwrap_or(DEFAULT_TASK_LIST)
            .to_string())
    }
}

/// Wall-clock time without a zone suffix; seconds and fractions are optional.
fn parse_local_time(name: &'static str, value: &str) -> Result<NaiveDateTime, CallError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .map_err(|_| CallError::InvalidValue {
            name,
            value: value.to_string(),
            expected: "YYYY-MM-DDTHH:MM:SS",
        })
}

/// Accepts a plain date or any datetime form, keeping only the date.
fn parse_due_date(name: &'static str, value: &str) -> Result<NaiveDate, CallError> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date_time) = parse_local_time(name, value) {
        return Ok(date_time.date());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|date_time| date_time.date_naive())
        .map_err(|_| CallError::InvalidValue {
            name,
            value: value.to_string(),
            expected: "YYYY-MM-DD",
        })
}

/// Outcome of one dispatched call, in the shape the request surface returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResult {
    pub success: bool,
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

impl FunctionResult {
    pub fn succeeded(function: FunctionName, result: Option<Value>, message: String) -> Self {
        Self {
            success: true,
            function: function.to_string(),
            result,
            error: None,
            message,
        }
    }

    pub fn failed(function: &str, error: String) -> Self {
        Self {
            success: false,
            function: function.to_string(),
            result: None,
            message: format!("Function failed: {error}"),
            error: Some(error),
        }
    }
}
