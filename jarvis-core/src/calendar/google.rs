use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::calendar::auth::{self, OAuthConfig, TokenSet, TokenStore};
use crate::calendar::client::CalendarClient;
use crate::calendar::error::{CalendarError, CALENDAR_SERVICE, TASKS_SERVICE};
use crate::calendar::types::{
    CalendarEvent, NewEvent, NewTask, Task, TaskList, LOCAL_DATE_TIME_FORMAT,
};

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const TASKS_API_BASE: &str = "https://tasks.googleapis.com/tasks/v1";

/// Google Calendar v3 and Tasks v1 over REST.
///
/// The token is loaded from the store once at construction and written back
/// after every exchange or refresh.
pub struct GoogleCalendarClient {
    http: Client,
    oauth: OAuthConfig,
    store: TokenStore,
    tokens: Mutex<Option<TokenSet>>,
    time_zone: String,
    calendar_base: String,
    tasks_base: String,
}

impl GoogleCalendarClient {
    pub fn new(oauth: OAuthConfig, store: TokenStore, time_zone: String) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        let tokens = match store.load() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(?e, path = %store.path().display(), "Ignoring unreadable token file");
                None
            }
        };

        Ok(Self {
            http,
            oauth,
            store,
            tokens: Mutex::new(tokens),
            time_zone,
            calendar_base: CALENDAR_API_BASE.to_string(),
            tasks_base: TASKS_API_BASE.to_string(),
        })
    }

    /// Point both APIs at another host, e.g. a local stub server.
    pub fn with_base_urls(mut self, calendar_base: String, tasks_base: String) -> Self {
        self.calendar_base = calendar_base.trim_end_matches('/').to_string();
        self.tasks_base = tasks_base.trim_end_matches('/').to_string();
        self
    }

    /// Returns a usable access token, refreshing it first when it has expired.
    async fn access_token(&self, service: &'static str) -> Result<String, CalendarError> {
        let mut guard = self.tokens.lock().await;
        let Some(current) = guard.as_ref() else {
            return Err(CalendarError::NotAuthenticated { service });
        };

        if !current.is_expired(Utc::now()) {
            return Ok(current.access_token.clone());
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            warn!("Access token expired and no refresh token is stored");
            return Err(CalendarError::NotAuthenticated { service });
        };

        let refreshed = auth::refresh(&self.http, &self.oauth, &refresh_token).await?;
        self.store.save(&refreshed).map_err(CalendarError::Storage)?;
        let access_token = refreshed.access_token.clone();
        *guard = Some(refreshed);
        Ok(access_token)
    }

    async fn request(
        &self,
        service: &'static str,
        method: Method,
        url: String,
    ) -> Result<RequestBuilder, CalendarError> {
        let token = self.access_token(service).await?;
        debug!(%method, %url, "Google API request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    fn calendar_url(&self, path: &str) -> String {
        format!("{}/{}", self.calendar_base, path)
    }

    fn tasks_url(&self, path: &str) -> String {
        format!("{}/{}", self.tasks_base, path)
    }
}

async fn check_status(response: Response) -> Result<Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CalendarError::Api {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CalendarError> {
    Ok(check_status(response).await?.json::<T>().await?)
}

#[derive(Debug, Default, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<Value>,
}

/// Keep the items that match the typed model; log and skip the rest.
fn decode_items<T: DeserializeOwned>(items: Vec<Value>, kind: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(kind, ?e, "Dropping malformed item from Google API");
                None
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    start: LocalTimeBody<'a>,
    end: LocalTimeBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocalTimeBody<'a> {
    date_time: String,
    time_zone: &'a str,
}

#[derive(Debug, Serialize)]
struct TaskBody<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    due: Option<String>,
}

impl<'a> EventBody<'a> {
    fn new(event: &'a NewEvent, time_zone: &'a str) -> Self {
        Self {
            summary: &event.title,
            description: event.description.as_deref(),
            start: LocalTimeBody {
                date_time: event.start_time.format(LOCAL_DATE_TIME_FORMAT).to_string(),
                time_zone,
            },
            end: LocalTimeBody {
                date_time: event.end_time.format(LOCAL_DATE_TIME_FORMAT).to_string(),
                time_zone,
            },
        }
    }
}

impl<'a> TaskBody<'a> {
    fn new(task: &'a NewTask) -> Self {
        Self {
            title: &task.title,
            notes: task.notes.as_deref(),
            // The Tasks API only keeps the date part of `due`.
            due: task
                .due_date
                .map(|date| format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))),
        }
    }
}

#[async_trait::async_trait]
impl CalendarClient for GoogleCalendarClient {
    async fn is_authenticated(&self) -> bool {
        self.tokens.lock().await.is_some()
    }

    fn auth_url(&self) -> Result<String, CalendarError> {
        self.oauth.authorization_url()
    }

    async fn set_auth_code(&self, code: &str) -> Result<(), CalendarError> {
        let tokens = auth::exchange_code(&self.http, &self.oauth, code).await?;
        self.store.save(&tokens).map_err(CalendarError::Storage)?;
        *self.tokens.lock().await = Some(tokens);
        info!(path = %self.store.path().display(), "Google token saved");
        Ok(())
    }

    async fn get_events(&self, max_results: u32) -> Result<Vec<CalendarEvent>, CalendarError> {
        let time_min = Utc::now().to_rfc3339();
        let max_results = max_results.to_string();
        let response = self
            .request(
                CALENDAR_SERVICE,
                Method::GET,
                self.calendar_url("calendars/primary/events"),
            )
            .await?
            .query(&[
                ("timeMin", time_min.as_str()),
                ("maxResults", max_results.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?;

        let page: ItemsPage = read_json(response).await?;
        let events: Vec<CalendarEvent> = decode_items(page.items, "event");
        Ok(events
            .into_iter()
            .filter(|event| {
                let keep = event.is_well_formed();
                if !keep {
                    warn!(summary = %event.summary, "Dropping event without start or end");
                }
                keep
            })
            .collect())
    }

    async fn create_event(&self, event: &NewEvent) -> Result<CalendarEvent, CalendarError> {
        let body = EventBody::new(event, &self.time_zone);
        let response = self
            .request(
                CALENDAR_SERVICE,
                Method::POST,
                self.calendar_url("calendars/primary/events"),
            )
            .await?
            .json(&body)
            .send()
            .await?;

        let created: CalendarEvent = read_json(response).await?;
        info!(id = ?created.id, title = %created.summary, "Calendar event created");
        Ok(created)
    }

    async fn get_task_lists(&self) -> Result<Vec<TaskList>, CalendarError> {
        let response = self
            .request(TASKS_SERVICE, Method::GET, self.tasks_url("users/@me/lists"))
            .await?
            .send()
            .await?;

        let page: ItemsPage = read_json(response).await?;
        Ok(decode_items(page.items, "task list"))
    }

    async fn get_tasks(
        &self,
        task_list_id: &str,
        max_results: u32,
    ) -> Result<Vec<Task>, CalendarError> {
        let max_results = max_results.to_string();
        let response = self
            .request(
                TASKS_SERVICE,
                Method::GET,
                self.tasks_url(&format!("lists/{task_list_id}/tasks")),
            )
            .await?
            .query(&[
                ("maxResults", max_results.as_str()),
                ("showCompleted", "false"),
                ("showHidden", "false"),
            ])
            .send()
            .await?;

        let page: ItemsPage = read_json(response).await?;
        Ok(decode_items(page.items, "task"))
    }

    async fn create_task(&self, task: &NewTask, task_list_id: &str) -> Result<Task, CalendarError> {
        let response = self
            .request(
                TASKS_SERVICE,
                Method::POST,
                self.tasks_url(&format!("lists/{task_list_id}/tasks")),
            )
            .await?
            .json(&TaskBody::new(task))
            .send()
            .await?;

        let created: Task = read_json(response).await?;
        info!(id = %created.id, title = %created.title, "Task created");
        Ok(created)
    }

    async fn complete_task(&self, task_id: &str, task_list_id: &str) -> Result<Task, CalendarError> {
        let response = self
            .request(
                TASKS_SERVICE,
                Method::PATCH,
                self.tasks_url(&format!("lists/{task_list_id}/tasks/{task_id}")),
            )
            .await?
            .json(&serde_json::json!({ "status": "completed" }))
            .send()
            .await?;

        let updated: Task = read_json(response).await?;
        info!(id = %updated.id, "Task completed");
        Ok(updated)
    }

    async fn delete_task(&self, task_id: &str, task_list_id: &str) -> Result<(), CalendarError> {
        let response = self
            .request(
                TASKS_SERVICE,
                Method::DELETE,
                self.tasks_url(&format!("lists/{task_list_id}/tasks/{task_id}")),
            )
            .await?
            .send()
            .await?;

        check_status(response).await?;
        info!(id = task_id, "Task deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn client(temp_dir: &TempDir) -> GoogleCalendarClient {
        GoogleCalendarClient::new(
            OAuthConfig::new("id".to_string(), "secret".to_string()),
            TokenStore::new(temp_dir.path().join("token.json")),
            "America/New_York".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_operations_fail_without_token() {
        let temp_dir = TempDir::new().unwrap();
        let client = client(&temp_dir);

        assert!(!client.is_authenticated().await);
        let err = client.get_events(10).await.unwrap_err();
        assert!(matches!(
            err,
            CalendarError::NotAuthenticated {
                service: CALENDAR_SERVICE
            }
        ));
        let err = client.delete_task("t1", "@default").await.unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(err.to_string(), "Not authenticated with Google Tasks");
    }

    #[tokio::test]
    async fn test_stored_token_is_loaded_at_construction() {
        let temp_dir = TempDir::new().unwrap();
        TokenStore::new(temp_dir.path().join("token.json"))
            .save(&TokenSet {
                access_token: "abc".to_string(),
                refresh_token: None,
                expiry: None,
                token_type: Some("Bearer".to_string()),
                scope: None,
            })
            .unwrap();

        assert!(client(&temp_dir).is_authenticated().await);
    }

    #[test]
    fn test_event_body_carries_time_zone_on_both_ends() {
        let event = NewEvent {
            title: "Dentist".to_string(),
            description: None,
            start_time: NaiveDate::from_ymd_opt(2024, 9, 21)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
            end_time: NaiveDate::from_ymd_opt(2024, 9, 21)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
        };

        let body = serde_json::to_value(EventBody::new(&event, "America/New_York")).unwrap();

        assert_eq!(body["summary"], "Dentist");
        assert!(body.get("description").is_none());
        assert_eq!(body["start"]["dateTime"], "2024-09-21T14:00:00");
        assert_eq!(body["start"]["timeZone"], "America/New_York");
        assert_eq!(body["end"]["dateTime"], "2024-09-21T15:00:00");
        assert_eq!(body["end"]["timeZone"], "America/New_York");
    }

    #[test]
    fn test_task_body_due_is_midnight_utc() {
        let task = NewTask {
            title: "Buy milk".to_string(),
            notes: Some("2%".to_string()),
            due_date: NaiveDate::from_ymd_opt(2024, 9, 21),
        };

        let body = serde_json::to_value(TaskBody::new(&task)).unwrap();

        assert_eq!(body["due"], "2024-09-21T00:00:00.000Z");
        assert_eq!(body["notes"], "2%");
    }

    #[test]
    fn test_decode_items_skips_malformed_entries() {
        let items = vec![
            serde_json::json!({"id": "a", "title": "One"}),
            serde_json::json!({"title": "Missing id"}),
            serde_json::json!({"id": "b"}),
        ];

        let lists: Vec<TaskList> = decode_items(items, "task list");

        assert_eq!(lists.len(), 2);
        assert_eq!(lists[1].id, "b");
        assert_eq!(lists[1].title, "");
    }
}
