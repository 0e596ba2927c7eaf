use thiserror::Error;

pub const CALENDAR_SERVICE: &str = "Google Calendar";
pub const TASKS_SERVICE: &str = "Google Tasks";

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Not authenticated with {service}")]
    NotAuthenticated { service: &'static str },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Token storage error: {0}")]
    Storage(anyhow::Error),
}

impl CalendarError {
    /// True when the caller has to (re-)authenticate before retrying by hand.
    pub fn is_authentication(&self) -> bool {
        match self {
            CalendarError::NotAuthenticated { .. } | CalendarError::Auth(_) => true,
            CalendarError::Api { status, .. } => *status == 401,
            _ => false,
        }
    }
}
