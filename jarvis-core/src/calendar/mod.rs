pub mod auth;
pub mod client;
pub mod error;
pub mod google;
pub mod mock;
pub mod types;

pub use client::CalendarClient;
pub use error::CalendarError;
pub use google::GoogleCalendarClient;
pub use mock::InMemoryCalendar;
pub use types::*;
