pub mod ai;
pub mod calendar;
pub mod chat;
pub mod conversation;
pub mod memory;
pub mod prompt;
pub mod service;
pub mod settings;

// Public library API - the binaries only reach through these.
pub use ai::provider::AiProvider;
pub use calendar::CalendarClient;
pub use chat::{ChatEngine, ChatReply};
pub use service::{Assistant, AssistantService, ServiceRequest, ServiceResponse};
pub use settings::{Settings, SettingsManager};
