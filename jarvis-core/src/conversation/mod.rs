pub mod message;
pub mod session;
pub mod state;

pub use message::{Message, Sender};
pub use session::ChatSession;
pub use state::ConversationState;
