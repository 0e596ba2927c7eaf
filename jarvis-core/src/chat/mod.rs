//! The function-call protocol: model output in, executed calendar actions
//! and display text out.

pub mod calls;
pub mod dispatcher;
pub mod engine;
pub mod markup;
pub mod parser;
pub mod reply;

pub use calls::{CallError, FunctionCall, FunctionCallDescriptor, FunctionName, FunctionResult};
pub use dispatcher::{DispatchError, FunctionDispatcher};
pub use engine::{ChatEngine, ChatReply};
pub use parser::{parse_response, ParsedResponse};
pub use reply::render_reply;
