pub mod clock;
pub mod composer;
pub mod context;

pub use clock::{Clock, FixedClock, SystemClock};
pub use composer::PromptComposer;
pub use context::MemoryContext;
