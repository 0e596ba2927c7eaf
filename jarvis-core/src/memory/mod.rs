//! What the assistant remembers about the user across sessions.
//!
//! The store is a single JSON blob (preferences, facts, topics) at
//! ~/.jarvis/memory.json by default. It is read once when loaded and
//! rewritten in full after every mutation.

pub mod extraction;
pub mod store;

pub use extraction::{analyze, MemoryExtraction};
pub use store::{Fact, MemorySnapshot, MemoryStore, Topic};
