//! procman Dispatch Queue
//!
//! Orders registry processes for dispatch: highest priority first, and
//! first-come first-served among equal priorities.
//!
//! The queue never owns process records. It stores [`ProcessHandle`]s
//! issued by the registry, so a process removed after being queued simply
//! stops resolving instead of leaving a dangling entry.
//!
//! [`ProcessHandle`]: procman_registry::ProcessHandle

mod queue;

pub use queue::{DispatchError, DispatchQueue, QueuedEntry};
