//! Process record.

use serde::Serialize;
use std::fmt;

/// Caller-supplied process identifier. Not guaranteed unique.
pub type ProcessId = i64;

/// Scheduling priority. Larger values are more urgent.
pub type Priority = i64;

/// A process known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    id: ProcessId,
    name: String,
    priority: Priority,
}

impl Process {
    /// Create a detached process record.
    pub fn new(id: ProcessId, name: impl Into<String>, priority: Priority) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
        }
    }

    /// Get the process ID.
    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// Get the process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {}, name: {}, priority: {}",
            self.id, self.name, self.priority
        )
    }
}
