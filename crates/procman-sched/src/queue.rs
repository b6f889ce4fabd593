//! Priority dispatch queue.

use procman_registry::{Priority, ProcessHandle, ProcessId, ProcessRegistry};
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, warn};

/// Dispatch queue errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{0} no longer refers to a live process")]
    StaleHandle(ProcessHandle),

    #[error("No process with id {0}")]
    UnknownProcess(ProcessId),
}

/// A queued handle together with the priority it was ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueuedEntry {
    pub handle: ProcessHandle,
    pub priority: Priority,
}

/// Queue of process handles ordered by descending priority.
///
/// Entries are ordered by the priority the process had when it was
/// enqueued. Changing a process's priority afterwards does not move an
/// entry that is already queued.
#[derive(Debug, Default)]
pub struct DispatchQueue {
    entries: VecDeque<QueuedEntry>,
}

impl DispatchQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a live process.
    ///
    /// The entry goes in front of the first entry with a strictly lower
    /// priority, which keeps equal priorities in arrival order.
    pub fn enqueue(
        &mut self,
        registry: &ProcessRegistry,
        handle: ProcessHandle,
    ) -> Result<(), DispatchError> {
        let Some(process) = registry.get(handle) else {
            warn!(%handle, "Refusing to enqueue stale handle");
            return Err(DispatchError::StaleHandle(handle));
        };

        let priority = process.priority();
        let position = self
            .entries
            .iter()
            .position(|entry| entry.priority < priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, QueuedEntry { handle, priority });

        debug!(
            process_id = process.id(),
            priority,
            position,
            "Enqueued process"
        );
        Ok(())
    }

    /// Look up the first process with `id` and queue it.
    pub fn enqueue_id(
        &mut self,
        registry: &ProcessRegistry,
        id: ProcessId,
    ) -> Result<ProcessHandle, DispatchError> {
        let handle = registry
            .find_handle(id)
            .ok_or(DispatchError::UnknownProcess(id))?;
        self.enqueue(registry, handle)?;
        Ok(handle)
    }

    /// Remove and return the highest-priority handle.
    pub fn dequeue(&mut self) -> Option<ProcessHandle> {
        let entry = self.entries.pop_front()?;
        debug!(handle = %entry.handle, priority = entry.priority, "Dequeued process");
        Some(entry.handle)
    }

    /// All queued handles, front to back.
    pub fn peek_all(&self) -> Vec<ProcessHandle> {
        self.entries.iter().map(|entry| entry.handle).collect()
    }

    /// Iterate over queued entries, front to back.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedEntry> + '_ {
        self.entries.iter()
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose process has left the registry.
    ///
    /// Returns how many entries were removed.
    pub fn purge_stale(&mut self, registry: &ProcessRegistry) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| registry.contains(entry.handle));
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, "Purged stale dispatch entries");
        }
        purged
    }
}
