//! Session context: one registry, one dispatch queue, one memory stack.

use procman_memory::{BlockId, MemoryStack, StackStats};
use procman_registry::{Priority, Process, ProcessHandle, ProcessId, ProcessRegistry};
use procman_sched::{DispatchError, DispatchQueue};
use serde::Serialize;
use tracing::{info, warn};

/// Result of dispatching the next queued process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The highest-priority live process
    Process(Process),
    /// The front entry referred to a process that has since been removed
    Stale(ProcessHandle),
    /// Nothing was queued
    Empty,
}

/// A queue entry as it appears in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct QueuedProcess {
    pub handle: ProcessHandle,
    pub priority: Priority,
    /// `None` when the process has left the registry
    pub process: Option<Process>,
}

/// Serializable view of a whole session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub processes: Vec<Process>,
    pub queue: Vec<QueuedProcess>,
    pub stack: Vec<BlockId>,
    pub stack_stats: StackStats,
}

/// Everything a menu session operates on.
#[derive(Debug)]
pub struct Session {
    pub registry: ProcessRegistry,
    pub queue: DispatchQueue,
    pub stack: MemoryStack,
}

impl Session {
    /// Start a session over an existing registry with a fresh queue and stack.
    pub fn new(registry: ProcessRegistry) -> Self {
        info!(processes = registry.len(), "Starting session");
        Self {
            registry,
            queue: DispatchQueue::new(),
            stack: MemoryStack::new(),
        }
    }

    /// Queue the first registry process with `id`.
    pub fn enqueue_id(&mut self, id: ProcessId) -> Result<ProcessHandle, DispatchError> {
        self.queue.enqueue_id(&self.registry, id)
    }

    /// Dequeue the front entry and resolve it against the registry.
    pub fn dispatch_next(&mut self) -> Dispatch {
        let Some(handle) = self.queue.dequeue() else {
            return Dispatch::Empty;
        };

        match self.registry.get(handle) {
            Some(process) => {
                info!(process_id = process.id(), priority = process.priority(), "Dispatching process");
                Dispatch::Process(process.clone())
            }
            None => {
                warn!(%handle, "Dispatched entry no longer refers to a process");
                Dispatch::Stale(handle)
            }
        }
    }

    /// Capture the current state of all three components.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            processes: self.registry.enumerate().cloned().collect(),
            queue: self
                .queue
                .iter()
                .map(|entry| QueuedProcess {
                    handle: entry.handle,
                    priority: entry.priority,
                    process: self.registry.get(entry.handle).cloned(),
                })
                .collect(),
            stack: self.stack.peek_all(),
            stack_stats: self.stack.stats().clone(),
        }
    }
}
