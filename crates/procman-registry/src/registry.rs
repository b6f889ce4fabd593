//! Process registry backed by a generational slot arena.

use crate::handle::ProcessHandle;
use crate::process::{Priority, Process, ProcessId};
use std::collections::VecDeque;
use tracing::debug;

/// One arena slot. `process` is `None` while the slot sits on the free list.
#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    process: Option<Process>,
}

/// Registry owning every [`Process`] record.
///
/// Enumeration order is most-recently-inserted first. Duplicate ids are
/// accepted; lookups by id always return the match nearest the front.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    /// Record storage, indexed by handle slot
    slots: Vec<Slot>,
    /// Vacant slots available for reuse
    free: Vec<u32>,
    /// Live slots, front = most recently inserted
    order: VecDeque<u32>,
}

impl ProcessRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a process at the front of the registry.
    pub fn insert(
        &mut self,
        id: ProcessId,
        name: impl Into<String>,
        priority: Priority,
    ) -> ProcessHandle {
        self.insert_process(Process::new(id, name, priority))
    }

    pub(crate) fn insert_process(&mut self, process: Process) -> ProcessHandle {
        if self.find(process.id()).is_some() {
            debug!(process_id = process.id(), "Inserting process with duplicate id");
        }

        let process_id = process.id();
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize].process = Some(process);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    process: Some(process),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.order.push_front(slot);

        let handle = ProcessHandle::new(slot, self.slots[slot as usize].generation);
        debug!(process_id, %handle, "Inserted process");
        handle
    }

    /// Remove the first process with the given id.
    ///
    /// Returns the removed record, or `None` if no process matched.
    pub fn remove(&mut self, id: ProcessId) -> Option<Process> {
        let position = self.position_of(id)?;
        let slot = self.order.remove(position)?;
        let process = self.release(slot);
        debug!(process_id = id, "Removed process");
        process
    }

    /// Find the first process with the given id.
    pub fn find(&self, id: ProcessId) -> Option<&Process> {
        self.enumerate().find(|process| process.id() == id)
    }

    /// Get a handle to the first process with the given id.
    pub fn find_handle(&self, id: ProcessId) -> Option<ProcessHandle> {
        let position = self.position_of(id)?;
        let slot = self.order[position];
        Some(ProcessHandle::new(slot, self.slots[slot as usize].generation))
    }

    /// Resolve a handle. Stale handles resolve to `None`.
    pub fn get(&self, handle: ProcessHandle) -> Option<&Process> {
        self.slots
            .get(handle.slot())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.process.as_ref())
    }

    /// Check whether a handle still refers to a live record.
    pub fn contains(&self, handle: ProcessHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Change the priority of the first process with the given id.
    ///
    /// Returns `false` if no process matched.
    pub fn update_priority(&mut self, id: ProcessId, priority: Priority) -> bool {
        let Some(position) = self.position_of(id) else {
            return false;
        };
        let slot = self.order[position] as usize;
        match self.slots[slot].process.as_mut() {
            Some(process) => {
                debug!(
                    process_id = id,
                    old = process.priority(),
                    new = priority,
                    "Updated process priority"
                );
                process.set_priority(priority);
                true
            }
            None => false,
        }
    }

    /// Iterate over all processes, most recently inserted first.
    pub fn enumerate(&self) -> impl Iterator<Item = &Process> + '_ {
        self.order
            .iter()
            .filter_map(move |&slot| self.slots[slot as usize].process.as_ref())
    }

    /// Iterate over all processes, oldest first.
    pub(crate) fn enumerate_oldest_first(&self) -> impl Iterator<Item = &Process> + '_ {
        self.order
            .iter()
            .rev()
            .filter_map(move |&slot| self.slots[slot as usize].process.as_ref())
    }

    /// Number of live processes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the registry holds no processes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Destroy every process and invalidate all outstanding handles.
    pub fn clear(&mut self) {
        if self.order.is_empty() {
            return;
        }

        let live: Vec<u32> = self.order.drain(..).collect();
        let count = live.len();
        for slot in live {
            self.release(slot);
        }
        debug!(count, "Cleared process registry");
    }

    fn position_of(&self, id: ProcessId) -> Option<usize> {
        self.order.iter().position(|&slot| {
            self.slots[slot as usize]
                .process
                .as_ref()
                .is_some_and(|process| process.id() == id)
        })
    }

    /// Vacate a slot, bumping its generation so old handles go stale.
    ///
    /// A slot whose generation reaches `u32::MAX` is retired instead of
    /// reused, so a generation value is never handed out twice.
    fn release(&mut self, slot: u32) -> Option<Process> {
        let entry = &mut self.slots[slot as usize];
        let process = entry.process.take();
        entry.generation += 1;
        if entry.generation < u32::MAX {
            self.free.push(slot);
        } else {
            debug!(slot, "Retired exhausted slot");
        }
        process
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(registry: &ProcessRegistry) -> Vec<ProcessId> {
        registry.enumerate().map(Process::id).collect()
    }

    #[test]
    fn test_insert_and_find() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "init", 4);

        let process = registry.find(1).expect("process should exist");
        assert_eq!(process.id(), 1);
        assert_eq!(process.name(), "init");
        assert_eq!(process.priority(), 4);
        assert!(registry.find(2).is_none());
    }

    #[test]
    fn test_enumerate_most_recent_first() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "a", 0);
        registry.insert(2, "b", 0);
        registry.insert(3, "c", 0);

        assert_eq!(ids(&registry), vec![3, 2, 1]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_update_priority() {
        let mut registry = ProcessRegistry::new();
        registry.insert(5, "a", 1);

        assert!(registry.update_priority(5, 9));
        assert_eq!(registry.find(5).map(Process::priority), Some(9));

        assert!(!registry.update_priority(6, 9));
    }

    #[test]
    fn test_remove() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "a", 0);
        registry.insert(2, "b", 0);
        registry.insert(3, "c", 0);

        let removed = registry.remove(2).expect("process should be removed");
        assert_eq!(removed.name(), "b");
        assert_eq!(ids(&registry), vec![3, 1]);

        // Absent id is a no-op
        assert!(registry.remove(42).is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_resolve_to_most_recent() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "old", 1);
        registry.insert(1, "new", 2);

        assert_eq!(registry.find(1).map(Process::name), Some("new"));

        registry.remove(1);
        assert_eq!(registry.find(1).map(Process::name), Some("old"));

        assert!(registry.update_priority(1, 7));
        assert_eq!(registry.find(1).map(Process::priority), Some(7));
    }

    #[test]
    fn test_handle_goes_stale_after_remove() {
        let mut registry = ProcessRegistry::new();
        let handle = registry.insert(1, "a", 0);
        assert!(registry.contains(handle));

        registry.remove(1);
        assert!(registry.get(handle).is_none());

        // The slot is reused but the old handle must not alias the new record
        let reused = registry.insert(2, "b", 0);
        assert!(registry.get(handle).is_none());
        assert_eq!(registry.get(reused).map(Process::id), Some(2));
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut registry = ProcessRegistry::new();
        let first = registry.insert(1, "a", 0);
        let second = registry.insert(2, "b", 0);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains(first));
        assert!(!registry.contains(second));

        // Idempotent
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_exhausted_slot_is_retired() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "a", 0);
        registry.slots[0].generation = u32::MAX - 1;
        let old = registry.find_handle(1).expect("handle should exist");

        registry.remove(1);
        assert!(registry.free.is_empty());

        let fresh = registry.insert(2, "b", 0);
        assert_eq!(registry.slots.len(), 2);
        assert_eq!(fresh.slot(), 1);
        assert!(!registry.contains(old));
        assert_eq!(registry.get(fresh).map(Process::id), Some(2));
    }

    #[test]
    fn test_enumerate_oldest_first_is_reverse() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "a", 0);
        registry.insert(2, "b", 0);
        registry.insert(3, "c", 0);
        registry.remove(2);

        let oldest: Vec<ProcessId> = registry.enumerate_oldest_first().map(Process::id).collect();
        assert_eq!(oldest, vec![1, 3]);
    }

    #[test]
    fn test_find_handle_matches_find() {
        let mut registry = ProcessRegistry::new();
        registry.insert(1, "a", 0);
        registry.insert(2, "b", 0);

        let handle = registry.find_handle(1).expect("handle should exist");
        assert_eq!(registry.get(handle), registry.find(1));
        assert!(registry.find_handle(3).is_none());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(ProcessId, Priority),
        Remove(ProcessId),
        Update(ProcessId, Priority),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..5i64, -3..3i64).prop_map(|(id, priority)| Op::Insert(id, priority)),
            (0..5i64).prop_map(Op::Remove),
            (0..5i64, -3..3i64).prop_map(|(id, priority)| Op::Update(id, priority)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The registry behaves like a list with front insertion and
        /// first-match lookup, and removed handles never resolve again.
        #[test]
        fn registry_matches_front_insert_model(ops in proptest::collection::vec(op(), 0..60)) {
            let mut registry = ProcessRegistry::new();
            let mut model: Vec<(ProcessHandle, Process)> = Vec::new();
            let mut dead: Vec<ProcessHandle> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(id, priority) => {
                        let handle = registry.insert(id, "p", priority);
                        model.insert(0, (handle, Process::new(id, "p", priority)));
                    }
                    Op::Remove(id) => {
                        let removed = registry.remove(id);
                        match model.iter().position(|(_, p)| p.id() == id) {
                            Some(index) => {
                                let (handle, process) = model.remove(index);
                                prop_assert_eq!(removed, Some(process));
                                dead.push(handle);
                            }
                            None => prop_assert!(removed.is_none()),
                        }
                    }
                    Op::Update(id, priority) => {
                        let updated = registry.update_priority(id, priority);
                        match model.iter_mut().find(|(_, p)| p.id() == id) {
                            Some((_, process)) => {
                                prop_assert!(updated);
                                process.set_priority(priority);
                            }
                            None => prop_assert!(!updated),
                        }
                    }
                }

                let expected: Vec<&Process> = model.iter().map(|(_, p)| p).collect();
                let actual: Vec<&Process> = registry.enumerate().collect();
                prop_assert_eq!(actual, expected);
                prop_assert_eq!(registry.len(), model.len());

                for id in 0..5 {
                    let expected = model.iter().find(|(_, p)| p.id() == id).map(|(_, p)| p);
                    prop_assert_eq!(registry.find(id), expected);
                }
                for (handle, process) in &model {
                    prop_assert_eq!(registry.get(*handle), Some(process));
                }
                for handle in &dead {
                    prop_assert!(!registry.contains(*handle));
                }
            }
        }
    }
}
