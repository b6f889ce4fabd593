//! Generational handles into the registry arena.

use serde::Serialize;
use std::fmt;

/// Stable reference to one registry record.
///
/// A handle pairs an arena slot with the generation the slot had when the
/// record was inserted. Removing the record bumps the slot generation, so
/// an old handle never aliases a record inserted later into the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProcessHandle {
    slot: u32,
    generation: u32,
}

impl ProcessHandle {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot as usize
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}#{})", self.slot, self.generation)
    }
}
