//! Memory stack statistics.

use serde::Serialize;

/// Lifetime counters for one memory stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackStats {
    /// Blocks allocated since the stack was created
    pub total_pushes: u64,
    /// Blocks released since the stack was created
    pub total_pops: u64,
    /// Deepest the stack has been
    pub peak_depth: usize,
}

impl StackStats {
    /// Create an empty stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation that left the stack `depth` blocks deep.
    pub fn record_push(&mut self, depth: usize) {
        self.total_pushes += 1;
        self.peak_depth = self.peak_depth.max(depth);
    }

    /// Record a release.
    pub fn record_pop(&mut self) {
        self.total_pops += 1;
    }

    /// Blocks currently outstanding according to the counters.
    ///
    /// Never underflows, even if pops were recorded without matching pushes.
    pub fn outstanding(&self) -> u64 {
        self.total_pushes.saturating_sub(self.total_pops)
    }
}
