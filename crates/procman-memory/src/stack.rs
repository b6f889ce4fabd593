//! LIFO memory-block stack.

use crate::stats::StackStats;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Identifier of an allocated memory block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BlockId(pub u64);

impl BlockId {
    /// Create a new block ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.0)
    }
}

/// An allocated block on the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryBlock {
    id: BlockId,
}

impl MemoryBlock {
    /// Get the block ID.
    pub fn id(&self) -> BlockId {
        self.id
    }
}

/// Stack of memory blocks.
///
/// Ids start at 1 and increase by one per push. They are never reused,
/// even after the block that carried them is popped.
#[derive(Debug)]
pub struct MemoryStack {
    /// Live blocks, top of stack last
    blocks: Vec<MemoryBlock>,
    /// Last id handed out (0 = none yet)
    last_id: u64,
    stats: StackStats,
}

impl MemoryStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            last_id: 0,
            stats: StackStats::new(),
        }
    }

    /// Allocate a new block on top of the stack.
    pub fn push(&mut self) -> BlockId {
        self.last_id += 1;
        let id = BlockId::new(self.last_id);
        self.blocks.push(MemoryBlock { id });
        self.stats.record_push(self.blocks.len());

        debug!(block = %id, depth = self.blocks.len(), "Allocated memory block");
        id
    }

    /// Release the most recently allocated block.
    pub fn pop(&mut self) -> Option<BlockId> {
        let block = self.blocks.pop()?;
        self.stats.record_pop();

        debug!(block = %block.id, depth = self.blocks.len(), "Released memory block");
        Some(block.id)
    }

    /// All live block ids, top to bottom.
    pub fn peek_all(&self) -> Vec<BlockId> {
        self.blocks.iter().rev().map(MemoryBlock::id).collect()
    }

    /// The block that the next `pop` would release.
    pub fn top(&self) -> Option<BlockId> {
        self.blocks.last().map(MemoryBlock::id)
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if no blocks are allocated.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get lifetime counters.
    pub fn stats(&self) -> &StackStats {
        &self.stats
    }
}

impl Default for MemoryStack {
    fn default() -> Self {
        Self::new()
    }
}
