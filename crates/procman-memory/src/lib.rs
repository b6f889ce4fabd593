//! procman Memory Blocks
//!
//! A LIFO allocator of opaque memory-block tokens. Each stack hands out
//! strictly increasing block ids and releases them in reverse order.

mod stack;
mod stats;

pub use stack::{BlockId, MemoryBlock, MemoryStack};
pub use stats::StackStats;
