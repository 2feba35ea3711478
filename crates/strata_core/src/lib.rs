//! # STRATA Core
//!
//! Primitives shared by every thread of the chunk streaming pipeline:
//! - [`WorkQueue`]: bounded hand-off between threads with cooperative shutdown
//! - [`Chunk`]: immutable block storage, shared with meshers through `Arc`
//! - [`ChunkState`]: where a coordinate is in its lifecycle
//! - [`SlotPool`]: FIFO pool of buffer slots that bounds in-flight GPU work
//!
//! ## Architecture Rules
//!
//! 1. **Stages talk through queues** - the chunk table is the only shared lock
//! 2. **Block data is immutable** - a chunk is never written after construction
//! 3. **Nothing here blocks the main thread** - it uses `try_*` operations only

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod queue;
pub mod slots;
pub mod state;

pub use chunk::{Chunk, ChunkId};
pub use queue::{QueueError, WorkQueue};
pub use slots::{SlotHandle, SlotPool};
pub use state::ChunkState;
