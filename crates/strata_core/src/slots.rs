//! # Slot Pool
//!
//! Fixed-capacity pool of numbered slots handed out in FIFO order.
//!
//! The terrain job manager keeps one pool per kind of GPU buffer. Running out
//! of slots is back-pressure, not an error: `acquire` returns `None` and the
//! caller tries again next frame.

use std::collections::VecDeque;

/// Handle to an acquired slot.
///
/// Deliberately not `Copy` or `Clone`: a slot is released exactly once.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    index: usize,
}

impl SlotHandle {
    /// Slot number, `0..capacity`.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// FIFO pool of slot indices.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It lives on the main thread with the
/// buffers it indexes.
#[derive(Debug)]
pub struct SlotPool {
    /// Free queue - indices of available slots, oldest release first.
    free: VecDeque<usize>,
    /// Total capacity.
    capacity: usize,
}

impl SlotPool {
    /// Creates a pool with every slot free.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            free: (0..capacity).collect(),
            capacity,
        }
    }

    /// Takes the least recently released slot.
    pub fn acquire(&mut self) -> Option<SlotHandle> {
        self.free.pop_front().map(|index| SlotHandle { index })
    }

    /// Returns a slot to the back of the free queue.
    pub fn release(&mut self, handle: SlotHandle) {
        debug_assert!(handle.index < self.capacity);
        debug_assert!(!self.free.contains(&handle.index), "slot released twice");
        self.free.push_back(handle.index);
    }

    /// Number of free slots.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Number of acquired slots.
    #[inline]
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.capacity - self.free.len()
    }

    /// Total number of slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if at least one slot is free.
    #[inline]
    #[must_use]
    pub fn has_available(&self) -> bool {
        !self.free.is_empty()
    }
}
