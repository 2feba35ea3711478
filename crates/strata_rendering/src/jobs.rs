//! # Terrain Job Manager
//!
//! Runs chunk generation on the device and brings the results back without
//! ever blocking the frame.
//!
//! ```text
//! dispatch ──► GpuJob ──(fence)──► schedule_transfer ──► TransferJob ──(fence)──► read
//!   storage slot held ──────────────┘ released   transfer slot held ──────────────┘ released
//! ```
//!
//! Both slot kinds come from fixed pools. Running out is back-pressure:
//! `dispatch` or `schedule_transfer` hand the request back and the caller
//! retries next frame.

use strata_core::{SlotHandle, SlotPool};
use strata_shared::{BlockType, ChunkCoord, CHUNK_VOLUME};

use crate::error::GpuError;
use crate::fence::Fence;

/// Device side of terrain generation.
///
/// Storage slot `i` and transfer slot `j` each name one chunk-sized buffer
/// created up front by [`TerrainBackend::create_slots`].
pub trait TerrainBackend {
    /// Completion marker returned by submissions.
    type Fence: Fence;

    /// Allocates `storage` device buffers and `transfer` readable buffers.
    fn create_slots(&mut self, storage: usize, transfer: usize);

    /// Submits generation of `coord` into a storage slot.
    fn dispatch(&mut self, storage_slot: usize, coord: ChunkCoord) -> Self::Fence;

    /// Submits a copy from a storage slot into a transfer slot.
    fn copy_to_transfer(&mut self, storage_slot: usize, transfer_slot: usize) -> Self::Fence;

    /// Reads a finished transfer slot into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer could not be mapped.
    fn read_transfer(&mut self, transfer_slot: usize, out: &mut [BlockType]) -> Result<(), GpuError>;

    /// Lets the device make progress on callbacks. Never blocks.
    fn poll(&mut self);
}

/// Generation in flight in a storage slot.
#[derive(Debug)]
pub struct GpuJob<F> {
    /// Chunk being generated.
    pub coord: ChunkCoord,
    slot: SlotHandle,
    fence: F,
}

impl<F: Fence> GpuJob<F> {
    /// Storage slot holding the result.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot.index()
    }

    /// Whether generation has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.fence.is_signaled()
    }
}

/// Copy in flight into a transfer slot.
#[derive(Debug)]
pub struct TransferJob<F> {
    /// Chunk being read back.
    pub coord: ChunkCoord,
    slot: SlotHandle,
    fence: F,
}

impl<F: Fence> TransferJob<F> {
    /// Transfer slot receiving the copy.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot.index()
    }

    /// Whether the copy has finished and the buffer can be read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.fence.is_signaled()
    }
}

/// Owns the terrain slot pools and moves jobs through them.
///
/// # Thread Safety
///
/// Main thread only, alongside the device.
pub struct TerrainJobManager<T: TerrainBackend> {
    backend: T,
    storage: SlotPool,
    transfer: SlotPool,
}

impl<T: TerrainBackend> TerrainJobManager<T> {
    /// Creates the manager and every slot buffer.
    pub fn new(mut backend: T, max_jobs: usize, max_transfers: usize) -> Self {
        backend.create_slots(max_jobs, max_transfers);
        tracing::debug!(
            "terrain job manager: {} storage slots, {} transfer slots",
            max_jobs,
            max_transfers
        );
        Self {
            backend,
            storage: SlotPool::new(max_jobs),
            transfer: SlotPool::new(max_transfers),
        }
    }

    /// Starts generating a chunk. `None` when every storage slot is busy.
    pub fn dispatch(&mut self, coord: ChunkCoord) -> Option<GpuJob<T::Fence>> {
        let slot = self.storage.acquire()?;
        let fence = self.backend.dispatch(slot.index(), coord);
        Some(GpuJob { coord, slot, fence })
    }

    /// Zero-timeout check on a generation job.
    #[must_use]
    pub fn poll_completion(&self, job: &GpuJob<T::Fence>) -> bool {
        job.is_complete()
    }

    /// Starts copying a finished job's data to a readable buffer.
    ///
    /// On success the storage slot is released and its fence disposed. With
    /// no transfer slot free the job is handed back unchanged.
    ///
    /// # Errors
    ///
    /// Returns the job itself when no transfer slot is available.
    pub fn schedule_transfer(
        &mut self,
        job: GpuJob<T::Fence>,
    ) -> Result<TransferJob<T::Fence>, GpuJob<T::Fence>> {
        let Some(slot) = self.transfer.acquire() else {
            return Err(job);
        };
        let fence = self.backend.copy_to_transfer(job.slot.index(), slot.index());
        let GpuJob {
            coord,
            slot: storage_slot,
            fence: generation,
        } = job;
        generation.dispose();
        self.storage.release(storage_slot);
        Ok(TransferJob { coord, slot, fence })
    }

    /// Zero-timeout check on a transfer.
    #[must_use]
    pub fn poll_transfer(&self, job: &TransferJob<T::Fence>) -> bool {
        job.is_complete()
    }

    /// Copies a finished transfer's blocks into `out`.
    ///
    /// A failed read leaves `out` all air and is logged; the chunk still
    /// completes so the pipeline never stalls on it.
    pub fn read_transfer(&mut self, job: &TransferJob<T::Fence>, out: &mut [BlockType]) {
        if let Err(err) = self.backend.read_transfer(job.slot.index(), out) {
            tracing::warn!("chunk {} read-back failed: {}", job.coord, err);
            out.fill(BlockType::AIR);
        }
    }

    /// Reads a finished transfer and releases its slot.
    pub fn complete_transfer(&mut self, job: TransferJob<T::Fence>) -> Vec<BlockType> {
        let mut blocks = vec![BlockType::AIR; CHUNK_VOLUME];
        self.read_transfer(&job, &mut blocks);
        self.release_transfer_job(job);
        blocks
    }

    /// Abandons a generation job and frees its storage slot.
    pub fn release_gpu_job(&mut self, job: GpuJob<T::Fence>) {
        job.fence.dispose();
        self.storage.release(job.slot);
    }

    /// Frees a transfer slot.
    pub fn release_transfer_job(&mut self, job: TransferJob<T::Fence>) {
        job.fence.dispose();
        self.transfer.release(job.slot);
    }

    /// Whether another generation can start.
    #[must_use]
    pub fn has_available_job_slots(&self) -> bool {
        self.storage.has_available()
    }

    /// Whether another transfer can start.
    #[must_use]
    pub fn has_available_transfer_slots(&self) -> bool {
        self.transfer.has_available()
    }

    /// Generation jobs holding a storage slot.
    #[must_use]
    pub fn jobs_in_flight(&self) -> usize {
        self.storage.in_use()
    }

    /// Transfers holding a transfer slot.
    #[must_use]
    pub fn transfers_in_flight(&self) -> usize {
        self.transfer.in_use()
    }

    /// Drives device callbacks.
    pub fn poll(&mut self) {
        self.backend.poll();
    }

    /// Device backend.
    #[must_use]
    pub const fn backend(&self) -> &T {
        &self.backend
    }

    /// Mutable device backend.
    pub fn backend_mut(&mut self) -> &mut T {
        &mut self.backend
    }
}
