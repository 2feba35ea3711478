//! # World
//!
//! The chunk lifecycle orchestrator.
//!
//! ```text
//!  observer ──► management thread ──► generation queue ──► step: dispatch
//!                      │                                        │
//!                      └──► unload queue ──► step: unload       ▼
//!                                                  GpuJob ──► TransferJob ──► Chunk
//!                                                                               │
//!  step: upload ◄── mesh results ◄── meshing workers ◄── mesh requests ◄────────┘
//! ```
//!
//! Only [`World::step`] and [`World::render`] touch the device, and both run
//! on the thread that owns the `World`. `step` never blocks: it drains every
//! queue with `try_pop` and keeps mesh requests that do not fit for the next
//! frame.

use std::collections::{HashSet, VecDeque};
use std::mem;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use strata_core::{Chunk, ChunkState};
use strata_meshing::{ChunkVertex, MeshData};
use strata_procedural::{TerrainGenerator, TerrainParams};
use strata_rendering::gpu::{GpuContext, WgpuMeshBackend, WgpuTerrainBackend};
use strata_rendering::{
    BufferPoolAllocator, CpuMeshBackend, CpuTerrainBackend, DrawTarget, GpuJob, MeshAllocation,
    MeshBufferBackend, TerrainBackend, TerrainJobManager, TransferJob,
};
use strata_shared::{BlockRegistry, ChunkCoord, StreamingConfig, Vec3, CHUNK_DIM};

use crate::camera::Camera;
use crate::error::{StreamError, StreamResult};
use crate::management;
use crate::shared::{MeshRequest, MeshResult, Shared};
use crate::stats::{DrawStats, StreamStats};
use crate::table::ChunkEntry;
use crate::workers;

/// World running entirely on the host.
pub type HeadlessWorld = World<CpuTerrainBackend, CpuMeshBackend>;

/// World generating and drawing through wgpu.
pub type GpuWorld = World<WgpuTerrainBackend, WgpuMeshBackend>;

/// A drawable chunk as seen by the render consumer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderChunk {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// World-space minimum corner.
    pub anchor: Vec3,
    /// Opaque geometry.
    pub opaque: MeshAllocation,
    /// Transparent geometry.
    pub transparent: MeshAllocation,
}

/// Streams chunks around an observer.
pub struct World<T: TerrainBackend, M: MeshBufferBackend> {
    shared: Arc<Shared>,
    registry: Arc<BlockRegistry>,
    jobs: TerrainJobManager<T>,
    allocator: BufferPoolAllocator<M>,
    gpu_jobs: Vec<GpuJob<T::Fence>>,
    transfers: Vec<TransferJob<T::Fence>>,
    /// Mesh requests the queue had no room for.
    mesh_backlog: VecDeque<MeshRequest>,
    /// `MeshPending` chunks whose in-flight mesh may predate a neighbor.
    stale: HashSet<ChunkCoord>,
    observer: Option<ChunkCoord>,
    management: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    frames: u64,
    dropped: u64,
}

impl HeadlessWorld {
    /// Creates a world on the CPU backends.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or if a thread cannot be spawned.
    pub fn headless(config: StreamingConfig, registry: Arc<BlockRegistry>) -> StreamResult<Self> {
        let generator = TerrainGenerator::new(TerrainParams::with_seed(config.seed));
        let terrain = CpuTerrainBackend::new(generator, config.cpu_generation_latency);
        Self::new(config, registry, terrain, CpuMeshBackend::new())
    }
}

impl GpuWorld {
    /// Creates a world on a wgpu device.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or if a thread cannot be spawned.
    pub fn with_gpu(
        context: &GpuContext,
        config: StreamingConfig,
        registry: Arc<BlockRegistry>,
    ) -> StreamResult<Self> {
        let generator = TerrainGenerator::new(TerrainParams::with_seed(config.seed));
        let terrain = WgpuTerrainBackend::new(context, generator);
        Self::new(config, registry, terrain, WgpuMeshBackend::new(context))
    }
}

impl<T: TerrainBackend, M: MeshBufferBackend> World<T, M> {
    /// Creates the world and starts its background threads.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or if a thread cannot be spawned.
    pub fn new(
        config: StreamingConfig,
        registry: Arc<BlockRegistry>,
        terrain: T,
        meshes: M,
    ) -> StreamResult<Self> {
        config.validate()?;
        let jobs = TerrainJobManager::new(
            terrain,
            config.max_concurrent_jobs,
            config.max_concurrent_transfers,
        );
        let allocator = BufferPoolAllocator::new(
            meshes,
            config.pool_vertex_capacity,
            config.pool_index_capacity,
            config.max_pools,
        );
        let worker_count = config.worker_count();

        let mut world = Self {
            shared: Arc::new(Shared::new(config)),
            registry,
            jobs,
            allocator,
            gpu_jobs: Vec::new(),
            transfers: Vec::new(),
            mesh_backlog: VecDeque::new(),
            stale: HashSet::new(),
            observer: None,
            management: None,
            workers: Vec::with_capacity(worker_count),
            frames: 0,
            dropped: 0,
        };

        let shared = Arc::clone(&world.shared);
        world.management = Some(spawn("strata-management".to_string(), move || {
            management::run(&shared);
        })?);
        for index in 0..worker_count {
            let shared = Arc::clone(&world.shared);
            let registry = Arc::clone(&world.registry);
            world.workers.push(spawn(format!("strata-mesh-{index}"), move || {
                workers::run(index, &shared, &registry);
            })?);
        }

        tracing::info!(
            "world started: render distance {}, {} mesh workers",
            world.shared.config.render_distance,
            worker_count
        );
        Ok(world)
    }

    /// Moves the observer. Only a change of chunk wakes the management thread.
    pub fn set_observer_position(&mut self, position: Vec3) {
        let chunk = ChunkCoord::from_world_position(position, self.shared.config.block_size);
        if self.observer == Some(chunk) {
            return;
        }
        self.observer = Some(chunk);
        if self.shared.positions.try_push(chunk).is_err() {
            tracing::warn!("observer moved to {} after shutdown", chunk);
        }
    }

    /// Advances every pipeline stage once. Call once per frame.
    pub fn step(&mut self) {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        let _span = tracing::debug_span!("step", frame = self.frames).entered();

        self.jobs.poll();
        self.process_unloads();
        self.process_transfers();
        self.process_gpu_jobs();
        self.dispatch_jobs();
        self.flush_mesh_requests();
        self.process_mesh_results();
        self.frames += 1;
    }

    fn process_unloads(&mut self) {
        let Some(center) = self.observer else {
            return;
        };
        let unload_distance = self.shared.config.unload_distance_squared();
        let mut table = self.shared.table.lock();
        let mut unloaded = 0usize;

        while let Some(coord) = self.shared.unloads.try_pop() {
            // The observer may have come back since the request was made
            if coord.distance_squared(center) <= unload_distance {
                continue;
            }
            let state = table.state(coord);
            // In-flight jobs are discarded when they complete
            if state == ChunkState::Undefined || state.is_generating() {
                continue;
            }
            if let Some(entry) = table.chunks.remove(&coord) {
                self.allocator.free(entry.opaque);
                self.allocator.free(entry.transparent);
            }
            table.set_state(coord, ChunkState::Undefined);
            self.stale.remove(&coord);
            unloaded += 1;
        }

        if unloaded > 0 {
            tracing::debug!("unloaded {} chunks", unloaded);
        }
    }

    fn process_transfers(&mut self) {
        let mut pending = Vec::with_capacity(self.transfers.len());
        let mut arrived = Vec::new();

        for job in mem::take(&mut self.transfers) {
            if !self.jobs.poll_transfer(&job) {
                pending.push(job);
                continue;
            }
            let coord = job.coord;
            let blocks = self.jobs.complete_transfer(job);
            arrived.push(Arc::new(Chunk::from_blocks(coord, blocks)));
        }
        self.transfers = pending;
        if arrived.is_empty() {
            return;
        }

        let unload_distance = self.shared.config.unload_distance_squared();
        let mut table = self.shared.table.lock();
        for chunk in arrived {
            let coord = chunk.coord();
            let state = table.state(coord);
            let wanted = self
                .observer
                .map_or(true, |center| coord.distance_squared(center) <= unload_distance);
            if state != ChunkState::PboPending || !wanted {
                if state == ChunkState::PboPending {
                    table.set_state(coord, ChunkState::Undefined);
                }
                self.dropped += 1;
                tracing::trace!("discarding late terrain for {}", coord);
                continue;
            }

            let id = chunk.id();
            let empty = chunk.is_empty();
            table.chunks.insert(coord, ChunkEntry::new(chunk));
            table.set_state(coord, ChunkState::DataReady);
            table.set_state(coord, ChunkState::MeshPending);
            if empty {
                // Air has no faces and reads the same as a missing neighbor
                table.set_state(coord, ChunkState::Ready);
                continue;
            }
            self.mesh_backlog.push_back(MeshRequest { coord, id });

            // Neighbors meshed without this chunk have stale borders
            for neighbor in coord.face_neighbors() {
                match table.state(neighbor) {
                    ChunkState::Ready => {}
                    ChunkState::MeshPending => {
                        // A queued request will see this chunk; one in a worker may not
                        if !self.mesh_backlog.iter().any(|r| r.coord == neighbor) {
                            self.stale.insert(neighbor);
                        }
                        continue;
                    }
                    _ => continue,
                }
                let Some(entry) = table.chunks.get(&neighbor) else {
                    continue;
                };
                if entry.chunk.is_empty() {
                    continue;
                }
                let id = entry.chunk.id();
                table.set_state(neighbor, ChunkState::MeshPending);
                self.mesh_backlog.push_back(MeshRequest {
                    coord: neighbor,
                    id,
                });
            }
        }
    }

    fn process_gpu_jobs(&mut self) {
        let mut pending = Vec::with_capacity(self.gpu_jobs.len());
        let mut scheduled = Vec::new();

        for job in mem::take(&mut self.gpu_jobs) {
            if !self.jobs.poll_completion(&job) {
                pending.push(job);
                continue;
            }
            match self.jobs.schedule_transfer(job) {
                Ok(transfer) => {
                    scheduled.push(transfer.coord);
                    self.transfers.push(transfer);
                }
                // No transfer slot: retry next frame
                Err(job) => pending.push(job),
            }
        }
        self.gpu_jobs = pending;

        if !scheduled.is_empty() {
            let mut table = self.shared.table.lock();
            for coord in scheduled {
                table.set_state(coord, ChunkState::PboPending);
            }
        }
    }

    fn dispatch_jobs(&mut self) {
        let unload_distance = self.shared.config.unload_distance_squared();
        let mut dispatched = 0usize;

        while self.jobs.has_available_job_slots() {
            let Some(coord) = self.shared.generation.try_pop() else {
                break;
            };
            {
                let mut table = self.shared.table.lock();
                if table.state(coord) != ChunkState::Backlog {
                    continue;
                }
                if self
                    .observer
                    .is_some_and(|center| coord.distance_squared(center) > unload_distance)
                {
                    table.set_state(coord, ChunkState::Undefined);
                    continue;
                }
            }

            // Only this thread moves a coordinate out of Backlog, so the
            // check above still holds without the lock
            let Some(job) = self.jobs.dispatch(coord) else {
                if self.shared.generation.try_push(coord).is_err() {
                    self.shared.table.lock().set_state(coord, ChunkState::Undefined);
                }
                break;
            };
            self.shared.table.lock().set_state(coord, ChunkState::GpuPending);
            self.gpu_jobs.push(job);
            dispatched += 1;
        }

        if dispatched > 0 {
            tracing::trace!("dispatched {} terrain jobs", dispatched);
        }
    }

    fn flush_mesh_requests(&mut self) {
        while let Some(request) = self.mesh_backlog.pop_front() {
            if let Err(err) = self.shared.mesh_requests.try_push(request) {
                if err.is_closed() {
                    self.mesh_backlog.clear();
                } else {
                    self.mesh_backlog.push_front(err.into_inner());
                }
                break;
            }
        }
    }

    fn process_mesh_results(&mut self) {
        let mut results = Vec::new();
        while let Some(result) = self.shared.mesh_results.try_pop() {
            results.push(result);
        }
        if results.is_empty() {
            return;
        }

        // Detach the old geometry, then upload without the lock
        let mut accepted = Vec::with_capacity(results.len());
        {
            let mut table = self.shared.table.lock();
            for MeshResult { coord, id, mesh } in results {
                let live = table.state(coord) == ChunkState::MeshPending;
                let entry = table
                    .chunks
                    .get_mut(&coord)
                    .filter(|entry| live && entry.chunk.id() == id);
                let Some(entry) = entry else {
                    self.dropped += 1;
                    tracing::trace!("discarding stale mesh for {}", coord);
                    continue;
                };
                let old = [
                    mem::replace(&mut entry.opaque, MeshAllocation::INVALID),
                    mem::replace(&mut entry.transparent, MeshAllocation::INVALID),
                ];
                accepted.push((coord, id, mesh, old));
            }
        }

        let mut uploaded = Vec::with_capacity(accepted.len());
        for (coord, id, mesh, old) in accepted {
            for allocation in old {
                self.allocator.free(allocation);
            }
            let opaque = upload(&mut self.allocator, coord, "opaque", &mesh.opaque);
            let transparent = upload(&mut self.allocator, coord, "transparent", &mesh.transparent);
            uploaded.push((coord, id, opaque, transparent));
        }

        let mut table = self.shared.table.lock();
        for (coord, id, opaque, transparent) in uploaded {
            let Some(entry) = table
                .chunks
                .get_mut(&coord)
                .filter(|entry| entry.chunk.id() == id)
            else {
                self.allocator.free(opaque);
                self.allocator.free(transparent);
                continue;
            };
            entry.opaque = opaque;
            entry.transparent = transparent;
            table.set_state(coord, ChunkState::Ready);

            if self.stale.remove(&coord) {
                table.set_state(coord, ChunkState::MeshPending);
                self.mesh_backlog.push_back(MeshRequest { coord, id });
            }
        }
    }

    /// Chunks with geometry that pass the camera test, in coordinate order.
    #[must_use]
    pub fn visible_chunks(&self, camera: &impl Camera) -> Vec<RenderChunk> {
        self.collect_visible(camera).0
    }

    fn collect_visible(&self, camera: &impl Camera) -> (Vec<RenderChunk>, u32) {
        let block_size = self.shared.config.block_size;
        let table = self.shared.table.lock();
        let mut visible = Vec::new();
        let mut culled = 0u32;

        for (coord, entry) in &table.chunks {
            if !entry.opaque.is_valid() && !entry.transparent.is_valid() {
                continue;
            }
            let bounds = coord.world_bounds(block_size);
            if !camera.is_box_visible(bounds.min, bounds.max) {
                culled += 1;
                continue;
            }
            visible.push(RenderChunk {
                coord: *coord,
                anchor: bounds.min,
                opaque: entry.opaque,
                transparent: entry.transparent,
            });
        }
        drop(table);

        visible.sort_unstable_by_key(|chunk| chunk.coord);
        (visible, culled)
    }

    /// Draws every visible chunk: opaque geometry grouped by pool, then
    /// transparent geometry back to front.
    pub fn render<'p, D>(&'p self, camera: &impl Camera, target: &mut D) -> DrawStats
    where
        D: DrawTarget<'p, M::Pool>,
    {
        let (mut chunks, culled) = self.collect_visible(camera);
        let visible = u32::try_from(chunks.len()).unwrap_or(u32::MAX);
        let mut session = self.allocator.begin_draw(target);

        chunks.sort_by_key(|chunk| (chunk.opaque.pool_index(), chunk.coord));
        for chunk in &chunks {
            session.draw(&chunk.opaque, chunk.anchor);
        }

        #[allow(clippy::cast_precision_loss)]
        let half = Vec3::splat(CHUNK_DIM as f32 * self.shared.config.block_size * 0.5);
        let eye = camera.position();
        chunks.retain(|chunk| chunk.transparent.is_valid());
        chunks.sort_by(|a, b| {
            let da = (a.anchor + half).distance_squared(eye);
            let db = (b.anchor + half).distance_squared(eye);
            db.total_cmp(&da)
        });
        for chunk in &chunks {
            session.draw(&chunk.transparent, chunk.anchor);
        }

        DrawStats {
            chunks_visible: visible,
            chunks_culled: culled,
            binds: session.binds(),
            draws: session.draws(),
        }
    }

    /// Pipeline snapshot.
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        let mut stats = StreamStats {
            jobs_in_flight: self.jobs.jobs_in_flight(),
            transfers_in_flight: self.jobs.transfers_in_flight(),
            frames: self.frames,
            dropped_results: self.dropped,
            ..StreamStats::default()
        };

        let table = self.shared.table.lock();
        for state in table.states.values() {
            match state {
                ChunkState::Undefined => {}
                ChunkState::Backlog => stats.backlog += 1,
                ChunkState::GpuPending => stats.gpu_pending += 1,
                ChunkState::PboPending => stats.pbo_pending += 1,
                ChunkState::DataReady => stats.data_ready += 1,
                ChunkState::MeshPending => stats.mesh_pending += 1,
                ChunkState::Ready => stats.ready += 1,
            }
        }
        drop(table);

        let alloc = self.allocator.stats();
        stats.pools = alloc.pools;
        stats.allocations = alloc.allocations;
        stats.vertex_bytes = alloc.live_vertices * mem::size_of::<ChunkVertex>() as u64;
        stats.index_bytes = alloc.live_indices * mem::size_of::<u32>() as u64;
        stats
    }

    /// Lifecycle state of a coordinate.
    #[must_use]
    pub fn state(&self, coord: ChunkCoord) -> ChunkState {
        self.shared.table.lock().state(coord)
    }

    /// Block data of a loaded chunk.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.shared.table.lock().chunk(coord)
    }

    /// Coordinates currently in `state`, sorted.
    #[must_use]
    pub fn coords_in_state(&self, state: ChunkState) -> Vec<ChunkCoord> {
        let table = self.shared.table.lock();
        let mut coords: Vec<_> = table
            .states
            .iter()
            .filter(|(_, s)| **s == state)
            .map(|(c, _)| *c)
            .collect();
        drop(table);
        coords.sort_unstable();
        coords
    }

    /// Chunk the observer is in, once set.
    #[must_use]
    pub const fn observer_chunk(&self) -> Option<ChunkCoord> {
        self.observer
    }

    /// Streaming configuration.
    #[must_use]
    pub fn config(&self) -> &StreamingConfig {
        &self.shared.config
    }

    /// Block palette.
    #[must_use]
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// Buffer pools.
    #[must_use]
    pub const fn allocator(&self) -> &BufferPoolAllocator<M> {
        &self.allocator
    }

    /// Terrain job manager.
    #[must_use]
    pub const fn jobs(&self) -> &TerrainJobManager<T> {
        &self.jobs
    }

    /// Whether [`World::shutdown`] has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Stops and joins every thread and abandons in-flight GPU work.
    ///
    /// Idempotent. Called by `Drop`.
    pub fn shutdown(&mut self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.close_queues();

        if let Some(handle) = self.management.take() {
            if handle.join().is_err() {
                tracing::error!("management thread panicked");
            }
        }
        for (index, handle) in self.workers.drain(..).enumerate() {
            if handle.join().is_err() {
                tracing::error!("mesh worker {} panicked", index);
            }
        }

        for job in mem::take(&mut self.gpu_jobs) {
            self.jobs.release_gpu_job(job);
        }
        for job in mem::take(&mut self.transfers) {
            self.jobs.release_transfer_job(job);
        }
        self.mesh_backlog.clear();
        self.stale.clear();

        tracing::info!("world shut down after {} frames", self.frames);
    }
}

impl<T: TerrainBackend, M: MeshBufferBackend> Drop for World<T, M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn<F>(name: String, body: F) -> StreamResult<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(body)
        .map_err(|source| StreamError::Spawn { name, source })
}

fn upload<M: MeshBufferBackend>(
    allocator: &mut BufferPoolAllocator<M>,
    coord: ChunkCoord,
    kind: &str,
    mesh: &MeshData,
) -> MeshAllocation {
    allocator
        .allocate(&mesh.vertices, &mesh.indices)
        .unwrap_or_else(|err| {
            tracing::error!("chunk {} {} mesh not uploaded: {}", coord, kind, err);
            MeshAllocation::INVALID
        })
}
