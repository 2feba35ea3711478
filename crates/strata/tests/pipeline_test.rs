//! End-to-end streaming on the headless backends.
//!
//! These tests run the real threads, so they poll `step` until a condition
//! holds or a generous frame limit runs out.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use std::collections::HashMap;

use strata::{ChunkState, DistanceCamera, HeadlessWorld, RecordingTarget, World};
use strata_meshing::{mesh_chunk, MeshData, NeighborSnapshot};
use strata_procedural::{TerrainGenerator, TerrainParams};
use strata_rendering::{CpuMeshBackend, CpuMeshPool, CpuTerrainBackend, MeshAllocation};
use strata_shared::{BlockRegistry, BlockType, ChunkCoord, StreamingConfig, Vec3, VerticalRange, CHUNK_DIM};

const MAX_FRAMES: usize = 5000;

fn config(render_distance: i32) -> StreamingConfig {
    StreamingConfig {
        render_distance,
        vertical_range: VerticalRange { min: -2, max: 2 },
        max_concurrent_jobs: 4,
        max_concurrent_transfers: 2,
        pool_vertex_capacity: 1 << 16,
        pool_index_capacity: 3 << 15,
        mesh_workers: Some(2),
        queue_capacity: 64,
        cpu_generation_latency: 2,
        ..StreamingConfig::default()
    }
}

fn world(render_distance: i32) -> HeadlessWorld {
    HeadlessWorld::headless(config(render_distance), Arc::new(BlockRegistry::builtin())).unwrap()
}

/// Center of a chunk in world space.
fn chunk_center(coord: ChunkCoord, block_size: f32) -> Vec3 {
    let half = CHUNK_DIM as f32 * block_size * 0.5;
    coord.world_anchor(block_size) + Vec3::splat(half)
}

fn everything() -> DistanceCamera {
    DistanceCamera {
        position: Vec3::ZERO,
        radius: f32::MAX,
    }
}

/// Coordinates the management thread wants around any of `centers`, sorted.
fn wanted_around(config: &StreamingConfig, centers: &[ChunkCoord]) -> Vec<ChunkCoord> {
    let rd = config.render_distance;
    let mut coords = Vec::new();
    for &center in centers {
        for dy in -rd..=rd {
            for dz in -rd..=rd {
                for dx in -rd..=rd {
                    let coord = center.offset(dx, dy, dz);
                    if coord.distance_squared(center) <= config.load_distance_squared()
                        && config.vertical_range.contains(coord.y)
                    {
                        coords.push(coord);
                    }
                }
            }
        }
    }
    coords.sort_unstable();
    coords.dedup();
    coords
}

/// Lowest chunk in the column at the origin that has blocks while the one
/// above it is pure air.
fn surface_chunk(generator: &TerrainGenerator) -> ChunkCoord {
    let is_air = |coord| generator.generate(coord).iter().all(|&b| b == BlockType::AIR);
    (-10..10)
        .map(|y| ChunkCoord::new(0, y, 0))
        .find(|&coord| !is_air(coord) && is_air(coord.offset(0, 1, 0)))
        .unwrap()
}

fn assert_uploaded(pool: Option<&CpuMeshPool>, allocation: MeshAllocation, expected: &MeshData) {
    if expected.vertices.is_empty() {
        assert!(!allocation.is_valid());
        return;
    }
    let pool = pool.unwrap();
    assert_eq!(pool.vertices(&allocation), &expected.vertices[..]);
    assert_eq!(pool.indices(&allocation), &expected.indices[..]);
}

fn step_until(world: &mut HeadlessWorld, mut done: impl FnMut(&HeadlessWorld) -> bool) -> bool {
    for _ in 0..MAX_FRAMES {
        world.step();
        if done(world) {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn test_render_distance_one_loads_seven_chunks() {
    let mut world = world(1);
    let block_size = world.config().block_size;
    world.set_observer_position(chunk_center(ChunkCoord::ORIGIN, block_size));

    assert!(step_until(&mut world, |w| w.stats().ready == 7 && !w.stats().is_busy()));

    let mut expected: Vec<_> = std::iter::once(ChunkCoord::ORIGIN)
        .chain(ChunkCoord::ORIGIN.face_neighbors())
        .collect();
    expected.sort_unstable();
    assert_eq!(world.coords_in_state(ChunkState::Ready), expected);
    assert_eq!(world.stats().jobs_in_flight, 0);
    assert_eq!(world.stats().transfers_in_flight, 0);
}

#[test]
fn test_moving_away_unloads_far_chunks() {
    let mut world = world(1);
    let block_size = world.config().block_size;
    world.set_observer_position(chunk_center(ChunkCoord::ORIGIN, block_size));
    assert!(step_until(&mut world, |w| w.stats().ready == 7));

    let target = ChunkCoord::new(5, 0, 0);
    world.set_observer_position(chunk_center(target, block_size));
    let unload_distance = world.config().unload_distance_squared();

    let settled = step_until(&mut world, |w| {
        let stats = w.stats();
        let tracked: Vec<_> = [
            ChunkState::Backlog,
            ChunkState::GpuPending,
            ChunkState::PboPending,
            ChunkState::DataReady,
            ChunkState::MeshPending,
            ChunkState::Ready,
        ]
        .into_iter()
        .flat_map(|s| w.coords_in_state(s))
        .collect();
        stats.ready == 7 && tracked.iter().all(|c| c.distance_squared(target) <= unload_distance)
    });
    assert!(settled);
    assert!(world.chunk(ChunkCoord::ORIGIN).is_none());
    assert!(world.chunk(target).is_some());
}

#[test]
fn test_every_live_allocation_belongs_to_a_chunk() {
    let mut world = world(2);
    let block_size = world.config().block_size;
    world.set_observer_position(chunk_center(ChunkCoord::ORIGIN, block_size));
    assert!(step_until(&mut world, |w| !w.stats().is_busy() && w.stats().ready > 0));

    // Move far enough that everything is replaced, then settle again
    world.set_observer_position(chunk_center(ChunkCoord::new(-6, 0, 3), block_size));
    assert!(step_until(&mut world, |w| {
        !w.stats().is_busy() && w.state(ChunkCoord::ORIGIN) == ChunkState::Undefined
    }));

    let camera = DistanceCamera {
        position: Vec3::ZERO,
        radius: f32::MAX,
    };
    let chunks = world.visible_chunks(&camera);
    let valid = chunks
        .iter()
        .map(|c| usize::from(c.opaque.is_valid()) + usize::from(c.transparent.is_valid()))
        .sum::<usize>();
    assert_eq!(world.stats().allocations, valid);

    let mut target = RecordingTarget::default();
    let draws = world.render(&camera, &mut target);
    assert_eq!(draws.draws as usize, valid);
    assert_eq!(target.draws.len(), valid);
    assert!(target.draws.iter().all(|d| d.pool == Some(d.allocation.pool_index())));
}

#[test]
fn test_culled_chunks_are_not_drawn() {
    let mut world = world(1);
    let block_size = world.config().block_size;
    world.set_observer_position(chunk_center(ChunkCoord::ORIGIN, block_size));
    assert!(step_until(&mut world, |w| w.stats().ready == 7 && !w.stats().is_busy()));

    let camera = DistanceCamera {
        position: Vec3::splat(-1.0e6),
        radius: 1.0,
    };
    let mut target = RecordingTarget::default();
    let draws = world.render(&camera, &mut target);
    assert_eq!(draws.draws, 0);
    assert_eq!(draws.chunks_visible, 0);
    assert!(target.draws.is_empty());
}

#[test]
fn test_shutdown_is_idempotent() {
    let mut world = world(1);
    world.set_observer_position(Vec3::ZERO);
    for _ in 0..10 {
        world.step();
    }
    world.shutdown();
    assert!(world.is_shut_down());
    world.shutdown();
    // Stepping after shutdown does nothing
    let frames = world.stats().frames;
    world.step();
    assert_eq!(world.stats().frames, frames);
    assert_eq!(world.stats().jobs_in_flight, 0);
}

#[test]
fn test_jittering_observer_generates_each_chunk_once() {
    let mut world = world(2);
    let block_size = world.config().block_size;
    let (a, b) = (ChunkCoord::ORIGIN, ChunkCoord::new(1, 0, 0));

    for frame in 0..600 {
        let center = if (frame / 3) % 2 == 0 { a } else { b };
        world.set_observer_position(chunk_center(center, block_size));
        world.step();
        thread::sleep(Duration::from_micros(200));
    }
    // Settle on both centers so each load set was planned at least once
    let expected = wanted_around(world.config(), &[a, b]);
    for center in [a, b] {
        world.set_observer_position(chunk_center(center, block_size));
        assert!(step_until(&mut world, |w| !w.stats().is_busy()
            && w.observer_chunk() == Some(center)
            && wanted_around(w.config(), &[center]).iter().all(|&c| w.state(c) == ChunkState::Ready)));
    }

    assert_eq!(world.coords_in_state(ChunkState::Ready), expected);
    assert_eq!(world.jobs().backend().dispatch_count(), expected.len() as u64);
    assert_eq!(world.stats().dropped_results, 0);
}

#[test]
fn test_ready_meshes_see_every_loaded_neighbor() {
    let mut world = world(2);
    let block_size = world.config().block_size;
    world.set_observer_position(chunk_center(ChunkCoord::ORIGIN, block_size));
    let expected = wanted_around(world.config(), &[ChunkCoord::ORIGIN]);
    assert!(step_until(&mut world, |w| {
        !w.stats().is_busy() && w.stats().ready == expected.len()
    }));

    let drawn: HashMap<_, _> = world
        .visible_chunks(&everything())
        .into_iter()
        .map(|chunk| (chunk.coord, chunk))
        .collect();
    let allocator = world.allocator();
    let mut meshed = 0;
    for coord in world.coords_in_state(ChunkState::Ready) {
        let chunk = world.chunk(coord).unwrap();
        let neighbors = NeighborSnapshot::capture(coord, |c| world.chunk(c));
        let mesh = mesh_chunk(&chunk, world.registry(), &neighbors);

        let (opaque, transparent) = drawn.get(&coord).map_or(
            (MeshAllocation::INVALID, MeshAllocation::INVALID),
            |chunk| (chunk.opaque, chunk.transparent),
        );
        let pool = |a: MeshAllocation| allocator.pool(a.pool_index()).map(|p| p.buffers());
        assert_uploaded(pool(opaque), opaque, &mesh.opaque);
        assert_uploaded(pool(transparent), transparent, &mesh.transparent);
        meshed += usize::from(!mesh.opaque.vertices.is_empty());
    }
    assert!(meshed > 0);
}

#[test]
fn test_terrain_arriving_after_observer_left_is_discarded() {
    let mut world = world(1);
    let block_size = world.config().block_size;
    world.set_observer_position(chunk_center(ChunkCoord::ORIGIN, block_size));
    assert!(step_until(&mut world, |w| w.stats().gpu_pending > 0));

    let far = ChunkCoord::new(40, 0, 0);
    world.set_observer_position(chunk_center(far, block_size));
    assert!(step_until(&mut world, |w| w.stats().ready == 7 && !w.stats().is_busy()));

    assert!(world.stats().dropped_results > 0);
    assert_eq!(world.state(ChunkCoord::ORIGIN), ChunkState::Undefined);
    assert!(world
        .coords_in_state(ChunkState::Ready)
        .iter()
        .all(|c| c.distance_squared(far) <= 1));
}

#[test]
fn test_failed_read_back_leaves_empty_ready_chunk() {
    let config = StreamingConfig {
        vertical_range: VerticalRange { min: -12, max: 2 },
        ..config(0)
    };
    let deep = ChunkCoord::new(0, -10, 0);
    let generator = TerrainGenerator::new(TerrainParams::with_seed(config.seed));
    assert!(generator.generate(deep).iter().any(|&b| b != BlockType::AIR));

    let mut terrain = CpuTerrainBackend::new(generator, config.cpu_generation_latency);
    terrain.fail_next_reads(1);
    let block_size = config.block_size;
    let mut world = World::new(
        config,
        Arc::new(BlockRegistry::builtin()),
        terrain,
        CpuMeshBackend::new(),
    )
    .unwrap();
    world.set_observer_position(chunk_center(deep, block_size));
    assert!(step_until(&mut world, |w| w.state(deep) == ChunkState::Ready));

    assert!(world.chunk(deep).unwrap().is_empty());
    assert_eq!(world.jobs().backend().dispatch_count(), 1);
    assert_eq!(world.stats().allocations, 0);
    assert!(world.visible_chunks(&everything()).is_empty());
}

#[test]
fn test_empty_neighbor_does_not_remesh_surface() {
    let config = StreamingConfig {
        vertical_range: VerticalRange { min: -12, max: 12 },
        ..config(0)
    };
    let generator = TerrainGenerator::new(TerrainParams::with_seed(config.seed));
    let surface = surface_chunk(&generator);
    let sky = surface.offset(0, 1, 0);

    let block_size = config.block_size;
    let mut world = World::new(
        config,
        Arc::new(BlockRegistry::builtin()),
        CpuTerrainBackend::new(generator, 2),
        CpuMeshBackend::new(),
    )
    .unwrap();
    world.set_observer_position(chunk_center(surface, block_size));
    assert!(step_until(&mut world, |w| {
        w.state(surface) == ChunkState::Ready && !w.stats().is_busy()
    }));
    let uploads = world.allocator().backend().upload_count();
    assert!(uploads > 0);

    world.set_observer_position(chunk_center(sky, block_size));
    assert!(step_until(&mut world, |w| {
        w.state(sky) == ChunkState::Ready && !w.stats().is_busy()
    }));
    assert_eq!(world.state(surface), ChunkState::Ready);
    assert_eq!(world.allocator().backend().upload_count(), uploads);
}
