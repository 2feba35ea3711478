//! STRATA headless demo.
//!
//! Flies an observer through the world on the CPU backends and logs the
//! pipeline every second.
//!
//! Usage:
//!   strata-demo [config.toml]
//!
//! Logging follows `RUST_LOG` (default `info`).

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use strata::{DistanceCamera, HeadlessWorld, RecordingTarget, StreamError};
use strata_shared::{BlockRegistry, StreamingConfig, Vec3};
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(16);
const FRAMES: u64 = 60 * 20;
/// Blocks per second along +X.
const SPEED: f32 = 24.0;

fn main() -> Result<(), StreamError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => StreamingConfig::load(path)?,
        None => StreamingConfig {
            render_distance: 6,
            ..StreamingConfig::default()
        },
    };
    let block_size = config.block_size;
    #[allow(clippy::cast_precision_loss)]
    let view_radius = (config.render_distance as f32 + 1.0) * 16.0 * block_size;

    let mut world = HeadlessWorld::headless(config, Arc::new(BlockRegistry::builtin()))?;
    let started = Instant::now();

    for frame in 0..FRAMES {
        let frame_start = Instant::now();
        #[allow(clippy::cast_precision_loss)]
        let t = frame as f32 * FRAME.as_secs_f32();
        let position = Vec3::new(t * SPEED * block_size, 8.0 * block_size, 0.0);

        world.set_observer_position(position);
        world.step();

        let camera = DistanceCamera {
            position,
            radius: view_radius,
        };
        let mut target = RecordingTarget::default();
        let draws = world.render(&camera, &mut target);

        if frame % 60 == 0 {
            tracing::info!("{} | draws {} binds {}", world.stats(), draws.draws, draws.binds);
        }

        if let Some(rest) = FRAME.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    tracing::info!(
        "flew {} frames in {:.1}s: {}",
        FRAMES,
        started.elapsed().as_secs_f32(),
        world.stats()
    );
    world.shutdown();
    Ok(())
}
