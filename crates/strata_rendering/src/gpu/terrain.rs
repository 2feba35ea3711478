//! Compute-shader terrain generation with mapped read-back.

use std::mem;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use strata_procedural::TerrainGenerator;
use strata_shared::{BlockType, ChunkCoord, CHUNK_DIM, CHUNK_VOLUME};

use crate::error::GpuError;
use crate::fence::{Fence, SignalFence};
use crate::jobs::TerrainBackend;

use super::GpuContext;

const WORKGROUP_SIZE: u32 = 4;
#[allow(clippy::cast_possible_truncation)]
const GROUPS_PER_AXIS: u32 = CHUNK_DIM as u32 / WORKGROUP_SIZE;
const CHUNK_BYTES: u64 = (CHUNK_VOLUME * mem::size_of::<u32>()) as u64;

/// Uniform layout of `ChunkParams` in `terrain.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct ChunkParamsUniform {
    coord: [i32; 4],
    seed: u32,
    sea_level: i32,
    base_height: i32,
    octaves: u32,
    amplitude: f32,
    frequency: f32,
    _pad: [u32; 2],
}

struct StorageSlot {
    params: wgpu::Buffer,
    blocks: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct TransferSlot {
    buffer: wgpu::Buffer,
    /// Map request of the last copy; `None` once read and unmapped.
    mapping: Option<SignalFence>,
}

/// Terrain generation on the device.
pub struct WgpuTerrainBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    generator: TerrainGenerator,
    storage: Vec<StorageSlot>,
    transfer: Vec<TransferSlot>,
}

impl WgpuTerrainBackend {
    /// Compiles the terrain shader.
    #[must_use]
    pub fn new(context: &GpuContext, generator: TerrainGenerator) -> Self {
        let device = Arc::clone(&context.device);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/terrain.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Terrain Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "generate",
        });

        Self {
            device,
            queue: Arc::clone(&context.queue),
            pipeline,
            layout,
            generator,
            storage: Vec::new(),
            transfer: Vec::new(),
        }
    }

    fn uniform(&self, coord: ChunkCoord) -> ChunkParamsUniform {
        let p = self.generator.params();
        ChunkParamsUniform {
            coord: [coord.x, coord.y, coord.z, 0],
            seed: self.generator.gpu_seed(),
            sea_level: p.sea_level,
            base_height: p.base_height,
            octaves: p.octaves,
            amplitude: p.amplitude,
            frequency: p.frequency,
            _pad: [0; 2],
        }
    }
}

impl TerrainBackend for WgpuTerrainBackend {
    type Fence = SignalFence;

    fn create_slots(&mut self, storage: usize, transfer: usize) {
        self.storage = (0..storage)
            .map(|i| {
                let params = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("Terrain Params {i}")),
                    size: mem::size_of::<ChunkParamsUniform>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let blocks = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("Terrain Storage {i}")),
                    size: CHUNK_BYTES,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                });
                let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Terrain Bind Group"),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: params.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: blocks.as_entire_binding(),
                        },
                    ],
                });
                StorageSlot {
                    params,
                    blocks,
                    bind_group,
                }
            })
            .collect();

        self.transfer = (0..transfer)
            .map(|i| TransferSlot {
                buffer: self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("Terrain Transfer {i}")),
                    size: CHUNK_BYTES,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                mapping: None,
            })
            .collect();
    }

    fn dispatch(&mut self, storage_slot: usize, coord: ChunkCoord) -> SignalFence {
        let slot = &self.storage[storage_slot];
        self.queue
            .write_buffer(&slot.params, 0, bytemuck::bytes_of(&self.uniform(coord)));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Terrain Dispatch"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Terrain Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &slot.bind_group, &[]);
            pass.dispatch_workgroups(GROUPS_PER_AXIS, GROUPS_PER_AXIS, GROUPS_PER_AXIS);
        }
        self.queue.submit(Some(encoder.finish()));

        let fence = SignalFence::new();
        let signal = fence.clone();
        self.queue.on_submitted_work_done(move || signal.signal());
        fence
    }

    fn copy_to_transfer(&mut self, storage_slot: usize, transfer_slot: usize) -> SignalFence {
        let source = &self.storage[storage_slot].blocks;
        let slot = &mut self.transfer[transfer_slot];

        // A slot released without being read is still mapped
        if let Some(previous) = slot.mapping.take() {
            if !previous.has_failed() {
                slot.buffer.unmap();
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Terrain Transfer"),
            });
        encoder.copy_buffer_to_buffer(source, 0, &slot.buffer, 0, CHUNK_BYTES);
        self.queue.submit(Some(encoder.finish()));

        let fence = SignalFence::new();
        let callback = fence.clone();
        slot.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| match result {
                Ok(()) => callback.signal(),
                Err(_) => callback.fail(),
            });
        slot.mapping = Some(fence.clone());
        fence
    }

    fn read_transfer(&mut self, transfer_slot: usize, out: &mut [BlockType]) -> Result<(), GpuError> {
        let slot = &mut self.transfer[transfer_slot];
        let Some(mapping) = slot.mapping.as_ref() else {
            return Err(GpuError::NotReady { slot: transfer_slot });
        };
        if mapping.has_failed() {
            slot.mapping = None;
            return Err(GpuError::MapFailed { slot: transfer_slot });
        }
        if !mapping.is_signaled() {
            return Err(GpuError::NotReady { slot: transfer_slot });
        }

        {
            let view = slot.buffer.slice(..).get_mapped_range();
            let words: &[u32] = bytemuck::cast_slice(&view);
            for (block, &id) in out.iter_mut().zip(words) {
                *block = BlockType(id);
            }
        }
        slot.buffer.unmap();
        slot.mapping = None;
        Ok(())
    }

    fn poll(&mut self) {
        self.device.poll(wgpu::Maintain::Poll);
    }
}
