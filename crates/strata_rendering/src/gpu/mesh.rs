//! Device buffer pools and the render-pass draw target.

use std::mem;
use std::sync::Arc;

use strata_meshing::ChunkVertex;
use strata_shared::Vec3;

use crate::allocator::{DrawTarget, MeshAllocation, MeshBufferBackend};

use super::GpuContext;

/// Vertex attributes of [`ChunkVertex`]: position, normal, color, texture layer.
pub const CHUNK_VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4, 3 => Uint32];

/// Push constant range carrying `[anchor.x, anchor.y, anchor.z, 1.0]`.
///
/// Chunk render pipelines must declare this range in their layout. Block
/// scaling belongs in the pipeline's camera uniform.
pub const CHUNK_PUSH_CONSTANTS: wgpu::PushConstantRange = wgpu::PushConstantRange {
    stages: wgpu::ShaderStages::VERTEX,
    range: 0..16,
};

/// Vertex buffer layout for chunk pipelines.
#[must_use]
pub fn chunk_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: mem::size_of::<ChunkVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &CHUNK_VERTEX_ATTRIBUTES,
    }
}

/// One vertex/index buffer pair on the device.
pub struct WgpuMeshPool {
    /// Vertex buffer.
    pub vertices: wgpu::Buffer,
    /// Index buffer (`u32`).
    pub indices: wgpu::Buffer,
}

/// Buffer pools in device memory, written through the queue.
pub struct WgpuMeshBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuMeshBackend {
    /// Creates the backend.
    #[must_use]
    pub fn new(context: &GpuContext) -> Self {
        Self {
            device: Arc::clone(&context.device),
            queue: Arc::clone(&context.queue),
        }
    }
}

impl MeshBufferBackend for WgpuMeshBackend {
    type Pool = WgpuMeshPool;

    fn create_pool(&mut self, index: usize, vertex_capacity: u32, index_capacity: u32) -> WgpuMeshPool {
        WgpuMeshPool {
            vertices: self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Chunk Vertex Pool {index}")),
                size: u64::from(vertex_capacity) * mem::size_of::<ChunkVertex>() as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
            indices: self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Chunk Index Pool {index}")),
                size: u64::from(index_capacity) * mem::size_of::<u32>() as u64,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        }
    }

    fn upload(
        &mut self,
        pool: &mut WgpuMeshPool,
        allocation: &MeshAllocation,
        vertices: &[ChunkVertex],
        indices: &[u32],
    ) {
        let vertex_at = u64::from(allocation.vertex_offset()) * mem::size_of::<ChunkVertex>() as u64;
        let index_at = u64::from(allocation.index_offset()) * mem::size_of::<u32>() as u64;
        self.queue
            .write_buffer(&pool.vertices, vertex_at, bytemuck::cast_slice(vertices));
        self.queue
            .write_buffer(&pool.indices, index_at, bytemuck::cast_slice(indices));
    }
}

/// Render pass with a pipeline using [`chunk_vertex_layout`] and
/// [`CHUNK_PUSH_CONSTANTS`] already set. The device must come from
/// [`GpuContext`], which guarantees push constant support.
impl<'a> DrawTarget<'a, WgpuMeshPool> for wgpu::RenderPass<'a> {
    fn bind_pool(&mut self, _pool_index: usize, pool: &'a WgpuMeshPool) {
        self.set_vertex_buffer(0, pool.vertices.slice(..));
        self.set_index_buffer(pool.indices.slice(..), wgpu::IndexFormat::Uint32);
    }

    fn draw_indexed(&mut self, allocation: &MeshAllocation, anchor: Vec3) {
        let constants = [anchor.x, anchor.y, anchor.z, 1.0];
        self.set_push_constants(
            wgpu::ShaderStages::VERTEX,
            0,
            bytemuck::cast_slice(&constants),
        );
        let base_vertex = i32::try_from(allocation.vertex_offset()).unwrap_or(i32::MAX);
        wgpu::RenderPass::draw_indexed(self, allocation.index_range(), base_vertex, 0..1);
    }
}
