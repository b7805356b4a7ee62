// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The encoder-based native contract, modeled on the WebGPU object model.

use super::NativeError;
use crate::renderer::api::{
    BindGroupLayoutEntry, BlendState, BufferUsage, CompareFunction, CullMode, IndexFormat,
    PrimitiveTopology, SamplerParams, TextureFormat, TextureUsage, VertexLayout,
};
use async_trait::async_trait;

/// An opaque handle to any object owned by a [`GpuApi`] device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(pub u64);

/// Describes a buffer. With `contents`, the buffer is created mapped, the
/// contents are written into the mapping, and it is unmapped before return.
#[derive(Debug, Clone, Copy)]
pub struct GpuBufferDescriptor<'a> {
    /// Debug label.
    pub label: &'a str,
    /// Size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
    /// Initial content written through the mapped-at-creation path.
    pub contents: Option<&'a [u8]>,
}

/// Describes a 2D texture.
#[derive(Debug, Clone, Copy)]
pub struct GpuTextureDescriptor<'a> {
    /// Debug label.
    pub label: &'a str,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Texel format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
    /// Samples per texel.
    pub sample_count: u32,
}

/// Where a pipeline's bind group layouts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuLayout {
    /// Derived from the shader.
    Auto,
    /// The given bind group layouts, in group order.
    Explicit(Vec<GpuHandle>),
}

/// Depth state baked into a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuDepthState {
    /// The depth attachment format.
    pub format: TextureFormat,
    /// The depth comparison.
    pub compare: CompareFunction,
}

/// Describes a render pipeline.
#[derive(Debug, Clone)]
pub struct GpuRenderPipelineDescriptor<'a> {
    /// Debug label.
    pub label: &'a str,
    /// The shader module holding both entry points.
    pub module: GpuHandle,
    /// Vertex entry point.
    pub vertex_entry: &'a str,
    /// Fragment entry point.
    pub fragment_entry: &'a str,
    /// Vertex buffer layouts.
    pub vertex_layouts: &'a [VertexLayout<'a>],
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Color target format.
    pub color_format: TextureFormat,
    /// Blend state; `None` disables blending.
    pub blend: Option<BlendState>,
    /// Culled face; `None` disables culling.
    pub cull_mode: Option<CullMode>,
    /// Depth state; `None` means the pipeline runs without a depth attachment.
    pub depth: Option<GpuDepthState>,
    /// Samples per pixel.
    pub sample_count: u32,
    /// Layout source.
    pub layout: GpuLayout,
}

/// Describes a compute pipeline.
#[derive(Debug, Clone)]
pub struct GpuComputePipelineDescriptor<'a> {
    /// Debug label.
    pub label: &'a str,
    /// The compute shader module.
    pub module: GpuHandle,
    /// Entry point.
    pub entry_point: &'a str,
    /// Layout source.
    pub layout: GpuLayout,
}

/// A resource bound into a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuBinding {
    /// A buffer range.
    Buffer {
        /// The buffer.
        buffer: GpuHandle,
        /// Byte offset.
        offset: u64,
        /// Byte size; `None` binds to the end.
        size: Option<u64>,
    },
    /// A texture view.
    TextureView(GpuHandle),
    /// A sampler.
    Sampler(GpuHandle),
}

/// The color attachment of a recorded pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuColorAttachment {
    /// The view rendered into.
    pub view: GpuHandle,
    /// The single-sampled view the attachment resolves into, if any.
    pub resolve_target: Option<GpuHandle>,
    /// The clear color.
    pub clear: [f64; 4],
}

/// The depth/stencil attachment of a recorded pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuDepthAttachment {
    /// The depth view.
    pub view: GpuHandle,
    /// The depth clear value.
    pub depth_clear: f32,
    /// The stencil clear value, for formats with a stencil aspect.
    pub stencil_clear: Option<u32>,
}

/// The draw issued inside a recorded pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuDraw {
    /// An indexed draw from the pass's index buffer.
    Indexed {
        /// Index count.
        count: u32,
        /// Instance count.
        instances: u32,
    },
    /// A non-indexed draw.
    NonIndexed {
        /// Vertex count.
        count: u32,
        /// Instance count.
        instances: u32,
    },
}

/// A complete render pass, recorded and submitted as one command buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassRecord {
    /// Color attachment.
    pub color: GpuColorAttachment,
    /// Optional depth/stencil attachment.
    pub depth: Option<GpuDepthAttachment>,
    /// The pipeline set in the pass.
    pub pipeline: GpuHandle,
    /// `(slot, buffer)` vertex buffer bindings.
    pub vertex_buffers: Vec<(u32, GpuHandle)>,
    /// `(index, group)` bind group bindings.
    pub bind_groups: Vec<(u32, GpuHandle)>,
    /// The index buffer and its element format.
    pub index_buffer: Option<(GpuHandle, IndexFormat)>,
    /// The draw, if any.
    pub draw: Option<GpuDraw>,
}

/// A complete compute pass, recorded and submitted as one command buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePassRecord {
    /// The compute pipeline.
    pub pipeline: GpuHandle,
    /// `(index, group)` bind group bindings.
    pub bind_groups: Vec<(u32, GpuHandle)>,
    /// Workgroup counts in x, y and z.
    pub workgroups: [u32; 3],
}

/// An encoder-based device with its queue and configured surface.
///
/// All object creation returns a [`GpuHandle`]. [`GpuApi::release`] destroys
/// any object by handle.
pub trait GpuApi {
    /// Adapter and backend description.
    fn describe(&self) -> String;
    /// The format the surface was configured with.
    fn surface_format(&self) -> TextureFormat;
    /// Reconfigures the surface for a new size.
    fn configure_surface(&mut self, width: u32, height: u32);

    /// Creates a buffer, writing `contents` through a mapped-at-creation range.
    fn create_buffer(&mut self, desc: &GpuBufferDescriptor<'_>) -> Result<GpuHandle, NativeError>;
    /// Writes into an existing buffer through the queue.
    fn write_buffer(&mut self, buffer: GpuHandle, offset: u64, data: &[u8])
        -> Result<(), NativeError>;
    /// Reads a buffer back, if the device supports synchronous readback.
    fn read_buffer(&mut self, buffer: GpuHandle) -> Option<Vec<u8>>;

    /// Creates a texture.
    fn create_texture(&mut self, desc: &GpuTextureDescriptor<'_>)
        -> Result<GpuHandle, NativeError>;
    /// Creates the default view of a texture.
    fn create_texture_view(&mut self, texture: GpuHandle) -> Result<GpuHandle, NativeError>;
    /// Writes the full extent of a texture.
    fn write_texture(
        &mut self,
        texture: GpuHandle,
        data: &[u8],
        width: u32,
        height: u32,
        bytes_per_row: u32,
    ) -> Result<(), NativeError>;
    /// Creates a sampler.
    fn create_sampler(&mut self, params: &SamplerParams) -> Result<GpuHandle, NativeError>;

    /// Compiles a shader module.
    fn create_shader_module(&mut self, label: &str, source: &str)
        -> Result<GpuHandle, NativeError>;
    /// Creates a bind group layout.
    fn create_bind_group_layout(
        &mut self,
        label: &str,
        entries: &[BindGroupLayoutEntry],
    ) -> Result<GpuHandle, NativeError>;
    /// Creates a render pipeline.
    fn create_render_pipeline(
        &mut self,
        desc: &GpuRenderPipelineDescriptor<'_>,
    ) -> Result<GpuHandle, NativeError>;
    /// Creates a compute pipeline.
    fn create_compute_pipeline(
        &mut self,
        desc: &GpuComputePipelineDescriptor<'_>,
    ) -> Result<GpuHandle, NativeError>;
    /// Returns the layout a pipeline uses for a bind group index.
    fn pipeline_bind_group_layout(
        &mut self,
        pipeline: GpuHandle,
        index: u32,
    ) -> Result<GpuHandle, NativeError>;
    /// Creates a bind group from `(binding, resource)` pairs.
    fn create_bind_group(
        &mut self,
        label: &str,
        layout: GpuHandle,
        entries: &[(u32, GpuBinding)],
    ) -> Result<GpuHandle, NativeError>;

    /// Destroys any object by handle. Unknown handles are ignored.
    fn release(&mut self, handle: GpuHandle);

    /// Acquires the next surface texture and returns a view of it.
    fn acquire_surface_view(&mut self) -> Result<GpuHandle, NativeError>;
    /// Records and submits one render pass.
    fn submit_render_pass(&mut self, pass: &RenderPassRecord) -> Result<(), NativeError>;
    /// Records and submits one compute pass.
    fn submit_compute_pass(&mut self, pass: &ComputePassRecord) -> Result<(), NativeError>;
    /// Presents the acquired surface texture.
    fn present(&mut self);
}

/// An encoder-based canvas from which a device is requested asynchronously.
#[async_trait(?Send)]
pub trait GpuCanvas {
    /// Adapter description.
    fn describe(&self) -> String;

    /// Requests a device and configures the surface at the given size.
    async fn request_device(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn GpuApi>, NativeError>;
}
