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

//! A recording implementation of the encoder-based native contract.

use async_trait::async_trait;
use prism_core::native::{
    ComputePassRecord, GpuApi, GpuBinding, GpuBufferDescriptor, GpuCanvas,
    GpuComputePipelineDescriptor, GpuHandle, GpuLayout, GpuRenderPipelineDescriptor,
    GpuTextureDescriptor, NativeError, RenderPassRecord,
};
use prism_core::renderer::api::{
    BindGroupLayoutEntry, BufferUsage, SamplerParams, TextureFormat, TextureUsage,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::gl::COMPILE_ERROR_MARKER;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum GpuCall {
    ConfigureSurface(u32, u32),
    CreateBuffer {
        handle: GpuHandle,
        size: u64,
        usage: BufferUsage,
        mapped_at_creation: bool,
    },
    WriteBuffer {
        handle: GpuHandle,
        offset: u64,
        len: u64,
    },
    CreateTexture {
        handle: GpuHandle,
        width: u32,
        height: u32,
        format: TextureFormat,
        sample_count: u32,
    },
    CreateTextureView {
        texture: GpuHandle,
        view: GpuHandle,
    },
    WriteTexture {
        texture: GpuHandle,
        len: u64,
    },
    CreateSampler(GpuHandle),
    CreateShaderModule(GpuHandle),
    CreateBindGroupLayout(GpuHandle),
    CreateRenderPipeline {
        handle: GpuHandle,
        sample_count: u32,
    },
    CreateComputePipeline(GpuHandle),
    CreateBindGroup {
        handle: GpuHandle,
        entries: usize,
    },
    Release(GpuHandle),
    AcquireSurfaceView(GpuHandle),
    SubmitRenderPass(RenderPassRecord),
    SubmitComputePass(ComputePassRecord),
    Present,
}

#[derive(Debug, Clone)]
enum GpuObject {
    Buffer { data: Vec<u8> },
    Texture { sample_count: u32, usage: TextureUsage },
    TextureView { sample_count: u32 },
    Sampler,
    ShaderModule,
    BindGroupLayout,
    RenderPipeline { sample_count: u32, layouts: usize },
    ComputePipeline { layouts: usize },
    BindGroup,
    SurfaceView,
}

#[derive(Debug, Default)]
struct GpuState {
    calls: Vec<GpuCall>,
    next_handle: u64,
    objects: BTreeMap<GpuHandle, GpuObject>,
    surface_size: (u32, u32),
    fail_device: bool,
}

impl GpuState {
    fn insert(&mut self, object: GpuObject) -> GpuHandle {
        self.next_handle += 1;
        let handle = GpuHandle(self.next_handle);
        self.objects.insert(handle, object);
        handle
    }

    fn expect_kind(
        &self,
        handle: GpuHandle,
        matches: impl Fn(&GpuObject) -> bool,
    ) -> Result<&GpuObject, NativeError> {
        self.objects
            .get(&handle)
            .filter(|o| matches(o))
            .ok_or(NativeError::InvalidHandle(handle.0))
    }

    fn view_samples(&self, view: GpuHandle) -> Result<u32, NativeError> {
        match self.objects.get(&view) {
            Some(GpuObject::TextureView { sample_count }) => Ok(*sample_count),
            Some(GpuObject::SurfaceView) => Ok(1),
            _ => Err(NativeError::InvalidHandle(view.0)),
        }
    }
}

/// Bind group slots an automatic layout exposes.
const AUTO_LAYOUT_GROUPS: usize = 4;

/// The surface format the headless device reports.
pub const HEADLESS_SURFACE_FORMAT: TextureFormat = TextureFormat::Bgra8UnormSrgb;

/// An in-memory encoder-based device.
///
/// Handles are allocated from one counter. Submitted passes are validated the
/// way a real device would: every handle must be live and of the right kind,
/// and the color attachment's sample count must match the pipeline's.
#[derive(Debug, Clone)]
pub struct HeadlessGpu {
    state: Arc<Mutex<GpuState>>,
}

/// A read handle onto a [`HeadlessGpu`]'s recorded state.
#[derive(Debug, Clone)]
pub struct GpuLog {
    state: Arc<Mutex<GpuState>>,
}

/// A canvas that hands out [`HeadlessGpu`] devices.
#[derive(Debug, Clone)]
pub struct HeadlessCanvas {
    state: Arc<Mutex<GpuState>>,
}

fn lock(state: &Mutex<GpuState>) -> MutexGuard<'_, GpuState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HeadlessCanvas {
    /// Creates a canvas and the log that observes devices it creates.
    pub fn new() -> (Self, GpuLog) {
        let state = Arc::new(Mutex::new(GpuState::default()));
        let log = GpuLog {
            state: Arc::clone(&state),
        };
        (Self { state }, log)
    }
}

#[async_trait(?Send)]
impl GpuCanvas for HeadlessCanvas {
    fn describe(&self) -> String {
        "Headless GPU canvas".to_string()
    }

    async fn request_device(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn GpuApi>, NativeError> {
        if lock(&self.state).fail_device {
            return Err(NativeError::Device("no adapter available".to_string()));
        }
        let mut device = HeadlessGpu {
            state: Arc::clone(&self.state),
        };
        device.configure_surface(width, height);
        Ok(Box::new(device))
    }
}

impl GpuLog {
    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<GpuCall> {
        lock(&self.state).calls.clone()
    }

    /// Counts the recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&GpuCall) -> bool) -> usize {
        lock(&self.state).calls.iter().filter(|c| predicate(c)).count()
    }

    /// Every submitted render pass, in order.
    pub fn render_passes(&self) -> Vec<RenderPassRecord> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|c| match c {
                GpuCall::SubmitRenderPass(pass) => Some(pass.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forgets the recorded calls, keeping object state.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Number of live device objects.
    pub fn live_objects(&self) -> usize {
        lock(&self.state).objects.len()
    }

    /// Whether `handle` is live.
    pub fn is_live(&self, handle: GpuHandle) -> bool {
        lock(&self.state).objects.contains_key(&handle)
    }

    /// The current size of the configured surface.
    pub fn surface_size(&self) -> (u32, u32) {
        lock(&self.state).surface_size
    }

    /// Makes later device requests fail.
    pub fn fail_device(&self, fail: bool) {
        lock(&self.state).fail_device = fail;
    }
}

impl HeadlessGpu {
    fn state(&self) -> MutexGuard<'_, GpuState> {
        lock(&self.state)
    }
}

impl GpuApi for HeadlessGpu {
    fn describe(&self) -> String {
        "Headless GPU device".to_string()
    }

    fn surface_format(&self) -> TextureFormat {
        HEADLESS_SURFACE_FORMAT
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        let mut state = self.state();
        state.surface_size = (width, height);
        state.calls.push(GpuCall::ConfigureSurface(width, height));
    }

    fn create_buffer(&mut self, desc: &GpuBufferDescriptor<'_>) -> Result<GpuHandle, NativeError> {
        if desc.size == 0 {
            return Err(NativeError::Validation(format!(
                "buffer '{}' has zero size",
                desc.label
            )));
        }
        let mut data = vec![0; desc.size as usize];
        if let Some(contents) = desc.contents {
            let len = contents.len().min(data.len());
            data[..len].copy_from_slice(&contents[..len]);
        }
        let mut state = self.state();
        let handle = state.insert(GpuObject::Buffer { data });
        state.calls.push(GpuCall::CreateBuffer {
            handle,
            size: desc.size,
            usage: desc.usage,
            mapped_at_creation: desc.contents.is_some(),
        });
        Ok(handle)
    }

    fn write_buffer(
        &mut self,
        buffer: GpuHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), NativeError> {
        let mut state = self.state();
        let Some(GpuObject::Buffer { data: contents }) = state.objects.get_mut(&buffer) else {
            return Err(NativeError::InvalidHandle(buffer.0));
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > contents.len() {
            return Err(NativeError::Validation(format!(
                "write of {} bytes at offset {offset} exceeds buffer size {}",
                data.len(),
                contents.len()
            )));
        }
        contents[start..end].copy_from_slice(data);
        state.calls.push(GpuCall::WriteBuffer {
            handle: buffer,
            offset,
            len: data.len() as u64,
        });
        Ok(())
    }

    fn read_buffer(&mut self, buffer: GpuHandle) -> Option<Vec<u8>> {
        match self.state().objects.get(&buffer) {
            Some(GpuObject::Buffer { data }) => Some(data.clone()),
            _ => None,
        }
    }

    fn create_texture(
        &mut self,
        desc: &GpuTextureDescriptor<'_>,
    ) -> Result<GpuHandle, NativeError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(NativeError::Validation(format!(
                "texture '{}' has a zero extent",
                desc.label
            )));
        }
        let mut state = self.state();
        let handle = state.insert(GpuObject::Texture {
            sample_count: desc.sample_count,
            usage: desc.usage,
        });
        state.calls.push(GpuCall::CreateTexture {
            handle,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            sample_count: desc.sample_count,
        });
        Ok(handle)
    }

    fn create_texture_view(&mut self, texture: GpuHandle) -> Result<GpuHandle, NativeError> {
        let mut state = self.state();
        let sample_count = match state.objects.get(&texture) {
            Some(GpuObject::Texture { sample_count, .. }) => *sample_count,
            _ => return Err(NativeError::InvalidHandle(texture.0)),
        };
        let view = state.insert(GpuObject::TextureView { sample_count });
        state.calls.push(GpuCall::CreateTextureView { texture, view });
        Ok(view)
    }

    fn write_texture(
        &mut self,
        texture: GpuHandle,
        data: &[u8],
        _width: u32,
        _height: u32,
        _bytes_per_row: u32,
    ) -> Result<(), NativeError> {
        let mut state = self.state();
        match state.objects.get(&texture) {
            Some(GpuObject::Texture { usage, .. }) if usage.contains(TextureUsage::COPY_DST) => {}
            Some(GpuObject::Texture { .. }) => {
                return Err(NativeError::Validation(
                    "texture written without COPY_DST usage".to_string(),
                ))
            }
            _ => return Err(NativeError::InvalidHandle(texture.0)),
        }
        state.calls.push(GpuCall::WriteTexture {
            texture,
            len: data.len() as u64,
        });
        Ok(())
    }

    fn create_sampler(&mut self, _params: &SamplerParams) -> Result<GpuHandle, NativeError> {
        let mut state = self.state();
        let handle = state.insert(GpuObject::Sampler);
        state.calls.push(GpuCall::CreateSampler(handle));
        Ok(handle)
    }

    fn create_shader_module(
        &mut self,
        label: &str,
        source: &str,
    ) -> Result<GpuHandle, NativeError> {
        if source.contains(COMPILE_ERROR_MARKER) {
            return Err(NativeError::Compile(format!(
                "shader module '{label}': unexpected token '{COMPILE_ERROR_MARKER}'"
            )));
        }
        let mut state = self.state();
        let handle = state.insert(GpuObject::ShaderModule);
        state.calls.push(GpuCall::CreateShaderModule(handle));
        Ok(handle)
    }

    fn create_bind_group_layout(
        &mut self,
        _label: &str,
        _entries: &[BindGroupLayoutEntry],
    ) -> Result<GpuHandle, NativeError> {
        let mut state = self.state();
        let handle = state.insert(GpuObject::BindGroupLayout);
        state.calls.push(GpuCall::CreateBindGroupLayout(handle));
        Ok(handle)
    }

    fn create_render_pipeline(
        &mut self,
        desc: &GpuRenderPipelineDescriptor<'_>,
    ) -> Result<GpuHandle, NativeError> {
        let mut state = self.state();
        state.expect_kind(desc.module, |o| matches!(o, GpuObject::ShaderModule))?;
        let layouts = match &desc.layout {
            GpuLayout::Auto => AUTO_LAYOUT_GROUPS,
            GpuLayout::Explicit(layouts) => {
                for layout in layouts {
                    state.expect_kind(*layout, |o| matches!(o, GpuObject::BindGroupLayout))?;
                }
                layouts.len()
            }
        };
        let handle = state.insert(GpuObject::RenderPipeline {
            sample_count: desc.sample_count,
            layouts,
        });
        state.calls.push(GpuCall::CreateRenderPipeline {
            handle,
            sample_count: desc.sample_count,
        });
        Ok(handle)
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &GpuComputePipelineDescriptor<'_>,
    ) -> Result<GpuHandle, NativeError> {
        let mut state = self.state();
        state.expect_kind(desc.module, |o| matches!(o, GpuObject::ShaderModule))?;
        let layouts = match &desc.layout {
            GpuLayout::Auto => AUTO_LAYOUT_GROUPS,
            GpuLayout::Explicit(layouts) => {
                for layout in layouts {
                    state.expect_kind(*layout, |o| matches!(o, GpuObject::BindGroupLayout))?;
                }
                layouts.len()
            }
        };
        let handle = state.insert(GpuObject::ComputePipeline { layouts });
        state.calls.push(GpuCall::CreateComputePipeline(handle));
        Ok(handle)
    }

    fn pipeline_bind_group_layout(
        &mut self,
        pipeline: GpuHandle,
        index: u32,
    ) -> Result<GpuHandle, NativeError> {
        let mut state = self.state();
        let layouts = match state.objects.get(&pipeline) {
            Some(GpuObject::RenderPipeline { layouts, .. })
            | Some(GpuObject::ComputePipeline { layouts }) => *layouts,
            _ => return Err(NativeError::InvalidHandle(pipeline.0)),
        };
        if index as usize >= layouts {
            return Err(NativeError::Validation(format!(
                "pipeline has no bind group layout {index}"
            )));
        }
        // Like wgpu, every query hands out a new reference.
        Ok(state.insert(GpuObject::BindGroupLayout))
    }

    fn create_bind_group(
        &mut self,
        _label: &str,
        layout: GpuHandle,
        entries: &[(u32, GpuBinding)],
    ) -> Result<GpuHandle, NativeError> {
        let mut state = self.state();
        state.expect_kind(layout, |o| matches!(o, GpuObject::BindGroupLayout))?;
        for (_, binding) in entries {
            match binding {
                GpuBinding::Buffer { buffer, .. } => {
                    state.expect_kind(*buffer, |o| matches!(o, GpuObject::Buffer { .. }))?;
                }
                GpuBinding::TextureView(view) => {
                    state.expect_kind(*view, |o| matches!(o, GpuObject::TextureView { .. }))?;
                }
                GpuBinding::Sampler(sampler) => {
                    state.expect_kind(*sampler, |o| matches!(o, GpuObject::Sampler))?;
                }
            }
        }
        let handle = state.insert(GpuObject::BindGroup);
        state.calls.push(GpuCall::CreateBindGroup {
            handle,
            entries: entries.len(),
        });
        Ok(handle)
    }

    fn release(&mut self, handle: GpuHandle) {
        let mut state = self.state();
        if state.objects.remove(&handle).is_some() {
            state.calls.push(GpuCall::Release(handle));
        } else {
            log::warn!("HeadlessGpu: released unknown handle {}", handle.0);
        }
    }

    fn acquire_surface_view(&mut self) -> Result<GpuHandle, NativeError> {
        let mut state = self.state();
        let view = state.insert(GpuObject::SurfaceView);
        state.calls.push(GpuCall::AcquireSurfaceView(view));
        Ok(view)
    }

    fn submit_render_pass(&mut self, pass: &RenderPassRecord) -> Result<(), NativeError> {
        let mut state = self.state();
        let pipeline_samples = match state.objects.get(&pass.pipeline) {
            Some(GpuObject::RenderPipeline { sample_count, .. }) => *sample_count,
            _ => return Err(NativeError::InvalidHandle(pass.pipeline.0)),
        };
        let color_samples = state.view_samples(pass.color.view)?;
        if color_samples != pipeline_samples {
            return Err(NativeError::Validation(format!(
                "pipeline expects {pipeline_samples} samples, attachment has {color_samples}"
            )));
        }
        if let Some(resolve) = pass.color.resolve_target {
            if state.view_samples(resolve)? != 1 {
                return Err(NativeError::Validation(
                    "resolve target must be single-sampled".to_string(),
                ));
            }
        }
        if let Some(depth) = &pass.depth {
            state.view_samples(depth.view)?;
        }
        for (_, buffer) in &pass.vertex_buffers {
            state.expect_kind(*buffer, |o| matches!(o, GpuObject::Buffer { .. }))?;
        }
        for (_, group) in &pass.bind_groups {
            state.expect_kind(*group, |o| matches!(o, GpuObject::BindGroup))?;
        }
        if let Some((buffer, _)) = pass.index_buffer {
            state.expect_kind(buffer, |o| matches!(o, GpuObject::Buffer { .. }))?;
        }
        state.calls.push(GpuCall::SubmitRenderPass(pass.clone()));
        Ok(())
    }

    fn submit_compute_pass(&mut self, pass: &ComputePassRecord) -> Result<(), NativeError> {
        let mut state = self.state();
        state.expect_kind(pass.pipeline, |o| {
            matches!(o, GpuObject::ComputePipeline { .. })
        })?;
        for (_, group) in &pass.bind_groups {
            state.expect_kind(*group, |o| matches!(o, GpuObject::BindGroup))?;
        }
        state.calls.push(GpuCall::SubmitComputePass(pass.clone()));
        Ok(())
    }

    fn present(&mut self) {
        let mut state = self.state();
        state
            .objects
            .retain(|_, o| !matches!(o, GpuObject::SurfaceView));
        state.calls.push(GpuCall::Present);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> (HeadlessGpu, GpuLog) {
        let (canvas, log) = HeadlessCanvas::new();
        (
            HeadlessGpu {
                state: canvas.state,
            },
            log,
        )
    }

    #[test]
    fn buffers_read_back_what_was_written() {
        let (mut gpu, _log) = device();
        let buffer = gpu
            .create_buffer(&GpuBufferDescriptor {
                label: "b",
                size: 8,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                contents: Some(&[1, 2, 3, 4]),
            })
            .expect("buffer");
        gpu.write_buffer(buffer, 4, &[9, 9]).expect("write");
        assert_eq!(gpu.read_buffer(buffer), Some(vec![1, 2, 3, 4, 9, 9, 0, 0]));
        assert!(gpu.write_buffer(buffer, 7, &[1, 1]).is_err());
    }

    #[test]
    fn released_handles_are_rejected() {
        let (mut gpu, log) = device();
        let sampler = gpu.create_sampler(&SamplerParams::default()).expect("sampler");
        assert!(log.is_live(sampler));
        gpu.release(sampler);
        assert!(!log.is_live(sampler));
        assert_eq!(log.live_objects(), 0);
    }

    #[test]
    fn surface_views_end_with_the_frame() {
        let (mut gpu, log) = device();
        gpu.acquire_surface_view().expect("view");
        assert_eq!(log.live_objects(), 1);
        gpu.present();
        assert_eq!(log.live_objects(), 0);
    }

    #[test]
    fn broken_shaders_fail_module_creation() {
        let (mut gpu, _log) = device();
        let err = gpu
            .create_shader_module("m", "fn main() { #error }")
            .unwrap_err();
        assert!(matches!(err, NativeError::Compile(_)));
    }
}
