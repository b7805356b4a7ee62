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

//! Registries and native object bookkeeping for the encoder-based renderer.

use prism_core::native::{
    ComputePassRecord, GpuApi, GpuBinding, GpuBufferDescriptor, GpuColorAttachment,
    GpuComputePipelineDescriptor, GpuDepthAttachment, GpuDepthState, GpuDraw, GpuHandle,
    GpuLayout, GpuRenderPipelineDescriptor, GpuTextureDescriptor, NativeError, RenderPassRecord,
};
use prism_core::renderer::api::{
    check_extent, BindGroupConfig, BindGroupLayoutConfig, BindGroupLayoutSource,
    BindingResource, BufferConfig, BufferInfo, BufferUsage, ComputeDispatch,
    ComputePipelineConfig, DrawCall, PipelineConfig, PipelineLayout, RenderTargetConfig,
    RenderTargetInfo, SamplerConfig, SamplerParams, TextureConfig, TextureFormat, TextureInfo,
    TextureUsage,
};
use prism_core::renderer::frame::{
    ColorTarget, DrawPlan, PassPlan, DEPTH_CLEAR_VALUE, STENCIL_CLEAR_VALUE,
};
use prism_core::renderer::{
    Registry, RenderError, ResourceKind, ShaderStage, StateTracker, MSAA_SAMPLE_COUNT,
};
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct GpuBuffer {
    pub handle: GpuHandle,
    pub info: BufferInfo,
}

#[derive(Debug)]
pub(crate) struct GpuTexture {
    pub texture: GpuHandle,
    pub view: GpuHandle,
    pub info: TextureInfo,
}

/// A render pipeline and the pass state baked into it.
#[derive(Debug)]
pub(crate) struct GpuPipeline {
    pub handle: GpuHandle,
    pub sample_count: u32,
    pub depth: bool,
    pub color_format: TextureFormat,
}

#[derive(Debug)]
pub(crate) struct GpuBindGroup {
    pub handle: GpuHandle,
    /// A layout queried from a pipeline, released with the group.
    pub owned_layout: Option<GpuHandle>,
}

/// A texture together with its default view.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GpuAttachment {
    pub texture: GpuHandle,
    pub view: GpuHandle,
}

#[derive(Debug)]
pub(crate) struct GpuRenderTarget {
    pub color: GpuAttachment,
    pub depth: Option<GpuAttachment>,
    pub info: RenderTargetInfo,
}

/// The surface-sized depth attachment, allocated on first use.
#[derive(Debug)]
struct DepthBuffer {
    attachment: GpuAttachment,
    size: (u32, u32),
    sample_count: u32,
}

/// Native state of an initialized encoder-based renderer.
pub struct GpuDevice {
    pub(crate) api: Box<dyn GpuApi>,
    pub(crate) buffers: Registry<GpuBuffer>,
    pub(crate) textures: Registry<GpuTexture>,
    pub(crate) samplers: Registry<GpuHandle>,
    pub(crate) pipelines: Registry<GpuPipeline>,
    pub(crate) compute_pipelines: Registry<GpuHandle>,
    pub(crate) bind_groups: Registry<GpuBindGroup>,
    pub(crate) bind_group_layouts: Registry<GpuHandle>,
    pub(crate) render_targets: Registry<GpuRenderTarget>,
    /// Compiled modules keyed by their exact source text.
    shader_modules: HashMap<String, GpuHandle>,
    depth: Option<DepthBuffer>,
    msaa: Option<GpuAttachment>,
    pub(crate) tracker: StateTracker,
    pub(crate) size: (u32, u32),
    depth_format: TextureFormat,
}

fn backend(error: NativeError) -> RenderError {
    RenderError::Backend(error.to_string())
}

impl GpuDevice {
    pub(crate) fn new(api: Box<dyn GpuApi>, size: (u32, u32), depth_format: TextureFormat) -> Self {
        Self {
            api,
            buffers: Registry::new(ResourceKind::Buffer),
            textures: Registry::new(ResourceKind::Texture),
            samplers: Registry::new(ResourceKind::Sampler),
            pipelines: Registry::new(ResourceKind::Pipeline),
            compute_pipelines: Registry::new(ResourceKind::Pipeline),
            bind_groups: Registry::new(ResourceKind::BindGroup),
            bind_group_layouts: Registry::new(ResourceKind::BindGroupLayout),
            render_targets: Registry::new(ResourceKind::RenderTarget),
            shader_modules: HashMap::new(),
            depth: None,
            msaa: None,
            tracker: StateTracker::new(),
            size,
            depth_format,
        }
    }

    pub(crate) fn shader_module_count(&self) -> usize {
        self.shader_modules.len()
    }

    pub(crate) fn has_msaa_target(&self) -> bool {
        self.msaa.is_some()
    }

    pub(crate) fn has_depth_buffer(&self) -> bool {
        self.depth.is_some()
    }

    fn release_attachment(&mut self, attachment: GpuAttachment) {
        self.api.release(attachment.view);
        self.api.release(attachment.texture);
    }

    fn create_attachment(
        &mut self,
        label: &str,
        (width, height): (u32, u32),
        format: TextureFormat,
        usage: TextureUsage,
        sample_count: u32,
    ) -> Result<GpuAttachment, RenderError> {
        let texture = self
            .api
            .create_texture(&GpuTextureDescriptor {
                label,
                width,
                height,
                format,
                usage,
                sample_count,
            })
            .map_err(backend)?;
        match self.api.create_texture_view(texture) {
            Ok(view) => Ok(GpuAttachment { texture, view }),
            Err(error) => {
                self.api.release(texture);
                Err(backend(error))
            }
        }
    }

    // --- Buffers ---

    pub(crate) fn create_buffer(
        &mut self,
        config: &BufferConfig<'_>,
    ) -> Result<BufferInfo, RenderError> {
        let size = config.validate()?;
        // Queue writes need COPY_DST whatever the caller asked for.
        let handle = self
            .api
            .create_buffer(&GpuBufferDescriptor {
                label: config.name,
                size,
                usage: config.usage | BufferUsage::COPY_DST,
                contents: config.data,
            })
            .map_err(backend)?;
        let info = BufferInfo {
            name: config.name.to_string(),
            size,
            usage: config.usage,
            index_format: config.index_format,
        };
        self.buffers.insert(
            config.name,
            GpuBuffer {
                handle,
                info: info.clone(),
            },
        );
        log::debug!(
            "GpuDevice: Created buffer '{}' ({size} bytes, handle {}).",
            config.name,
            handle.0
        );
        Ok(info)
    }

    /// Writes `data` at `offset` through the queue. A full replacement larger
    /// than the buffer recreates it with the new content mapped at creation.
    pub(crate) fn update_buffer(
        &mut self,
        name: &str,
        data: &[u8],
        offset: u64,
    ) -> Result<(), RenderError> {
        let buffer = self.buffers.get(name)?;
        if data.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Buffer, "data"));
        }
        let len = data.len() as u64;
        let (handle, capacity, usage) = (buffer.handle, buffer.info.size, buffer.info.usage);
        let full_replace = offset == 0 && len >= capacity;
        let fits = offset.checked_add(len).is_some_and(|end| end <= capacity);
        if !full_replace && !fits {
            return Err(RenderError::BufferOverflow {
                name: name.to_string(),
                offset,
                len,
                capacity,
            });
        }

        if len > capacity {
            let grown = self
                .api
                .create_buffer(&GpuBufferDescriptor {
                    label: name,
                    size: len,
                    usage: usage | BufferUsage::COPY_DST,
                    contents: Some(data),
                })
                .map_err(backend)?;
            self.api.release(handle);
            if let Some(buffer) = self.buffers.find_mut(name) {
                buffer.handle = grown;
                buffer.info.size = len;
            }
            log::debug!("GpuDevice: Recreated buffer '{name}' at {len} bytes.");
        } else {
            self.api.write_buffer(handle, offset, data).map_err(backend)?;
        }
        Ok(())
    }

    pub(crate) fn read_buffer(&mut self, name: &str) -> Result<Vec<u8>, RenderError> {
        let handle = self.buffers.get(name)?.handle;
        self.api
            .read_buffer(handle)
            .ok_or_else(|| {
                RenderError::Backend(format!("the device cannot read back buffer '{name}'"))
            })
    }

    pub(crate) fn destroy_buffer(&mut self, name: &str) -> Result<(), RenderError> {
        let buffer = self.buffers.remove(name)?;
        self.api.release(buffer.handle);
        log::debug!("GpuDevice: Destroyed buffer '{name}'.");
        Ok(())
    }

    // --- Textures and samplers ---

    pub(crate) fn create_texture(
        &mut self,
        config: &TextureConfig<'_>,
    ) -> Result<TextureInfo, RenderError> {
        config.validate()?;
        let attachment = self.create_attachment(
            config.name,
            (config.width, config.height),
            config.format,
            config.usage | TextureUsage::COPY_DST,
            1,
        )?;
        if let Some(data) = config.data {
            let written = self.api.write_texture(
                attachment.texture,
                data,
                config.width,
                config.height,
                config.width * config.format.bytes_per_pixel(),
            );
            if let Err(error) = written {
                self.release_attachment(attachment);
                return Err(backend(error));
            }
        }
        let info = TextureInfo {
            name: config.name.to_string(),
            width: config.width,
            height: config.height,
            format: config.format,
            usage: config.usage,
            handle: attachment.texture.0,
        };
        self.textures.insert(
            config.name,
            GpuTexture {
                texture: attachment.texture,
                view: attachment.view,
                info: info.clone(),
            },
        );
        log::debug!(
            "GpuDevice: Created texture '{}' ({}x{} {:?}).",
            config.name,
            config.width,
            config.height,
            config.format
        );
        Ok(info)
    }

    /// Writes a texture's full extent, first recreating it when the size
    /// changes. Returns the new metadata and whether it was recreated.
    pub(crate) fn update_texture(
        &mut self,
        name: &str,
        data: &[u8],
        size: Option<(u32, u32)>,
    ) -> Result<(TextureInfo, bool), RenderError> {
        let texture = self.textures.get(name)?;
        let current = GpuAttachment {
            texture: texture.texture,
            view: texture.view,
        };
        let info = texture.info.clone();
        let (width, height) = size.unwrap_or((info.width, info.height));
        check_extent(data, width, height, info.format)?;
        let reallocate = (width, height) != (info.width, info.height);

        let target = if reallocate {
            let fresh = self.create_attachment(
                name,
                (width, height),
                info.format,
                info.usage | TextureUsage::COPY_DST,
                1,
            )?;
            self.release_attachment(current);
            if let Some(texture) = self.textures.find_mut(name) {
                texture.texture = fresh.texture;
                texture.view = fresh.view;
                texture.info.width = width;
                texture.info.height = height;
                texture.info.handle = fresh.texture.0;
            }
            log::debug!("GpuDevice: Recreated texture '{name}' at {width}x{height}.");
            fresh.texture
        } else {
            current.texture
        };
        self.api
            .write_texture(
                target,
                data,
                width,
                height,
                width * info.format.bytes_per_pixel(),
            )
            .map_err(backend)?;
        let info = self.textures.get(name)?.info.clone();
        Ok((info, reallocate))
    }

    pub(crate) fn destroy_texture(&mut self, name: &str) -> Result<(), RenderError> {
        let texture = self.textures.remove(name)?;
        self.release_attachment(GpuAttachment {
            texture: texture.texture,
            view: texture.view,
        });
        log::debug!("GpuDevice: Destroyed texture '{name}'.");
        Ok(())
    }

    pub(crate) fn create_sampler(&mut self, config: &SamplerConfig<'_>) -> Result<(), RenderError> {
        config.validate()?;
        let handle = self
            .api
            .create_sampler(&SamplerParams::from(config))
            .map_err(backend)?;
        self.samplers.insert(config.name, handle);
        Ok(())
    }

    pub(crate) fn destroy_sampler(&mut self, name: &str) -> Result<(), RenderError> {
        let handle = self.samplers.remove(name)?;
        self.api.release(handle);
        Ok(())
    }

    // --- Pipelines ---

    /// Returns the cached module for `key`, compiling `source` on a miss.
    fn shader_module(
        &mut self,
        name: &str,
        stage: ShaderStage,
        key: String,
        source: &str,
    ) -> Result<GpuHandle, RenderError> {
        if let Some(module) = self.shader_modules.get(&key) {
            log::trace!("GpuDevice: Reusing shader module for '{name}'.");
            return Ok(*module);
        }
        let module = self
            .api
            .create_shader_module(name, source)
            .map_err(|error| match error {
                NativeError::Compile(log) => RenderError::CompileOrLinkFailed {
                    name: name.to_string(),
                    stage,
                    log,
                },
                other => backend(other),
            })?;
        self.shader_modules.insert(key, module);
        Ok(module)
    }

    fn layout(&self, layout: &PipelineLayout<'_>) -> Result<GpuLayout, RenderError> {
        match layout {
            PipelineLayout::Auto => Ok(GpuLayout::Auto),
            PipelineLayout::Explicit(names) => names
                .iter()
                .map(|name| self.bind_group_layouts.get(name).copied())
                .collect::<Result<_, _>>()
                .map(GpuLayout::Explicit),
        }
    }

    /// Creates a render pipeline from `config` and the tracked blend, cull
    /// and depth state.
    pub(crate) fn create_pipeline(&mut self, config: &PipelineConfig<'_>) -> Result<(), RenderError> {
        config.validate()?;
        // A single source holding both entry points is compiled once.
        let source = if config.vertex_source == config.fragment_source {
            config.vertex_source.to_string()
        } else {
            format!("{}\n{}", config.vertex_source, config.fragment_source)
        };
        let module =
            self.shader_module(config.name, ShaderStage::Vertex, config.module_key(), &source)?;
        let layout = self.layout(&config.layout)?;

        let state = *self.tracker.state();
        let sample_count = config.sample_count.unwrap_or(state.sample_count());
        let depth = state.depth_test.then_some(GpuDepthState {
            format: self.depth_format,
            compare: state.depth_func,
        });
        let color_format = config.color_format.unwrap_or(self.api.surface_format());
        let handle = self
            .api
            .create_render_pipeline(&GpuRenderPipelineDescriptor {
                label: config.name,
                module,
                vertex_entry: config.vertex_entry,
                fragment_entry: config.fragment_entry,
                vertex_layouts: config.vertex_layouts,
                topology: config.topology,
                color_format,
                blend: state.blend.then_some(state.blend_state),
                cull_mode: state.cull_face.then_some(state.cull_mode),
                depth,
                sample_count,
                layout,
            })
            .map_err(backend)?;

        self.pipelines.insert(
            config.name,
            GpuPipeline {
                handle,
                sample_count,
                depth: depth.is_some(),
                color_format,
            },
        );
        log::debug!(
            "GpuDevice: Created pipeline '{}' ({sample_count} samples, handle {}).",
            config.name,
            handle.0
        );
        Ok(())
    }

    pub(crate) fn create_compute_pipeline(
        &mut self,
        config: &ComputePipelineConfig<'_>,
    ) -> Result<(), RenderError> {
        config.validate()?;
        let module = self.shader_module(
            config.name,
            ShaderStage::Compute,
            config.source.to_string(),
            config.source,
        )?;
        let layout = self.layout(&config.layout)?;
        let handle = self
            .api
            .create_compute_pipeline(&GpuComputePipelineDescriptor {
                label: config.name,
                module,
                entry_point: config.entry_point,
                layout,
            })
            .map_err(backend)?;
        self.compute_pipelines.insert(config.name, handle);
        log::debug!("GpuDevice: Created compute pipeline '{}'.", config.name);
        Ok(())
    }

    /// Destroys a render or compute pipeline. Cached shader modules stay.
    pub(crate) fn destroy_pipeline(&mut self, name: &str) -> Result<(), RenderError> {
        let handle = match self.pipelines.remove(name) {
            Ok(pipeline) => pipeline.handle,
            Err(error) => self.compute_pipelines.remove(name).map_err(|_| error)?,
        };
        self.api.release(handle);
        if self.tracker.pipeline() == Some(name) {
            self.tracker.clear_pipeline();
        }
        log::debug!("GpuDevice: Destroyed pipeline '{name}'.");
        Ok(())
    }

    // --- Bind groups ---

    pub(crate) fn create_bind_group_layout(
        &mut self,
        config: &BindGroupLayoutConfig<'_>,
    ) -> Result<(), RenderError> {
        if config.name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::BindGroupLayout, "name"));
        }
        if config.entries.is_empty() {
            return Err(RenderError::invalid(ResourceKind::BindGroupLayout, "entries"));
        }
        let handle = self
            .api
            .create_bind_group_layout(config.name, config.entries)
            .map_err(backend)?;
        self.bind_group_layouts.insert(config.name, handle);
        Ok(())
    }

    pub(crate) fn destroy_bind_group_layout(&mut self, name: &str) -> Result<(), RenderError> {
        let handle = self.bind_group_layouts.remove(name)?;
        self.api.release(handle);
        Ok(())
    }

    fn binding(&self, resource: &BindingResource<'_>) -> Result<GpuBinding, RenderError> {
        Ok(match *resource {
            BindingResource::Buffer { name, offset, size } => GpuBinding::Buffer {
                buffer: self.buffers.get(name)?.handle,
                offset,
                size,
            },
            BindingResource::Texture(name) => GpuBinding::TextureView(self.textures.get(name)?.view),
            BindingResource::Sampler(name) => GpuBinding::Sampler(*self.samplers.get(name)?),
        })
    }

    pub(crate) fn create_bind_group(
        &mut self,
        config: &BindGroupConfig<'_>,
    ) -> Result<usize, RenderError> {
        config.validate()?;
        let entries = config
            .entries
            .iter()
            .map(|entry| Ok((entry.binding, self.binding(&entry.resource)?)))
            .collect::<Result<Vec<_>, RenderError>>()?;
        let (layout, owned_layout) = match config.layout {
            BindGroupLayoutSource::Pipeline { pipeline, index } => {
                let handle = match self.pipelines.find(pipeline) {
                    Some(p) => p.handle,
                    None => *self.compute_pipelines.get(pipeline)?,
                };
                let layout = self
                    .api
                    .pipeline_bind_group_layout(handle, index)
                    .map_err(backend)?;
                (layout, Some(layout))
            }
            BindGroupLayoutSource::Named(name) => (*self.bind_group_layouts.get(name)?, None),
        };

        let handle = match self.api.create_bind_group(config.name, layout, &entries) {
            Ok(handle) => handle,
            Err(error) => {
                if let Some(layout) = owned_layout {
                    self.api.release(layout);
                }
                return Err(backend(error));
            }
        };
        self.bind_groups.insert(
            config.name,
            GpuBindGroup {
                handle,
                owned_layout,
            },
        );
        log::debug!(
            "GpuDevice: Created bind group '{}' ({} entries).",
            config.name,
            entries.len()
        );
        Ok(entries.len())
    }

    pub(crate) fn destroy_bind_group(&mut self, name: &str) -> Result<(), RenderError> {
        let group = self.bind_groups.remove(name)?;
        self.api.release(group.handle);
        if let Some(layout) = group.owned_layout {
            self.api.release(layout);
        }
        Ok(())
    }

    // --- Render targets ---

    pub(crate) fn create_render_target(
        &mut self,
        config: &RenderTargetConfig<'_>,
    ) -> Result<RenderTargetInfo, RenderError> {
        config.validate()?;
        let size = (config.width, config.height);
        // Multisampled textures cannot be sampled directly.
        let usage = if config.sample_count > 1 {
            TextureUsage::RENDER_ATTACHMENT
        } else {
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING
        };
        let color =
            self.create_attachment(config.name, size, config.format, usage, config.sample_count)?;
        let depth = if config.depth {
            let format = self.depth_format;
            match self.create_attachment(
                config.name,
                size,
                format,
                TextureUsage::RENDER_ATTACHMENT,
                config.sample_count,
            ) {
                Ok(depth) => Some(depth),
                Err(error) => {
                    self.release_attachment(color);
                    return Err(error);
                }
            }
        } else {
            None
        };
        let info = RenderTargetInfo {
            name: config.name.to_string(),
            width: config.width,
            height: config.height,
            format: config.format,
            sample_count: config.sample_count,
            has_depth: config.depth,
        };
        self.render_targets.insert(
            config.name,
            GpuRenderTarget {
                color,
                depth,
                info: info.clone(),
            },
        );
        Ok(info)
    }

    fn release_render_target(&mut self, target: GpuRenderTarget) {
        self.release_attachment(target.color);
        if let Some(depth) = target.depth {
            self.release_attachment(depth);
        }
    }

    pub(crate) fn destroy_render_target(&mut self, name: &str) -> Result<(), RenderError> {
        let target = self.render_targets.remove(name)?;
        self.release_render_target(target);
        if self.tracker.render_target() == Some(name) {
            self.tracker.set_render_target(None);
        }
        Ok(())
    }

    // --- Surface attachments ---

    /// Allocates or releases the offscreen multisample color target.
    pub(crate) fn set_msaa(&mut self, enabled: bool) -> Result<(), RenderError> {
        if enabled {
            if self.msaa.is_none() {
                self.allocate_msaa()?;
            }
        } else if let Some(msaa) = self.msaa.take() {
            self.release_attachment(msaa);
            log::debug!("GpuDevice: Released the multisample target.");
        }
        self.tracker.set_msaa(enabled);
        Ok(())
    }

    fn allocate_msaa(&mut self) -> Result<(), RenderError> {
        let format = self.api.surface_format();
        let msaa = self.create_attachment(
            "msaa",
            self.size,
            format,
            TextureUsage::RENDER_ATTACHMENT,
            MSAA_SAMPLE_COUNT,
        )?;
        self.msaa = Some(msaa);
        log::debug!(
            "GpuDevice: Allocated a {}x{} multisample target.",
            self.size.0,
            self.size.1
        );
        Ok(())
    }

    /// Reconfigures the surface and recreates the surface-sized attachments
    /// that exist.
    pub(crate) fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.size = (width, height);
        self.api.configure_surface(width, height);
        if let Some(msaa) = self.msaa.take() {
            self.release_attachment(msaa);
            self.allocate_msaa()?;
        }
        if let Some(depth) = self.depth.take() {
            self.release_attachment(depth.attachment);
            self.depth_buffer(depth.sample_count)?;
        }
        Ok(())
    }

    /// Returns the surface depth view, allocating it when missing or when its
    /// size or sample count no longer match.
    fn depth_buffer(&mut self, sample_count: u32) -> Result<GpuHandle, RenderError> {
        match &self.depth {
            Some(depth) if depth.size == self.size && depth.sample_count == sample_count => {
                return Ok(depth.attachment.view)
            }
            _ => {}
        }
        if let Some(stale) = self.depth.take() {
            self.release_attachment(stale.attachment);
        }
        let attachment = self.create_attachment(
            "depth",
            self.size,
            self.depth_format,
            TextureUsage::RENDER_ATTACHMENT,
            sample_count,
        )?;
        self.depth = Some(DepthBuffer {
            attachment,
            size: self.size,
            sample_count,
        });
        log::debug!("GpuDevice: Allocated the depth attachment ({sample_count} samples).");
        Ok(attachment.view)
    }

    // --- Frames ---

    /// Records the selected pipeline's pass from the tracked state and
    /// submits it. Returns the resolved draw.
    pub(crate) fn render<'a>(&mut self, draw: &DrawCall<'a>) -> Result<DrawPlan<'a>, RenderError> {
        let name = self.tracker.pipeline().ok_or(RenderError::NoPipelineSet)?;
        let pipeline = self.pipelines.get(name)?;
        let (pipeline_name, pipeline_handle) = (name.to_string(), pipeline.handle);
        let (pipeline_samples, pipeline_depth, pipeline_format) =
            (pipeline.sample_count, pipeline.depth, pipeline.color_format);

        let target = self.tracker.render_target().and_then(|name| {
            let target = self.render_targets.find(name);
            if target.is_none() {
                log::warn!("GpuDevice: Render target '{name}' is gone; drawing to the surface.");
            }
            target.map(|t| t.info.clone())
        });
        let plan = PassPlan::resolve(&self.tracker, target.as_ref());
        if plan.sample_count != pipeline_samples {
            return Err(RenderError::SampleCountMismatch {
                pipeline: pipeline_name,
                expected: pipeline_samples,
                actual: plan.sample_count,
            });
        }
        if plan.depth != pipeline_depth {
            return Err(RenderError::DepthStateMismatch {
                pipeline: pipeline_name,
                expected: pipeline_depth,
                actual: plan.depth,
            });
        }
        let pass_format = match plan.color {
            ColorTarget::RenderTarget(info) => info.format,
            ColorTarget::MultisampledSurface | ColorTarget::Surface => self.api.surface_format(),
        };
        if pass_format != pipeline_format {
            return Err(RenderError::ColorFormatMismatch {
                pipeline: pipeline_name,
                expected: pipeline_format,
                actual: pass_format,
            });
        }

        let mut surface_view = None;
        let (view, resolve_target, depth_view) = match plan.color {
            ColorTarget::RenderTarget(info) => {
                let target = self.render_targets.get(&info.name)?;
                let depth = if plan.depth {
                    target.depth.map(|d| d.view)
                } else {
                    None
                };
                (target.color.view, None, depth)
            }
            ColorTarget::MultisampledSurface => {
                if self.msaa.is_none() {
                    self.allocate_msaa()?;
                }
                let msaa = self.msaa.map(|m| m.view);
                let depth = if plan.depth {
                    Some(self.depth_buffer(plan.sample_count)?)
                } else {
                    None
                };
                let surface = self.api.acquire_surface_view().map_err(backend)?;
                surface_view = Some(surface);
                (msaa.unwrap_or(surface), Some(surface), depth)
            }
            ColorTarget::Surface => {
                let depth = if plan.depth {
                    Some(self.depth_buffer(1)?)
                } else {
                    None
                };
                let surface = self.api.acquire_surface_view().map_err(backend)?;
                surface_view = Some(surface);
                (surface, None, depth)
            }
        };

        let mut vertex_buffers = Vec::new();
        for &(slot, name) in &draw.vertex_buffers {
            match self.buffers.find(name) {
                Some(buffer) => vertex_buffers.push((slot, buffer.handle)),
                None => log::warn!("GpuDevice: Skipping unknown vertex buffer '{name}'."),
            }
        }
        let mut bind_groups = Vec::new();
        for &(index, name) in &draw.bind_groups {
            match self.bind_groups.find(name) {
                Some(group) => bind_groups.push((index, group.handle)),
                None => log::warn!("GpuDevice: Skipping unknown bind group '{name}'."),
            }
        }
        let index_info = draw
            .index_buffer
            .and_then(|name| self.buffers.find(name))
            .map(|b| b.info.clone());
        if let (Some(name), None) = (draw.index_buffer, &index_info) {
            log::warn!("GpuDevice: Index buffer '{name}' is unknown; drawing non-indexed.");
        }
        let draw_plan = DrawPlan::resolve(draw, index_info.as_ref());
        let (index_buffer, native_draw) = match draw_plan {
            DrawPlan::Indexed {
                buffer,
                format,
                count,
                instances,
            } => (
                self.buffers.find(buffer).map(|b| (b.handle, format)),
                Some(GpuDraw::Indexed { count, instances }),
            ),
            DrawPlan::NonIndexed { count, instances } => {
                (None, Some(GpuDraw::NonIndexed { count, instances }))
            }
            DrawPlan::Nothing => (None, None),
        };

        let [r, g, b, a] = plan.clear_color;
        let record = RenderPassRecord {
            color: GpuColorAttachment {
                view,
                resolve_target,
                clear: [r as f64, g as f64, b as f64, a as f64],
            },
            depth: depth_view.map(|view| GpuDepthAttachment {
                view,
                depth_clear: DEPTH_CLEAR_VALUE,
                stencil_clear: self
                    .depth_format
                    .has_stencil()
                    .then_some(STENCIL_CLEAR_VALUE),
            }),
            pipeline: pipeline_handle,
            vertex_buffers,
            bind_groups,
            index_buffer,
            draw: native_draw,
        };
        match self.api.submit_render_pass(&record) {
            Ok(()) => {
                if surface_view.is_some() {
                    self.api.present();
                }
                Ok(draw_plan)
            }
            Err(error) => {
                if let Some(view) = surface_view {
                    self.api.release(view);
                }
                Err(backend(error))
            }
        }
    }

    pub(crate) fn dispatch_compute(
        &mut self,
        name: &str,
        dispatch: &ComputeDispatch<'_>,
    ) -> Result<[u32; 3], RenderError> {
        let pipeline = *self.compute_pipelines.get(name)?;
        let mut bind_groups = Vec::new();
        for &(index, group) in &dispatch.bind_groups {
            match self.bind_groups.find(group) {
                Some(g) => bind_groups.push((index, g.handle)),
                None => log::warn!("GpuDevice: Skipping unknown bind group '{group}'."),
            }
        }
        let workgroups = [dispatch.x, dispatch.y, dispatch.z];
        self.api
            .submit_compute_pass(&ComputePassRecord {
                pipeline,
                bind_groups,
                workgroups,
            })
            .map_err(backend)?;
        Ok(workgroups)
    }

    // --- Teardown ---

    /// Releases every registered object, the cached modules and the surface
    /// attachments, and forgets the bound state.
    pub(crate) fn release_all(&mut self) {
        let mut handles = Vec::new();
        for (_, group) in self.bind_groups.drain() {
            handles.push(group.handle);
            handles.extend(group.owned_layout);
        }
        handles.extend(self.pipelines.drain().map(|(_, p)| p.handle));
        handles.extend(self.compute_pipelines.drain().map(|(_, p)| p));
        handles.extend(self.bind_group_layouts.drain().map(|(_, l)| l));
        handles.extend(self.shader_modules.drain().map(|(_, m)| m));
        handles.extend(self.buffers.drain().map(|(_, b)| b.handle));
        for (_, texture) in self.textures.drain() {
            handles.push(texture.view);
            handles.push(texture.texture);
        }
        handles.extend(self.samplers.drain().map(|(_, s)| s));
        for handle in handles {
            self.api.release(handle);
        }

        let targets: Vec<_> = self.render_targets.drain().map(|(_, t)| t).collect();
        for target in targets {
            self.release_render_target(target);
        }
        if let Some(msaa) = self.msaa.take() {
            self.release_attachment(msaa);
        }
        if let Some(depth) = self.depth.take() {
            self.release_attachment(depth.attachment);
        }
        self.tracker.reset();
    }
}
