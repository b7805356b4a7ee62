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

//! Registries and bind-then-operate logic shared by both immediate-mode
//! renderers.

use prism_core::native::{
    Attachment, BufferTarget, Capability, ClearMask, FramebufferTarget, GlApi, UsageHint,
};
use prism_core::renderer::api::{
    check_extent, AttributePointer, BufferConfig, BufferInfo, BufferUsage, DrawCall,
    PipelineConfig, PrimitiveTopology, RenderStateChange, RenderTargetConfig, RenderTargetInfo,
    SamplerParams, TextureConfig, TextureFormat, TextureInfo, UniformValue,
};
use prism_core::renderer::frame::{
    ColorTarget, DrawPlan, PassPlan, DEPTH_CLEAR_VALUE, STENCIL_CLEAR_VALUE,
};
use prism_core::renderer::{Registry, RenderError, ResourceKind, ShaderStage, StateTracker};
use std::collections::HashMap;

/// A buffer object and its metadata.
#[derive(Debug)]
pub(crate) struct GlBuffer {
    pub handle: u32,
    pub target: BufferTarget,
    pub hint: UsageHint,
    pub info: BufferInfo,
}

/// A texture object and its metadata.
#[derive(Debug)]
pub(crate) struct GlTexture {
    pub handle: u32,
    pub info: TextureInfo,
}

/// A linked program with its lazily filled location caches.
#[derive(Debug)]
pub(crate) struct GlProgram {
    pub handle: u32,
    pub topology: PrimitiveTopology,
    attributes: HashMap<String, Option<u32>>,
    uniforms: HashMap<String, Option<u32>>,
}

/// Sampling parameters, plus a sampler object where the context has them.
#[derive(Debug)]
pub(crate) struct GlSampler {
    pub params: SamplerParams,
    pub object: Option<u32>,
}

/// Where a framebuffer's color lands.
#[derive(Debug, Clone, Copy)]
pub(crate) enum GlColorStorage {
    Texture(u32),
    Renderbuffer(u32),
}

/// An offscreen framebuffer.
#[derive(Debug)]
pub(crate) struct GlRenderTarget {
    pub framebuffer: u32,
    pub color: GlColorStorage,
    pub depth: Option<u32>,
    pub info: RenderTargetInfo,
}

/// The inputs the device bound for a draw.
#[derive(Debug)]
pub(crate) struct BoundDraw<'a> {
    pub topology: PrimitiveTopology,
    pub plan: DrawPlan<'a>,
    /// `(unit, sampler object)` pairs the profile must bind.
    pub sampler_objects: Vec<(u32, u32)>,
}

/// Native state common to both immediate-mode contexts.
pub struct GlDevice<A: ?Sized + GlApi> {
    pub(crate) gl: Box<A>,
    pub(crate) buffers: Registry<GlBuffer>,
    pub(crate) textures: Registry<GlTexture>,
    pub(crate) samplers: Registry<GlSampler>,
    pub(crate) programs: Registry<GlProgram>,
    pub(crate) render_targets: Registry<GlRenderTarget>,
    pub(crate) attribute_layouts: HashMap<String, Vec<AttributePointer>>,
    pub(crate) tracker: StateTracker,
    pub(crate) size: (u32, u32),
    pub(crate) depth_format: TextureFormat,
}

pub(crate) fn gen<T>(name: Option<T>, what: &str) -> Result<T, RenderError> {
    name.ok_or_else(|| RenderError::Backend(format!("the context returned no {what} object")))
}

fn toggle<A: ?Sized + GlApi>(gl: &mut A, cap: Capability, enabled: bool) {
    if enabled {
        gl.enable(cap)
    } else {
        gl.disable(cap)
    }
}

pub(crate) fn depth_attachment(format: TextureFormat) -> Attachment {
    if format.has_stencil() {
        Attachment::DepthStencil
    } else {
        Attachment::Depth
    }
}

impl<A: ?Sized + GlApi> GlDevice<A> {
    pub(crate) fn new(gl: Box<A>, size: (u32, u32), depth_format: TextureFormat) -> Self {
        Self {
            gl,
            buffers: Registry::new(ResourceKind::Buffer),
            textures: Registry::new(ResourceKind::Texture),
            samplers: Registry::new(ResourceKind::Sampler),
            programs: Registry::new(ResourceKind::Program),
            render_targets: Registry::new(ResourceKind::RenderTarget),
            attribute_layouts: HashMap::new(),
            tracker: StateTracker::new(),
            size,
            depth_format,
        }
    }

    // --- State ---

    /// Records a change and issues the native calls if it changed anything.
    pub(crate) fn apply_state(&mut self, change: RenderStateChange) -> bool {
        if !self.tracker.apply(change) {
            return false;
        }
        let gl = &mut *self.gl;
        match change {
            RenderStateChange::ClearColor(color) => gl.clear_color(color),
            RenderStateChange::DepthTest { enabled, func } => {
                toggle(gl, Capability::DepthTest, enabled);
                gl.depth_func(func);
            }
            RenderStateChange::Blend { enabled, state } => {
                toggle(gl, Capability::Blend, enabled);
                gl.blend_func_separate(
                    state.color.src_factor,
                    state.color.dst_factor,
                    state.alpha.src_factor,
                    state.alpha.dst_factor,
                );
                gl.blend_equation_separate(state.color.operation, state.alpha.operation);
            }
            RenderStateChange::CullFace { enabled, mode } => {
                toggle(gl, Capability::CullFace, enabled);
                gl.cull_face(mode);
            }
        }
        true
    }

    // --- Buffers ---

    pub(crate) fn create_buffer(
        &mut self,
        config: &BufferConfig<'_>,
    ) -> Result<BufferInfo, RenderError> {
        let size = config.validate()?;
        let target = if config.usage.contains(BufferUsage::INDEX) {
            BufferTarget::ElementArray
        } else {
            BufferTarget::Array
        };
        let hint = if config
            .usage
            .intersects(BufferUsage::DYNAMIC | BufferUsage::UNIFORM)
        {
            UsageHint::Dynamic
        } else {
            UsageHint::Static
        };

        let handle = gen(self.gl.create_buffer(), "buffer")?;
        self.gl.bind_buffer(target, Some(handle));
        match config.data {
            Some(data) if data.len() as u64 == size => self.gl.buffer_data(target, data, hint),
            Some(data) => {
                self.gl.buffer_data_size(target, size, hint);
                self.gl.buffer_sub_data(target, 0, data);
            }
            None => self.gl.buffer_data_size(target, size, hint),
        }
        self.gl.bind_buffer(target, None);

        let info = BufferInfo {
            name: config.name.to_string(),
            size,
            usage: config.usage,
            index_format: config.index_format,
        };
        self.buffers.insert(
            config.name,
            GlBuffer {
                handle,
                target,
                hint,
                info: info.clone(),
            },
        );
        log::debug!(
            "GlDevice: Created buffer '{}' ({size} bytes, name {handle}).",
            config.name
        );
        Ok(info)
    }

    /// Writes `data` at `offset`. A write at offset zero covering the whole
    /// buffer re-specifies the store, which may grow it.
    pub(crate) fn update_buffer(
        &mut self,
        name: &str,
        data: &[u8],
        offset: u64,
    ) -> Result<(), RenderError> {
        let buffer = self.buffers.get_mut(name)?;
        if data.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Buffer, "data"));
        }
        let len = data.len() as u64;
        let full_replace = offset == 0 && len >= buffer.info.size;
        let fits = offset.checked_add(len).is_some_and(|end| end <= buffer.info.size);
        if !full_replace && !fits {
            return Err(RenderError::BufferOverflow {
                name: name.to_string(),
                offset,
                len,
                capacity: buffer.info.size,
            });
        }

        self.gl.bind_buffer(buffer.target, Some(buffer.handle));
        if full_replace {
            self.gl.buffer_data(buffer.target, data, buffer.hint);
            buffer.info.size = len;
        } else {
            self.gl.buffer_sub_data(buffer.target, offset, data);
        }
        self.gl.bind_buffer(buffer.target, None);
        Ok(())
    }

    pub(crate) fn destroy_buffer(&mut self, name: &str) -> Result<(), RenderError> {
        let buffer = self.buffers.remove(name)?;
        self.gl.delete_buffer(buffer.handle);
        self.attribute_layouts.remove(name);
        log::debug!("GlDevice: Destroyed buffer '{name}'.");
        Ok(())
    }

    // --- Textures ---

    pub(crate) fn create_texture(
        &mut self,
        config: &TextureConfig<'_>,
    ) -> Result<TextureInfo, RenderError> {
        config.validate()?;
        let handle = gen(self.gl.create_texture(), "texture")?;
        self.gl.active_texture(0);
        self.gl.bind_texture(Some(handle));
        self.gl
            .tex_image_2d(config.width, config.height, config.format, config.data);
        self.gl.tex_parameters(&SamplerParams::default());
        self.gl.bind_texture(None);

        let info = TextureInfo {
            name: config.name.to_string(),
            width: config.width,
            height: config.height,
            format: config.format,
            usage: config.usage,
            handle: handle as u64,
        };
        self.textures.insert(
            config.name,
            GlTexture {
                handle,
                info: info.clone(),
            },
        );
        log::debug!(
            "GlDevice: Created texture '{}' ({}x{} {:?}).",
            config.name,
            config.width,
            config.height,
            config.format
        );
        Ok(info)
    }

    /// Writes a texture's full extent. Returns the new metadata and whether
    /// the texture was reallocated under a new name.
    pub(crate) fn update_texture(
        &mut self,
        name: &str,
        data: &[u8],
        size: Option<(u32, u32)>,
    ) -> Result<(TextureInfo, bool), RenderError> {
        let texture = self.textures.get_mut(name)?;
        let (width, height) = size.unwrap_or((texture.info.width, texture.info.height));
        check_extent(data, width, height, texture.info.format)?;
        let reallocate = (width, height) != (texture.info.width, texture.info.height);

        self.gl.active_texture(0);
        if reallocate {
            let handle = gen(self.gl.create_texture(), "texture")?;
            self.gl.delete_texture(texture.handle);
            texture.handle = handle;
            texture.info.handle = handle as u64;
            texture.info.width = width;
            texture.info.height = height;
            self.gl.bind_texture(Some(handle));
            self.gl
                .tex_image_2d(width, height, texture.info.format, Some(data));
            self.gl.tex_parameters(&SamplerParams::default());
            log::debug!("GlDevice: Reallocated texture '{name}' at {width}x{height}.");
        } else {
            self.gl.bind_texture(Some(texture.handle));
            self.gl
                .tex_sub_image_2d(width, height, texture.info.format, data);
        }
        self.gl.bind_texture(None);
        Ok((texture.info.clone(), reallocate))
    }

    pub(crate) fn destroy_texture(&mut self, name: &str) -> Result<(), RenderError> {
        let texture = self.textures.remove(name)?;
        self.gl.delete_texture(texture.handle);
        log::debug!("GlDevice: Destroyed texture '{name}'.");
        Ok(())
    }

    // --- Programs ---

    fn compile(&mut self, name: &str, stage: ShaderStage, source: &str) -> Result<u32, RenderError> {
        let shader = gen(self.gl.create_shader(stage), "shader")?;
        self.gl.shader_source(shader, source);
        self.gl.compile_shader(shader);
        if !self.gl.shader_compile_status(shader) {
            let log = self.gl.shader_info_log(shader);
            self.gl.delete_shader(shader);
            return Err(RenderError::CompileOrLinkFailed {
                name: name.to_string(),
                stage,
                log,
            });
        }
        Ok(shader)
    }

    /// Compiles both stages and links them. Shader objects never outlive this
    /// call.
    pub(crate) fn create_program(&mut self, config: &PipelineConfig<'_>) -> Result<(), RenderError> {
        config.validate()?;
        let vertex = self.compile(config.name, ShaderStage::Vertex, config.vertex_source)?;
        let fragment =
            match self.compile(config.name, ShaderStage::Fragment, config.fragment_source) {
                Ok(shader) => shader,
                Err(e) => {
                    self.gl.delete_shader(vertex);
                    return Err(e);
                }
            };
        let program = match self.gl.create_program() {
            Some(program) => program,
            None => {
                self.gl.delete_shader(vertex);
                self.gl.delete_shader(fragment);
                return gen(None, "program");
            }
        };
        self.gl.attach_shader(program, vertex);
        self.gl.attach_shader(program, fragment);
        self.gl.link_program(program);
        self.gl.delete_shader(vertex);
        self.gl.delete_shader(fragment);

        if !self.gl.program_link_status(program) {
            let log = self.gl.program_info_log(program);
            self.gl.delete_program(program);
            return Err(RenderError::CompileOrLinkFailed {
                name: config.name.to_string(),
                stage: ShaderStage::Link,
                log,
            });
        }

        // A replaced current program must be rebound by name.
        if self.tracker.pipeline() == Some(config.name) {
            self.tracker.clear_pipeline();
        }
        self.programs.insert(
            config.name,
            GlProgram {
                handle: program,
                topology: config.topology,
                attributes: HashMap::new(),
                uniforms: HashMap::new(),
            },
        );
        log::debug!("GlDevice: Linked program '{}' (name {program}).", config.name);
        Ok(())
    }

    /// Makes a program current. Returns `false` when it already was, in
    /// which case nothing reaches the context.
    pub(crate) fn use_program(&mut self, name: &str) -> Result<bool, RenderError> {
        let handle = self.programs.get(name)?.handle;
        if !self.tracker.bind_pipeline(name) {
            log::trace!("GlDevice: Program '{name}' already current.");
            return Ok(false);
        }
        self.gl.use_program(Some(handle));
        Ok(true)
    }

    pub(crate) fn destroy_program(&mut self, name: &str) -> Result<(), RenderError> {
        let program = self.programs.remove(name)?;
        self.gl.delete_program(program.handle);
        log::debug!("GlDevice: Destroyed program '{name}'.");
        Ok(())
    }

    /// The name of the current program, which must still be registered.
    pub(crate) fn current_program(&self) -> Result<&str, RenderError> {
        let name = self.tracker.pipeline().ok_or(RenderError::NoProgramSet)?;
        self.programs.get(name)?;
        Ok(name)
    }

    /// Sets a uniform on the current program. Unknown uniforms are skipped
    /// with a warning and return `false`.
    pub(crate) fn set_uniform(
        &mut self,
        uniform: &str,
        value: &UniformValue,
    ) -> Result<bool, RenderError> {
        let name = self.tracker.pipeline().ok_or(RenderError::NoProgramSet)?;
        let program = self.programs.get_mut(name)?;
        let location = match program.uniforms.get(uniform) {
            Some(location) => *location,
            None => {
                let location = self.gl.uniform_location(program.handle, uniform);
                program.uniforms.insert(uniform.to_string(), location);
                location
            }
        };
        match location {
            Some(location) => {
                self.gl.uniform(location, value);
                Ok(true)
            }
            None => {
                log::warn!("GlDevice: Program '{name}' has no active uniform '{uniform}'.");
                Ok(false)
            }
        }
    }

    /// Enables and points every attribute the program knows. Returns how many
    /// were applied.
    fn apply_attributes(&mut self, program_name: &str, pointers: &[AttributePointer]) -> usize {
        let Some(program) = self.programs.find_mut(program_name) else {
            return 0;
        };
        let mut applied = 0;
        for pointer in pointers {
            let location = match program.attributes.get(&pointer.name) {
                Some(location) => *location,
                None => {
                    let location = self.gl.attrib_location(program.handle, &pointer.name);
                    program.attributes.insert(pointer.name.clone(), location);
                    location
                }
            };
            match location {
                Some(index) => {
                    self.gl.enable_vertex_attrib_array(index);
                    self.gl.vertex_attrib_pointer(index, pointer);
                    applied += 1;
                }
                None => log::warn!(
                    "GlDevice: Program '{program_name}' has no active attribute '{}'.",
                    pointer.name
                ),
            }
        }
        applied
    }

    /// Describes how a buffer's vertices map onto the current program's
    /// attributes. The layout is kept and reapplied whenever a draw lists
    /// the buffer.
    pub(crate) fn setup_vertex_attributes(
        &mut self,
        buffer: &str,
        pointers: &[AttributePointer],
    ) -> Result<usize, RenderError> {
        let program = self.current_program()?.to_string();
        let handle = self.buffers.get(buffer)?.handle;
        self.gl.bind_buffer(BufferTarget::Array, Some(handle));
        let applied = self.apply_attributes(&program, pointers);
        self.attribute_layouts
            .insert(buffer.to_string(), pointers.to_vec());
        Ok(applied)
    }

    /// Binds one buffer and points the attributes of the current program at
    /// it, for recording into a vertex array.
    pub(crate) fn bind_vertex_source(
        &mut self,
        buffer: &str,
        pointers: &[AttributePointer],
    ) -> Result<usize, RenderError> {
        let program = self.current_program()?.to_string();
        let handle = self.buffers.get(buffer)?.handle;
        self.gl.bind_buffer(BufferTarget::Array, Some(handle));
        Ok(self.apply_attributes(&program, pointers))
    }

    // --- Samplers ---

    pub(crate) fn insert_sampler(&mut self, name: &str, params: SamplerParams, object: Option<u32>) {
        self.samplers.insert(name, GlSampler { params, object });
        log::debug!("GlDevice: Created sampler '{name}'.");
    }

    // --- Render targets ---

    /// Creates a single-sampled framebuffer with a texture color attachment.
    pub(crate) fn create_render_target(
        &mut self,
        config: &RenderTargetConfig<'_>,
    ) -> Result<RenderTargetInfo, RenderError> {
        config.validate()?;
        if config.sample_count != 1 {
            return Err(RenderError::invalid(
                ResourceKind::RenderTarget,
                "sample_count",
            ));
        }
        let framebuffer = gen(self.gl.create_framebuffer(), "framebuffer")?;
        self.gl
            .bind_framebuffer(FramebufferTarget::Framebuffer, Some(framebuffer));

        let color = gen(self.gl.create_texture(), "texture")?;
        self.gl.bind_texture(Some(color));
        self.gl
            .tex_image_2d(config.width, config.height, config.format, None);
        self.gl.tex_parameters(&SamplerParams::default());
        self.gl.bind_texture(None);
        self.gl.framebuffer_texture_2d(Attachment::Color0, color);

        let depth = if config.depth {
            let renderbuffer = gen(self.gl.create_renderbuffer(), "renderbuffer")?;
            self.gl.bind_renderbuffer(Some(renderbuffer));
            self.gl
                .renderbuffer_storage(self.depth_format, config.width, config.height);
            self.gl.bind_renderbuffer(None);
            self.gl
                .framebuffer_renderbuffer(depth_attachment(self.depth_format), renderbuffer);
            Some(renderbuffer)
        } else {
            None
        };

        let target = GlRenderTarget {
            framebuffer,
            color: GlColorStorage::Texture(color),
            depth,
            info: RenderTargetInfo {
                name: config.name.to_string(),
                width: config.width,
                height: config.height,
                format: config.format,
                sample_count: 1,
                has_depth: config.depth,
            },
        };
        self.finish_render_target(target)
    }

    /// Checks completeness and registers the target, releasing it on failure.
    pub(crate) fn finish_render_target(
        &mut self,
        target: GlRenderTarget,
    ) -> Result<RenderTargetInfo, RenderError> {
        let complete = self.gl.check_framebuffer_status();
        self.gl.bind_framebuffer(FramebufferTarget::Framebuffer, None);
        if !complete {
            self.release_render_target(&target);
            return Err(RenderError::FramebufferIncomplete(target.info.name));
        }
        let info = target.info.clone();
        log::debug!(
            "GlDevice: Created render target '{}' ({}x{}, {} samples).",
            info.name,
            info.width,
            info.height,
            info.sample_count
        );
        self.render_targets.insert(&info.name, target);
        Ok(info)
    }

    fn release_render_target(&mut self, target: &GlRenderTarget) {
        self.gl.delete_framebuffer(target.framebuffer);
        match target.color {
            GlColorStorage::Texture(texture) => self.gl.delete_texture(texture),
            GlColorStorage::Renderbuffer(renderbuffer) => self.gl.delete_renderbuffer(renderbuffer),
        }
        if let Some(depth) = target.depth {
            self.gl.delete_renderbuffer(depth);
        }
    }

    pub(crate) fn destroy_render_target(&mut self, name: &str) -> Result<(), RenderError> {
        let target = self.render_targets.remove(name)?;
        self.release_render_target(&target);
        log::debug!("GlDevice: Destroyed render target '{name}'.");
        Ok(())
    }

    /// Metadata of the selected render target if it is still registered.
    pub(crate) fn current_target_info(&self) -> Option<RenderTargetInfo> {
        let name = self.tracker.render_target()?;
        let target = self.render_targets.find(name);
        if target.is_none() {
            log::warn!("GlDevice: Render target '{name}' is gone; drawing to the surface.");
        }
        target.map(|t| t.info.clone())
    }

    // --- Frames ---

    /// Binds the pass's framebuffer, sets the viewport and clears.
    pub(crate) fn begin_pass(&mut self, plan: &PassPlan<'_>, msaa_framebuffer: Option<u32>) {
        let (framebuffer, (width, height)) = match plan.color {
            ColorTarget::RenderTarget(info) => (
                self.render_targets
                    .find(&info.name)
                    .map(|t| t.framebuffer),
                (info.width, info.height),
            ),
            ColorTarget::MultisampledSurface => (msaa_framebuffer, self.size),
            ColorTarget::Surface => (None, self.size),
        };
        self.gl
            .bind_framebuffer(FramebufferTarget::Framebuffer, framebuffer);
        self.gl.viewport(0, 0, width, height);

        let mut mask = ClearMask::COLOR;
        if plan.depth {
            self.gl.clear_depth(DEPTH_CLEAR_VALUE);
            self.gl.clear_stencil(STENCIL_CLEAR_VALUE);
            mask |= ClearMask::DEPTH | ClearMask::STENCIL;
        }
        self.gl.clear(mask);
    }

    /// Binds vertex buffers with their layouts, textures and the index buffer
    /// for `draw`. Unknown names are skipped with a warning.
    pub(crate) fn bind_draw<'a>(&mut self, draw: &DrawCall<'a>) -> Result<BoundDraw<'a>, RenderError> {
        let program_name = self.current_program()?.to_string();
        let topology = self.programs.get(&program_name)?.topology;

        for &(_, name) in &draw.vertex_buffers {
            let Some(handle) = self.buffers.find(name).map(|b| b.handle) else {
                log::warn!("GlDevice: Skipping unknown vertex buffer '{name}'.");
                continue;
            };
            self.gl.bind_buffer(BufferTarget::Array, Some(handle));
            match self.attribute_layouts.get(name).cloned() {
                Some(layout) => {
                    self.apply_attributes(&program_name, &layout);
                }
                None => log::warn!("GlDevice: Vertex buffer '{name}' has no attribute layout."),
            }
        }

        let mut sampler_objects = Vec::new();
        for binding in &draw.textures {
            let Some(handle) = self.textures.find(binding.texture).map(|t| t.handle) else {
                log::warn!("GlDevice: Skipping unknown texture '{}'.", binding.texture);
                continue;
            };
            self.gl.active_texture(binding.unit);
            self.gl.bind_texture(Some(handle));
            if let Some(sampler) = binding.sampler {
                match self.samplers.find(sampler) {
                    Some(GlSampler {
                        object: Some(object),
                        ..
                    }) => sampler_objects.push((binding.unit, *object)),
                    Some(GlSampler { params, .. }) => {
                        let params = *params;
                        self.gl.tex_parameters(&params);
                    }
                    None => log::warn!("GlDevice: Skipping unknown sampler '{sampler}'."),
                }
            }
            if let Some(uniform) = binding.uniform {
                self.set_uniform(uniform, &UniformValue::Int(binding.unit as i32))?;
            }
        }

        let index_info = draw
            .index_buffer
            .and_then(|name| self.buffers.find(name))
            .map(|b| b.info.clone());
        if let (Some(name), None) = (draw.index_buffer, &index_info) {
            log::warn!("GlDevice: Index buffer '{name}' is unknown; drawing non-indexed.");
        }
        let plan = DrawPlan::resolve(draw, index_info.as_ref());
        if let DrawPlan::Indexed { buffer, .. } = plan {
            if let Some(handle) = self.buffers.find(buffer).map(|b| b.handle) {
                self.gl.bind_buffer(BufferTarget::ElementArray, Some(handle));
            }
        }

        Ok(BoundDraw {
            topology,
            plan,
            sampler_objects,
        })
    }

    // --- Teardown ---

    /// Deletes every registered object and forgets the bound state.
    pub(crate) fn release_all(&mut self) {
        self.gl.use_program(None);
        self.gl.bind_framebuffer(FramebufferTarget::Framebuffer, None);
        for (_, buffer) in self.buffers.drain() {
            self.gl.delete_buffer(buffer.handle);
        }
        for (_, texture) in self.textures.drain() {
            self.gl.delete_texture(texture.handle);
        }
        // Sampler objects belong to the profile and are gone by now.
        self.samplers.drain().for_each(drop);
        for (_, program) in self.programs.drain() {
            self.gl.delete_program(program.handle);
        }
        let targets: Vec<GlRenderTarget> = self.render_targets.drain().map(|(_, t)| t).collect();
        for target in &targets {
            self.release_render_target(target);
        }
        self.attribute_layouts.clear();
        self.tracker.reset();
    }
}
