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

//! A recording implementation of the immediate-mode native contract.

use prism_core::native::{
    Attachment, BufferTarget, Capability, ClearMask, FramebufferTarget, Gl2Api, GlApi, GlVersion,
    UsageHint,
};
use prism_core::renderer::api::{
    AttributePointer, BlendFactor, BlendOperation, CompareFunction, CullMode, IndexFormat,
    PrimitiveTopology, SamplerParams, TextureFormat, UniformValue,
};
use prism_core::renderer::ShaderStage;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shader sources containing this marker fail to compile.
pub const COMPILE_ERROR_MARKER: &str = "#error";
/// Programs with a shader containing this marker fail to link.
pub const LINK_ERROR_MARKER: &str = "#link_error";

/// One recorded native call.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum GlCall {
    ClearColor([f32; 4]),
    ClearDepth(f32),
    ClearStencil(u32),
    Clear(ClearMask),
    Enable(Capability),
    Disable(Capability),
    DepthFunc(CompareFunction),
    BlendFuncSeparate([BlendFactor; 4]),
    BlendEquationSeparate(BlendOperation, BlendOperation),
    CullFace(CullMode),
    Viewport(i32, i32, u32, u32),
    CreateBuffer(u32),
    BindBuffer(BufferTarget, Option<u32>),
    BufferData {
        target: BufferTarget,
        len: u64,
        hint: UsageHint,
    },
    BufferSubData {
        target: BufferTarget,
        offset: u64,
        len: u64,
    },
    DeleteBuffer(u32),
    CreateTexture(u32),
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    TexImage2D {
        width: u32,
        height: u32,
        format: TextureFormat,
        with_data: bool,
    },
    TexSubImage2D {
        width: u32,
        height: u32,
    },
    TexParameters(SamplerParams),
    DeleteTexture(u32),
    CreateShader(u32, ShaderStage),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    LinkProgram(u32),
    UseProgram(Option<u32>),
    DeleteProgram(u32),
    Uniform(u32, UniformValue),
    EnableVertexAttribArray(u32),
    VertexAttribPointer(u32, AttributePointer),
    CreateFramebuffer(u32),
    BindFramebuffer(FramebufferTarget, Option<u32>),
    FramebufferTexture2D(Attachment, u32),
    FramebufferRenderbuffer(Attachment, u32),
    DeleteFramebuffer(u32),
    CreateRenderbuffer(u32),
    BindRenderbuffer(Option<u32>),
    RenderbufferStorage {
        format: TextureFormat,
        width: u32,
        height: u32,
        samples: u32,
    },
    DeleteRenderbuffer(u32),
    DrawArrays {
        topology: PrimitiveTopology,
        first: u32,
        count: u32,
        instances: u32,
    },
    DrawElements {
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        offset: u64,
        instances: u32,
    },
    Flush,
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),
    BlitFramebuffer {
        width: u32,
        height: u32,
        mask: ClearMask,
    },
    CreateSampler(u32),
    SamplerParameters(u32, SamplerParams),
    BindSampler(u32, Option<u32>),
    DeleteSampler(u32),
}

#[derive(Debug, Default)]
struct Program {
    shaders: Vec<u32>,
    attributes: Vec<String>,
    linked: bool,
}

#[derive(Debug, Default)]
struct GlState {
    calls: Vec<GlCall>,
    next_name: u32,
    live: BTreeSet<u32>,
    array_buffer: Option<u32>,
    element_buffer: Option<u32>,
    buffers: HashMap<u32, Vec<u8>>,
    shader_sources: HashMap<u32, String>,
    compiled: HashMap<u32, bool>,
    programs: HashMap<u32, Program>,
    incomplete_framebuffers: bool,
}

impl GlState {
    fn gen_name(&mut self) -> u32 {
        self.next_name += 1;
        self.live.insert(self.next_name);
        self.next_name
    }

    fn release(&mut self, name: u32) {
        self.live.remove(&name);
        self.buffers.remove(&name);
    }

    fn bound(&self, target: BufferTarget) -> Option<u32> {
        match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        }
    }

    fn program_source(&self, program: u32) -> String {
        self.programs
            .get(&program)
            .map(|p| {
                p.shaders
                    .iter()
                    .filter_map(|s| self.shader_sources.get(s).map(String::as_str))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

/// An in-memory GL context.
///
/// It implements both [`GlApi`] and [`Gl2Api`]; the surface decides which
/// contract it is handed out as. Object names come from a single counter
/// starting at 1, so a name identifies one native object across all kinds.
#[derive(Debug, Clone)]
pub struct HeadlessGl {
    version: GlVersion,
    state: Arc<Mutex<GlState>>,
}

/// A read handle onto a [`HeadlessGl`]'s recorded state.
#[derive(Debug, Clone)]
pub struct GlLog {
    state: Arc<Mutex<GlState>>,
}

impl HeadlessGl {
    /// Creates a context and the log that observes it.
    pub fn new(version: GlVersion) -> (Self, GlLog) {
        let state = Arc::new(Mutex::new(GlState::default()));
        let log = GlLog {
            state: Arc::clone(&state),
        };
        (Self { version, state }, log)
    }

    fn state(&self) -> MutexGuard<'_, GlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: GlCall) {
        self.state().calls.push(call);
    }
}

impl GlLog {
    fn state(&self) -> MutexGuard<'_, GlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<GlCall> {
        self.state().calls.clone()
    }

    /// Counts the recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&GlCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Forgets the recorded calls, keeping object state.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// The current content of a buffer object.
    pub fn buffer_contents(&self, buffer: u32) -> Option<Vec<u8>> {
        self.state().buffers.get(&buffer).cloned()
    }

    /// Number of native objects created and not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.state().live.len()
    }

    /// Makes every later framebuffer completeness check fail.
    pub fn fail_framebuffers(&self, fail: bool) {
        self.state().incomplete_framebuffers = fail;
    }
}

impl GlApi for HeadlessGl {
    fn version(&self) -> GlVersion {
        self.version
    }

    fn describe(&self) -> String {
        match self.version {
            GlVersion::Gl1 => "Headless GL ES 2.0".to_string(),
            GlVersion::Gl2 => "Headless GL ES 3.0".to_string(),
        }
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        self.record(GlCall::ClearColor(color));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.record(GlCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, stencil: u32) {
        self.record(GlCall::ClearStencil(stencil));
    }

    fn clear(&mut self, mask: ClearMask) {
        self.record(GlCall::Clear(mask));
    }

    fn enable(&mut self, cap: Capability) {
        self.record(GlCall::Enable(cap));
    }

    fn disable(&mut self, cap: Capability) {
        self.record(GlCall::Disable(cap));
    }

    fn depth_func(&mut self, func: CompareFunction) {
        self.record(GlCall::DepthFunc(func));
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.record(GlCall::BlendFuncSeparate([
            src_rgb, dst_rgb, src_alpha, dst_alpha,
        ]));
    }

    fn blend_equation_separate(&mut self, rgb: BlendOperation, alpha: BlendOperation) {
        self.record(GlCall::BlendEquationSeparate(rgb, alpha));
    }

    fn cull_face(&mut self, mode: CullMode) {
        self.record(GlCall::CullFace(mode));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.record(GlCall::Viewport(x, y, width, height));
    }

    fn create_buffer(&mut self) -> Option<u32> {
        let mut state = self.state();
        let name = state.gen_name();
        state.buffers.insert(name, Vec::new());
        state.calls.push(GlCall::CreateBuffer(name));
        Some(name)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<u32>) {
        let mut state = self.state();
        match target {
            BufferTarget::Array => state.array_buffer = buffer,
            BufferTarget::ElementArray => state.element_buffer = buffer,
        }
        state.calls.push(GlCall::BindBuffer(target, buffer));
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], hint: UsageHint) {
        let mut state = self.state();
        if let Some(name) = state.bound(target) {
            state.buffers.insert(name, data.to_vec());
        }
        state.calls.push(GlCall::BufferData {
            target,
            len: data.len() as u64,
            hint,
        });
    }

    fn buffer_data_size(&mut self, target: BufferTarget, size: u64, hint: UsageHint) {
        let mut state = self.state();
        if let Some(name) = state.bound(target) {
            state.buffers.insert(name, vec![0; size as usize]);
        }
        state.calls.push(GlCall::BufferData {
            target,
            len: size,
            hint,
        });
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]) {
        let mut state = self.state();
        if let Some(name) = state.bound(target) {
            if let Some(contents) = state.buffers.get_mut(&name) {
                let start = offset as usize;
                let end = start + data.len();
                if end <= contents.len() {
                    contents[start..end].copy_from_slice(data);
                } else {
                    log::error!("HeadlessGl: sub-data write past the end of buffer {name}");
                }
            }
        }
        state.calls.push(GlCall::BufferSubData {
            target,
            offset,
            len: data.len() as u64,
        });
    }

    fn delete_buffer(&mut self, buffer: u32) {
        let mut state = self.state();
        state.release(buffer);
        state.calls.push(GlCall::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self) -> Option<u32> {
        let mut state = self.state();
        let name = state.gen_name();
        state.calls.push(GlCall::CreateTexture(name));
        Some(name)
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, texture: Option<u32>) {
        self.record(GlCall::BindTexture(texture));
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, format: TextureFormat, data: Option<&[u8]>) {
        self.record(GlCall::TexImage2D {
            width,
            height,
            format,
            with_data: data.is_some(),
        });
    }

    fn tex_sub_image_2d(&mut self, width: u32, height: u32, _format: TextureFormat, _data: &[u8]) {
        self.record(GlCall::TexSubImage2D { width, height });
    }

    fn tex_parameters(&mut self, params: &SamplerParams) {
        self.record(GlCall::TexParameters(*params));
    }

    fn delete_texture(&mut self, texture: u32) {
        let mut state = self.state();
        state.release(texture);
        state.calls.push(GlCall::DeleteTexture(texture));
    }

    fn create_shader(&mut self, stage: ShaderStage) -> Option<u32> {
        let mut state = self.state();
        let name = state.gen_name();
        state.calls.push(GlCall::CreateShader(name, stage));
        Some(name)
    }

    fn shader_source(&mut self, shader: u32, source: &str) {
        self.state()
            .shader_sources
            .insert(shader, source.to_string());
    }

    fn compile_shader(&mut self, shader: u32) {
        let mut state = self.state();
        let ok = state
            .shader_sources
            .get(&shader)
            .is_some_and(|s| !s.contains(COMPILE_ERROR_MARKER));
        state.compiled.insert(shader, ok);
        state.calls.push(GlCall::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state().compiled.get(&shader).copied().unwrap_or(false)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        if self.shader_compile_status(shader) {
            String::new()
        } else {
            format!("ERROR: 0:1: '{COMPILE_ERROR_MARKER}' : compilation terminated")
        }
    }

    fn delete_shader(&mut self, shader: u32) {
        let mut state = self.state();
        state.release(shader);
        state.calls.push(GlCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> Option<u32> {
        let mut state = self.state();
        let name = state.gen_name();
        state.programs.insert(name, Program::default());
        state.calls.push(GlCall::CreateProgram(name));
        Some(name)
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        if let Some(p) = self.state().programs.get_mut(&program) {
            p.shaders.push(shader);
        }
    }

    fn link_program(&mut self, program: u32) {
        let mut state = self.state();
        let source = state.program_source(program);
        let compiled = state.programs.get(&program).is_some_and(|p| {
            p.shaders
                .iter()
                .all(|s| state.compiled.get(s).copied().unwrap_or(false))
        });
        if let Some(p) = state.programs.get_mut(&program) {
            p.linked = compiled && !source.contains(LINK_ERROR_MARKER);
        }
        state.calls.push(GlCall::LinkProgram(program));
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state().programs.get(&program).is_some_and(|p| p.linked)
    }

    fn program_info_log(&self, program: u32) -> String {
        if self.program_link_status(program) {
            String::new()
        } else {
            "error: linking failed".to_string()
        }
    }

    fn use_program(&mut self, program: Option<u32>) {
        self.record(GlCall::UseProgram(program));
    }

    fn delete_program(&mut self, program: u32) {
        let mut state = self.state();
        state.programs.remove(&program);
        state.release(program);
        state.calls.push(GlCall::DeleteProgram(program));
    }

    // Attributes get consecutive locations in lookup order, if the program's
    // sources mention them.
    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        let mut state = self.state();
        if !state.program_source(program).contains(name) {
            return None;
        }
        let p = state.programs.get_mut(&program)?;
        let index = match p.attributes.iter().position(|a| a == name) {
            Some(index) => index,
            None => {
                p.attributes.push(name.to_string());
                p.attributes.len() - 1
            }
        };
        Some(index as u32)
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        let state = self.state();
        let source = state.program_source(program);
        source.find(name).map(|offset| program * 1000 + offset as u32)
    }

    fn uniform(&mut self, location: u32, value: &UniformValue) {
        self.record(GlCall::Uniform(location, *value));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(&mut self, index: u32, pointer: &AttributePointer) {
        self.record(GlCall::VertexAttribPointer(index, pointer.clone()));
    }

    fn create_framebuffer(&mut self) -> Option<u32> {
        let mut state = self.state();
        let name = state.gen_name();
        state.calls.push(GlCall::CreateFramebuffer(name));
        Some(name)
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<u32>) {
        self.record(GlCall::BindFramebuffer(target, framebuffer));
    }

    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: u32) {
        self.record(GlCall::FramebufferTexture2D(attachment, texture));
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, renderbuffer: u32) {
        self.record(GlCall::FramebufferRenderbuffer(attachment, renderbuffer));
    }

    fn check_framebuffer_status(&self) -> bool {
        !self.state().incomplete_framebuffers
    }

    fn delete_framebuffer(&mut self, framebuffer: u32) {
        let mut state = self.state();
        state.release(framebuffer);
        state.calls.push(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn create_renderbuffer(&mut self) -> Option<u32> {
        let mut state = self.state();
        let name = state.gen_name();
        state.calls.push(GlCall::CreateRenderbuffer(name));
        Some(name)
    }

    fn bind_renderbuffer(&mut self, renderbuffer: Option<u32>) {
        self.record(GlCall::BindRenderbuffer(renderbuffer));
    }

    fn renderbuffer_storage(&mut self, format: TextureFormat, width: u32, height: u32) {
        self.record(GlCall::RenderbufferStorage {
            format,
            width,
            height,
            samples: 1,
        });
    }

    fn delete_renderbuffer(&mut self, renderbuffer: u32) {
        let mut state = self.state();
        state.release(renderbuffer);
        state.calls.push(GlCall::DeleteRenderbuffer(renderbuffer));
    }

    fn draw_arrays(&mut self, topology: PrimitiveTopology, first: u32, count: u32) {
        self.record(GlCall::DrawArrays {
            topology,
            first,
            count,
            instances: 1,
        });
    }

    fn draw_elements(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        offset: u64,
    ) {
        self.record(GlCall::DrawElements {
            topology,
            count,
            format,
            offset,
            instances: 1,
        });
    }

    fn flush(&mut self) {
        self.record(GlCall::Flush);
    }
}

impl Gl2Api for HeadlessGl {
    fn create_vertex_array(&mut self) -> Option<u32> {
        let mut state = self.state();
        let name = state.gen_name();
        state.calls.push(GlCall::CreateVertexArray(name));
        Some(name)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<u32>) {
        self.record(GlCall::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: u32) {
        let mut state = self.state();
        state.release(vertex_array);
        state.calls.push(GlCall::DeleteVertexArray(vertex_array));
    }

    fn draw_arrays_instanced(
        &mut self,
        topology: PrimitiveTopology,
        first: u32,
        count: u32,
        instances: u32,
    ) {
        self.record(GlCall::DrawArrays {
            topology,
            first,
            count,
            instances,
        });
    }

    fn draw_elements_instanced(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        offset: u64,
        instances: u32,
    ) {
        self.record(GlCall::DrawElements {
            topology,
            count,
            format,
            offset,
            instances,
        });
    }

    fn renderbuffer_storage_multisample(
        &mut self,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) {
        self.record(GlCall::RenderbufferStorage {
            format,
            width,
            height,
            samples,
        });
    }

    fn blit_framebuffer(&mut self, width: u32, height: u32, mask: ClearMask) {
        self.record(GlCall::BlitFramebuffer {
            width,
            height,
            mask,
        });
    }

    fn create_sampler(&mut self) -> Option<u32> {
        let mut state = self.state();
        let name = state.gen_name();
        state.calls.push(GlCall::CreateSampler(name));
        Some(name)
    }

    fn sampler_parameters(&mut self, sampler: u32, params: &SamplerParams) {
        self.record(GlCall::SamplerParameters(sampler, *params));
    }

    fn bind_sampler(&mut self, unit: u32, sampler: Option<u32>) {
        self.record(GlCall::BindSampler(unit, sampler));
    }

    fn delete_sampler(&mut self, sampler: u32) {
        let mut state = self.state();
        state.release(sampler);
        state.calls.push(GlCall::DeleteSampler(sampler));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_writes_land_in_the_bound_buffer() {
        let (mut gl, log) = HeadlessGl::new(GlVersion::Gl1);
        let buffer = gl.create_buffer().expect("buffer");
        gl.bind_buffer(BufferTarget::Array, Some(buffer));
        gl.buffer_data_size(BufferTarget::Array, 4, UsageHint::Static);
        gl.buffer_sub_data(BufferTarget::Array, 1, &[7, 8]);
        assert_eq!(log.buffer_contents(buffer), Some(vec![0, 7, 8, 0]));
    }

    #[test]
    fn compile_marker_fails_compilation() {
        let (mut gl, _log) = HeadlessGl::new(GlVersion::Gl1);
        let shader = gl.create_shader(ShaderStage::Vertex).expect("shader");
        gl.shader_source(shader, "void main() { #error }");
        gl.compile_shader(shader);
        assert!(!gl.shader_compile_status(shader));
        assert!(gl.shader_info_log(shader).contains("#error"));
    }

    #[test]
    fn attribute_locations_follow_lookup_order() {
        let (mut gl, _log) = HeadlessGl::new(GlVersion::Gl1);
        let shader = gl.create_shader(ShaderStage::Vertex).expect("shader");
        gl.shader_source(shader, "attribute vec2 a_position; attribute vec2 a_uv;");
        let program = gl.create_program().expect("program");
        gl.attach_shader(program, shader);
        assert_eq!(gl.attrib_location(program, "a_uv"), Some(0));
        assert_eq!(gl.attrib_location(program, "a_position"), Some(1));
        assert_eq!(gl.attrib_location(program, "a_uv"), Some(0));
        assert_eq!(gl.attrib_location(program, "a_normal"), None);
    }

    #[test]
    fn deleting_objects_releases_them() {
        let (mut gl, log) = HeadlessGl::new(GlVersion::Gl2);
        let texture = gl.create_texture().expect("texture");
        let vao = gl.create_vertex_array().expect("vao");
        assert_eq!(log.live_objects(), 2);
        gl.delete_texture(texture);
        gl.delete_vertex_array(vao);
        assert_eq!(log.live_objects(), 0);
    }
}
