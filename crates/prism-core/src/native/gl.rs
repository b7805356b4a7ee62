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

//! The immediate-mode native contract, modeled on the GL ES 2 / GL ES 3 call set.
//!
//! Object names are plain `u32`s; `0` is never a valid name, and `None` in a
//! bind call unbinds. Every call acts on the context's global binding state.

use crate::renderer::api::{
    AttributePointer, BlendFactor, BlendOperation, CompareFunction, CullMode, IndexFormat,
    PrimitiveTopology, SamplerParams, TextureFormat, UniformValue,
};
use crate::renderer::ShaderStage;
use bitflags::bitflags;

/// The API level a context reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlVersion {
    /// GL ES 2 level.
    Gl1,
    /// GL ES 3 level.
    Gl2,
}

/// A buffer binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// The usage hint passed to `buffer_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum UsageHint {
    Static,
    Dynamic,
}

/// A server-side capability toggled with `enable`/`disable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Capability {
    DepthTest,
    Blend,
    CullFace,
}

/// A framebuffer binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// Both read and draw.
    Framebuffer,
    /// Read only (extended contexts).
    Read,
    /// Draw only (extended contexts).
    Draw,
}

/// A framebuffer attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Attachment {
    Color0,
    Depth,
    DepthStencil,
}

bitflags! {
    /// The buffers affected by `clear` and `blit_framebuffer`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        /// The color buffer.
        const COLOR = 1 << 0;
        /// The depth buffer.
        const DEPTH = 1 << 1;
        /// The stencil buffer.
        const STENCIL = 1 << 2;
    }
}

/// An immediate-mode graphics context.
pub trait GlApi {
    /// The API level of this context.
    fn version(&self) -> GlVersion;
    /// Vendor, renderer and version strings.
    fn describe(&self) -> String;

    // --- Fixed-function state ---

    /// Sets the clear color.
    fn clear_color(&mut self, color: [f32; 4]);
    /// Sets the depth clear value.
    fn clear_depth(&mut self, depth: f32);
    /// Sets the stencil clear value.
    fn clear_stencil(&mut self, stencil: u32);
    /// Clears the buffers of the bound framebuffer.
    fn clear(&mut self, mask: ClearMask);
    /// Enables a capability.
    fn enable(&mut self, cap: Capability);
    /// Disables a capability.
    fn disable(&mut self, cap: Capability);
    /// Sets the depth comparison.
    fn depth_func(&mut self, func: CompareFunction);
    /// Sets separate color and alpha blend factors.
    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );
    /// Sets separate color and alpha blend equations.
    fn blend_equation_separate(&mut self, rgb: BlendOperation, alpha: BlendOperation);
    /// Sets the culled face.
    fn cull_face(&mut self, mode: CullMode);
    /// Sets the viewport.
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    // --- Buffers ---

    /// Creates a buffer name.
    fn create_buffer(&mut self) -> Option<u32>;
    /// Binds a buffer to a target.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<u32>);
    /// Reallocates the bound buffer's store with `data`.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], hint: UsageHint);
    /// Reallocates the bound buffer's store with `size` zeroed bytes.
    fn buffer_data_size(&mut self, target: BufferTarget, size: u64, hint: UsageHint);
    /// Writes into the bound buffer's existing store.
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]);
    /// Deletes a buffer.
    fn delete_buffer(&mut self, buffer: u32);

    // --- Textures ---

    /// Creates a texture name.
    fn create_texture(&mut self) -> Option<u32>;
    /// Selects the active texture unit.
    fn active_texture(&mut self, unit: u32);
    /// Binds a 2D texture to the active unit.
    fn bind_texture(&mut self, texture: Option<u32>);
    /// Allocates storage for the bound texture, optionally with content.
    fn tex_image_2d(&mut self, width: u32, height: u32, format: TextureFormat, data: Option<&[u8]>);
    /// Writes the full extent of the bound texture's existing storage.
    fn tex_sub_image_2d(&mut self, width: u32, height: u32, format: TextureFormat, data: &[u8]);
    /// Sets filtering and wrapping on the bound texture.
    fn tex_parameters(&mut self, params: &SamplerParams);
    /// Deletes a texture.
    fn delete_texture(&mut self, texture: u32);

    // --- Shaders and programs ---

    /// Creates a shader object for a stage.
    fn create_shader(&mut self, stage: ShaderStage) -> Option<u32>;
    /// Replaces a shader's source.
    fn shader_source(&mut self, shader: u32, source: &str);
    /// Compiles a shader.
    fn compile_shader(&mut self, shader: u32);
    /// Returns whether the last compile succeeded.
    fn shader_compile_status(&self, shader: u32) -> bool;
    /// Returns the compiler log.
    fn shader_info_log(&self, shader: u32) -> String;
    /// Deletes a shader.
    fn delete_shader(&mut self, shader: u32);
    /// Creates a program object.
    fn create_program(&mut self) -> Option<u32>;
    /// Attaches a shader to a program.
    fn attach_shader(&mut self, program: u32, shader: u32);
    /// Links a program.
    fn link_program(&mut self, program: u32);
    /// Returns whether the last link succeeded.
    fn program_link_status(&self, program: u32) -> bool;
    /// Returns the linker log.
    fn program_info_log(&self, program: u32) -> String;
    /// Makes a program current.
    fn use_program(&mut self, program: Option<u32>);
    /// Deletes a program.
    fn delete_program(&mut self, program: u32);
    /// Looks up an active attribute.
    fn attrib_location(&self, program: u32, name: &str) -> Option<u32>;
    /// Looks up an active uniform.
    fn uniform_location(&self, program: u32, name: &str) -> Option<u32>;
    /// Uploads a uniform of the current program.
    fn uniform(&mut self, location: u32, value: &UniformValue);

    // --- Vertex attributes ---

    /// Enables a generic vertex attribute array.
    fn enable_vertex_attrib_array(&mut self, index: u32);
    /// Points an attribute at the buffer bound to `BufferTarget::Array`.
    fn vertex_attrib_pointer(&mut self, index: u32, pointer: &AttributePointer);

    // --- Framebuffers ---

    /// Creates a framebuffer name.
    fn create_framebuffer(&mut self) -> Option<u32>;
    /// Binds a framebuffer; `None` binds the default framebuffer.
    fn bind_framebuffer(&mut self, target: FramebufferTarget, framebuffer: Option<u32>);
    /// Attaches a texture to the bound framebuffer.
    fn framebuffer_texture_2d(&mut self, attachment: Attachment, texture: u32);
    /// Attaches a renderbuffer to the bound framebuffer.
    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, renderbuffer: u32);
    /// Returns whether the bound framebuffer is complete.
    fn check_framebuffer_status(&self) -> bool;
    /// Deletes a framebuffer.
    fn delete_framebuffer(&mut self, framebuffer: u32);
    /// Creates a renderbuffer name.
    fn create_renderbuffer(&mut self) -> Option<u32>;
    /// Binds a renderbuffer.
    fn bind_renderbuffer(&mut self, renderbuffer: Option<u32>);
    /// Allocates single-sampled storage for the bound renderbuffer.
    fn renderbuffer_storage(&mut self, format: TextureFormat, width: u32, height: u32);
    /// Deletes a renderbuffer.
    fn delete_renderbuffer(&mut self, renderbuffer: u32);

    // --- Draws ---

    /// Draws non-indexed primitives.
    fn draw_arrays(&mut self, topology: PrimitiveTopology, first: u32, count: u32);
    /// Draws indexed primitives from the bound element array buffer.
    fn draw_elements(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        offset: u64,
    );
    /// Flushes queued commands.
    fn flush(&mut self);
}

/// The extended immediate-mode contract (GL ES 3 level).
pub trait Gl2Api: GlApi {
    /// Creates a vertex array object.
    fn create_vertex_array(&mut self) -> Option<u32>;
    /// Binds a vertex array object; `None` restores the default one.
    fn bind_vertex_array(&mut self, vertex_array: Option<u32>);
    /// Deletes a vertex array object.
    fn delete_vertex_array(&mut self, vertex_array: u32);
    /// Draws instanced non-indexed primitives.
    fn draw_arrays_instanced(
        &mut self,
        topology: PrimitiveTopology,
        first: u32,
        count: u32,
        instances: u32,
    );
    /// Draws instanced indexed primitives.
    fn draw_elements_instanced(
        &mut self,
        topology: PrimitiveTopology,
        count: u32,
        format: IndexFormat,
        offset: u64,
        instances: u32,
    );
    /// Allocates multisampled storage for the bound renderbuffer.
    fn renderbuffer_storage_multisample(
        &mut self,
        samples: u32,
        format: TextureFormat,
        width: u32,
        height: u32,
    );
    /// Copies a region from the read framebuffer to the draw framebuffer,
    /// resolving samples.
    fn blit_framebuffer(&mut self, width: u32, height: u32, mask: ClearMask);
    /// Creates a sampler object.
    fn create_sampler(&mut self) -> Option<u32>;
    /// Sets filtering and wrapping on a sampler object.
    fn sampler_parameters(&mut self, sampler: u32, params: &SamplerParams);
    /// Binds a sampler object to a texture unit.
    fn bind_sampler(&mut self, unit: u32, sampler: Option<u32>);
    /// Deletes a sampler object.
    fn delete_sampler(&mut self, sampler: u32);
}
