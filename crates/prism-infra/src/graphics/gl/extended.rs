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

//! The GL ES 3 style context: vertex arrays, sampler objects, instancing and
//! multisampled framebuffers resolved by blitting.

use super::device::{depth_attachment, gen, GlColorStorage, GlDevice, GlRenderTarget};
use super::profile::GlProfile;
use prism_core::native::{
    Attachment, BufferTarget, ClearMask, FramebufferTarget, Gl2Api, GlVersion, NativeContext,
};
use prism_core::renderer::api::{
    AttributePointer, BackendKind, PrimitiveTopology, RenderTargetConfig, RenderTargetInfo,
    SamplerParams, TextureFormat,
};
use prism_core::renderer::frame::{DrawPlan, PassPlan};
use prism_core::renderer::{Registry, RenderError, ResourceKind, MSAA_SAMPLE_COUNT};

/// Color format of the multisample surface target.
const SURFACE_COLOR_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

#[derive(Debug)]
struct GlVertexArray {
    handle: u32,
}

#[derive(Debug, Clone, Copy)]
struct MsaaFramebuffer {
    framebuffer: u32,
    color: u32,
    depth: Option<u32>,
}

/// The extended immediate-mode profile.
#[derive(Debug)]
pub struct Gl2Profile {
    vertex_arrays: Registry<GlVertexArray>,
    msaa: Option<MsaaFramebuffer>,
    vertex_array_bound: bool,
    sampler_units: Vec<u32>,
}

impl Default for Gl2Profile {
    fn default() -> Self {
        Self {
            vertex_arrays: Registry::new(ResourceKind::VertexArray),
            msaa: None,
            vertex_array_bound: false,
            sampler_units: Vec::new(),
        }
    }
}

/// Allocates a multisampled framebuffer with color and depth renderbuffers.
fn multisample_framebuffer(
    device: &mut GlDevice<dyn Gl2Api>,
    color_format: TextureFormat,
    width: u32,
    height: u32,
    with_depth: bool,
) -> Result<(u32, u32, Option<u32>), RenderError> {
    let framebuffer = gen(device.gl.create_framebuffer(), "framebuffer")?;
    device
        .gl
        .bind_framebuffer(FramebufferTarget::Framebuffer, Some(framebuffer));

    let color = gen(device.gl.create_renderbuffer(), "renderbuffer")?;
    device.gl.bind_renderbuffer(Some(color));
    device
        .gl
        .renderbuffer_storage_multisample(MSAA_SAMPLE_COUNT, color_format, width, height);
    device
        .gl
        .framebuffer_renderbuffer(Attachment::Color0, color);

    let depth = if with_depth {
        let depth = gen(device.gl.create_renderbuffer(), "renderbuffer")?;
        let format = device.depth_format;
        device.gl.bind_renderbuffer(Some(depth));
        device
            .gl
            .renderbuffer_storage_multisample(MSAA_SAMPLE_COUNT, format, width, height);
        device
            .gl
            .framebuffer_renderbuffer(depth_attachment(format), depth);
        Some(depth)
    } else {
        None
    };
    device.gl.bind_renderbuffer(None);
    Ok((framebuffer, color, depth))
}

impl Gl2Profile {
    fn allocate_msaa(&mut self, device: &mut GlDevice<dyn Gl2Api>) -> Result<(), RenderError> {
        let (width, height) = device.size;
        let (framebuffer, color, depth) =
            multisample_framebuffer(device, SURFACE_COLOR_FORMAT, width, height, true)?;
        let complete = device.gl.check_framebuffer_status();
        device
            .gl
            .bind_framebuffer(FramebufferTarget::Framebuffer, None);
        let target = MsaaFramebuffer {
            framebuffer,
            color,
            depth,
        };
        if !complete {
            Self::release_msaa(device, target);
            return Err(RenderError::FramebufferIncomplete(
                "multisample surface target".to_string(),
            ));
        }
        log::debug!("Gl2Renderer: Allocated the {width}x{height} multisample target.");
        self.msaa = Some(target);
        Ok(())
    }

    fn release_msaa(device: &mut GlDevice<dyn Gl2Api>, target: MsaaFramebuffer) {
        device.gl.delete_framebuffer(target.framebuffer);
        device.gl.delete_renderbuffer(target.color);
        if let Some(depth) = target.depth {
            device.gl.delete_renderbuffer(depth);
        }
    }

    /// Records buffer bindings and attribute pointers into a new vertex array.
    ///
    /// Attribute locations come from the current program, which must be set.
    pub(crate) fn create_vertex_array(
        &mut self,
        device: &mut GlDevice<dyn Gl2Api>,
        name: &str,
        sources: &[(&str, &[AttributePointer])],
        index_buffer: Option<&str>,
    ) -> Result<(), RenderError> {
        if name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::VertexArray, "name"));
        }
        device.current_program()?;
        for (buffer, _) in sources {
            device.buffers.get(buffer)?;
        }
        let index_handle = match index_buffer {
            Some(index) => Some(device.buffers.get(index)?.handle),
            None => None,
        };

        let handle = gen(device.gl.create_vertex_array(), "vertex array")?;
        device.gl.bind_vertex_array(Some(handle));
        for (buffer, pointers) in sources {
            device.bind_vertex_source(buffer, pointers)?;
        }
        if let Some(index) = index_handle {
            device
                .gl
                .bind_buffer(BufferTarget::ElementArray, Some(index));
        }
        device.gl.bind_vertex_array(None);

        self.vertex_arrays.insert(name, GlVertexArray { handle });
        log::debug!("Gl2Renderer: Created vertex array '{name}' (name {handle}).");
        Ok(())
    }

    pub(crate) fn destroy_vertex_array(
        &mut self,
        device: &mut GlDevice<dyn Gl2Api>,
        name: &str,
    ) -> Result<(), RenderError> {
        let vertex_array = self.vertex_arrays.remove(name)?;
        device.gl.delete_vertex_array(vertex_array.handle);
        log::debug!("Gl2Renderer: Destroyed vertex array '{name}'.");
        Ok(())
    }

    pub(crate) fn has_vertex_array(&self, name: &str) -> bool {
        self.vertex_arrays.contains(name)
    }
}

impl GlProfile for Gl2Profile {
    type Api = dyn Gl2Api;

    const LABEL: &'static str = "Gl2Renderer";

    const BACKEND: BackendKind = BackendKind::Extended;

    fn accept(context: NativeContext) -> Result<Box<dyn Gl2Api>, NativeContext> {
        match context {
            NativeContext::Gl2(gl) if gl.version() == GlVersion::Gl2 => Ok(gl),
            other => Err(other),
        }
    }

    fn set_msaa(
        &mut self,
        device: &mut GlDevice<dyn Gl2Api>,
        enabled: bool,
    ) -> Result<(), RenderError> {
        match (enabled, self.msaa.take()) {
            (true, None) => self.allocate_msaa(device),
            (true, Some(target)) => {
                self.msaa = Some(target);
                Ok(())
            }
            (false, Some(target)) => {
                Self::release_msaa(device, target);
                log::debug!("Gl2Renderer: Released the multisample target.");
                Ok(())
            }
            (false, None) => Ok(()),
        }
    }

    fn resize(&mut self, device: &mut GlDevice<dyn Gl2Api>) -> Result<(), RenderError> {
        if let Some(target) = self.msaa.take() {
            Self::release_msaa(device, target);
            self.allocate_msaa(device)?;
        }
        Ok(())
    }

    fn msaa_framebuffer(&self) -> Option<u32> {
        self.msaa.map(|target| target.framebuffer)
    }

    fn create_render_target(
        &mut self,
        device: &mut GlDevice<dyn Gl2Api>,
        config: &RenderTargetConfig<'_>,
    ) -> Result<RenderTargetInfo, RenderError> {
        if config.sample_count == 1 {
            return device.create_render_target(config);
        }
        config.validate()?;
        let (framebuffer, color, depth) = multisample_framebuffer(
            device,
            config.format,
            config.width,
            config.height,
            config.depth,
        )?;
        let target = GlRenderTarget {
            framebuffer,
            color: GlColorStorage::Renderbuffer(color),
            depth,
            info: RenderTargetInfo {
                name: config.name.to_string(),
                width: config.width,
                height: config.height,
                format: config.format,
                sample_count: config.sample_count,
                has_depth: config.depth,
            },
        };
        device.finish_render_target(target)
    }

    fn create_sampler_object(
        &mut self,
        device: &mut GlDevice<dyn Gl2Api>,
        params: &SamplerParams,
    ) -> Result<Option<u32>, RenderError> {
        let sampler = gen(device.gl.create_sampler(), "sampler")?;
        device.gl.sampler_parameters(sampler, params);
        Ok(Some(sampler))
    }

    fn delete_sampler_object(&mut self, device: &mut GlDevice<dyn Gl2Api>, object: u32) {
        device.gl.delete_sampler(object);
    }

    fn begin_draw(&mut self, device: &mut GlDevice<dyn Gl2Api>) {
        let Some(name) = device.tracker.vertex_array() else {
            return;
        };
        match self.vertex_arrays.find(name) {
            Some(vertex_array) => {
                device.gl.bind_vertex_array(Some(vertex_array.handle));
                self.vertex_array_bound = true;
            }
            None => log::warn!("Gl2Renderer: Vertex array '{name}' is gone; drawing without it."),
        }
    }

    fn bind_samplers(&mut self, device: &mut GlDevice<dyn Gl2Api>, bindings: &[(u32, u32)]) {
        for &(unit, sampler) in bindings {
            device.gl.bind_sampler(unit, Some(sampler));
            self.sampler_units.push(unit);
        }
    }

    fn issue_draw(
        &mut self,
        device: &mut GlDevice<dyn Gl2Api>,
        topology: PrimitiveTopology,
        plan: &DrawPlan<'_>,
    ) -> Option<u32> {
        match *plan {
            DrawPlan::Indexed {
                format,
                count,
                instances,
                ..
            } => {
                if instances > 1 {
                    device
                        .gl
                        .draw_elements_instanced(topology, count, format, 0, instances);
                } else {
                    device.gl.draw_elements(topology, count, format, 0);
                }
                Some(instances)
            }
            DrawPlan::NonIndexed { count, instances } => {
                if instances > 1 {
                    device
                        .gl
                        .draw_arrays_instanced(topology, 0, count, instances);
                } else {
                    device.gl.draw_arrays(topology, 0, count);
                }
                Some(instances)
            }
            DrawPlan::Nothing => None,
        }
    }

    fn end_draw(&mut self, device: &mut GlDevice<dyn Gl2Api>) {
        if std::mem::take(&mut self.vertex_array_bound) {
            device.gl.bind_vertex_array(None);
        }
        for unit in self.sampler_units.drain(..) {
            device.gl.bind_sampler(unit, None);
        }
    }

    fn end_pass(&mut self, device: &mut GlDevice<dyn Gl2Api>, plan: &PassPlan<'_>) {
        let Some(target) = self.msaa.filter(|_| plan.resolves_to_surface()) else {
            return;
        };
        let (width, height) = device.size;
        device
            .gl
            .bind_framebuffer(FramebufferTarget::Read, Some(target.framebuffer));
        device.gl.bind_framebuffer(FramebufferTarget::Draw, None);
        device.gl.blit_framebuffer(width, height, ClearMask::COLOR);
        device
            .gl
            .bind_framebuffer(FramebufferTarget::Framebuffer, None);
    }

    fn release(&mut self, device: &mut GlDevice<dyn Gl2Api>) {
        for (_, vertex_array) in self.vertex_arrays.drain() {
            device.gl.delete_vertex_array(vertex_array.handle);
        }
        if let Some(target) = self.msaa.take() {
            Self::release_msaa(device, target);
        }
        let samplers: Vec<u32> = device
            .samplers
            .iter()
            .filter_map(|(_, sampler)| sampler.object)
            .collect();
        for sampler in samplers {
            device.gl.delete_sampler(sampler);
        }
    }

    fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }
}
