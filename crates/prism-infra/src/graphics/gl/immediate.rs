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

//! The GL ES 2 style context: no vertex arrays, no sampler objects and no
//! multisampled framebuffers.

use super::device::GlDevice;
use super::profile::GlProfile;
use prism_core::native::{GlApi, GlVersion, NativeContext};
use prism_core::renderer::api::{
    BackendKind, PrimitiveTopology, RenderTargetConfig, RenderTargetInfo, SamplerParams,
};
use prism_core::renderer::frame::{DrawPlan, PassPlan};
use prism_core::renderer::RenderError;

/// The immediate-mode profile.
#[derive(Debug, Default)]
pub struct Gl1Profile;

impl GlProfile for Gl1Profile {
    type Api = dyn GlApi;

    const LABEL: &'static str = "GlRenderer";

    const BACKEND: BackendKind = BackendKind::Immediate;

    fn accept(context: NativeContext) -> Result<Box<dyn GlApi>, NativeContext> {
        match context {
            NativeContext::Gl(gl) if gl.version() == GlVersion::Gl1 => Ok(gl),
            other => Err(other),
        }
    }

    fn set_msaa(
        &mut self,
        _device: &mut GlDevice<dyn GlApi>,
        enabled: bool,
    ) -> Result<(), RenderError> {
        if enabled {
            return Err(RenderError::Unsupported {
                backend: Self::BACKEND,
                operation: "set_msaa",
            });
        }
        Ok(())
    }

    fn resize(&mut self, _device: &mut GlDevice<dyn GlApi>) -> Result<(), RenderError> {
        Ok(())
    }

    fn msaa_framebuffer(&self) -> Option<u32> {
        None
    }

    fn create_render_target(
        &mut self,
        device: &mut GlDevice<dyn GlApi>,
        config: &RenderTargetConfig<'_>,
    ) -> Result<RenderTargetInfo, RenderError> {
        device.create_render_target(config)
    }

    // Parameters are applied to the bound texture at draw time.
    fn create_sampler_object(
        &mut self,
        _device: &mut GlDevice<dyn GlApi>,
        _params: &SamplerParams,
    ) -> Result<Option<u32>, RenderError> {
        Ok(None)
    }

    fn delete_sampler_object(&mut self, _device: &mut GlDevice<dyn GlApi>, _object: u32) {}

    fn begin_draw(&mut self, _device: &mut GlDevice<dyn GlApi>) {}

    fn bind_samplers(&mut self, _device: &mut GlDevice<dyn GlApi>, _bindings: &[(u32, u32)]) {}

    fn issue_draw(
        &mut self,
        device: &mut GlDevice<dyn GlApi>,
        topology: PrimitiveTopology,
        plan: &DrawPlan<'_>,
    ) -> Option<u32> {
        let instances = match *plan {
            DrawPlan::Indexed {
                format,
                count,
                instances,
                ..
            } => {
                device.gl.draw_elements(topology, count, format, 0);
                instances
            }
            DrawPlan::NonIndexed { count, instances } => {
                device.gl.draw_arrays(topology, 0, count);
                instances
            }
            DrawPlan::Nothing => return None,
        };
        if instances > 1 {
            log::warn!("GlRenderer: Instanced draws are unavailable; drew one instance.");
        }
        Some(1)
    }

    fn end_draw(&mut self, _device: &mut GlDevice<dyn GlApi>) {}

    fn end_pass(&mut self, _device: &mut GlDevice<dyn GlApi>, _plan: &PassPlan<'_>) {}

    fn release(&mut self, _device: &mut GlDevice<dyn GlApi>) {}
}
