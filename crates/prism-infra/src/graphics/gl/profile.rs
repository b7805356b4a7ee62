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

//! The seam between the shared GL renderer and one context generation.

use super::device::GlDevice;
use prism_core::native::{GlApi, NativeContext};
use prism_core::renderer::api::{
    BackendKind, PrimitiveTopology, RenderTargetConfig, RenderTargetInfo, SamplerParams,
};
use prism_core::renderer::frame::{DrawPlan, PassPlan};
use prism_core::renderer::RenderError;

/// What differs between the GL ES 2 and GL ES 3 style contexts.
///
/// A profile owns exactly the native state its generation adds: nothing for
/// the immediate context; vertex arrays, sampler objects and the multisample
/// framebuffer for the extended one.
pub trait GlProfile: Default {
    /// The native contract this generation drives.
    type Api: ?Sized + GlApi;

    /// The backend family.
    const BACKEND: BackendKind;

    /// Prefix of log lines.
    const LABEL: &'static str;

    /// Takes the native API out of a granted context, handing back contexts
    /// of any other family.
    fn accept(context: NativeContext) -> Result<Box<Self::Api>, NativeContext>;

    /// Allocates or releases the multisample surface target.
    fn set_msaa(
        &mut self,
        device: &mut GlDevice<Self::Api>,
        enabled: bool,
    ) -> Result<(), RenderError>;

    /// Reallocates surface-sized attachments after `device.size` changed.
    fn resize(&mut self, device: &mut GlDevice<Self::Api>) -> Result<(), RenderError>;

    /// The multisample framebuffer, while one is allocated.
    fn msaa_framebuffer(&self) -> Option<u32>;

    /// Creates and registers a render target.
    fn create_render_target(
        &mut self,
        device: &mut GlDevice<Self::Api>,
        config: &RenderTargetConfig<'_>,
    ) -> Result<RenderTargetInfo, RenderError>;

    /// Creates the native side of a sampler, if the generation has one.
    fn create_sampler_object(
        &mut self,
        device: &mut GlDevice<Self::Api>,
        params: &SamplerParams,
    ) -> Result<Option<u32>, RenderError>;

    /// Deletes a sampler object.
    fn delete_sampler_object(&mut self, device: &mut GlDevice<Self::Api>, object: u32);

    /// Called before the draw inputs are bound.
    fn begin_draw(&mut self, device: &mut GlDevice<Self::Api>);

    /// Binds sampler objects to texture units.
    fn bind_samplers(&mut self, device: &mut GlDevice<Self::Api>, bindings: &[(u32, u32)]);

    /// Issues the draw call. Returns the number of instances drawn, or
    /// `None` when the plan draws nothing.
    fn issue_draw(
        &mut self,
        device: &mut GlDevice<Self::Api>,
        topology: PrimitiveTopology,
        plan: &DrawPlan<'_>,
    ) -> Option<u32>;

    /// Called after the draw, before the pass ends.
    fn end_draw(&mut self, device: &mut GlDevice<Self::Api>);

    /// Finishes the pass, resolving into the surface where needed.
    fn end_pass(&mut self, device: &mut GlDevice<Self::Api>, plan: &PassPlan<'_>);

    /// Releases every object the profile owns.
    fn release(&mut self, device: &mut GlDevice<Self::Api>);

    /// Number of live vertex arrays.
    fn vertex_array_count(&self) -> usize {
        0
    }
}
