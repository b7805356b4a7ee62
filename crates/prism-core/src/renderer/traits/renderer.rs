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

use crate::event::{EventBus, EventKind, ListenerId, RenderEvent};
use crate::renderer::api::{
    BackendKind, BindGroupConfig, BufferConfig, BufferInfo, ComputeDispatch, DrawCall,
    PipelineConfig, RenderStateChange, RenderTargetConfig, RenderTargetInfo, SamplerConfig,
    TextureConfig, TextureInfo,
};
use crate::renderer::{RenderError, RenderState, RenderStats};
use async_trait::async_trait;

/// A renderer bound to one surface through one backend family.
///
/// The lifecycle is: construct, [`Renderer::initialize`], use, then
/// [`Renderer::destroy`]. Every resource operation fails with
/// [`RenderError::NotInitialized`] outside the active phase.
///
/// Renderers are single-threaded: only initialization suspends, and
/// `render()` must not be re-entered.
#[async_trait(?Send)]
pub trait Renderer {
    /// The backend family this renderer drives.
    fn backend(&self) -> BackendKind;

    /// Probes support, acquires the native context and applies the default
    /// render states. A failed attempt leaves the renderer uninitialized and
    /// may be retried.
    async fn initialize(&mut self) -> Result<(), RenderError>;

    /// Whether `initialize()` succeeded and `destroy()` has not run.
    fn is_initialized(&self) -> bool;

    /// The renderer's event bus.
    fn events(&mut self) -> &mut EventBus<RenderEvent>;

    /// Subscribes to one kind of event.
    fn on(&mut self, kind: EventKind, listener: Box<dyn FnMut(&RenderEvent)>) -> ListenerId {
        self.events().on(kind, listener)
    }

    /// Unsubscribes a listener.
    fn off(&mut self, id: ListenerId) -> bool {
        self.events().off(id)
    }

    // --- Buffers ---

    /// Creates a named buffer.
    fn create_buffer(&mut self, config: &BufferConfig<'_>) -> Result<BufferInfo, RenderError>;
    /// Replaces or partially rewrites a buffer's content.
    fn update_buffer(&mut self, name: &str, data: &[u8], offset: u64) -> Result<(), RenderError>;
    /// Destroys a buffer.
    fn destroy_buffer(&mut self, name: &str) -> Result<(), RenderError>;
    /// Returns the metadata of a buffer.
    fn buffer_info(&self, name: &str) -> Option<BufferInfo>;

    // --- Textures and samplers ---

    /// Creates a named texture.
    fn create_texture(&mut self, config: &TextureConfig<'_>) -> Result<TextureInfo, RenderError>;
    /// Writes a texture's full extent, reallocating it first if `size` differs.
    fn update_texture(
        &mut self,
        name: &str,
        data: &[u8],
        size: Option<(u32, u32)>,
    ) -> Result<TextureInfo, RenderError>;
    /// Destroys a texture.
    fn destroy_texture(&mut self, name: &str) -> Result<(), RenderError>;
    /// Returns the metadata of a texture.
    fn texture_info(&self, name: &str) -> Option<TextureInfo>;
    /// Creates a named sampler.
    fn create_sampler(&mut self, config: &SamplerConfig<'_>) -> Result<(), RenderError>;
    /// Destroys a sampler.
    fn destroy_sampler(&mut self, name: &str) -> Result<(), RenderError>;

    // --- Pipelines ---

    /// Creates a named render pipeline (or linked program).
    fn create_pipeline(&mut self, config: &PipelineConfig<'_>) -> Result<(), RenderError>;
    /// Makes a pipeline current.
    fn set_pipeline(&mut self, name: &str) -> Result<(), RenderError>;
    /// Destroys a pipeline.
    fn destroy_pipeline(&mut self, name: &str) -> Result<(), RenderError>;
    /// Whether a pipeline is registered.
    fn has_pipeline(&self, name: &str) -> bool;

    // --- Bind groups ---

    /// Creates a named bind group. Encoder-based backends only.
    fn create_bind_group(&mut self, config: &BindGroupConfig<'_>) -> Result<(), RenderError> {
        let _ = config;
        Err(RenderError::Unsupported {
            backend: self.backend(),
            operation: "create_bind_group",
        })
    }

    /// Destroys a bind group. Encoder-based backends only.
    fn destroy_bind_group(&mut self, name: &str) -> Result<(), RenderError> {
        let _ = name;
        Err(RenderError::Unsupported {
            backend: self.backend(),
            operation: "destroy_bind_group",
        })
    }

    // --- Render targets ---

    /// Creates a named offscreen render target.
    fn create_render_target(
        &mut self,
        config: &RenderTargetConfig<'_>,
    ) -> Result<RenderTargetInfo, RenderError>;
    /// Destroys a render target.
    fn destroy_render_target(&mut self, name: &str) -> Result<(), RenderError>;
    /// Selects the render target; `None` selects the surface.
    fn set_render_target(&mut self, name: Option<&str>) -> Result<(), RenderError>;
    /// Returns the metadata of a render target.
    fn render_target_info(&self, name: &str) -> Option<RenderTargetInfo>;

    // --- State ---

    /// Applies a fixed-function state change.
    fn set_render_state(&mut self, change: RenderStateChange) -> Result<(), RenderError>;
    /// The tracked fixed-function state.
    fn render_state(&self) -> RenderState;
    /// Toggles 4x multisampling of the surface.
    fn set_msaa(&mut self, enabled: bool) -> Result<(), RenderError>;
    /// Resizes the surface-sized attachments.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    // --- Frames ---

    /// Assembles and submits one pass.
    fn render(&mut self, draw: &DrawCall<'_>) -> Result<(), RenderError>;

    /// Dispatches a compute pipeline. Encoder-based backends only.
    fn dispatch_compute(
        &mut self,
        name: &str,
        dispatch: &ComputeDispatch<'_>,
    ) -> Result<(), RenderError> {
        let _ = (name, dispatch);
        Err(RenderError::Unsupported {
            backend: self.backend(),
            operation: "dispatch_compute",
        })
    }

    /// Frame rate and live resource counts.
    fn stats(&self) -> RenderStats;

    /// Releases every native resource and returns to the uninitialized state.
    /// Calling it again is a no-op.
    fn destroy(&mut self);
}
