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

//! The encoder-based `Renderer`.

use super::device::GpuDevice;
use async_trait::async_trait;
use prism_core::event::{EventBus, RenderEvent};
use prism_core::native::{NativeContext, Surface};
use prism_core::renderer::api::{
    BackendKind, BindGroupConfig, BindGroupLayoutConfig, BufferConfig, BufferInfo,
    ComputeDispatch, ComputePipelineConfig, DrawCall, PipelineConfig, RenderStateChange,
    RenderTargetConfig, RenderTargetInfo, SamplerConfig, TextureConfig, TextureInfo,
};
use prism_core::renderer::frame::DrawPlan;
use prism_core::renderer::{
    probe, FrameCounter, RenderError, RenderState, RenderStats, Renderer, StateTracker,
};
use prism_core::RendererSettings;

const BACKEND: BackendKind = BackendKind::Encoder;

/// A renderer that records each frame as one render pass on an
/// encoder-based device.
///
/// Pipelines bake the blend, cull and depth state that is tracked when they
/// are created; changing that state later only affects pipelines created
/// afterwards. The depth attachment is allocated on the first pass that
/// needs it.
pub struct GpuRenderer {
    surface: Box<dyn Surface>,
    settings: RendererSettings,
    device: Option<GpuDevice>,
    events: EventBus<RenderEvent>,
    frames: FrameCounter,
}

impl GpuRenderer {
    /// Creates an uninitialized renderer bound to `surface`.
    pub fn new(surface: Box<dyn Surface>, settings: RendererSettings) -> Self {
        Self {
            surface,
            settings,
            device: None,
            events: EventBus::new(),
            frames: FrameCounter::new(),
        }
    }

    /// Whether `surface` grants an encoder-based canvas.
    pub fn is_supported(surface: &dyn Surface) -> bool {
        probe::is_supported(BACKEND, surface)
    }

    fn device(&self) -> Result<&GpuDevice, RenderError> {
        self.device.as_ref().ok_or(RenderError::NotInitialized)
    }

    fn device_mut(&mut self) -> Result<&mut GpuDevice, RenderError> {
        self.device.as_mut().ok_or(RenderError::NotInitialized)
    }

    /// Emits the success event, or an `Error` event for a failure.
    fn report<T>(
        &mut self,
        result: Result<T, RenderError>,
        event: impl FnOnce(&T) -> Option<RenderEvent>,
    ) -> Result<T, RenderError> {
        match result {
            Ok(value) => {
                if let Some(event) = event(&value) {
                    self.events.emit(event);
                }
                Ok(value)
            }
            Err(error) => {
                log::error!("GpuRenderer: {error}");
                self.events.emit(RenderEvent::Error {
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn connect(&mut self) -> Result<GpuDevice, RenderError> {
        if !Self::is_supported(self.surface.as_ref()) {
            return Err(RenderError::UnsupportedBackend(BACKEND));
        }
        let context = self
            .surface
            .get_context(BACKEND, &self.settings.context)
            .ok_or_else(|| RenderError::ContextAcquisitionFailed {
                backend: BACKEND,
                reason: "the surface returned no context".to_string(),
            })?;
        let mut canvas = match context {
            NativeContext::Gpu(canvas) => canvas,
            other => {
                return Err(RenderError::ContextAcquisitionFailed {
                    backend: BACKEND,
                    reason: format!("the surface granted a {} context", other.backend()),
                })
            }
        };
        let (width, height) = self.surface.size();
        let api = canvas.request_device(width, height).await.map_err(|error| {
            RenderError::ContextAcquisitionFailed {
                backend: BACKEND,
                reason: error.to_string(),
            }
        })?;
        let mut device = GpuDevice::new(api, (width, height), self.settings.depth_format);
        for change in StateTracker::default_changes(self.settings.clear_color) {
            device.tracker.apply(change);
        }
        Ok(device)
    }

    /// Creates a named bind group layout for pipelines with explicit layouts.
    pub fn create_bind_group_layout(
        &mut self,
        config: &BindGroupLayoutConfig<'_>,
    ) -> Result<(), RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.create_bind_group_layout(config));
        self.report(result, |_| None)
    }

    /// Destroys a bind group layout. Pipelines and bind groups created from
    /// it stay valid.
    pub fn destroy_bind_group_layout(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.destroy_bind_group_layout(name));
        self.report(result, |_| None)
    }

    /// Creates a named compute pipeline, sharing the shader module cache
    /// with render pipelines.
    pub fn create_compute_pipeline(
        &mut self,
        config: &ComputePipelineConfig<'_>,
    ) -> Result<(), RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.create_compute_pipeline(config));
        self.report(result, |_| {
            Some(RenderEvent::PipelineCreated {
                name: config.name.to_string(),
            })
        })
    }

    /// Reads a buffer's content back, when the device supports it.
    pub fn read_buffer(&mut self, name: &str) -> Result<Vec<u8>, RenderError> {
        let result = self.device_mut().and_then(|d| d.read_buffer(name));
        self.report(result, |_| None)
    }

    /// Whether the surface depth attachment is currently allocated.
    pub fn has_depth_attachment(&self) -> bool {
        self.device().map(|d| d.has_depth_buffer()).unwrap_or(false)
    }
}

#[async_trait(?Send)]
impl Renderer for GpuRenderer {
    fn backend(&self) -> BackendKind {
        BACKEND
    }

    async fn initialize(&mut self) -> Result<(), RenderError> {
        if self.device.is_some() {
            log::warn!("GpuRenderer: Already initialized.");
            return Ok(());
        }
        log::info!("GpuRenderer: Initializing...");
        let device = match self.connect().await {
            Ok(device) => device,
            Err(error) => return self.report(Err(error), |_| None),
        };
        let (width, height) = device.size;
        let context = format!("{} ({width}x{height})", device.api.describe());
        self.frames.reset();
        self.device = Some(device);
        log::info!("GpuRenderer: Initialized on {context}.");
        self.events.emit(RenderEvent::Initialized {
            backend: BACKEND,
            context,
        });

        if self.settings.msaa {
            if let Err(error) = self.set_msaa(true) {
                log::warn!("GpuRenderer: Default MSAA unavailable: {error}");
            }
        }
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    fn events(&mut self) -> &mut EventBus<RenderEvent> {
        &mut self.events
    }

    fn create_buffer(&mut self, config: &BufferConfig<'_>) -> Result<BufferInfo, RenderError> {
        let result = self.device_mut().and_then(|d| d.create_buffer(config));
        self.report(result, |info| {
            Some(RenderEvent::BufferCreated {
                name: info.name.clone(),
                size: info.size,
            })
        })
    }

    fn update_buffer(&mut self, name: &str, data: &[u8], offset: u64) -> Result<(), RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.update_buffer(name, data, offset));
        self.report(result, |_| {
            Some(RenderEvent::BufferUpdated {
                name: name.to_string(),
                offset,
                len: data.len() as u64,
            })
        })
    }

    fn destroy_buffer(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.destroy_buffer(name));
        self.report(result, |_| {
            Some(RenderEvent::BufferDestroyed {
                name: name.to_string(),
            })
        })
    }

    fn buffer_info(&self, name: &str) -> Option<BufferInfo> {
        let device = self.device().ok()?;
        device.buffers.find(name).map(|b| b.info.clone())
    }

    fn create_texture(&mut self, config: &TextureConfig<'_>) -> Result<TextureInfo, RenderError> {
        let result = self.device_mut().and_then(|d| d.create_texture(config));
        self.report(result, |info| {
            Some(RenderEvent::TextureCreated {
                name: info.name.clone(),
                width: info.width,
                height: info.height,
                format: info.format,
            })
        })
    }

    fn update_texture(
        &mut self,
        name: &str,
        data: &[u8],
        size: Option<(u32, u32)>,
    ) -> Result<TextureInfo, RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.update_texture(name, data, size));
        self.report(result, |(info, reallocated)| {
            Some(RenderEvent::TextureUpdated {
                name: info.name.clone(),
                width: info.width,
                height: info.height,
                reallocated: *reallocated,
            })
        })
        .map(|(info, _)| info)
    }

    fn destroy_texture(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.destroy_texture(name));
        self.report(result, |_| {
            Some(RenderEvent::TextureDestroyed {
                name: name.to_string(),
            })
        })
    }

    fn texture_info(&self, name: &str) -> Option<TextureInfo> {
        let device = self.device().ok()?;
        device.textures.find(name).map(|t| t.info.clone())
    }

    fn create_sampler(&mut self, config: &SamplerConfig<'_>) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.create_sampler(config));
        self.report(result, |_| {
            Some(RenderEvent::SamplerCreated {
                name: config.name.to_string(),
            })
        })
    }

    fn destroy_sampler(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.destroy_sampler(name));
        self.report(result, |_| {
            Some(RenderEvent::SamplerDestroyed {
                name: name.to_string(),
            })
        })
    }

    fn create_pipeline(&mut self, config: &PipelineConfig<'_>) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.create_pipeline(config));
        self.report(result, |_| {
            Some(RenderEvent::PipelineCreated {
                name: config.name.to_string(),
            })
        })
    }

    fn set_pipeline(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| {
            d.pipelines.get(name)?;
            d.tracker.bind_pipeline(name);
            Ok(())
        });
        self.report(result, |_| {
            Some(RenderEvent::PipelineSet {
                name: name.to_string(),
            })
        })
    }

    fn destroy_pipeline(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.destroy_pipeline(name));
        self.report(result, |_| {
            Some(RenderEvent::PipelineDestroyed {
                name: name.to_string(),
            })
        })
    }

    fn has_pipeline(&self, name: &str) -> bool {
        self.device()
            .map(|d| d.pipelines.contains(name) || d.compute_pipelines.contains(name))
            .unwrap_or(false)
    }

    fn create_bind_group(&mut self, config: &BindGroupConfig<'_>) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.create_bind_group(config));
        self.report(result, |entries| {
            Some(RenderEvent::BindGroupCreated {
                name: config.name.to_string(),
                entries: *entries,
            })
        })
        .map(|_| ())
    }

    fn destroy_bind_group(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.destroy_bind_group(name));
        self.report(result, |_| {
            Some(RenderEvent::BindGroupDestroyed {
                name: name.to_string(),
            })
        })
    }

    fn create_render_target(
        &mut self,
        config: &RenderTargetConfig<'_>,
    ) -> Result<RenderTargetInfo, RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.create_render_target(config));
        self.report(result, |info| {
            Some(RenderEvent::RenderTargetCreated {
                name: info.name.clone(),
                width: info.width,
                height: info.height,
                sample_count: info.sample_count,
            })
        })
    }

    fn destroy_render_target(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.destroy_render_target(name));
        self.report(result, |_| {
            Some(RenderEvent::RenderTargetDestroyed {
                name: name.to_string(),
            })
        })
    }

    fn set_render_target(&mut self, name: Option<&str>) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| {
            if let Some(name) = name {
                d.render_targets.get(name)?;
            }
            d.tracker.set_render_target(name);
            Ok(())
        });
        self.report(result, |_| None)
    }

    fn render_target_info(&self, name: &str) -> Option<RenderTargetInfo> {
        let device = self.device().ok()?;
        device.render_targets.find(name).map(|t| t.info.clone())
    }

    fn set_render_state(&mut self, change: RenderStateChange) -> Result<(), RenderError> {
        let result = self.device_mut().map(|d| {
            d.tracker.apply(change);
        });
        self.report(result, |_| None)
    }

    fn render_state(&self) -> RenderState {
        self.device()
            .map(|d| *d.tracker.state())
            .unwrap_or_default()
    }

    fn set_msaa(&mut self, enabled: bool) -> Result<(), RenderError> {
        let result = match self.device.as_mut() {
            Some(device) if device.tracker.state().msaa == enabled => Ok(None),
            Some(device) => device
                .set_msaa(enabled)
                .map(|()| Some(device.tracker.state().sample_count())),
            None => Err(RenderError::NotInitialized),
        };
        self.report(result, |changed| {
            changed.map(|sample_count| RenderEvent::MsaaChanged {
                enabled,
                sample_count,
            })
        })
        .map(|_| ())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            log::warn!("GpuRenderer: Ignoring resize request to zero dimensions: {width}x{height}");
            return Ok(());
        }
        let result = self.device_mut().and_then(|d| d.resize(width, height));
        self.report(result, |_| Some(RenderEvent::Resize { width, height }))
    }

    fn render(&mut self, draw: &DrawCall<'_>) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.render(draw));
        let plan = self.report(result, |_| None)?;
        let frame = self.frames.record_frame();
        let draw_event = match plan {
            DrawPlan::Indexed {
                count, instances, ..
            } => Some((true, count, instances)),
            DrawPlan::NonIndexed { count, instances } => Some((false, count, instances)),
            DrawPlan::Nothing => None,
        };
        if let Some((indexed, count, instances)) = draw_event {
            self.events.emit(RenderEvent::Draw {
                indexed,
                count,
                instances,
            });
        }
        self.events.emit(RenderEvent::FrameRendered { frame });
        Ok(())
    }

    fn dispatch_compute(
        &mut self,
        name: &str,
        dispatch: &ComputeDispatch<'_>,
    ) -> Result<(), RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.dispatch_compute(name, dispatch));
        self.report(result, |workgroups| {
            Some(RenderEvent::ComputeDispatched {
                name: name.to_string(),
                workgroups: *workgroups,
            })
        })
        .map(|_| ())
    }

    fn stats(&self) -> RenderStats {
        let Some(device) = self.device.as_ref() else {
            return RenderStats::default();
        };
        RenderStats {
            frame_count: self.frames.frame_count(),
            fps: self.frames.fps(),
            buffers: device.buffers.len(),
            textures: device.textures.len(),
            samplers: device.samplers.len(),
            pipelines: device.pipelines.len() + device.compute_pipelines.len(),
            bind_groups: device.bind_groups.len(),
            render_targets: device.render_targets.len(),
            vertex_arrays: 0,
            shader_modules: device.shader_module_count(),
            msaa_target: device.has_msaa_target(),
        }
    }

    fn destroy(&mut self) {
        let Some(mut device) = self.device.take() else {
            return;
        };
        log::info!("GpuRenderer: Destroying...");
        device.release_all();
        self.frames.reset();
        self.events.emit(RenderEvent::Destroyed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{GpuCall, HeadlessSurface};
    use prism_core::native::GpuDraw;
    use prism_core::renderer::api::{
        BindGroupEntry, BindGroupLayoutSource, BindingResource, CompareFunction, TextureFormat,
    };

    const SHADER: &str = "@vertex fn vs_main() {} @fragment fn fs_main() {}";

    fn renderer() -> (GpuRenderer, HeadlessSurface) {
        let surface = HeadlessSurface::new(64, 64);
        let mut renderer = GpuRenderer::new(Box::new(surface.clone()), RendererSettings::default());
        pollster::block_on(renderer.initialize()).expect("initialize");
        (renderer, surface)
    }

    #[test]
    fn pipelines_share_compiled_modules() {
        let (mut renderer, _surface) = renderer();
        renderer
            .create_pipeline(&PipelineConfig::new("a", SHADER, SHADER))
            .expect("first");
        renderer
            .create_pipeline(&PipelineConfig::new("b", SHADER, SHADER))
            .expect("second");
        let stats = renderer.stats();
        assert_eq!(stats.pipelines, 2);
        assert_eq!(stats.shader_modules, 1);
    }

    #[test]
    fn growing_a_buffer_recreates_it_with_the_new_content() {
        let (mut renderer, surface) = renderer();
        renderer
            .create_buffer(&BufferConfig::vertex("v", &[1, 2, 3, 4]))
            .expect("buffer");
        renderer
            .update_buffer("v", &[9; 8], 0)
            .expect("grow");
        assert_eq!(renderer.buffer_info("v").map(|b| b.size), Some(8));
        assert_eq!(renderer.read_buffer("v").expect("read"), vec![9; 8]);
        let recreated = surface.gpu_log().count(|c| {
            matches!(
                c,
                GpuCall::CreateBuffer {
                    mapped_at_creation: true,
                    size: 8,
                    ..
                }
            )
        });
        assert_eq!(recreated, 1);
    }

    #[test]
    fn depth_attachment_is_allocated_on_the_first_pass() {
        let (mut renderer, surface) = renderer();
        renderer
            .create_pipeline(&PipelineConfig::new("p", SHADER, SHADER))
            .expect("pipeline");
        renderer.set_pipeline("p").expect("set");
        assert!(!renderer.has_depth_attachment());

        renderer.render(&DrawCall::new().vertices(3)).expect("frame 1");
        renderer.render(&DrawCall::new().vertices(3)).expect("frame 2");
        assert!(renderer.has_depth_attachment());

        let passes = surface.gpu_log().render_passes();
        assert_eq!(passes.len(), 2);
        assert!(passes.iter().all(|p| p.depth.is_some()));
        assert_eq!(passes[0].depth.map(|d| d.view), passes[1].depth.map(|d| d.view));
        assert_eq!(
            passes[0].draw,
            Some(GpuDraw::NonIndexed {
                count: 3,
                instances: 1
            })
        );
    }

    #[test]
    fn pipeline_built_for_one_sample_fails_in_a_multisampled_pass() {
        let (mut renderer, _surface) = renderer();
        renderer
            .create_pipeline(&PipelineConfig::new("p", SHADER, SHADER))
            .expect("pipeline");
        renderer.set_pipeline("p").expect("set");
        renderer.set_msaa(true).expect("msaa");

        let err = renderer.render(&DrawCall::new().vertices(3)).unwrap_err();
        assert_eq!(
            err,
            RenderError::SampleCountMismatch {
                pipeline: "p".to_string(),
                expected: 1,
                actual: 4,
            }
        );
        assert_eq!(renderer.stats().frame_count, 0);
    }

    #[test]
    fn disabling_depth_after_pipeline_creation_is_rejected_before_submission() {
        let (mut renderer, surface) = renderer();
        renderer
            .create_pipeline(&PipelineConfig::new("p", SHADER, SHADER))
            .expect("pipeline");
        renderer.set_pipeline("p").expect("set");
        renderer
            .set_render_state(RenderStateChange::DepthTest {
                enabled: false,
                func: CompareFunction::Less,
            })
            .expect("depth off");

        let err = renderer.render(&DrawCall::new().vertices(3)).unwrap_err();
        assert_eq!(
            err,
            RenderError::DepthStateMismatch {
                pipeline: "p".to_string(),
                expected: true,
                actual: false,
            }
        );
        assert_eq!(renderer.stats().frame_count, 0);
        assert!(surface.gpu_log().render_passes().is_empty());
    }

    #[test]
    fn surface_pipeline_is_rejected_by_a_target_of_another_format() {
        let (mut renderer, surface) = renderer();
        renderer
            .create_render_target(&RenderTargetConfig::new("offscreen", 32, 32))
            .expect("target");
        renderer
            .create_pipeline(&PipelineConfig::new("p", SHADER, SHADER))
            .expect("pipeline");
        renderer.set_pipeline("p").expect("set");
        renderer.set_render_target(Some("offscreen")).expect("target");

        let err = renderer.render(&DrawCall::new().vertices(3)).unwrap_err();
        assert_eq!(
            err,
            RenderError::ColorFormatMismatch {
                pipeline: "p".to_string(),
                expected: TextureFormat::Bgra8UnormSrgb,
                actual: TextureFormat::Rgba8Unorm,
            }
        );
        assert_eq!(renderer.stats().frame_count, 0);
        assert!(surface.gpu_log().render_passes().is_empty());

        let mut config = PipelineConfig::new("offscreen-p", SHADER, SHADER);
        config.color_format = Some(TextureFormat::Rgba8Unorm);
        renderer.create_pipeline(&config).expect("matching pipeline");
        renderer.set_pipeline("offscreen-p").expect("set");
        renderer
            .render(&DrawCall::new().vertices(3))
            .expect("matching format renders");
        assert_eq!(surface.gpu_log().render_passes().len(), 1);
    }

    #[test]
    fn buffer_write_past_the_address_space_is_an_overflow() {
        let (mut renderer, _surface) = renderer();
        renderer
            .create_buffer(&BufferConfig::uniform("u", 64))
            .expect("buffer");

        let err = renderer
            .update_buffer("u", &[1, 2, 3, 4], u64::MAX - 1)
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::BufferOverflow {
                name: "u".to_string(),
                offset: u64::MAX - 1,
                len: 4,
                capacity: 64,
            }
        );
        assert_eq!(renderer.buffer_info("u").map(|b| b.size), Some(64));
    }

    #[test]
    fn compute_dispatch_binds_groups_from_the_pipeline_layout() {
        let (mut renderer, surface) = renderer();
        renderer
            .create_buffer(&BufferConfig {
                name: "data",
                data: None,
                size: Some(64),
                usage: prism_core::renderer::api::BufferUsage::STORAGE,
                index_format: None,
            })
            .expect("buffer");
        renderer
            .create_compute_pipeline(&ComputePipelineConfig::new("sum", "@compute fn cs_main() {}"))
            .expect("compute");
        renderer
            .create_bind_group(&BindGroupConfig {
                name: "data_group",
                layout: BindGroupLayoutSource::Pipeline {
                    pipeline: "sum",
                    index: 0,
                },
                entries: &[BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::buffer("data"),
                }],
            })
            .expect("bind group");

        renderer
            .dispatch_compute("sum", &ComputeDispatch::new(8).bind_group(0, "data_group"))
            .expect("dispatch");
        let dispatched = surface
            .gpu_log()
            .count(|c| matches!(c, GpuCall::SubmitComputePass(p) if p.workgroups == [8, 1, 1]));
        assert_eq!(dispatched, 1);
    }
}
