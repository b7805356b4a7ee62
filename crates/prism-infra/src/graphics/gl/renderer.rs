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

//! The `Renderer` implementation shared by both immediate-mode generations.

use super::device::GlDevice;
use super::extended::Gl2Profile;
use super::profile::GlProfile;
use async_trait::async_trait;
use prism_core::event::{EventBus, RenderEvent};
use prism_core::native::{GlApi, Surface};
use prism_core::renderer::api::{
    AttributePointer, BackendKind, BufferConfig, BufferInfo, DrawCall, PipelineConfig,
    RenderStateChange, RenderTargetConfig, RenderTargetInfo, SamplerConfig, SamplerParams,
    TextureConfig, TextureInfo, UniformValue,
};
use prism_core::renderer::frame::{DrawPlan, PassPlan};
use prism_core::renderer::{
    probe, FrameCounter, RenderError, RenderState, RenderStats, Renderer, ResourceKind,
    StateTracker,
};
use prism_core::RendererSettings;

/// A renderer driving an immediate-mode context of generation `P`.
///
/// Use the [`GlRenderer`](crate::graphics::GlRenderer) and
/// [`Gl2Renderer`](crate::graphics::Gl2Renderer) aliases.
pub struct GlContextRenderer<P: GlProfile> {
    surface: Box<dyn Surface>,
    settings: RendererSettings,
    device: Option<GlDevice<P::Api>>,
    profile: P,
    events: EventBus<RenderEvent>,
    frames: FrameCounter,
}

impl<P: GlProfile> GlContextRenderer<P> {
    /// Creates an uninitialized renderer bound to `surface`.
    pub fn new(surface: Box<dyn Surface>, settings: RendererSettings) -> Self {
        Self {
            surface,
            settings,
            device: None,
            profile: P::default(),
            events: EventBus::new(),
            frames: FrameCounter::new(),
        }
    }

    /// Whether `surface` grants a context of this generation.
    pub fn is_supported(surface: &dyn Surface) -> bool {
        probe::is_supported(P::BACKEND, surface)
    }

    fn device(&self) -> Result<&GlDevice<P::Api>, RenderError> {
        self.device.as_ref().ok_or(RenderError::NotInitialized)
    }

    fn device_mut(&mut self) -> Result<&mut GlDevice<P::Api>, RenderError> {
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
                log::error!("{}: {error}", P::LABEL);
                self.events.emit(RenderEvent::Error {
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    fn connect(&mut self) -> Result<GlDevice<P::Api>, RenderError> {
        if !Self::is_supported(self.surface.as_ref()) {
            return Err(RenderError::UnsupportedBackend(P::BACKEND));
        }
        let context = self
            .surface
            .get_context(P::BACKEND, &self.settings.context)
            .ok_or_else(|| RenderError::ContextAcquisitionFailed {
                backend: P::BACKEND,
                reason: "the surface returned no context".to_string(),
            })?;
        let gl = P::accept(context).map_err(|other| RenderError::ContextAcquisitionFailed {
            backend: P::BACKEND,
            reason: format!("the surface granted a {} context", other.backend()),
        })?;
        let (width, height) = self.surface.size();
        let mut device = GlDevice::new(gl, (width, height), self.settings.depth_format);
        device.gl.viewport(0, 0, width, height);
        for change in StateTracker::default_changes(self.settings.clear_color) {
            device.apply_state(change);
        }
        Ok(device)
    }

    /// Compiles and links a named program.
    pub fn create_program(&mut self, config: &PipelineConfig<'_>) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.create_program(config));
        self.report(result, |_| {
            Some(RenderEvent::PipelineCreated {
                name: config.name.to_string(),
            })
        })
    }

    /// Makes a program current. Setting the current program again issues no
    /// native call and no event.
    pub fn set_program(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.use_program(name));
        self.report(result, |changed| {
            changed.then(|| RenderEvent::ProgramSet {
                name: name.to_string(),
            })
        })
        .map(|_| ())
    }

    /// Sets a uniform of the current program. Unknown uniforms are skipped
    /// with a warning.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.set_uniform(name, &value));
        self.report(result, |_| None).map(|_| ())
    }

    /// Points the current program's attributes at `buffer` and remembers the
    /// layout for every later draw that lists the buffer. Returns the number
    /// of attributes the program actually has.
    pub fn setup_vertex_attributes(
        &mut self,
        buffer: &str,
        attributes: &[AttributePointer],
    ) -> Result<usize, RenderError> {
        let result = self
            .device_mut()
            .and_then(|d| d.setup_vertex_attributes(buffer, attributes));
        self.report(result, |applied| {
            Some(RenderEvent::VertexAttributesSetup {
                buffer: buffer.to_string(),
                attributes: *applied,
            })
        })
    }

    fn render_pass(&mut self, draw: &DrawCall<'_>) -> Result<Option<RenderEvent>, RenderError> {
        let device = self.device.as_mut().ok_or(RenderError::NotInitialized)?;
        device.current_program()?;
        let target = device.current_target_info();
        let plan = PassPlan::resolve(&device.tracker, target.as_ref());

        device.begin_pass(&plan, self.profile.msaa_framebuffer());
        self.profile.begin_draw(device);
        let bound = match device.bind_draw(draw) {
            Ok(bound) => bound,
            Err(error) => {
                self.profile.end_draw(device);
                return Err(error);
            }
        };
        self.profile.bind_samplers(device, &bound.sampler_objects);
        let drawn = self.profile.issue_draw(device, bound.topology, &bound.plan);
        self.profile.end_draw(device);
        self.profile.end_pass(device, &plan);
        device.gl.flush();

        Ok(drawn.map(|instances| RenderEvent::Draw {
            indexed: matches!(bound.plan, DrawPlan::Indexed { .. }),
            count: bound.plan.count().unwrap_or_default(),
            instances,
        }))
    }
}

impl GlContextRenderer<Gl2Profile> {
    /// Records vertex buffer bindings, attribute pointers and an optional
    /// index buffer into a named vertex array. Attribute locations come from
    /// the current program.
    pub fn create_vertex_array(
        &mut self,
        name: &str,
        sources: &[(&str, &[AttributePointer])],
        index_buffer: Option<&str>,
    ) -> Result<(), RenderError> {
        let result = match self.device.as_mut() {
            Some(device) => self
                .profile
                .create_vertex_array(device, name, sources, index_buffer),
            None => Err(RenderError::NotInitialized),
        };
        self.report(result, |_| None)
    }

    /// Selects the vertex array wrapped around later draws; `None` draws
    /// without one.
    pub fn set_vertex_array(&mut self, name: Option<&str>) -> Result<(), RenderError> {
        let result = match self.device.as_mut() {
            Some(device) => match name {
                Some(name) if !self.profile.has_vertex_array(name) => Err(
                    RenderError::not_found(ResourceKind::VertexArray, name),
                ),
                _ => {
                    device.tracker.bind_vertex_array(name);
                    Ok(())
                }
            },
            None => Err(RenderError::NotInitialized),
        };
        self.report(result, |_| None)
    }

    /// Deletes a vertex array.
    pub fn destroy_vertex_array(&mut self, name: &str) -> Result<(), RenderError> {
        let result = match self.device.as_mut() {
            Some(device) => self.profile.destroy_vertex_array(device, name),
            None => Err(RenderError::NotInitialized),
        };
        self.report(result, |_| None)
    }
}

#[async_trait(?Send)]
impl<P: GlProfile> Renderer for GlContextRenderer<P> {
    fn backend(&self) -> BackendKind {
        P::BACKEND
    }

    async fn initialize(&mut self) -> Result<(), RenderError> {
        if self.device.is_some() {
            log::warn!("{}: Already initialized.", P::LABEL);
            return Ok(());
        }
        log::info!("{}: Initializing...", P::LABEL);
        let device = match self.connect() {
            Ok(device) => device,
            Err(error) => return self.report(Err(error), |_| None),
        };
        let (width, height) = device.size;
        let context = format!("{} ({width}x{height})", device.gl.describe());
        self.profile = P::default();
        self.frames.reset();
        self.device = Some(device);
        log::info!("{}: Initialized on {context}.", P::LABEL);
        self.events.emit(RenderEvent::Initialized {
            backend: P::BACKEND,
            context,
        });

        if self.settings.msaa {
            if let Err(error) = self.set_msaa(true) {
                log::warn!("{}: Default MSAA unavailable: {error}", P::LABEL);
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
        let result = match self.device.as_mut() {
            Some(device) => config.validate().and_then(|()| {
                let params = SamplerParams::from(config);
                let object = self.profile.create_sampler_object(device, &params)?;
                device.insert_sampler(config.name, params, object);
                Ok(())
            }),
            None => Err(RenderError::NotInitialized),
        };
        self.report(result, |_| {
            Some(RenderEvent::SamplerCreated {
                name: config.name.to_string(),
            })
        })
    }

    fn destroy_sampler(&mut self, name: &str) -> Result<(), RenderError> {
        let result = match self.device.as_mut() {
            Some(device) => device.samplers.remove(name).map(|sampler| {
                if let Some(object) = sampler.object {
                    self.profile.delete_sampler_object(device, object);
                }
            }),
            None => Err(RenderError::NotInitialized),
        };
        self.report(result, |_| {
            Some(RenderEvent::SamplerDestroyed {
                name: name.to_string(),
            })
        })
    }

    fn create_pipeline(&mut self, config: &PipelineConfig<'_>) -> Result<(), RenderError> {
        self.create_program(config)
    }

    fn set_pipeline(&mut self, name: &str) -> Result<(), RenderError> {
        self.set_program(name)
    }

    fn destroy_pipeline(&mut self, name: &str) -> Result<(), RenderError> {
        let result = self.device_mut().and_then(|d| d.destroy_program(name));
        self.report(result, |_| {
            Some(RenderEvent::PipelineDestroyed {
                name: name.to_string(),
            })
        })
    }

    fn has_pipeline(&self, name: &str) -> bool {
        self.device()
            .map(|d| d.programs.contains(name))
            .unwrap_or(false)
    }

    fn create_render_target(
        &mut self,
        config: &RenderTargetConfig<'_>,
    ) -> Result<RenderTargetInfo, RenderError> {
        let result = match self.device.as_mut() {
            Some(device) => self.profile.create_render_target(device, config),
            None => Err(RenderError::NotInitialized),
        };
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
            d.apply_state(change);
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
            Some(device) => self.profile.set_msaa(device, enabled).map(|()| {
                device.tracker.set_msaa(enabled);
                Some(device.tracker.state().sample_count())
            }),
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
            log::warn!(
                "{}: Ignoring resize request to zero dimensions: {width}x{height}",
                P::LABEL
            );
            return Ok(());
        }
        let result = match self.device.as_mut() {
            Some(device) => {
                device.size = (width, height);
                device.gl.viewport(0, 0, width, height);
                self.profile.resize(device)
            }
            None => Err(RenderError::NotInitialized),
        };
        self.report(result, |_| Some(RenderEvent::Resize { width, height }))
    }

    fn render(&mut self, draw: &DrawCall<'_>) -> Result<(), RenderError> {
        let result = self.render_pass(draw);
        let draw_event = self.report(result, |_| None)?;
        let frame = self.frames.record_frame();
        if let Some(event) = draw_event {
            self.events.emit(event);
        }
        self.events.emit(RenderEvent::FrameRendered { frame });
        Ok(())
    }

    fn stats(&self) -> RenderStats {
        let mut stats = RenderStats {
            frame_count: self.frames.frame_count(),
            fps: self.frames.fps(),
            ..Default::default()
        };
        if let Some(device) = &self.device {
            stats.buffers = device.buffers.len();
            stats.textures = device.textures.len();
            stats.samplers = device.samplers.len();
            stats.pipelines = device.programs.len();
            stats.render_targets = device.render_targets.len();
            stats.vertex_arrays = self.profile.vertex_array_count();
            stats.msaa_target = self.profile.msaa_framebuffer().is_some();
        }
        stats
    }

    fn destroy(&mut self) {
        let Some(mut device) = self.device.take() else {
            return;
        };
        log::info!("{}: Destroying...", P::LABEL);
        self.profile.release(&mut device);
        device.release_all();
        self.profile = P::default();
        self.frames.reset();
        self.events.emit(RenderEvent::Destroyed);
    }
}
