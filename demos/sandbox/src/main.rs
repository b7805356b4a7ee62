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

// Prism Sandbox
// Opens a window and draws a spinning quad with whichever backend the window grants.

use std::mem;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use prism_core::event::{EventKind, RenderEvent};
use prism_core::renderer::api::{
    BindGroupConfig, BindGroupEntry, BindGroupLayoutSource, BindingResource, BufferConfig,
    DrawCall, IndexFormat, PipelineConfig, VertexAttribute, VertexFormat, VertexLayout,
    VertexStepMode,
};
use prism_core::{Renderer, RendererSettings};
use prism_infra::platform::{WinitSurface, WinitSurfaceBuilder};
use prism_infra::{create_preferred_renderer, init_logging, LoggingConfig};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

const SHADER: &str = r#"
struct Globals { mvp: mat4x4<f32> };
@group(0) @binding(0) var<uniform> globals: Globals;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = globals.mvp * vec4<f32>(position, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 3],
}

const ATTRIBUTES: [VertexAttribute; 2] = [
    // @location(0): position
    VertexAttribute {
        location: 0,
        format: VertexFormat::Float32x2,
        offset: 0,
    },
    // @location(1): color
    VertexAttribute {
        location: 1,
        format: VertexFormat::Float32x3,
        offset: mem::size_of::<[f32; 2]>() as u64,
    },
];

const VERTICES: &[Vertex] = &[
    Vertex {
        position: [-0.5, -0.5],
        color: [1.0, 0.0, 0.0],
    },
    Vertex {
        position: [0.5, -0.5],
        color: [0.0, 1.0, 0.0],
    },
    Vertex {
        position: [0.5, 0.5],
        color: [0.0, 0.0, 1.0],
    },
    Vertex {
        position: [-0.5, 0.5],
        color: [1.0, 1.0, 0.0],
    },
];

const INDICES: &[u16] = &[0, 1, 2, 0, 2, 3];

/// Column-major rotation about Z, corrected for the window's aspect ratio.
fn spin(angle: f32, aspect: f32) -> [f32; 16] {
    let (s, c) = angle.sin_cos();
    [
        c / aspect, s, 0.0, 0.0, //
        -s / aspect, c, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Reads settings from the JSON file named on the command line, if any.
fn load_settings() -> Result<RendererSettings> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(RendererSettings {
            msaa: true,
            clear_color: [0.05, 0.05, 0.08, 1.0],
            ..Default::default()
        });
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    RendererSettings::from_json_str(&json).with_context(|| format!("parsing {path}"))
}

struct Sandbox {
    settings: RendererSettings,
    surface: Option<WinitSurface>,
    renderer: Option<Box<dyn Renderer>>,
    started: Instant,
}

impl Sandbox {
    fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            surface: None,
            renderer: None,
            started: Instant::now(),
        }
    }

    fn setup(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let surface = WinitSurfaceBuilder::new()
            .with_title("Prism Sandbox")
            .build(event_loop)?;
        let mut renderer =
            create_preferred_renderer(Box::new(surface.clone()), self.settings.clone())
                .ok_or_else(|| anyhow!("the window supports no rendering backend"))?;
        renderer.on(
            EventKind::Initialized,
            Box::new(|event| {
                if let RenderEvent::Initialized { backend, context } = event {
                    log::info!("Rendering with the {backend} family on {context}.");
                }
            }),
        );
        pollster::block_on(renderer.initialize())?;

        let layouts = [VertexLayout {
            stride: mem::size_of::<Vertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }];
        renderer.create_pipeline(
            &PipelineConfig::new("quad", SHADER, SHADER).with_vertex_layouts(&layouts),
        )?;
        renderer.create_buffer(&BufferConfig::vertex(
            "quad_vertices",
            bytemuck::cast_slice(VERTICES),
        ))?;
        renderer.create_buffer(&BufferConfig::index(
            "quad_indices",
            bytemuck::cast_slice(INDICES),
            IndexFormat::Uint16,
        ))?;
        renderer.create_buffer(&BufferConfig::uniform(
            "globals",
            mem::size_of::<[f32; 16]>() as u64,
        ))?;
        renderer.create_bind_group(&BindGroupConfig {
            name: "globals_group",
            layout: BindGroupLayoutSource::Pipeline {
                pipeline: "quad",
                index: 0,
            },
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::buffer("globals"),
            }],
        })?;
        renderer.set_pipeline("quad")?;

        surface.request_redraw();
        self.surface = Some(surface);
        self.renderer = Some(renderer);
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        let (Some(renderer), Some(surface)) = (self.renderer.as_mut(), self.surface.as_ref())
        else {
            return Ok(());
        };
        let size = surface.window().inner_size();
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let mvp = spin(self.started.elapsed().as_secs_f32(), aspect);
        renderer.update_buffer("globals", bytemuck::cast_slice(&mvp), 0)?;
        renderer.render(
            &DrawCall::new()
                .vertex_buffer(0, "quad_vertices")
                .bind_group(0, "globals_group")
                .indexed("quad_indices", INDICES.len() as u32),
        )?;

        let stats = renderer.stats();
        if stats.frame_count % 600 == 0 {
            log::info!(
                "Frame {}: {:.1} fps, {} buffers, {} pipelines",
                stats.frame_count,
                stats.fps,
                stats.buffers,
                stats.pipelines
            );
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.destroy();
        }
        self.surface = None;
        log::info!("Sandbox shutdown complete.");
    }
}

impl ApplicationHandler for Sandbox {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }
        log::info!("Application resumed. Creating the window and renderer...");
        if let Err(error) = self.setup(event_loop) {
            log::error!("Sandbox setup failed: {error:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.surface.as_ref().map(|s| s.window().id()) != Some(id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutdown requested, exiting event loop...");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        log::warn!("Resize failed: {error}");
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(error) = self.draw_frame() {
                    log::error!("Frame failed: {error:#}");
                }
                if let Some(surface) = self.surface.as_ref() {
                    surface.request_redraw();
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let settings = load_settings()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut sandbox = Sandbox::new(settings);
    event_loop.run_app(&mut sandbox)?;
    Ok(())
}
