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

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use prism_core::event::{EventKind, RenderEvent};
use prism_core::native::GpuDraw;
use prism_core::renderer::api::{
    BindGroupConfig, BindGroupEntry, BindGroupLayoutSource, BindingResource, BufferConfig,
    DrawCall, IndexFormat, PipelineConfig, TextureConfig, VertexAttribute, VertexFormat,
    VertexLayout, VertexStepMode,
};
use prism_core::renderer::{RenderError, Renderer};
use prism_core::RendererSettings;
use prism_infra::headless::{GpuCall, HeadlessSurface};
use prism_infra::GpuRenderer;
use std::cell::RefCell;
use std::rc::Rc;

const QUAD_SHADER: &str = r#"
struct Globals { mvp: mat4x4<f32> };
@group(0) @binding(0) var<uniform> globals: Globals;
@vertex fn vs_main(@location(0) position: vec2<f32>, @location(1) uv: vec2<f32>) -> @builtin(position) vec4<f32> {
    return globals.mvp * vec4<f32>(position, 0.0, 1.0);
}
@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
    uv: [f32; 2],
}

const QUAD_VERTICES: [Vertex; 4] = [
    Vertex { position: [-0.5, -0.5], uv: [0.0, 1.0] },
    Vertex { position: [0.5, -0.5], uv: [1.0, 1.0] },
    Vertex { position: [0.5, 0.5], uv: [1.0, 0.0] },
    Vertex { position: [-0.5, 0.5], uv: [0.0, 0.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const QUAD_ATTRIBUTES: [VertexAttribute; 2] = [
    VertexAttribute {
        location: 0,
        format: VertexFormat::Float32x2,
        offset: 0,
    },
    VertexAttribute {
        location: 1,
        format: VertexFormat::Float32x2,
        offset: 8,
    },
];

fn initialized() -> Result<(GpuRenderer, HeadlessSurface)> {
    let surface = HeadlessSurface::new(64, 64);
    let mut renderer = GpuRenderer::new(Box::new(surface.clone()), RendererSettings::default());
    pollster::block_on(renderer.initialize())?;
    Ok((renderer, surface))
}

/// Collects every event of the given kinds.
fn record(renderer: &mut GpuRenderer, kinds: &[EventKind]) -> Rc<RefCell<Vec<RenderEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let sink = Rc::clone(&events);
        renderer.on(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    }
    events
}

fn build_quad(renderer: &mut GpuRenderer) -> Result<()> {
    let layouts = [VertexLayout {
        stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &QUAD_ATTRIBUTES,
    }];
    renderer.create_pipeline(
        &PipelineConfig::new("quad", QUAD_SHADER, QUAD_SHADER).with_vertex_layouts(&layouts),
    )?;
    renderer.create_buffer(&BufferConfig::vertex(
        "quad_vertices",
        bytemuck::cast_slice(&QUAD_VERTICES),
    ))?;
    renderer.create_buffer(&BufferConfig::index(
        "quad_indices",
        bytemuck::cast_slice(&QUAD_INDICES),
        IndexFormat::Uint16,
    ))?;
    renderer.create_buffer(&BufferConfig::uniform("globals", 64))?;
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
    Ok(())
}

fn quad_draw() -> DrawCall<'static> {
    DrawCall::new()
        .vertex_buffer(0, "quad_vertices")
        .bind_group(0, "globals_group")
        .indexed("quad_indices", 6)
}

#[test]
fn test_quad_renders_one_indexed_frame() -> Result<()> {
    let (mut renderer, surface) = initialized()?;
    let events = record(&mut renderer, &[EventKind::Draw, EventKind::FrameRendered]);

    build_quad(&mut renderer)?;
    renderer.set_pipeline("quad")?;
    renderer.render(&quad_draw())?;

    assert_eq!(
        *events.borrow(),
        vec![
            RenderEvent::Draw {
                indexed: true,
                count: 6,
                instances: 1
            },
            RenderEvent::FrameRendered { frame: 1 },
        ]
    );
    assert_eq!(renderer.stats().frame_count, 1);

    let passes = surface.gpu_log().render_passes();
    assert_eq!(passes.len(), 1);
    let pass = &passes[0];
    assert_eq!(pass.vertex_buffers.len(), 1);
    assert_eq!(pass.bind_groups.len(), 1);
    assert_eq!(pass.index_buffer.map(|(_, f)| f), Some(IndexFormat::Uint16));
    assert_eq!(
        pass.draw,
        Some(GpuDraw::Indexed {
            count: 6,
            instances: 1
        })
    );
    assert_eq!(surface.gpu_log().count(|c| matches!(c, GpuCall::Present)), 1);
    Ok(())
}

#[test]
fn test_render_without_pipeline_is_rejected() -> Result<()> {
    let (mut renderer, surface) = initialized()?;
    let events = record(&mut renderer, &[EventKind::FrameRendered, EventKind::Error]);

    let err = renderer.render(&DrawCall::new().vertices(3)).unwrap_err();
    assert_eq!(err, RenderError::NoPipelineSet);
    assert_eq!(renderer.stats().frame_count, 0);
    assert!(surface.gpu_log().render_passes().is_empty());
    assert_eq!(surface.gpu_log().count(|c| matches!(c, GpuCall::Present)), 0);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], RenderEvent::Error { .. }));
    Ok(())
}

#[test]
fn test_created_resources_report_their_metadata() -> Result<()> {
    let (mut renderer, _surface) = initialized()?;
    build_quad(&mut renderer)?;

    let vertices = renderer.buffer_info("quad_vertices").expect("vertex buffer");
    assert_eq!(vertices.size, 64);
    let indices = renderer.buffer_info("quad_indices").expect("index buffer");
    assert_eq!(indices.size, 12);
    assert_eq!(indices.index_format, Some(IndexFormat::Uint16));
    assert!(renderer.has_pipeline("quad"));
    assert!(renderer.buffer_info("missing").is_none());

    let stats = renderer.stats();
    assert_eq!(stats.buffers, 3);
    assert_eq!(stats.pipelines, 1);
    assert_eq!(stats.bind_groups, 1);
    Ok(())
}

#[test]
fn test_full_buffer_write_round_trips() -> Result<()> {
    let (mut renderer, _surface) = initialized()?;
    let initial: Vec<u8> = (0..16).collect();
    renderer.create_buffer(&BufferConfig::vertex("data", &initial))?;

    let replacement: Vec<u8> = (100..116).collect();
    renderer.update_buffer("data", &replacement, 0)?;
    assert_eq!(renderer.buffer_info("data").map(|i| i.size), Some(16));
    assert_eq!(renderer.read_buffer("data")?, replacement);
    Ok(())
}

#[test]
fn test_buffer_writes_read_back() -> Result<()> {
    let (mut renderer, _surface) = initialized()?;
    renderer.create_buffer(&BufferConfig::uniform("globals", 8))?;
    renderer.update_buffer("globals", &[7, 7, 7, 7], 4)?;
    assert_eq!(renderer.read_buffer("globals")?, vec![0, 0, 0, 0, 7, 7, 7, 7]);

    let err = renderer.update_buffer("globals", &[1; 8], 4).unwrap_err();
    assert_eq!(
        err,
        RenderError::BufferOverflow {
            name: "globals".to_string(),
            offset: 4,
            len: 8,
            capacity: 8,
        }
    );
    Ok(())
}

#[test]
fn test_texture_handle_is_stable_until_reallocation() -> Result<()> {
    let (mut renderer, surface) = initialized()?;
    let created = renderer.create_texture(&TextureConfig::rgba8("albedo", 2, 2).with_data(&[255; 16]))?;
    assert_eq!(renderer.texture_info("albedo"), Some(created.clone()));

    let same = renderer.update_texture("albedo", &[0; 16], None)?;
    assert_eq!(same.handle, created.handle);

    let grown = renderer.update_texture("albedo", &[0; 64], Some((4, 4)))?;
    assert_ne!(grown.handle, created.handle);
    assert_eq!((grown.width, grown.height), (4, 4));
    assert!(!surface
        .gpu_log()
        .is_live(prism_core::native::GpuHandle(created.handle)));
    Ok(())
}

#[test]
fn test_msaa_target_follows_toggle_and_resize() -> Result<()> {
    let (mut renderer, surface) = initialized()?;
    let multisampled = |width: u32| {
        move |c: &GpuCall| {
            matches!(c, GpuCall::CreateTexture { sample_count: 4, width: w, .. } if *w == width)
        }
    };

    renderer.set_msaa(true)?;
    assert!(renderer.stats().msaa_target);
    assert_eq!(surface.gpu_log().count(multisampled(64)), 1);

    renderer.resize(128, 96)?;
    assert_eq!(surface.gpu_log().surface_size(), (128, 96));
    assert_eq!(surface.gpu_log().count(multisampled(128)), 1);

    let resized = surface
        .gpu_log()
        .calls()
        .into_iter()
        .find_map(|c| match c {
            GpuCall::CreateTexture {
                handle,
                width: 128,
                sample_count: 4,
                ..
            } => Some(handle),
            _ => None,
        })
        .expect("multisample texture");
    renderer.set_msaa(false)?;
    assert!(!renderer.stats().msaa_target);
    assert!(!surface.gpu_log().is_live(resized));
    Ok(())
}

#[test]
fn test_multisampled_pass_resolves_into_the_surface() -> Result<()> {
    let (mut renderer, surface) = initialized()?;
    renderer.set_msaa(true)?;
    build_quad(&mut renderer)?;
    renderer.set_pipeline("quad")?;
    renderer.render(&quad_draw())?;

    let passes = surface.gpu_log().render_passes();
    assert_eq!(passes.len(), 1);
    assert!(passes[0].color.resolve_target.is_some());
    Ok(())
}

#[test]
fn test_broken_shader_is_reported_with_its_stage() -> Result<()> {
    let (mut renderer, _surface) = initialized()?;
    let source = format!("{QUAD_SHADER}\n{}", prism_infra::headless::COMPILE_ERROR_MARKER);
    let err = renderer
        .create_pipeline(&PipelineConfig::new("broken", &source, &source))
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::CompileOrLinkFailed {
            stage: prism_core::renderer::ShaderStage::Vertex,
            ..
        }
    ));
    assert!(!renderer.has_pipeline("broken"));
    Ok(())
}

#[test]
fn test_destroy_releases_everything() -> Result<()> {
    let (mut renderer, surface) = initialized()?;
    build_quad(&mut renderer)?;
    renderer.set_msaa(true)?;
    renderer.create_texture(&TextureConfig::rgba8("albedo", 2, 2))?;

    renderer.destroy();
    assert!(!renderer.is_initialized());
    assert_eq!(surface.gpu_log().live_objects(), 0);

    let stats = renderer.stats();
    assert_eq!(stats.buffers, 0);
    assert_eq!(stats.pipelines, 0);
    assert_eq!(stats.bind_groups, 0);
    assert!(!stats.msaa_target);

    assert_eq!(
        renderer
            .create_buffer(&BufferConfig::uniform("late", 16))
            .unwrap_err(),
        RenderError::NotInitialized
    );
    // A second destroy is a no-op.
    renderer.destroy();
    Ok(())
}
