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
use prism_core::event::{EventKind, RenderEvent};
use prism_core::native::{Capability, ClearMask};
use prism_core::renderer::api::{
    AttributePointer, BackendKind, BufferConfig, DrawCall, IndexFormat, PipelineConfig,
    TextureConfig, UniformValue,
};
use prism_core::renderer::{RenderError, Renderer, ShaderStage};
use prism_core::RendererSettings;
use prism_infra::headless::{GlCall, HeadlessSurface, COMPILE_ERROR_MARKER, LINK_ERROR_MARKER};
use prism_infra::{Gl2Renderer, GlRenderer};
use std::cell::RefCell;
use std::rc::Rc;

const QUAD_VS: &str = "attribute vec2 a_position;
attribute vec2 a_uv;
uniform mat4 u_mvp;
varying vec2 v_uv;
void main() { v_uv = a_uv; gl_Position = u_mvp * vec4(a_position, 0.0, 1.0); }";

const QUAD_FS: &str = "precision mediump float;
varying vec2 v_uv;
uniform sampler2D u_texture;
void main() { gl_FragColor = texture2D(u_texture, v_uv); }";

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

fn quad_vertices() -> Vec<u8> {
    let vertices: [f32; 16] = [
        -0.5, -0.5, 0.0, 1.0, //
        0.5, -0.5, 1.0, 1.0, //
        0.5, 0.5, 1.0, 0.0, //
        -0.5, 0.5, 0.0, 0.0,
    ];
    vertices.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn quad_indices() -> Vec<u8> {
    [0u16, 1, 2, 0, 2, 3]
        .iter()
        .flat_map(|i| i.to_ne_bytes())
        .collect()
}

fn quad_pointers() -> Vec<AttributePointer> {
    vec![
        AttributePointer::float("a_position", 2, 16, 0),
        AttributePointer::float("a_uv", 2, 16, 8),
    ]
}

fn gl() -> Result<(GlRenderer, HeadlessSurface)> {
    let surface = HeadlessSurface::new(64, 64);
    let mut renderer = GlRenderer::new(Box::new(surface.clone()), RendererSettings::default());
    pollster::block_on(renderer.initialize())?;
    Ok((renderer, surface))
}

fn gl2() -> Result<(Gl2Renderer, HeadlessSurface)> {
    let surface = HeadlessSurface::new(64, 64);
    let mut renderer = Gl2Renderer::new(Box::new(surface.clone()), RendererSettings::default());
    pollster::block_on(renderer.initialize())?;
    Ok((renderer, surface))
}

fn record(renderer: &mut dyn Renderer, kinds: &[EventKind]) -> Rc<RefCell<Vec<RenderEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let sink = Rc::clone(&events);
        renderer.on(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    }
    events
}

/// Creates the quad's buffers and program, without making it current.
fn build_quad(renderer: &mut dyn Renderer) -> Result<()> {
    renderer.create_buffer(&BufferConfig::vertex("quad_vertices", &quad_vertices()))?;
    renderer.create_buffer(&BufferConfig::index(
        "quad_indices",
        &quad_indices(),
        IndexFormat::Uint16,
    ))?;
    renderer.create_pipeline(&PipelineConfig::new("quad", QUAD_VS, QUAD_FS))?;
    Ok(())
}

fn position_of(calls: &[GlCall], predicate: impl Fn(&GlCall) -> bool) -> Option<usize> {
    calls.iter().position(predicate)
}

#[test]
fn test_initialize_applies_default_states() -> Result<()> {
    let (renderer, surface) = gl()?;
    let state = renderer.render_state();
    assert!(state.depth_test);
    assert!(state.blend);
    assert!(state.cull_face);
    assert_eq!(state.clear_color, RendererSettings::default().clear_color);

    let log = surface.gl_log();
    for cap in [Capability::DepthTest, Capability::Blend, Capability::CullFace] {
        assert_eq!(log.count(|c| *c == GlCall::Enable(cap)), 1, "{cap:?}");
    }
    assert_eq!(log.count(|c| matches!(c, GlCall::ClearColor(_))), 1);
    Ok(())
}

#[test]
fn test_quad_draws_indexed_elements() -> Result<()> {
    let (mut renderer, surface) = gl()?;
    build_quad(&mut renderer)?;
    renderer.set_program("quad")?;
    let applied = renderer.setup_vertex_attributes("quad_vertices", &quad_pointers())?;
    assert_eq!(applied, 2);
    renderer.set_uniform("u_mvp", UniformValue::Mat4(IDENTITY))?;

    let events = record(&mut renderer, &[EventKind::Draw, EventKind::FrameRendered]);
    surface.gl_log().clear_calls();
    renderer.render(
        &DrawCall::new()
            .vertex_buffer(0, "quad_vertices")
            .indexed("quad_indices", 6),
    )?;

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
    assert_eq!(
        surface.gl_log().count(|c| matches!(
            c,
            GlCall::DrawElements {
                count: 6,
                format: IndexFormat::Uint16,
                ..
            }
        )),
        1
    );
    // The stored layout is reapplied for the listed buffer.
    assert_eq!(
        surface
            .gl_log()
            .count(|c| matches!(c, GlCall::VertexAttribPointer(..))),
        2
    );
    Ok(())
}

#[test]
fn test_unknown_attributes_and_uniforms_are_skipped() -> Result<()> {
    let (mut renderer, surface) = gl()?;
    build_quad(&mut renderer)?;
    renderer.set_program("quad")?;

    let mut pointers = quad_pointers();
    pointers.push(AttributePointer::float("a_normal", 3, 16, 0));
    assert_eq!(
        renderer.setup_vertex_attributes("quad_vertices", &pointers)?,
        2
    );

    surface.gl_log().clear_calls();
    renderer.set_uniform("u_missing", UniformValue::Float(1.0))?;
    assert_eq!(
        surface
            .gl_log()
            .count(|c| matches!(c, GlCall::Uniform(..))),
        0
    );
    Ok(())
}

#[test]
fn test_buffer_writes_land_in_the_native_store() -> Result<()> {
    let (mut renderer, surface) = gl()?;
    renderer.create_buffer(&BufferConfig::vertex("data", &[0; 8]))?;
    let handle = surface
        .gl_log()
        .calls()
        .into_iter()
        .find_map(|c| match c {
            GlCall::CreateBuffer(handle) => Some(handle),
            _ => None,
        })
        .expect("buffer name");

    renderer.update_buffer("data", &[5; 8], 0)?;
    assert_eq!(surface.gl_log().buffer_contents(handle), Some(vec![5; 8]));
    assert_eq!(renderer.buffer_info("data").map(|i| i.size), Some(8));

    renderer.update_buffer("data", &[0; 4], 0)?;
    renderer.update_buffer("data", &[1, 2, 3, 4], 4)?;
    assert_eq!(
        surface.gl_log().buffer_contents(handle),
        Some(vec![0, 0, 0, 0, 1, 2, 3, 4])
    );

    // A full write from zero may grow the store.
    renderer.update_buffer("data", &[9; 12], 0)?;
    assert_eq!(surface.gl_log().buffer_contents(handle), Some(vec![9; 12]));
    assert_eq!(renderer.buffer_info("data").map(|i| i.size), Some(12));

    let err = renderer.update_buffer("data", &[1; 4], 10).unwrap_err();
    assert!(matches!(err, RenderError::BufferOverflow { capacity: 12, .. }));
    Ok(())
}

#[test]
fn test_buffer_write_past_the_address_space_is_an_overflow() -> Result<()> {
    let (mut renderer, surface) = gl()?;
    renderer.create_buffer(&BufferConfig::uniform("u", 64))?;
    surface.gl_log().clear_calls();

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
    assert!(surface.gl_log().calls().is_empty());
    Ok(())
}

#[test]
fn test_setting_the_current_program_again_is_silent() -> Result<()> {
    let (mut renderer, surface) = gl()?;
    build_quad(&mut renderer)?;
    let events = record(&mut renderer, &[EventKind::ProgramSet]);
    surface.gl_log().clear_calls();

    renderer.set_program("quad")?;
    renderer.set_program("quad")?;

    assert_eq!(events.borrow().len(), 1);
    assert_eq!(
        surface
            .gl_log()
            .count(|c| matches!(c, GlCall::UseProgram(Some(_)))),
        1
    );
    Ok(())
}

#[test]
fn test_render_without_program_is_rejected() -> Result<()> {
    let (mut renderer, surface) = gl()?;
    let events = record(&mut renderer, &[EventKind::FrameRendered]);
    let err = renderer.render(&DrawCall::new().vertices(3)).unwrap_err();
    assert_eq!(err, RenderError::NoProgramSet);
    assert!(events.borrow().is_empty());
    assert_eq!(
        surface
            .gl_log()
            .count(|c| matches!(c, GlCall::DrawArrays { .. })),
        0
    );
    Ok(())
}

#[test]
fn test_shader_failures_name_their_stage() -> Result<()> {
    let (mut renderer, surface) = gl()?;

    let broken = format!("{QUAD_VS}\n{COMPILE_ERROR_MARKER}");
    let err = renderer
        .create_pipeline(&PipelineConfig::new("broken", &broken, QUAD_FS))
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::CompileOrLinkFailed {
            stage: ShaderStage::Vertex,
            ..
        }
    ));

    let unlinkable = format!("{QUAD_FS}\n// {LINK_ERROR_MARKER}");
    let err = renderer
        .create_pipeline(&PipelineConfig::new("unlinkable", QUAD_VS, &unlinkable))
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::CompileOrLinkFailed {
            stage: ShaderStage::Link,
            ..
        }
    ));

    assert!(!renderer.has_pipeline("broken"));
    assert!(!renderer.has_pipeline("unlinkable"));
    // Failed attempts leave no shader or program objects behind.
    assert_eq!(surface.gl_log().live_objects(), 0);
    Ok(())
}

#[test]
fn test_texture_name_is_stable_until_reallocation() -> Result<()> {
    let (mut renderer, surface) = gl()?;
    let created = renderer.create_texture(&TextureConfig::rgba8("albedo", 2, 2))?;

    let same = renderer.update_texture("albedo", &[0; 16], None)?;
    assert_eq!(same.handle, created.handle);
    assert_eq!(
        surface
            .gl_log()
            .count(|c| matches!(c, GlCall::TexSubImage2D { width: 2, height: 2 })),
        1
    );

    let grown = renderer.update_texture("albedo", &[0; 64], Some((4, 4)))?;
    assert_ne!(grown.handle, created.handle);
    assert_eq!(renderer.texture_info("albedo"), Some(grown));

    let err = renderer.update_texture("albedo", &[0; 3], None).unwrap_err();
    assert!(matches!(err, RenderError::InvalidConfig { .. }));
    Ok(())
}

#[test]
fn test_immediate_context_has_no_msaa() -> Result<()> {
    let (mut renderer, _surface) = gl()?;
    let err = renderer.set_msaa(true).unwrap_err();
    assert_eq!(
        err,
        RenderError::Unsupported {
            backend: BackendKind::Immediate,
            operation: "set_msaa",
        }
    );
    assert!(!renderer.render_state().msaa);
    // Disabling is always possible.
    renderer.set_msaa(false)?;
    Ok(())
}

#[test]
fn test_extended_msaa_resolves_by_blitting() -> Result<()> {
    let (mut renderer, surface) = gl2()?;
    let events = record(&mut renderer, &[EventKind::MsaaChanged]);
    renderer.set_msaa(true)?;
    assert_eq!(
        *events.borrow(),
        vec![RenderEvent::MsaaChanged {
            enabled: true,
            sample_count: 4
        }]
    );
    assert_eq!(
        surface
            .gl2_log()
            .count(|c| matches!(c, GlCall::RenderbufferStorage { samples: 4, .. })),
        2
    );
    assert!(renderer.stats().msaa_target);

    build_quad(&mut renderer)?;
    renderer.set_program("quad")?;
    renderer.render(&DrawCall::new().vertices(3))?;
    assert_eq!(
        surface.gl2_log().count(|c| *c
            == GlCall::BlitFramebuffer {
                width: 64,
                height: 64,
                mask: ClearMask::COLOR,
            }),
        1
    );

    renderer.resize(32, 16)?;
    assert_eq!(
        surface.gl2_log().count(|c| matches!(
            c,
            GlCall::RenderbufferStorage {
                samples: 4,
                width: 32,
                height: 16,
                ..
            }
        )),
        2
    );

    renderer.set_msaa(false)?;
    assert!(!renderer.stats().msaa_target);
    surface.gl2_log().clear_calls();
    renderer.render(&DrawCall::new().vertices(3))?;
    assert_eq!(
        surface
            .gl2_log()
            .count(|c| matches!(c, GlCall::BlitFramebuffer { .. })),
        0
    );
    Ok(())
}

#[test]
fn test_vertex_array_wraps_the_draw() -> Result<()> {
    let (mut renderer, surface) = gl2()?;
    build_quad(&mut renderer)?;
    renderer.set_program("quad")?;
    let pointers = quad_pointers();
    renderer.create_vertex_array(
        "quad_vao",
        &[("quad_vertices", &pointers[..])],
        Some("quad_indices"),
    )?;
    let vao = surface
        .gl2_log()
        .calls()
        .into_iter()
        .find_map(|c| match c {
            GlCall::CreateVertexArray(handle) => Some(handle),
            _ => None,
        })
        .expect("vertex array name");
    assert_eq!(renderer.stats().vertex_arrays, 1);

    renderer.set_vertex_array(Some("quad_vao"))?;
    surface.gl2_log().clear_calls();
    renderer.render(&DrawCall::new().indexed("quad_indices", 6))?;

    let calls = surface.gl2_log().calls();
    let bind = position_of(&calls, |c| *c == GlCall::BindVertexArray(Some(vao)));
    let draw = position_of(&calls, |c| matches!(c, GlCall::DrawElements { count: 6, .. }));
    let unbind = position_of(&calls, |c| *c == GlCall::BindVertexArray(None));
    assert!(bind.is_some() && draw.is_some() && unbind.is_some());
    assert!(bind < draw && draw < unbind);

    let err = renderer.set_vertex_array(Some("missing")).unwrap_err();
    assert!(matches!(err, RenderError::NotFound { .. }));
    Ok(())
}

#[test]
fn test_vertex_array_requires_a_program() -> Result<()> {
    let (mut renderer, _surface) = gl2()?;
    build_quad(&mut renderer)?;
    let pointers = quad_pointers();
    let err = renderer
        .create_vertex_array("quad_vao", &[("quad_vertices", &pointers[..])], None)
        .unwrap_err();
    assert_eq!(err, RenderError::NoProgramSet);
    assert_eq!(renderer.stats().vertex_arrays, 0);
    Ok(())
}

#[test]
fn test_destroy_deletes_every_native_object() -> Result<()> {
    let (mut renderer, surface) = gl2()?;
    build_quad(&mut renderer)?;
    renderer.set_program("quad")?;
    let pointers = quad_pointers();
    renderer.create_vertex_array("quad_vao", &[("quad_vertices", &pointers[..])], None)?;
    renderer.create_texture(&TextureConfig::rgba8("albedo", 2, 2))?;
    renderer.set_msaa(true)?;
    let events = record(&mut renderer, &[EventKind::Destroyed]);

    renderer.destroy();
    renderer.destroy();

    assert_eq!(events.borrow().len(), 1);
    assert_eq!(surface.gl2_log().live_objects(), 0);
    assert_eq!(renderer.stats().buffers, 0);
    assert_eq!(
        renderer.set_program("quad").unwrap_err(),
        RenderError::NotInitialized
    );
    assert_eq!(
        renderer.render(&DrawCall::new().vertices(3)).unwrap_err(),
        RenderError::NotInitialized
    );
    Ok(())
}
