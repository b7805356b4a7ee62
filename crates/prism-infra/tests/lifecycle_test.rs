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
use prism_core::renderer::api::{BackendKind, BufferConfig, DrawCall};
use prism_core::renderer::{probe, RenderError, Renderer};
use prism_core::RendererSettings;
use prism_infra::headless::HeadlessSurface;
use prism_infra::{create_preferred_renderer, create_renderer, Gl2Renderer, GlRenderer, GpuRenderer};
use std::cell::RefCell;
use std::rc::Rc;

fn record(renderer: &mut dyn Renderer, kinds: &[EventKind]) -> Rc<RefCell<Vec<RenderEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let sink = Rc::clone(&events);
        renderer.on(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    }
    events
}

#[test]
fn test_every_family_initializes_on_a_full_surface() -> Result<()> {
    for backend in BackendKind::FALLBACK_ORDER {
        let surface = HeadlessSurface::new(320, 240);
        let mut renderer = create_renderer(
            backend,
            Box::new(surface.clone()),
            RendererSettings::default(),
        );
        let events = record(renderer.as_mut(), &[EventKind::Initialized]);
        pollster::block_on(renderer.initialize())?;

        assert!(renderer.is_initialized());
        assert_eq!(renderer.backend(), backend);
        let state = renderer.render_state();
        assert!(state.depth_test && state.blend && state.cull_face);

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RenderEvent::Initialized {
                backend: reported,
                context,
            } => {
                assert_eq!(*reported, backend);
                assert!(context.ends_with("(320x240)"), "{context}");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn test_calls_before_initialize_are_rejected() {
    let surface = HeadlessSurface::new(64, 64);
    for backend in BackendKind::FALLBACK_ORDER {
        let mut renderer = create_renderer(
            backend,
            Box::new(surface.clone()),
            RendererSettings::default(),
        );
        assert!(!renderer.is_initialized());
        assert_eq!(
            renderer
                .create_buffer(&BufferConfig::uniform("early", 16))
                .unwrap_err(),
            RenderError::NotInitialized
        );
        assert_eq!(
            renderer.render(&DrawCall::new().vertices(3)).unwrap_err(),
            RenderError::NotInitialized
        );
        assert_eq!(renderer.set_msaa(true).unwrap_err(), RenderError::NotInitialized);
        assert_eq!(renderer.stats().frame_count, 0);
        assert!(renderer.buffer_info("early").is_none());
        // Destroying an uninitialized renderer does nothing.
        renderer.destroy();
    }
}

#[test]
fn test_downgraded_extended_context_is_unsupported() -> Result<()> {
    let surface = HeadlessSurface::new(64, 64).downgrading_extended();
    assert!(!Gl2Renderer::is_supported(&surface));
    assert!(GlRenderer::is_supported(&surface));

    let mut renderer = Gl2Renderer::new(Box::new(surface.clone()), RendererSettings::default());
    let events = record(&mut renderer, &[EventKind::Error, EventKind::Initialized]);
    let err = pollster::block_on(renderer.initialize()).unwrap_err();
    assert_eq!(err, RenderError::UnsupportedBackend(BackendKind::Extended));
    assert!(!renderer.is_initialized());

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], RenderEvent::Error { .. }));
    Ok(())
}

#[test]
fn test_backend_selection_follows_preferences() {
    let surface = HeadlessSurface::new(64, 64)
        .with_backends(&[BackendKind::Immediate, BackendKind::Extended])
        .downgrading_extended();
    assert_eq!(
        probe::select_backend(&surface, &BackendKind::FALLBACK_ORDER),
        Some(BackendKind::Immediate)
    );

    let surface = HeadlessSurface::new(64, 64);
    assert_eq!(
        probe::select_backend(&surface, &[BackendKind::Extended, BackendKind::Encoder]),
        Some(BackendKind::Extended)
    );

    let surface = HeadlessSurface::new(64, 64).with_backends(&[]);
    assert_eq!(
        probe::select_backend(&surface, &BackendKind::FALLBACK_ORDER),
        None
    );
}

#[test]
fn test_preferred_renderer_initializes() -> Result<()> {
    let surface =
        HeadlessSurface::new(64, 64).with_backends(&[BackendKind::Extended, BackendKind::Immediate]);
    let mut renderer =
        create_preferred_renderer(Box::new(surface.clone()), RendererSettings::default())
            .expect("a supported family");
    assert_eq!(renderer.backend(), BackendKind::Extended);
    pollster::block_on(renderer.initialize())?;
    assert!(renderer.is_initialized());
    Ok(())
}

#[test]
fn test_failed_initialization_can_be_retried() -> Result<()> {
    let surface = HeadlessSurface::new(64, 64);
    surface.deny_contexts(true);
    let mut renderer = GlRenderer::new(Box::new(surface.clone()), RendererSettings::default());

    let err = pollster::block_on(renderer.initialize()).unwrap_err();
    assert!(matches!(
        err,
        RenderError::ContextAcquisitionFailed {
            backend: BackendKind::Immediate,
            ..
        }
    ));
    assert!(!renderer.is_initialized());

    surface.deny_contexts(false);
    pollster::block_on(renderer.initialize())?;
    assert!(renderer.is_initialized());
    Ok(())
}

#[test]
fn test_device_failure_leaves_the_renderer_uninitialized() -> Result<()> {
    let surface = HeadlessSurface::new(64, 64);
    surface.gpu_log().fail_device(true);
    let mut renderer = GpuRenderer::new(Box::new(surface.clone()), RendererSettings::default());

    let err = pollster::block_on(renderer.initialize()).unwrap_err();
    match err {
        RenderError::ContextAcquisitionFailed { backend, reason } => {
            assert_eq!(backend, BackendKind::Encoder);
            assert!(reason.contains("no adapter available"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!renderer.is_initialized());

    surface.gpu_log().fail_device(false);
    pollster::block_on(renderer.initialize())?;
    assert!(renderer.is_initialized());
    Ok(())
}

#[test]
fn test_missing_encoder_support_is_reported() {
    let surface = HeadlessSurface::new(64, 64).with_backends(&[BackendKind::Immediate]);
    let mut renderer = GpuRenderer::new(Box::new(surface), RendererSettings::default());
    assert_eq!(
        pollster::block_on(renderer.initialize()).unwrap_err(),
        RenderError::UnsupportedBackend(BackendKind::Encoder)
    );
}

#[test]
fn test_panicking_listener_does_not_stop_delivery() -> Result<()> {
    let surface = HeadlessSurface::new(64, 64);
    let mut renderer = GlRenderer::new(Box::new(surface), RendererSettings::default());
    renderer.on(
        EventKind::Initialized,
        Box::new(|_| panic!("listener failure")),
    );
    let events = record(&mut renderer, &[EventKind::Initialized]);

    pollster::block_on(renderer.initialize())?;
    assert!(renderer.is_initialized());
    assert_eq!(events.borrow().len(), 1);
    Ok(())
}

#[test]
fn test_msaa_setting_applies_on_initialize() -> Result<()> {
    let settings = RendererSettings::from_json_str(r#"{ "msaa": true }"#)?;

    let mut extended = Gl2Renderer::new(Box::new(HeadlessSurface::new(64, 64)), settings.clone());
    pollster::block_on(extended.initialize())?;
    assert!(extended.render_state().msaa);
    assert!(extended.stats().msaa_target);

    // The immediate family cannot multisample but still initializes.
    let mut immediate = GlRenderer::new(Box::new(HeadlessSurface::new(64, 64)), settings);
    pollster::block_on(immediate.initialize())?;
    assert!(!immediate.render_state().msaa);
    Ok(())
}

#[test]
fn test_resize_to_zero_is_ignored() -> Result<()> {
    let surface = HeadlessSurface::new(64, 64);
    let mut renderer = GpuRenderer::new(Box::new(surface.clone()), RendererSettings::default());
    pollster::block_on(renderer.initialize())?;
    let events = record(&mut renderer, &[EventKind::Resize]);

    renderer.resize(0, 32)?;
    assert!(events.borrow().is_empty());
    assert_eq!(surface.gpu_log().surface_size(), (64, 64));

    renderer.resize(100, 50)?;
    assert_eq!(
        *events.borrow(),
        vec![RenderEvent::Resize {
            width: 100,
            height: 50
        }]
    );
    assert_eq!(surface.gpu_log().surface_size(), (100, 50));
    Ok(())
}

#[test]
fn test_listeners_survive_destroy_and_reinitialize() -> Result<()> {
    let surface = HeadlessSurface::new(64, 64);
    let mut renderer = GlRenderer::new(Box::new(surface), RendererSettings::default());
    let events = record(&mut renderer, &[EventKind::Initialized, EventKind::Destroyed]);

    pollster::block_on(renderer.initialize())?;
    renderer.destroy();
    pollster::block_on(renderer.initialize())?;

    let kinds: Vec<&str> = events.borrow().iter().map(RenderEvent::name).collect();
    assert_eq!(kinds, vec!["initialized", "destroyed", "initialized"]);
    Ok(())
}
