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

//! The three renderers and the factory that picks one for a surface.

pub mod gl;
pub mod gpu;
pub mod wgpu;

pub use self::gl::{Gl2Renderer, GlRenderer};
pub use self::gpu::GpuRenderer;

use prism_core::native::Surface;
use prism_core::renderer::api::BackendKind;
use prism_core::renderer::probe;
use prism_core::{Renderer, RendererSettings};

/// Constructs the renderer of the given family. Nothing is probed or
/// acquired until [`Renderer::initialize`] runs.
pub fn create_renderer(
    backend: BackendKind,
    surface: Box<dyn Surface>,
    settings: RendererSettings,
) -> Box<dyn Renderer> {
    log::debug!("Creating a {backend} renderer.");
    match backend {
        BackendKind::Immediate => Box::new(GlRenderer::new(surface, settings)),
        BackendKind::Extended => Box::new(Gl2Renderer::new(surface, settings)),
        BackendKind::Encoder => Box::new(GpuRenderer::new(surface, settings)),
    }
}

/// Probes `settings.backend_preference` in order and constructs a renderer
/// for the first family the surface supports.
pub fn create_preferred_renderer(
    surface: Box<dyn Surface>,
    settings: RendererSettings,
) -> Option<Box<dyn Renderer>> {
    let backend = probe::select_backend(surface.as_ref(), &settings.backend_preference)?;
    Some(create_renderer(backend, surface, settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessSurface;

    #[test]
    fn preferred_renderer_falls_back_to_the_first_supported_family() {
        let surface = HeadlessSurface::new(32, 32).with_backends(&[BackendKind::Immediate]);
        let renderer = create_preferred_renderer(Box::new(surface), RendererSettings::default());
        assert_eq!(
            renderer.map(|r| r.backend()),
            Some(BackendKind::Immediate)
        );
    }

    #[test]
    fn no_supported_family_means_no_renderer() {
        let surface = HeadlessSurface::new(32, 32).with_backends(&[]);
        assert!(create_preferred_renderer(Box::new(surface), RendererSettings::default()).is_none());
    }

    #[test]
    fn factory_builds_the_requested_family() {
        for backend in BackendKind::FALLBACK_ORDER {
            let surface = Box::new(HeadlessSurface::new(8, 8));
            let renderer = create_renderer(backend, surface, RendererSettings::default());
            assert_eq!(renderer.backend(), backend);
            assert!(!renderer.is_initialized());
        }
    }
}
