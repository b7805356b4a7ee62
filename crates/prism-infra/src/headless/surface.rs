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

//! A windowless surface backed by the recording native doubles.

use super::gl::{GlLog, HeadlessGl};
use super::gpu::{GpuLog, HeadlessCanvas};
use prism_core::native::{GlVersion, NativeContext, Surface};
use prism_core::renderer::api::{BackendKind, ContextOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A surface with configurable backend support.
///
/// Clones share the same native doubles and switches, so a test can keep a
/// clone to inspect call logs after handing the surface to a renderer.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    size: (u32, u32),
    supported: Vec<BackendKind>,
    downgrade_extended: bool,
    deny_contexts: Arc<AtomicBool>,
    gl: HeadlessGl,
    gl_log: GlLog,
    gl2: HeadlessGl,
    gl2_log: GlLog,
    canvas: HeadlessCanvas,
    gpu_log: GpuLog,
}

impl HeadlessSurface {
    /// A surface of the given size supporting every backend family.
    pub fn new(width: u32, height: u32) -> Self {
        let (gl, gl_log) = HeadlessGl::new(GlVersion::Gl1);
        let (gl2, gl2_log) = HeadlessGl::new(GlVersion::Gl2);
        let (canvas, gpu_log) = HeadlessCanvas::new();
        Self {
            size: (width, height),
            supported: BackendKind::FALLBACK_ORDER.to_vec(),
            downgrade_extended: false,
            deny_contexts: Arc::new(AtomicBool::new(false)),
            gl,
            gl_log,
            gl2,
            gl2_log,
            canvas,
            gpu_log,
        }
    }

    /// Restricts the supported backend families.
    pub fn with_backends(mut self, backends: &[BackendKind]) -> Self {
        self.supported = backends.to_vec();
        self
    }

    /// Answers extended-context requests with an immediate context, the way
    /// some platforms silently fall back.
    pub fn downgrading_extended(mut self) -> Self {
        self.downgrade_extended = true;
        self
    }

    /// Makes context requests on this surface (not on its probes) fail.
    pub fn deny_contexts(&self, deny: bool) {
        self.deny_contexts.store(deny, Ordering::SeqCst);
    }

    /// Calls made on the immediate context.
    pub fn gl_log(&self) -> &GlLog {
        &self.gl_log
    }

    /// Calls made on the extended context.
    pub fn gl2_log(&self) -> &GlLog {
        &self.gl2_log
    }

    /// Calls made on devices requested from the canvas.
    pub fn gpu_log(&self) -> &GpuLog {
        &self.gpu_log
    }
}

impl Surface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn get_context(
        &mut self,
        backend: BackendKind,
        _options: &ContextOptions,
    ) -> Option<NativeContext> {
        if self.deny_contexts.load(Ordering::SeqCst) {
            log::debug!("HeadlessSurface: denying a {backend} context.");
            return None;
        }
        if backend == BackendKind::Extended && self.downgrade_extended {
            return Some(NativeContext::Gl(Box::new(self.gl.clone())));
        }
        if !self.supported.contains(&backend) {
            return None;
        }
        Some(match backend {
            BackendKind::Immediate => NativeContext::Gl(Box::new(self.gl.clone())),
            BackendKind::Extended => NativeContext::Gl2(Box::new(self.gl2.clone())),
            BackendKind::Encoder => NativeContext::Gpu(Box::new(self.canvas.clone())),
        })
    }

    fn create_probe(&self) -> Option<Box<dyn Surface>> {
        let mut probe = HeadlessSurface::new(1, 1).with_backends(&self.supported);
        probe.downgrade_extended = self.downgrade_extended;
        Some(Box::new(probe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::probe;

    #[test]
    fn probe_rejects_a_downgraded_context() {
        let surface = HeadlessSurface::new(8, 8).downgrading_extended();
        assert!(probe::is_supported(BackendKind::Immediate, &surface));
        assert!(!probe::is_supported(BackendKind::Extended, &surface));
    }

    #[test]
    fn selection_walks_the_preferences() {
        let surface = HeadlessSurface::new(8, 8)
            .with_backends(&[BackendKind::Immediate, BackendKind::Extended]);
        assert_eq!(
            probe::select_backend(&surface, &BackendKind::FALLBACK_ORDER),
            Some(BackendKind::Extended)
        );
        let none = HeadlessSurface::new(8, 8).with_backends(&[]);
        assert_eq!(
            probe::select_backend(&none, &BackendKind::FALLBACK_ORDER),
            None
        );
    }

    #[test]
    fn denial_does_not_affect_probes() {
        let mut surface = HeadlessSurface::new(8, 8);
        surface.deny_contexts(true);
        assert!(probe::is_supported(BackendKind::Encoder, &surface));
        assert!(surface
            .get_context(BackendKind::Encoder, &ContextOptions::default())
            .is_none());
    }
}
