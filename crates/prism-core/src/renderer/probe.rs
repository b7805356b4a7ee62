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

//! Static backend support detection and the fallback policy.

use super::api::{BackendKind, ContextOptions};
use crate::native::{GlVersion, NativeContext, Surface};

/// Whether `context` is exactly the family `backend` asked for.
pub fn grants(backend: BackendKind, context: &NativeContext) -> bool {
    match (backend, context) {
        (BackendKind::Immediate, NativeContext::Gl(gl)) => gl.version() == GlVersion::Gl1,
        (BackendKind::Extended, NativeContext::Gl2(gl)) => gl.version() == GlVersion::Gl2,
        (BackendKind::Encoder, NativeContext::Gpu(_)) => true,
        _ => false,
    }
}

/// Checks whether `surface` can host a renderer of the given family.
///
/// A throwaway probe surface is created and asked for a context. The returned
/// context must belong to exactly the requested family; a lower-capability
/// context silently granted by the platform is rejected.
pub fn is_supported(backend: BackendKind, surface: &dyn Surface) -> bool {
    let Some(mut probe) = surface.create_probe() else {
        log::debug!("Probe: no probe surface available for the {backend} backend.");
        return false;
    };
    match probe.get_context(backend, &ContextOptions::default()) {
        Some(context) if grants(backend, &context) => true,
        Some(context) => {
            log::warn!(
                "Probe: requested a {backend} context but was granted {}; rejecting.",
                context.backend()
            );
            false
        }
        None => false,
    }
}

/// Walks `preferences` in order and returns the first supported backend.
pub fn select_backend(surface: &dyn Surface, preferences: &[BackendKind]) -> Option<BackendKind> {
    for &backend in preferences {
        log::info!("Probe: trying the {backend} backend...");
        if is_supported(backend, surface) {
            log::info!("Probe: selected the {backend} backend.");
            return Some(backend);
        }
        log::warn!("Probe: the {backend} backend is not supported, falling back.");
    }
    log::error!("Probe: no backend in {preferences:?} is supported.");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{GpuApi, GpuCanvas, NativeError};
    use async_trait::async_trait;

    struct StubCanvas;

    #[async_trait(?Send)]
    impl GpuCanvas for StubCanvas {
        fn describe(&self) -> String {
            "stub canvas".to_string()
        }

        async fn request_device(
            &mut self,
            _width: u32,
            _height: u32,
        ) -> Result<Box<dyn GpuApi>, NativeError> {
            Err(NativeError::Device("stub".to_string()))
        }
    }

    /// Grants only encoder contexts, optionally without a probe.
    struct EncoderOnly {
        probes: bool,
    }

    impl Surface for EncoderOnly {
        fn size(&self) -> (u32, u32) {
            (1, 1)
        }

        fn get_context(
            &mut self,
            backend: BackendKind,
            _options: &ContextOptions,
        ) -> Option<NativeContext> {
            (backend == BackendKind::Encoder).then(|| NativeContext::Gpu(Box::new(StubCanvas)))
        }

        fn create_probe(&self) -> Option<Box<dyn Surface>> {
            self.probes
                .then(|| Box::new(EncoderOnly { probes: false }) as Box<dyn Surface>)
        }
    }

    #[test]
    fn only_the_granted_family_is_supported() {
        let surface = EncoderOnly { probes: true };
        assert!(is_supported(BackendKind::Encoder, &surface));
        assert!(!is_supported(BackendKind::Extended, &surface));
        assert!(!is_supported(BackendKind::Immediate, &surface));
    }

    #[test]
    fn no_probe_means_unsupported() {
        let surface = EncoderOnly { probes: false };
        assert!(!is_supported(BackendKind::Encoder, &surface));
    }

    #[test]
    fn selection_walks_the_preferences() {
        let surface = EncoderOnly { probes: true };
        assert_eq!(
            select_backend(&surface, &[BackendKind::Immediate, BackendKind::Encoder]),
            Some(BackendKind::Encoder)
        );
        assert_eq!(select_backend(&surface, &[BackendKind::Extended]), None);
        assert_eq!(select_backend(&surface, &[]), None);
    }
}
