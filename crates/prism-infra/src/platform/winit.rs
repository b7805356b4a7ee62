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

//! A `winit`-backed implementation of the [`Surface`] contract.

use crate::graphics::wgpu::WgpuCanvas;
use prism_core::native::{NativeContext, Surface};
use prism_core::renderer::api::{BackendKind, ContextOptions};
use std::sync::Arc;
use winit::{dpi::LogicalSize, error::OsError, event_loop::ActiveEventLoop, window::Window};

/// A window surface.
///
/// Desktop windows only host the encoder-based family through WGPU; requests
/// for the immediate-mode families are declined, so backend selection falls
/// through to [`BackendKind::Encoder`]. Clones share the same window.
#[derive(Debug, Clone)]
pub struct WinitSurface {
    inner: Arc<Window>,
    power_preference: wgpu::PowerPreference,
}

impl WinitSurface {
    /// Wraps an existing window.
    pub fn from_window(window: Arc<Window>) -> Self {
        Self {
            inner: window,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }

    /// Overrides the adapter power preference used for new devices.
    pub fn with_power_preference(mut self, power_preference: wgpu::PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }

    /// The underlying window.
    pub fn window(&self) -> &Arc<Window> {
        &self.inner
    }

    /// Requests that the window be redrawn.
    pub fn request_redraw(&self) {
        self.inner.request_redraw();
    }
}

impl Surface for WinitSurface {
    /// Returns the physical dimensions of the window's inner area.
    fn size(&self) -> (u32, u32) {
        let size = self.inner.inner_size();
        (size.width, size.height)
    }

    fn get_context(
        &mut self,
        backend: BackendKind,
        _options: &ContextOptions,
    ) -> Option<NativeContext> {
        match backend {
            BackendKind::Encoder => Some(NativeContext::Gpu(Box::new(
                WgpuCanvas::new(self.inner.clone()).with_power_preference(self.power_preference),
            ))),
            BackendKind::Immediate | BackendKind::Extended => {
                log::debug!("WinitSurface: no {backend} context on desktop windows.");
                None
            }
        }
    }

    /// Canvases are created lazily, so probing on the window itself is free.
    fn create_probe(&self) -> Option<Box<dyn Surface>> {
        Some(Box::new(self.clone()))
    }
}

/// A builder for creating [`WinitSurface`] instances.
pub struct WinitSurfaceBuilder {
    title: String,
    width: u32,
    height: u32,
}

impl WinitSurfaceBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            title: "Prism".to_string(),
            width: 1024,
            height: 768,
        }
    }

    /// Sets the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial inner dimensions of the window.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builds the window using the active `winit` event loop.
    ///
    /// # Errors
    /// Returns an `OsError` if the underlying `winit` window creation fails.
    pub fn build(self, event_loop: &ActiveEventLoop) -> Result<WinitSurface, OsError> {
        log::info!(
            "Building window with title: '{}' and size: {}x{}",
            self.title,
            self.width,
            self.height
        );

        let attributes = Window::default_attributes()
            .with_title(self.title)
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_visible(true);

        let window = event_loop.create_window(attributes)?;

        log::info!("Winit window created successfully (id: {:?}).", window.id());
        Ok(WinitSurface::from_window(Arc::new(window)))
    }
}

impl Default for WinitSurfaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
