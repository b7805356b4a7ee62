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

use super::conversions::from_wgpu_format;
use super::device::WgpuDevice;
use async_trait::async_trait;
use prism_core::native::{GpuApi, GpuCanvas, NativeError};
use std::sync::Arc;
use winit::window::Window;

/// An encoder-based canvas over a winit window.
///
/// The WGPU instance, surface, adapter and device are only created when a
/// renderer requests the device, so constructing a canvas is cheap and is
/// also what the capability probe does.
pub struct WgpuCanvas {
    window: Arc<Window>,
    power_preference: wgpu::PowerPreference,
}

impl WgpuCanvas {
    /// Creates a canvas for a window.
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }

    /// Overrides the adapter power preference.
    pub fn with_power_preference(mut self, power_preference: wgpu::PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }
}

#[async_trait(?Send)]
impl GpuCanvas for WgpuCanvas {
    fn describe(&self) -> String {
        format!("WGPU canvas ({:?})", self.power_preference)
    }

    async fn request_device(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Box<dyn GpuApi>, NativeError> {
        log::info!("Initializing WGPU device for a {width}x{height} surface...");

        // --- 1. Instance and surface ---
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(self.window.clone())
            .map_err(|e| NativeError::Surface(format!("Failed to create surface: {e}")))?;
        log::debug!("WGPU surface created for the window.");

        // --- 2. Adapter, device and queue ---
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| NativeError::Device(format!("No suitable adapter: {e}")))?;
        let adapter_info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Prism Logical Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await
            .map_err(|e| NativeError::Device(format!("Failed to create logical device: {e}")))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        // --- 3. Surface configuration ---
        let caps = surface.get_capabilities(&adapter);
        let (native_format, format) = caps
            .formats
            .iter()
            .copied()
            .filter_map(|f| from_wgpu_format(f).map(|prism| (f, prism)))
            .find(|(f, _)| f.is_srgb())
            .or_else(|| {
                caps.formats
                    .iter()
                    .copied()
                    .find_map(|f| from_wgpu_format(f).map(|prism| (f, prism)))
            })
            .ok_or_else(|| {
                NativeError::Surface(format!(
                    "The surface offers no supported format: {:?}",
                    caps.formats
                ))
            })?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: native_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: caps
                .present_modes
                .iter()
                .copied()
                .find(|m| *m == wgpu::PresentMode::Mailbox)
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!("Surface configured with {format:?} ({:?}).", config.present_mode);

        Ok(Box::new(WgpuDevice::new(
            device,
            queue,
            surface,
            config,
            format,
            adapter_info,
        )))
    }
}

