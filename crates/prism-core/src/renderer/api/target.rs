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

//! Offscreen render targets.

use super::format::TextureFormat;
use crate::renderer::{RenderError, ResourceKind};

/// Everything needed to create a named offscreen render target.
#[derive(Debug, Clone, Copy)]
pub struct RenderTargetConfig<'a> {
    /// The registry key.
    pub name: &'a str,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// The color attachment format.
    pub format: TextureFormat,
    /// Samples per pixel. Must be 1 or 4.
    pub sample_count: u32,
    /// Whether a depth/stencil attachment is allocated with the target.
    pub depth: bool,
}

impl<'a> RenderTargetConfig<'a> {
    /// A single-sampled RGBA8 target with a depth attachment.
    pub fn new(name: &'a str, width: u32, height: u32) -> Self {
        Self {
            name,
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            sample_count: 1,
            depth: true,
        }
    }

    /// Checks the required fields.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::RenderTarget, "name"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::invalid(ResourceKind::RenderTarget, "size"));
        }
        if self.format.is_depth() {
            return Err(RenderError::invalid(ResourceKind::RenderTarget, "format"));
        }
        if self.sample_count != 1 && self.sample_count != 4 {
            return Err(RenderError::invalid(ResourceKind::RenderTarget, "sample_count"));
        }
        Ok(())
    }
}

/// The metadata a renderer keeps for a registered render target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetInfo {
    /// The registry key.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// The color attachment format.
    pub format: TextureFormat,
    /// Samples per pixel.
    pub sample_count: u32,
    /// Whether a depth/stencil attachment exists.
    pub has_depth: bool,
}
