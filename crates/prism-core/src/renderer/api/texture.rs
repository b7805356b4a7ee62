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

//! Defines data structures for textures and samplers.

use super::format::TextureFormat;
use crate::renderer::{RenderError, ResourceKind};
use bitflags::bitflags;

bitflags! {
    /// A set of flags describing how a texture will be used.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// The texture can be the source of a copy.
        const COPY_SRC = 1 << 0;
        /// The texture can be the destination of a copy or queue write.
        const COPY_DST = 1 << 1;
        /// The texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// The texture can be bound as a storage texture.
        const STORAGE_BINDING = 1 << 3;
        /// The texture can be a color or depth attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

/// Everything needed to create a named 2D texture.
#[derive(Debug, Clone, Copy)]
pub struct TextureConfig<'a> {
    /// The registry key.
    pub name: &'a str,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// The texel format.
    pub format: TextureFormat,
    /// How the texture will be used.
    pub usage: TextureUsage,
    /// Optional initial content covering the full extent.
    pub data: Option<&'a [u8]>,
}

impl<'a> TextureConfig<'a> {
    /// A sampled RGBA8 texture with the given size and no initial content.
    pub fn rgba8(name: &'a str, width: u32, height: u32) -> Self {
        Self {
            name,
            width,
            height,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
            data: None,
        }
    }

    /// Sets the initial content.
    pub fn with_data(mut self, data: &'a [u8]) -> Self {
        self.data = Some(data);
        self
    }

    /// Checks the required fields and the length of the initial content.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Texture, "name"));
        }
        if self.width == 0 {
            return Err(RenderError::invalid(ResourceKind::Texture, "width"));
        }
        if self.height == 0 {
            return Err(RenderError::invalid(ResourceKind::Texture, "height"));
        }
        if self.usage.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Texture, "usage"));
        }
        if let Some(data) = self.data {
            check_extent(data, self.width, self.height, self.format)?;
        }
        Ok(())
    }
}

/// Checks that `data` covers exactly `width * height` texels of `format`.
pub fn check_extent(
    data: &[u8],
    width: u32,
    height: u32,
    format: TextureFormat,
) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::invalid(ResourceKind::Texture, "size"));
    }
    let expected = width as u64 * height as u64 * format.bytes_per_pixel() as u64;
    if data.len() as u64 != expected {
        return Err(RenderError::invalid(ResourceKind::Texture, "data"));
    }
    Ok(())
}

/// The metadata a renderer keeps for a registered texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    /// The registry key.
    pub name: String,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// The texel format.
    pub format: TextureFormat,
    /// How the texture is used.
    pub usage: TextureUsage,
    /// The raw native handle, exposed so callers can observe reallocation.
    pub handle: u64,
}

/// Texture minification/magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Texture coordinate wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Everything needed to create a named sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerConfig<'a> {
    /// The registry key.
    pub name: &'a str,
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Wrapping along u.
    pub address_mode_u: AddressMode,
    /// Wrapping along v.
    pub address_mode_v: AddressMode,
}

/// Sampling parameters without a name, as stored by the registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub struct SamplerParams {
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
}

impl SamplerConfig<'_> {
    /// Checks the required fields.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Sampler, "name"));
        }
        Ok(())
    }
}

impl From<&SamplerConfig<'_>> for SamplerParams {
    fn from(config: &SamplerConfig<'_>) -> Self {
        Self {
            mag_filter: config.mag_filter,
            min_filter: config.min_filter,
            address_mode_u: config.address_mode_u,
            address_mode_v: config.address_mode_v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_data_must_cover_the_extent() {
        let data = vec![0u8; 2 * 2 * 4];
        assert!(TextureConfig::rgba8("t", 2, 2).with_data(&data).validate().is_ok());
        assert_eq!(
            TextureConfig::rgba8("t", 4, 2).with_data(&data).validate(),
            Err(RenderError::invalid(ResourceKind::Texture, "data"))
        );
    }

    #[test]
    fn zero_sized_textures_are_rejected() {
        assert_eq!(
            TextureConfig::rgba8("t", 0, 2).validate(),
            Err(RenderError::invalid(ResourceKind::Texture, "width"))
        );
        assert_eq!(
            TextureConfig::rgba8("t", 2, 0).validate(),
            Err(RenderError::invalid(ResourceKind::Texture, "height"))
        );
    }
}
