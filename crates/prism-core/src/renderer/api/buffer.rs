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

//! Defines data structures related to buffer resources.

use super::format::IndexFormat;
use crate::renderer::{RenderError, ResourceKind};
use bitflags::bitflags;

bitflags! {
    /// A set of flags describing how a buffer will be used.
    ///
    /// The encoder-based backend forwards these to the device; the
    /// immediate-mode backends derive the binding target and usage hint from them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// The buffer can be mapped for reading on the CPU.
        const MAP_READ = 1 << 0;
        /// The buffer can be the source of a copy.
        const COPY_SRC = 1 << 1;
        /// The buffer can be the destination of a copy or queue write.
        const COPY_DST = 1 << 2;
        /// The buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 3;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 4;
        /// The buffer can be bound as a uniform buffer.
        const UNIFORM = 1 << 5;
        /// The buffer can be bound as a storage buffer.
        const STORAGE = 1 << 6;
        /// The buffer content changes often (immediate-mode usage hint).
        const DYNAMIC = 1 << 7;
    }
}

/// Everything needed to create a named buffer.
///
/// Either `data` or `size` must be provided; when both are given the buffer is
/// allocated with `max(size, data.len())` bytes and `data` is written at offset 0.
#[derive(Debug, Clone, Copy)]
pub struct BufferConfig<'a> {
    /// The registry key.
    pub name: &'a str,
    /// Initial content.
    pub data: Option<&'a [u8]>,
    /// Allocation size in bytes, for buffers created without content.
    pub size: Option<u64>,
    /// How the buffer will be used.
    pub usage: BufferUsage,
    /// The element format, for index buffers.
    pub index_format: Option<IndexFormat>,
}

impl<'a> BufferConfig<'a> {
    /// A vertex buffer initialized with `data`.
    pub fn vertex(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            data: Some(data),
            size: None,
            usage: BufferUsage::VERTEX | BufferUsage::COPY_DST,
            index_format: None,
        }
    }

    /// An index buffer initialized with `data`.
    pub fn index(name: &'a str, data: &'a [u8], format: IndexFormat) -> Self {
        Self {
            name,
            data: Some(data),
            size: None,
            usage: BufferUsage::INDEX | BufferUsage::COPY_DST,
            index_format: Some(format),
        }
    }

    /// An uninitialized uniform buffer of `size` bytes.
    pub fn uniform(name: &'a str, size: u64) -> Self {
        Self {
            name,
            data: None,
            size: Some(size),
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            index_format: None,
        }
    }

    /// Replaces the initial content.
    pub fn with_data(mut self, data: &'a [u8]) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns the number of bytes to allocate, or `None` if neither data nor
    /// size was supplied.
    pub fn allocation_size(&self) -> Option<u64> {
        match (self.data, self.size) {
            (None, None) => None,
            (Some(data), None) => Some(data.len() as u64),
            (None, Some(size)) => Some(size),
            (Some(data), Some(size)) => Some(size.max(data.len() as u64)),
        }
    }

    /// Checks the required fields and returns the allocation size.
    pub fn validate(&self) -> Result<u64, RenderError> {
        if self.name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Buffer, "name"));
        }
        if self.usage.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Buffer, "usage"));
        }
        match self.allocation_size() {
            Some(size) if size > 0 => Ok(size),
            _ => Err(RenderError::invalid(ResourceKind::Buffer, "data")),
        }
    }
}

/// The metadata a renderer keeps for a registered buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    /// The registry key.
    pub name: String,
    /// The current allocation size in bytes.
    pub size: u64,
    /// How the buffer is used.
    pub usage: BufferUsage,
    /// The element format, for index buffers.
    pub index_format: Option<IndexFormat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_size_prefers_the_larger() {
        let data = [0u8; 8];
        let config = BufferConfig::uniform("u", 64).with_data(&data);
        assert_eq!(config.allocation_size(), Some(64));
        assert_eq!(BufferConfig::vertex("v", &data).allocation_size(), Some(8));
    }

    #[test]
    fn allocation_size_requires_data_or_size() {
        let config = BufferConfig {
            name: "empty",
            data: None,
            size: None,
            usage: BufferUsage::VERTEX,
            index_format: None,
        };
        assert_eq!(config.allocation_size(), None);
        assert_eq!(
            config.validate(),
            Err(RenderError::invalid(ResourceKind::Buffer, "data"))
        );
    }

    #[test]
    fn validate_reports_missing_name_and_usage() {
        let data = [1u8; 4];
        let mut config = BufferConfig::vertex("", &data);
        assert_eq!(
            config.validate(),
            Err(RenderError::invalid(ResourceKind::Buffer, "name"))
        );
        config.name = "v";
        config.usage = BufferUsage::empty();
        assert_eq!(
            config.validate(),
            Err(RenderError::invalid(ResourceKind::Buffer, "usage"))
        );
    }
}
