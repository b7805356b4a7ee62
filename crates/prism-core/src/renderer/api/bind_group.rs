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

//! Bind group descriptors for the encoder-based backend.

use crate::renderer::{RenderError, ResourceKind};

/// Where a bind group takes its layout from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindGroupLayoutSource<'a> {
    /// The layout a pipeline exposes at a group index.
    Pipeline {
        /// The pipeline name.
        pipeline: &'a str,
        /// The group index.
        index: u32,
    },
    /// A bind group layout created with `create_bind_group_layout`.
    Named(&'a str),
}

/// A resource referenced by name from a bind group entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource<'a> {
    /// A range of a registered buffer.
    Buffer {
        /// The buffer name.
        name: &'a str,
        /// The byte offset of the range.
        offset: u64,
        /// The range size; `None` binds to the end of the buffer.
        size: Option<u64>,
    },
    /// The default view of a registered texture.
    Texture(&'a str),
    /// A registered sampler.
    Sampler(&'a str),
}

impl<'a> BindingResource<'a> {
    /// Binds an entire buffer.
    pub fn buffer(name: &'a str) -> Self {
        BindingResource::Buffer {
            name,
            offset: 0,
            size: None,
        }
    }
}

/// One binding of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupEntry<'a> {
    /// The binding index in the shader.
    pub binding: u32,
    /// The bound resource.
    pub resource: BindingResource<'a>,
}

/// Everything needed to create a named bind group.
#[derive(Debug, Clone, Copy)]
pub struct BindGroupConfig<'a> {
    /// The registry key.
    pub name: &'a str,
    /// The layout the group conforms to.
    pub layout: BindGroupLayoutSource<'a>,
    /// The bound resources.
    pub entries: &'a [BindGroupEntry<'a>],
}

impl BindGroupConfig<'_> {
    /// Checks the required fields.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::BindGroup, "name"));
        }
        if self.entries.is_empty() {
            return Err(RenderError::invalid(ResourceKind::BindGroup, "entries"));
        }
        Ok(())
    }
}
