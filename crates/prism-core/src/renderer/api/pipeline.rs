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

//! Descriptors for render pipelines, compute pipelines and their layouts.

use super::format::{TextureFormat, VertexFormat};
use crate::renderer::{RenderError, ResourceKind};
use bitflags::bitflags;

/// Describes a single vertex attribute within a vertex buffer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// The input location in the vertex shader.
    pub location: u32,
    /// The format of the attribute's data.
    pub format: VertexFormat,
    /// The byte offset from the start of the vertex.
    pub offset: u64,
}

/// How often a vertex buffer advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum VertexStepMode {
    #[default]
    Vertex,
    Instance,
}

/// Describes the memory layout of one vertex buffer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout<'a> {
    /// Distance in bytes between consecutive elements.
    pub stride: u64,
    /// How often the buffer advances.
    pub step_mode: VertexStepMode,
    /// The attributes read from each element.
    pub attributes: &'a [VertexAttribute],
}

/// The primitive assembly topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Where a pipeline's bind group layouts come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineLayout<'a> {
    /// Layouts are derived from the shader by the native device.
    #[default]
    Auto,
    /// Layouts are the named, previously created bind group layouts, in group order.
    Explicit(&'a [&'a str]),
}

/// Everything needed to create a named render pipeline or linked program.
///
/// Immediate-mode backends only read the name and the two sources; the
/// encoder-based backend reads everything.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig<'a> {
    /// The registry key.
    pub name: &'a str,
    /// Vertex shader source.
    pub vertex_source: &'a str,
    /// Fragment shader source.
    pub fragment_source: &'a str,
    /// Vertex entry point (encoder-based only).
    pub vertex_entry: &'a str,
    /// Fragment entry point (encoder-based only).
    pub fragment_entry: &'a str,
    /// Layouts of the vertex buffer slots (encoder-based only).
    pub vertex_layouts: &'a [VertexLayout<'a>],
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Bind group layout source (encoder-based only).
    pub layout: PipelineLayout<'a>,
    /// Color target format; `None` uses the surface format.
    pub color_format: Option<TextureFormat>,
    /// Sample count; `None` follows the current multisampling state.
    pub sample_count: Option<u32>,
}

impl<'a> PipelineConfig<'a> {
    /// A triangle-list pipeline with `vs_main`/`fs_main` entry points and an
    /// automatic layout.
    pub fn new(name: &'a str, vertex_source: &'a str, fragment_source: &'a str) -> Self {
        Self {
            name,
            vertex_source,
            fragment_source,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            vertex_layouts: &[],
            topology: PrimitiveTopology::TriangleList,
            layout: PipelineLayout::Auto,
            color_format: None,
            sample_count: None,
        }
    }

    /// Sets the vertex buffer layouts.
    pub fn with_vertex_layouts(mut self, layouts: &'a [VertexLayout<'a>]) -> Self {
        self.vertex_layouts = layouts;
        self
    }

    /// Sets an explicit pipeline layout.
    pub fn with_layout(mut self, layout: PipelineLayout<'a>) -> Self {
        self.layout = layout;
        self
    }

    /// Checks the required fields.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Pipeline, "name"));
        }
        if self.vertex_source.trim().is_empty() {
            return Err(RenderError::invalid(ResourceKind::Pipeline, "vertex_source"));
        }
        if self.fragment_source.trim().is_empty() {
            return Err(RenderError::invalid(ResourceKind::Pipeline, "fragment_source"));
        }
        if let Some(samples) = self.sample_count {
            if samples != 1 && samples != 4 {
                return Err(RenderError::invalid(ResourceKind::Pipeline, "sample_count"));
            }
        }
        Ok(())
    }

    /// The key of the shader module cache: both sources concatenated.
    pub fn module_key(&self) -> String {
        format!("{}{}", self.vertex_source, self.fragment_source)
    }
}

/// Everything needed to create a named compute pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ComputePipelineConfig<'a> {
    /// The registry key.
    pub name: &'a str,
    /// Compute shader source.
    pub source: &'a str,
    /// Entry point.
    pub entry_point: &'a str,
    /// Bind group layout source.
    pub layout: PipelineLayout<'a>,
}

impl<'a> ComputePipelineConfig<'a> {
    /// A compute pipeline with a `cs_main` entry point and an automatic layout.
    pub fn new(name: &'a str, source: &'a str) -> Self {
        Self {
            name,
            source,
            entry_point: "cs_main",
            layout: PipelineLayout::Auto,
        }
    }

    /// Checks the required fields.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.name.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Pipeline, "name"));
        }
        if self.source.trim().is_empty() {
            return Err(RenderError::invalid(ResourceKind::Pipeline, "source"));
        }
        if self.entry_point.is_empty() {
            return Err(RenderError::invalid(ResourceKind::Pipeline, "entry_point"));
        }
        Ok(())
    }
}

bitflags! {
    /// The shader stages that can see a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderVisibility: u32 {
        /// Visible to the vertex stage.
        const VERTEX = 1 << 0;
        /// Visible to the fragment stage.
        const FRAGMENT = 1 << 1;
        /// Visible to the compute stage.
        const COMPUTE = 1 << 2;
    }
}

/// The kind of resource a layout slot accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// A uniform buffer.
    UniformBuffer,
    /// A storage buffer.
    StorageBuffer {
        /// Whether shaders may only read it.
        read_only: bool,
    },
    /// A sampled float 2D texture.
    Texture,
    /// A filtering sampler.
    Sampler,
}

/// One slot of a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutEntry {
    /// The binding index in the shader.
    pub binding: u32,
    /// Stages that can access the binding.
    pub visibility: ShaderVisibility,
    /// The accepted resource type.
    pub ty: BindingType,
}

/// Everything needed to create a named bind group layout.
#[derive(Debug, Clone, Copy)]
pub struct BindGroupLayoutConfig<'a> {
    /// The registry key.
    pub name: &'a str,
    /// The layout slots.
    pub entries: &'a [BindGroupLayoutEntry],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sources_are_named() {
        assert_eq!(
            PipelineConfig::new("p", "", "fs").validate(),
            Err(RenderError::invalid(ResourceKind::Pipeline, "vertex_source"))
        );
        assert_eq!(
            PipelineConfig::new("p", "vs", " ").validate(),
            Err(RenderError::invalid(ResourceKind::Pipeline, "fragment_source"))
        );
        assert!(PipelineConfig::new("p", "vs", "fs").validate().is_ok());
    }

    #[test]
    fn only_one_or_four_samples() {
        let mut config = PipelineConfig::new("p", "vs", "fs");
        config.sample_count = Some(2);
        assert_eq!(
            config.validate(),
            Err(RenderError::invalid(ResourceKind::Pipeline, "sample_count"))
        );
    }

    #[test]
    fn module_key_concatenates_sources() {
        assert_eq!(PipelineConfig::new("p", "A", "B").module_key(), "AB");
    }
}
