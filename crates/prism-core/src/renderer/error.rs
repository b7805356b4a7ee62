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

//! Defines the error type shared by every renderer backend.

use super::api::{BackendKind, TextureFormat};
use thiserror::Error;

/// The kind of resource an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Sampler,
    Pipeline,
    Program,
    BindGroup,
    BindGroupLayout,
    RenderTarget,
    VertexArray,
}

impl ResourceKind {
    /// A lowercase, human-readable name for the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Buffer => "buffer",
            ResourceKind::Texture => "texture",
            ResourceKind::Sampler => "sampler",
            ResourceKind::Pipeline => "pipeline",
            ResourceKind::Program => "program",
            ResourceKind::BindGroup => "bind group",
            ResourceKind::BindGroupLayout => "bind group layout",
            ResourceKind::RenderTarget => "render target",
            ResourceKind::VertexArray => "vertex array",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shader stage, used to attribute compilation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    /// The program link step of immediate-mode backends.
    Link,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
            ShaderStage::Link => "link",
        };
        f.write_str(name)
    }
}

/// Every failure a renderer can surface to its caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The capability probe rejected the backend before any native call.
    #[error("The {0} backend is not supported on this surface")]
    UnsupportedBackend(BackendKind),

    /// The platform granted no context, or one of the wrong family.
    #[error("Failed to acquire a {backend} context: {reason}")]
    ContextAcquisitionFailed {
        /// The backend whose context was requested.
        backend: BackendKind,
        /// Why the acquisition failed.
        reason: String,
    },

    /// An operation was attempted before a successful `initialize()`.
    #[error("Renderer is not initialized")]
    NotInitialized,

    /// A required creation field is missing or invalid.
    #[error("Invalid {kind} configuration: missing or invalid '{field}'")]
    InvalidConfig {
        /// The resource being configured.
        kind: ResourceKind,
        /// The offending field.
        field: &'static str,
    },

    /// An operation referenced an unregistered resource name.
    #[error("No {kind} named '{name}' is registered")]
    NotFound {
        /// The resource kind that was looked up.
        kind: ResourceKind,
        /// The name that was looked up.
        name: String,
    },

    /// A shader failed to compile, or a program failed to link.
    #[error("Failed to build {stage} shader for '{name}': {log}")]
    CompileOrLinkFailed {
        /// The pipeline or program name.
        name: String,
        /// The failing stage.
        stage: ShaderStage,
        /// The backend diagnostic text.
        log: String,
    },

    /// The platform rejected an attachment configuration.
    #[error("Framebuffer for '{0}' is incomplete")]
    FramebufferIncomplete(String),

    /// A draw was attempted with no active pipeline.
    #[error("No pipeline is set")]
    NoPipelineSet,

    /// A draw was attempted with no active program.
    #[error("No program is set")]
    NoProgramSet,

    /// A sub-range write would exceed the buffer's allocated capacity.
    #[error("Write of {len} bytes at offset {offset} overflows buffer '{name}' ({capacity} bytes)")]
    BufferOverflow {
        /// The buffer name.
        name: String,
        /// The requested offset.
        offset: u64,
        /// The length of the write.
        len: u64,
        /// The allocated capacity.
        capacity: u64,
    },

    /// The operation has no meaning on this backend.
    #[error("'{operation}' is not supported by the {backend} backend")]
    Unsupported {
        /// The backend that rejected the call.
        backend: BackendKind,
        /// The rejected operation.
        operation: &'static str,
    },

    /// A pipeline's sample count does not match the pass it would run in.
    #[error("Pipeline '{pipeline}' expects {expected} samples but the pass has {actual}")]
    SampleCountMismatch {
        /// The pipeline name.
        pipeline: String,
        /// The pipeline's sample count.
        expected: u32,
        /// The pass attachment's sample count.
        actual: u32,
    },

    /// A pipeline's depth state does not match the pass it would run in.
    #[error("Pipeline '{pipeline}' expects depth testing {expected} but the pass has {actual}")]
    DepthStateMismatch {
        /// The pipeline name.
        pipeline: String,
        /// Whether the pipeline declares a depth/stencil state.
        expected: bool,
        /// Whether the pass has a depth attachment.
        actual: bool,
    },

    /// A pipeline's color format does not match the pass attachment.
    #[error("Pipeline '{pipeline}' writes {expected:?} but the pass attachment is {actual:?}")]
    ColorFormatMismatch {
        /// The pipeline name.
        pipeline: String,
        /// The pipeline's color target format.
        expected: TextureFormat,
        /// The pass attachment's format.
        actual: TextureFormat,
    },

    /// The native layer reported an error that fits no other category.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl RenderError {
    /// Shorthand for [`RenderError::NotFound`].
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        RenderError::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Shorthand for [`RenderError::InvalidConfig`].
    pub fn invalid(kind: ResourceKind, field: &'static str) -> Self {
        RenderError::InvalidConfig { kind, field }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RenderError::not_found(ResourceKind::Buffer, "vertices");
        assert_eq!(err.to_string(), "No buffer named 'vertices' is registered");
    }

    #[test]
    fn test_invalid_config_names_field() {
        let err = RenderError::invalid(ResourceKind::Texture, "width");
        assert!(err.to_string().contains("'width'"));
        assert!(err.to_string().contains("texture"));
    }

    #[test]
    fn test_compile_failure_carries_log() {
        let err = RenderError::CompileOrLinkFailed {
            name: "basic".to_string(),
            stage: ShaderStage::Fragment,
            log: "ERROR: 0:3: syntax error".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("fragment"));
        assert!(msg.contains("syntax error"));
    }

    #[test]
    fn test_overflow_display() {
        let err = RenderError::BufferOverflow {
            name: "u".to_string(),
            offset: 60,
            len: 8,
            capacity: 64,
        };
        assert_eq!(
            err.to_string(),
            "Write of 8 bytes at offset 60 overflows buffer 'u' (64 bytes)"
        );
    }
}
