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

//! The lifecycle events emitted by every renderer backend.

use super::bus::Event;
use crate::renderer::api::{BackendKind, TextureFormat};

/// An event emitted by a renderer while it manages resources and frames.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// The native context was acquired and default state applied.
    Initialized {
        /// The backend that was initialized.
        backend: BackendKind,
        /// A human-readable description of the native context.
        context: String,
    },
    /// A resource operation failed.
    Error {
        /// The error message.
        message: String,
    },
    /// A buffer was created.
    BufferCreated {
        /// The buffer name.
        name: String,
        /// The allocated size in bytes.
        size: u64,
    },
    /// A buffer's content was replaced or partially rewritten.
    BufferUpdated {
        /// The buffer name.
        name: String,
        /// The byte offset of the write.
        offset: u64,
        /// The number of bytes written.
        len: u64,
    },
    /// A buffer was destroyed.
    BufferDestroyed {
        /// The buffer name.
        name: String,
    },
    /// A texture was created.
    TextureCreated {
        /// The texture name.
        name: String,
        /// Width in texels.
        width: u32,
        /// Height in texels.
        height: u32,
        /// The texel format.
        format: TextureFormat,
    },
    /// A texture's content was rewritten, possibly after reallocation.
    TextureUpdated {
        /// The texture name.
        name: String,
        /// Width in texels after the update.
        width: u32,
        /// Height in texels after the update.
        height: u32,
        /// `true` if the backing storage was destroyed and recreated.
        reallocated: bool,
    },
    /// A texture was destroyed.
    TextureDestroyed {
        /// The texture name.
        name: String,
    },
    /// A sampler was created.
    SamplerCreated {
        /// The sampler name.
        name: String,
    },
    /// A sampler was destroyed.
    SamplerDestroyed {
        /// The sampler name.
        name: String,
    },
    /// A render pipeline, compute pipeline or linked program was created.
    PipelineCreated {
        /// The pipeline name.
        name: String,
    },
    /// A pipeline or program was destroyed.
    PipelineDestroyed {
        /// The pipeline name.
        name: String,
    },
    /// A bind group was created.
    BindGroupCreated {
        /// The bind group name.
        name: String,
        /// The number of bound resources.
        entries: usize,
    },
    /// A bind group was destroyed.
    BindGroupDestroyed {
        /// The bind group name.
        name: String,
    },
    /// An offscreen render target was created.
    RenderTargetCreated {
        /// The render target name.
        name: String,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Samples per pixel.
        sample_count: u32,
    },
    /// A render target was destroyed.
    RenderTargetDestroyed {
        /// The render target name.
        name: String,
    },
    /// A program became current (immediate-mode backends).
    ProgramSet {
        /// The program name.
        name: String,
    },
    /// A pipeline became current (encoder-based backend).
    PipelineSet {
        /// The pipeline name.
        name: String,
    },
    /// Vertex attribute pointers were configured for a buffer.
    VertexAttributesSetup {
        /// The vertex buffer the attributes read from.
        buffer: String,
        /// The number of attributes that were enabled.
        attributes: usize,
    },
    /// A draw call was issued.
    Draw {
        /// `true` for an indexed draw.
        indexed: bool,
        /// The number of indices or vertices drawn.
        count: u32,
        /// The number of instances.
        instances: u32,
    },
    /// A frame was submitted.
    FrameRendered {
        /// The frame counter after submission.
        frame: u64,
    },
    /// The drawable surface was resized.
    Resize {
        /// The new width in pixels.
        width: u32,
        /// The new height in pixels.
        height: u32,
    },
    /// Multisampling was toggled.
    MsaaChanged {
        /// Whether multisampling is now active.
        enabled: bool,
        /// The sample count now in effect.
        sample_count: u32,
    },
    /// A compute dispatch was submitted.
    ComputeDispatched {
        /// The compute pipeline name.
        name: String,
        /// The workgroup counts in x, y and z.
        workgroups: [u32; 3],
    },
    /// The renderer released every native resource.
    Destroyed,
}

/// The discriminant of a [`RenderEvent`], used to subscribe to events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum EventKind {
    Initialized,
    Error,
    BufferCreated,
    BufferUpdated,
    BufferDestroyed,
    TextureCreated,
    TextureUpdated,
    TextureDestroyed,
    SamplerCreated,
    SamplerDestroyed,
    PipelineCreated,
    PipelineDestroyed,
    BindGroupCreated,
    BindGroupDestroyed,
    RenderTargetCreated,
    RenderTargetDestroyed,
    ProgramSet,
    PipelineSet,
    VertexAttributesSetup,
    Draw,
    FrameRendered,
    Resize,
    MsaaChanged,
    ComputeDispatched,
    Destroyed,
}

impl EventKind {
    /// Returns the wire name of this event kind, e.g. `"frameRendered"`.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Initialized => "initialized",
            EventKind::Error => "error",
            EventKind::BufferCreated => "bufferCreated",
            EventKind::BufferUpdated => "bufferUpdated",
            EventKind::BufferDestroyed => "bufferDestroyed",
            EventKind::TextureCreated => "textureCreated",
            EventKind::TextureUpdated => "textureUpdated",
            EventKind::TextureDestroyed => "textureDestroyed",
            EventKind::SamplerCreated => "samplerCreated",
            EventKind::SamplerDestroyed => "samplerDestroyed",
            EventKind::PipelineCreated => "pipelineCreated",
            EventKind::PipelineDestroyed => "pipelineDestroyed",
            EventKind::BindGroupCreated => "bindGroupCreated",
            EventKind::BindGroupDestroyed => "bindGroupDestroyed",
            EventKind::RenderTargetCreated => "renderTargetCreated",
            EventKind::RenderTargetDestroyed => "renderTargetDestroyed",
            EventKind::ProgramSet => "programSet",
            EventKind::PipelineSet => "pipelineSet",
            EventKind::VertexAttributesSetup => "vertexAttributesSetup",
            EventKind::Draw => "draw",
            EventKind::FrameRendered => "frameRendered",
            EventKind::Resize => "resize",
            EventKind::MsaaChanged => "msaaChanged",
            EventKind::ComputeDispatched => "computeDispatched",
            EventKind::Destroyed => "destroyed",
        }
    }

    /// Parses a wire name back into a kind.
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_KINDS.iter().copied().find(|k| k.name() == name)
    }
}

const ALL_KINDS: [EventKind; 25] = [
    EventKind::Initialized,
    EventKind::Error,
    EventKind::BufferCreated,
    EventKind::BufferUpdated,
    EventKind::BufferDestroyed,
    EventKind::TextureCreated,
    EventKind::TextureUpdated,
    EventKind::TextureDestroyed,
    EventKind::SamplerCreated,
    EventKind::SamplerDestroyed,
    EventKind::PipelineCreated,
    EventKind::PipelineDestroyed,
    EventKind::BindGroupCreated,
    EventKind::BindGroupDestroyed,
    EventKind::RenderTargetCreated,
    EventKind::RenderTargetDestroyed,
    EventKind::ProgramSet,
    EventKind::PipelineSet,
    EventKind::VertexAttributesSetup,
    EventKind::Draw,
    EventKind::FrameRendered,
    EventKind::Resize,
    EventKind::MsaaChanged,
    EventKind::ComputeDispatched,
    EventKind::Destroyed,
];

impl RenderEvent {
    /// Returns the wire name of this event, e.g. `"bufferCreated"`.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

impl Event for RenderEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            RenderEvent::Initialized { .. } => EventKind::Initialized,
            RenderEvent::Error { .. } => EventKind::Error,
            RenderEvent::BufferCreated { .. } => EventKind::BufferCreated,
            RenderEvent::BufferUpdated { .. } => EventKind::BufferUpdated,
            RenderEvent::BufferDestroyed { .. } => EventKind::BufferDestroyed,
            RenderEvent::TextureCreated { .. } => EventKind::TextureCreated,
            RenderEvent::TextureUpdated { .. } => EventKind::TextureUpdated,
            RenderEvent::TextureDestroyed { .. } => EventKind::TextureDestroyed,
            RenderEvent::SamplerCreated { .. } => EventKind::SamplerCreated,
            RenderEvent::SamplerDestroyed { .. } => EventKind::SamplerDestroyed,
            RenderEvent::PipelineCreated { .. } => EventKind::PipelineCreated,
            RenderEvent::PipelineDestroyed { .. } => EventKind::PipelineDestroyed,
            RenderEvent::BindGroupCreated { .. } => EventKind::BindGroupCreated,
            RenderEvent::BindGroupDestroyed { .. } => EventKind::BindGroupDestroyed,
            RenderEvent::RenderTargetCreated { .. } => EventKind::RenderTargetCreated,
            RenderEvent::RenderTargetDestroyed { .. } => EventKind::RenderTargetDestroyed,
            RenderEvent::ProgramSet { .. } => EventKind::ProgramSet,
            RenderEvent::PipelineSet { .. } => EventKind::PipelineSet,
            RenderEvent::VertexAttributesSetup { .. } => EventKind::VertexAttributesSetup,
            RenderEvent::Draw { .. } => EventKind::Draw,
            RenderEvent::FrameRendered { .. } => EventKind::FrameRendered,
            RenderEvent::Resize { .. } => EventKind::Resize,
            RenderEvent::MsaaChanged { .. } => EventKind::MsaaChanged,
            RenderEvent::ComputeDispatched { .. } => EventKind::ComputeDispatched,
            RenderEvent::Destroyed => EventKind::Destroyed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ALL_KINDS {
            assert_eq!(EventKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EventKind::from_name("nope"), None);
    }

    #[test]
    fn event_name_matches_kind() {
        let event = RenderEvent::FrameRendered { frame: 3 };
        assert_eq!(event.name(), "frameRendered");
        assert_eq!(RenderEvent::Destroyed.name(), "destroyed");
    }
}
