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

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three native programming models a renderer can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// A global bind-then-operate state machine (GL ES 2 family).
    Immediate,
    /// The immediate model extended with vertex array objects, sampler
    /// objects and multisample renderbuffers (GL ES 3 family).
    Extended,
    /// Explicit command encoders, passes and bind groups (WebGPU family).
    Encoder,
}

impl BackendKind {
    /// The default fallback order, most capable first.
    pub const FALLBACK_ORDER: [BackendKind; 3] = [
        BackendKind::Encoder,
        BackendKind::Extended,
        BackendKind::Immediate,
    ];

    /// A short human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Immediate => "immediate",
            BackendKind::Extended => "extended",
            BackendKind::Encoder => "encoder",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options requested when acquiring a native context.
///
/// Honored by the immediate-mode backends; the encoder-based backend
/// negotiates its own surface format and ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOptions {
    /// Whether the drawing buffer has an alpha channel.
    pub alpha: bool,
    /// Whether the drawing buffer has a depth buffer.
    pub depth: bool,
    /// Whether the drawing buffer has a stencil buffer.
    pub stencil: bool,
    /// Whether the platform should antialias the default framebuffer.
    pub antialias: bool,
    /// Whether color values are premultiplied by alpha when composited.
    pub premultiplied_alpha: bool,
    /// Whether the drawing buffer survives presentation.
    pub preserve_drawing_buffer: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            alpha: true,
            depth: true,
            stencil: false,
            antialias: true,
            premultiplied_alpha: true,
            preserve_drawing_buffer: false,
        }
    }
}
