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

//! Contracts for the native graphics APIs the renderers drive.
//!
//! A [`Surface`] hands out a [`NativeContext`] of the requested family. The
//! immediate-mode families are bind-then-operate state machines ([`GlApi`],
//! [`Gl2Api`]); the encoder-based family is a device that records and submits
//! whole passes ([`GpuCanvas`], [`GpuApi`]).

mod gl;
mod gpu;
mod surface;

pub use self::gl::*;
pub use self::gpu::*;
pub use self::surface::*;

use crate::renderer::api::BackendKind;
use thiserror::Error;

/// An error reported by a native implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Shader source was rejected; carries the compiler diagnostic.
    #[error("Shader compilation failed: {0}")]
    Compile(String),
    /// A handle does not name a live native object.
    #[error("Unknown native handle {0}")]
    InvalidHandle(u64),
    /// The device or adapter could not be acquired.
    #[error("Device request failed: {0}")]
    Device(String),
    /// The presentation surface is lost, outdated or unavailable.
    #[error("Surface error: {0}")]
    Surface(String),
    /// The native API rejected the call.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// A native context of one of the three families.
pub enum NativeContext {
    /// An immediate-mode (GL ES 2 family) context.
    Gl(Box<dyn GlApi>),
    /// An extended immediate-mode (GL ES 3 family) context.
    Gl2(Box<dyn Gl2Api>),
    /// An encoder-based canvas, from which a device is requested.
    Gpu(Box<dyn GpuCanvas>),
}

impl NativeContext {
    /// The backend family this context belongs to.
    pub fn backend(&self) -> BackendKind {
        match self {
            NativeContext::Gl(_) => BackendKind::Immediate,
            NativeContext::Gl2(_) => BackendKind::Extended,
            NativeContext::Gpu(_) => BackendKind::Encoder,
        }
    }

    /// A human-readable description of the context.
    pub fn describe(&self) -> String {
        match self {
            NativeContext::Gl(gl) => gl.describe(),
            NativeContext::Gl2(gl) => gl.describe(),
            NativeContext::Gpu(canvas) => canvas.describe(),
        }
    }
}

impl std::fmt::Debug for NativeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NativeContext").field(&self.describe()).finish()
    }
}
