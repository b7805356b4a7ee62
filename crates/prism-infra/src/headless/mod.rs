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

//! In-memory native contexts for tests and offscreen tooling.
//!
//! Every double records the calls it receives and keeps just enough object
//! state (buffer contents, live handles, compile results) to validate them.

mod gl;
mod gpu;
mod surface;

pub use self::gl::{GlCall, GlLog, HeadlessGl, COMPILE_ERROR_MARKER, LINK_ERROR_MARKER};
pub use self::gpu::{GpuCall, GpuLog, HeadlessCanvas, HeadlessGpu, HEADLESS_SURFACE_FORMAT};
pub use self::surface::HeadlessSurface;
