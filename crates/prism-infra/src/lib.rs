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

//! Concrete implementations of the Prism contracts.
//!
//! - [`graphics`] holds the three renderers and the `wgpu` binding of the
//!   encoder-based native contract.
//! - [`headless`] provides in-memory native contexts and surfaces that record
//!   every call, for tests and offscreen tooling.
//! - [`platform`] hosts the `winit` window surface.

#![warn(missing_docs)]

pub mod graphics;
pub mod headless;
pub mod logging;
pub mod platform;

pub use self::graphics::{
    create_preferred_renderer, create_renderer, Gl2Renderer, GlRenderer, GpuRenderer,
};
pub use self::logging::{init_logging, LoggingConfig};
