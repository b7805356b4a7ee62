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

//! # Prism Core
//!
//! Backend-agnostic contracts for GPU resource lifecycle and render-state
//! management: the named resource registries, the state tracker, frame
//! attachment planning, the capability probe policy and the event bus.
//!
//! Concrete backends live in `prism-infra`; they talk to native graphics
//! APIs through the traits in [`native`].

#![warn(missing_docs)]

pub mod event;
pub mod native;
pub mod presentation;
pub mod renderer;
pub mod settings;

pub use renderer::{RenderError, Renderer};
pub use settings::RendererSettings;
