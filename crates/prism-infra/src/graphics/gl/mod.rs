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

//! Renderers for the immediate-mode context generations.
//!
//! Both share [`GlContextRenderer`]: registries, state tracking and pass
//! assembly live in one place, and a [`GlProfile`] adds what each context
//! generation can do natively.

mod device;
mod extended;
mod immediate;
mod profile;
mod renderer;

pub use self::extended::Gl2Profile;
pub use self::immediate::Gl1Profile;
pub use self::profile::GlProfile;
pub use self::renderer::GlContextRenderer;

/// Renderer for GL ES 2 style contexts.
pub type GlRenderer = GlContextRenderer<Gl1Profile>;

/// Renderer for GL ES 3 style contexts.
pub type Gl2Renderer = GlContextRenderer<Gl2Profile>;
