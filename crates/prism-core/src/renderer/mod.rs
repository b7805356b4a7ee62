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

//! The backend-agnostic rendering contract.
//!
//! [`Registry`] stores named resources, [`StateTracker`] mirrors the bound
//! state, [`frame`] plans attachments and draws for one pass, and [`probe`]
//! decides which backend a surface supports.

pub mod api;
mod error;
pub mod frame;
pub mod probe;
mod registry;
mod state_tracker;
mod stats;
pub mod traits;

pub use self::error::{RenderError, ResourceKind, ShaderStage};
pub use self::registry::Registry;
pub use self::state_tracker::{RenderState, StateTracker, MSAA_SAMPLE_COUNT};
pub use self::stats::{FrameCounter, RenderStats};
pub use self::traits::Renderer;
