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

use super::NativeContext;
use crate::renderer::api::{BackendKind, ContextOptions};

/// A drawable surface that can hand out native contexts.
///
/// Window-backed and headless implementations live in `prism-infra`.
pub trait Surface {
    /// The drawable size in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Requests a context of the given family.
    ///
    /// ## Returns
    /// `None` if the platform grants no context. Implementations may grant a
    /// context of a different family than requested; callers must check.
    fn get_context(
        &mut self,
        backend: BackendKind,
        options: &ContextOptions,
    ) -> Option<NativeContext>;

    /// Creates a throwaway surface used only for capability probing.
    fn create_probe(&self) -> Option<Box<dyn Surface>>;
}
