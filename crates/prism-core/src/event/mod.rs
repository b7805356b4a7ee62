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

//! Provides the synchronous publish/subscribe primitives used by renderers.
//!
//! The [`EventBus`] is generic over any [`Event`] type so the bus itself stays
//! decoupled from the renderer's vocabulary. [`RenderEvent`] is the concrete
//! event set every backend emits.

mod bus;
mod kind;

pub use self::bus::{Event, EventBus, ListenerId};
pub use self::kind::{EventKind, RenderEvent};
