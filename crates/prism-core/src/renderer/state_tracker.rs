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

//! Tracks the currently bound objects and the fixed-function toggles.

use super::api::{BlendState, CompareFunction, CullMode, RenderStateChange};

/// Samples per pixel while multisampling is active.
pub const MSAA_SAMPLE_COUNT: u32 = 4;

/// The fixed-function state a pass is assembled with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// The color attachments are cleared to.
    pub clear_color: [f32; 4],
    /// Whether depth testing is on.
    pub depth_test: bool,
    /// The depth comparison.
    pub depth_func: CompareFunction,
    /// Whether blending is on.
    pub blend: bool,
    /// The blend equations.
    pub blend_state: BlendState,
    /// Whether face culling is on.
    pub cull_face: bool,
    /// The culled face.
    pub cull_mode: CullMode,
    /// Whether multisampling is on.
    pub msaa: bool,
}

impl RenderState {
    /// The sample count implied by the multisampling flag.
    pub fn sample_count(&self) -> u32 {
        if self.msaa {
            MSAA_SAMPLE_COUNT
        } else {
            1
        }
    }
}

impl Default for RenderState {
    /// Everything off; the state a native context starts in.
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 0.0],
            depth_test: false,
            depth_func: CompareFunction::Less,
            blend: false,
            blend_state: BlendState::REPLACE,
            cull_face: false,
            cull_mode: CullMode::Back,
            msaa: false,
        }
    }
}

/// Mirrors the bound pipeline, vertex array and render target, and the
/// fixed-function toggles, so backends can skip redundant native calls.
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    state: RenderState,
    pipeline: Option<String>,
    vertex_array: Option<String>,
    render_target: Option<String>,
}

impl StateTracker {
    /// Creates a tracker in the all-off state.
    pub fn new() -> Self {
        Self::default()
    }

    /// The four states every renderer applies on initialization, in order:
    /// clear color, depth test, blend, cull face.
    pub fn default_changes(clear_color: [f32; 4]) -> [RenderStateChange; 4] {
        [
            RenderStateChange::ClearColor(clear_color),
            RenderStateChange::DepthTest {
                enabled: true,
                func: CompareFunction::Less,
            },
            RenderStateChange::Blend {
                enabled: true,
                state: BlendState::ALPHA_BLENDING,
            },
            RenderStateChange::CullFace {
                enabled: true,
                mode: CullMode::Back,
            },
        ]
    }

    /// The current fixed-function state.
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Applies a change. Returns `false` if it matched the tracked state.
    pub fn apply(&mut self, change: RenderStateChange) -> bool {
        let before = self.state;
        match change {
            RenderStateChange::ClearColor(color) => self.state.clear_color = color,
            RenderStateChange::DepthTest { enabled, func } => {
                self.state.depth_test = enabled;
                self.state.depth_func = func;
            }
            RenderStateChange::Blend { enabled, state } => {
                self.state.blend = enabled;
                self.state.blend_state = state;
            }
            RenderStateChange::CullFace { enabled, mode } => {
                self.state.cull_face = enabled;
                self.state.cull_mode = mode;
            }
        }
        self.state != before
    }

    /// Sets the multisampling flag. Returns `false` if unchanged.
    pub fn set_msaa(&mut self, enabled: bool) -> bool {
        let changed = self.state.msaa != enabled;
        self.state.msaa = enabled;
        changed
    }

    /// Marks a pipeline or program as current. Returns `false` if it already was.
    pub fn bind_pipeline(&mut self, name: &str) -> bool {
        if self.pipeline.as_deref() == Some(name) {
            return false;
        }
        self.pipeline = Some(name.to_string());
        true
    }

    /// Forgets the current pipeline so the next bind reaches the native API.
    pub fn clear_pipeline(&mut self) {
        self.pipeline = None;
    }

    /// The current pipeline or program.
    pub fn pipeline(&self) -> Option<&str> {
        self.pipeline.as_deref()
    }

    /// Marks a vertex array as current. Returns `false` if unchanged.
    pub fn bind_vertex_array(&mut self, name: Option<&str>) -> bool {
        if self.vertex_array.as_deref() == name {
            return false;
        }
        self.vertex_array = name.map(str::to_string);
        true
    }

    /// The current vertex array.
    pub fn vertex_array(&self) -> Option<&str> {
        self.vertex_array.as_deref()
    }

    /// Selects the render target; `None` selects the surface.
    pub fn set_render_target(&mut self, name: Option<&str>) -> bool {
        if self.render_target.as_deref() == name {
            return false;
        }
        self.render_target = name.map(str::to_string);
        true
    }

    /// The current render target; `None` is the surface.
    pub fn render_target(&self) -> Option<&str> {
        self.render_target.as_deref()
    }

    /// Returns to the all-off state with nothing bound.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_the_same_pipeline_twice_is_a_no_op() {
        let mut tracker = StateTracker::new();
        assert!(tracker.bind_pipeline("basic"));
        assert!(!tracker.bind_pipeline("basic"));
        assert!(tracker.bind_pipeline("textured"));
        assert_eq!(tracker.pipeline(), Some("textured"));
    }

    #[test]
    fn default_changes_apply_in_order() {
        let mut tracker = StateTracker::new();
        let changes = StateTracker::default_changes([0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(changes[0], RenderStateChange::ClearColor(_)));
        assert!(matches!(changes[3], RenderStateChange::CullFace { .. }));
        for change in changes {
            assert!(tracker.apply(change));
        }

        let state = tracker.state();
        assert_eq!(state.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert!(state.depth_test && state.blend && state.cull_face);
        assert_eq!(state.depth_func, CompareFunction::Less);
        assert_eq!(state.blend_state, BlendState::ALPHA_BLENDING);
        assert_eq!(state.cull_mode, CullMode::Back);
    }

    #[test]
    fn repeated_change_reports_unchanged() {
        let mut tracker = StateTracker::new();
        let change = RenderStateChange::DepthTest {
            enabled: true,
            func: CompareFunction::LessEqual,
        };
        assert!(tracker.apply(change));
        assert!(!tracker.apply(change));
    }

    #[test]
    fn msaa_flag_drives_sample_count() {
        let mut tracker = StateTracker::new();
        assert_eq!(tracker.state().sample_count(), 1);
        assert!(tracker.set_msaa(true));
        assert!(!tracker.set_msaa(true));
        assert_eq!(tracker.state().sample_count(), MSAA_SAMPLE_COUNT);
    }

    #[test]
    fn render_target_and_vertex_array_track_names() {
        let mut tracker = StateTracker::new();
        assert!(tracker.set_render_target(Some("shadow")));
        assert!(!tracker.set_render_target(Some("shadow")));
        assert!(tracker.bind_vertex_array(Some("quad")));
        tracker.reset();
        assert_eq!(tracker.render_target(), None);
        assert_eq!(tracker.vertex_array(), None);
        assert_eq!(tracker.pipeline(), None);
    }
}
