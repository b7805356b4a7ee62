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

//! Plans the attachments and the draw of one render pass.
//!
//! Planning is pure: backends feed it the tracked state and registry metadata,
//! then translate the plan into native calls.

use super::api::{BufferInfo, DrawCall, IndexFormat, RenderTargetInfo};
use super::state_tracker::StateTracker;

/// The depth value attachments are cleared to every pass.
pub const DEPTH_CLEAR_VALUE: f32 = 1.0;
/// The stencil value attachments are cleared to every pass.
pub const STENCIL_CLEAR_VALUE: u32 = 0;

/// Where the color output of a pass goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTarget<'a> {
    /// An explicitly selected render target. Used as-is, never resolved again.
    RenderTarget(&'a RenderTargetInfo),
    /// The offscreen multisample target, resolved into the surface.
    MultisampledSurface,
    /// The surface directly.
    Surface,
}

/// The attachments of one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassPlan<'a> {
    /// The color destination.
    pub color: ColorTarget<'a>,
    /// Samples per pixel of the color attachment.
    pub sample_count: u32,
    /// Whether a depth/stencil attachment is bound.
    pub depth: bool,
    /// The color clear value.
    pub clear_color: [f32; 4],
}

impl<'a> PassPlan<'a> {
    /// Resolves the color attachment from the tracked state.
    ///
    /// `target` is the metadata of the tracker's current render target, or
    /// `None` when no target is selected or it is no longer registered.
    pub fn resolve(tracker: &StateTracker, target: Option<&'a RenderTargetInfo>) -> Self {
        let state = tracker.state();
        let (color, sample_count) = match target {
            Some(info) => (ColorTarget::RenderTarget(info), info.sample_count),
            None if state.msaa => (ColorTarget::MultisampledSurface, state.sample_count()),
            None => (ColorTarget::Surface, 1),
        };
        let depth = match color {
            ColorTarget::RenderTarget(info) => state.depth_test && info.has_depth,
            _ => state.depth_test,
        };
        PassPlan {
            color,
            sample_count,
            depth,
            clear_color: state.clear_color,
        }
    }

    /// Returns `true` if the color attachment resolves into the surface.
    pub fn resolves_to_surface(&self) -> bool {
        matches!(self.color, ColorTarget::MultisampledSurface)
    }
}

/// The draw a pass issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPlan<'a> {
    /// An indexed draw.
    Indexed {
        /// The index buffer name.
        buffer: &'a str,
        /// Element format, from buffer metadata.
        format: IndexFormat,
        /// Number of indices.
        count: u32,
        /// Number of instances.
        instances: u32,
    },
    /// A non-indexed draw.
    NonIndexed {
        /// Number of vertices.
        count: u32,
        /// Number of instances.
        instances: u32,
    },
    /// Nothing to draw; the pass only clears.
    Nothing,
}

impl<'a> DrawPlan<'a> {
    /// Picks the draw for a call.
    ///
    /// `index_buffer` is the metadata of `draw.index_buffer` if it is
    /// registered. An unknown index buffer falls back to a non-indexed draw
    /// when a vertex count is given.
    pub fn resolve(draw: &DrawCall<'a>, index_buffer: Option<&BufferInfo>) -> DrawPlan<'a> {
        let instances = draw.instance_count.max(1);
        if let (Some(name), Some(info)) = (draw.index_buffer, index_buffer) {
            let format = info.index_format.unwrap_or_default();
            let count = draw
                .index_count
                .unwrap_or((info.size / format.size()) as u32);
            return DrawPlan::Indexed {
                buffer: name,
                format,
                count,
                instances,
            };
        }
        match draw.vertex_count {
            Some(count) => DrawPlan::NonIndexed { count, instances },
            None => DrawPlan::Nothing,
        }
    }

    /// The element count drawn, or `None` for [`DrawPlan::Nothing`].
    pub fn count(&self) -> Option<u32> {
        match self {
            DrawPlan::Indexed { count, .. } | DrawPlan::NonIndexed { count, .. } => Some(*count),
            DrawPlan::Nothing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{BufferUsage, CompareFunction, RenderStateChange, TextureFormat};

    fn target(samples: u32) -> RenderTargetInfo {
        RenderTargetInfo {
            name: "offscreen".to_string(),
            width: 64,
            height: 64,
            format: TextureFormat::Rgba8Unorm,
            sample_count: samples,
            has_depth: true,
        }
    }

    fn index_info(size: u64, format: Option<IndexFormat>) -> BufferInfo {
        BufferInfo {
            name: "indices".to_string(),
            size,
            usage: BufferUsage::INDEX,
            index_format: format,
        }
    }

    #[test]
    fn surface_is_used_without_msaa_or_target() {
        let tracker = StateTracker::new();
        let plan = PassPlan::resolve(&tracker, None);
        assert_eq!(plan.color, ColorTarget::Surface);
        assert_eq!(plan.sample_count, 1);
        assert!(!plan.resolves_to_surface());
    }

    #[test]
    fn msaa_renders_offscreen_and_resolves_to_surface() {
        let mut tracker = StateTracker::new();
        tracker.set_msaa(true);
        let plan = PassPlan::resolve(&tracker, None);
        assert_eq!(plan.color, ColorTarget::MultisampledSurface);
        assert_eq!(plan.sample_count, 4);
        assert!(plan.resolves_to_surface());
    }

    #[test]
    fn explicit_target_wins_and_is_not_resolved_again() {
        let mut tracker = StateTracker::new();
        tracker.set_msaa(true);
        let info = target(4);
        let plan = PassPlan::resolve(&tracker, Some(&info));
        assert_eq!(plan.color, ColorTarget::RenderTarget(&info));
        assert_eq!(plan.sample_count, 4);
        assert!(!plan.resolves_to_surface());
    }

    #[test]
    fn depth_follows_the_depth_toggle() {
        let mut tracker = StateTracker::new();
        assert!(!PassPlan::resolve(&tracker, None).depth);
        tracker.apply(RenderStateChange::DepthTest {
            enabled: true,
            func: CompareFunction::Less,
        });
        assert!(PassPlan::resolve(&tracker, None).depth);

        let mut no_depth = target(1);
        no_depth.has_depth = false;
        assert!(!PassPlan::resolve(&tracker, Some(&no_depth)).depth);
    }

    #[test]
    fn indexed_draw_reads_format_from_metadata() {
        let draw = DrawCall::new().indexed("indices", 6);
        let info = index_info(24, Some(IndexFormat::Uint32));
        assert_eq!(
            DrawPlan::resolve(&draw, Some(&info)),
            DrawPlan::Indexed {
                buffer: "indices",
                format: IndexFormat::Uint32,
                count: 6,
                instances: 1
            }
        );
    }

    #[test]
    fn index_format_defaults_to_u16_and_count_is_derived() {
        let mut draw = DrawCall::new();
        draw.index_buffer = Some("indices");
        let info = index_info(12, None);
        assert_eq!(
            DrawPlan::resolve(&draw, Some(&info)),
            DrawPlan::Indexed {
                buffer: "indices",
                format: IndexFormat::Uint16,
                count: 6,
                instances: 1
            }
        );
    }

    #[test]
    fn unknown_index_buffer_falls_back() {
        let draw = DrawCall::new().indexed("missing", 6).vertices(3);
        assert_eq!(
            DrawPlan::resolve(&draw, None),
            DrawPlan::NonIndexed {
                count: 3,
                instances: 1
            }
        );
        let draw = DrawCall::new().indexed("missing", 6);
        assert_eq!(DrawPlan::resolve(&draw, None), DrawPlan::Nothing);
    }

    #[test]
    fn no_counts_means_no_draw() {
        assert_eq!(DrawPlan::resolve(&DrawCall::new(), None), DrawPlan::Nothing);
        assert_eq!(DrawPlan::Nothing.count(), None);
    }
}
