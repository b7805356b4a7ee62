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

//! Frame counting and registry statistics.

use std::time::Instant;

/// A snapshot of a renderer's frame rate and live resource counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    /// Frames submitted since initialization.
    pub frame_count: u64,
    /// Frames per second since the first frame.
    pub fps: f64,
    /// Live buffers.
    pub buffers: usize,
    /// Live textures.
    pub textures: usize,
    /// Live samplers.
    pub samplers: usize,
    /// Live pipelines or programs.
    pub pipelines: usize,
    /// Live bind groups.
    pub bind_groups: usize,
    /// Live render targets.
    pub render_targets: usize,
    /// Live vertex arrays.
    pub vertex_arrays: usize,
    /// Cached shader modules.
    pub shader_modules: usize,
    /// Whether the offscreen multisample target is allocated.
    pub msaa_target: bool,
}

/// Counts submitted frames and derives the average frame rate.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    frames: u64,
    first_frame: Option<Instant>,
}

impl FrameCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a submitted frame and returns the new count.
    pub fn record_frame(&mut self) -> u64 {
        self.first_frame.get_or_insert_with(Instant::now);
        self.frames += 1;
        self.frames
    }

    /// Frames recorded so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Frames divided by the seconds elapsed since the first frame.
    pub fn fps(&self) -> f64 {
        self.fps_at(Instant::now())
    }

    fn fps_at(&self, now: Instant) -> f64 {
        let Some(first) = self.first_frame else {
            return 0.0;
        };
        let elapsed = now.duration_since(first).as_secs_f64();
        if elapsed > 0.0 {
            self.frames as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Returns to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn counts_frames() {
        let mut counter = FrameCounter::new();
        assert_eq!(counter.frame_count(), 0);
        assert_eq!(counter.record_frame(), 1);
        assert_eq!(counter.record_frame(), 2);
        counter.reset();
        assert_eq!(counter.frame_count(), 0);
    }

    #[test]
    fn fps_is_zero_before_first_frame() {
        assert_eq!(FrameCounter::new().fps(), 0.0);
    }

    #[test]
    fn fps_divides_frames_by_elapsed_time() {
        let mut counter = FrameCounter::new();
        for _ in 0..10 {
            counter.record_frame();
        }
        let first = counter.first_frame.expect("first frame recorded");
        let fps = counter.fps_at(first + Duration::from_secs(2));
        assert!((fps - 5.0).abs() < f64::EPSILON);
    }
}
