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

//! Fixed-function render state: depth, blend and culling parameters.

/// A comparison function for depth testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum CompareFunction {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Which triangle faces are discarded when culling is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum CullMode {
    Front,
    #[default]
    Back,
    FrontAndBack,
}

/// A multiplier applied to a source or destination color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
}

/// How the weighted source and destination are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum BlendOperation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// The blend equation for one set of channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// Factor applied to the fragment shader output.
    pub src_factor: BlendFactor,
    /// Factor applied to the value already in the target.
    pub dst_factor: BlendFactor,
    /// The combining operation.
    pub operation: BlendOperation,
}

/// Blend equations, separate for the color and alpha channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    /// The equation for the RGB channels.
    pub color: BlendComponent,
    /// The equation for the alpha channel.
    pub alpha: BlendComponent,
}

impl BlendState {
    /// Classic `src-alpha, one-minus-src-alpha` blending on every channel.
    pub const ALPHA_BLENDING: BlendState = BlendState {
        color: BlendComponent {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponent {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
    };

    /// Output replaces the target.
    pub const REPLACE: BlendState = BlendState {
        color: BlendComponent {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponent {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
        },
    };
}

impl Default for BlendState {
    fn default() -> Self {
        Self::ALPHA_BLENDING
    }
}

/// A single change to the tracked render state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderStateChange {
    /// Sets the color the surface is cleared to at the start of each pass.
    ClearColor([f32; 4]),
    /// Toggles depth testing and sets the comparison.
    DepthTest {
        /// Whether depth testing is on.
        enabled: bool,
        /// The comparison to use.
        func: CompareFunction,
    },
    /// Toggles blending and sets the equations.
    Blend {
        /// Whether blending is on.
        enabled: bool,
        /// The equations to use.
        state: BlendState,
    },
    /// Toggles face culling and sets the culled face.
    CullFace {
        /// Whether culling is on.
        enabled: bool,
        /// The face to cull.
        mode: CullMode,
    },
}
