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

//! Per-draw inputs: bindings, counts, uniforms and attribute pointers.

/// A texture bound to a texture unit for immediate-mode draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding<'a> {
    /// The texture unit.
    pub unit: u32,
    /// The texture name.
    pub texture: &'a str,
    /// An optional sampler object (extended backend only).
    pub sampler: Option<&'a str>,
    /// An optional sampler uniform that receives the unit index.
    pub uniform: Option<&'a str>,
}

/// Everything one `render()` call draws.
///
/// Slots are caller-specified; nothing is bound implicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall<'a> {
    /// `(slot, buffer name)` pairs.
    pub vertex_buffers: Vec<(u32, &'a str)>,
    /// `(group index, bind group name)` pairs (encoder-based only).
    pub bind_groups: Vec<(u32, &'a str)>,
    /// Textures bound to units (immediate-mode backends only).
    pub textures: Vec<TextureBinding<'a>>,
    /// The index buffer, for an indexed draw.
    pub index_buffer: Option<&'a str>,
    /// Number of indices; derived from the index buffer size when `None`.
    pub index_count: Option<u32>,
    /// Number of vertices, for a non-indexed draw.
    pub vertex_count: Option<u32>,
    /// Number of instances.
    pub instance_count: u32,
}

impl Default for DrawCall<'_> {
    fn default() -> Self {
        Self {
            vertex_buffers: Vec::new(),
            bind_groups: Vec::new(),
            textures: Vec::new(),
            index_buffer: None,
            index_count: None,
            vertex_count: None,
            instance_count: 1,
        }
    }
}

impl<'a> DrawCall<'a> {
    /// An empty draw call: clears the target and draws nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a vertex buffer at `slot`.
    pub fn vertex_buffer(mut self, slot: u32, name: &'a str) -> Self {
        self.vertex_buffers.push((slot, name));
        self
    }

    /// Binds a bind group at `index`.
    pub fn bind_group(mut self, index: u32, name: &'a str) -> Self {
        self.bind_groups.push((index, name));
        self
    }

    /// Binds a texture to a texture unit.
    pub fn texture(mut self, unit: u32, texture: &'a str) -> Self {
        self.textures.push(TextureBinding {
            unit,
            texture,
            sampler: None,
            uniform: None,
        });
        self
    }

    /// Draws `count` indices from `index_buffer`.
    pub fn indexed(mut self, index_buffer: &'a str, count: u32) -> Self {
        self.index_buffer = Some(index_buffer);
        self.index_count = Some(count);
        self
    }

    /// Draws `count` vertices without an index buffer.
    pub fn vertices(mut self, count: u32) -> Self {
        self.vertex_count = Some(count);
        self
    }

    /// Sets the instance count.
    pub fn instances(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }
}

/// Workgroup counts and bindings for one compute dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeDispatch<'a> {
    /// Workgroups along x.
    pub x: u32,
    /// Workgroups along y.
    pub y: u32,
    /// Workgroups along z.
    pub z: u32,
    /// `(group index, bind group name)` pairs.
    pub bind_groups: Vec<(u32, &'a str)>,
}

impl<'a> ComputeDispatch<'a> {
    /// Dispatches `x` workgroups, with `y` and `z` set to 1.
    pub fn new(x: u32) -> Self {
        Self {
            x,
            y: 1,
            z: 1,
            bind_groups: Vec::new(),
        }
    }

    /// Binds a bind group at `index`.
    pub fn bind_group(mut self, index: u32, name: &'a str) -> Self {
        self.bind_groups.push((index, name));
        self
    }
}

/// A value uploaded to a program uniform (immediate-mode backends).
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl UniformValue {
    /// The raw bytes of the value, in native endianness.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Int(v) => bytemuck::bytes_of(v),
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::cast_slice(v),
            UniformValue::Vec3(v) => bytemuck::cast_slice(v),
            UniformValue::Vec4(v) => bytemuck::cast_slice(v),
            UniformValue::Mat3(v) => bytemuck::cast_slice(v),
            UniformValue::Mat4(v) => bytemuck::cast_slice(v),
        }
    }
}

/// The component type of an immediate-mode vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum AttributeType {
    Float,
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
}

/// One `vertexAttribPointer`-style attribute description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePointer {
    /// The attribute name in the current program.
    pub name: String,
    /// Number of components, 1 to 4.
    pub components: u8,
    /// Component type.
    pub ty: AttributeType,
    /// Whether integer data is normalized to `[0, 1]` or `[-1, 1]`.
    pub normalized: bool,
    /// Distance in bytes between consecutive vertices.
    pub stride: u32,
    /// Byte offset of the first component.
    pub offset: u32,
}

impl AttributePointer {
    /// A float attribute.
    pub fn float(name: impl Into<String>, components: u8, stride: u32, offset: u32) -> Self {
        Self {
            name: name.into(),
            components,
            ty: AttributeType::Float,
            normalized: false,
            stride,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_call_defaults_to_one_instance() {
        let draw = DrawCall::new().vertices(3);
        assert_eq!(draw.instance_count, 1);
        assert_eq!(draw.vertex_count, Some(3));
        assert!(draw.index_buffer.is_none());
    }

    #[test]
    fn compute_dispatch_defaults_y_and_z() {
        let dispatch = ComputeDispatch::new(8).bind_group(0, "particles");
        assert_eq!((dispatch.x, dispatch.y, dispatch.z), (8, 1, 1));
        assert_eq!(dispatch.bind_groups, vec![(0, "particles")]);
    }

    #[test]
    fn mat4_uniform_is_64_bytes() {
        let identity = UniformValue::Mat4([
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ]);
        assert_eq!(identity.as_bytes().len(), 64);
        assert_eq!(UniformValue::Int(7).as_bytes().len(), 4);
    }
}
