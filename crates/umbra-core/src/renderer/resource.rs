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

//! Opaque resource handles, fixed-function state and draw descriptors.

use crate::math::Extent2D;

/// An opaque handle to a render target owned by a [`RenderDevice`](super::RenderDevice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub u64);

/// An opaque handle to a GPU buffer (used for per-instance transforms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// An opaque handle to a texture produced by the external asset loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// An opaque handle to uploaded vertex/index data produced by the asset loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(pub u64);

/// Pixel formats the pipeline asks for when allocating render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFormat {
    /// 8 bits per channel, normalized. Albedo and normals.
    Rgba8,
    /// 16-bit float per channel. Light accumulation and bloom buffers.
    Rgba16Float,
    /// A single 32-bit float channel. Linear depth and shadow depth.
    R32Float,
}

/// Describes a render target to allocate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetDescriptor {
    /// A debug label, e.g. `"gbuffer.albedo"`.
    pub label: &'static str,
    /// The size of the target in pixels.
    pub size: Extent2D,
    /// The pixel format.
    pub format: SurfaceFormat,
    /// Whether the target carries an attached depth buffer.
    pub with_depth: bool,
}

/// Output-merger blend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendState {
    /// Source replaces destination.
    #[default]
    Opaque,
    /// `dst = src + dst`. Mandatory for every light contribution.
    Additive,
    /// `dst = src * src.a + dst * (1 - src.a)`, source not premultiplied.
    NonPremultiplied,
}

/// Depth test/write configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthState {
    /// Depth test and depth writes enabled.
    #[default]
    ReadWrite,
    /// Depth test enabled, writes disabled.
    ReadOnly,
    /// No depth test, no writes. Full-screen passes.
    Disabled,
}

/// Rasterizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RasterizerState {
    /// Solid fill, back faces culled.
    #[default]
    CullBack,
    /// Solid fill, no culling.
    CullNone,
    /// Wireframe, no culling. Debug overlays.
    Wireframe,
}

/// The index range of a single submesh inside a [`GeometryId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SubmeshRange {
    /// Offset added to each index before fetching vertices.
    pub base_vertex: u32,
    /// Number of vertices referenced by this submesh.
    pub vertex_count: u32,
    /// First index in the index buffer.
    pub start_index: u32,
    /// Number of triangles.
    pub primitive_count: u32,
}

/// An indexed draw of one submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedDraw {
    /// The geometry holding the vertex and index buffers.
    pub geometry: GeometryId,
    /// The submesh to draw.
    pub range: SubmeshRange,
}

/// An instanced draw: one submesh, many per-instance transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstancedDraw {
    /// The geometry and submesh to replicate.
    pub draw: IndexedDraw,
    /// The buffer holding one [`InstanceTransform`] per instance.
    pub instance_buffer: BufferId,
    /// The number of instances to draw.
    pub instance_count: u32,
}

/// Per-instance vertex data: a world matrix in column order.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct InstanceTransform {
    /// Column-major world matrix.
    pub world: [[f32; 4]; 4],
}

impl From<crate::math::Mat4> for InstanceTransform {
    fn from(m: crate::math::Mat4) -> Self {
        Self {
            world: m.to_cols_array_2d(),
        }
    }
}
