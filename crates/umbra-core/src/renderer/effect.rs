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

//! The effect binding contract.
//!
//! Shader programs are opaque to the pipeline. A pass names an [`Effect`],
//! binds a [`ParameterBlock`] of named values and then selects a technique by
//! name. Backends map these names onto whatever program objects they compile.

use crate::math::{LinearRgba, Mat4, Vec2, Vec3};
use crate::renderer::resource::{RenderTargetId, TextureId};

/// The effects the deferred pipeline drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// G-buffer fill for meshes with a base-color texture.
    DeferredTextured,
    /// G-buffer fill for meshes using per-submesh flat colors.
    DeferredColored,
    /// G-buffer fill for skinned meshes.
    DeferredSkinned,
    /// Full-screen light contribution passes.
    Lighting,
    /// Fog/background and edge-highlight composites.
    PostProcess,
    /// Bloom downsample and separable blur.
    Bloom,
    /// HDR to display-range conversion.
    Tonemap,
    /// Screen-space G-buffer composite for character portraits.
    CharacterComposite,
    /// Non-deferred overlays: shields and debug wireframes.
    Forward,
}

impl Effect {
    /// The effect name as a backend would look it up.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::DeferredTextured => "DeferredTextured",
            Effect::DeferredColored => "DeferredColored",
            Effect::DeferredSkinned => "DeferredSkinned",
            Effect::Lighting => "Lighting",
            Effect::PostProcess => "PostProcess",
            Effect::Bloom => "Bloom",
            Effect::Tonemap => "Tonemap",
            Effect::CharacterComposite => "CharacterComposite",
            Effect::Forward => "Forward",
        }
    }

    /// The effects that receive the frame's view and projection at frame start.
    pub const DEFERRED: [Effect; 3] = [
        Effect::DeferredTextured,
        Effect::DeferredColored,
        Effect::DeferredSkinned,
    ];
}

/// Technique names.
pub mod technique {
    /// G-buffer fill, one draw per submesh.
    pub const DEFERRED: &str = "Deferred";
    /// G-buffer fill from a per-instance transform stream.
    pub const DEFERRED_INSTANCED: &str = "DeferredInstanced";
    /// Depth-from-light fill for shadow casters.
    pub const LIGHT_SPACE: &str = "LightSpace";
    /// Depth-from-light fill from a per-instance transform stream.
    pub const LIGHT_SPACE_INSTANCED: &str = "LightSpaceInstanced";

    /// Ambient term decoded from the G-buffer.
    pub const AMBIENT: &str = "Ambient";
    /// Directional light without shadow lookup.
    pub const DIRECTIONAL: &str = "Directional";
    /// Directional light sampling the shadow map.
    pub const DIRECTIONAL_SHADOW: &str = "DirectionalShadow";
    /// Point light reconstructing world position from depth.
    pub const POINT: &str = "Point";

    /// Background plus depth-based fog.
    pub const FOG: &str = "Fog";
    /// Background only.
    pub const NO_FOG: &str = "NoFog";
    /// Depth/normal discontinuity highlighting.
    pub const EDGES: &str = "Edges";

    /// First bloom downsample; suppresses values below 1.0.
    pub const DOWNSAMPLE_HDR: &str = "DownsampleHdr";
    /// Plain averaging downsample.
    pub const DOWNSAMPLE: &str = "Downsample";
    /// Vertical separable blur.
    pub const BLUR_VERTICAL: &str = "BlurVertical";
    /// Horizontal separable blur.
    pub const BLUR_HORIZONTAL: &str = "BlurHorizontal";
    /// Final HDR resolve.
    pub const TONEMAP: &str = "Tonemap";

    /// Character portrait composite.
    pub const COMPOSITE: &str = "Composite";
    /// Additive translucent overlay.
    pub const SHIELD: &str = "Shield";
    /// Flat unlit color.
    pub const UNSHADED: &str = "Unshaded";
}

/// Parameter names.
#[allow(missing_docs)]
pub mod param {
    pub const WORLD: &str = "World";
    pub const VIEW: &str = "View";
    pub const PROJECTION: &str = "Projection";
    pub const LIGHT_VIEW_PROJECTION: &str = "LightViewProjection";
    pub const INVERSE_VIEW_PROJECTION: &str = "InverseViewProjection";
    pub const BONES: &str = "Bones";

    pub const DIFFUSE_COLOR: &str = "DiffuseColor";
    pub const TEXTURE: &str = "Texture";
    pub const EMISSIVE_TEXTURE: &str = "EmissiveTexture";
    pub const TEXTURE_OFFSET: &str = "TextureOffset";

    pub const AMBIENT_COLOR: &str = "AmbientColor";
    pub const LIGHT_COLOR: &str = "LightColor";
    pub const LIGHT_INTENSITY: &str = "LightIntensity";
    pub const LIGHT_DIRECTION: &str = "LightDirection";
    pub const LIGHT_POSITION: &str = "LightPosition";

    pub const ALBEDO_MAP: &str = "AlbedoMap";
    pub const DEPTH_MAP: &str = "DepthMap";
    pub const NORMAL_MAP: &str = "NormalMap";
    pub const SHADOW_MAP: &str = "ShadowMap";
    pub const SOURCE_MAP: &str = "SourceMap";

    pub const SAMPLE_OFFSET: &str = "SampleOffset";
    pub const SOURCE_SCALE: &str = "SourceScale";
    pub const SCREEN_RESOLUTION: &str = "ScreenResolution";

    pub const BACKGROUND_OUTER: &str = "BackgroundOuter";
    pub const BACKGROUND_INNER: &str = "BackgroundInner";
    pub const FOG_BEGIN: &str = "FogBegin";
    pub const FOG_END: &str = "FogEnd";

    pub const EDGE_DEPTH_SENSITIVITY: &str = "EdgeDepthSensitivity";
    pub const EDGE_NORMAL_SENSITIVITY: &str = "EdgeNormalSensitivity";
    pub const EDGE_THRESHOLD: &str = "EdgeThreshold";

    pub const OVERLAY_COLOR: &str = "OverlayColor";
}

/// A value bound to a named effect parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// A single float.
    Scalar(f32),
    /// A 2-component vector.
    Vector2(Vec2),
    /// A 3-component vector.
    Vector3(Vec3),
    /// A linear color.
    Color(LinearRgba),
    /// A 4x4 matrix.
    Matrix(Mat4),
    /// A matrix palette (bone transforms).
    MatrixArray(Vec<Mat4>),
    /// A texture from the asset loader.
    Texture(TextureId),
    /// A render target sampled as a texture.
    Target(RenderTargetId),
}

/// An ordered set of named parameter values for one effect application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBlock {
    entries: Vec<(&'static str, ParameterValue)>,
}

impl ParameterBlock {
    /// Creates an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter, builder style.
    pub fn with(mut self, name: &'static str, value: ParameterValue) -> Self {
        self.set(name, value);
        self
    }

    /// Adds or replaces a parameter.
    pub fn set(&mut self, name: &'static str, value: ParameterValue) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Iterates the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParameterValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }

    /// The number of parameters in the block.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the block holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
