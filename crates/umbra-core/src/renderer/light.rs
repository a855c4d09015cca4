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

//! Defines light descriptors for the rendering system.
//!
//! A [`LightDescriptor`] is the pipeline's only view of a light. Its
//! `location` is interpreted by kind: a world-space position for point
//! lights, the direction light travels for directional lights.

use crate::math::{LinearRgba, Vec3};
use serde::{Deserialize, Serialize};

/// The type of a light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightKind {
    /// Emits in all directions from `location`.
    Point,
    /// Parallel rays travelling along `location`.
    Directional,
}

impl LightKind {
    /// The tag stored in the binary light record.
    pub const fn tag(self) -> u32 {
        match self {
            LightKind::Point => 0,
            LightKind::Directional => 1,
        }
    }

    /// Maps a binary record tag back to a kind.
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(LightKind::Point),
            1 => Some(LightKind::Directional),
            _ => None,
        }
    }
}

/// An 8-bit-per-channel RGB light color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LightColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl LightColor {
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Creates a color from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts to a linear color with full alpha.
    pub fn to_linear(self) -> LinearRgba {
        LinearRgba::from_rgb8(self.r, self.g, self.b)
    }
}

/// A light submitted to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightDescriptor {
    /// Point or directional.
    pub kind: LightKind,
    /// The light color.
    pub color: LightColor,
    /// A scalar multiplier on `color`. Zero disables directional lights.
    pub intensity: f32,
    /// Position for point lights. For directional lights, a vector pointing
    /// from the scene toward the light.
    pub location: Vec3,
}

impl LightDescriptor {
    /// Creates a point light at `position`.
    pub fn point(position: Vec3, color: LightColor, intensity: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            intensity,
            location: position,
        }
    }

    /// Creates a directional light shining from `toward_light` onto the scene.
    pub fn directional(toward_light: Vec3, color: LightColor, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            location: toward_light,
        }
    }

    /// Returns `true` for directional lights.
    #[inline]
    pub fn is_directional(&self) -> bool {
        self.kind == LightKind::Directional
    }

    /// The color premultiplied by intensity.
    pub fn radiance(&self) -> LinearRgba {
        self.color.to_linear().scale_rgb(self.intensity)
    }
}
