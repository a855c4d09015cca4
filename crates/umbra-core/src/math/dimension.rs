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

//! Pixel-space sizes and rectangles.

use serde::{Deserialize, Serialize};

/// A two-dimensional extent, typically representing width and height.
///
/// Used for the target resolution and the size of every render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Divides both axes by `factor`, never going below one pixel.
    #[inline]
    pub fn downscaled(self, factor: u32) -> Self {
        Self::new((self.width / factor).max(1), (self.height / factor).max(1))
    }

    /// Returns `true` if either axis is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A rectangular region of a render target, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    /// The x-coordinate of the top-left corner.
    pub x: u32,
    /// The y-coordinate of the top-left corner.
    pub y: u32,
    /// The width of the region.
    pub width: u32,
    /// The height of the region.
    pub height: u32,
}

impl Viewport {
    /// A viewport covering the whole of a target of the given size.
    #[inline]
    pub const fn full(size: Extent2D) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    /// The size of the region.
    #[inline]
    pub const fn extent(&self) -> Extent2D {
        Extent2D::new(self.width, self.height)
    }
}
