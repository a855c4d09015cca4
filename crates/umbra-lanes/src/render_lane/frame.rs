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

//! Per-frame inputs and the values derived from them.

use umbra_core::math::{Mat4, Viewport};
use umbra_core::renderer::{FrameKind, RenderTargetId};

/// The camera a frame is rendered from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    /// World-to-view transform.
    pub view: Mat4,
    /// View-to-clip transform.
    pub projection: Mat4,
}

impl CameraMatrices {
    /// Creates a camera from its two matrices.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Simulation time supplied by the caller each frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GameTime {
    /// Seconds since the simulation started.
    pub total_seconds: f64,
    /// Seconds since the previous frame.
    pub delta_seconds: f32,
}

impl GameTime {
    /// Creates a time sample.
    pub fn new(total_seconds: f64, delta_seconds: f32) -> Self {
        Self {
            total_seconds,
            delta_seconds,
        }
    }
}

/// Where a character portrait is composited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterView {
    /// The camera framing the character.
    pub camera: CameraMatrices,
    /// The region of the G-buffer and of the output the portrait covers.
    pub viewport: Viewport,
    /// The caller's target, or `None` for the default target.
    pub target: Option<RenderTargetId>,
}

/// State held by the pipeline for the duration of one frame.
///
/// Created by the entry transition and dropped by the exit transition, so
/// nothing here leaks from one frame into the next.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContext {
    /// Scene or character.
    pub kind: FrameKind,
    /// The frame's camera.
    pub camera: CameraMatrices,
    /// The frame's time sample.
    pub time: GameTime,
    /// `projection * view`.
    pub view_projection: Mat4,
    /// Inverse of `view_projection`, used to rebuild world positions from depth.
    pub inverse_view_projection: Mat4,
    /// Light-space view-projection, set by the shadow transition when a caster exists.
    pub light_view_projection: Option<Mat4>,
    /// The viewport geometry is rasterized into.
    pub viewport: Viewport,
    /// Character frames only: the composite destination.
    pub character_target: Option<RenderTargetId>,
    pub(crate) shadow_skip_reported: bool,
}

impl FrameContext {
    /// Derives the per-frame matrices.
    ///
    /// A singular view-projection falls back to identity for its inverse;
    /// only point-light and fog passes read it.
    pub fn new(kind: FrameKind, camera: CameraMatrices, time: GameTime, viewport: Viewport) -> Self {
        let view_projection = camera.view_projection();
        let inverse_view_projection = view_projection.inverse().unwrap_or_else(|| {
            log::warn!("Camera view-projection is singular; using identity inverse");
            Mat4::IDENTITY
        });
        Self {
            kind,
            camera,
            time,
            view_projection,
            inverse_view_projection,
            light_view_projection: None,
            viewport,
            character_target: None,
            shadow_skip_reported: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use umbra_core::math::{Extent2D, Vec3, FRAC_PI_2};

    #[test]
    fn test_inverse_view_projection_round_trips_points() {
        let camera = CameraMatrices::new(
            Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap(),
            Mat4::perspective_rh_zo(FRAC_PI_2, 16.0 / 9.0, 0.1, 100.0),
        );
        let ctx = FrameContext::new(
            FrameKind::Scene,
            camera,
            GameTime::default(),
            Viewport::full(Extent2D::new(16, 9)),
        );
        let world = Vec3::new(0.5, -0.25, 1.0);
        let clip = ctx.view_projection.transform_point3(world);
        let back = ctx.inverse_view_projection.transform_point3(clip);
        assert_relative_eq!(back.x, world.x, epsilon = 1e-3);
        assert_relative_eq!(back.y, world.y, epsilon = 1e-3);
        assert_relative_eq!(back.z, world.z, epsilon = 1e-3);
        assert!(ctx.light_view_projection.is_none());
    }
}
