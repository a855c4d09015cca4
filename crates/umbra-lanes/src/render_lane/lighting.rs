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

//! Light collections, shadow camera derivation and the light accumulation passes.

use super::frame::FrameContext;
use super::targets::RenderTargetSet;
use super::tier::RenderTier;
use crate::config::ShadowConfig;
use umbra_core::math::{LinearRgba, Mat4, Vec2, Vec3};
use umbra_core::renderer::{
    param, technique, BlendState, DepthState, Effect, LightDescriptor, LightKind, ParameterBlock,
    ParameterValue, RasterizerState, RenderDevice, RenderError, RenderTargetId,
};

/// Scene and dynamic lights for the current frame.
///
/// Scene lights are authored and persist across frames; dynamic lights are
/// gameplay effects re-submitted every frame. Only the first scene light can
/// cast shadows, and only when it is directional.
#[derive(Debug, Default, Clone)]
pub struct LightSet {
    scene: Vec<LightDescriptor>,
    dynamic: Vec<LightDescriptor>,
}

impl LightSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scene light.
    pub fn add_scene_light(&mut self, light: LightDescriptor) {
        self.scene.push(light);
    }

    /// Appends a dynamic light.
    ///
    /// Directional lights are rejected: they may only be scene lights.
    pub fn add_dynamic_light(&mut self, light: LightDescriptor) -> Result<(), RenderError> {
        if light.kind == LightKind::Directional {
            return Err(RenderError::InvalidArgument(
                "directional lights cannot be added as dynamic lights".to_owned(),
            ));
        }
        self.dynamic.push(light);
        Ok(())
    }

    /// Removes the dynamic light at `index`, if any.
    pub fn remove_dynamic_light(&mut self, index: usize) -> Option<LightDescriptor> {
        (index < self.dynamic.len()).then(|| self.dynamic.remove(index))
    }

    /// Removes every dynamic light.
    pub fn clear_dynamic_lights(&mut self) {
        self.dynamic.clear();
    }

    /// Removes every scene light.
    pub fn clear_scene_lights(&mut self) {
        self.scene.clear();
    }

    /// The scene lights in priority order.
    pub fn scene_lights(&self) -> &[LightDescriptor] {
        &self.scene
    }

    /// The dynamic lights.
    pub fn dynamic_lights(&self) -> &[LightDescriptor] {
        &self.dynamic
    }

    /// The light that casts shadows this frame: the first scene light if it
    /// is directional, otherwise none.
    pub fn shadow_caster(&self) -> Option<&LightDescriptor> {
        self.scene.first().filter(|light| light.is_directional())
    }
}

/// An orthographic camera looking at the world origin from a directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCamera {
    /// Eye position, `normalize(toward_light) * distance`.
    pub eye: Vec3,
    /// World-to-light transform.
    pub view: Mat4,
    /// Light orthographic projection.
    pub projection: Mat4,
}

impl ShadowCamera {
    /// Derives the shadow camera for a directional light whose location
    /// points from the scene toward the light.
    ///
    /// Returns `None` for a zero direction.
    pub fn for_direction(toward_light: Vec3, config: &ShadowConfig) -> Option<Self> {
        let direction = toward_light.normalize();
        if direction.length_squared() == 0.0 {
            return None;
        }
        let eye = direction * config.distance;
        let up = if direction.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, up)?;
        let projection =
            Mat4::orthographic_rh_zo(config.extent, config.extent, 1.0, config.distance * 2.0);
        Some(Self {
            eye,
            view,
            projection,
        })
    }

    /// `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// What the accumulator submitted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LightingStats {
    /// Full-screen passes drawn, ambient included.
    pub passes: usize,
    /// Lights skipped for having no contribution.
    pub skipped: usize,
    /// Whether the shadowed directional technique was used.
    pub shadowed: bool,
}

/// Accumulates ambient, scene and dynamic light into the bound target.
///
/// The light accumulation buffer must already be bound and cleared.
/// Blend state is forced to additive before every pass.
pub fn accumulate<D: RenderDevice, T: RenderTier>(
    device: &mut D,
    lights: &LightSet,
    targets: &RenderTargetSet,
    frame: &FrameContext,
    ambient: LinearRgba,
) -> LightingStats {
    let mut stats = LightingStats::default();
    let gbuffer = targets.gbuffer();
    let resolution = targets.resolution();

    device.set_depth_state(DepthState::Disabled);
    device.set_rasterizer_state(RasterizerState::CullNone);
    device.set_parameters(
        Effect::Lighting,
        &ParameterBlock::new()
            .with(param::ALBEDO_MAP, ParameterValue::Target(gbuffer.albedo))
            .with(param::DEPTH_MAP, ParameterValue::Target(gbuffer.depth))
            .with(param::NORMAL_MAP, ParameterValue::Target(gbuffer.normal))
            .with(
                param::INVERSE_VIEW_PROJECTION,
                ParameterValue::Matrix(frame.inverse_view_projection),
            )
            .with(
                param::SCREEN_RESOLUTION,
                ParameterValue::Vector2(Vec2::new(
                    resolution.width as f32,
                    resolution.height as f32,
                )),
            ),
    );

    device.set_blend_state(BlendState::Additive);
    device.set_parameters(
        Effect::Lighting,
        &ParameterBlock::new().with(param::AMBIENT_COLOR, ParameterValue::Color(ambient)),
    );
    device.apply_technique(Effect::Lighting, technique::AMBIENT);
    device.draw_fullscreen_quad();
    stats.passes += 1;

    let shadow = match (T::SUPPORTS_SHADOWS, frame.light_view_projection, targets.shadow_map()) {
        (true, Some(matrix), Some(map)) => Some((matrix, map)),
        _ => None,
    };

    for (index, light) in lights.scene_lights().iter().enumerate() {
        let casts = index == 0 && light.is_directional();
        let shadow = if casts { shadow } else { None };
        if light_pass(device, light, shadow) {
            stats.passes += 1;
            stats.shadowed |= shadow.is_some();
        } else {
            stats.skipped += 1;
        }
    }

    for light in lights.dynamic_lights() {
        if light_pass(device, light, None) {
            stats.passes += 1;
        } else {
            stats.skipped += 1;
        }
    }

    log::trace!(
        "Lighting: {} passes, {} skipped, shadowed: {}",
        stats.passes,
        stats.skipped,
        stats.shadowed
    );
    stats
}

/// Draws one light's contribution. Returns `false` if the light was skipped.
fn light_pass<D: RenderDevice>(
    device: &mut D,
    light: &LightDescriptor,
    shadow: Option<(Mat4, RenderTargetId)>,
) -> bool {
    let mut params = ParameterBlock::new()
        .with(param::LIGHT_COLOR, ParameterValue::Color(light.color.to_linear()))
        .with(param::LIGHT_INTENSITY, ParameterValue::Scalar(light.intensity));

    let technique = match light.kind {
        LightKind::Directional => {
            if light.intensity == 0.0 {
                return false;
            }
            params.set(
                param::LIGHT_DIRECTION,
                ParameterValue::Vector3(light.location.normalize()),
            );
            match shadow {
                Some((light_view_projection, shadow_map)) => {
                    params.set(
                        param::LIGHT_VIEW_PROJECTION,
                        ParameterValue::Matrix(light_view_projection),
                    );
                    params.set(param::SHADOW_MAP, ParameterValue::Target(shadow_map));
                    technique::DIRECTIONAL_SHADOW
                }
                None => technique::DIRECTIONAL,
            }
        }
        LightKind::Point => {
            params.set(param::LIGHT_POSITION, ParameterValue::Vector3(light.location));
            technique::POINT
        }
    };

    device.set_blend_state(BlendState::Additive);
    device.set_parameters(Effect::Lighting, &params);
    device.apply_technique(Effect::Lighting, technique);
    device.draw_fullscreen_quad();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use umbra_core::renderer::LightColor;

    fn sun(direction: Vec3) -> LightDescriptor {
        LightDescriptor::directional(direction, LightColor::WHITE, 1.0)
    }

    fn bulb() -> LightDescriptor {
        LightDescriptor::point(Vec3::new(1.0, 2.0, 3.0), LightColor::WHITE, 1.0)
    }

    #[test]
    fn test_no_scene_lights_means_no_caster() {
        assert!(LightSet::new().shadow_caster().is_none());
    }

    #[test]
    fn test_point_light_first_means_no_caster() {
        let mut lights = LightSet::new();
        lights.add_scene_light(bulb());
        lights.add_scene_light(sun(Vec3::Y));
        assert!(lights.shadow_caster().is_none());
    }

    #[test]
    fn test_directional_first_casts_regardless_of_rest() {
        let mut lights = LightSet::new();
        lights.add_scene_light(sun(Vec3::new(1.0, 1.0, 0.0)));
        lights.add_scene_light(sun(Vec3::Y));
        lights.add_scene_light(bulb());
        let caster = lights.shadow_caster().unwrap();
        assert_eq!(caster.location, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_dynamic_directional_is_rejected() {
        let mut lights = LightSet::new();
        assert!(matches!(
            lights.add_dynamic_light(sun(Vec3::Y)),
            Err(RenderError::InvalidArgument(_))
        ));
        assert!(lights.dynamic_lights().is_empty());
        lights.add_dynamic_light(bulb()).unwrap();
        assert_eq!(lights.remove_dynamic_light(0), Some(bulb()));
        assert_eq!(lights.remove_dynamic_light(0), None);
    }

    #[test]
    fn test_shadow_eye_sits_on_the_light_side() {
        let config = ShadowConfig {
            distance: 200.0,
            extent: 150.0,
        };
        let camera = ShadowCamera::for_direction(Vec3::new(0.0, 2.0, 0.0), &config).unwrap();
        assert_relative_eq!(camera.eye.y, 200.0);
        assert_relative_eq!(camera.eye.x, 0.0);
        assert_relative_eq!(camera.eye.z, 0.0);

        // The origin projects to the center of the shadow map.
        let origin = camera.view_projection().transform_point3(Vec3::ZERO);
        assert_relative_eq!(origin.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-5);
        assert!(origin.z > 0.0 && origin.z < 1.0);
    }

    #[test]
    fn test_oblique_light_eye_follows_normalized_location() {
        let config = ShadowConfig::default();
        let location = Vec3::new(3.0, 4.0, 0.0);
        let camera = ShadowCamera::for_direction(location, &config).unwrap();
        let expected = location.normalize() * config.distance;
        assert_relative_eq!(camera.eye.x, expected.x, epsilon = 1e-4);
        assert_relative_eq!(camera.eye.y, expected.y, epsilon = 1e-4);
        assert_relative_eq!(camera.eye.z, expected.z, epsilon = 1e-4);

        // Geometry nearer the light lands closer to the shadow map's near plane.
        let view_projection = camera.view_projection();
        let near_light = view_projection.transform_point3(location.normalize() * 10.0);
        let origin = view_projection.transform_point3(Vec3::ZERO);
        assert!(near_light.z < origin.z);
    }

    #[test]
    fn test_zero_direction_has_no_shadow_camera() {
        assert!(ShadowCamera::for_direction(Vec3::ZERO, &ShadowConfig::default()).is_none());
    }
}
