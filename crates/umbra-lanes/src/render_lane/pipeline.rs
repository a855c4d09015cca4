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

//! The deferred pipeline: the one object a frame loop talks to.

use super::drawer::{DrawStats, ModelDrawer};
use super::frame::{CameraMatrices, CharacterView, FrameContext, GameTime};
use super::lighting::{self, LightSet, LightingStats, ShadowCamera};
use super::model_cache::{ModelCache, ModelHandle};
use super::post_process;
use super::stage::{StageMachine, Transition};
use super::targets::RenderTargetSet;
use super::tier::{HiDef, RenderTier};
use crate::config::PipelineConfig;
use std::marker::PhantomData;
use umbra_core::asset::AssetLoader;
use umbra_core::math::{Extent2D, LinearRgba, Mat4, Quaternion, Vec3, Viewport};
use umbra_core::renderer::{
    param, technique, BlendState, DepthState, Effect, FrameKind, LightDescriptor, ParameterBlock,
    ParameterValue, PipelineStage, RasterizerState, RenderDevice, RenderError,
};

const GEOMETRY_STAGES: &[PipelineStage] = &[PipelineStage::Deferred, PipelineStage::Shadow];
const OVERLAY_STAGES: &[PipelineStage] = &[PipelineStage::Lighting];
const INACTIVE: &[PipelineStage] = &[PipelineStage::Inactive];

/// Scene G-buffer clear: transparent albedo, far depth, a zero normal packed into `[0, 1]`.
const SCENE_CLEAR: [LinearRgba; 3] = [
    LinearRgba::TRANSPARENT,
    LinearRgba::WHITE,
    LinearRgba::new(0.5, 0.5, 0.5, 0.0),
];

/// Character G-buffer clear: every surface opaque white.
const CHARACTER_CLEAR: [LinearRgba; 3] = [LinearRgba::WHITE; 3];

/// Shadow map clear value.
const SHADOW_CLEAR: LinearRgba = LinearRgba::BLACK;

/// A deferred renderer driving a [`RenderDevice`] through a fixed stage sequence.
///
/// A scene frame is:
///
/// ```text
/// start_drawing -> draw_* -> stop_deferred_start_shadow -> draw_* ->
/// stop_shadow_start_lighting -> draw_shield / draw_forward_unshaded -> stop_drawing
/// ```
///
/// A character (portrait) frame is `start_character -> draw_* -> finish_character`.
/// Every operation validates the live stage before touching the device.
///
/// The tier `T` fixes the feature set once, at construction.
#[derive(Debug)]
pub struct DeferredPipeline<D: RenderDevice, T: RenderTier = HiDef> {
    device: D,
    config: PipelineConfig,
    stages: StageMachine,
    targets: RenderTargetSet,
    models: ModelCache,
    lights: LightSet,
    drawer: ModelDrawer,
    frame: Option<FrameContext>,
    last_lighting: LightingStats,
    _tier: PhantomData<T>,
}

fn invalid_config(e: crate::config::ConfigError) -> RenderError {
    RenderError::InvalidArgument(e.to_string())
}

fn no_frame(operation: &str) -> RenderError {
    RenderError::InvalidArgument(format!("'{operation}' called with no frame in flight"))
}

impl<D: RenderDevice, T: RenderTier> DeferredPipeline<D, T> {
    /// Validates `config` and allocates every render target on `device`.
    ///
    /// ## Errors
    ///
    /// [`RenderError::InvalidArgument`] for an invalid configuration, or the
    /// device's error if a target cannot be created.
    pub fn new(mut device: D, config: PipelineConfig) -> Result<Self, RenderError> {
        config.validate().map_err(invalid_config)?;
        let targets = Self::allocate_targets(&mut device, config.resolution)?;
        log::info!(
            "Deferred pipeline ready: tier {}, {}x{}",
            T::NAME,
            config.resolution.width,
            config.resolution.height
        );
        Ok(Self {
            device,
            drawer: ModelDrawer::new(config.waterfall_period),
            config,
            stages: StageMachine::new(),
            targets,
            models: ModelCache::new(),
            lights: LightSet::new(),
            frame: None,
            last_lighting: LightingStats::default(),
            _tier: PhantomData,
        })
    }

    fn allocate_targets(device: &mut D, resolution: Extent2D) -> Result<RenderTargetSet, RenderError> {
        let shadow_map = T::SUPPORTS_SHADOWS.then_some(T::SHADOW_MAP_SIZE);
        RenderTargetSet::create(device, resolution, shadow_map, T::SUPPORTS_BLOOM)
    }

    /// The device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The device, mutably. Commands issued mid-frame interleave with the pipeline's.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The live stage.
    pub fn stage(&self) -> PipelineStage {
        self.stages.stage()
    }

    /// The pipeline-owned render targets.
    pub fn targets(&self) -> &RenderTargetSet {
        &self.targets
    }

    /// The scene and dynamic lights.
    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    /// The scene and dynamic lights, mutably.
    pub fn lights_mut(&mut self) -> &mut LightSet {
        &mut self.lights
    }

    /// The model cache.
    pub fn models(&self) -> &ModelCache {
        &self.models
    }

    /// Draw counters for the current (or last) frame.
    pub fn draw_stats(&self) -> DrawStats {
        self.drawer.stats()
    }

    /// What the last lighting stage submitted.
    pub fn lighting_stats(&self) -> LightingStats {
        self.last_lighting
    }

    /// The frame in flight, `None` while inactive.
    pub fn frame(&self) -> Option<&FrameContext> {
        self.frame.as_ref()
    }

    /// The drawer's instance buffer capacity, in instances.
    pub fn instance_capacity(&self) -> usize {
        self.drawer.instance_buffer().capacity()
    }

    /// Resolves a model through the cache, loading it on first use.
    pub fn load_model<L: AssetLoader>(
        &mut self,
        loader: &mut L,
        path: &str,
        texture_override: Option<&str>,
        emissive_override: Option<&str>,
    ) -> Result<ModelHandle, RenderError> {
        self.models
            .resolve(loader, path, texture_override, emissive_override)
    }

    // --- Lights ---

    /// Appends a persistent scene light. The first one, if directional, casts shadows.
    pub fn add_scene_light(&mut self, light: LightDescriptor) {
        self.lights.add_scene_light(light);
    }

    /// Appends a dynamic light. Directional lights are rejected.
    pub fn add_dynamic_light(&mut self, light: LightDescriptor) -> Result<(), RenderError> {
        self.lights.add_dynamic_light(light)
    }

    /// Removes the dynamic light at `index`, if any.
    pub fn remove_dynamic_light(&mut self, index: usize) -> Option<LightDescriptor> {
        self.lights.remove_dynamic_light(index)
    }

    /// Removes every dynamic light.
    pub fn clear_dynamic_lights(&mut self) {
        self.lights.clear_dynamic_lights();
    }

    /// Removes every scene light.
    pub fn clear_scene_lights(&mut self) {
        self.lights.clear_scene_lights();
    }

    // --- Stage transitions ---

    /// Begins a scene frame: binds and clears the G-buffer.
    ///
    /// ## Errors
    ///
    /// A stage violation unless the pipeline is inactive.
    pub fn start_drawing(&mut self, camera: CameraMatrices, time: GameTime) -> Result<(), RenderError> {
        self.stages.transition(Transition::StartScene)?;
        let viewport = Viewport::full(self.targets.resolution());
        self.drawer.begin_frame(time.delta_seconds);
        self.frame = Some(FrameContext::new(FrameKind::Scene, camera, time, viewport));
        self.bind_gbuffer(viewport, &SCENE_CLEAR, camera)
    }

    /// Begins a character frame that renders into `view.viewport`.
    ///
    /// Every G-buffer surface is cleared to opaque white.
    pub fn start_character(&mut self, view: CharacterView) -> Result<(), RenderError> {
        self.stages.transition(Transition::StartCharacter)?;
        self.drawer.begin_frame(0.0);
        let mut frame = FrameContext::new(
            FrameKind::Character,
            view.camera,
            GameTime::default(),
            view.viewport,
        );
        frame.character_target = view.target;
        self.frame = Some(frame);
        self.bind_gbuffer(view.viewport, &CHARACTER_CLEAR, view.camera)
    }

    fn bind_gbuffer(
        &mut self,
        viewport: Viewport,
        clear: &[LinearRgba; 3],
        camera: CameraMatrices,
    ) -> Result<(), RenderError> {
        self.device
            .set_render_targets(&self.targets.gbuffer().slots())?;
        self.device.set_viewport(viewport);
        self.device.clear(clear, Some(1.0));
        self.set_geometry_state(RasterizerState::CullBack);

        let camera_params = ParameterBlock::new()
            .with(param::VIEW, ParameterValue::Matrix(camera.view))
            .with(param::PROJECTION, ParameterValue::Matrix(camera.projection));
        for effect in Effect::DEFERRED {
            self.device.set_parameters(effect, &camera_params);
        }
        Ok(())
    }

    fn set_geometry_state(&mut self, rasterizer: RasterizerState) {
        self.device.set_blend_state(BlendState::Opaque);
        self.device.set_depth_state(DepthState::ReadWrite);
        self.device.set_rasterizer_state(rasterizer);
    }

    /// Ends G-buffer filling and begins shadow-map rendering.
    ///
    /// Without a shadow caster (or on a tier without shadows) nothing is
    /// bound and geometry draws in this stage are skipped.
    pub fn stop_deferred_start_shadow(&mut self) -> Result<(), RenderError> {
        self.stages.transition(Transition::BeginShadow)?;

        let shadow_camera = if T::SUPPORTS_SHADOWS {
            self.lights
                .shadow_caster()
                .and_then(|caster| ShadowCamera::for_direction(caster.location, &self.config.shadow))
        } else {
            None
        };
        let light_view_projection = shadow_camera.map(|camera| camera.view_projection());
        if let Some(frame) = self.frame.as_mut() {
            frame.light_view_projection = light_view_projection;
        }

        match (
            light_view_projection,
            self.targets.shadow_map(),
            self.targets.shadow_map_size(),
        ) {
            (Some(matrix), Some(map), Some(size)) => {
                self.device.set_render_targets(&[map])?;
                self.device.set_viewport(Viewport::full(size));
                self.device.clear(&[SHADOW_CLEAR], Some(1.0));
                // Both faces write depth into the shadow map.
                self.set_geometry_state(RasterizerState::CullNone);
                let params = ParameterBlock::new()
                    .with(param::LIGHT_VIEW_PROJECTION, ParameterValue::Matrix(matrix));
                for effect in Effect::DEFERRED {
                    self.device.set_parameters(effect, &params);
                }
            }
            _ => log::trace!("No shadow caster this frame"),
        }
        Ok(())
    }

    /// Ends shadow rendering, then accumulates light and composites edges
    /// and fog into the light accumulation buffer.
    ///
    /// Forward overlays may be drawn afterwards.
    pub fn stop_shadow_start_lighting(&mut self) -> Result<(), RenderError> {
        self.stages.transition(Transition::BeginLighting)?;
        let resolution = self.targets.resolution();
        self.device
            .set_render_targets(&[self.targets.light_accumulation()])?;
        self.device.set_viewport(Viewport::full(resolution));
        self.device.clear(&[LinearRgba::TRANSPARENT], None);

        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| no_frame("stop_shadow_start_lighting"))?;
        self.last_lighting = lighting::accumulate::<D, T>(
            &mut self.device,
            &self.lights,
            &self.targets,
            frame,
            self.config.ambient_color,
        );
        post_process::composite_scene::<D, T>(&mut self.device, &self.targets, frame, &self.config);
        Ok(())
    }

    /// Runs bloom and tonemapping, presents, and returns to inactive.
    pub fn stop_drawing(&mut self) -> Result<(), RenderError> {
        self.stages.transition(Transition::EndFrame)?;
        let result = post_process::finish_frame::<D, T>(&mut self.device, &self.targets, &self.config);
        self.frame = None;
        let stats = self.drawer.stats();
        log::trace!(
            "Frame done: {} draw calls, {} instances, {} light passes",
            stats.draw_calls,
            stats.instances,
            self.last_lighting.passes
        );
        result
    }

    /// Composites the character G-buffer into the caller's target (or the
    /// default target) and restores the full default viewport.
    pub fn finish_character(&mut self) -> Result<(), RenderError> {
        self.stages.transition(Transition::FinishCharacter)?;
        let frame = self.frame.take();
        let viewport = frame
            .as_ref()
            .map_or_else(|| Viewport::full(self.targets.resolution()), |f| f.viewport);

        match frame.as_ref().and_then(|f| f.character_target) {
            Some(target) => self.device.set_render_targets(&[target])?,
            None => self.device.set_default_target(),
        }
        self.device.set_viewport(viewport);
        self.device.set_depth_state(DepthState::Disabled);
        self.device.set_rasterizer_state(RasterizerState::CullNone);
        self.device.set_blend_state(BlendState::Opaque);

        let gbuffer = *self.targets.gbuffer();
        self.device.set_parameters(
            Effect::CharacterComposite,
            &ParameterBlock::new()
                .with(param::ALBEDO_MAP, ParameterValue::Target(gbuffer.albedo))
                .with(param::NORMAL_MAP, ParameterValue::Target(gbuffer.normal))
                .with(param::DEPTH_MAP, ParameterValue::Target(gbuffer.depth))
                .with(
                    param::AMBIENT_COLOR,
                    ParameterValue::Color(self.config.ambient_color),
                ),
        );
        self.device
            .apply_technique(Effect::CharacterComposite, technique::COMPOSITE);
        self.device.draw_fullscreen_quad();

        self.device.set_default_target();
        self.device
            .set_viewport(Viewport::full(self.targets.resolution()));
        self.device.unbind_textures();
        Ok(())
    }

    // --- Geometry ---

    /// Records a shadow-stage draw that cannot land anywhere; warns once per frame.
    fn skip_shadow_draw(&mut self, operation: &'static str) -> bool {
        if self.stages.stage() != PipelineStage::Shadow {
            return false;
        }
        let Some(frame) = self.frame.as_mut() else {
            return true;
        };
        if T::SUPPORTS_SHADOWS && frame.light_view_projection.is_some() {
            return false;
        }
        self.drawer.stats_mut().skipped_shadow_draws += 1;
        if !frame.shadow_skip_reported {
            frame.shadow_skip_reported = true;
            log::warn!("{operation} in the shadow stage without a shadow caster; skipped");
        }
        true
    }

    /// Draws a model at `position`/`rotation`/`scale` (world = T·R·S).
    ///
    /// `bones` selects the skinned effect when the model has skinning data.
    pub fn draw_model(
        &mut self,
        handle: &ModelHandle,
        position: Vec3,
        rotation: Quaternion,
        scale: Vec3,
        bones: Option<&[Mat4]>,
    ) -> Result<(), RenderError> {
        self.stages.require("draw_model", GEOMETRY_STAGES)?;
        if self.skip_shadow_draw("draw_model") {
            return Ok(());
        }
        let world = Mat4::from_scale_rotation_translation(scale, rotation, position);
        self.drawer
            .draw_model(&mut self.device, self.stages.stage(), handle, world, bones)
    }

    /// Draws a single-submesh model once per world transform.
    pub fn draw_instanced(&mut self, handle: &ModelHandle, transforms: &[Mat4]) -> Result<(), RenderError> {
        self.stages.require("draw_instanced", GEOMETRY_STAGES)?;
        if self.skip_shadow_draw("draw_instanced") {
            return Ok(());
        }
        self.drawer
            .draw_instanced::<D, T>(&mut self.device, self.stages.stage(), handle, transforms)
    }

    // --- Forward overlays ---

    /// Draws an additive shield overlay over the lit image.
    pub fn draw_shield(&mut self, handle: &ModelHandle, world: Mat4, color: LinearRgba) -> Result<(), RenderError> {
        self.overlay(
            "draw_shield",
            handle,
            world,
            color,
            technique::SHIELD,
            BlendState::Additive,
            RasterizerState::CullBack,
        )
    }

    /// Draws an unlit, alpha-blended model over the lit image.
    pub fn draw_forward_unshaded(
        &mut self,
        handle: &ModelHandle,
        world: Mat4,
        color: LinearRgba,
    ) -> Result<(), RenderError> {
        self.overlay(
            "draw_forward_unshaded",
            handle,
            world,
            color,
            technique::UNSHADED,
            BlendState::NonPremultiplied,
            RasterizerState::CullBack,
        )
    }

    /// Draws `unit_cube` (centered, edge length 1) stretched over `[min, max]` in wireframe.
    pub fn draw_bounding_box(
        &mut self,
        unit_cube: &ModelHandle,
        min: Vec3,
        max: Vec3,
        color: LinearRgba,
    ) -> Result<(), RenderError> {
        let world = Mat4::from_scale_rotation_translation(
            max - min,
            Quaternion::IDENTITY,
            (min + max) * 0.5,
        );
        self.overlay(
            "draw_bounding_box",
            unit_cube,
            world,
            color,
            technique::UNSHADED,
            BlendState::NonPremultiplied,
            RasterizerState::Wireframe,
        )
    }

    /// Draws `unit_sphere` (radius 1) scaled to `radius` at `center` in wireframe.
    pub fn draw_bounding_sphere(
        &mut self,
        unit_sphere: &ModelHandle,
        center: Vec3,
        radius: f32,
        color: LinearRgba,
    ) -> Result<(), RenderError> {
        let world =
            Mat4::from_scale_rotation_translation(Vec3::ONE * radius, Quaternion::IDENTITY, center);
        self.overlay(
            "draw_bounding_sphere",
            unit_sphere,
            world,
            color,
            technique::UNSHADED,
            BlendState::NonPremultiplied,
            RasterizerState::Wireframe,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn overlay(
        &mut self,
        operation: &'static str,
        handle: &ModelHandle,
        world: Mat4,
        color: LinearRgba,
        technique: &'static str,
        blend: BlendState,
        rasterizer: RasterizerState,
    ) -> Result<(), RenderError> {
        self.stages.require(operation, OVERLAY_STAGES)?;
        let frame = self.frame.as_ref().ok_or_else(|| no_frame(operation))?;
        self.drawer.draw_overlay(
            &mut self.device,
            frame,
            handle,
            world,
            color,
            technique,
            blend,
            rasterizer,
        )
    }

    // --- Resources ---

    /// Rebuilds every render target for `resolution`.
    ///
    /// The new set is allocated before the old one is released, so a failed
    /// resize leaves the pipeline usable at its previous resolution.
    ///
    /// ## Errors
    ///
    /// A stage violation unless inactive; an argument error for an empty resolution.
    pub fn resize(&mut self, resolution: Extent2D) -> Result<(), RenderError> {
        self.stages.require("resize", INACTIVE)?;
        if resolution.is_empty() {
            return Err(RenderError::InvalidArgument(format!(
                "cannot resize to {}x{}",
                resolution.width, resolution.height
            )));
        }
        if resolution == self.targets.resolution() {
            return Ok(());
        }
        let targets = Self::allocate_targets(&mut self.device, resolution)?;
        let old = std::mem::replace(&mut self.targets, targets);
        self.config.resolution = resolution;
        log::info!("Resized render targets to {}x{}", resolution.width, resolution.height);
        old.destroy(&mut self.device)
    }

    /// Drops every cached model and light, frees the instance buffer and
    /// rebuilds the render targets.
    pub fn reset(&mut self) -> Result<(), RenderError> {
        self.stages.require("reset", INACTIVE)?;
        self.models.clear();
        self.lights = LightSet::new();
        self.drawer.release(&mut self.device)?;
        let targets = Self::allocate_targets(&mut self.device, self.config.resolution)?;
        let old = std::mem::replace(&mut self.targets, targets);
        log::info!("Pipeline reset");
        old.destroy(&mut self.device)
    }

    /// Replaces the configuration, resizing if the resolution changed.
    pub fn update_config(&mut self, config: PipelineConfig) -> Result<(), RenderError> {
        self.stages.require("update_config", INACTIVE)?;
        config.validate().map_err(invalid_config)?;
        self.resize(config.resolution)?;
        if config.waterfall_period != self.config.waterfall_period {
            self.drawer.release(&mut self.device)?;
            self.drawer = ModelDrawer::new(config.waterfall_period);
        }
        self.config = config;
        Ok(())
    }

    /// Releases every device resource and hands the device back.
    pub fn shutdown(mut self) -> Result<D, RenderError> {
        self.stages.require("shutdown", INACTIVE)?;
        self.drawer.release(&mut self.device)?;
        self.targets.destroy(&mut self.device)?;
        Ok(self.device)
    }
}
