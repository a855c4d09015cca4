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

//! Model and instance draw submission.

use super::frame::FrameContext;
use super::model_cache::ModelHandle;
use super::tier::RenderTier;
use umbra_core::math::{LinearRgba, Mat4, Vec2};
use umbra_core::renderer::{
    param, technique, BlendState, BufferId, DepthState, Effect, IndexedDraw, InstanceTransform,
    InstancedDraw, ParameterBlock, ParameterValue, PipelineStage, RasterizerState, RenderDevice,
    RenderError,
};

/// Instance capacity of the first instance buffer allocation.
const INITIAL_INSTANCE_CAPACITY: usize = 64;

/// Picks the effect and technique for a geometry draw.
///
/// Skinned models use the skinned effect when bones are supplied. Otherwise
/// textured models use the textured effect while filling the G-buffer and
/// everything else uses the flat-color effect. In the shadow stage the
/// light-space technique replaces the deferred one.
pub fn select_pass(
    handle: &ModelHandle,
    with_bones: bool,
    stage: PipelineStage,
    instanced: bool,
) -> (Effect, &'static str) {
    let shadow = stage == PipelineStage::Shadow;
    let effect = if with_bones && handle.skinning().is_some() {
        Effect::DeferredSkinned
    } else if handle.texture().is_some() && !shadow {
        Effect::DeferredTextured
    } else {
        Effect::DeferredColored
    };
    let technique = match (shadow, instanced) {
        (false, false) => technique::DEFERRED,
        (false, true) => technique::DEFERRED_INSTANCED,
        (true, false) => technique::LIGHT_SPACE,
        (true, true) => technique::LIGHT_SPACE_INSTANCED,
    };
    (effect, technique)
}

/// A growable device buffer of per-instance transforms.
///
/// Capacity only ever grows, to the larger of the request and twice the
/// previous capacity.
#[derive(Debug, Default)]
pub struct InstanceBuffer {
    id: Option<BufferId>,
    capacity: usize,
}

impl InstanceBuffer {
    /// The current capacity in instances.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The device buffer, once allocated.
    pub fn id(&self) -> Option<BufferId> {
        self.id
    }

    /// Ensures room for `count` instances, reallocating if needed.
    pub fn reserve<D: RenderDevice>(
        &mut self,
        device: &mut D,
        count: usize,
    ) -> Result<BufferId, RenderError> {
        if let Some(id) = self.id {
            if count <= self.capacity {
                return Ok(id);
            }
        }
        let capacity = count
            .max(self.capacity * 2)
            .max(INITIAL_INSTANCE_CAPACITY);
        if let Some(old) = self.id.take() {
            device.destroy_buffer(old)?;
        }
        let id = device.create_instance_buffer(capacity)?;
        log::debug!(
            "Instance buffer grown from {} to {} instances",
            self.capacity,
            capacity
        );
        self.id = Some(id);
        self.capacity = capacity;
        Ok(id)
    }

    /// Uploads `transforms`, growing the buffer first if needed.
    pub fn upload<D: RenderDevice>(
        &mut self,
        device: &mut D,
        transforms: &[Mat4],
    ) -> Result<BufferId, RenderError> {
        let id = self.reserve(device, transforms.len())?;
        let data: Vec<InstanceTransform> = transforms.iter().copied().map(Into::into).collect();
        device.write_instance_buffer(id, bytemuck::cast_slice(&data))?;
        Ok(id)
    }

    /// Frees the device buffer.
    pub fn release<D: RenderDevice>(&mut self, device: &mut D) -> Result<(), RenderError> {
        self.capacity = 0;
        match self.id.take() {
            Some(id) => Ok(device.destroy_buffer(id)?),
            None => Ok(()),
        }
    }
}

/// Frame-accumulated time driving scrolling textures, wrapped to a period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterfallTimer {
    elapsed: f32,
    period: f32,
}

impl WaterfallTimer {
    /// Creates a timer wrapping every `period` seconds.
    pub fn new(period: f32) -> Self {
        Self {
            elapsed: 0.0,
            period,
        }
    }

    /// Adds one frame's worth of time.
    pub fn advance(&mut self, delta_seconds: f32) {
        self.elapsed = (self.elapsed + delta_seconds).rem_euclid(self.period);
    }

    /// Seconds into the current period.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Texture-space scroll offset, one full texture height per period.
    pub fn offset(&self) -> Vec2 {
        Vec2::new(0.0, self.elapsed / self.period)
    }
}

/// Per-frame draw counters. Diagnostic only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrawStats {
    /// Device draw calls issued for geometry and overlays.
    pub draw_calls: usize,
    /// Instances submitted through instanced draws.
    pub instances: usize,
    /// Geometry draws skipped in the shadow stage for lack of a caster.
    pub skipped_shadow_draws: usize,
}

/// Submits model geometry and forward overlays.
#[derive(Debug)]
pub struct ModelDrawer {
    instances: InstanceBuffer,
    waterfall: WaterfallTimer,
    stats: DrawStats,
}

impl ModelDrawer {
    /// Creates a drawer whose scrolling textures wrap every `waterfall_period` seconds.
    pub fn new(waterfall_period: f32) -> Self {
        Self {
            instances: InstanceBuffer::default(),
            waterfall: WaterfallTimer::new(waterfall_period),
            stats: DrawStats::default(),
        }
    }

    /// Starts a frame: resets counters and advances the scrolling timer.
    pub fn begin_frame(&mut self, delta_seconds: f32) {
        self.stats = DrawStats::default();
        self.waterfall.advance(delta_seconds);
    }

    /// This frame's counters.
    pub fn stats(&self) -> DrawStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut DrawStats {
        &mut self.stats
    }

    /// The scrolling-texture timer.
    pub fn waterfall(&self) -> &WaterfallTimer {
        &self.waterfall
    }

    /// The instance buffer.
    pub fn instance_buffer(&self) -> &InstanceBuffer {
        &self.instances
    }

    /// Frees device resources owned by the drawer.
    pub fn release<D: RenderDevice>(&mut self, device: &mut D) -> Result<(), RenderError> {
        self.instances.release(device)
    }

    fn material_params(&self, handle: &ModelHandle, submesh: usize) -> ParameterBlock {
        let mut params = ParameterBlock::new();
        if let Some(texture) = handle.texture() {
            params.set(param::TEXTURE, ParameterValue::Texture(texture.id));
            let offset = if handle.is_waterfall() {
                self.waterfall.offset()
            } else {
                Vec2::ZERO
            };
            params.set(param::TEXTURE_OFFSET, ParameterValue::Vector2(offset));
        }
        if let Some(emissive) = handle.emissive() {
            params.set(param::EMISSIVE_TEXTURE, ParameterValue::Texture(emissive.id));
        }
        if let Some(color) = handle.flat_colors().and_then(|c| c.get(submesh)) {
            params.set(param::DIFFUSE_COLOR, ParameterValue::Color(*color));
        }
        params
    }

    /// Draws every submesh of `handle` into the G-buffer or shadow map.
    pub fn draw_model<D: RenderDevice>(
        &mut self,
        device: &mut D,
        stage: PipelineStage,
        handle: &ModelHandle,
        world: Mat4,
        bones: Option<&[Mat4]>,
    ) -> Result<(), RenderError> {
        let bones = match (bones, handle.skinning()) {
            (Some(bones), Some(skinning)) => {
                if bones.len() > skinning.bone_count {
                    return Err(RenderError::InvalidArgument(format!(
                        "model '{}' has {} bones but {} transforms were given",
                        handle.source(),
                        skinning.bone_count,
                        bones.len()
                    )));
                }
                Some(bones)
            }
            _ => None,
        };
        let (effect, technique) = select_pass(handle, bones.is_some(), stage, false);
        let geometry = handle.geometry();

        for (index, submesh) in geometry.submeshes.iter().enumerate() {
            let mut params = self.material_params(handle, index);
            params.set(
                param::WORLD,
                ParameterValue::Matrix(world * submesh.parent_transform),
            );
            if let Some(bones) = bones {
                params.set(param::BONES, ParameterValue::MatrixArray(bones.to_vec()));
            }
            device.set_parameters(effect, &params);
            device.apply_technique(effect, technique);
            device.draw_indexed(IndexedDraw {
                geometry: geometry.id,
                range: submesh.range,
            });
            self.stats.draw_calls += 1;
        }
        Ok(())
    }

    /// Draws a single-submesh model once per transform.
    ///
    /// Tiers without hardware instancing fall back to one indexed draw per
    /// transform.
    pub fn draw_instanced<D: RenderDevice, T: RenderTier>(
        &mut self,
        device: &mut D,
        stage: PipelineStage,
        handle: &ModelHandle,
        transforms: &[Mat4],
    ) -> Result<(), RenderError> {
        let [submesh] = handle.geometry().submeshes.as_slice() else {
            return Err(RenderError::InvalidArgument(format!(
                "instanced draws need a single-submesh model, '{}' has {}",
                handle.source(),
                handle.submesh_count()
            )));
        };
        if transforms.is_empty() {
            return Ok(());
        }
        let instance_count = instance_count(transforms.len())?;
        let draw = IndexedDraw {
            geometry: handle.geometry().id,
            range: submesh.range,
        };
        let mut params = self.material_params(handle, 0);

        if T::HARDWARE_INSTANCING {
            let buffer = self.instances.upload(device, transforms)?;
            let (effect, technique) = select_pass(handle, false, stage, true);
            params.set(param::WORLD, ParameterValue::Matrix(submesh.parent_transform));
            device.set_parameters(effect, &params);
            device.apply_technique(effect, technique);
            device.draw_instanced(InstancedDraw {
                draw,
                instance_buffer: buffer,
                instance_count,
            });
            self.stats.draw_calls += 1;
        } else {
            let (effect, technique) = select_pass(handle, false, stage, false);
            for transform in transforms {
                params.set(
                    param::WORLD,
                    ParameterValue::Matrix(*transform * submesh.parent_transform),
                );
                device.set_parameters(effect, &params);
                device.apply_technique(effect, technique);
                device.draw_indexed(draw);
                self.stats.draw_calls += 1;
            }
        }
        self.stats.instances += transforms.len();
        Ok(())
    }

    /// Draws `handle` with a forward technique on top of the lit image.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_overlay<D: RenderDevice>(
        &mut self,
        device: &mut D,
        frame: &FrameContext,
        handle: &ModelHandle,
        world: Mat4,
        color: LinearRgba,
        technique: &'static str,
        blend: BlendState,
        rasterizer: RasterizerState,
    ) -> Result<(), RenderError> {
        device.set_blend_state(blend);
        device.set_depth_state(DepthState::ReadOnly);
        device.set_rasterizer_state(rasterizer);
        let geometry = handle.geometry();
        for submesh in &geometry.submeshes {
            device.set_parameters(
                Effect::Forward,
                &ParameterBlock::new()
                    .with(
                        param::WORLD,
                        ParameterValue::Matrix(world * submesh.parent_transform),
                    )
                    .with(param::VIEW, ParameterValue::Matrix(frame.camera.view))
                    .with(
                        param::PROJECTION,
                        ParameterValue::Matrix(frame.camera.projection),
                    )
                    .with(param::OVERLAY_COLOR, ParameterValue::Color(color)),
            );
            device.apply_technique(Effect::Forward, technique);
            device.draw_indexed(IndexedDraw {
                geometry: geometry.id,
                range: submesh.range,
            });
            self.stats.draw_calls += 1;
        }
        Ok(())
    }
}

/// Converts an instance count to the device's 32-bit draw count.
fn instance_count(len: usize) -> Result<u32, RenderError> {
    u32::try_from(len).map_err(|_| {
        RenderError::InvalidArgument(format!(
            "{len} instances exceed the per-draw limit of {}",
            u32::MAX
        ))
    })
}
