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

//! A headless [`RenderDevice`] that records every command it receives.
//!
//! Used by the sandbox and by tests to inspect the exact command stream the
//! pipeline produces. Resource handles are validated, so use-after-destroy
//! and oversized uploads surface as [`ResourceError`]s just as they would on
//! a real backend.

use crate::math::{LinearRgba, Viewport};
use crate::renderer::device::RenderDevice;
use crate::renderer::effect::{Effect, ParameterBlock};
use crate::renderer::error::ResourceError;
use crate::renderer::resource::*;
use std::collections::HashMap;

/// One command received by a [`RecordingDevice`].
///
/// Variants mirror the [`RenderDevice`] methods one to one.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateRenderTarget {
        id: RenderTargetId,
        descriptor: RenderTargetDescriptor,
    },
    DestroyRenderTarget(RenderTargetId),
    CreateInstanceBuffer {
        id: BufferId,
        capacity: usize,
    },
    WriteInstanceBuffer {
        id: BufferId,
        bytes: usize,
    },
    DestroyBuffer(BufferId),
    SetRenderTargets(Vec<RenderTargetId>),
    SetDefaultTarget,
    SetViewport(Viewport),
    Clear {
        colors: Vec<LinearRgba>,
        depth: Option<f32>,
    },
    SetBlendState(BlendState),
    SetDepthState(DepthState),
    SetRasterizerState(RasterizerState),
    SetParameters {
        effect: Effect,
        parameters: ParameterBlock,
    },
    ApplyTechnique {
        effect: Effect,
        technique: &'static str,
    },
    DrawIndexed(IndexedDraw),
    DrawInstanced(InstancedDraw),
    DrawFullscreenQuad,
    UnbindTextures,
    Present,
}

/// What a recorded draw rasterized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawPrimitive {
    /// A single submesh.
    Indexed(IndexedDraw),
    /// A submesh replicated per instance.
    Instanced(InstancedDraw),
    /// A screen-covering quad.
    FullscreenQuad,
}

/// A draw together with the device state it was issued under.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    /// The effect of the active technique.
    pub effect: Effect,
    /// The active technique.
    pub technique: &'static str,
    /// Bound color targets; empty when the default target is bound.
    pub targets: Vec<RenderTargetId>,
    /// The blend state at draw time.
    pub blend: BlendState,
    /// The depth state at draw time.
    pub depth: DepthState,
    /// The rasterizer state at draw time.
    pub rasterizer: RasterizerState,
    /// Every parameter bound on `effect` so far, latest value per name.
    pub parameters: ParameterBlock,
    /// What was drawn.
    pub primitive: DrawPrimitive,
}

impl RecordedDraw {
    /// Looks up a parameter that was bound when the draw was issued.
    pub fn parameter(&self, name: &str) -> Option<&crate::renderer::effect::ParameterValue> {
        self.parameters.get(name)
    }
}

/// A headless device that records commands instead of executing them.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    targets: HashMap<RenderTargetId, RenderTargetDescriptor>,
    buffers: HashMap<BufferId, usize>,
    next_id: u64,
    frames_presented: usize,
}

impl RecordingDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Every command received since creation or the last [`Self::clear_log`].
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Forgets the recorded commands but keeps live resources.
    pub fn clear_log(&mut self) {
        self.commands.clear();
    }

    /// The number of render targets currently allocated.
    pub fn live_target_count(&self) -> usize {
        self.targets.len()
    }

    /// The number of buffers currently allocated.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// The descriptor a live target was created with.
    pub fn target_descriptor(&self, id: RenderTargetId) -> Option<&RenderTargetDescriptor> {
        self.targets.get(&id)
    }

    /// The capacity, in instances, of a live buffer.
    pub fn buffer_capacity(&self, id: BufferId) -> Option<usize> {
        self.buffers.get(&id).copied()
    }

    /// How many times [`RenderDevice::present`] was called.
    pub fn frames_presented(&self) -> usize {
        self.frames_presented
    }

    /// Replays the log and returns every draw with the state it was issued under.
    ///
    /// Draws issued before any technique was applied are omitted.
    pub fn draws(&self) -> Vec<RecordedDraw> {
        let mut draws = Vec::new();
        let mut active: Option<(Effect, &'static str)> = None;
        let mut targets = Vec::new();
        let mut blend = BlendState::default();
        let mut depth = DepthState::default();
        let mut rasterizer = RasterizerState::default();
        let mut bound: HashMap<Effect, ParameterBlock> = HashMap::new();

        for command in &self.commands {
            let primitive = match command {
                DeviceCommand::SetRenderTargets(ids) => {
                    targets = ids.clone();
                    continue;
                }
                DeviceCommand::SetDefaultTarget => {
                    targets.clear();
                    continue;
                }
                DeviceCommand::SetBlendState(state) => {
                    blend = *state;
                    continue;
                }
                DeviceCommand::SetDepthState(state) => {
                    depth = *state;
                    continue;
                }
                DeviceCommand::SetRasterizerState(state) => {
                    rasterizer = *state;
                    continue;
                }
                DeviceCommand::SetParameters { effect, parameters } => {
                    let block = bound.entry(*effect).or_default();
                    for (name, value) in parameters.iter() {
                        block.set(name, value.clone());
                    }
                    continue;
                }
                DeviceCommand::ApplyTechnique { effect, technique } => {
                    active = Some((*effect, *technique));
                    continue;
                }
                DeviceCommand::DrawIndexed(draw) => DrawPrimitive::Indexed(*draw),
                DeviceCommand::DrawInstanced(draw) => DrawPrimitive::Instanced(*draw),
                DeviceCommand::DrawFullscreenQuad => DrawPrimitive::FullscreenQuad,
                _ => continue,
            };
            let Some((effect, technique)) = active else {
                continue;
            };
            draws.push(RecordedDraw {
                effect,
                technique,
                targets: targets.clone(),
                blend,
                depth,
                rasterizer,
                parameters: bound.get(&effect).cloned().unwrap_or_default(),
                primitive,
            });
        }
        draws
    }

    /// The techniques applied, in order.
    pub fn techniques(&self) -> Vec<(Effect, &'static str)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::ApplyTechnique { effect, technique } => Some((*effect, *technique)),
                _ => None,
            })
            .collect()
    }

    /// The number of indexed and instanced draws (full-screen quads excluded).
    pub fn geometry_draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::DrawIndexed(_) | DeviceCommand::DrawInstanced(_)))
            .count()
    }

    fn check_target(&self, id: RenderTargetId) -> Result<(), ResourceError> {
        if self.targets.contains_key(&id) {
            Ok(())
        } else {
            Err(ResourceError::InvalidHandle(format!("{id:?}")))
        }
    }
}

impl RenderDevice for RecordingDevice {
    fn create_render_target(
        &mut self,
        descriptor: &RenderTargetDescriptor,
    ) -> Result<RenderTargetId, ResourceError> {
        if descriptor.size.is_empty() {
            return Err(ResourceError::EmptyExtent(descriptor.label));
        }
        let id = RenderTargetId(self.allocate_id());
        log::trace!(
            "RecordingDevice: created target {:?} '{}' ({}x{})",
            id,
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height
        );
        self.targets.insert(id, descriptor.clone());
        self.commands.push(DeviceCommand::CreateRenderTarget {
            id,
            descriptor: descriptor.clone(),
        });
        Ok(id)
    }

    fn destroy_render_target(&mut self, id: RenderTargetId) -> Result<(), ResourceError> {
        self.targets
            .remove(&id)
            .ok_or_else(|| ResourceError::InvalidHandle(format!("{id:?}")))?;
        self.commands.push(DeviceCommand::DestroyRenderTarget(id));
        Ok(())
    }

    fn create_instance_buffer(&mut self, capacity: usize) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.allocate_id());
        log::trace!("RecordingDevice: created instance buffer {id:?} for {capacity} instances");
        self.buffers.insert(id, capacity);
        self.commands
            .push(DeviceCommand::CreateInstanceBuffer { id, capacity });
        Ok(id)
    }

    fn write_instance_buffer(&mut self, id: BufferId, data: &[u8]) -> Result<(), ResourceError> {
        let capacity = self
            .buffers
            .get(&id)
            .copied()
            .ok_or_else(|| ResourceError::InvalidHandle(format!("{id:?}")))?;
        let max_bytes = capacity * std::mem::size_of::<InstanceTransform>();
        if data.len() > max_bytes {
            return Err(ResourceError::BackendError(format!(
                "write of {} bytes exceeds {id:?} capacity of {max_bytes} bytes",
                data.len()
            )));
        }
        self.commands.push(DeviceCommand::WriteInstanceBuffer {
            id,
            bytes: data.len(),
        });
        Ok(())
    }

    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError> {
        self.buffers
            .remove(&id)
            .ok_or_else(|| ResourceError::InvalidHandle(format!("{id:?}")))?;
        self.commands.push(DeviceCommand::DestroyBuffer(id));
        Ok(())
    }

    fn set_render_targets(&mut self, targets: &[RenderTargetId]) -> Result<(), ResourceError> {
        for id in targets {
            self.check_target(*id)?;
        }
        self.commands
            .push(DeviceCommand::SetRenderTargets(targets.to_vec()));
        Ok(())
    }

    fn set_default_target(&mut self) {
        self.commands.push(DeviceCommand::SetDefaultTarget);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(DeviceCommand::SetViewport(viewport));
    }

    fn clear(&mut self, colors: &[LinearRgba], depth: Option<f32>) {
        self.commands.push(DeviceCommand::Clear {
            colors: colors.to_vec(),
            depth,
        });
    }

    fn set_blend_state(&mut self, state: BlendState) {
        self.commands.push(DeviceCommand::SetBlendState(state));
    }

    fn set_depth_state(&mut self, state: DepthState) {
        self.commands.push(DeviceCommand::SetDepthState(state));
    }

    fn set_rasterizer_state(&mut self, state: RasterizerState) {
        self.commands.push(DeviceCommand::SetRasterizerState(state));
    }

    fn set_parameters(&mut self, effect: Effect, parameters: &ParameterBlock) {
        self.commands.push(DeviceCommand::SetParameters {
            effect,
            parameters: parameters.clone(),
        });
    }

    fn apply_technique(&mut self, effect: Effect, technique: &'static str) {
        self.commands
            .push(DeviceCommand::ApplyTechnique { effect, technique });
    }

    fn draw_indexed(&mut self, draw: IndexedDraw) {
        self.commands.push(DeviceCommand::DrawIndexed(draw));
    }

    fn draw_instanced(&mut self, draw: InstancedDraw) {
        self.commands.push(DeviceCommand::DrawInstanced(draw));
    }

    fn draw_fullscreen_quad(&mut self) {
        self.commands.push(DeviceCommand::DrawFullscreenQuad);
    }

    fn unbind_textures(&mut self) {
        self.commands.push(DeviceCommand::UnbindTextures);
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        self.commands.push(DeviceCommand::Present);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Extent2D;
    use crate::renderer::effect::{param, technique, ParameterValue};

    fn descriptor(label: &'static str) -> RenderTargetDescriptor {
        RenderTargetDescriptor {
            label,
            size: Extent2D::new(64, 64),
            format: SurfaceFormat::Rgba8,
            with_depth: false,
        }
    }

    #[test]
    fn test_destroyed_target_cannot_be_bound() {
        let mut device = RecordingDevice::new();
        let id = device.create_render_target(&descriptor("a")).unwrap();
        device.destroy_render_target(id).unwrap();
        assert!(matches!(
            device.set_render_targets(&[id]),
            Err(ResourceError::InvalidHandle(_))
        ));
        assert_eq!(device.live_target_count(), 0);
    }

    #[test]
    fn test_empty_target_is_rejected() {
        let mut device = RecordingDevice::new();
        let mut desc = descriptor("empty");
        desc.size = Extent2D::new(0, 10);
        assert_eq!(
            device.create_render_target(&desc),
            Err(ResourceError::EmptyExtent("empty"))
        );
    }

    #[test]
    fn test_oversized_instance_write_fails() {
        let mut device = RecordingDevice::new();
        let id = device.create_instance_buffer(1).unwrap();
        let two = [InstanceTransform::from(crate::math::Mat4::IDENTITY); 2];
        assert!(device
            .write_instance_buffer(id, bytemuck::cast_slice(&two[..1]))
            .is_ok());
        assert!(device
            .write_instance_buffer(id, bytemuck::cast_slice(&two))
            .is_err());
    }

    #[test]
    fn test_draws_capture_state_and_merged_parameters() {
        let mut device = RecordingDevice::new();
        let target = device.create_render_target(&descriptor("accum")).unwrap();
        device.set_render_targets(&[target]).unwrap();
        device.set_blend_state(BlendState::Additive);
        device.set_parameters(
            Effect::Lighting,
            &ParameterBlock::new().with(param::LIGHT_INTENSITY, ParameterValue::Scalar(1.0)),
        );
        device.set_parameters(
            Effect::Lighting,
            &ParameterBlock::new().with(param::LIGHT_INTENSITY, ParameterValue::Scalar(2.0)),
        );
        device.apply_technique(Effect::Lighting, technique::POINT);
        device.draw_fullscreen_quad();

        let draws = device.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].technique, technique::POINT);
        assert_eq!(draws[0].blend, BlendState::Additive);
        assert_eq!(draws[0].targets, vec![target]);
        assert_eq!(
            draws[0].parameter(param::LIGHT_INTENSITY),
            Some(&ParameterValue::Scalar(2.0))
        );
    }
}
