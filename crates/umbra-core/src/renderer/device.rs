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

use crate::math::{LinearRgba, Viewport};
use crate::renderer::effect::{Effect, ParameterBlock};
use crate::renderer::error::ResourceError;
use crate::renderer::resource::*;
use std::fmt::Debug;

/// The immediate-mode device the deferred pipeline submits to.
///
/// Every call is issued from the rendering thread in frame order. The order
/// of calls is the contract: later passes sample the targets earlier passes
/// wrote, so implementations must execute commands in submission order.
pub trait RenderDevice: Debug {
    /// Allocates a render target.
    /// ## Arguments
    /// * `descriptor` - The size, format and depth attachment of the target.
    /// ## Returns
    /// A `Result` containing the ID of the created target.
    /// ## Errors
    /// * `ResourceError` - If the target cannot be allocated.
    fn create_render_target(
        &mut self,
        descriptor: &RenderTargetDescriptor,
    ) -> Result<RenderTargetId, ResourceError>;

    /// Releases a render target.
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the target is unknown.
    fn destroy_render_target(&mut self, id: RenderTargetId) -> Result<(), ResourceError>;

    /// Allocates a dynamic vertex buffer able to hold `capacity` instance transforms.
    fn create_instance_buffer(&mut self, capacity: usize) -> Result<BufferId, ResourceError>;

    /// Uploads raw instance data at the start of the buffer.
    /// ## Arguments
    /// * `id` - The buffer to write to.
    /// * `data` - The bytes to upload, at most the buffer's capacity.
    fn write_instance_buffer(&mut self, id: BufferId, data: &[u8]) -> Result<(), ResourceError>;

    /// Releases a buffer.
    fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError>;

    /// Binds one or more targets as the color outputs, in slot order.
    fn set_render_targets(&mut self, targets: &[RenderTargetId]) -> Result<(), ResourceError>;

    /// Binds the presentation surface.
    fn set_default_target(&mut self);

    /// Sets the rasterization rectangle.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Clears the bound targets.
    /// ## Arguments
    /// * `colors` - One clear color per bound target slot.
    /// * `depth` - The depth clear value, or `None` to leave depth untouched.
    fn clear(&mut self, colors: &[LinearRgba], depth: Option<f32>);

    /// Selects the output-merger blend configuration.
    fn set_blend_state(&mut self, state: BlendState);

    /// Selects the depth test configuration.
    fn set_depth_state(&mut self, state: DepthState);

    /// Selects the rasterizer configuration.
    fn set_rasterizer_state(&mut self, state: RasterizerState);

    /// Binds named parameter values on an effect.
    ///
    /// Values persist on the effect until overwritten.
    fn set_parameters(&mut self, effect: Effect, parameters: &ParameterBlock);

    /// Makes `technique` of `effect` the active program for subsequent draws.
    fn apply_technique(&mut self, effect: Effect, technique: &'static str);

    /// Draws one submesh with the active program.
    fn draw_indexed(&mut self, draw: IndexedDraw);

    /// Draws one submesh once per instance, reading transforms from the instance buffer.
    fn draw_instanced(&mut self, draw: InstancedDraw);

    /// Draws a screen-covering quad with the active program.
    fn draw_fullscreen_quad(&mut self);

    /// Unbinds every texture slot so no target is sampled while it is rebound or resized.
    fn unbind_textures(&mut self);

    /// Presents the default target.
    fn present(&mut self);
}
