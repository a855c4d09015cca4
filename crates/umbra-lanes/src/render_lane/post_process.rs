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

//! Screen-space composites: edges, fog/background, bloom and tonemap.

use super::frame::FrameContext;
use super::targets::{bloom_level_size, RenderTargetSet, BLOOM_DOWNSCALE};
use super::tier::RenderTier;
use crate::config::PipelineConfig;
use umbra_core::math::{Extent2D, Vec2, Viewport};
use umbra_core::renderer::{
    param, technique, BlendState, DepthState, Effect, ParameterBlock, ParameterValue,
    RasterizerState, RenderDevice, RenderError, RenderTargetId,
};

/// Background colors are authored in `[0, 4]` and composited in `[0, 1]`.
const BACKGROUND_RANGE: f32 = 4.0;

/// The bloom sampling offset at chain level `level` (0 is the finest).
///
/// Equals `base * 4^(level + 1)`, matching the per-axis downscale of the level.
pub fn bloom_sample_offset(base: f32, level: usize) -> f32 {
    base * (BLOOM_DOWNSCALE as f32).powi(level as i32 + 1)
}

/// The downsample technique for chain level `level`.
///
/// The first downsample reads the HDR accumulation buffer and suppresses
/// everything below 1.0; later levels average.
pub fn downsample_technique(level: usize) -> &'static str {
    if level == 0 {
        technique::DOWNSAMPLE_HDR
    } else {
        technique::DOWNSAMPLE
    }
}

fn resolution_param(size: Extent2D) -> ParameterValue {
    ParameterValue::Vector2(Vec2::new(size.width as f32, size.height as f32))
}

fn fullscreen_pass<D: RenderDevice>(
    device: &mut D,
    effect: Effect,
    technique: &'static str,
    blend: BlendState,
    params: &ParameterBlock,
) {
    device.set_blend_state(blend);
    device.set_parameters(effect, params);
    device.apply_technique(effect, technique);
    device.draw_fullscreen_quad();
}

/// Runs the edge-highlight pass followed by the fog/background pass onto the
/// bound light accumulation buffer.
pub fn composite_scene<D: RenderDevice, T: RenderTier>(
    device: &mut D,
    targets: &RenderTargetSet,
    frame: &FrameContext,
    config: &PipelineConfig,
) {
    let gbuffer = targets.gbuffer();
    device.set_depth_state(DepthState::Disabled);
    device.set_rasterizer_state(RasterizerState::CullNone);

    if T::SUPPORTS_EDGES {
        let params = ParameterBlock::new()
            .with(param::DEPTH_MAP, ParameterValue::Target(gbuffer.depth))
            .with(param::NORMAL_MAP, ParameterValue::Target(gbuffer.normal))
            .with(
                param::EDGE_DEPTH_SENSITIVITY,
                ParameterValue::Scalar(config.edges.depth_sensitivity),
            )
            .with(
                param::EDGE_NORMAL_SENSITIVITY,
                ParameterValue::Scalar(config.edges.normal_sensitivity),
            )
            .with(param::EDGE_THRESHOLD, ParameterValue::Scalar(config.edges.threshold))
            .with(param::SCREEN_RESOLUTION, resolution_param(targets.resolution()));
        fullscreen_pass(
            device,
            Effect::PostProcess,
            technique::EDGES,
            BlendState::NonPremultiplied,
            &params,
        );
    }

    let outer = config.background_outer.scale_rgb(1.0 / BACKGROUND_RANGE);
    let inner = config
        .effective_background_inner()
        .scale_rgb(1.0 / BACKGROUND_RANGE);
    let mut params = ParameterBlock::new()
        .with(param::DEPTH_MAP, ParameterValue::Target(gbuffer.depth))
        .with(param::BACKGROUND_OUTER, ParameterValue::Color(outer))
        .with(param::BACKGROUND_INNER, ParameterValue::Color(inner));
    let technique = if config.fog_enabled {
        params.set(param::FOG_BEGIN, ParameterValue::Scalar(config.fog_begin));
        params.set(param::FOG_END, ParameterValue::Scalar(config.fog_end));
        params.set(
            param::INVERSE_VIEW_PROJECTION,
            ParameterValue::Matrix(frame.inverse_view_projection),
        );
        technique::FOG
    } else {
        technique::NO_FOG
    };
    fullscreen_pass(
        device,
        Effect::PostProcess,
        technique,
        BlendState::NonPremultiplied,
        &params,
    );
}

/// Runs bloom (when the tier supports it), tonemaps to the default target,
/// presents, and unbinds every texture.
pub fn finish_frame<D: RenderDevice, T: RenderTier>(
    device: &mut D,
    targets: &RenderTargetSet,
    config: &PipelineConfig,
) -> Result<(), RenderError> {
    device.set_depth_state(DepthState::Disabled);
    device.set_rasterizer_state(RasterizerState::CullNone);

    if T::SUPPORTS_BLOOM {
        if let Some(scratch) = targets.bloom_scratch() {
            bloom(device, targets, scratch, config.bloom_base_offset)?;
        }
    }

    let resolution = targets.resolution();
    device.set_default_target();
    device.set_viewport(Viewport::full(resolution));
    fullscreen_pass(
        device,
        Effect::Tonemap,
        technique::TONEMAP,
        BlendState::Opaque,
        &ParameterBlock::new()
            .with(
                param::SOURCE_MAP,
                ParameterValue::Target(targets.light_accumulation()),
            )
            .with(param::SCREEN_RESOLUTION, resolution_param(resolution)),
    );
    device.present();
    device.unbind_textures();
    Ok(())
}

/// Downsamples the accumulation buffer through the chain, then blurs each
/// level from the smallest up and adds it onto the next larger one.
fn bloom<D: RenderDevice>(
    device: &mut D,
    targets: &RenderTargetSet,
    scratch: RenderTargetId,
    base_offset: f32,
) -> Result<(), RenderError> {
    let chain = targets.bloom_chain();
    let resolution = targets.resolution();
    let scratch_size = bloom_level_size(resolution, 0);

    let mut source = targets.light_accumulation();
    for (level, &target) in chain.iter().enumerate() {
        let size = bloom_level_size(resolution, level);
        device.set_render_targets(&[target])?;
        device.set_viewport(Viewport::full(size));
        fullscreen_pass(
            device,
            Effect::Bloom,
            downsample_technique(level),
            BlendState::Opaque,
            &ParameterBlock::new()
                .with(param::SOURCE_MAP, ParameterValue::Target(source))
                .with(
                    param::SAMPLE_OFFSET,
                    ParameterValue::Scalar(bloom_sample_offset(base_offset, level)),
                )
                .with(param::SOURCE_SCALE, ParameterValue::Vector2(Vec2::new(1.0, 1.0))),
        );
        source = target;
    }

    for level in (0..chain.len()).rev() {
        let size = bloom_level_size(resolution, level);
        let offset = ParameterValue::Scalar(bloom_sample_offset(base_offset, level));

        device.set_render_targets(&[scratch])?;
        device.set_viewport(Viewport::full(size));
        fullscreen_pass(
            device,
            Effect::Bloom,
            technique::BLUR_VERTICAL,
            BlendState::Opaque,
            &ParameterBlock::new()
                .with(param::SOURCE_MAP, ParameterValue::Target(chain[level]))
                .with(param::SAMPLE_OFFSET, offset.clone())
                .with(param::SOURCE_SCALE, ParameterValue::Vector2(Vec2::new(1.0, 1.0))),
        );

        let (destination, destination_size) = if level > 0 {
            (chain[level - 1], bloom_level_size(resolution, level - 1))
        } else {
            (targets.light_accumulation(), resolution)
        };
        // The scratch buffer is level-0 sized; only its top-left region is valid.
        let scale = Vec2::new(
            size.width as f32 / scratch_size.width as f32,
            size.height as f32 / scratch_size.height as f32,
        );
        device.set_render_targets(&[destination])?;
        device.set_viewport(Viewport::full(destination_size));
        fullscreen_pass(
            device,
            Effect::Bloom,
            technique::BLUR_HORIZONTAL,
            BlendState::Additive,
            &ParameterBlock::new()
                .with(param::SOURCE_MAP, ParameterValue::Target(scratch))
                .with(param::SAMPLE_OFFSET, offset)
                .with(param::SOURCE_SCALE, ParameterValue::Vector2(scale)),
        );
    }
    log::trace!("Bloom chain ran over {} levels", chain.len());
    Ok(())
}
