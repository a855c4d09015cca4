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

//! Whole-frame command streams against the recording device.

mod common;

use approx::assert_relative_eq;
use common::{camera, draws_with, pipeline, small_config, time, MockLoader, BLUE, GRAY, GREEN, RED};
use umbra_core::math::{Extent2D, LinearRgba, Mat4, Quaternion, Vec2, Vec3, Viewport};
use umbra_core::renderer::recording::{DeviceCommand, DrawPrimitive};
use umbra_core::renderer::{
    param, technique, BlendState, Effect, ParameterValue, RecordingDevice, RenderDevice,
    RenderTargetDescriptor, SurfaceFormat,
};
use umbra_lanes::render_lane::{
    bloom_level_size, bloom_sample_offset, CharacterView, DeferredPipeline, HiDef, Reach,
};

fn crate_loader() -> MockLoader {
    MockLoader::new().with_model("models/crate", &[(None, RED), (None, GREEN), (None, BLUE)])
}

#[test]
fn test_untextured_model_without_lights_full_frame() {
    let mut loader = crate_loader();
    let mut p = pipeline::<HiDef>();
    let model = p.load_model(&mut loader, "models/crate", None, None).unwrap();
    p.device_mut().clear_log();

    p.start_drawing(camera(), time()).unwrap();
    p.draw_model(&model, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, None)
        .unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.stop_shadow_start_lighting().unwrap();
    p.stop_drawing().unwrap();

    let device = p.device();
    let mut expected = vec![(Effect::DeferredColored, technique::DEFERRED); 3];
    expected.extend([
        (Effect::Lighting, technique::AMBIENT),
        (Effect::PostProcess, technique::EDGES),
        (Effect::PostProcess, technique::NO_FOG),
        (Effect::Bloom, technique::DOWNSAMPLE_HDR),
        (Effect::Bloom, technique::DOWNSAMPLE),
        (Effect::Bloom, technique::DOWNSAMPLE),
        (Effect::Bloom, technique::BLUR_VERTICAL),
        (Effect::Bloom, technique::BLUR_HORIZONTAL),
        (Effect::Bloom, technique::BLUR_VERTICAL),
        (Effect::Bloom, technique::BLUR_HORIZONTAL),
        (Effect::Bloom, technique::BLUR_VERTICAL),
        (Effect::Bloom, technique::BLUR_HORIZONTAL),
        (Effect::Tonemap, technique::TONEMAP),
    ]);
    assert_eq!(device.techniques(), expected);

    let deferred = draws_with(device, technique::DEFERRED);
    assert_eq!(deferred.len(), 3);
    let colors: Vec<_> = deferred
        .iter()
        .map(|d| d.parameter(param::DIFFUSE_COLOR).cloned())
        .collect();
    assert_eq!(
        colors,
        vec![
            Some(ParameterValue::Color(RED)),
            Some(ParameterValue::Color(GREEN)),
            Some(ParameterValue::Color(BLUE)),
        ]
    );
    for draw in &deferred {
        assert_eq!(draw.targets, p.targets().gbuffer().slots().to_vec());
        assert_eq!(draw.blend, BlendState::Opaque);
    }

    let ambient = draws_with(device, technique::AMBIENT);
    assert_eq!(ambient.len(), 1);
    assert_eq!(
        ambient[0].parameter(param::AMBIENT_COLOR),
        Some(&ParameterValue::Color(GRAY))
    );
    assert_eq!(ambient[0].blend, BlendState::Additive);
    assert_eq!(ambient[0].targets, vec![p.targets().light_accumulation()]);

    let tonemap = draws_with(device, technique::TONEMAP);
    assert!(tonemap[0].targets.is_empty());
    assert_eq!(device.frames_presented(), 1);
    assert_eq!(
        &device.commands()[device.commands().len() - 2..],
        &[DeviceCommand::Present, DeviceCommand::UnbindTextures]
    );
    assert_eq!(p.draw_stats().draw_calls, 3);
    assert_eq!(p.lighting_stats().passes, 1);
}

#[test]
fn test_gbuffer_is_cleared_to_far_depth() {
    let mut p = pipeline::<HiDef>();
    p.device_mut().clear_log();
    p.start_drawing(camera(), time()).unwrap();

    let commands = p.device().commands();
    assert_eq!(
        commands[0],
        DeviceCommand::SetRenderTargets(p.targets().gbuffer().slots().to_vec())
    );
    assert!(commands.contains(&DeviceCommand::Clear {
        colors: vec![
            LinearRgba::TRANSPARENT,
            LinearRgba::WHITE,
            LinearRgba::new(0.5, 0.5, 0.5, 0.0),
        ],
        depth: Some(1.0),
    }));
}

#[test]
fn test_bloom_runs_smallest_level_first_into_larger_levels() {
    let mut p = pipeline::<HiDef>();
    p.start_drawing(camera(), time()).unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.stop_shadow_start_lighting().unwrap();
    p.device_mut().clear_log();
    p.stop_drawing().unwrap();

    let chain = p.targets().bloom_chain().to_vec();
    let scratch = p.targets().bloom_scratch().unwrap();
    let device = p.device();

    let downsamples: Vec<_> = device
        .draws()
        .into_iter()
        .filter(|d| d.technique == technique::DOWNSAMPLE_HDR || d.technique == technique::DOWNSAMPLE)
        .collect();
    assert_eq!(downsamples.len(), 3);
    assert_eq!(
        downsamples[0].parameter(param::SOURCE_MAP),
        Some(&ParameterValue::Target(p.targets().light_accumulation()))
    );
    for (level, draw) in downsamples.iter().enumerate() {
        assert_eq!(draw.targets, vec![chain[level]]);
        assert_eq!(
            draw.parameter(param::SAMPLE_OFFSET),
            Some(&ParameterValue::Scalar(bloom_sample_offset(0.5, level)))
        );
    }

    let vertical = draws_with(device, technique::BLUR_VERTICAL);
    let horizontal = draws_with(device, technique::BLUR_HORIZONTAL);
    assert!(vertical.iter().all(|d| d.targets == vec![scratch]));
    assert_eq!(
        vertical
            .iter()
            .map(|d| d.parameter(param::SOURCE_MAP).cloned())
            .collect::<Vec<_>>(),
        vec![
            Some(ParameterValue::Target(chain[2])),
            Some(ParameterValue::Target(chain[1])),
            Some(ParameterValue::Target(chain[0])),
        ]
    );
    assert_eq!(
        horizontal.iter().map(|d| d.targets.clone()).collect::<Vec<_>>(),
        vec![
            vec![chain[1]],
            vec![chain[0]],
            vec![p.targets().light_accumulation()],
        ]
    );
    assert!(horizontal.iter().all(|d| d.blend == BlendState::Additive));

    // The smallest level only fills a corner of the level-0-sized scratch buffer.
    let resolution = p.targets().resolution();
    let smallest = bloom_level_size(resolution, 2);
    let scratch_size = bloom_level_size(resolution, 0);
    match horizontal[0].parameter(param::SOURCE_SCALE) {
        Some(ParameterValue::Vector2(scale)) => {
            assert_relative_eq!(scale.x, smallest.width as f32 / scratch_size.width as f32);
            assert_relative_eq!(scale.y, smallest.height as f32 / scratch_size.height as f32);
        }
        other => panic!("unexpected source scale {other:?}"),
    }
    assert_eq!(
        horizontal[2].parameter(param::SOURCE_SCALE),
        Some(&ParameterValue::Vector2(Vec2::new(1.0, 1.0)))
    );
}

#[test]
fn test_fog_pass_carries_thresholds_and_inverse_view_projection() {
    let config = umbra_lanes::PipelineConfig {
        fog_enabled: true,
        fog_begin: 0.25,
        fog_end: 0.75,
        ..small_config()
    };
    let mut p: DeferredPipeline<_, HiDef> =
        DeferredPipeline::new(RecordingDevice::new(), config).unwrap();
    p.start_drawing(camera(), time()).unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.stop_shadow_start_lighting().unwrap();

    let inverse = p.frame().unwrap().inverse_view_projection;
    let fog = draws_with(p.device(), technique::FOG);
    assert_eq!(fog.len(), 1);
    assert!(draws_with(p.device(), technique::NO_FOG).is_empty());
    assert_eq!(fog[0].parameter(param::FOG_BEGIN), Some(&ParameterValue::Scalar(0.25)));
    assert_eq!(fog[0].parameter(param::FOG_END), Some(&ParameterValue::Scalar(0.75)));
    assert_eq!(
        fog[0].parameter(param::INVERSE_VIEW_PROJECTION),
        Some(&ParameterValue::Matrix(inverse))
    );
    assert_eq!(fog[0].blend, BlendState::NonPremultiplied);
}

#[test]
fn test_background_colors_are_quartered_and_inner_falls_back() {
    let mut p = pipeline::<HiDef>();
    p.start_drawing(camera(), time()).unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.stop_shadow_start_lighting().unwrap();

    let outer = p.config().background_outer.scale_rgb(0.25);
    let pass = &draws_with(p.device(), technique::NO_FOG)[0];
    assert_eq!(pass.parameter(param::BACKGROUND_OUTER), Some(&ParameterValue::Color(outer)));
    assert_eq!(pass.parameter(param::BACKGROUND_INNER), Some(&ParameterValue::Color(outer)));

    let config = umbra_lanes::PipelineConfig {
        background_inner: LinearRgba::rgb(2.0, 1.0, 0.0),
        ..small_config()
    };
    let mut p: DeferredPipeline<_, HiDef> =
        DeferredPipeline::new(RecordingDevice::new(), config).unwrap();
    p.start_drawing(camera(), time()).unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.stop_shadow_start_lighting().unwrap();
    let pass = &draws_with(p.device(), technique::NO_FOG)[0];
    assert_eq!(
        pass.parameter(param::BACKGROUND_INNER),
        Some(&ParameterValue::Color(LinearRgba::rgb(2.0, 1.0, 0.0).scale_rgb(0.25)))
    );
}

#[test]
fn test_edges_run_before_fog() {
    let mut p = pipeline::<HiDef>();
    p.start_drawing(camera(), time()).unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.stop_shadow_start_lighting().unwrap();

    let techniques: Vec<_> = p
        .device()
        .techniques()
        .into_iter()
        .filter(|(effect, _)| *effect == Effect::PostProcess)
        .map(|(_, t)| t)
        .collect();
    assert_eq!(techniques, vec![technique::EDGES, technique::NO_FOG]);
    let edges = &draws_with(p.device(), technique::EDGES)[0];
    assert_eq!(edges.blend, BlendState::NonPremultiplied);
    assert_eq!(
        edges.parameter(param::SCREEN_RESOLUTION),
        Some(&ParameterValue::Vector2(Vec2::new(320.0, 180.0)))
    );
}

#[test]
fn test_reach_tier_skips_edges_and_bloom() {
    let mut loader = crate_loader();
    let mut p = pipeline::<Reach>();
    let model = p.load_model(&mut loader, "models/crate", None, None).unwrap();
    assert!(p.targets().shadow_map().is_none());
    assert!(p.targets().bloom_chain().is_empty());

    p.start_drawing(camera(), time()).unwrap();
    p.draw_model(&model, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, None)
        .unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.stop_shadow_start_lighting().unwrap();
    p.stop_drawing().unwrap();

    let techniques: Vec<_> = p.device().techniques().into_iter().map(|(_, t)| t).collect();
    assert!(!techniques.contains(&technique::EDGES));
    assert!(!techniques.contains(&technique::DOWNSAMPLE_HDR));
    assert!(!techniques.contains(&technique::BLUR_HORIZONTAL));
    assert_eq!(techniques.last(), Some(&technique::TONEMAP));
    assert_eq!(
        draws_with(p.device(), technique::TONEMAP)[0].parameter(param::SOURCE_MAP),
        Some(&ParameterValue::Target(p.targets().light_accumulation()))
    );
    assert_eq!(p.device().frames_presented(), 1);
}

fn portrait_view(target: Option<umbra_core::renderer::RenderTargetId>) -> CharacterView {
    CharacterView {
        camera: camera(),
        viewport: Viewport {
            x: 16,
            y: 16,
            width: 96,
            height: 128,
        },
        target,
    }
}

#[test]
fn test_character_frame_composites_to_default_target() {
    let mut loader = crate_loader();
    let mut p = pipeline::<HiDef>();
    let model = p.load_model(&mut loader, "models/crate", None, None).unwrap();
    p.device_mut().clear_log();

    p.start_character(portrait_view(None)).unwrap();
    p.draw_model(&model, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, None)
        .unwrap();
    p.finish_character().unwrap();

    let device = p.device();
    let clears: Vec<_> = device
        .commands()
        .iter()
        .filter(|c| matches!(c, DeviceCommand::Clear { .. }))
        .collect();
    assert_eq!(
        clears,
        vec![&DeviceCommand::Clear {
            colors: vec![LinearRgba::WHITE; 3],
            depth: Some(1.0),
        }]
    );
    let composite = draws_with(device, technique::COMPOSITE);
    assert_eq!(composite.len(), 1);
    assert_eq!(composite[0].effect, Effect::CharacterComposite);
    assert!(composite[0].targets.is_empty());
    assert_eq!(composite[0].primitive, DrawPrimitive::FullscreenQuad);
    assert_eq!(
        composite[0].parameter(param::ALBEDO_MAP),
        Some(&ParameterValue::Target(p.targets().gbuffer().albedo))
    );

    let commands = device.commands();
    assert_eq!(
        &commands[commands.len() - 2..],
        &[
            DeviceCommand::SetViewport(Viewport::full(Extent2D::new(320, 180))),
            DeviceCommand::UnbindTextures,
        ]
    );
    assert_eq!(device.frames_presented(), 0);
    assert!(p.frame().is_none());
}

#[test]
fn test_character_frame_composites_into_caller_target() {
    let mut p = pipeline::<HiDef>();
    let portrait = p
        .device_mut()
        .create_render_target(&RenderTargetDescriptor {
            label: "portrait",
            size: Extent2D::new(128, 160),
            format: SurfaceFormat::Rgba8,
            with_depth: false,
        })
        .unwrap();
    p.device_mut().clear_log();

    p.start_character(portrait_view(Some(portrait))).unwrap();
    p.finish_character().unwrap();

    let device = p.device();
    assert_eq!(draws_with(device, technique::COMPOSITE)[0].targets, vec![portrait]);
    let viewports: Vec<_> = device
        .commands()
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::SetViewport(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(
        viewports,
        vec![
            portrait_view(None).viewport,
            portrait_view(None).viewport,
            Viewport::full(Extent2D::new(320, 180)),
        ]
    );
}

#[test]
fn test_overlays_draw_onto_lit_image() {
    let mut loader = crate_loader().with_model("models/shield", &[(None, GRAY)]);
    let mut p = pipeline::<HiDef>();
    let shield = p.load_model(&mut loader, "models/shield", None, None).unwrap();
    let cube = p.load_model(&mut loader, "models/crate", None, None).unwrap();

    p.start_drawing(camera(), time()).unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.stop_shadow_start_lighting().unwrap();
    p.draw_shield(&shield, Mat4::IDENTITY, LinearRgba::rgb(0.0, 0.5, 1.0))
        .unwrap();
    p.draw_bounding_box(&cube, Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 4.0, 1.0), RED)
        .unwrap();
    p.draw_bounding_sphere(&shield, Vec3::new(0.0, 1.0, 0.0), 2.0, GREEN)
        .unwrap();

    let device = p.device();
    let shields = draws_with(device, technique::SHIELD);
    assert_eq!(shields.len(), 1);
    assert_eq!(shields[0].effect, Effect::Forward);
    assert_eq!(shields[0].blend, BlendState::Additive);
    assert_eq!(shields[0].depth, umbra_core::renderer::DepthState::ReadOnly);
    assert_eq!(shields[0].targets, vec![p.targets().light_accumulation()]);
    assert_eq!(
        shields[0].parameter(param::OVERLAY_COLOR),
        Some(&ParameterValue::Color(LinearRgba::rgb(0.0, 0.5, 1.0)))
    );

    let unshaded = draws_with(device, technique::UNSHADED);
    // Three submeshes of the cube, one of the sphere.
    assert_eq!(unshaded.len(), 4);
    assert!(unshaded
        .iter()
        .all(|d| d.rasterizer == umbra_core::renderer::RasterizerState::Wireframe));

    let cube_world = common::matrix_param(&unshaded[0], param::WORLD);
    let corner = cube_world.transform_point3(Vec3::new(0.5, 0.5, 0.5));
    assert_relative_eq!(corner.x, 1.0, epsilon = 1e-5);
    assert_relative_eq!(corner.y, 4.0, epsilon = 1e-5);
    assert_relative_eq!(corner.z, 1.0, epsilon = 1e-5);

    let sphere_world = common::matrix_param(&unshaded[3], param::WORLD);
    let top = sphere_world.transform_point3(Vec3::Y);
    assert_relative_eq!(top.y, 3.0, epsilon = 1e-5);
}
