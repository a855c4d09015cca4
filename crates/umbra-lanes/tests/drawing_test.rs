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

mod common;

use approx::assert_relative_eq;
use common::{camera, draws_with, matrix_param, pipeline, time, MockLoader, GREEN, RED};
use umbra_core::math::{Mat4, Quaternion, Vec2, Vec3};
use umbra_core::renderer::recording::{DeviceCommand, DrawPrimitive};
use umbra_core::renderer::{
    param, technique, Effect, InstanceTransform, LightColor, LightDescriptor, ParameterValue,
    RenderError,
};
use umbra_lanes::render_lane::{HiDef, Reach};

fn loader() -> MockLoader {
    MockLoader::new()
        .with_model("models/crate", &[(None, RED), (None, GREEN)])
        .with_model("models/rock", &[(None, RED)])
        .with_model("models/sign", &[(Some("textures/sign.png"), RED)])
        .with_model("models/falls", &[(Some("textures/waterfall_a.png"), RED)])
        .with_model("models/knight", &[(None, RED)])
        .skinned("models/knight", 4)
}

fn translations(count: usize) -> Vec<Mat4> {
    (0..count)
        .map(|i| Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)))
        .collect()
}

#[test]
fn test_world_is_translate_rotate_scale() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let rock = p.load_model(&mut loader, "models/rock", None, None).unwrap();

    p.start_drawing(camera(), time()).unwrap();
    p.draw_model(
        &rock,
        Vec3::new(1.0, 2.0, 3.0),
        Quaternion::IDENTITY,
        Vec3::ONE * 2.0,
        None,
    )
    .unwrap();

    let draw = &draws_with(p.device(), technique::DEFERRED)[0];
    let moved = matrix_param(draw, param::WORLD).transform_point3(Vec3::X);
    assert_relative_eq!(moved.x, 3.0);
    assert_relative_eq!(moved.y, 2.0);
    assert_relative_eq!(moved.z, 3.0);
}

#[test]
fn test_textured_model_uses_textured_effect() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let sign = p.load_model(&mut loader, "models/sign", None, None).unwrap();
    let texture = sign.texture().unwrap().id;

    p.start_drawing(camera(), time()).unwrap();
    p.draw_model(&sign, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, None)
        .unwrap();

    let draw = &draws_with(p.device(), technique::DEFERRED)[0];
    assert_eq!(draw.effect, Effect::DeferredTextured);
    assert_eq!(draw.parameter(param::TEXTURE), Some(&ParameterValue::Texture(texture)));
    assert_eq!(
        draw.parameter(param::TEXTURE_OFFSET),
        Some(&ParameterValue::Vector2(Vec2::ZERO))
    );
    assert!(draw.parameter(param::DIFFUSE_COLOR).is_none());
}

#[test]
fn test_waterfall_texture_scrolls_with_frame_time() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let falls = p.load_model(&mut loader, "models/falls", None, None).unwrap();
    assert!(falls.is_waterfall());

    p.start_drawing(camera(), time()).unwrap();
    p.draw_model(&falls, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, None)
        .unwrap();

    let period = p.config().waterfall_period;
    let draw = &draws_with(p.device(), technique::DEFERRED)[0];
    match draw.parameter(param::TEXTURE_OFFSET) {
        Some(ParameterValue::Vector2(offset)) => {
            assert_relative_eq!(offset.x, 0.0);
            assert_relative_eq!(offset.y, time().delta_seconds / period);
        }
        other => panic!("unexpected texture offset {other:?}"),
    }
}

#[test]
fn test_skinned_model_needs_bones_for_skinned_effect() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let knight = p.load_model(&mut loader, "models/knight", None, None).unwrap();
    let bones = vec![Mat4::IDENTITY; 4];

    p.start_drawing(camera(), time()).unwrap();
    p.draw_model(&knight, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, Some(&bones))
        .unwrap();
    p.draw_model(&knight, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, None)
        .unwrap();

    let draws = draws_with(p.device(), technique::DEFERRED);
    assert_eq!(draws[0].effect, Effect::DeferredSkinned);
    assert_eq!(
        draws[0].parameter(param::BONES),
        Some(&ParameterValue::MatrixArray(bones))
    );
    assert_eq!(draws[1].effect, Effect::DeferredColored);
}

#[test]
fn test_too_many_bones_is_rejected() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let knight = p.load_model(&mut loader, "models/knight", None, None).unwrap();

    p.start_drawing(camera(), time()).unwrap();
    let before = p.device().commands().len();
    let err = p
        .draw_model(
            &knight,
            Vec3::ZERO,
            Quaternion::IDENTITY,
            Vec3::ONE,
            Some(&[Mat4::IDENTITY; 5]),
        )
        .unwrap_err();
    assert!(matches!(err, RenderError::InvalidArgument(_)));
    assert_eq!(p.device().commands().len(), before);
}

#[test]
fn test_instanced_draw_is_one_call_on_hidef() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let rock = p.load_model(&mut loader, "models/rock", None, None).unwrap();

    p.start_drawing(camera(), time()).unwrap();
    p.draw_instanced(&rock, &translations(3)).unwrap();

    let draws = draws_with(p.device(), technique::DEFERRED_INSTANCED);
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].effect, Effect::DeferredColored);
    match draws[0].primitive {
        DrawPrimitive::Instanced(draw) => assert_eq!(draw.instance_count, 3),
        other => panic!("expected an instanced draw, got {other:?}"),
    }
    assert!(p.device().commands().iter().any(|c| matches!(
        c,
        DeviceCommand::WriteInstanceBuffer { bytes, .. }
            if *bytes == 3 * std::mem::size_of::<InstanceTransform>()
    )));
    let stats = p.draw_stats();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.instances, 3);
}

#[test]
fn test_instance_buffer_grows_but_never_shrinks() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let rock = p.load_model(&mut loader, "models/rock", None, None).unwrap();

    p.start_drawing(camera(), time()).unwrap();
    p.draw_instanced(&rock, &translations(3)).unwrap();
    let small = p.instance_capacity();
    assert!(small >= 3);

    p.draw_instanced(&rock, &translations(small + 1)).unwrap();
    let grown = p.instance_capacity();
    assert!(grown > small);

    p.draw_instanced(&rock, &translations(2)).unwrap();
    assert_eq!(p.instance_capacity(), grown);
    assert_eq!(p.device().live_buffer_count(), 1);
}

#[test]
fn test_reach_emulates_instancing_with_indexed_draws() {
    let mut loader = loader();
    let mut p = pipeline::<Reach>();
    let rock = p.load_model(&mut loader, "models/rock", None, None).unwrap();

    p.start_drawing(camera(), time()).unwrap();
    let transforms = translations(3);
    p.draw_instanced(&rock, &transforms).unwrap();

    let device = p.device();
    assert!(!device
        .commands()
        .iter()
        .any(|c| matches!(c, DeviceCommand::DrawInstanced(_))));
    let draws = draws_with(device, technique::DEFERRED);
    assert_eq!(draws.len(), 3);
    for (draw, transform) in draws.iter().zip(&transforms) {
        assert_eq!(matrix_param(draw, param::WORLD), *transform);
    }
    assert_eq!(device.live_buffer_count(), 0);
    assert_eq!(p.draw_stats().instances, 3);
}

#[test]
fn test_instancing_multi_submesh_model_is_rejected() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let crate_model = p.load_model(&mut loader, "models/crate", None, None).unwrap();

    p.start_drawing(camera(), time()).unwrap();
    assert!(matches!(
        p.draw_instanced(&crate_model, &translations(2)),
        Err(RenderError::InvalidArgument(_))
    ));
}

#[test]
fn test_instancing_nothing_draws_nothing() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let rock = p.load_model(&mut loader, "models/rock", None, None).unwrap();

    p.start_drawing(camera(), time()).unwrap();
    let before = p.device().commands().len();
    p.draw_instanced(&rock, &[]).unwrap();
    assert_eq!(p.device().commands().len(), before);
}

#[test]
fn test_shadow_stage_uses_light_space_variants() {
    let mut loader = loader();
    let mut p = pipeline::<HiDef>();
    let rock = p.load_model(&mut loader, "models/rock", None, None).unwrap();
    let sign = p.load_model(&mut loader, "models/sign", None, None).unwrap();
    p.add_scene_light(LightDescriptor::directional(Vec3::Y, LightColor::WHITE, 1.0));

    p.start_drawing(camera(), time()).unwrap();
    p.stop_deferred_start_shadow().unwrap();
    p.draw_model(&sign, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, None)
        .unwrap();
    p.draw_instanced(&rock, &translations(2)).unwrap();

    let device = p.device();
    let single = draws_with(device, technique::LIGHT_SPACE);
    assert_eq!(single.len(), 1);
    // Depth-only: textures do not matter to the shadow map.
    assert_eq!(single[0].effect, Effect::DeferredColored);
    assert_eq!(draws_with(device, technique::LIGHT_SPACE_INSTANCED).len(), 1);
}
