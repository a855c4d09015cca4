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

// Umbra Sandbox
// Drives a few frames of the deferred pipeline against the recording device.

use anyhow::{Context, Result};
use umbra_core::asset::{
    AssetError, AssetLoader, AuthoredMaterial, GeometryData, SkinningData, Submesh, TextureRef,
};
use umbra_core::math::{Extent2D, LinearRgba, Mat4, Quaternion, Vec3, Viewport, FRAC_PI_2};
use umbra_core::renderer::{
    decode_light, encode_light, GeometryId, LightColor, LightDescriptor, RecordingDevice,
    SubmeshRange, TextureId,
};
use umbra_lanes::render_lane::{CameraMatrices, CharacterView, DeferredPipeline, GameTime, HiDef};
use umbra_lanes::PipelineConfig;

const DEFAULT_CONFIG_PATH: &str = "sandbox/config.ron";
const FRAME_COUNT: u32 = 3;
const FRAME_DELTA: f32 = 1.0 / 60.0;

/// Hands out procedural geometry instead of reading files.
#[derive(Debug, Default)]
struct SandboxLoader {
    next_id: u64,
}

impl SandboxLoader {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn submesh(index: u32, diffuse: LinearRgba, texture: Option<TextureRef>) -> Submesh {
        Submesh {
            range: SubmeshRange {
                base_vertex: 0,
                vertex_count: 24,
                start_index: index * 36,
                primitive_count: 12,
            },
            material: AuthoredMaterial { diffuse, texture },
            parent_transform: Mat4::from_translation(Vec3::new(0.0, index as f32, 0.0)),
        }
    }
}

impl AssetLoader for SandboxLoader {
    fn load_geometry(&mut self, path: &str) -> Result<GeometryData, AssetError> {
        let submeshes = match path {
            "models/tower" => vec![
                Self::submesh(0, LinearRgba::rgb(0.6, 0.6, 0.6), None),
                Self::submesh(1, LinearRgba::rgb(0.5, 0.3, 0.2), None),
                Self::submesh(2, LinearRgba::rgb(0.8, 0.1, 0.1), None),
            ],
            "models/falls" => {
                let texture = self.load_texture("textures/waterfall_cliff.png")?;
                vec![Self::submesh(0, LinearRgba::WHITE, Some(texture))]
            }
            "models/rock" | "models/unit_cube" | "models/knight" => {
                vec![Self::submesh(0, LinearRgba::rgb(0.4, 0.4, 0.35), None)]
            }
            _ => return Err(AssetError::NotFound(path.to_owned())),
        };
        let skinning = (path == "models/knight").then_some(SkinningData { bone_count: 16 });
        Ok(GeometryData {
            id: GeometryId(self.next_id()),
            submeshes,
            skinning,
        })
    }

    fn load_texture(&mut self, path: &str) -> Result<TextureRef, AssetError> {
        Ok(TextureRef {
            path: path.to_owned(),
            id: TextureId(self.next_id()),
        })
    }
}

fn load_config() -> Result<PipelineConfig> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    if std::path::Path::new(&path).exists() {
        PipelineConfig::load(&path).with_context(|| format!("loading {path}"))
    } else {
        log::warn!("No configuration at '{path}', using defaults");
        Ok(PipelineConfig::default())
    }
}

fn camera(config: &PipelineConfig, angle: f32) -> Result<CameraMatrices> {
    let eye = Vec3::new(20.0 * angle.cos(), 8.0, 20.0 * angle.sin());
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y).context("degenerate camera")?;
    let aspect = config.resolution.width as f32 / config.resolution.height as f32;
    Ok(CameraMatrices::new(
        view,
        Mat4::perspective_rh_zo(FRAC_PI_2 * 0.5, aspect, 0.1, 500.0),
    ))
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    let mut loader = SandboxLoader::default();
    let mut pipeline: DeferredPipeline<RecordingDevice, HiDef> =
        DeferredPipeline::new(RecordingDevice::new(), config.clone())?;

    let sun = LightDescriptor::directional(
        Vec3::new(0.3, 1.0, 0.2),
        LightColor::new(255, 244, 214),
        1.2,
    );
    // Lights travel as 13-byte records; the location is not part of the record.
    let record = encode_light(&sun)?;
    let decoded = decode_light(&record)?;
    log::info!(
        "Sun record: {} bytes, decodes to {:?} at intensity {}",
        record.len(),
        decoded.kind,
        decoded.intensity
    );

    pipeline.add_scene_light(sun);
    pipeline.add_scene_light(LightDescriptor::point(
        Vec3::new(4.0, 2.0, 0.0),
        LightColor::new(255, 160, 64),
        3.0,
    ));
    pipeline.add_dynamic_light(LightDescriptor::point(
        Vec3::new(-3.0, 1.0, 2.0),
        LightColor::new(64, 128, 255),
        1.5,
    ))?;

    let tower = pipeline.load_model(&mut loader, "models/tower", None, None)?;
    let falls = pipeline.load_model(&mut loader, "models/falls", None, None)?;
    let rock = pipeline.load_model(&mut loader, "models/rock", None, None)?;
    let mossy = pipeline.load_model(&mut loader, "models/rock", Some("textures/moss.png"), None)?;
    let knight = pipeline.load_model(&mut loader, "models/knight", None, None)?;
    let cube = pipeline.load_model(&mut loader, "models/unit_cube", None, None)?;
    let bones = vec![Mat4::IDENTITY; 16];
    let rocks: Vec<Mat4> = (0..48)
        .map(|i| {
            let angle = i as f32 * 0.13;
            Mat4::from_translation(Vec3::new(12.0 * angle.cos(), 0.0, 12.0 * angle.sin()))
        })
        .collect();

    let mut total = 0.0;
    for frame in 0..FRAME_COUNT {
        total += f64::from(FRAME_DELTA);
        let camera = camera(&config, frame as f32 * 0.1)?;
        pipeline.start_drawing(camera, GameTime::new(total, FRAME_DELTA))?;

        for pass in 0..2 {
            pipeline.draw_model(&tower, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, None)?;
            pipeline.draw_model(
                &falls,
                Vec3::new(0.0, 0.0, -6.0),
                Quaternion::from_axis_angle(Vec3::Y, FRAC_PI_2),
                Vec3::ONE * 3.0,
                None,
            )?;
            pipeline.draw_model(
                &knight,
                Vec3::new(2.0, 0.0, 2.0),
                Quaternion::IDENTITY,
                Vec3::ONE,
                Some(&bones),
            )?;
            pipeline.draw_instanced(&rock, &rocks[..24])?;
            pipeline.draw_instanced(&mossy, &rocks[24..])?;
            if pass == 0 {
                pipeline.stop_deferred_start_shadow()?;
            }
        }

        pipeline.stop_shadow_start_lighting()?;
        pipeline.draw_shield(
            &cube,
            Mat4::from_translation(Vec3::new(2.0, 1.0, 2.0)),
            LinearRgba::rgb(0.2, 0.6, 1.0),
        )?;
        pipeline.draw_bounding_box(
            &cube,
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(1.0, 3.0, 1.0),
            LinearRgba::rgb(0.0, 1.0, 0.0),
        )?;
        pipeline.stop_drawing()?;

        let stats = pipeline.draw_stats();
        let lighting = pipeline.lighting_stats();
        log::info!(
            "Frame {frame}: {} draw calls, {} instances, {} light passes (shadowed: {})",
            stats.draw_calls,
            stats.instances,
            lighting.passes,
            lighting.shadowed
        );
    }

    pipeline.start_character(CharacterView {
        camera: camera(&config, 0.0)?,
        viewport: Viewport {
            x: 16,
            y: 16,
            width: 128,
            height: 160,
        },
        target: None,
    })?;
    pipeline.draw_model(&knight, Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE, Some(&bones))?;
    pipeline.finish_character()?;

    pipeline.resize(Extent2D::new(
        config.resolution.width / 2,
        config.resolution.height / 2,
    ))?;

    log::info!(
        "Cached {} models, instance buffer holds {} transforms",
        pipeline.models().len(),
        pipeline.instance_capacity()
    );
    let device = pipeline.shutdown()?;
    log::info!(
        "Recorded {} commands over {} presented frames",
        device.commands().len(),
        device.frames_presented()
    );
    Ok(())
}
