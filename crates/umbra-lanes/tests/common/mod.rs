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

//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use umbra_core::asset::{
    AssetError, AssetLoader, AuthoredMaterial, GeometryData, SkinningData, Submesh, TextureRef,
};
use umbra_core::math::{Extent2D, LinearRgba, Mat4, Vec3};
use umbra_core::renderer::recording::RecordedDraw;
use umbra_core::renderer::{GeometryId, ParameterValue, RecordingDevice, SubmeshRange, TextureId};
use umbra_lanes::render_lane::{CameraMatrices, DeferredPipeline, GameTime, RenderTier};
use umbra_lanes::PipelineConfig;

/// An in-memory loader that counts how often it is asked for each path.
#[derive(Debug, Default)]
pub struct MockLoader {
    models: HashMap<String, GeometryData>,
    next_texture: u64,
    pub geometry_loads: HashMap<String, usize>,
    pub texture_loads: HashMap<String, usize>,
    pub missing_textures: Vec<String>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model made of `submeshes`, each an optional texture path
    /// and a diffuse color.
    pub fn with_model(mut self, path: &str, submeshes: &[(Option<&str>, LinearRgba)]) -> Self {
        let id = GeometryId(self.models.len() as u64 + 1);
        let submeshes = submeshes
            .iter()
            .enumerate()
            .map(|(i, (texture, diffuse))| Submesh {
                range: SubmeshRange {
                    base_vertex: 0,
                    vertex_count: 24,
                    start_index: i as u32 * 36,
                    primitive_count: 12,
                },
                material: AuthoredMaterial {
                    diffuse: *diffuse,
                    texture: texture.map(|p| TextureRef {
                        path: p.to_owned(),
                        id: TextureId(1000 + i as u64),
                    }),
                },
                parent_transform: Mat4::IDENTITY,
            })
            .collect();
        self.models.insert(
            path.to_owned(),
            GeometryData {
                id,
                submeshes,
                skinning: None,
            },
        );
        self
    }

    /// Marks a registered model as skinned.
    pub fn skinned(mut self, path: &str, bone_count: usize) -> Self {
        if let Some(model) = self.models.get_mut(path) {
            model.skinning = Some(SkinningData { bone_count });
        }
        self
    }

    pub fn geometry_load_count(&self, path: &str) -> usize {
        self.geometry_loads.get(path).copied().unwrap_or(0)
    }

    pub fn texture_load_count(&self, path: &str) -> usize {
        self.texture_loads.get(path).copied().unwrap_or(0)
    }
}

impl AssetLoader for MockLoader {
    fn load_geometry(&mut self, path: &str) -> Result<GeometryData, AssetError> {
        *self.geometry_loads.entry(path.to_owned()).or_default() += 1;
        self.models
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_owned()))
    }

    fn load_texture(&mut self, path: &str) -> Result<TextureRef, AssetError> {
        *self.texture_loads.entry(path.to_owned()).or_default() += 1;
        if self.missing_textures.iter().any(|p| p == path) {
            return Err(AssetError::NotFound(path.to_owned()));
        }
        self.next_texture += 1;
        Ok(TextureRef {
            path: path.to_owned(),
            id: TextureId(self.next_texture),
        })
    }
}

pub const GRAY: LinearRgba = LinearRgba::rgb(0.5, 0.5, 0.5);
pub const RED: LinearRgba = LinearRgba::rgb(1.0, 0.0, 0.0);
pub const GREEN: LinearRgba = LinearRgba::rgb(0.0, 1.0, 0.0);
pub const BLUE: LinearRgba = LinearRgba::rgb(0.0, 0.0, 1.0);

/// A small configuration so target sizes stay readable in assertions.
pub fn small_config() -> PipelineConfig {
    PipelineConfig {
        resolution: Extent2D::new(320, 180),
        ambient_color: GRAY,
        ..PipelineConfig::default()
    }
}

pub fn pipeline<T: RenderTier>() -> DeferredPipeline<RecordingDevice, T> {
    DeferredPipeline::new(RecordingDevice::new(), small_config()).unwrap()
}

pub fn camera() -> CameraMatrices {
    CameraMatrices::new(
        Mat4::look_at_rh(Vec3::new(0.0, 5.0, 10.0), Vec3::ZERO, Vec3::Y).unwrap(),
        Mat4::perspective_rh_zo(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0),
    )
}

pub fn time() -> GameTime {
    GameTime::new(1.0, 1.0 / 60.0)
}

/// The matrix bound to `name` when `draw` was issued.
pub fn matrix_param(draw: &RecordedDraw, name: &str) -> Mat4 {
    match draw.parameter(name) {
        Some(ParameterValue::Matrix(m)) => *m,
        other => panic!("expected a matrix for '{name}', got {other:?}"),
    }
}

/// The draws issued with `technique`.
pub fn draws_with(device: &RecordingDevice, technique: &str) -> Vec<RecordedDraw> {
    device
        .draws()
        .into_iter()
        .filter(|d| d.technique == technique)
        .collect()
}
