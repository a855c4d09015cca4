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

//! The asset-loading boundary.
//!
//! The pipeline never parses model or image files. It asks an [`AssetLoader`]
//! for already-uploaded geometry and textures keyed by path and caches the
//! results. Everything in this module is plain data handed across that seam.

use crate::math::{LinearRgba, Mat4};
use crate::renderer::{GeometryId, SubmeshRange, TextureId};
use std::fmt;
use std::path::Path;

/// A texture the loader has uploaded, with the path it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureRef {
    /// The path the texture was requested with.
    pub path: String,
    /// The device handle.
    pub id: TextureId,
}

impl TextureRef {
    /// The file name without directory or extension.
    pub fn stem(&self) -> Option<&str> {
        Path::new(&self.path).file_stem().and_then(|s| s.to_str())
    }
}

/// The material a submesh was authored with.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoredMaterial {
    /// The flat diffuse color.
    pub diffuse: LinearRgba,
    /// The base-color texture, if one was bound in the source file.
    pub texture: Option<TextureRef>,
}

/// One drawable part of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Submesh {
    /// Where the submesh lives in the model's index buffer.
    pub range: SubmeshRange,
    /// The authored material.
    pub material: AuthoredMaterial,
    /// The transform of the submesh's parent node, relative to the model root.
    pub parent_transform: Mat4,
}

/// Skeleton binding for a skinned model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinningData {
    /// Number of bone matrices the skinned effect expects.
    pub bone_count: usize,
}

/// Immutable, uploaded model geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryData {
    /// The device handle for the vertex and index buffers.
    pub id: GeometryId,
    /// Submeshes in draw order.
    pub submeshes: Vec<Submesh>,
    /// Present when the model was authored with a skeleton.
    pub skinning: Option<SkinningData>,
}

/// An error reported by the external asset loader.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    /// No asset exists at the path.
    NotFound(String),
    /// The asset exists but could not be turned into usable data.
    Malformed {
        /// The path of the asset.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::NotFound(path) => write!(f, "Asset not found: {path}"),
            AssetError::Malformed { path, reason } => {
                write!(f, "Malformed asset '{path}': {reason}")
            }
        }
    }
}

impl std::error::Error for AssetError {}

/// Loads geometry and textures by path.
///
/// Loaders are called at most once per path by the model cache; they need
/// not cache themselves.
pub trait AssetLoader {
    /// Loads and uploads a model.
    fn load_geometry(&mut self, path: &str) -> Result<GeometryData, AssetError>;

    /// Loads and uploads a texture.
    fn load_texture(&mut self, path: &str) -> Result<TextureRef, AssetError>;
}
