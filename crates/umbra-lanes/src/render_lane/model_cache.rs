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

//! Deduplicating cache of drawable model variants.
//!
//! A model path is loaded once. Every further (texture, emissive) override
//! combination for that path is a *variant*: a new [`ModelHandle`] that
//! shares the loaded geometry through an [`Arc`] and owns its own material
//! state.

use ahash::AHashMap;
use std::sync::Arc;
use umbra_core::asset::{AssetLoader, GeometryData, SkinningData, TextureRef};
use umbra_core::math::LinearRgba;
use umbra_core::renderer::RenderError;

/// A drawable model: shared geometry plus per-variant material state.
///
/// A handle carries either one base-color texture or one flat color per
/// submesh, never both.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    source: Arc<str>,
    geometry: Arc<GeometryData>,
    texture: Option<TextureRef>,
    emissive: Option<TextureRef>,
    flat_colors: Option<Vec<LinearRgba>>,
    skinning: Option<SkinningData>,
    is_waterfall: bool,
}

impl PartialEq for ModelHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.geometry, &other.geometry)
            && texture_path(&self.texture) == texture_path(&other.texture)
            && texture_path(&self.emissive) == texture_path(&other.emissive)
    }
}

fn texture_path(texture: &Option<TextureRef>) -> Option<&str> {
    texture.as_ref().map(|t| t.path.as_str())
}

fn is_waterfall_texture(texture: Option<&TextureRef>) -> bool {
    texture
        .and_then(TextureRef::stem)
        .is_some_and(|stem| stem.to_ascii_lowercase().contains("waterfall"))
}

impl ModelHandle {
    /// Derives the base variant from freshly loaded geometry.
    ///
    /// The first textured submesh provides the handle's texture. Textures on
    /// later submeshes are ignored: a handle holds a single texture.
    fn from_geometry(source: &str, geometry: GeometryData) -> Self {
        let mut texture: Option<TextureRef> = None;
        let mut flat_colors = Vec::with_capacity(geometry.submeshes.len());
        for submesh in &geometry.submeshes {
            match (&texture, &submesh.material.texture) {
                (None, Some(authored)) => texture = Some(authored.clone()),
                (Some(winner), Some(ignored)) if winner.path != ignored.path => {
                    log::debug!(
                        "Model '{source}': texture '{}' ignored, handle already uses '{}'",
                        ignored.path,
                        winner.path
                    );
                    flat_colors.push(submesh.material.diffuse);
                }
                _ => flat_colors.push(submesh.material.diffuse),
            }
        }
        let is_waterfall = is_waterfall_texture(texture.as_ref());
        Self {
            source: Arc::from(source),
            skinning: geometry.skinning,
            geometry: Arc::new(geometry),
            flat_colors: if texture.is_some() {
                None
            } else {
                Some(flat_colors)
            },
            texture,
            emissive: None,
            is_waterfall,
        }
    }

    /// The path the geometry was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The shared geometry.
    pub fn geometry(&self) -> &Arc<GeometryData> {
        &self.geometry
    }

    /// The base-color texture, if bound.
    pub fn texture(&self) -> Option<&TextureRef> {
        self.texture.as_ref()
    }

    /// The emissive texture, if bound.
    pub fn emissive(&self) -> Option<&TextureRef> {
        self.emissive.as_ref()
    }

    /// One flat color per submesh; `None` whenever a texture is bound.
    pub fn flat_colors(&self) -> Option<&[LinearRgba]> {
        self.flat_colors.as_deref()
    }

    /// Skeleton binding, if the model is skinned.
    pub fn skinning(&self) -> Option<&SkinningData> {
        self.skinning.as_ref()
    }

    /// Whether the texture scrolls over time.
    pub fn is_waterfall(&self) -> bool {
        self.is_waterfall
    }

    /// The number of submeshes.
    pub fn submesh_count(&self) -> usize {
        self.geometry.submeshes.len()
    }

    /// Binds a base-color texture, discarding the flat colors.
    pub fn set_texture(&mut self, texture: TextureRef) {
        self.is_waterfall = is_waterfall_texture(Some(&texture));
        self.texture = Some(texture);
        self.flat_colors = None;
    }

    /// Sets per-submesh flat colors, unbinding any base-color texture.
    pub fn set_flat_colors(&mut self, colors: Vec<LinearRgba>) -> Result<(), RenderError> {
        if colors.len() != self.submesh_count() {
            return Err(RenderError::InvalidArgument(format!(
                "model '{}' has {} submeshes but {} flat colors were given",
                self.source,
                self.submesh_count(),
                colors.len()
            )));
        }
        self.texture = None;
        self.is_waterfall = false;
        self.flat_colors = Some(colors);
        Ok(())
    }

    /// Binds an emissive texture.
    pub fn set_emissive(&mut self, emissive: TextureRef) {
        self.emissive = Some(emissive);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VariantKey {
    texture: Option<String>,
    emissive: Option<String>,
}

impl VariantKey {
    fn new(texture: Option<&str>, emissive: Option<&str>) -> Self {
        Self {
            texture: texture.map(str::to_owned),
            emissive: emissive.map(str::to_owned),
        }
    }
}

/// Cache of loaded models keyed by path, then by override combination.
#[derive(Debug, Default)]
pub struct ModelCache {
    models: AHashMap<String, Vec<(VariantKey, ModelHandle)>>,
    textures: AHashMap<String, TextureRef>,
}

impl ModelCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `(path, texture_override, emissive_override)`.
    ///
    /// The first request for `path` loads its geometry and registers the
    /// un-overridden base variant. Requests for a new override combination
    /// clone the base variant and attach the overrides. Loader errors are
    /// returned wrapped in [`RenderError::Asset`]; a failed override texture
    /// still leaves the base variant registered.
    pub fn resolve<L: AssetLoader>(
        &mut self,
        loader: &mut L,
        path: &str,
        texture_override: Option<&str>,
        emissive_override: Option<&str>,
    ) -> Result<ModelHandle, RenderError> {
        let key = VariantKey::new(texture_override, emissive_override);

        if !self.models.contains_key(path) {
            let geometry = loader.load_geometry(path)?;
            log::debug!(
                "Loaded model '{path}' with {} submeshes",
                geometry.submeshes.len()
            );
            let base = ModelHandle::from_geometry(path, geometry);
            self.models
                .insert(path.to_owned(), vec![(VariantKey::new(None, None), base)]);
        }

        if let Some(handle) = self.find(path, &key) {
            return Ok(handle.clone());
        }

        let texture = match texture_override {
            Some(p) => Some(self.load_texture(loader, p)?),
            None => None,
        };
        let emissive = match emissive_override {
            Some(p) => Some(self.load_texture(loader, p)?),
            None => None,
        };

        let variants = self
            .models
            .get_mut(path)
            .ok_or_else(|| RenderError::InvalidArgument(format!("model '{path}' not cached")))?;
        let mut variant = variants
            .first()
            .map(|(_, base)| base.clone())
            .ok_or_else(|| RenderError::InvalidArgument(format!("model '{path}' has no base")))?;
        if let Some(texture) = texture {
            variant.set_texture(texture);
        }
        if let Some(emissive) = emissive {
            variant.set_emissive(emissive);
        }
        log::debug!(
            "Created variant of '{path}' (texture: {:?}, emissive: {:?})",
            key.texture,
            key.emissive
        );
        variants.push((key, variant.clone()));
        Ok(variant)
    }

    fn find(&self, path: &str, key: &VariantKey) -> Option<&ModelHandle> {
        self.models
            .get(path)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, handle)| handle)
    }

    fn load_texture<L: AssetLoader>(
        &mut self,
        loader: &mut L,
        path: &str,
    ) -> Result<TextureRef, RenderError> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }
        let texture = loader.load_texture(path)?;
        self.textures.insert(path.to_owned(), texture.clone());
        Ok(texture)
    }

    /// The number of distinct model paths loaded.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// The number of variants registered for `path`, base included.
    pub fn variant_count(&self, path: &str) -> usize {
        self.models.get(path).map_or(0, Vec::len)
    }

    /// Drops every cached model and texture.
    pub fn clear(&mut self) {
        log::debug!(
            "Clearing model cache ({} models, {} textures)",
            self.models.len(),
            self.textures.len()
        );
        self.models.clear();
        self.textures.clear();
    }
}
