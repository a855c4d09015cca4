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

//! Rendering capability tiers.
//!
//! The tier is a type parameter of the pipeline, so every capability check
//! below is a constant the compiler folds away in the per-draw paths.

use std::fmt::Debug;

/// The feature set a device class supports.
pub trait RenderTier: Debug + Default + Send + Sync + 'static {
    /// A human-readable tier name for logs.
    const NAME: &'static str;
    /// Whether a shadow map is allocated and sampled.
    const SUPPORTS_SHADOWS: bool;
    /// Whether the edge-highlight pass runs.
    const SUPPORTS_EDGES: bool;
    /// Whether the bloom chain is allocated and run.
    const SUPPORTS_BLOOM: bool;
    /// Whether instanced draws are issued as one device call.
    ///
    /// When `false`, instancing is emulated with one indexed draw per instance.
    const HARDWARE_INSTANCING: bool;
    /// Edge length of the square shadow map in pixels.
    const SHADOW_MAP_SIZE: u32;
}

/// Full-featured tier for desktop-class devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct HiDef;

impl RenderTier for HiDef {
    const NAME: &'static str = "HiDef";
    const SUPPORTS_SHADOWS: bool = true;
    const SUPPORTS_EDGES: bool = true;
    const SUPPORTS_BLOOM: bool = true;
    const HARDWARE_INSTANCING: bool = true;
    const SHADOW_MAP_SIZE: u32 = 2048;
}

/// Reduced tier: no shadows, edges or bloom, and emulated instancing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Reach;

impl RenderTier for Reach {
    const NAME: &'static str = "Reach";
    const SUPPORTS_SHADOWS: bool = false;
    const SUPPORTS_EDGES: bool = false;
    const SUPPORTS_BLOOM: bool = false;
    const HARDWARE_INSTANCING: bool = false;
    const SHADOW_MAP_SIZE: u32 = 0;
}
