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

//! Pipeline configuration, loaded from RON.
//!
//! Every field has a default, so a configuration file only needs to name
//! what it changes:
//!
//! ```
//! use umbra_lanes::PipelineConfig;
//!
//! let config = PipelineConfig::from_ron_str("(fog_enabled: true, fog_begin: 0.4)").unwrap();
//! assert!(config.fog_enabled);
//! assert_eq!(config.fog_end, 1.0);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use umbra_core::math::{Extent2D, LinearRgba};

/// Upper bound for background color channels. Values above 1 are over-white.
pub const MAX_BACKGROUND_CHANNEL: f32 = 4.0;

/// Errors raised while loading or validating a [`PipelineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The RON text is malformed or has fields of the wrong type.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The configuration could not be written back to RON.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] ron::Error),

    /// A numeric field lies outside its valid range.
    #[error("`{field}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// The offending field.
        field: &'static str,
        /// The value found.
        value: f32,
        /// Inclusive lower bound.
        min: f32,
        /// Inclusive upper bound.
        max: f32,
    },

    /// Fog begins after it ends.
    #[error("fog_begin ({begin}) must not exceed fog_end ({end})")]
    FogOrder {
        /// The configured fog begin.
        begin: f32,
        /// The configured fog end.
        end: f32,
    },

    /// The target resolution has a zero axis.
    #[error("resolution {width}x{height} has an empty axis")]
    EmptyResolution {
        /// The configured width.
        width: u32,
        /// The configured height.
        height: u32,
    },
}

/// Edge-highlight pass parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Weight of depth discontinuities.
    pub depth_sensitivity: f32,
    /// Weight of normal discontinuities.
    pub normal_sensitivity: f32,
    /// Combined discontinuity above which a pixel is darkened.
    pub threshold: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            depth_sensitivity: 10.0,
            normal_sensitivity: 1.0,
            threshold: 0.5,
        }
    }
}

/// Fixed shadow camera placement.
///
/// The shadow camera always looks at the world origin, so scenes far larger
/// than `extent` lose shadow resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Distance from the origin to the shadow camera eye.
    pub distance: f32,
    /// Width and height of the orthographic shadow volume.
    pub extent: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            distance: 100.0,
            extent: 80.0,
        }
    }
}

/// Everything the deferred pipeline reads from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Render target resolution in pixels.
    pub resolution: Extent2D,
    /// Ambient light added to every lit pixel.
    pub ambient_color: LinearRgba,
    /// Background color at the screen border, channels in `[0, 4]`.
    pub background_outer: LinearRgba,
    /// Background color at the screen center, channels in `[0, 4]`.
    ///
    /// A negative red channel means "unset": the outer color is used instead.
    pub background_inner: LinearRgba,
    /// Selects the fog technique instead of the plain background.
    pub fog_enabled: bool,
    /// Normalized depth at which fog starts.
    pub fog_begin: f32,
    /// Normalized depth at which fog is opaque.
    pub fog_end: f32,
    /// Edge-highlight parameters.
    pub edges: EdgeConfig,
    /// Shadow camera parameters.
    pub shadow: ShadowConfig,
    /// Bloom sampling offset before per-level scaling.
    pub bloom_base_offset: f32,
    /// Seconds after which the scrolling-texture timer wraps.
    pub waterfall_period: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution: Extent2D::new(1280, 720),
            ambient_color: LinearRgba::rgb(0.2, 0.2, 0.2),
            background_outer: LinearRgba::rgb(0.4, 0.5, 0.8),
            background_inner: LinearRgba::rgb(-1.0, 0.0, 0.0),
            fog_enabled: false,
            fog_begin: 0.3,
            fog_end: 1.0,
            edges: EdgeConfig::default(),
            shadow: ShadowConfig::default(),
            bloom_base_offset: 0.5,
            waterfall_period: 8.0,
        }
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn check_background(field: &'static str, color: &LinearRgba) -> Result<(), ConfigError> {
    for value in [color.r, color.g, color.b] {
        check_range(field, value, 0.0, MAX_BACKGROUND_CHANNEL)?;
    }
    Ok(())
}

impl PipelineConfig {
    /// Parses and validates a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading pipeline configuration from {}", path.as_ref().display());
        Self::from_ron_str(&text)
    }

    /// Serializes the configuration as pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Checks every field against its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution.is_empty() {
            return Err(ConfigError::EmptyResolution {
                width: self.resolution.width,
                height: self.resolution.height,
            });
        }
        check_background("background_outer", &self.background_outer)?;
        if self.inner_background_set() {
            check_background("background_inner", &self.background_inner)?;
        }
        check_range("fog_begin", self.fog_begin, 0.0, 1.0)?;
        check_range("fog_end", self.fog_end, 0.0, 1.0)?;
        if self.fog_begin > self.fog_end {
            return Err(ConfigError::FogOrder {
                begin: self.fog_begin,
                end: self.fog_end,
            });
        }
        for value in [
            self.ambient_color.r,
            self.ambient_color.g,
            self.ambient_color.b,
        ] {
            check_range("ambient_color", value, 0.0, f32::MAX)?;
        }
        check_range("shadow.distance", self.shadow.distance, f32::EPSILON, f32::MAX)?;
        check_range("shadow.extent", self.shadow.extent, f32::EPSILON, f32::MAX)?;
        check_range("bloom_base_offset", self.bloom_base_offset, 0.0, f32::MAX)?;
        check_range("waterfall_period", self.waterfall_period, f32::EPSILON, f32::MAX)?;
        Ok(())
    }

    /// Returns `true` if the inner background color was configured.
    pub fn inner_background_set(&self) -> bool {
        self.background_inner.r >= 0.0
    }

    /// The inner background color, falling back to the outer one when unset.
    pub fn effective_background_inner(&self) -> LinearRgba {
        if self.inner_background_set() {
            self.background_inner
        } else {
            self.background_outer
        }
    }
}
