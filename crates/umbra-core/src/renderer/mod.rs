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

//! Provides the backend-agnostic rendering contracts for Umbra.
//!
//! This module defines the "common language" between the deferred pipeline
//! and whatever executes its commands: the [`RenderDevice`] trait, the
//! effect binding contract, resource handles, light descriptors and the
//! error types. The pipeline itself lives in `umbra-lanes` and only talks
//! to a device through these types.

pub mod device;
pub mod effect;
pub mod error;
pub mod light;
pub mod light_codec;
pub mod recording;
pub mod resource;
pub mod stage;

// Re-export the most important traits and types for easier use.
pub use self::device::RenderDevice;
pub use self::effect::{param, technique, Effect, ParameterBlock, ParameterValue};
pub use self::error::{RenderError, ResourceError};
pub use self::light::{LightColor, LightDescriptor, LightKind};
pub use self::light_codec::{decode_light, encode_light, LightCodecError};
pub use self::recording::RecordingDevice;
pub use self::resource::*;
pub use self::stage::{FrameKind, PipelineStage};
