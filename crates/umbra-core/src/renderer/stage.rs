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

//! Frame phases of the deferred pipeline.

use std::fmt;

/// The phase a frame is currently in.
///
/// A frame always starts and ends in [`PipelineStage::Inactive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineStage {
    /// No frame in flight.
    #[default]
    Inactive,
    /// Geometry is being written into the G-buffer.
    Deferred,
    /// Shadow casters are being written into the shadow map.
    Shadow,
    /// Light contributions and post-processing are being accumulated.
    Lighting,
}

impl PipelineStage {
    /// The stage name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::Inactive => "Inactive",
            PipelineStage::Deferred => "Deferred",
            PipelineStage::Shadow => "Shadow",
            PipelineStage::Lighting => "Lighting",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which entry point started the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// A full scene frame: deferred, shadow, lighting, post-process.
    Scene,
    /// A character portrait: deferred fill composited straight to a caller target.
    Character,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Scene => f.write_str("scene"),
            FrameKind::Character => f.write_str("character"),
        }
    }
}
