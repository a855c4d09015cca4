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

//! # Umbra Lanes
//!
//! Hot-path execution for the deferred renderer: the stage machine, render
//! target management, model caching, light accumulation, post-processing and
//! draw submission, all expressed against the `umbra-core` device contract.

#![warn(missing_docs)]

pub mod config;
pub mod render_lane;

pub use config::{ConfigError, PipelineConfig};
pub use render_lane::{DeferredPipeline, HiDef, Reach, RenderTier};
