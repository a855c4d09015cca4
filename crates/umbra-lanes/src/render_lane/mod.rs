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

//! Render lane - the deferred shading pipeline.
//!
//! [`DeferredPipeline`] owns the stage machine, the render targets, the model
//! cache and the light lists, and drives a [`RenderDevice`] through them.
//! Everything else in this module is a building block it composes.
//!
//! [`RenderDevice`]: umbra_core::renderer::RenderDevice

mod drawer;
mod frame;
mod lighting;
mod model_cache;
mod pipeline;
mod post_process;
mod stage;
mod targets;
mod tier;

pub use drawer::*;
pub use frame::*;
pub use lighting::*;
pub use model_cache::*;
pub use pipeline::*;
pub use post_process::{bloom_sample_offset, downsample_technique};
pub use stage::*;
pub use targets::*;
pub use tier::*;
