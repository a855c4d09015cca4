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

//! Ownership of every render target the pipeline draws into.

use umbra_core::math::Extent2D;
use umbra_core::renderer::{
    RenderDevice, RenderError, RenderTargetDescriptor, RenderTargetId, SurfaceFormat,
};

/// Number of levels in the bloom downsample chain.
pub const BLOOM_LEVELS: usize = 3;

/// Per-axis reduction between consecutive bloom levels.
pub const BLOOM_DOWNSCALE: u32 = 4;

/// The three geometry surfaces written during the deferred stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GBuffer {
    /// Albedo in rgb, emissive strength in alpha. Carries the depth attachment.
    pub albedo: RenderTargetId,
    /// Linear view depth.
    pub depth: RenderTargetId,
    /// View-space normal packed into `[0, 1]`.
    pub normal: RenderTargetId,
}

impl GBuffer {
    /// The surfaces in binding slot order.
    pub fn slots(&self) -> [RenderTargetId; 3] {
        [self.albedo, self.depth, self.normal]
    }
}

/// The full set of pipeline-owned render targets for one resolution.
///
/// Built and torn down as a unit. Holders of a [`RenderTargetId`] from this
/// set must not keep it across a resize or reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetSet {
    resolution: Extent2D,
    gbuffer: GBuffer,
    shadow_map: Option<(RenderTargetId, Extent2D)>,
    light_accumulation: RenderTargetId,
    bloom_scratch: Option<RenderTargetId>,
    bloom_chain: Vec<RenderTargetId>,
}

/// Size of bloom level `level` for a given output resolution.
///
/// Level 0 is a quarter of the output per axis; each further level is a
/// quarter of the previous one.
pub fn bloom_level_size(resolution: Extent2D, level: usize) -> Extent2D {
    let mut size = resolution;
    for _ in 0..=level {
        size = size.downscaled(BLOOM_DOWNSCALE);
    }
    size
}

struct Builder<'a, D: RenderDevice> {
    device: &'a mut D,
    created: Vec<RenderTargetId>,
}

impl<D: RenderDevice> Builder<'_, D> {
    fn create(
        &mut self,
        label: &'static str,
        size: Extent2D,
        format: SurfaceFormat,
        with_depth: bool,
    ) -> Result<RenderTargetId, RenderError> {
        let id = self.device.create_render_target(&RenderTargetDescriptor {
            label,
            size,
            format,
            with_depth,
        })?;
        self.created.push(id);
        Ok(id)
    }

    /// Releases everything created so far after a failed build.
    fn roll_back(self) {
        for id in self.created {
            if let Err(e) = self.device.destroy_render_target(id) {
                log::error!("Failed to release render target {id:?} during rollback: {e}");
            }
        }
    }
}

impl RenderTargetSet {
    /// Allocates every target for `resolution`.
    ///
    /// `shadow_map_size` of `None` skips the shadow map; `bloom` of `false`
    /// skips the scratch buffer and the bloom chain. If any allocation fails,
    /// targets created so far are released and the error is returned.
    pub fn create<D: RenderDevice>(
        device: &mut D,
        resolution: Extent2D,
        shadow_map_size: Option<u32>,
        bloom: bool,
    ) -> Result<Self, RenderError> {
        let mut builder = Builder {
            device,
            created: Vec::new(),
        };
        match Self::build(&mut builder, resolution, shadow_map_size, bloom) {
            Ok(set) => {
                log::debug!(
                    "Allocated {} render targets at {}x{}",
                    builder.created.len(),
                    resolution.width,
                    resolution.height
                );
                Ok(set)
            }
            Err(e) => {
                builder.roll_back();
                Err(e)
            }
        }
    }

    fn build<D: RenderDevice>(
        builder: &mut Builder<'_, D>,
        resolution: Extent2D,
        shadow_map_size: Option<u32>,
        bloom: bool,
    ) -> Result<Self, RenderError> {
        let gbuffer = GBuffer {
            albedo: builder.create("gbuffer.albedo", resolution, SurfaceFormat::Rgba8, true)?,
            depth: builder.create("gbuffer.depth", resolution, SurfaceFormat::R32Float, false)?,
            normal: builder.create("gbuffer.normal", resolution, SurfaceFormat::Rgba8, false)?,
        };

        let shadow_map = match shadow_map_size {
            Some(edge) => {
                let size = Extent2D::new(edge, edge);
                Some((
                    builder.create("shadow.map", size, SurfaceFormat::R32Float, true)?,
                    size,
                ))
            }
            None => None,
        };

        let light_accumulation = builder.create(
            "light.accumulation",
            resolution,
            SurfaceFormat::Rgba16Float,
            false,
        )?;

        let (bloom_scratch, bloom_chain) = if bloom {
            let scratch = builder.create(
                "bloom.scratch",
                bloom_level_size(resolution, 0),
                SurfaceFormat::Rgba16Float,
                false,
            )?;
            let mut chain = Vec::with_capacity(BLOOM_LEVELS);
            for level in 0..BLOOM_LEVELS {
                chain.push(builder.create(
                    "bloom.level",
                    bloom_level_size(resolution, level),
                    SurfaceFormat::Rgba16Float,
                    false,
                )?);
            }
            (Some(scratch), chain)
        } else {
            (None, Vec::new())
        };

        Ok(Self {
            resolution,
            gbuffer,
            shadow_map,
            light_accumulation,
            bloom_scratch,
            bloom_chain,
        })
    }

    /// Releases every target in the set.
    ///
    /// All targets are attempted; the first failure is returned.
    pub fn destroy<D: RenderDevice>(self, device: &mut D) -> Result<(), RenderError> {
        let mut first_error = None;
        for id in self.all() {
            if let Err(e) = device.destroy_render_target(id) {
                log::error!("Failed to release render target {id:?}: {e}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Every target in allocation order.
    pub fn all(&self) -> Vec<RenderTargetId> {
        let mut ids = self.gbuffer.slots().to_vec();
        ids.extend(self.shadow_map.map(|(id, _)| id));
        ids.push(self.light_accumulation);
        ids.extend(self.bloom_scratch);
        ids.extend(self.bloom_chain.iter().copied());
        ids
    }

    /// The resolution the set was built for.
    pub fn resolution(&self) -> Extent2D {
        self.resolution
    }

    /// The G-buffer surfaces.
    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }

    /// The shadow map, if the tier has one.
    pub fn shadow_map(&self) -> Option<RenderTargetId> {
        self.shadow_map.map(|(id, _)| id)
    }

    /// The shadow map edge size, if the tier has one.
    pub fn shadow_map_size(&self) -> Option<Extent2D> {
        self.shadow_map.map(|(_, size)| size)
    }

    /// The HDR light accumulation buffer.
    pub fn light_accumulation(&self) -> RenderTargetId {
        self.light_accumulation
    }

    /// The blur scratch buffer, sized like bloom level 0.
    pub fn bloom_scratch(&self) -> Option<RenderTargetId> {
        self.bloom_scratch
    }

    /// The bloom chain, finest level first. Empty without bloom.
    pub fn bloom_chain(&self) -> &[RenderTargetId] {
        &self.bloom_chain
    }
}
