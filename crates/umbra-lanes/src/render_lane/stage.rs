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

//! The frame stage machine.
//!
//! ```text
//! Inactive --start_drawing--> Deferred --stop_deferred_start_shadow--> Shadow
//!    ^                          |                                        |
//!    |                   finish_character               stop_shadow_start_lighting
//!    |                          v                                        v
//!    +------------------------ Inactive <--------stop_drawing-------- Lighting
//! ```
//!
//! `start_character` enters `Deferred` like `start_drawing` but may only
//! leave through `finish_character`.

use umbra_core::renderer::{FrameKind, PipelineStage, RenderError};

/// A legal edge of the stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `Inactive -> Deferred`, scene frame.
    StartScene,
    /// `Inactive -> Deferred`, character frame.
    StartCharacter,
    /// `Deferred -> Shadow`, scene frames only.
    BeginShadow,
    /// `Shadow -> Lighting`.
    BeginLighting,
    /// `Lighting -> Inactive`.
    EndFrame,
    /// `Deferred -> Inactive`, character frames only.
    FinishCharacter,
}

impl Transition {
    /// The public operation that drives this transition.
    pub fn operation(self) -> &'static str {
        match self {
            Transition::StartScene => "start_drawing",
            Transition::StartCharacter => "start_character",
            Transition::BeginShadow => "stop_deferred_start_shadow",
            Transition::BeginLighting => "stop_shadow_start_lighting",
            Transition::EndFrame => "stop_drawing",
            Transition::FinishCharacter => "finish_character",
        }
    }

    /// The single stage this transition may leave.
    pub fn requires(self) -> &'static [PipelineStage] {
        match self {
            Transition::StartScene | Transition::StartCharacter => &[PipelineStage::Inactive],
            Transition::BeginShadow | Transition::FinishCharacter => &[PipelineStage::Deferred],
            Transition::BeginLighting => &[PipelineStage::Shadow],
            Transition::EndFrame => &[PipelineStage::Lighting],
        }
    }

    /// The stage this transition enters.
    pub fn target(self) -> PipelineStage {
        match self {
            Transition::StartScene | Transition::StartCharacter => PipelineStage::Deferred,
            Transition::BeginShadow => PipelineStage::Shadow,
            Transition::BeginLighting => PipelineStage::Lighting,
            Transition::EndFrame | Transition::FinishCharacter => PipelineStage::Inactive,
        }
    }

    /// The frame kind the transition requires, if it is kind-specific.
    fn required_kind(self) -> Option<FrameKind> {
        match self {
            Transition::BeginShadow => Some(FrameKind::Scene),
            Transition::FinishCharacter => Some(FrameKind::Character),
            _ => None,
        }
    }
}

/// Tracks the live stage and the kind of frame in flight.
#[derive(Debug, Default)]
pub struct StageMachine {
    stage: PipelineStage,
    frame: Option<FrameKind>,
}

impl StageMachine {
    /// Creates a machine in [`PipelineStage::Inactive`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The live stage.
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// The kind of frame in flight, `None` while inactive.
    pub fn frame_kind(&self) -> Option<FrameKind> {
        self.frame
    }

    /// Validates and applies a transition.
    ///
    /// This is the only place the stage changes. On error the machine is
    /// left untouched, so the caller must not have touched the device yet.
    pub fn transition(&mut self, transition: Transition) -> Result<(), RenderError> {
        let operation = transition.operation();
        self.require(operation, transition.requires())?;

        if let (Some(expected), Some(actual)) = (transition.required_kind(), self.frame) {
            if expected != actual {
                return Err(RenderError::FrameKindMismatch {
                    operation,
                    expected,
                    actual,
                });
            }
        }

        let from = self.stage;
        self.stage = transition.target();
        self.frame = match transition {
            Transition::StartScene => Some(FrameKind::Scene),
            Transition::StartCharacter => Some(FrameKind::Character),
            Transition::EndFrame | Transition::FinishCharacter => None,
            _ => self.frame,
        };
        log::trace!("{operation}: {from} -> {}", self.stage);
        Ok(())
    }

    /// Fails unless the live stage is one of `allowed`.
    pub fn require(
        &self,
        operation: &'static str,
        allowed: &'static [PipelineStage],
    ) -> Result<(), RenderError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(RenderError::StageViolation {
                operation,
                expected: allowed,
                actual: self.stage,
            })
        }
    }
}
