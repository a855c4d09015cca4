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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::asset::AssetError;
use crate::renderer::stage::{FrameKind, PipelineStage};
use std::fmt;

/// An error related to the creation or use of a device resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The handle used to reference a resource is unknown or was destroyed.
    InvalidHandle(String),
    /// A resource was requested with a zero-sized extent.
    EmptyExtent(&'static str),
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::InvalidHandle(what) => write!(f, "Invalid resource handle: {what}"),
            ResourceError::EmptyExtent(label) => {
                write!(f, "Resource '{label}' requested with an empty extent")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error raised by the deferred pipeline.
#[derive(Debug)]
pub enum RenderError {
    /// An operation was called while the pipeline was in the wrong stage.
    ///
    /// This is a call-order bug in the caller; nothing was submitted to the
    /// device before it was detected.
    StageViolation {
        /// The operation that was attempted.
        operation: &'static str,
        /// The stages in which the operation is legal.
        expected: &'static [PipelineStage],
        /// The stage the pipeline was actually in.
        actual: PipelineStage,
    },
    /// A frame exit was called for the wrong kind of frame.
    FrameKindMismatch {
        /// The operation that was attempted.
        operation: &'static str,
        /// The frame kind the operation finishes.
        expected: FrameKind,
        /// The frame kind that is in flight.
        actual: FrameKind,
    },
    /// An argument was rejected.
    InvalidArgument(String),
    /// An error occurred while managing a device resource.
    Resource(ResourceError),
    /// The external asset loader failed.
    Asset(AssetError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::StageViolation {
                operation,
                expected,
                actual,
            } => {
                let expected = expected
                    .iter()
                    .map(PipelineStage::name)
                    .collect::<Vec<_>>()
                    .join(" or ");
                write!(
                    f,
                    "'{operation}' requires stage {expected}, but the pipeline is in stage {actual}"
                )
            }
            RenderError::FrameKindMismatch {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "'{operation}' finishes a {expected} frame, but a {actual} frame is in flight"
            ),
            RenderError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            RenderError::Resource(err) => write!(f, "Graphics resource operation failed: {err}"),
            RenderError::Asset(err) => write!(f, "Asset loading failed: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(err) => Some(err),
            RenderError::Asset(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

impl From<AssetError> for RenderError {
    fn from(err: AssetError) -> Self {
        RenderError::Asset(err)
    }
}
