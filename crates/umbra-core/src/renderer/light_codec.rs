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

//! Versioned binary encoding of [`LightDescriptor`].
//!
//! The record is little-endian and fixed width:
//!
//! | Field     | Type  |
//! |-----------|-------|
//! | version   | `i16` |
//! | type tag  | `u32` |
//! | red       | `u8`  |
//! | green     | `u8`  |
//! | blue      | `u8`  |
//! | intensity | `f32` |
//!
//! The light location is not part of the record and decodes as zero.

use crate::math::Vec3;
use crate::renderer::light::{LightColor, LightDescriptor, LightKind};
use bincode::config::{self, Config};
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use std::fmt;
use std::io::{Read, Write};

/// The only record version this codec reads or writes.
pub const LIGHT_RECORD_VERSION: i16 = 0;

/// Size in bytes of an encoded record, version included.
pub const LIGHT_RECORD_SIZE: usize = 2 + 4 + 3 + 4;

fn codec_config() -> impl Config {
    config::legacy()
}

#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
struct LightRecordV0 {
    tag: u32,
    r: u8,
    g: u8,
    b: u8,
    intensity: f32,
}

impl From<&LightDescriptor> for LightRecordV0 {
    fn from(light: &LightDescriptor) -> Self {
        Self {
            tag: light.kind.tag(),
            r: light.color.r,
            g: light.color.g,
            b: light.color.b,
            intensity: light.intensity,
        }
    }
}

impl TryFrom<LightRecordV0> for LightDescriptor {
    type Error = LightCodecError;

    fn try_from(record: LightRecordV0) -> Result<Self, Self::Error> {
        let kind =
            LightKind::from_tag(record.tag).ok_or(LightCodecError::UnknownLightType(record.tag))?;
        Ok(LightDescriptor {
            kind,
            color: LightColor::new(record.r, record.g, record.b),
            intensity: record.intensity,
            location: Vec3::ZERO,
        })
    }
}

/// An error raised while encoding or decoding a light record.
#[derive(Debug)]
pub enum LightCodecError {
    /// The record carries a version this codec does not understand.
    UnsupportedVersion(i16),
    /// The type tag does not name a known light kind.
    UnknownLightType(u32),
    /// The underlying encoder failed.
    Encode(EncodeError),
    /// The input was truncated or otherwise unreadable.
    Decode(DecodeError),
}

impl fmt::Display for LightCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightCodecError::UnsupportedVersion(v) => {
                write!(f, "Unsupported light record version: {v}")
            }
            LightCodecError::UnknownLightType(tag) => write!(f, "Unknown light type tag: {tag}"),
            LightCodecError::Encode(err) => write!(f, "Failed to encode light record: {err}"),
            LightCodecError::Decode(err) => write!(f, "Failed to decode light record: {err}"),
        }
    }
}

impl std::error::Error for LightCodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LightCodecError::Encode(err) => Some(err),
            LightCodecError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EncodeError> for LightCodecError {
    fn from(err: EncodeError) -> Self {
        LightCodecError::Encode(err)
    }
}

impl From<DecodeError> for LightCodecError {
    fn from(err: DecodeError) -> Self {
        LightCodecError::Decode(err)
    }
}

/// Encodes a light into a freshly allocated record.
pub fn encode_light(light: &LightDescriptor) -> Result<Vec<u8>, LightCodecError> {
    let bytes = bincode::encode_to_vec(
        (LIGHT_RECORD_VERSION, LightRecordV0::from(light)),
        codec_config(),
    )?;
    Ok(bytes)
}

/// Decodes a light record from the start of `bytes`.
///
/// Trailing bytes are ignored. The version is checked before the body is read.
pub fn decode_light(bytes: &[u8]) -> Result<LightDescriptor, LightCodecError> {
    let (version, read): (i16, usize) = bincode::decode_from_slice(bytes, codec_config())?;
    if version != LIGHT_RECORD_VERSION {
        return Err(LightCodecError::UnsupportedVersion(version));
    }
    let (record, _): (LightRecordV0, usize) =
        bincode::decode_from_slice(&bytes[read..], codec_config())?;
    record.try_into()
}

/// Writes a light record to a stream.
pub fn write_light<W: Write>(writer: &mut W, light: &LightDescriptor) -> Result<(), LightCodecError> {
    bincode::encode_into_std_write(
        (LIGHT_RECORD_VERSION, LightRecordV0::from(light)),
        writer,
        codec_config(),
    )?;
    Ok(())
}

/// Reads one light record from a stream, consuming exactly one record on success.
pub fn read_light<R: Read>(reader: &mut R) -> Result<LightDescriptor, LightCodecError> {
    let version: i16 = bincode::decode_from_std_read(reader, codec_config())?;
    if version != LIGHT_RECORD_VERSION {
        return Err(LightCodecError::UnsupportedVersion(version));
    }
    let record: LightRecordV0 = bincode::decode_from_std_read(reader, codec_config())?;
    record.try_into()
}
