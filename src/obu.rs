// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OBU (Open Bitstream Unit) framing.
//!
//! Identifies the type and payload span of the OBU at the current bit
//! position without copying the payload, then leaves the bytes for the
//! caller to process. The OBU universe is closed and small, so it is modelled
//! as a tagged union rather than an inheritance hierarchy.

use bitflags::bitflags;

use crate::errors::{corrupt_temporal_unit, IamfError, Result};
use crate::io::BitBuffer;

bitflags! {
    /// The low 3 bits of an OBU header byte: `obu_redundant_copy`,
    /// `obu_trimming_status_flag`, `obu_extension_flag`. This core supports
    /// none of them — trimming and extension headers are part of the wider
    /// IAMF OBU syntax this decoder doesn't need — so `frame_next` rejects
    /// any OBU with a nonzero set here rather than silently misinterpreting
    /// its payload layout.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    struct ObuHeaderFlags: u8 {
        const REDUNDANT_COPY = 1 << 2;
        const TRIMMING       = 1 << 1;
        const EXTENSION      = 1 << 0;
    }
}

/// The closed universe of OBU types recognised by this decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObuType {
    IaSequenceHeader,
    CodecConfig,
    AudioElement,
    MixPresentation,
    ParameterBlock,
    /// An audio frame whose substream id is carried explicitly as the first
    /// field of the payload.
    AudioFrame,
    /// An audio frame whose substream id (0..=17) is implied by the OBU type
    /// value itself, the common case for low substream-id streams.
    AudioFrameId(u8),
    TemporalDelimiter,
    /// A syntactically valid but unrecognised OBU type. Carried through so
    /// unknown future OBU types can be skipped rather than rejected outright.
    Reserved(u8),
}

impl ObuType {
    fn from_tag(tag: u8) -> ObuType {
        match tag {
            0 => ObuType::IaSequenceHeader,
            1 => ObuType::CodecConfig,
            2 => ObuType::AudioElement,
            3 => ObuType::MixPresentation,
            4 => ObuType::ParameterBlock,
            5 => ObuType::TemporalDelimiter,
            6 => ObuType::AudioFrame,
            7..=24 => ObuType::AudioFrameId(tag - 7),
            other => ObuType::Reserved(other),
        }
    }

    /// True for the four descriptor OBU types.
    pub fn is_descriptor(self) -> bool {
        matches!(
            self,
            ObuType::IaSequenceHeader
                | ObuType::CodecConfig
                | ObuType::AudioElement
                | ObuType::MixPresentation
        )
    }

    /// The substream id an implicit-id audio-frame OBU carries, if any.
    pub fn implicit_substream_id(self) -> Option<u32> {
        match self {
            ObuType::AudioFrameId(id) => Some(u32::from(id)),
            _ => None,
        }
    }

    pub fn is_audio_frame(self) -> bool {
        matches!(self, ObuType::AudioFrame | ObuType::AudioFrameId(_))
    }
}

/// A framed OBU: its type and the bounds of its payload within the
/// [`BitBuffer`]. The bit buffer's cursor is positioned at the start of the
/// payload; the payload's `payload_len` bytes are guaranteed to already be
/// buffered (the framer does not return a `FramedObu` unless the whole OBU,
/// header included, is available).
#[derive(Debug, Clone, Copy)]
pub struct FramedObu {
    pub obu_type: ObuType,
    pub payload_len: usize,
    /// Total size of the OBU (header + size field + payload), in bytes. Used
    /// by callers that need to know how far to flush once the OBU has been
    /// fully consumed.
    pub total_len: usize,
}

/// Outcome of probing for the next OBU.
pub enum FrameResult {
    Framed(FramedObu),
    /// Not enough bytes are buffered yet to frame a whole OBU. The stream is
    /// left positioned exactly where it was when `frame_next` was called.
    Insufficient,
}

/// Frame the next OBU at the stream's current position.
///
/// On `Insufficient`, the stream's cursor is restored to the position it had
/// on entry, so the caller can retry once more bytes are pushed.
pub fn frame_next(stream: &mut BitBuffer) -> Result<FrameResult> {
    let start = stream.tell();

    let header = match stream.read_bits32(8) {
        Ok(h) => h,
        Err(e) if e.is_insufficient_data() => {
            stream.seek(start);
            return Ok(FrameResult::Insufficient);
        }
        Err(e) => return Err(e),
    };

    let tag = (header >> 3) as u8;
    let flags = ObuHeaderFlags::from_bits_truncate(header as u8);
    if !flags.is_empty() {
        stream.seek(start);
        return corrupt_temporal_unit("OBU header uses unsupported reserved flag bits");
    }

    let size = match stream.read_uleb128() {
        Ok(n) => n,
        Err(e) if e.is_insufficient_data() => {
            stream.seek(start);
            return Ok(FrameResult::Insufficient);
        }
        Err(e) => return Err(e),
    };

    let payload_len = usize::try_from(size)
        .map_err(|_| IamfError::CorruptTemporalUnit("OBU payload size overflows usize"))?;

    if stream.bits_remaining() < (payload_len as u64) * 8 {
        stream.seek(start);
        return Ok(FrameResult::Insufficient);
    }

    let header_and_size_len = ((stream.tell() - start) / 8) as usize;

    Ok(FrameResult::Framed(FramedObu {
        obu_type: ObuType::from_tag(tag),
        payload_len,
        total_len: header_and_size_len + payload_len,
    }))
}
