// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sample serialisation: writes a rendered frame as interleaved
//! little-endian PCM at 16- or 32-bit width.

use crate::errors::{IamfError, Result};

/// Output integer PCM sample width, settable at any time via
/// `Decoder::configure_output_sample_type` and applied on the next
/// `get_output_temporal_unit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSampleType {
    Int16LittleEndian,
    Int32LittleEndian,
}

impl Default for OutputSampleType {
    fn default() -> Self {
        OutputSampleType::Int32LittleEndian
    }
}

impl OutputSampleType {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            OutputSampleType::Int16LittleEndian => 2,
            OutputSampleType::Int32LittleEndian => 4,
        }
    }

    fn bit_width(self) -> u32 {
        match self {
            OutputSampleType::Int16LittleEndian => 16,
            OutputSampleType::Int32LittleEndian => 32,
        }
    }

    /// Quantise a normalised float sample in `[-1, 1]` to this width's signed
    /// integer range: `round(clamp(s, -1, 1) * (2^(N-1) - 1))`.
    fn quantize(self, sample: f32) -> i64 {
        let clamped = sample.clamp(-1.0, 1.0);
        let scale = ((1i64 << (self.bit_width() - 1)) - 1) as f64;
        (clamped as f64 * scale).round() as i64
    }
}

/// Write one temporal unit's rendered frame as tick-major, channel-minor
/// (interleaved) little-endian PCM into `out`.
///
/// `matrix` is channel-major: `matrix[channel][tick]`. Every channel must
/// have the same length (`frame_size`). Returns the number of bytes written.
pub fn write_frame(
    matrix: &[Vec<f32>],
    sample_type: OutputSampleType,
    out: &mut [u8],
) -> Result<usize> {
    let channels = matrix.len();
    let frame_size = matrix.first().map_or(0, |c| c.len());
    let bytes_per_sample = sample_type.bytes_per_sample();
    let required = channels * frame_size * bytes_per_sample;

    if out.len() < required {
        return Err(IamfError::BufferTooSmall { required, available: out.len() });
    }

    let mut offset = 0;
    for tick in 0..frame_size {
        for channel in matrix {
            let value = sample_type.quantize(channel[tick]);
            let width = bytes_per_sample;
            let bytes = value.to_le_bytes();
            out[offset..offset + width].copy_from_slice(&bytes[..width]);
            offset += width;
        }
    }

    Ok(required)
}
