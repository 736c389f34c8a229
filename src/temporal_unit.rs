// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temporal unit assembly.
//!
//! A temporal unit bundles together, for one playback instant, every
//! substream's audio frame plus any parameter blocks carried alongside them.
//! `TemporalUnitAssembler` consumes OBUs one at a time and seals a unit the
//! moment every substream named by the descriptor set has contributed a
//! frame, so no look-ahead past the unit boundary is ever required.

use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::DescriptorSet;
use crate::errors::{IamfError, Result};
use crate::io::BitBuffer;
use crate::obu::{frame_next, FrameResult, ObuType};

#[derive(Debug, Clone)]
pub struct ParameterBlock {
    pub param_id: u32,
    pub payload: Vec<u8>,
}

/// One playback instant's worth of decoded-but-not-yet-rendered data: every
/// expected substream's raw (still codec-encoded) frame payload, plus any
/// parameter blocks that arrived alongside them.
///
/// `timestamp` is the sample offset (in samples per channel) of this unit
/// within the IA sequence: IAMF does not encode timestamps on the wire, they
/// are implicit in ordinal position, so the assembler derives one by
/// counting `frame_size` per sealed unit starting at zero.
#[derive(Debug, Clone, Default)]
pub struct TemporalUnit {
    pub timestamp: i64,
    pub parameter_blocks: Vec<ParameterBlock>,
    pub substream_payloads: BTreeMap<u32, Vec<u8>>,
}

impl TemporalUnit {
    fn is_empty(&self) -> bool {
        self.parameter_blocks.is_empty() && self.substream_payloads.is_empty()
    }
}

/// Incrementally assembles [`TemporalUnit`]s out of the OBU stream that
/// follows a sealed descriptor set.
pub struct TemporalUnitAssembler {
    expected_substreams: BTreeSet<u32>,
    pending: TemporalUnit,
    frame_size: i64,
    next_timestamp: i64,
}

impl TemporalUnitAssembler {
    pub fn new(descriptors: &DescriptorSet) -> Self {
        let expected_substreams = descriptors
            .audio_elements
            .values()
            .flat_map(|e| e.substream_ids.iter().copied())
            .collect();
        let frame_size = descriptors.codec_configs.values().next().map_or(0, |c| c.frame_size as i64);
        TemporalUnitAssembler {
            expected_substreams,
            pending: TemporalUnit::default(),
            frame_size,
            next_timestamp: 0,
        }
    }

    /// Attempt to assemble the next complete temporal unit.
    ///
    /// Returns `Ok(Some(unit))` once every expected substream has
    /// contributed a frame. Returns `Ok(None)` if the buffered bytes run out
    /// first; the stream is left positioned at the start of whatever OBU
    /// could not be fully framed, and `pull` picks back up exactly there on
    /// the next call once more bytes have been pushed. Returns
    /// `Err(IamfError::UnexpectedDescriptor)` if a descriptor OBU is
    /// encountered: the descriptor set is sealed for the life of the
    /// decoder instance, barring `Reset`.
    pub fn pull(&mut self, stream: &mut BitBuffer) -> Result<Option<TemporalUnit>> {
        loop {
            let obu_start = stream.tell();

            let framed = match frame_next(stream) {
                Ok(FrameResult::Framed(f)) => f,
                Ok(FrameResult::Insufficient) => return Ok(None),
                Err(e) if e.is_insufficient_data() => return Ok(None),
                Err(e) => return Err(e),
            };

            if framed.obu_type.is_descriptor() {
                stream.seek(obu_start);
                return Err(IamfError::UnexpectedDescriptor);
            }

            match framed.obu_type {
                ObuType::TemporalDelimiter => {
                    // An explicit temporal delimiter always ends the current
                    // unit, even if it carries no frames or parameter blocks
                    // (a "trivial" unit) and even if some expected substream
                    // never contributed.
                    stream.read_bytes(framed.payload_len)?;
                    return Ok(Some(self.seal_now()));
                }
                ObuType::ParameterBlock => {
                    let payload_start = stream.tell();
                    let param_id = stream.read_uleb128()? as u32;
                    let consumed = ((stream.tell() - payload_start) / 8) as usize;
                    let rest = stream.read_bytes(framed.payload_len - consumed)?;
                    self.pending.parameter_blocks.push(ParameterBlock { param_id, payload: rest });
                }
                ObuType::AudioFrame => {
                    let payload_start = stream.tell();
                    let substream_id = stream.read_uleb128()? as u32;
                    let consumed = ((stream.tell() - payload_start) / 8) as usize;
                    let payload = stream.read_bytes(framed.payload_len - consumed)?;
                    if self.accept_substream_frame(substream_id, payload, stream, obu_start)? {
                        // Implicit delimiter: this frame belongs to the next
                        // unit, so the current one is done regardless of
                        // whether every expected substream contributed.
                        return Ok(Some(self.seal_now()));
                    }
                }
                ObuType::AudioFrameId(_) => {
                    let substream_id = framed.obu_type.implicit_substream_id().expect("AudioFrameId");
                    let payload = stream.read_bytes(framed.payload_len)?;
                    if self.accept_substream_frame(substream_id, payload, stream, obu_start)? {
                        return Ok(Some(self.seal_now()));
                    }
                }
                ObuType::Reserved(_) => {
                    stream.read_bytes(framed.payload_len)?;
                }
                ObuType::IaSequenceHeader
                | ObuType::CodecConfig
                | ObuType::AudioElement
                | ObuType::MixPresentation => unreachable!("filtered out by is_descriptor above"),
            }

            if let Some(unit) = self.try_seal() {
                return Ok(Some(unit));
            }
        }
    }

    /// Insert `payload` for `substream_id`. Returns `Ok(true)` if this
    /// duplicates a substream already seen in the current unit — a sign
    /// that a new temporal unit has started without an explicit delimiter —
    /// in which case the stream is rewound to `obu_start` so the next
    /// `pull` call re-reads this frame as the first OBU of the next unit,
    /// and the current (now complete-enough) unit should be sealed.
    fn accept_substream_frame(
        &mut self,
        substream_id: u32,
        payload: Vec<u8>,
        stream: &mut BitBuffer,
        obu_start: u64,
    ) -> Result<bool> {
        if self.pending.substream_payloads.contains_key(&substream_id) {
            stream.seek(obu_start);
            return Ok(true);
        }
        self.pending.substream_payloads.insert(substream_id, payload);
        Ok(false)
    }

    /// Seal whenever every expected substream has already contributed, even
    /// without having seen an explicit delimiter yet — lets simple streams
    /// that omit redundant temporal-delimiter OBUs between fully-populated
    /// units still make progress one unit at a time.
    fn try_seal(&mut self) -> Option<TemporalUnit> {
        if self.expected_substreams.is_empty() {
            return None;
        }
        let have_all = self
            .expected_substreams
            .iter()
            .all(|id| self.pending.substream_payloads.contains_key(id));
        if !have_all {
            return None;
        }
        Some(self.seal_now())
    }

    /// Unconditionally seal whatever is currently pending (even empty or
    /// partial) and advance the timestamp clock by one frame's worth of
    /// samples.
    fn seal_now(&mut self) -> TemporalUnit {
        self.pending.timestamp = self.next_timestamp;
        self.next_timestamp += self.frame_size;
        std::mem::take(&mut self.pending)
    }

    /// Called when the caller knows no further bytes are coming
    /// (`signal_end_of_stream`). Returns whatever partial unit was in
    /// flight, if it carries anything at all, even if it's short some
    /// substreams — a truncated final unit is still delivered rather than
    /// silently dropped.
    pub fn finalize_partial(&mut self) -> Option<TemporalUnit> {
        if self.pending.is_empty() {
            None
        } else {
            self.pending.timestamp = self.next_timestamp;
            self.next_timestamp += self.frame_size;
            Some(std::mem::take(&mut self.pending))
        }
    }
}
