// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Descriptor accumulation and the static decoder context it produces.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::errors::{invalid_descriptors, IamfError, Result};
use crate::io::BitBuffer;
use crate::layout::{Layout, SoundSystem};
use crate::obu::{frame_next, FrameResult, ObuType};

/// The profile a mix presentation (or the whole sequence) declares
/// conformance to. Reserved values are kept internal: they never cross the
/// public boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileVersion {
    Simple,
    Base,
    BaseEnhanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawProfile {
    Known(ProfileVersion),
    Reserved(u8),
}

fn profile_from_tag(tag: u8) -> RawProfile {
    match tag {
        0 => RawProfile::Known(ProfileVersion::Simple),
        1 => RawProfile::Known(ProfileVersion::Base),
        2 => RawProfile::Known(ProfileVersion::BaseEnhanced),
        other => RawProfile::Reserved(other),
    }
}

/// The recognised substream codecs. Only [`CodecKind::Lpcm`] has a bundled
/// reference decoder; the others are parsed so
/// descriptor validation succeeds for any conformant stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    Lpcm,
    Opus,
    AacLc,
    Flac,
}

impl CodecKind {
    fn from_tag(tag: u8) -> Result<CodecKind> {
        match tag {
            0 => Ok(CodecKind::Lpcm),
            1 => Ok(CodecKind::Opus),
            2 => Ok(CodecKind::AacLc),
            3 => Ok(CodecKind::Flac),
            _ => invalid_descriptors("unknown codec kind tag"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CodecConfig {
    pub id: u32,
    pub sample_rate: u32,
    pub frame_size: u32,
    /// Bit depth in bits per sample. Only meaningful for [`CodecKind::Lpcm`];
    /// `None` for codecs that carry their own internal sample format.
    pub bit_depth: Option<u8>,
    pub codec_kind: CodecKind,
    pub codec_private: Box<[u8]>,
}

/// Whether an audio element carries pre-rendered speaker feeds or a
/// scene-based ambisonics representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelConfiguration {
    Channels(SoundSystem),
    Ambisonics { order: u8 },
}

#[derive(Debug, Clone)]
pub struct AudioElement {
    pub id: u32,
    pub codec_config_id: u32,
    /// Most audio elements carry only one or two substreams (mono/stereo
    /// channel-based elements, or a single ambisonics substream group); keep
    /// those inline rather than heap-allocating for the common case.
    pub substream_ids: SmallVec<[u32; 4]>,
    pub channel_configuration: ChannelConfiguration,
}

#[derive(Debug, Clone)]
pub struct MixPresentationLayout {
    pub layout: Layout,
    /// Raw integrated loudness field, in the codec's native units. Not
    /// interpreted by this core (loudness measurement is an external
    /// collaborator).
    pub integrated_loudness: i32,
}

#[derive(Debug, Clone)]
pub struct MixPresentation {
    pub id: u32,
    pub profile: ProfileVersion,
    pub audio_element_ids: Vec<u32>,
    pub layouts: Vec<MixPresentationLayout>,
}

/// The sealed, immutable (for the decoder's life, modulo `Reset`) result of
/// descriptor accumulation.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    pub profile_version: ProfileVersion,
    pub codec_configs: BTreeMap<u32, CodecConfig>,
    pub audio_elements: BTreeMap<u32, AudioElement>,
    pub mix_presentations: Vec<MixPresentation>,
    /// Snapshot of exactly the descriptor OBU bytes, for `reset()`.
    pub raw_bytes: Vec<u8>,
}

/// Incrementally consumes framed OBUs until a complete descriptor set is
/// seen, or reports that more bytes are needed.
#[derive(Default)]
pub struct DescriptorAccumulator {
    header_profile: Option<RawProfile>,
    codec_configs: BTreeMap<u32, CodecConfig>,
    audio_elements: BTreeMap<u32, AudioElement>,
    mix_presentations: Vec<MixPresentation>,
    raw_bytes: Vec<u8>,
}

impl DescriptorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to make progress. Returns `Ok(Some(set))` once sealed, with
    /// `stream` positioned immediately after the last descriptor OBU (and
    /// before whatever non-descriptor OBU triggered the seal, if any — that
    /// OBU's bytes are left for the temporal-unit assembler). Returns
    /// `Ok(None)` if more bytes are required; the stream's cursor is left at
    /// the position it should resume parsing from on the next call.
    pub fn poll(&mut self, stream: &mut BitBuffer) -> Result<Option<DescriptorSet>> {
        loop {
            let obu_start = stream.tell();

            let framed = match frame_next(stream) {
                Ok(FrameResult::Framed(f)) => f,
                Ok(FrameResult::Insufficient) => return Ok(None),
                Err(e) if e.is_insufficient_data() => return Ok(None),
                Err(_) => return invalid_descriptors("malformed OBU header in descriptor region"),
            };

            if !framed.obu_type.is_descriptor() {
                // Temporal-unit territory begins here; rewind so the
                // assembler sees this OBU from its start.
                stream.seek(obu_start);
                return self.seal();
            }

            self.consume_descriptor_obu(framed.obu_type, framed.payload_len, stream, obu_start)?;
        }
    }

    /// Force a seal once the caller knows no further bytes are coming
    /// (`create_from_descriptors`). Fails if no complete descriptor set has
    /// been accumulated yet.
    pub fn finalize_exhaustive(mut self, stream: &mut BitBuffer) -> Result<DescriptorSet> {
        loop {
            let obu_start = stream.tell();
            match frame_next(stream) {
                Ok(FrameResult::Framed(f)) if f.obu_type.is_descriptor() => {
                    self.consume_descriptor_obu(f.obu_type, f.payload_len, stream, obu_start)?;
                }
                Ok(FrameResult::Framed(_)) => {
                    return invalid_descriptors(
                        "trailing bytes after descriptor set in create_from_descriptors",
                    );
                }
                Ok(FrameResult::Insufficient) | Err(_) => break,
            }
        }

        match self.seal()? {
            Some(set) if stream.bits_remaining() == 0 => Ok(set),
            Some(_) => {
                invalid_descriptors("trailing bytes after descriptor set in create_from_descriptors")
            }
            None => invalid_descriptors("truncated descriptor set"),
        }
    }

    fn consume_descriptor_obu(
        &mut self,
        obu_type: ObuType,
        payload_len: usize,
        stream: &mut BitBuffer,
        obu_start: u64,
    ) -> Result<()> {
        match obu_type {
            ObuType::IaSequenceHeader => {
                if self.header_profile.is_some() {
                    return invalid_descriptors("duplicate IA sequence header");
                }
                let payload = stream.read_bytes(payload_len)?;
                if payload.is_empty() {
                    return invalid_descriptors("empty IA sequence header payload");
                }
                self.header_profile = Some(profile_from_tag(payload[0]));
            }
            ObuType::CodecConfig => {
                self.require_header()?;
                let cfg = parse_codec_config(stream, payload_len)?;
                if self.codec_configs.insert(cfg.id, cfg).is_some() {
                    return invalid_descriptors("duplicate codec_config_id");
                }
            }
            ObuType::AudioElement => {
                self.require_header()?;
                let element = parse_audio_element(stream, payload_len)?;
                let mut seen_substreams: Vec<u32> =
                    self.audio_elements.values().flat_map(|e| e.substream_ids.iter().copied()).collect();
                for &sid in &element.substream_ids {
                    if seen_substreams.contains(&sid) {
                        return invalid_descriptors("duplicate substream id across audio elements");
                    }
                    seen_substreams.push(sid);
                }
                if self.audio_elements.insert(element.id, element).is_some() {
                    return invalid_descriptors("duplicate audio_element_id");
                }
            }
            ObuType::MixPresentation => {
                self.require_header()?;
                let mix = parse_mix_presentation(stream, payload_len)?;
                self.mix_presentations.push(mix);
            }
            _ => unreachable!("non-descriptor OBU type reached consume_descriptor_obu"),
        }

        let end = stream.tell();
        self.raw_bytes.extend_from_slice(stream.byte_slice(obu_start, end));
        Ok(())
    }

    fn require_header(&self) -> Result<()> {
        if self.header_profile.is_none() {
            invalid_descriptors("descriptor OBU encountered before IA sequence header")
        } else {
            Ok(())
        }
    }

    fn seal(self) -> Result<Option<DescriptorSet>> {
        let Some(raw_profile) = self.header_profile else {
            return Ok(None);
        };
        let RawProfile::Known(profile_version) = raw_profile else {
            return invalid_descriptors("reserved profile version in IA sequence header");
        };

        if self.codec_configs.is_empty() {
            return invalid_descriptors("no codec_config present");
        }
        if self.audio_elements.is_empty() {
            return invalid_descriptors("no audio_element present");
        }
        if self.mix_presentations.is_empty() {
            return invalid_descriptors("no mix_presentation present");
        }

        for element in self.audio_elements.values() {
            if !self.codec_configs.contains_key(&element.codec_config_id) {
                return invalid_descriptors("audio_element references unknown codec_config_id");
            }
        }
        for mix in &self.mix_presentations {
            if mix.layouts.is_empty() {
                return invalid_descriptors("mix_presentation has no layouts");
            }
            for audio_element_id in &mix.audio_element_ids {
                if !self.audio_elements.contains_key(audio_element_id) {
                    return invalid_descriptors("mix_presentation references unknown audio_element_id");
                }
            }
        }

        log::debug!(
            "descriptor set sealed: {} codec_configs, {} audio_elements, {} mix_presentations",
            self.codec_configs.len(),
            self.audio_elements.len(),
            self.mix_presentations.len()
        );

        Ok(Some(DescriptorSet {
            profile_version,
            codec_configs: self.codec_configs,
            audio_elements: self.audio_elements,
            mix_presentations: self.mix_presentations,
            raw_bytes: self.raw_bytes,
        }))
    }
}

fn parse_codec_config(stream: &mut BitBuffer, payload_len: usize) -> Result<CodecConfig> {
    let payload_start = stream.tell();
    let id = stream.read_uleb128()? as u32;
    let codec_kind = CodecKind::from_tag(stream.read_bits32(8)? as u8)?;
    let sample_rate = stream.read_bits32(32)?;
    let frame_size = stream.read_uleb128()? as u32;
    let raw_bit_depth = stream.read_bits32(8)? as u8;
    let bit_depth = if codec_kind == CodecKind::Lpcm { Some(raw_bit_depth) } else { None };
    let private_len = stream.read_uleb128()? as usize;
    let codec_private = stream.read_bytes(private_len)?.into_boxed_slice();

    let consumed = ((stream.tell() - payload_start) / 8) as usize;
    if consumed != payload_len {
        return invalid_descriptors("codec_config payload length mismatch");
    }
    if sample_rate == 0 || frame_size == 0 {
        return invalid_descriptors("codec_config sample_rate and frame_size must be non-zero");
    }

    Ok(CodecConfig { id, sample_rate, frame_size, bit_depth, codec_kind, codec_private })
}

fn parse_audio_element(stream: &mut BitBuffer, payload_len: usize) -> Result<AudioElement> {
    let payload_start = stream.tell();
    let id = stream.read_uleb128()? as u32;
    let codec_config_id = stream.read_uleb128()? as u32;

    let channel_configuration = match stream.read_bits32(8)? {
        0 => {
            let tag = stream.read_bits32(8)? as u8;
            let system = SoundSystem::from_tag(tag)
                .ok_or(IamfError::InvalidDescriptors("unknown sound system tag"))?;
            ChannelConfiguration::Channels(system)
        }
        1 => {
            let order = stream.read_bits32(8)? as u8;
            ChannelConfiguration::Ambisonics { order }
        }
        _ => return invalid_descriptors("unknown channel_configuration tag"),
    };

    let num_substreams = stream.read_uleb128()?;
    let mut substream_ids = SmallVec::with_capacity(num_substreams as usize);
    for _ in 0..num_substreams {
        substream_ids.push(stream.read_uleb128()? as u32);
    }

    let consumed = ((stream.tell() - payload_start) / 8) as usize;
    if consumed != payload_len {
        return invalid_descriptors("audio_element payload length mismatch");
    }

    Ok(AudioElement { id, codec_config_id, substream_ids, channel_configuration })
}

fn parse_mix_presentation(stream: &mut BitBuffer, payload_len: usize) -> Result<MixPresentation> {
    let payload_start = stream.tell();
    let id = stream.read_uleb128()? as u32;
    let profile = match profile_from_tag(stream.read_bits32(8)? as u8) {
        RawProfile::Known(p) => p,
        RawProfile::Reserved(_) => return invalid_descriptors("reserved profile in mix_presentation"),
    };

    let num_audio_elements = stream.read_uleb128()?;
    let mut audio_element_ids = Vec::with_capacity(num_audio_elements as usize);
    for _ in 0..num_audio_elements {
        audio_element_ids.push(stream.read_uleb128()? as u32);
    }

    let num_layouts = stream.read_uleb128()?;
    let mut layouts = Vec::with_capacity(num_layouts as usize);
    for _ in 0..num_layouts {
        let tag = stream.read_bits32(8)? as u8;
        let layout = match SoundSystem::from_tag(tag) {
            Some(system) => Layout::SoundSystem(system),
            None => Layout::ReservedOrBinaural(tag),
        };
        let integrated_loudness = stream.read_bits32(32)? as i32;
        layouts.push(MixPresentationLayout { layout, integrated_loudness });
    }

    let consumed = ((stream.tell() - payload_start) / 8) as usize;
    if consumed != payload_len {
        return invalid_descriptors("mix_presentation payload length mismatch");
    }

    Ok(MixPresentation { id, profile, audio_element_ids, layouts })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn seals_a_complete_descriptor_set() {
        let mut stream = BitBuffer::new();
        stream.push(&basic_descriptor_blob());
        let mut acc = DescriptorAccumulator::new();
        let set = acc.poll(&mut stream).unwrap();
        assert!(set.is_none(), "no trailing OBU yet, should report Insufficient");
    }

    #[test]
    fn seals_once_a_non_descriptor_obu_follows() {
        let mut stream = BitBuffer::new();
        let mut blob = basic_descriptor_blob();
        blob.extend(temporal_delimiter());
        stream.push(&blob);

        let mut acc = DescriptorAccumulator::new();
        let set = acc.poll(&mut stream).unwrap().expect("should seal");
        assert_eq!(set.mix_presentations.len(), 1);
        assert_eq!(set.codec_configs.len(), 1);
        // Stream should be rewound to the start of the temporal delimiter.
        assert_eq!(stream.bits_remaining(), (temporal_delimiter().len() as u64) * 8);
    }

    #[test]
    fn truncated_blob_is_invalid_in_exhaustive_mode() {
        let mut blob = basic_descriptor_blob();
        blob.pop();
        let mut stream = BitBuffer::new();
        stream.push(&blob);
        let acc = DescriptorAccumulator::new();
        let err = acc.finalize_exhaustive(&mut stream).unwrap_err();
        assert!(matches!(err, IamfError::InvalidDescriptors(_)));
    }

    #[test]
    fn exhaustive_mode_accepts_exact_blob() {
        let blob = basic_descriptor_blob();
        let mut stream = BitBuffer::new();
        stream.push(&blob);
        let acc = DescriptorAccumulator::new();
        let set = acc.finalize_exhaustive(&mut stream).unwrap();
        assert_eq!(set.raw_bytes, blob);
    }

    #[test]
    fn exhaustive_mode_rejects_trailing_bytes() {
        let mut blob = basic_descriptor_blob();
        blob.extend(temporal_delimiter());
        let mut stream = BitBuffer::new();
        stream.push(&blob);
        let acc = DescriptorAccumulator::new();
        let err = acc.finalize_exhaustive(&mut stream).unwrap_err();
        assert!(matches!(err, IamfError::InvalidDescriptors(_)));
    }

    #[test]
    fn mix_presentation_referencing_unknown_audio_element_is_invalid() {
        let mut out = sequence_header(1);
        out.extend(codec_config(7, 0, 48_000, 8, 16));
        out.extend(audio_element_channels(4, 7, 0, &[18]));
        out.extend(mix_presentation(3, 1, &[99], &[0]));
        out.extend(temporal_delimiter());

        let mut stream = BitBuffer::new();
        stream.push(&out);
        let mut acc = DescriptorAccumulator::new();
        let err = acc.poll(&mut stream).unwrap_err();
        assert!(matches!(err, IamfError::InvalidDescriptors(_)));
    }

    #[test]
    fn duplicate_codec_config_id_is_invalid() {
        let mut out = sequence_header(1);
        out.extend(codec_config(7, 0, 48_000, 8, 16));
        out.extend(codec_config(7, 0, 48_000, 8, 16));
        let mut stream = BitBuffer::new();
        stream.push(&out);
        let mut acc = DescriptorAccumulator::new();
        let err = acc.poll(&mut stream).unwrap_err();
        assert!(matches!(err, IamfError::InvalidDescriptors(_)));
    }
}
