// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rendering: the trait boundary to substream codecs and the spatial
//! renderer, plus one reference implementation of each so the crate is
//! useful standalone. Codec decoding beyond LPCM and spatial rendering are
//! explicitly out of scope for production use — [`LpcmSubstreamDecoder`] and
//! [`PassthroughRenderer`] exist to make the pipeline exercisable and
//! testable, not to be a mixing-quality renderer.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::descriptor::{ChannelConfiguration, CodecConfig, CodecKind, DescriptorSet};
use crate::errors::{IamfError, Result};
use crate::layout::{Layout, SoundSystem};
use crate::mix_select::SelectedMix;
use crate::temporal_unit::{ParameterBlock, TemporalUnit};

/// Decodes one substream's raw frame payload into deinterleaved float
/// samples. Implemented per codec; every codec but LPCM is out of scope for
/// this core, so only [`LpcmSubstreamDecoder`] ships here.
pub trait SubstreamDecoder {
    /// Decode one frame's payload. The returned vector holds
    /// `channel_count * frame_size` samples in the decoder's native channel
    /// order, interleaved by tick — distinct from the channel-major
    /// convention used once data reaches [`Renderer`].
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<f32>>;

    /// Number of channels this substream carries, fixed for the substream's
    /// lifetime.
    fn channel_count(&self) -> usize;
}

/// Constructs a [`SubstreamDecoder`] for a given codec configuration.
/// Implementations are registered per `CodecKind`.
pub trait SubstreamDecoderFactory {
    fn create(&self, config: &CodecConfig) -> Result<Box<dyn SubstreamDecoder>>;
}

/// One audio element's decoded channels, handed to the [`Renderer`] for one
/// temporal unit. `channels` is channel-major: `channels[i]` is channel `i`'s
/// samples for this frame, in the audio element's native channel order (no
/// reordering has been applied yet — see [`crate::reorder`]).
pub struct DecodedAudioElement<'a> {
    pub audio_element_id: u32,
    pub channel_configuration: ChannelConfiguration,
    pub channels: &'a [Vec<f32>],
}

/// The rendered output of one temporal unit: channel-major samples in the
/// selected layout's canonical channel order, ready for
/// [`crate::reorder::reorder`] and [`crate::serialize::write_frame`].
pub struct RenderedFrame {
    pub channels: Vec<Vec<f32>>,
}

/// Mixes decoded audio elements down to the selected output layout.
/// Implementations are free to ignore `parameter_blocks` entirely if they
/// don't implement dynamic mix parameters.
pub trait Renderer {
    fn render(
        &mut self,
        audio_elements: &[DecodedAudioElement<'_>],
        parameter_blocks: &[ParameterBlock],
        selected: &SelectedMix,
        frame_size: usize,
    ) -> Result<RenderedFrame>;
}

/// Reference LPCM decoder. Assumes one channel per substream (the common
/// case for simple IAMF streams); coupled multi-channel substreams are not
/// supported by this reference implementation.
pub struct LpcmSubstreamDecoder {
    bit_depth: u8,
}

/// Per-bit-depth dequantization scale (`2^(N-1) - 1`), indexed by bit depth.
/// Built once on first use rather than recomputed per sample.
static DEQUANTIZE_SCALES: Lazy<[f64; 65]> = Lazy::new(|| {
    let mut scales = [0.0f64; 65];
    for (bits, scale) in scales.iter_mut().enumerate().skip(1) {
        *scale = ((1i64 << (bits - 1)) - 1) as f64;
    }
    scales
});

impl LpcmSubstreamDecoder {
    fn bytes_per_sample(&self) -> usize {
        ((self.bit_depth as usize) + 7) / 8
    }

    fn dequantize(&self, raw: i64) -> f32 {
        let scale = DEQUANTIZE_SCALES[self.bit_depth as usize];
        (raw as f64 / scale) as f32
    }
}

impl SubstreamDecoder for LpcmSubstreamDecoder {
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<f32>> {
        let width = self.bytes_per_sample();
        if width == 0 || payload.len() % width != 0 {
            return Err(IamfError::CodecFailure {
                substream_id: 0,
                reason: "LPCM payload length is not a multiple of the sample width".into(),
            });
        }

        let mut out = Vec::with_capacity(payload.len() / width);
        for chunk in payload.chunks_exact(width) {
            let mut buf = [0u8; 8];
            buf[..width].copy_from_slice(chunk);
            // Sign-extend from `width` bytes into an i64.
            let shift = 64 - width * 8;
            let raw = (i64::from_le_bytes(buf) << shift) >> shift;
            out.push(self.dequantize(raw));
        }
        Ok(out)
    }

    fn channel_count(&self) -> usize {
        1
    }
}

/// Factory for [`LpcmSubstreamDecoder`]. Returns
/// [`IamfError::Unsupported`] for any other codec kind.
pub struct LpcmSubstreamDecoderFactory;

impl SubstreamDecoderFactory for LpcmSubstreamDecoderFactory {
    fn create(&self, config: &CodecConfig) -> Result<Box<dyn SubstreamDecoder>> {
        if config.codec_kind != CodecKind::Lpcm {
            return Err(IamfError::Unsupported(
                "only CodecKind::Lpcm has a bundled reference decoder",
            ));
        }
        let bit_depth = config.bit_depth.unwrap_or(16);
        if bit_depth == 0 || bit_depth > 64 {
            return Err(IamfError::Unsupported("LPCM bit depth must be in 1..=64"));
        }
        Ok(Box::new(LpcmSubstreamDecoder { bit_depth }))
    }
}

/// Reference renderer: channel-matching passthrough when the audio
/// element's declared layout already matches the selected output layout,
/// plus a simple first-order-ambisonics-to-stereo decode. Neither is
/// mixing-quality; both exist so the pipeline can be exercised end to end
/// without an external renderer.
#[derive(Default)]
pub struct PassthroughRenderer;

impl Renderer for PassthroughRenderer {
    fn render(
        &mut self,
        audio_elements: &[DecodedAudioElement<'_>],
        _parameter_blocks: &[ParameterBlock],
        selected: &SelectedMix,
        frame_size: usize,
    ) -> Result<RenderedFrame> {
        let target_channel_count = match selected.layout {
            Layout::SoundSystem(system) => system.channel_count(),
            Layout::ReservedOrBinaural(_) => {
                return Err(IamfError::Unsupported("binaural/reserved layouts are not rendered"));
            }
        };

        let mut mixed = vec![vec![0.0f32; frame_size]; target_channel_count];
        let mut any_contribution = false;

        for element in audio_elements {
            match element.channel_configuration {
                ChannelConfiguration::Channels(system) if system.channel_count() == target_channel_count => {
                    for (ch, samples) in element.channels.iter().enumerate().take(target_channel_count) {
                        for (tick, &s) in samples.iter().enumerate().take(frame_size) {
                            mixed[ch][tick] += s;
                        }
                    }
                    any_contribution = true;
                }
                ChannelConfiguration::Channels(_) => {
                    return Err(IamfError::Unsupported(
                        "channel-count mismatch between audio element and selected layout",
                    ));
                }
                ChannelConfiguration::Ambisonics { order } => {
                    if order != 1 || target_channel_count != 2 || element.channels.len() < 4 {
                        return Err(IamfError::Unsupported(
                            "only first-order ambisonics to stereo is supported",
                        ));
                    }
                    // ACN/SN3D ordering: W, Y, Z, X. Simple stereo decode
                    // using the W (omni) and Y (left-right) components.
                    const GAIN: f32 = std::f32::consts::FRAC_1_SQRT_2;
                    let w = &element.channels[0];
                    let y = &element.channels[1];
                    for tick in 0..frame_size {
                        mixed[0][tick] += GAIN * (w[tick] + y[tick]);
                        mixed[1][tick] += GAIN * (w[tick] - y[tick]);
                    }
                    any_contribution = true;
                }
            }
        }

        if !any_contribution {
            return Err(IamfError::Unsupported("no audio element could be rendered to the selected layout"));
        }

        Ok(RenderedFrame { channels: mixed })
    }
}

/// Wires substream decoders and a renderer together to turn a
/// [`TemporalUnit`] into a [`RenderedFrame`] for a given descriptor set.
pub struct RenderPipelineAdapter {
    substream_decoders: BTreeMap<u32, Box<dyn SubstreamDecoder>>,
    renderer: Box<dyn Renderer>,
}

impl RenderPipelineAdapter {
    pub fn new(
        descriptors: &DescriptorSet,
        factory: &dyn SubstreamDecoderFactory,
        renderer: Box<dyn Renderer>,
    ) -> Result<Self> {
        let mut substream_decoders = BTreeMap::new();

        for element in descriptors.audio_elements.values() {
            let config = descriptors
                .codec_configs
                .get(&element.codec_config_id)
                .ok_or(IamfError::Internal("audio element references a missing codec config"))?;
            for &substream_id in &element.substream_ids {
                let decoder = factory.create(config)?;
                substream_decoders.insert(substream_id, decoder);
            }
        }

        Ok(RenderPipelineAdapter { substream_decoders, renderer })
    }

    pub fn render_unit(
        &mut self,
        descriptors: &DescriptorSet,
        unit: &TemporalUnit,
        selected: &SelectedMix,
        frame_size: usize,
    ) -> Result<RenderedFrame> {
        let mut decoded_by_element: Vec<(u32, ChannelConfiguration, Vec<Vec<f32>>)> = Vec::new();

        for element in descriptors.audio_elements.values() {
            let mut channels = Vec::with_capacity(element.substream_ids.len());
            for &substream_id in &element.substream_ids {
                let payload = unit.substream_payloads.get(&substream_id).ok_or_else(|| {
                    IamfError::CorruptTemporalUnit("temporal unit is missing a substream this audio element requires")
                })?;
                let decoder = self
                    .substream_decoders
                    .get_mut(&substream_id)
                    .ok_or(IamfError::Internal("no decoder registered for substream"))?;
                let samples = decoder.decode(payload).map_err(|e| match e {
                    IamfError::CodecFailure { reason, .. } => {
                        IamfError::CodecFailure { substream_id, reason }
                    }
                    other => other,
                })?;
                channels.push(samples);
            }
            decoded_by_element.push((element.id, element.channel_configuration, channels));
        }

        let decoded: Vec<DecodedAudioElement<'_>> = decoded_by_element
            .iter()
            .map(|(id, config, channels)| DecodedAudioElement {
                audio_element_id: *id,
                channel_configuration: *config,
                channels,
            })
            .collect();

        self.renderer.render(&decoded, &unit.parameter_blocks, selected, frame_size)
    }
}
