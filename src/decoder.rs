// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The public decoder facade: a two-phase push-based state machine wrapping
//! [`BitBuffer`], [`DescriptorAccumulator`], [`TemporalUnitAssembler`] and
//! [`RenderPipelineAdapter`].

use crate::descriptor::{DescriptorAccumulator, DescriptorSet};
use crate::errors::{IamfError, Result};
use crate::io::BitBuffer;
use crate::layout::Layout;
use crate::mix_select::{self, RequestedMix, SelectedMix};
use crate::render::{PassthroughRenderer, Renderer, RenderPipelineAdapter, SubstreamDecoderFactory};
use crate::render::LpcmSubstreamDecoderFactory;
use crate::reorder::{self, ChannelOrdering};
use crate::serialize::{self, OutputSampleType};
use crate::settings::Settings;

/// The decoder's coarse lifecycle phase. Orthogonal to this is whether a
/// rendered frame is currently buffered, tracked separately so a caller can
/// keep pushing descriptor/temporal-unit bytes even while a previous frame
/// awaits collection via [`Decoder::get_output_temporal_unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AcceptingDescriptors,
    AcceptingTemporalUnits,
    EndOfStreamRequested,
    Drained,
}

/// Iteratively decodes an IAMF bitstream, pushed in arbitrarily-sized
/// chunks, into rendered PCM frames.
///
/// Usage sketch:
/// ```ignore
/// let mut decoder = Decoder::create(Settings::default());
/// loop {
///     decoder.decode(&next_chunk)?;
///     while decoder.is_temporal_unit_available() {
///         let n = decoder.get_output_temporal_unit(&mut out)?;
///         // consume out[..n]
///     }
///     if end_of_input { decoder.signal_end_of_stream()?; break; }
/// }
/// ```
pub struct Decoder {
    stream: BitBuffer,
    state: State,
    descriptor_acc: Option<DescriptorAccumulator>,
    descriptors: Option<DescriptorSet>,
    selected_mix: Option<SelectedMix>,
    assembler: Option<crate::temporal_unit::TemporalUnitAssembler>,
    pipeline: Option<RenderPipelineAdapter>,
    pending_frame: Option<crate::render::RenderedFrame>,
    settings: Settings,
    factory: Box<dyn SubstreamDecoderFactory>,
    renderer_factory: Box<dyn Fn() -> Box<dyn Renderer>>,
    /// Whether this instance was built via [`Decoder::create_from_descriptors`].
    /// `reset`/`reset_with_new_mix` are only defined for descriptor-mode
    /// instances.
    created_from_descriptors: bool,
}

impl Decoder {
    /// Construct a decoder using the bundled reference substream decoder
    /// (LPCM only) and reference renderer. Neither is production quality —
    /// real codecs and a real spatial renderer are external collaborators,
    /// wired in via [`Decoder::create_with_collaborators`].
    pub fn create(settings: Settings) -> Self {
        Self::create_with_collaborators(
            settings,
            Box::new(LpcmSubstreamDecoderFactory),
            Box::new(|| Box::new(PassthroughRenderer) as Box<dyn Renderer>),
        )
    }

    /// Construct a decoder with custom substream decoder and renderer
    /// collaborators.
    pub fn create_with_collaborators(
        settings: Settings,
        factory: Box<dyn SubstreamDecoderFactory>,
        renderer_factory: Box<dyn Fn() -> Box<dyn Renderer>>,
    ) -> Self {
        log::debug!("iamf decoder created, awaiting descriptors");
        Decoder {
            stream: BitBuffer::new(),
            state: State::AcceptingDescriptors,
            descriptor_acc: Some(DescriptorAccumulator::new()),
            descriptors: None,
            selected_mix: None,
            assembler: None,
            pipeline: None,
            pending_frame: None,
            settings,
            factory,
            renderer_factory,
            created_from_descriptors: false,
        }
    }

    /// Construct a decoder from a complete, self-contained descriptor blob
    /// (the exhaustive-mode entry point). Fails if `descriptor_bytes` doesn't
    /// parse to exactly one complete descriptor set with nothing left over.
    pub fn create_from_descriptors(descriptor_bytes: &[u8], settings: Settings) -> Result<Self> {
        Self::create_from_descriptors_with_collaborators(
            descriptor_bytes,
            settings,
            Box::new(LpcmSubstreamDecoderFactory),
            Box::new(|| Box::new(PassthroughRenderer) as Box<dyn Renderer>),
        )
    }

    pub fn create_from_descriptors_with_collaborators(
        descriptor_bytes: &[u8],
        settings: Settings,
        factory: Box<dyn SubstreamDecoderFactory>,
        renderer_factory: Box<dyn Fn() -> Box<dyn Renderer>>,
    ) -> Result<Self> {
        let mut probe = BitBuffer::new();
        probe.push(descriptor_bytes);
        let descriptors = DescriptorAccumulator::new().finalize_exhaustive(&mut probe)?;

        let mut decoder = Decoder {
            stream: BitBuffer::new(),
            state: State::AcceptingTemporalUnits,
            descriptor_acc: None,
            descriptors: None,
            selected_mix: None,
            assembler: None,
            pipeline: None,
            pending_frame: None,
            settings,
            factory,
            renderer_factory,
            created_from_descriptors: true,
        };
        decoder.seal_descriptors(descriptors)?;
        Ok(decoder)
    }

    fn seal_descriptors(&mut self, descriptors: DescriptorSet) -> Result<()> {
        let selected = mix_select::select(&descriptors, &self.settings.requested_mix);
        let pipeline =
            RenderPipelineAdapter::new(&descriptors, self.factory.as_ref(), (self.renderer_factory)())?;
        let assembler = crate::temporal_unit::TemporalUnitAssembler::new(&descriptors);

        log::debug!(
            "descriptor set sealed: selected mix {} / layout {:?}",
            selected.mix_presentation_id,
            selected.layout
        );

        self.descriptors = Some(descriptors);
        self.selected_mix = Some(selected);
        self.pipeline = Some(pipeline);
        self.assembler = Some(assembler);
        self.state = State::AcceptingTemporalUnits;
        Ok(())
    }

    /// Push the next chunk of bitstream bytes and let the decoder make as
    /// much progress as it can.
    ///
    /// While still accepting descriptors, one call to `decode` either seals
    /// the descriptor set or returns having consumed nothing further — it
    /// never also pulls a temporal unit in the same call that seals the
    /// descriptors, so callers can rely on `is_descriptor_processing_complete`
    /// having a stable answer immediately after the call that flips it, with
    /// a chance to inspect sample rate, layout, and channel count before any
    /// output buffer needs to be sized.
    ///
    /// While accepting temporal units, at most one frame is buffered at a
    /// time: if a frame is already pending, `decode` only buffers `bytes`
    /// and does not attempt to assemble another until the pending frame is
    /// collected via [`Decoder::get_output_temporal_unit`].
    pub fn decode(&mut self, bytes: &[u8]) -> Result<()> {
        match self.state {
            State::EndOfStreamRequested | State::Drained => return Err(IamfError::DecodeAfterEos),
            State::AcceptingDescriptors | State::AcceptingTemporalUnits => {}
        }

        self.stream.push(bytes);

        if self.state == State::AcceptingDescriptors {
            let acc = self.descriptor_acc.as_mut().expect("accumulator present while AcceptingDescriptors");
            let sealed = acc.poll(&mut self.stream)?;
            // Reclaim whatever descriptor bytes were fully consumed this
            // call, whether or not the set sealed just now.
            self.reclaim_consumed_bytes();
            if let Some(descriptors) = sealed {
                self.descriptor_acc = None;
                self.seal_descriptors(descriptors)?;
            }
            return Ok(());
        }

        if self.pending_frame.is_none() {
            self.try_pull_and_render()?;
        }
        Ok(())
    }

    fn try_pull_and_render(&mut self) -> Result<()> {
        let assembler = self.assembler.as_mut().expect("assembler present once descriptors are sealed");
        let Some(unit) = assembler.pull(&mut self.stream)? else {
            self.reclaim_consumed_bytes();
            return Ok(());
        };
        let result = self.render_pending(unit);
        // Reclaim after each temporal unit is pulled, the second of the two
        // deterministic bit-buffer shrink points.
        self.reclaim_consumed_bytes();
        result
    }

    /// Discard whatever leading region of the bit-buffer has already been
    /// read, rebasing the cursor to zero. The cursor is always byte-aligned
    /// here: every OBU-level read this crate performs is byte-aligned.
    fn reclaim_consumed_bytes(&mut self) {
        let consumed = (self.stream.tell() / 8) as usize;
        if consumed > 0 {
            self.stream.flush(consumed);
        }
    }

    fn render_pending(&mut self, unit: crate::temporal_unit::TemporalUnit) -> Result<()> {
        let descriptors = self.descriptors.as_ref().expect("sealed");
        let selected = self.selected_mix.as_ref().expect("sealed");
        let frame_size = descriptors
            .codec_configs
            .values()
            .next()
            .map(|c| c.frame_size as usize)
            .unwrap_or(0);
        let pipeline = self.pipeline.as_mut().expect("sealed");
        let frame = pipeline.render_unit(descriptors, &unit, selected, frame_size)?;
        self.pending_frame = Some(frame);
        Ok(())
    }

    /// True once the descriptor set has sealed and [`Decoder::descriptor_set`]
    /// / [`Decoder::selected_mix`] can be called.
    pub fn is_descriptor_processing_complete(&self) -> bool {
        self.descriptors.is_some()
    }

    /// True if a rendered frame is ready to be collected.
    pub fn is_temporal_unit_available(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// Sealed descriptor set, if ready.
    pub fn descriptor_set(&self) -> Result<&DescriptorSet> {
        self.descriptors.as_ref().ok_or(IamfError::DescriptorsNotReady)
    }

    /// Currently-selected mix presentation and layout, if ready.
    pub fn selected_mix(&self) -> Result<&SelectedMix> {
        self.selected_mix.as_ref().ok_or(IamfError::DescriptorsNotReady)
    }

    /// The resolved output sound system.
    pub fn get_output_layout(&self) -> Result<crate::layout::SoundSystem> {
        match self.selected_mix()?.layout {
            Layout::SoundSystem(system) => Ok(system),
            Layout::ReservedOrBinaural(_) => {
                Err(IamfError::Unsupported("selected layout is a reserved/binaural layout"))
            }
        }
    }

    /// The id of the currently-selected mix presentation.
    pub fn get_output_mix(&self) -> Result<u32> {
        Ok(self.selected_mix()?.mix_presentation_id)
    }

    /// Sample rate shared by every codec config in the descriptor set.
    pub fn get_sample_rate(&self) -> Result<u32> {
        let descriptors = self.descriptor_set()?;
        descriptors
            .codec_configs
            .values()
            .next()
            .map(|c| c.sample_rate)
            .ok_or(IamfError::Internal("sealed descriptor set has no codec configs"))
    }

    /// Samples per channel per temporal unit.
    pub fn get_frame_size(&self) -> Result<usize> {
        let descriptors = self.descriptor_set()?;
        descriptors
            .codec_configs
            .values()
            .next()
            .map(|c| c.frame_size as usize)
            .ok_or(IamfError::Internal("sealed descriptor set has no codec configs"))
    }

    /// Channel count of the resolved output layout.
    pub fn get_number_of_output_channels(&self) -> Result<usize> {
        Ok(self.get_output_layout()?.channel_count())
    }

    /// The PCM sample format `get_output_temporal_unit` currently writes.
    pub fn get_output_sample_type(&self) -> Result<OutputSampleType> {
        self.descriptor_set()?;
        Ok(self.settings.output_sample_type)
    }

    /// Change the output PCM sample format. Takes effect on the next
    /// [`Decoder::get_output_temporal_unit`] call.
    pub fn configure_output_sample_type(&mut self, sample_type: OutputSampleType) {
        self.settings.output_sample_type = sample_type;
    }

    /// Serialise the pending rendered frame into `out`, applying the
    /// configured channel ordering and output sample type.
    ///
    /// Returns the number of bytes written. If `out` is too small the
    /// pending frame is retained and [`IamfError::BufferTooSmall`] is
    /// returned — the caller may retry with a larger buffer without losing
    /// data.
    ///
    /// After a successful write, speculatively attempts to pull the next
    /// temporal unit from whatever bytes are already buffered, so
    /// [`Decoder::is_temporal_unit_available`] may flip back to true
    /// immediately rather than only after the next [`Decoder::decode`] call.
    pub fn get_output_temporal_unit(&mut self, out: &mut [u8]) -> Result<usize> {
        let Some(frame) = self.pending_frame.as_ref() else {
            return Err(IamfError::Internal(
                "get_output_temporal_unit called with no pending frame; check is_temporal_unit_available",
            ));
        };

        let system = self.selected_mix.as_ref().and_then(|m| match m.layout {
            Layout::SoundSystem(s) => Some(s),
            Layout::ReservedOrBinaural(_) => None,
        });
        let matrix = reordered_matrix(&frame.channels, system, self.settings.channel_ordering);

        let written = serialize::write_frame(&matrix, self.settings.output_sample_type, out)?;

        self.pending_frame = None;
        match self.state {
            State::EndOfStreamRequested => self.state = State::Drained,
            State::AcceptingTemporalUnits => self.try_pull_and_render()?,
            State::AcceptingDescriptors | State::Drained => {}
        }
        Ok(written)
    }

    /// Signal that no further bytes will be pushed. Flushes a final partial
    /// temporal unit if one was in flight. After this call, [`Decoder::decode`]
    /// returns [`IamfError::DecodeAfterEos`]; any already-pending or
    /// just-flushed frame can still be collected normally.
    pub fn signal_end_of_stream(&mut self) -> Result<()> {
        if self.descriptors.is_none() {
            return Err(IamfError::InvalidDescriptors(
                "end of stream reached before the descriptor set was sealed",
            ));
        }

        if self.pending_frame.is_none() {
            if let Some(assembler) = self.assembler.as_mut() {
                if let Some(unit) = assembler.finalize_partial() {
                    self.render_pending(unit)?;
                }
            }
        }

        self.state = if self.pending_frame.is_some() { State::EndOfStreamRequested } else { State::Drained };
        log::debug!("end of stream signalled, pending_frame={}", self.pending_frame.is_some());
        Ok(())
    }

    /// Re-initialise temporal unit processing (fresh substream decoder
    /// state, no buffered partial unit) without re-feeding the descriptor
    /// set, which stays sealed. Keeps the current mix selection.
    ///
    /// Only defined for instances created via
    /// [`Decoder::create_from_descriptors`]; a pure-streaming instance has no
    /// snapshotted descriptor bytes to re-seal from and returns
    /// [`IamfError::Unsupported`].
    pub fn reset(&mut self) -> Result<()> {
        self.require_descriptor_mode()?;
        self.reset_temporal_state()
    }

    /// Like [`Decoder::reset`], but also re-resolves mix selection against
    /// `requested` before resuming. Descriptor-mode only, see
    /// [`Decoder::reset`].
    pub fn reset_with_new_mix(&mut self, requested: RequestedMix) -> Result<()> {
        self.require_descriptor_mode()?;
        let descriptors = self.descriptors.as_ref().ok_or(IamfError::DescriptorsNotReady)?;
        self.selected_mix = Some(mix_select::select(descriptors, &requested));
        self.settings.requested_mix = requested;
        self.reset_temporal_state()
    }

    fn require_descriptor_mode(&self) -> Result<()> {
        if self.created_from_descriptors {
            Ok(())
        } else {
            Err(IamfError::Unsupported(
                "reset is only available on decoders created via create_from_descriptors",
            ))
        }
    }

    fn reset_temporal_state(&mut self) -> Result<()> {
        let descriptors = self.descriptors.as_ref().ok_or(IamfError::DescriptorsNotReady)?;
        self.pipeline =
            Some(RenderPipelineAdapter::new(descriptors, self.factory.as_ref(), (self.renderer_factory)())?);
        self.assembler = Some(crate::temporal_unit::TemporalUnitAssembler::new(descriptors));
        self.stream = BitBuffer::new();
        self.pending_frame = None;
        self.state = State::AcceptingTemporalUnits;
        log::debug!("decoder reset, resuming temporal unit processing");
        Ok(())
    }
}

fn reordered_matrix(
    channels: &[Vec<f32>],
    system: Option<crate::layout::SoundSystem>,
    scheme: ChannelOrdering,
) -> Vec<Vec<f32>> {
    let mut indices: Vec<usize> = (0..channels.len()).collect();
    if let Some(system) = system {
        if indices.len() == system.channel_count() {
            reorder::reorder(&mut indices, system, scheme);
        }
    }
    indices.into_iter().map(|i| channels[i].clone()).collect()
}
