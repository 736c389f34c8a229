// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `iamf-core`: the iterative streaming decoder core for the Immersive Audio
//! Model and Formats (IAMF) bitstream.
//!
//! Given a byte stream of self-delimiting OBUs (Open Bitstream Units), this
//! crate parses a leading descriptor block (codec configs, audio elements,
//! mix presentations), then incrementally parses temporal units, decodes
//! each substream, renders the result to a requested loudspeaker layout,
//! optionally reorders channels for a target convention, and yields
//! interleaved PCM one temporal unit at a time.
//!
//! The OBU-level codec decoders (beyond a bundled LPCM reference), the
//! spatial renderer, loudness measurement, WAV writing, and configuration
//! loading are explicitly out of scope for this crate; see [`render`] for
//! the collaborator traits an embedder implements to supply production
//! versions of those.
//!
//! ```ignore
//! use iamf_core::{Decoder, Settings};
//!
//! let mut decoder = Decoder::create(Settings::default());
//! decoder.decode(&chunk)?;
//! if decoder.is_descriptor_processing_complete() {
//!     let rate = decoder.get_sample_rate()?;
//! }
//! while decoder.is_temporal_unit_available() {
//!     let mut out = vec![0u8; decoder.get_number_of_output_channels()? * decoder.get_frame_size()? * 4];
//!     let n = decoder.get_output_temporal_unit(&mut out)?;
//!     consume(&out[..n]);
//! }
//! ```

pub mod descriptor;
pub mod errors;
pub mod io;
pub mod layout;
pub mod mix_select;
pub mod obu;
pub mod render;
pub mod reorder;
pub mod serialize;
pub mod settings;
pub mod temporal_unit;

mod decoder;

pub use decoder::Decoder;
pub use descriptor::{
    AudioElement, ChannelConfiguration, CodecConfig, CodecKind, DescriptorSet, MixPresentation,
    MixPresentationLayout, ProfileVersion,
};
pub use errors::{IamfError, Result};
pub use layout::{Layout, SoundSystem};
pub use mix_select::{RequestedMix, SelectedMix};
pub use reorder::ChannelOrdering;
pub use serialize::OutputSampleType;
pub use settings::Settings;
