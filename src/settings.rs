// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoder-wide configuration.

use crate::mix_select::RequestedMix;
use crate::reorder::ChannelOrdering;
use crate::serialize::OutputSampleType;

/// Configuration supplied at decoder construction time, and partially
/// adjustable afterwards (see `Decoder::configure_output_sample_type` and
/// `Decoder::reset_with_new_mix`).
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Which mix presentation and layout to render. Re-resolved against the
    /// descriptor set as soon as it seals.
    pub requested_mix: RequestedMix,
    /// Output channel ordering convention applied after rendering.
    pub channel_ordering: ChannelOrdering,
    /// Output PCM sample format. Defaults to 32-bit little-endian;
    /// changeable at runtime via `Decoder::configure_output_sample_type`.
    pub output_sample_type: OutputSampleType,
}
