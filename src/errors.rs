// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crate-wide error taxonomy.
//!
//! A single flat enum plus a handful of convenience constructors.
//! `InsufficientData` is `pub(crate)` only — it is an internal control-flow
//! signal, never a fatal error, and the
//! decoder facade translates it to `Ok` at the public boundary.

use std::result;

use thiserror::Error;

/// All errors that can be returned by this crate's public API.
#[derive(Debug, Error)]
pub enum IamfError {
    /// A descriptor OBU (or the descriptor set as a whole) was malformed or
    /// semantically inconsistent. Fatal for the decoder instance.
    #[error("invalid descriptors: {0}")]
    InvalidDescriptors(&'static str),

    /// A descriptor OBU was encountered after the descriptor set was sealed.
    #[error("unexpected descriptor OBU after descriptor set was sealed")]
    UnexpectedDescriptor,

    /// A framed OBU violated structural rules once interpreted as part of a
    /// temporal unit. Fatal; the renderer's internal state is now
    /// indeterminate.
    #[error("corrupt temporal unit: {0}")]
    CorruptTemporalUnit(&'static str),

    /// An external substream decoder reported a failure.
    #[error("codec failure on substream {substream_id}: {reason}")]
    CodecFailure { substream_id: u32, reason: String },

    /// The caller's output buffer was too small to hold the pending frame. The
    /// pending frame is retained; the caller may retry with a larger buffer.
    #[error("buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall { required: usize, available: usize },

    /// A metadata query was made before the descriptor set was sealed.
    #[error("descriptors are not ready yet")]
    DescriptorsNotReady,

    /// `decode` was called after `signal_end_of_stream`.
    #[error("decode called after end of stream was signalled")]
    DecodeAfterEos,

    /// A codec or layout feature is recognised but not implemented by the
    /// bundled reference collaborators.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// Allocation failure or an internal invariant breach.
    #[error("internal error: {0}")]
    Internal(&'static str),

    /// Not enough bytes are currently buffered to complete the read or parse.
    /// Never surfaces across the public API.
    #[error("insufficient data")]
    InsufficientData,
}

pub type Result<T> = result::Result<T, IamfError>;

pub(crate) fn invalid_descriptors<T>(msg: &'static str) -> Result<T> {
    Err(IamfError::InvalidDescriptors(msg))
}

pub(crate) fn corrupt_temporal_unit<T>(msg: &'static str) -> Result<T> {
    Err(IamfError::CorruptTemporalUnit(msg))
}

pub(crate) fn insufficient_data<T>() -> Result<T> {
    Err(IamfError::InsufficientData)
}

impl IamfError {
    /// True if this error is the internal "need more bytes" signal.
    pub(crate) fn is_insufficient_data(&self) -> bool {
        matches!(self, IamfError::InsufficientData)
    }
}
