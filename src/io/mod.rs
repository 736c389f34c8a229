// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Composable bit-level I/O over a caller-pushed byte stream.
//!
//! [`BitBuffer`] is push-based rather than wrapping a blocking
//! [`std::io::Read`] source: the caller feeds byte chunks as they arrive and
//! every read is all-or-nothing with respect to the cursor, so a higher layer
//! can probe a potentially-truncated OBU and retry once more bytes arrive
//! without having lost its place.

mod bitbuffer;

pub use bitbuffer::BitBuffer;
