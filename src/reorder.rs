// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel reordering.
//!
//! Permutes a slice of per-channel sample views in place according to a
//! [`ChannelOrdering`] scheme and the resolved [`SoundSystem`]. No audio
//! samples are copied — only the outer slice of borrowed views is permuted.

use crate::layout::SoundSystem;

/// Caller-selectable channel ordering convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrdering {
    /// IAMF's native channel order. No reordering is performed.
    #[default]
    IamfDefault,
    /// Fixed permutation tables used to match the channel order Android's
    /// `AudioTrack` API expects for a given channel mask.
    AndroidConvention,
}

/// Look up the destination-index permutation table for `system` under the
/// Android channel ordering convention. Returns `None` for systems that use
/// the identity mapping. The returned slice's length never exceeds
/// `system.channel_count()`; indices at or beyond that count are identity by
/// construction and are never consulted.
fn android_permutation(system: SoundSystem) -> Option<&'static [usize]> {
    use SoundSystem::*;
    match system {
        A | B | C | D | E | Ext11 | Ext12 | Ext13 => None,
        I | J | Ext10 => Some(&[0, 1, 2, 3, 6, 7, 4, 5]),
        F => Some(&[1, 2, 0, 10, 7, 8, 5, 6, 9, 3, 4, 11]),
        G => Some(&[0, 1, 2, 3, 6, 7, 12, 13, 4, 5, 8, 9, 10, 11]),
        H => Some(&[
            0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 15, 12, 14, 13, 16, 20, 17, 18, 19, 22, 21, 23, 9,
        ]),
    }
}

/// Permute `channel_views` in place: after the call, `channel_views[i]` holds
/// whatever was at the source index that `scheme` maps to destination `i`.
///
/// `channel_views` must have exactly `system.channel_count()` elements. `T`
/// is expected to be a cheap, `Copy` handle (e.g. a borrowed channel slice
/// reference) — no audio sample data is copied, only these handles are
/// rearranged.
pub fn reorder<T: Copy>(channel_views: &mut [T], system: SoundSystem, scheme: ChannelOrdering) {
    debug_assert_eq!(channel_views.len(), system.channel_count());

    let table = match scheme {
        ChannelOrdering::IamfDefault => None,
        ChannelOrdering::AndroidConvention => android_permutation(system),
    };

    let Some(table) = table else { return };
    apply_permutation(channel_views, table);
}

/// Rearranges `slice` so that `slice[i]` becomes the old `slice[src_of[i]]`,
/// for every `i < src_of.len()`. Elements at indices `>= src_of.len()` are
/// left untouched (they are implicitly identity-mapped).
fn apply_permutation<T: Copy>(slice: &mut [T], src_of: &[usize]) {
    let original: Vec<T> = slice.to_vec();
    for (i, dst) in slice.iter_mut().enumerate() {
        let source_index = if i < src_of.len() { src_of[i] } else { i };
        *dst = original[source_index];
    }
}
