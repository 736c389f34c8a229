// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loudspeaker layouts: the fourteen [`SoundSystem`] values from ITU-R
//! BS.2051 (systems A through J) plus the four IAMF-specific extensions, and
//! the [`Layout`] sum type that wraps them for the public boundary.

/// A standard loudspeaker configuration, fixing a channel count and a
/// canonical IAMF channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundSystem {
    /// 0+2+0 — stereo.
    A,
    /// 0+5+1 — 5.1.
    B,
    /// 2+5+1 — 5.1.2.
    C,
    /// 4+5+1 — 5.1.4.
    D,
    /// 4+5+1 (IAMF's distinct "E" assignment of the same speaker count with a
    /// different canonical ordering, per ITU-R BS.2051 System E).
    E,
    /// 3+7+0 — 11 channels, 3 height speakers over a 7-channel bed.
    F,
    /// 4+9+0 — 14 channels.
    G,
    /// 9+10+3 — 24 channels, the largest system in the family.
    H,
    /// 0+7+0 — the 8-channel professional 7.1 bed.
    I,
    /// 4+7+0 — 7.1 plus 4 height channels.
    J,
    /// IAMF extension 10: 2+7+0 — 7.1 plus 2 height channels.
    Ext10,
    /// IAMF extension 11.
    Ext11,
    /// IAMF extension 12.
    Ext12,
    /// IAMF extension 13.
    Ext13,
}

impl SoundSystem {
    /// Number of output channels for this system.
    pub fn channel_count(self) -> usize {
        match self {
            SoundSystem::A => 2,
            SoundSystem::B => 6,
            SoundSystem::C => 8,
            SoundSystem::D => 10,
            SoundSystem::E => 10,
            SoundSystem::F => 11,
            SoundSystem::G => 14,
            SoundSystem::H => 24,
            SoundSystem::I => 8,
            SoundSystem::J => 12,
            SoundSystem::Ext10 => 10,
            SoundSystem::Ext11 => 8,
            SoundSystem::Ext12 => 10,
            SoundSystem::Ext13 => 12,
        }
    }

    /// Try to map a raw descriptor-level sound-system tag (as it would appear
    /// in a mix-presentation layout OBU field) onto a [`SoundSystem`].
    pub fn from_tag(tag: u8) -> Option<SoundSystem> {
        use SoundSystem::*;
        Some(match tag {
            0 => A,
            1 => B,
            2 => C,
            3 => D,
            4 => E,
            5 => F,
            6 => G,
            7 => H,
            8 => I,
            9 => J,
            10 => Ext10,
            11 => Ext11,
            12 => Ext12,
            13 => Ext13,
            _ => return None,
        })
    }
}

/// A reproduction layout. Only [`Layout::SoundSystem`] crosses the public
/// boundary; reserved/binaural tags are recognised during descriptor parsing
/// (so a stream that declares one doesn't fail to parse) but are rejected if
/// ever selected as the active output layout, since this core does not
/// implement binaural rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    SoundSystem(SoundSystem),
    ReservedOrBinaural(u8),
}

impl Layout {
    pub fn as_sound_system(self) -> Option<SoundSystem> {
        match self {
            Layout::SoundSystem(s) => Some(s),
            Layout::ReservedOrBinaural(_) => None,
        }
    }
}
