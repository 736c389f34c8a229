// iamf-core
// Copyright (c) 2026 The iamf-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mix presentation and layout selection.
//!
//! Resolves the caller's [`RequestedMix`] against a sealed descriptor set's
//! mix presentations into a concrete [`SelectedMix`], with a deterministic
//! fallback chain so selection never fails as long as at least one mix
//! presentation with at least one layout exists (guaranteed by
//! `DescriptorAccumulator::seal`).

use std::collections::BTreeSet;

use crate::descriptor::{DescriptorSet, ProfileVersion};
use crate::layout::{Layout, SoundSystem};

/// What the caller asked for (`Settings`). Every field is
/// optional or empty-means-unconstrained: an absent/empty value widens the
/// candidate pool rather than narrowing it.
#[derive(Debug, Clone, Default)]
pub struct RequestedMix {
    pub mix_presentation_id: Option<u32>,
    pub layout: Option<Layout>,
    /// Acceptable profile versions. Empty means any profile is acceptable.
    pub profiles: BTreeSet<ProfileVersion>,
}

/// The resolved outcome of selection: a mix presentation id and the layout
/// within it that will be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedMix {
    pub mix_presentation_id: u32,
    pub layout: Layout,
}

/// Resolve `requested` against `descriptors.mix_presentations`.
///
/// Steps, applied in order:
/// 1. If `requested.profiles` is non-empty, keep only mix presentations
///    whose declared profile is a member. If this
///    would empty the set, the filter is dropped (treated as unset) rather
///    than failing — an unsatisfiable profile constraint degrades to "any
///    profile" instead of leaving selection with no candidates at all.
/// 2. If `requested.mix_presentation_id` is set and names a surviving mix
///    presentation, narrow to it; otherwise narrow to the first survivor
///    (descriptor order). Either way exactly one mix presentation is chosen
///    here — steps 3–5 only ever look within it.
/// 3. If `requested.layout` is set and the chosen mix presentation has a
///    matching layout, select that exact layout.
/// 4. Otherwise, look for [`SoundSystem::A`] (stereo) in the chosen mix
///    presentation and use it.
/// 5. Otherwise, use the chosen mix presentation's first layout.
pub fn select(descriptors: &DescriptorSet, requested: &RequestedMix) -> SelectedMix {
    let mut candidates: Vec<&crate::descriptor::MixPresentation> =
        descriptors.mix_presentations.iter().collect();
    debug_assert!(!candidates.is_empty(), "sealed descriptor sets always have a mix presentation");

    if !requested.profiles.is_empty() {
        let filtered: Vec<_> =
            candidates.iter().copied().filter(|m| requested.profiles.contains(&m.profile)).collect();
        if !filtered.is_empty() {
            candidates = filtered;
        }
    }

    let mix = match requested.mix_presentation_id.and_then(|id| candidates.iter().copied().find(|m| m.id == id)) {
        Some(found) => found,
        None => candidates[0],
    };

    if let Some(wanted_layout) = requested.layout {
        if let Some(found) = mix.layouts.iter().find(|l| l.layout == wanted_layout) {
            log::trace!("mix selection: exact layout match on mix {}", mix.id);
            return SelectedMix { mix_presentation_id: mix.id, layout: found.layout };
        }
    }

    if let Some(found) = mix.layouts.iter().find(|l| l.layout == Layout::SoundSystem(SoundSystem::A)) {
        log::trace!("mix selection: falling back to SoundSystem::A on mix {}", mix.id);
        return SelectedMix { mix_presentation_id: mix.id, layout: found.layout };
    }

    let layout = mix.layouts[0].layout;
    log::trace!("mix selection: falling back to first layout of mix {}", mix.id);
    SelectedMix { mix_presentation_id: mix.id, layout }
}
