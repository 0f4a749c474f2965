// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Deciding when a track starts fading out.

use crate::decoder::TrackInfo;

/// Play time for tracks that specify neither a length nor a loop (2.5 minutes).
pub const DEFAULT_FADE_MS: u32 = 150_000;

/// How often the looping part of a track is played after the intro.
pub const LOOP_REPETITIONS: u32 = 2;

/// Compute the time in milliseconds at which the fade out of a track begins.
///
/// An explicit track length takes precedence. Otherwise, a looping track plays
/// its intro followed by the loop twice. Tracks without either play for
/// [`DEFAULT_FADE_MS`], which bounds the render of files lacking metadata.
pub fn fade_ms(info: &TrackInfo) -> u32 {
    if info.length > 0 {
        info.length
    } else if info.loop_length > 0 {
        info.intro_length
            .saturating_add(info.loop_length.saturating_mul(LOOP_REPETITIONS))
    } else {
        DEFAULT_FADE_MS
    }
}
