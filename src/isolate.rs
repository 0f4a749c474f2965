// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Making a single voice of a track audible.

use log::debug;

use crate::decoder::{Decoder, DecoderError};
use crate::fade;

/// Mute all voices except `voice`, then start `track` with its fade applied.
///
/// The mute mask is set up before starting the track, so that the very first
/// rendered frame only contains the isolated voice.
///
/// Returns the fade time in milliseconds.
pub fn isolate_voice<D: Decoder + ?Sized>(
    decoder: &mut D,
    track: usize,
    voice: usize,
    voice_count: usize,
) -> Result<u32, DecoderError> {
    for other in 0..voice_count {
        decoder.mute_voice(other, true);
    }
    decoder.mute_voice(voice, false);

    decoder.start_track(track)?;

    // Starting a track resets the fade, so it is set again for every voice.
    let fade_ms = fade::fade_ms(&decoder.track_info(track)?);
    decoder.set_fade(fade_ms);
    debug!(
        "isolated voice {} of track {}, fading out after {} ms",
        voice, track, fade_ms
    );
    Ok(fade_ms)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decoder::fake::{Call, FakeDecoder, FakeTrack};

    fn decoder() -> FakeDecoder {
        FakeDecoder::new(
            vec![
                FakeTrack::with_length("Title", 3000),
                FakeTrack {
                    fails_to_start: true,
                    ..FakeTrack::default()
                },
            ],
            &["Pulse 1", "Pulse 2", "Triangle", "Noise"],
            44100,
        )
    }

    #[test]
    fn exactly_one_voice_audible() {
        let mut d = decoder();
        assert_eq!(isolate_voice(&mut d, 0, 2, 4), Ok(3000));
        assert_eq!(d.muted(), &[true, true, false, true]);
        assert_eq!(d.fade_ms(), Some(3000));
    }

    #[test]
    fn isolating_twice_is_idempotent() {
        let mut d = decoder();
        isolate_voice(&mut d, 0, 1, 4).unwrap();
        let first = d.muted().to_vec();
        isolate_voice(&mut d, 0, 1, 4).unwrap();
        assert_eq!(d.muted(), first.as_slice());
        assert_eq!(first, vec![true, false, true, true]);
    }

    #[test]
    fn switching_voices_unmutes_only_the_new_one() {
        let mut d = decoder();
        isolate_voice(&mut d, 0, 0, 4).unwrap();
        isolate_voice(&mut d, 0, 3, 4).unwrap();
        assert_eq!(d.muted(), &[true, true, true, false]);
    }

    #[test]
    fn mutes_before_starting() {
        let mut d = decoder();
        isolate_voice(&mut d, 0, 1, 4).unwrap();
        assert_eq!(
            d.calls(),
            vec![
                Call::Mute(0, true),
                Call::Mute(1, true),
                Call::Mute(2, true),
                Call::Mute(3, true),
                Call::Mute(1, false),
                Call::Start(0),
                Call::Fade(3000),
            ]
        );
    }

    #[test]
    fn start_failure_skips_fade() {
        let mut d = decoder();
        assert!(isolate_voice(&mut d, 1, 0, 4).is_err());
        assert_eq!(
            isolate_voice(&mut d, 7, 0, 4),
            Err(DecoderError::NoSuchTrack { track: 7 })
        );
        assert!(!d.calls().iter().any(|c| matches!(c, Call::Fade(_))));
    }
}
