// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The interface to the emulation core that turns music files into samples.
//!
//! Decoding the various console formats is not done here. A [`Backend`] knows how
//! to load files, and the resulting [`Decoder`] handle is driven by the rest of
//! the crate through a small set of calls (mute, start, play, seek and queries).
//!
//! A decoder carries mutable playback state (mute mask, position, fade), so only one
//! render may use it at a time. All mutating calls take `&mut self` for that reason.

#[cfg(test)]
pub mod fake;
#[cfg(feature = "gme")]
pub mod gme;

use std::path::Path;

use snafu::Snafu;

/// Errors reported by the emulation core itself.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum DecoderError {
    #[snafu(display("Emulator error: {}", message))]
    Emulator { message: String },
    #[snafu(display("Track {} does not exist", track))]
    NoSuchTrack { track: usize },
    #[snafu(display("Out of memory"))]
    OutOfMemory,
}

/// Metadata snapshot of a single track.
///
/// All durations are in milliseconds. A value of zero means that the file did
/// not specify the respective duration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub game: String,
    pub song: String,
    pub author: String,
    pub length: u32,
    pub intro_length: u32,
    pub loop_length: u32,
}

/// A voice of a loaded music file that can be rendered in isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDescriptor {
    pub index: usize,
    pub name: String,
}

/// Loads music files into decoder handles.
pub trait Backend {
    type Decoder: Decoder;

    /// Determine the console system a file was made for.
    ///
    /// Returns `Ok(None)` if the file type is not known to the backend.
    fn identify(&self, path: &Path) -> Result<Option<String>, DecoderError>;

    /// Load a file, producing interleaved stereo samples at the given rate.
    fn open(&self, path: &Path, sample_rate: u32) -> Result<Self::Decoder, DecoderError>;
}

/// A loaded music file and its synthesis state.
pub trait Decoder {
    fn track_count(&self) -> usize;

    /// Number of independently mutable voices. Zero if the format does not support muting.
    fn voice_count(&self) -> usize;

    fn voice_name(&self, voice: usize) -> String;

    fn track_info(&self, track: usize) -> Result<TrackInfo, DecoderError>;

    /// Mute or unmute a voice. The setting persists across track starts.
    fn mute_voice(&mut self, voice: usize, muted: bool);

    /// Start playing a track from the beginning.
    fn start_track(&mut self, track: usize) -> Result<(), DecoderError>;

    /// Fade out the current track, starting at the given time.
    ///
    /// Must be called after [`Decoder::start_track`], which resets the fade.
    fn set_fade(&mut self, fade_ms: u32);

    /// Fill the buffer with interleaved stereo samples of the current track.
    fn play(&mut self, buffer: &mut [i16]) -> Result<(), DecoderError>;

    /// Whether the current track has faded out completely.
    fn track_ended(&self) -> bool;

    fn seek(&mut self, position_ms: u32) -> Result<(), DecoderError>;

    /// Disable the automatic end of track detection after a period of silence.
    fn ignore_silence(&mut self, ignore: bool);
}

/// Enumerate the voices of a decoder together with their names.
pub fn voices<D: Decoder + ?Sized>(decoder: &D) -> Vec<VoiceDescriptor> {
    (0..decoder.voice_count())
        .map(|index| VoiceDescriptor {
            index,
            name: decoder.voice_name(index),
        })
        .collect()
}
