// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Scripted decoder for testing the rendering pipeline without an emulation core.
//!
//! Every sample produced by [`FakeDecoder`] is the sum of `index + 1` over all
//! audible voices, so the content of a rendered file shows which voices were muted.
//! All calls are recorded in a shared log for checking the order of operations.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use super::{Backend, Decoder, DecoderError, TrackInfo};

/// A recorded call to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Mute(usize, bool),
    Start(usize),
    Fade(u32),
    Play(usize),
    Seek(u32),
    IgnoreSilence(bool),
    Released,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

#[derive(Debug, Clone, Default)]
pub struct FakeTrack {
    pub info: TrackInfo,
    pub fails_to_start: bool,
    /// Number of buffers rendered successfully before `play` fails.
    pub fails_to_play_after: Option<usize>,
    pub fails_to_seek: bool,
}

impl FakeTrack {
    pub fn with_length(song: &str, length: u32) -> Self {
        Self {
            info: TrackInfo {
                song: song.to_string(),
                length,
                ..TrackInfo::default()
            },
            ..Self::default()
        }
    }
}

pub struct FakeDecoder {
    tracks: Vec<FakeTrack>,
    voice_names: Vec<String>,
    sample_rate: u32,
    muted: Vec<bool>,
    current: Option<usize>,
    fade_ms: Option<u32>,
    /// Playback position in frames.
    position: u64,
    /// Buffers rendered since the track was started.
    plays: usize,
    log: CallLog,
}

impl FakeDecoder {
    pub fn new(tracks: Vec<FakeTrack>, voice_names: &[&str], sample_rate: u32) -> Self {
        Self::with_log(tracks, voice_names, sample_rate, CallLog::default())
    }

    pub fn with_log(
        tracks: Vec<FakeTrack>,
        voice_names: &[&str],
        sample_rate: u32,
        log: CallLog,
    ) -> Self {
        Self {
            tracks,
            voice_names: voice_names.iter().map(|n| n.to_string()).collect(),
            sample_rate,
            muted: vec![false; voice_names.len()],
            current: None,
            fade_ms: None,
            position: 0,
            plays: 0,
            log,
        }
    }

    pub fn muted(&self) -> &[bool] {
        &self.muted
    }

    pub fn fade_ms(&self) -> Option<u32> {
        self.fade_ms
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    fn position_ms(&self) -> u64 {
        self.position * 1000 / u64::from(self.sample_rate)
    }
}

impl Decoder for FakeDecoder {
    fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn voice_count(&self) -> usize {
        self.voice_names.len()
    }

    fn voice_name(&self, voice: usize) -> String {
        self.voice_names[voice].clone()
    }

    fn track_info(&self, track: usize) -> Result<TrackInfo, DecoderError> {
        self.tracks
            .get(track)
            .map(|t| t.info.clone())
            .ok_or(DecoderError::NoSuchTrack { track })
    }

    fn mute_voice(&mut self, voice: usize, muted: bool) {
        self.record(Call::Mute(voice, muted));
        if let Some(m) = self.muted.get_mut(voice) {
            *m = muted;
        }
    }

    fn start_track(&mut self, track: usize) -> Result<(), DecoderError> {
        self.record(Call::Start(track));
        match self.tracks.get(track) {
            Some(t) if !t.fails_to_start => {
                self.current = Some(track);
                self.fade_ms = None;
                self.position = 0;
                self.plays = 0;
                Ok(())
            }
            Some(_) => Err(DecoderError::Emulator {
                message: "Emulation error (illegal instruction)".to_string(),
            }),
            None => Err(DecoderError::NoSuchTrack { track }),
        }
    }

    fn set_fade(&mut self, fade_ms: u32) {
        self.record(Call::Fade(fade_ms));
        self.fade_ms = Some(fade_ms);
    }

    fn play(&mut self, buffer: &mut [i16]) -> Result<(), DecoderError> {
        self.record(Call::Play(buffer.len()));
        let failing = self
            .current
            .and_then(|track| self.tracks[track].fails_to_play_after)
            .map_or(false, |after| self.plays >= after);
        if failing {
            return Err(DecoderError::Emulator {
                message: "Emulation error (illegal instruction)".to_string(),
            });
        }
        self.plays += 1;
        let value: i16 = if self.track_ended() {
            0
        } else {
            self.muted
                .iter()
                .enumerate()
                .filter(|(_, muted)| !**muted)
                .map(|(index, _)| index as i16 + 1)
                .sum()
        };
        buffer.iter_mut().for_each(|s| *s = value);
        self.position += buffer.len() as u64 / 2;
        Ok(())
    }

    fn track_ended(&self) -> bool {
        match (self.current, self.fade_ms) {
            (None, _) => true,
            (Some(_), Some(fade)) => self.position_ms() >= u64::from(fade),
            (Some(_), None) => false,
        }
    }

    fn seek(&mut self, position_ms: u32) -> Result<(), DecoderError> {
        self.record(Call::Seek(position_ms));
        if let Some(track) = self.current {
            if self.tracks[track].fails_to_seek {
                return Err(DecoderError::Emulator {
                    message: "Seek failed".to_string(),
                });
            }
        }
        self.position = u64::from(position_ms) * u64::from(self.sample_rate) / 1000;
        Ok(())
    }

    fn ignore_silence(&mut self, ignore: bool) {
        self.record(Call::IgnoreSilence(ignore));
    }
}

impl Drop for FakeDecoder {
    fn drop(&mut self) {
        self.record(Call::Released);
    }
}

/// How the [`FakeBackend`] treats a file name.
#[derive(Debug, Clone)]
pub enum FakeFile {
    /// A loadable file with the given tracks and voices.
    Music {
        tracks: Vec<FakeTrack>,
        voices: Vec<&'static str>,
    },
    /// A file that can be identified, but not loaded.
    Broken,
}

/// Backend recognizing files by name. Unknown names are reported as unsupported.
#[derive(Default)]
pub struct FakeBackend {
    files: HashMap<String, FakeFile>,
    pub log: CallLog,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, file: FakeFile) -> Self {
        self.files.insert(name.to_string(), file);
        self
    }

    fn lookup(&self, path: &Path) -> Option<&FakeFile> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| self.files.get(n))
    }
}

impl Backend for FakeBackend {
    type Decoder = FakeDecoder;

    fn identify(&self, path: &Path) -> Result<Option<String>, DecoderError> {
        Ok(self.lookup(path).map(|_| "Fake System".to_string()))
    }

    fn open(&self, path: &Path, sample_rate: u32) -> Result<FakeDecoder, DecoderError> {
        match self.lookup(path) {
            Some(FakeFile::Music { tracks, voices }) => Ok(FakeDecoder::with_log(
                tracks.clone(),
                voices,
                sample_rate,
                Rc::clone(&self.log),
            )),
            Some(FakeFile::Broken) => Err(DecoderError::OutOfMemory),
            None => Err(DecoderError::Emulator {
                message: "Wrong file type for this emulator".to_string(),
            }),
        }
    }
}
