// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Decoding backed by the Game_Music_Emu library (`libgme`).
//!
//! Supports everything the library supports: NSF, SPC, GBS, VGM, HES, KSS, AY, SAP and GYM.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use super::{Backend, Decoder, DecoderError, TrackInfo};

mod ffi {
    use std::os::raw::{c_char, c_int};

    pub type GmeErr = *const c_char;

    #[repr(C)]
    pub struct MusicEmu {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct GmeType {
        _private: [u8; 0],
    }

    #[repr(C)]
    #[allow(dead_code)]
    pub struct GmeInfo {
        pub length: c_int,
        pub intro_length: c_int,
        pub loop_length: c_int,
        pub play_length: c_int,
        _reserved_ints: [c_int; 12],
        pub system: *const c_char,
        pub game: *const c_char,
        pub song: *const c_char,
        pub author: *const c_char,
        pub copyright: *const c_char,
        pub comment: *const c_char,
        pub dumper: *const c_char,
        _reserved_strings: [*const c_char; 9],
    }

    #[link(name = "gme")]
    extern "C" {
        pub fn gme_identify_file(path: *const c_char, type_out: *mut *const GmeType) -> GmeErr;
        pub fn gme_type_system(t: *const GmeType) -> *const c_char;
        pub fn gme_open_file(
            path: *const c_char,
            out: *mut *mut MusicEmu,
            sample_rate: c_int,
        ) -> GmeErr;
        pub fn gme_delete(emu: *mut MusicEmu);
        pub fn gme_track_count(emu: *const MusicEmu) -> c_int;
        pub fn gme_voice_count(emu: *const MusicEmu) -> c_int;
        pub fn gme_voice_name(emu: *const MusicEmu, index: c_int) -> *const c_char;
        pub fn gme_track_info(emu: *const MusicEmu, out: *mut *mut GmeInfo, track: c_int)
            -> GmeErr;
        pub fn gme_free_info(info: *mut GmeInfo);
        pub fn gme_mute_voice(emu: *mut MusicEmu, index: c_int, mute: c_int);
        pub fn gme_start_track(emu: *mut MusicEmu, index: c_int) -> GmeErr;
        pub fn gme_set_fade(emu: *mut MusicEmu, start_msec: c_int);
        pub fn gme_play(emu: *mut MusicEmu, count: c_int, out: *mut i16) -> GmeErr;
        pub fn gme_track_ended(emu: *const MusicEmu) -> c_int;
        pub fn gme_seek(emu: *mut MusicEmu, msec: c_int) -> GmeErr;
        pub fn gme_ignore_silence(emu: *mut MusicEmu, ignore: c_int);
    }
}

/// Convert a possibly null C string owned by the library into an owned string.
///
/// # Safety
///
/// `s` must be null or point to a valid NUL terminated string.
unsafe fn owned_string(s: *const c_char) -> String {
    if s.is_null() {
        String::new()
    } else {
        CStr::from_ptr(s).to_string_lossy().into_owned()
    }
}

/// Turn the library's error convention (null on success) into a `Result`.
fn check(err: ffi::GmeErr) -> Result<(), DecoderError> {
    if err.is_null() {
        Ok(())
    } else {
        Err(DecoderError::Emulator {
            message: unsafe { owned_string(err) },
        })
    }
}

fn c_path(path: &Path) -> Result<CString, DecoderError> {
    CString::new(path.to_string_lossy().into_owned()).map_err(|_| DecoderError::Emulator {
        message: format!("Path {:?} contains a NUL byte", path),
    })
}

fn c_int_saturating(value: u32) -> c_int {
    if value > c_int::MAX as u32 {
        c_int::MAX
    } else {
        value as c_int
    }
}

/// Frees the track info record when going out of scope.
struct InfoGuard(*mut ffi::GmeInfo);

impl Drop for InfoGuard {
    fn drop(&mut self) {
        unsafe { ffi::gme_free_info(self.0) }
    }
}

/// Loads files with `libgme`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GmeBackend;

impl Backend for GmeBackend {
    type Decoder = GmeDecoder;

    fn identify(&self, path: &Path) -> Result<Option<String>, DecoderError> {
        let path = c_path(path)?;
        let mut file_type: *const ffi::GmeType = ptr::null();
        check(unsafe { ffi::gme_identify_file(path.as_ptr(), &mut file_type) })?;
        if file_type.is_null() {
            Ok(None)
        } else {
            Ok(Some(unsafe { owned_string(ffi::gme_type_system(file_type)) }))
        }
    }

    fn open(&self, path: &Path, sample_rate: u32) -> Result<GmeDecoder, DecoderError> {
        let path = c_path(path)?;
        let mut emu: *mut ffi::MusicEmu = ptr::null_mut();
        let result = check(unsafe {
            ffi::gme_open_file(path.as_ptr(), &mut emu, c_int_saturating(sample_rate))
        });
        if emu.is_null() {
            return Err(result.err().unwrap_or(DecoderError::OutOfMemory));
        }
        let decoder = GmeDecoder { emu };
        // Dropping the decoder releases a partially loaded emulator.
        result.map(|_| decoder)
    }
}

/// An emulator instance with a loaded file.
pub struct GmeDecoder {
    emu: *mut ffi::MusicEmu,
}

impl Decoder for GmeDecoder {
    fn track_count(&self) -> usize {
        unsafe { ffi::gme_track_count(self.emu) }.max(0) as usize
    }

    fn voice_count(&self) -> usize {
        unsafe { ffi::gme_voice_count(self.emu) }.max(0) as usize
    }

    fn voice_name(&self, voice: usize) -> String {
        unsafe { owned_string(ffi::gme_voice_name(self.emu, voice as c_int)) }
    }

    fn track_info(&self, track: usize) -> Result<TrackInfo, DecoderError> {
        let mut info: *mut ffi::GmeInfo = ptr::null_mut();
        let result = check(unsafe { ffi::gme_track_info(self.emu, &mut info, track as c_int) });
        if info.is_null() {
            result?;
            return Err(DecoderError::OutOfMemory);
        }
        let guard = InfoGuard(info);
        result?;

        let info = unsafe { &*guard.0 };
        let millis = |ms: c_int| ms.max(0) as u32;
        Ok(unsafe {
            TrackInfo {
                game: owned_string(info.game),
                song: owned_string(info.song),
                author: owned_string(info.author),
                length: millis(info.length),
                intro_length: millis(info.intro_length),
                loop_length: millis(info.loop_length),
            }
        })
    }

    fn mute_voice(&mut self, voice: usize, muted: bool) {
        unsafe { ffi::gme_mute_voice(self.emu, voice as c_int, muted as c_int) }
    }

    fn start_track(&mut self, track: usize) -> Result<(), DecoderError> {
        if track >= self.track_count() {
            return Err(DecoderError::NoSuchTrack { track });
        }
        check(unsafe { ffi::gme_start_track(self.emu, track as c_int) })
    }

    fn set_fade(&mut self, fade_ms: u32) {
        unsafe { ffi::gme_set_fade(self.emu, c_int_saturating(fade_ms)) }
    }

    fn play(&mut self, buffer: &mut [i16]) -> Result<(), DecoderError> {
        // The library renders whole frames, so the count must be even.
        let count = buffer.len() & !1;
        check(unsafe { ffi::gme_play(self.emu, count as c_int, buffer.as_mut_ptr()) })
    }

    fn track_ended(&self) -> bool {
        unsafe { ffi::gme_track_ended(self.emu) != 0 }
    }

    fn seek(&mut self, position_ms: u32) -> Result<(), DecoderError> {
        check(unsafe { ffi::gme_seek(self.emu, c_int_saturating(position_ms)) })
    }

    fn ignore_silence(&mut self, ignore: bool) {
        unsafe { ffi::gme_ignore_silence(self.emu, ignore as c_int) }
    }
}

impl Drop for GmeDecoder {
    fn drop(&mut self) {
        unsafe { ffi::gme_delete(self.emu) }
    }
}
