// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The glue responsible for turning a single voice of a track into a WAV file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{trace, warn};
use snafu::{ResultExt, Snafu};

use crate::decoder::{Decoder, DecoderError};
use crate::isolate::isolate_voice;
use crate::wave::{WavFormat, WavStream};

/// Rendering of one voice of one track to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub track: usize,
    pub voice: usize,
    pub voice_count: usize,
    pub output: PathBuf,
}

/// The outcome of a successful [`RenderJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    pub output: PathBuf,
    /// Number of sample bytes in the file, excluding the header.
    pub bytes: u32,
    pub fade_ms: u32,
}

#[derive(Debug, Snafu)]
pub enum RenderError {
    #[snafu(display("Could not start track {}: {}", track, source))]
    StartTrack { track: usize, source: DecoderError },
    #[snafu(display("Could not create {}: {}", path.display(), source))]
    CreateOutput { path: PathBuf, source: io::Error },
    #[snafu(display("Could not write {}: {}", path.display(), source))]
    WriteOutput { path: PathBuf, source: io::Error },
    #[snafu(display("Synthesis failed while writing {}: {}", path.display(), source))]
    Synthesize { path: PathBuf, source: DecoderError },
}

impl RenderError {
    /// Whether the error concerns the whole track rather than just this voice.
    ///
    /// Remaining voices of the track are pointless to attempt in that case.
    pub fn affects_track(&self) -> bool {
        matches!(self, RenderError::StartTrack { .. })
    }
}

/// The title used for naming the files of a track.
///
/// Tracks without a song title are named after the input file and the (zero based) track index.
pub fn song_title(song: &str, base_name: &str, track: usize) -> String {
    if song.is_empty() {
        format!("{} Track {}", base_name, track)
    } else {
        song.to_string()
    }
}

/// Path of the file a voice is rendered to: `<dir>/<title> - <voice>.wav`.
///
/// Path separators in the title or voice name are replaced, so that all files end up in `dir`.
pub fn output_path(dir: &Path, title: &str, voice_name: &str) -> PathBuf {
    let name = format!("{} - {}.wav", title, voice_name);
    dir.join(name.replace(|c: char| c == '/' || c == '\\', "_"))
}

/// Render the voice of a track described by `job`.
///
/// The decoder is rewound to the start of the track afterwards,
/// even if writing the file failed, so the next voice starts from the beginning.
pub fn run<D: Decoder + ?Sized>(
    decoder: &mut D,
    job: &RenderJob,
    format: WavFormat,
) -> Result<RenderSummary, RenderError> {
    let fade_ms = isolate_voice(decoder, job.track, job.voice, job.voice_count)
        .context(StartTrack { track: job.track })?;

    let rendered = render_to_file(decoder, &job.output, format);

    if let Err(err) = decoder.seek(0) {
        warn!("could not rewind track {}: {}", job.track, err);
    }

    Ok(RenderSummary {
        output: job.output.clone(),
        bytes: rendered?,
        fade_ms,
    })
}

/// Number of samples requested from the decoder per call.
///
/// Roughly as many samples as the sample rate, rounded down to whole frames
/// and never less than one frame, so playback always advances.
pub fn buffer_len(format: WavFormat) -> usize {
    let channels = usize::from(format.channels.max(1));
    (format.sample_rate as usize / channels).max(1) * channels
}

/// Stream the current track to a WAV file until it has ended.
///
/// A file that could not be completed is removed again, so that only valid files remain.
/// Returns the number of sample bytes written.
fn render_to_file<D: Decoder + ?Sized>(
    decoder: &mut D,
    path: &Path,
    format: WavFormat,
) -> Result<u32, RenderError> {
    let mut stream = WavStream::create(path, format).context(CreateOutput { path })?;

    let streamed = stream_track(decoder, &mut stream, path, format);
    let finished = streamed.and_then(|()| {
        let bytes = stream.bytes_written();
        stream.finish().context(WriteOutput { path })?;
        Ok(bytes)
    });

    if finished.is_err() {
        if let Err(err) = fs::remove_file(path) {
            warn!("could not remove incomplete {}: {}", path.display(), err);
        }
    }
    finished
}

fn stream_track<D: Decoder + ?Sized, W: io::Write + io::Seek>(
    decoder: &mut D,
    stream: &mut WavStream<W>,
    path: &Path,
    format: WavFormat,
) -> Result<(), RenderError> {
    let mut buffer = vec![0i16; buffer_len(format)];
    while !decoder.track_ended() {
        decoder.play(&mut buffer).context(Synthesize { path })?;
        stream.write_samples(&buffer).context(WriteOutput { path })?;
        trace!("{}: {} bytes", path.display(), stream.bytes_written());
    }
    Ok(())
}
