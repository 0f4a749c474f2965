// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Splitting every file of a directory, one voice at a time.

use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use snafu::{OptionExt, ResultExt, Snafu};

use super::{Config, ReadDir, SplitError};
use crate::decoder::{self, Backend, Decoder, DecoderError};
use crate::render::{self, RenderJob};
use crate::wave::WavFormat;

/// Reasons for skipping an input file entirely.
#[derive(Debug, Snafu)]
pub enum LoadError {
    #[snafu(display("{}: unsupported music type", path.display()))]
    UnsupportedFormat { path: PathBuf },
    #[snafu(display("{}: could not identify file: {}", path.display(), source))]
    Identify { path: PathBuf, source: DecoderError },
    #[snafu(display("{}: could not load file: {}", path.display(), source))]
    Open { path: PathBuf, source: DecoderError },
}

/// A loaded input file. Dropping it releases the decoder.
pub struct MusicFile<D> {
    pub path: PathBuf,
    /// File name without directory and extension, used for naming untitled tracks.
    pub base_name: String,
    /// The console the music was made for.
    pub system: String,
    pub decoder: D,
}

/// Identify and load a music file.
pub fn load<B: Backend>(
    backend: &B,
    path: &Path,
    sample_rate: u32,
) -> Result<MusicFile<B::Decoder>, LoadError> {
    let system = backend
        .identify(path)
        .context(Identify { path })?
        .context(UnsupportedFormat { path })?;
    let mut decoder = backend.open(path, sample_rate).context(Open { path })?;

    // Quiet voices would otherwise end the track early.
    decoder.ignore_silence(true);

    Ok(MusicFile {
        path: path.to_path_buf(),
        base_name: path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        system,
        decoder,
    })
}

/// What happened to the tracks of a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub outputs: Vec<PathBuf>,
    pub jobs_failed: usize,
    pub tracks_skipped: usize,
    /// The file does not support muting voices, so nothing was rendered.
    pub no_voices: bool,
}

/// Summary of splitting a whole directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files_split: usize,
    pub files_skipped: usize,
    pub files_without_voices: usize,
    pub outputs: Vec<PathBuf>,
    pub jobs_failed: usize,
    pub tracks_skipped: usize,
}

impl BatchReport {
    fn add(&mut self, file: FileReport) {
        if file.no_voices {
            self.files_without_voices += 1;
        } else {
            self.files_split += 1;
        }
        self.outputs.extend(file.outputs);
        self.jobs_failed += file.jobs_failed;
        self.tracks_skipped += file.tracks_skipped;
    }
}

/// Renders the voices of music files with a [`Backend`].
pub struct Splitter<B> {
    backend: B,
    config: Config,
}

impl<B: Backend> Splitter<B> {
    pub fn new(backend: B, config: Config) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Split every file in the input directory, in order of their paths.
    ///
    /// Files that cannot be loaded and renders that fail are logged and skipped.
    /// Only failing to list the input directory is an error.
    pub fn split_dir(&self) -> Result<BatchReport, SplitError> {
        let dir = &self.config.input_dir;
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).context(ReadDir { path: dir })? {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_dir() {
                        debug!("skipping directory {}", path.display());
                    } else {
                        paths.push(path);
                    }
                }
                Err(err) => warn!("could not read entry of {}: {}", dir.display(), err),
            }
        }
        paths.sort();

        let mut report = BatchReport::default();
        for path in paths {
            match self.split_file(&path) {
                Ok(file) => report.add(file),
                Err(err) => {
                    error!("{}", err);
                    report.files_skipped += 1;
                }
            }
        }
        Ok(report)
    }

    /// Render each voice of each track of a file into its own WAV file.
    pub fn split_file(&self, path: &Path) -> Result<FileReport, LoadError> {
        info!("opening file: {}", path.display());
        let mut file = load(&self.backend, path, self.config.sample_rate)?;
        info!("console: {}", file.system);
        if let Ok(first) = file.decoder.track_info(0) {
            info!("game: {}", first.game);
        }

        let track_count = file.decoder.track_count();
        let voices = decoder::voices(&file.decoder);
        info!("file contains {} tracks", track_count);
        info!("each track contains {} voices", voices.len());

        let mut report = FileReport::default();
        if voices.is_empty() {
            warn!(
                "{}: voices cannot be muted separately, skipping file",
                file.path.display()
            );
            report.no_voices = true;
            return Ok(report);
        }

        let format = WavFormat::stereo16(self.config.sample_rate);
        for track in 0..track_count {
            let info = match file.decoder.track_info(track) {
                Ok(info) => info,
                Err(err) => {
                    error!("track {}: {}", track + 1, err);
                    report.tracks_skipped += 1;
                    continue;
                }
            };
            if info.song.is_empty() {
                info!("Track {}", track + 1);
            } else {
                info!("Track {}: {} - {}", track + 1, info.author, info.song);
            }
            let title = render::song_title(&info.song, &file.base_name, track);

            for voice in &voices {
                let job = RenderJob {
                    track,
                    voice: voice.index,
                    voice_count: voices.len(),
                    output: render::output_path(&self.config.output_dir, &title, &voice.name),
                };
                info!(
                    "writing voice #{} to file {}",
                    voice.index + 1,
                    job.output.display()
                );
                match render::run(&mut file.decoder, &job, format) {
                    Ok(summary) => {
                        debug!(
                            "wrote {} bytes, fade after {} ms",
                            summary.bytes, summary.fade_ms
                        );
                        report.outputs.push(summary.output);
                    }
                    Err(err) if err.affects_track() => {
                        error!("{}", err);
                        report.tracks_skipped += 1;
                        break;
                    }
                    Err(err) => {
                        error!("{}", err);
                        report.jobs_failed += 1;
                    }
                }
            }
        }

        info!(
            "{}: {} files written",
            file.path.display(),
            report.outputs.len()
        );
        Ok(report)
    }
}
