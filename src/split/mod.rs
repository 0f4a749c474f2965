// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Implementation of the voice splitter (vgm-split).

pub mod batch;

use std::io;
use std::path::{Path, PathBuf};

use log::info;
use snafu::{ResultExt, Snafu};
use structopt::StructOpt;

use crate::decoder::Backend;

pub use batch::{BatchReport, Splitter};

#[derive(Debug, StructOpt)]
#[structopt(name = "vgm-split", about = "Splitting game music into one file per voice")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// Directory containing the music files to split.
    #[structopt(short, long, parse(from_os_str), default_value = "in")]
    input: PathBuf,

    /// Directory receiving one WAV file per track and voice.
    #[structopt(short, long, parse(from_os_str), default_value = "out")]
    output: PathBuf,

    /// Sample rate of the rendered files.
    #[structopt(short = "r", long, default_value = "44100", parse(try_from_str = parse_sample_rate))]
    sample_rate: u32,
}

/// Sample rates the rendered files may use, in Hz.
pub const SAMPLE_RATES: std::ops::RangeInclusive<u32> = 8000..=192_000;

fn parse_sample_rate(input: &str) -> Result<u32, String> {
    let rate: u32 = input
        .parse()
        .map_err(|err| format!("invalid sample rate {:?}: {}", input, err))?;
    if SAMPLE_RATES.contains(&rate) {
        Ok(rate)
    } else {
        Err(format!(
            "sample rate {} is outside of {}-{} Hz",
            rate,
            SAMPLE_RATES.start(),
            SAMPLE_RATES.end()
        ))
    }
}

/// Where to read music from and where to put the rendered voices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub sample_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: "in".into(),
            output_dir: "out".into(),
            sample_rate: 44100,
        }
    }
}

impl From<Opt> for Config {
    fn from(opt: Opt) -> Self {
        Self {
            input_dir: opt.input,
            output_dir: opt.output,
            sample_rate: opt.sample_rate,
        }
    }
}

/// Errors that end the whole run.
#[derive(Debug, Snafu)]
pub enum SplitError {
    #[snafu(display("Could not create directory {}: {}", path.display(), source))]
    CreateDir { path: PathBuf, source: io::Error },
    #[snafu(display("Could not read directory {}: {}", path.display(), source))]
    ReadDir { path: PathBuf, source: io::Error },
    #[snafu(display("Could not set up logging: {}", source))]
    Logger { source: log::SetLoggerError },
}

/// Create the input and output directories if they do not exist yet.
pub fn prepare_dirs(config: &Config) -> Result<(), SplitError> {
    ensure_dir(&config.input_dir)?;
    ensure_dir(&config.output_dir)
}

fn ensure_dir(path: &Path) -> Result<(), SplitError> {
    std::fs::create_dir_all(path).context(CreateDir { path })
}

/// Entry point of the splitter binary, rendering with the given backend.
pub fn split_main<B: Backend>(backend: B) -> Result<(), SplitError> {
    let opt: Opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level).context(Logger)?;
    info!("vgm-split v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from(opt);
    prepare_dirs(&config)?;

    let report = Splitter::new(backend, config).split_dir()?;
    info!(
        "{} files split, {} skipped, {} without separable voices",
        report.files_split, report.files_skipped, report.files_without_voices
    );
    info!(
        "{} voices written, {} failed, {} tracks skipped",
        report.outputs.len(),
        report.jobs_failed,
        report.tracks_skipped
    );
    Ok(())
}
