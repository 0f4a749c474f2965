// vgm-split -- renders every voice of game music to its own WAV file
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! This is the namespace for all parts dealing with data in sampled waves.
//!
//! Rendered audio is written as canonical 16 bit PCM WAV files. The total length of
//! a render is not known up front, so the size fields of the header are written as
//! placeholders first and patched once all samples have been streamed to the file.

use std::convert::TryFrom;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Size of the canonical header, i.e. the offset of the first sample.
pub const HEADER_LEN: u64 = 44;

/// Bytes of the RIFF chunk that precede the sample data, excluding the `RIFF` tag and size.
const RIFF_OVERHEAD: u32 = 36;

/// Encode the lowest `N` bytes of `value` in little endian order.
///
/// ```
/// use vgm_split::wave::little_endian;
///
/// assert_eq!(little_endian::<4>(0x1234_5678), [0x78, 0x56, 0x34, 0x12]);
/// assert_eq!(little_endian::<2>(0x1234_5678), [0x78, 0x56]);
/// ```
pub fn little_endian<const N: usize>(value: u32) -> [u8; N] {
    let mut bytes = [0u8; N];
    let mut word = value;
    for byte in bytes.iter_mut() {
        *byte = (word & 0xff) as u8;
        word >>= 8;
    }
    bytes
}

/// Information about how the audio in a WAV file is sampled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WavFormat {
    pub channels: u16,
    /// Number of frames per second.
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// 16 bit interleaved stereo, which is what the decoders produce.
    pub fn stereo16(sample_rate: u32) -> Self {
        Self {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
        }
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Size of one frame (one sample for each channel) in bytes.
    pub fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }
}

/// A WAV file that is being written.
///
/// The header is written on construction. Samples can then be appended
/// incrementally, and [`WavStream::finish`] fills in the final sizes.
/// A stream that is dropped without finishing leaves the placeholder sizes in place.
pub struct WavStream<W: Write + Seek> {
    writer: W,
    total_size_offset: u64,
    data_size_offset: u64,
    bytes_written: u32,
    byte_buffer: Vec<u8>,
}

impl WavStream<BufWriter<File>> {
    /// Create (or truncate) the file at `path` and write the header.
    pub fn create(path: &Path, format: WavFormat) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), format)
    }
}

impl<W: Write + Seek> WavStream<W> {
    /// Write the header with placeholder sizes to `writer`.
    pub fn new(mut writer: W, format: WavFormat) -> io::Result<Self> {
        // Placeholders describing a single frame. Always overwritten by `finish`.
        let preliminary_data_size = u32::from(format.block_align());

        writer.write_all(b"RIFF")?;
        let total_size_offset = writer.stream_position()?;
        writer.write_all(&little_endian::<4>(RIFF_OVERHEAD + preliminary_data_size))?;
        writer.write_all(b"WAVE")?;

        writer.write_all(b"fmt ")?;
        writer.write_all(&little_endian::<4>(16))?;
        // PCM
        writer.write_all(&little_endian::<2>(1))?;
        writer.write_all(&little_endian::<2>(u32::from(format.channels)))?;
        writer.write_all(&little_endian::<4>(format.sample_rate))?;
        writer.write_all(&little_endian::<4>(format.byte_rate()))?;
        writer.write_all(&little_endian::<2>(u32::from(format.block_align())))?;
        writer.write_all(&little_endian::<2>(u32::from(format.bits_per_sample)))?;

        writer.write_all(b"data")?;
        let data_size_offset = writer.stream_position()?;
        writer.write_all(&little_endian::<4>(preliminary_data_size))?;

        Ok(Self {
            writer,
            total_size_offset,
            data_size_offset,
            bytes_written: 0,
            byte_buffer: Vec::new(),
        })
    }

    /// Append interleaved 16 bit samples.
    ///
    /// Fails without writing anything if the data would no longer fit the 32 bit size fields.
    pub fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        let len = samples.len() * 2;
        let total = u32::try_from(len)
            .ok()
            .and_then(|len| self.bytes_written.checked_add(len))
            .filter(|total| *total <= u32::MAX - RIFF_OVERHEAD)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    "sample data exceeds the maximum size of a WAV file",
                )
            })?;

        self.byte_buffer.resize(len, 0);
        for (sample, target) in samples.iter().zip(self.byte_buffer.chunks_exact_mut(2)) {
            target.copy_from_slice(&sample.to_le_bytes());
        }
        self.writer.write_all(&self.byte_buffer)?;
        self.bytes_written = total;
        Ok(())
    }

    /// Number of sample bytes written so far.
    pub fn bytes_written(&self) -> u32 {
        self.bytes_written
    }

    /// Patch the size fields in the header and flush, returning the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.seek(SeekFrom::Start(self.total_size_offset))?;
        self.writer
            .write_all(&little_endian::<4>(RIFF_OVERHEAD + self.bytes_written))?;

        self.writer.seek(SeekFrom::Start(self.data_size_offset))?;
        self.writer
            .write_all(&little_endian::<4>(self.bytes_written))?;

        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}
