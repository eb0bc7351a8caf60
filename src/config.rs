use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::ConfigError;
use crate::Result;

/// Matrix configuration shared between writers and readers.
///
/// Parsed from a simple `property = value` file with three required keys
/// (case-insensitive, `=` or `:` as separator):
///
/// ```text
/// samples = 1024
/// linesperblock = 4096
/// preset = 6
/// ```
///
/// A reader must be configured identically to the writer that produced the
/// matrix; none of these values are embedded in the matrix file itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    samples: usize,
    rows_per_block: u64,
    preset: u8,
}

impl Config {
    /// Builds a validated configuration.
    pub fn new(samples: usize, rows_per_block: u64, preset: u8) -> Result<Self> {
        if samples == 0 {
            return Err(ConfigError::InvalidSampleCount.into());
        }
        if rows_per_block == 0 {
            return Err(ConfigError::InvalidRowsPerBlock.into());
        }
        if preset > 9 {
            return Err(ConfigError::InvalidPreset(preset).into());
        }
        Ok(Self {
            samples,
            rows_per_block,
            preset,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let handle = fs::File::open(path).map(io::BufReader::new)?;
        Self::from_reader(handle)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut samples = None;
        let mut rows_per_block = None;
        let mut preset = None;

        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (property, value) = parse_line(trimmed)?;
            match property.as_str() {
                "samples" => samples = Some(value as usize),
                "linesperblock" => rows_per_block = Some(value),
                "preset" => {
                    if value > 9 {
                        return Err(ConfigError::InvalidPreset(value.min(255) as u8).into());
                    }
                    preset = Some(value as u8);
                }
                _ => return Err(ConfigError::UnknownProperty(property).into()),
            }
        }

        Self::new(
            samples.ok_or(ConfigError::MissingProperty("samples"))?,
            rows_per_block.ok_or(ConfigError::MissingProperty("linesperblock"))?,
            preset.ok_or(ConfigError::MissingProperty("preset"))?,
        )
    }

    /// Writes the configuration back out in its file format.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "samples = {}", self.samples)?;
        writeln!(writer, "linesperblock = {}", self.rows_per_block)?;
        writeln!(writer, "preset = {}", self.preset)?;
        Ok(())
    }

    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    #[must_use]
    pub fn rows_per_block(&self) -> u64 {
        self.rows_per_block
    }

    #[must_use]
    pub fn preset(&self) -> u8 {
        self.preset
    }

    /// Bytes per packed-bit row: one bit per sample.
    #[must_use]
    pub fn row_size(&self) -> usize {
        self.samples.div_ceil(8)
    }

    /// Bytes in a fully populated decoded block.
    #[must_use]
    pub fn block_decoded_size(&self) -> usize {
        self.row_size() * self.rows_per_block as usize
    }
}

fn parse_line(line: &str) -> Result<(String, u64)> {
    let Some((property, value)) = line.split_once(['=', ':']) else {
        return Err(ConfigError::InvalidLine(line.to_string()).into());
    };
    let value = value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidLine(line.to_string()))?;
    Ok((property.trim().to_ascii_lowercase(), value))
}
