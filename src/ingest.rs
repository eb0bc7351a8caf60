//! Converters from the legacy uncompressed matrix formats.
//!
//! Both adapters preserve the first `header_size` bytes of the source
//! verbatim at the head of the matrix output and name their outputs
//! `<prefix>_<partition>.bmx` / `<prefix>_<partition>.bmi`, with the
//! partition number taken from the trailing digits of the source filename.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::backend::Backend;
use crate::bounds::HashBounds;
use crate::error::FormatError;
use crate::write::MatrixWriter;
use crate::{Config, Result, INDEX_EXTENSION, MATRIX_EXTENSION};

/// Derives the partition number from the trailing digits of a filename
/// stem, e.g. `matrix_12.bin` -> 12.
pub fn partition_from_path<P: AsRef<Path>>(path: P) -> Result<u64> {
    let path = path.as_ref();
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let digits = stem.trim_end_matches(|c: char| !c.is_ascii_digit());
    let start = digits
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);
    digits[start..]
        .parse()
        .map_err(|_| FormatError::MissingPartition(path.display().to_string()).into())
}

/// Matrix/index output paths for one partition.
pub(crate) fn output_paths<P: AsRef<Path>>(prefix: P, partition: u64) -> (PathBuf, PathBuf) {
    let prefix = prefix.as_ref().display();
    (
        PathBuf::from(format!("{prefix}_{partition}.{MATRIX_EXTENSION}")),
        PathBuf::from(format!("{prefix}_{partition}.{INDEX_EXTENSION}")),
    )
}

fn open_with_header(
    input_path: &Path,
    header_size: u64,
) -> Result<(io::BufReader<fs::File>, Vec<u8>, u64)> {
    let len = fs::metadata(input_path)?.len();
    let mut input = fs::File::open(input_path).map(io::BufReader::new)?;
    let mut header = vec![0u8; header_size as usize];
    input.read_exact(&mut header)?;
    Ok((input, header, len - header_size))
}

/// Converts a sparse legacy matrix: `(u64 LE key, row bytes)` records
/// after the preserved header, keys strictly increasing.
///
/// Without an explicit `partition` the number is taken from the input
/// filename.
pub fn compress_sparse<B, P, Q>(
    backend: B,
    config: &Config,
    bounds: &HashBounds,
    input_path: P,
    output_prefix: Q,
    partition: Option<u64>,
    header_size: u64,
) -> Result<()>
where
    B: Backend,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input_path = input_path.as_ref();
    let partition = match partition {
        Some(partition) => partition,
        None => partition_from_path(input_path)?,
    };
    let (min_key, max_key) = bounds.get(partition)?;
    let (mut input, header, payload) = open_with_header(input_path, header_size)?;

    let row_size = config.row_size();
    let record_size = 8 + row_size as u64;
    if payload % record_size != 0 {
        return Err(FormatError::TruncatedInput {
            len: payload,
            record: record_size,
        }
        .into());
    }

    let (matrix_path, index_path) = output_paths(output_prefix, partition);
    let mut writer = MatrixWriter::from_paths(
        backend,
        config,
        min_key,
        max_key,
        matrix_path,
        index_path,
        &header,
    )?;

    let mut row = vec![0u8; row_size];
    for _ in 0..payload / record_size {
        let key = input.read_u64::<LittleEndian>()?;
        input.read_exact(&mut row)?;
        writer.push_row(key, &row)?;
    }
    writer.finish()?;

    log::debug!(
        "sparse ingest of partition {partition}: {} records, {} total rows",
        payload / record_size,
        writer.rows_written(),
    );
    Ok(())
}

/// Converts a dense legacy matrix: one row per key from `min_key` upward,
/// in implicit key order after the preserved header.
///
/// Without an explicit `partition` the number is taken from the input
/// filename.
pub fn compress_dense<B, P, Q>(
    backend: B,
    config: &Config,
    bounds: &HashBounds,
    input_path: P,
    output_prefix: Q,
    partition: Option<u64>,
    header_size: u64,
) -> Result<()>
where
    B: Backend,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input_path = input_path.as_ref();
    let partition = match partition {
        Some(partition) => partition,
        None => partition_from_path(input_path)?,
    };
    let (min_key, max_key) = bounds.get(partition)?;
    let (mut input, header, payload) = open_with_header(input_path, header_size)?;

    let row_size = config.row_size() as u64;
    if payload % row_size != 0 {
        return Err(FormatError::TruncatedInput {
            len: payload,
            record: row_size,
        }
        .into());
    }
    let rows = payload / row_size;
    let expected = max_key - min_key + 1;
    if rows != expected {
        return Err(FormatError::RowCountMismatch { rows, expected }.into());
    }

    let (matrix_path, index_path) = output_paths(output_prefix, partition);
    let mut writer = MatrixWriter::from_paths(
        backend,
        config,
        min_key,
        max_key,
        matrix_path,
        index_path,
        &header,
    )?;

    // whole blocks straight through the bulk path, short final chunk last
    let mut chunk = vec![0u8; config.block_decoded_size()];
    let mut remaining = payload as usize;
    while remaining > 0 {
        let take = chunk.len().min(remaining);
        input.read_exact(&mut chunk[..take])?;
        writer.append_chunk(&chunk[..take])?;
        remaining -= take;
    }
    writer.finish()?;

    log::debug!("dense ingest of partition {partition}: {rows} rows");
    Ok(())
}
