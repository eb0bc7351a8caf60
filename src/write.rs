use std::fs;
use std::io;
use std::path::Path;

use crate::backend::Backend;
use crate::block::RowBlock;
use crate::error::{FormatError, HashError};
use crate::index::BlockOffsets;
use crate::{Config, Result};

/// Builds a compressed matrix for one partition.
///
/// Rows are accepted in strictly increasing key order within
/// `[min_key, max_key]`; keys never presented are materialized as all-zero
/// rows, either when a later key reveals the gap or when [`finish`] pads
/// the tail. Every `rows_per_block` rows the block buffer is compressed
/// and its cumulative offset recorded, so compression work scales with
/// `total_rows / rows_per_block`.
///
/// Keys are absolute hash values; the writer maps them to positions
/// relative to `min_key` internally.
///
/// [`finish`]: MatrixWriter::finish
pub struct MatrixWriter<B: Backend, W: io::Write, I: io::Write> {
    backend: B,
    block: RowBlock,
    matrix: W,
    index: I,

    /// Cumulative compressed byte counts, one per block boundary
    offsets: Vec<u64>,

    /// Reusable compressed-output buffer, sized to the backend bound
    zbuf: Vec<u8>,

    /// Scratch row for binarizing abundance vectors
    rowbuf: Vec<u8>,

    samples: usize,

    min_key: u64,
    max_key: u64,
    previous_key: u64,

    /// Set until the first row is accepted; the first row may coincide
    /// with `previous_key` (initialized to `min_key`), later rows may not
    first_row: bool,

    rows_written: u64,
    finished: bool,
}

impl<B: Backend> MatrixWriter<B, io::BufWriter<fs::File>, io::BufWriter<fs::File>> {
    /// Creates matrix and index files at the given paths.
    pub fn from_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        backend: B,
        config: &Config,
        min_key: u64,
        max_key: u64,
        matrix_path: P,
        index_path: Q,
        preserved_header: &[u8],
    ) -> Result<Self> {
        let matrix = fs::File::create(matrix_path).map(io::BufWriter::new)?;
        let index = fs::File::create(index_path).map(io::BufWriter::new)?;
        Self::new(
            backend,
            config,
            min_key,
            max_key,
            matrix,
            index,
            preserved_header,
        )
    }
}

impl<B: Backend, W: io::Write, I: io::Write> MatrixWriter<B, W, I> {
    /// Builds a writer over arbitrary sinks and writes the preserved
    /// header bytes to the matrix sink immediately.
    pub fn new(
        backend: B,
        config: &Config,
        min_key: u64,
        max_key: u64,
        mut matrix: W,
        index: I,
        preserved_header: &[u8],
    ) -> Result<Self> {
        matrix.write_all(preserved_header)?;
        let zbuf = vec![0u8; backend.compress_bound(config.block_decoded_size())];
        Ok(Self {
            backend,
            block: RowBlock::new(config.row_size(), config.rows_per_block()),
            matrix,
            index,
            offsets: vec![0],
            zbuf,
            rowbuf: vec![0u8; config.row_size()],
            samples: config.samples(),
            min_key,
            max_key,
            previous_key: min_key,
            first_row: true,
            rows_written: 0,
            finished: false,
        })
    }

    /// Binarizes an abundance vector (bit set where the count is non-zero)
    /// and appends it under `key`.
    pub fn push_counts(&mut self, key: u64, counts: &[u32]) -> Result<()> {
        if counts.len() != self.samples {
            return Err(FormatError::SampleCount {
                expected: self.samples,
                got: counts.len(),
            }
            .into());
        }
        self.rowbuf.fill(0);
        for (i, count) in counts.iter().enumerate() {
            if *count > 0 {
                self.rowbuf[i / 8] |= 1 << (i % 8);
            }
        }
        let gap = self.advance_key(key)?;
        self.fill_gap(gap)?;
        // rowbuf is scratch state, take it around the borrow
        let row = std::mem::take(&mut self.rowbuf);
        let result = self.append(&row);
        self.rowbuf = row;
        result
    }

    /// Appends a pre-binarized row under `key`.
    pub fn push_row(&mut self, key: u64, row: &[u8]) -> Result<()> {
        if row.len() != self.rowbuf.len() {
            return Err(FormatError::RowSize {
                expected: self.rowbuf.len(),
                got: row.len(),
            }
            .into());
        }
        let gap = self.advance_key(key)?;
        self.fill_gap(gap)?;
        self.append(row)
    }

    /// Pads the trailing gap with zero rows, flushes the final partial
    /// block, and serializes the offset index. Idempotent; also invoked on
    /// drop with its error discarded.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let total = self.max_key - self.min_key + 1;
        if self.rows_written < total {
            self.fill_gap(total - self.rows_written)?;
        }
        self.flush_block()?;

        log::debug!(
            "finalized partition: {} rows in {} blocks, {} compressed bytes",
            self.rows_written,
            self.offsets.len() - 1,
            self.offsets.last().copied().unwrap_or(0),
        );

        let index = BlockOffsets::from_offsets(&self.offsets)?;
        index.write_into(&mut self.index)?;
        self.matrix.flush()?;
        self.index.flush()?;
        Ok(())
    }

    /// Rows accepted so far, synthesized gap rows included.
    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Validates key bounds and ordering; returns the number of zero rows
    /// to synthesize before the row itself.
    fn advance_key(&mut self, key: u64) -> Result<u64> {
        if key < self.min_key || key > self.max_key {
            return Err(HashError::OutOfBounds {
                key,
                min: self.min_key,
                max: self.max_key,
            }
            .into());
        }
        let gap = if self.first_row {
            // rows for min_key..key are all missing, not just the span
            // between two accepted keys
            key - self.min_key
        } else if key < self.previous_key {
            return Err(HashError::Decreasing {
                key,
                previous: self.previous_key,
            }
            .into());
        } else if key == self.previous_key {
            return Err(HashError::Repeated(key).into());
        } else {
            key - self.previous_key - 1
        };
        self.first_row = false;
        self.previous_key = key;
        Ok(gap)
    }

    fn fill_gap(&mut self, rows: u64) -> Result<()> {
        for _ in 0..rows {
            self.block.push_zero();
            self.rows_written += 1;
            if self.block.is_full() {
                self.flush_block()?;
            }
        }
        Ok(())
    }

    fn append(&mut self, row: &[u8]) -> Result<()> {
        self.block.push(row);
        self.rows_written += 1;
        if self.block.is_full() {
            self.flush_block()?;
        }
        Ok(())
    }

    /// Dense-ingestion fast path: whole rows copied straight into the
    /// block buffer, bypassing gap and ordering logic.
    pub(crate) fn append_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.block.extend_rows(chunk);
        self.rows_written += (chunk.len() / self.rowbuf.len()) as u64;
        if self.block.is_full() {
            self.flush_block()?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.block.is_empty() {
            return Ok(());
        }
        let zlen = self.backend.compress(self.block.data(), &mut self.zbuf)?;
        self.matrix.write_all(&self.zbuf[..zlen])?;
        let cumulative = self.offsets.last().copied().unwrap_or(0) + zlen as u64;
        self.offsets.push(cumulative);
        self.block.clear();
        Ok(())
    }
}

impl<B: Backend, W: io::Write, I: io::Write> Drop for MatrixWriter<B, W, I> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.finish();
        }
    }
}
