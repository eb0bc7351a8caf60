use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::backend::Backend;
use crate::error::ReadError;
use crate::index::BlockOffsets;
use crate::{Config, Result};

/// Random-access reader over a compressed matrix/index pair.
///
/// Stateless across queries except for a single-slot decode cache: the
/// last decoded block is kept in memory, so sequential key scans decode
/// each block once while random access may thrash. That depth-1 policy is
/// a deliberate simplicity/performance tradeoff.
///
/// Keys are absolute hash values, as accepted by the writer; queries below
/// `min_key` or past the stored blocks return `None`.
pub struct MatrixReader<B: Backend> {
    backend: B,
    matrix: fs::File,
    offsets: BlockOffsets,

    /// Reusable compressed-input buffer, grown on demand
    in_buf: Vec<u8>,
    /// Decoded bytes of the cached block
    out_buf: Vec<u8>,

    /// Index of the cached block, `None` when cold
    cached: Option<usize>,
    /// Actual decoded length of the cached block (short for the final one)
    decoded_len: usize,

    row_size: usize,
    rows_per_block: u64,
    block_decoded_size: usize,
    min_key: u64,
    header_len: u64,
}

impl<B: Backend> MatrixReader<B> {
    /// Opens an existing matrix/index pair read-only.
    ///
    /// `config` and the backend must match the writer that produced the
    /// files; `header_len` is the length of the preserved header at the
    /// head of the matrix file.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        backend: B,
        config: &Config,
        min_key: u64,
        matrix_path: P,
        index_path: Q,
        header_len: u64,
    ) -> Result<Self> {
        let matrix = fs::File::open(matrix_path)?;
        let index = fs::File::open(index_path).map(io::BufReader::new)?;
        let offsets = BlockOffsets::read_from(index)?;

        Ok(Self {
            backend,
            matrix,
            offsets,
            in_buf: Vec::new(),
            out_buf: vec![0u8; config.block_decoded_size()],
            cached: None,
            decoded_len: 0,
            row_size: config.row_size(),
            rows_per_block: config.rows_per_block(),
            block_decoded_size: config.block_decoded_size(),
            min_key,
            header_len,
        })
    }

    /// Returns the row stored under `key`, or `None` when the key falls
    /// outside the stored range.
    pub fn get_row(&mut self, key: u64) -> Result<Option<&[u8]>> {
        if key < self.min_key {
            return Ok(None);
        }
        let position = key - self.min_key;
        let block = (position / self.rows_per_block) as usize;
        let row_index = (position % self.rows_per_block) as usize;

        // past the last stored block
        if block + 1 >= self.offsets.len() {
            return Ok(None);
        }

        if self.cached != Some(block) {
            self.decode_block(block)?;
        }

        // a short final block holds fewer rows than configured
        if row_index >= self.decoded_len / self.row_size {
            return Ok(None);
        }

        let start = row_index * self.row_size;
        Ok(Some(&self.out_buf[start..start + self.row_size]))
    }

    /// Reconstructs the full dense matrix: preserved header verbatim, then
    /// every block decoded in order.
    pub fn decompress_all<P: AsRef<Path>>(&mut self, out_path: P) -> Result<()> {
        let mut out = fs::File::create(out_path).map(io::BufWriter::new)?;

        if self.header_len > 0 {
            self.matrix.seek(SeekFrom::Start(0))?;
            let mut header = vec![0u8; self.header_len as usize];
            self.matrix.read_exact(&mut header)?;
            out.write_all(&header)?;
        }

        for block in 0..self.offsets.num_blocks() {
            self.decode_block(block)?;
            out.write_all(&self.out_buf[..self.decoded_len])?;
        }
        out.flush()?;
        Ok(())
    }

    /// Invalidates the decode cache; the next query re-decodes its block.
    pub fn unload(&mut self) {
        self.cached = None;
    }

    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.offsets.num_blocks()
    }

    #[must_use]
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    #[must_use]
    pub fn offsets(&self) -> &BlockOffsets {
        &self.offsets
    }

    fn decode_block(&mut self, block: usize) -> Result<()> {
        let (start, end) = self.offsets.block_span(block)?;
        let encoded_len = (end - start) as usize;

        if encoded_len > self.in_buf.len() {
            self.in_buf.resize(encoded_len, 0);
        }
        self.matrix.seek(SeekFrom::Start(self.header_len + start))?;
        self.matrix.read_exact(&mut self.in_buf[..encoded_len])?;

        self.out_buf.resize(self.block_decoded_size, 0);
        let decoded = self
            .backend
            .decompress(&self.in_buf[..encoded_len], &mut self.out_buf)?;

        // only the final block may come up short
        if decoded != self.block_decoded_size && block + 2 != self.offsets.len() {
            return Err(ReadError::SizeMismatch {
                block,
                expected: self.block_decoded_size,
                got: decoded,
            }
            .into());
        }

        self.cached = Some(block);
        self.decoded_len = decoded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::{LzmaBackend, ZstdBackend};
    use crate::error::Error;
    use crate::write::MatrixWriter;

    /// Counts backend invocations to observe the decode cache.
    struct CountingBackend<B> {
        inner: B,
        decompressions: Rc<Cell<usize>>,
    }

    impl<B: Backend> Backend for CountingBackend<B> {
        fn compress_bound(&self, len: usize) -> usize {
            self.inner.compress_bound(len)
        }
        fn compress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
            self.inner.compress(src, dst)
        }
        fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
            self.decompressions.set(self.decompressions.get() + 1);
            self.inner.decompress(src, dst)
        }
    }

    fn lzma(config: &Config) -> LzmaBackend {
        LzmaBackend::new(config.preset(), config.block_decoded_size()).unwrap()
    }

    fn write_matrix(
        config: &Config,
        min_key: u64,
        max_key: u64,
        rows: &[(u64, &[u8])],
        header: &[u8],
        dir: &tempfile::TempDir,
    ) -> (std::path::PathBuf, std::path::PathBuf) {
        let matrix_path = dir.path().join("matrix_0.bmx");
        let index_path = dir.path().join("matrix_0.bmi");
        let mut writer = MatrixWriter::from_paths(
            lzma(config),
            config,
            min_key,
            max_key,
            &matrix_path,
            &index_path,
            header,
        )
        .unwrap();
        for (key, row) in rows {
            writer.push_row(*key, row).unwrap();
        }
        writer.finish().unwrap();
        (matrix_path, index_path)
    }

    #[test]
    fn concrete_scenario() {
        // samples=3 (1-byte rows), 2 rows per block, keys 10..=13,
        // rows at 10 and 12; reconstruction: 101, 000, 010, 000
        let config = Config::new(3, 2, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (matrix_path, index_path) = write_matrix(
            &config,
            10,
            13,
            &[(10, &[0b101]), (12, &[0b010])],
            &[],
            &dir,
        );

        let mut reader =
            MatrixReader::new(lzma(&config), &config, 10, &matrix_path, &index_path, 0).unwrap();
        assert_eq!(reader.num_blocks(), 2);
        assert_eq!(reader.offsets().len(), 3);
        assert_eq!(reader.offsets().nth(0), Some(0));

        let out_path = dir.path().join("dense");
        reader.decompress_all(&out_path).unwrap();
        let dense = std::fs::read(&out_path).unwrap();
        assert_eq!(dense, vec![0b101, 0b000, 0b010, 0b000]);
    }

    #[test]
    fn random_access_matches_dense_reconstruction() {
        let config = Config::new(16, 3, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<(u64, &[u8])> = vec![
            (100, &[0xAA, 0x01]),
            (103, &[0x0F, 0xF0]),
            (104, &[0x01, 0x02]),
            (110, &[0xFF, 0xFF]),
        ];
        let (matrix_path, index_path) = write_matrix(&config, 100, 112, &rows, &[], &dir);

        let mut reader =
            MatrixReader::new(lzma(&config), &config, 100, &matrix_path, &index_path, 0).unwrap();
        let out_path = dir.path().join("dense");
        reader.decompress_all(&out_path).unwrap();
        let dense = std::fs::read(&out_path).unwrap();
        assert_eq!(dense.len(), 13 * 2);

        for key in 100..=112u64 {
            let position = (key - 100) as usize;
            let expected = &dense[position * 2..position * 2 + 2];
            let row = reader.get_row(key).unwrap().unwrap();
            assert_eq!(row, expected, "row mismatch at key {key}");
        }
    }

    #[test]
    fn out_of_range_queries_return_none() {
        let config = Config::new(3, 2, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (matrix_path, index_path) =
            write_matrix(&config, 10, 13, &[(10, &[1])], &[], &dir);

        let mut reader =
            MatrixReader::new(lzma(&config), &config, 10, &matrix_path, &index_path, 0).unwrap();
        assert!(reader.get_row(9).unwrap().is_none());
        assert!(reader.get_row(14).unwrap().is_none());
        assert!(reader.get_row(u64::MAX).unwrap().is_none());
    }

    #[test]
    fn single_row_partition() {
        let config = Config::new(3, 2, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (matrix_path, index_path) =
            write_matrix(&config, 42, 42, &[(42, &[0b111])], &[], &dir);

        let mut reader =
            MatrixReader::new(lzma(&config), &config, 42, &matrix_path, &index_path, 0).unwrap();
        assert_eq!(reader.num_blocks(), 1);
        assert_eq!(reader.get_row(42).unwrap(), Some([0b111u8].as_slice()));
        assert!(reader.get_row(41).unwrap().is_none());
        assert!(reader.get_row(43).unwrap().is_none());
    }

    #[test]
    fn gap_rows_read_back_zero() {
        // writes at 5 and 9 with min 5: keys 6,7,8 must be zero rows
        let config = Config::new(8, 4, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (matrix_path, index_path) =
            write_matrix(&config, 5, 9, &[(5, &[0x11]), (9, &[0x99])], &[], &dir);

        let mut reader =
            MatrixReader::new(lzma(&config), &config, 5, &matrix_path, &index_path, 0).unwrap();
        assert_eq!(reader.get_row(5).unwrap(), Some([0x11u8].as_slice()));
        for key in 6..=8u64 {
            assert_eq!(reader.get_row(key).unwrap(), Some([0u8].as_slice()));
        }
        assert_eq!(reader.get_row(9).unwrap(), Some([0x99u8].as_slice()));
    }

    #[test]
    fn cache_hits_skip_the_backend() {
        let config = Config::new(3, 4, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (matrix_path, index_path) =
            write_matrix(&config, 0, 7, &[(0, &[1]), (5, &[2])], &[], &dir);

        let decompressions = Rc::new(Cell::new(0));
        let backend = CountingBackend {
            inner: lzma(&config),
            decompressions: decompressions.clone(),
        };
        let mut reader =
            MatrixReader::new(backend, &config, 0, &matrix_path, &index_path, 0).unwrap();

        let first = reader.get_row(1).unwrap().unwrap().to_vec();
        assert_eq!(decompressions.get(), 1);

        // same block: served from cache, bit-identical
        let second = reader.get_row(2).unwrap().unwrap().to_vec();
        assert_eq!(decompressions.get(), 1);
        let again = reader.get_row(1).unwrap().unwrap().to_vec();
        assert_eq!(decompressions.get(), 1);
        assert_eq!(first, again);
        drop(second);

        // different block decodes once
        reader.get_row(5).unwrap().unwrap();
        assert_eq!(decompressions.get(), 2);

        // unload forces a cold decode of the cached block
        reader.unload();
        reader.get_row(5).unwrap().unwrap();
        assert_eq!(decompressions.get(), 3);
    }

    #[test]
    fn preserved_header_is_reconstructed() {
        let config = Config::new(3, 2, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let header = b"legacy-header-bytes";
        let (matrix_path, index_path) =
            write_matrix(&config, 0, 3, &[(1, &[7])], header, &dir);

        let mut reader = MatrixReader::new(
            lzma(&config),
            &config,
            0,
            &matrix_path,
            &index_path,
            header.len() as u64,
        )
        .unwrap();
        assert_eq!(reader.get_row(1).unwrap(), Some([7u8].as_slice()));

        let out_path = dir.path().join("dense");
        reader.decompress_all(&out_path).unwrap();
        let dense = std::fs::read(&out_path).unwrap();
        assert_eq!(&dense[..header.len()], header);
        assert_eq!(&dense[header.len()..], &[0, 7, 0, 0]);
    }

    #[test]
    fn zstd_round_trip() {
        let config = Config::new(9, 2, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let matrix_path = dir.path().join("matrix_1.bmx");
        let index_path = dir.path().join("matrix_1.bmi");

        let mut writer = MatrixWriter::from_paths(
            ZstdBackend::new().unwrap(),
            &config,
            0,
            4,
            &matrix_path,
            &index_path,
            &[],
        )
        .unwrap();
        writer.push_row(0, &[0xAB, 0x01]).unwrap();
        writer.push_row(3, &[0xCD, 0x02]).unwrap();
        writer.finish().unwrap();

        let mut reader = MatrixReader::new(
            ZstdBackend::new().unwrap(),
            &config,
            0,
            &matrix_path,
            &index_path,
            0,
        )
        .unwrap();
        assert_eq!(reader.get_row(0).unwrap(), Some([0xABu8, 0x01].as_slice()));
        assert_eq!(reader.get_row(1).unwrap(), Some([0u8, 0].as_slice()));
        assert_eq!(reader.get_row(3).unwrap(), Some([0xCDu8, 0x02].as_slice()));
        assert!(reader.get_row(5).unwrap().is_none());
    }

    #[test]
    fn size_mismatch_on_non_final_block() {
        // write with 2 rows per block, read back expecting 3: the first
        // block decodes short although it is not the final one
        let write_config = Config::new(8, 2, 6).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (matrix_path, index_path) = write_matrix(
            &write_config,
            0,
            5,
            &[(0, &[1]), (1, &[2]), (2, &[3]), (3, &[4]), (4, &[5]), (5, &[6])],
            &[],
            &dir,
        );

        let read_config = Config::new(8, 3, 6).unwrap();
        let mut reader = MatrixReader::new(
            lzma(&read_config),
            &read_config,
            0,
            &matrix_path,
            &index_path,
            0,
        )
        .unwrap();
        let err = reader.get_row(0).unwrap_err();
        assert!(matches!(
            err,
            Error::ReadError(ReadError::SizeMismatch {
                block: 0,
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn randomized_round_trip() {
        use rand::rngs::SmallRng;
        use rand::{Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(0x5EED);
        let config = Config::new(64, 7, 3).unwrap();
        let row_size = config.row_size();
        let (min_key, max_key) = (1000u64, 1200u64);

        // strictly increasing random keys with random rows
        let mut rows: Vec<(u64, Vec<u8>)> = Vec::new();
        let mut key = min_key;
        while key <= max_key {
            if rng.random_bool(0.4) {
                let row: Vec<u8> = (0..row_size).map(|_| rng.random()).collect();
                rows.push((key, row));
            }
            key += rng.random_range(1..8);
        }

        let dir = tempfile::tempdir().unwrap();
        let matrix_path = dir.path().join("part_3.bmx");
        let index_path = dir.path().join("part_3.bmi");
        let mut writer = MatrixWriter::from_paths(
            lzma(&config),
            &config,
            min_key,
            max_key,
            &matrix_path,
            &index_path,
            &[],
        )
        .unwrap();
        for (key, row) in &rows {
            writer.push_row(*key, row).unwrap();
        }
        writer.finish().unwrap();

        let mut reader =
            MatrixReader::new(lzma(&config), &config, min_key, &matrix_path, &index_path, 0)
                .unwrap();

        let mut expected = vec![vec![0u8; row_size]; (max_key - min_key + 1) as usize];
        for (key, row) in &rows {
            expected[(key - min_key) as usize] = row.clone();
        }
        for key in min_key..=max_key {
            let row = reader.get_row(key).unwrap().unwrap();
            assert_eq!(row, expected[(key - min_key) as usize].as_slice());
        }

        let out_path = dir.path().join("dense");
        reader.decompress_all(&out_path).unwrap();
        let dense = std::fs::read(&out_path).unwrap();
        assert_eq!(dense, expected.concat());
    }
}
