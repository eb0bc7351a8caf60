//! # bitmat
//!
//! Block-compressed storage for sparse presence/absence bit-matrices.
//!
//! A matrix holds one fixed-width packed-bit row per 64-bit key (e.g. a
//! k-mer hash). Rows arrive in increasing key order, are grouped into
//! fixed-row-count blocks, and each block is compressed independently so
//! that any single row can be recovered by decoding exactly one block.
//!
//! ## File structure
//!
//! Each partition produces two files:
//!
//! ```text
//! matrix file (.bmx)
//! ┌──────────────────────┐
//! │ preserved header     │ optional, copied verbatim from the source
//! ├──────────────────────┤
//! │ compressed block 0   │
//! ├──────────────────────┤
//! │ compressed block 1   │ no per-block length prefixes
//! ├──────────────────────┤
//! │ ...                  │
//! └──────────────────────┘
//!
//! index file (.bmi)
//! ┌──────────────────────┐
//! │ entry count (u64 LE) │
//! ├──────────────────────┤
//! │ Elias-Fano offsets   │ cumulative compressed byte counts,
//! └──────────────────────┘ one per block boundary, first entry 0
//! ```
//!
//! Block boundaries are recovered from the index alone: block *i* spans
//! bytes `[offset[i], offset[i+1])` of the matrix file. The index is kept
//! resident for the lifetime of a reader while block payloads stay on disk,
//! so it uses a succinct monotone encoding rather than a flat `u64` array.
//!
//! ## Compression backends
//!
//! Two interchangeable backends implement [`Backend`]: raw headerless LZMA1
//! ([`LzmaBackend`], preset 0-9, dictionary sized to the block) and ZSTD
//! ([`ZstdBackend`], maximum level, reusable contexts). The backend is
//! chosen once at construction and must match between writer and reader.

mod backend;
mod block;
mod bounds;
mod config;
mod error;
mod index;
mod ingest;
mod read;
mod write;

pub use backend::{Backend, LzmaBackend, ZstdBackend};
pub use bounds::HashBounds;
pub use config::Config;
pub use error::{BackendError, ConfigError, Error, FormatError, HashError, ReadError, Result};
pub use index::BlockOffsets;
pub use ingest::{compress_dense, compress_sparse, partition_from_path};
pub use read::MatrixReader;
pub use write::MatrixWriter;

/// File extension of compressed matrix files.
pub const MATRIX_EXTENSION: &str = "bmx";

/// File extension of block-offset index files.
pub const INDEX_EXTENSION: &str = "bmi";

/// Upper cap on the LZMA dictionary size (64 MiB).
///
/// The effective dictionary is the smaller of this cap and the decoded
/// block size, so memory scales with the configured block, not the cap.
pub const MAX_DICT_SIZE: u32 = 1 << 26;
