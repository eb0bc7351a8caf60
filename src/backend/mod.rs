//! Pluggable block compression backends.
//!
//! A backend is selected once when a writer or reader is constructed and
//! compresses each block independently; decoding one block never requires
//! another. The writer and reader of a matrix must use the same backend
//! with the same parameters.

mod lzma;
mod zstd;

pub use lzma::LzmaBackend;
pub use zstd::ZstdBackend;

use crate::Result;

/// Uniform compress/decompress interface over the block codecs.
pub trait Backend {
    /// Worst-case compressed size for `len` input bytes.
    ///
    /// Output buffers sized with this bound make single-shot compression
    /// calls infallible on space.
    fn compress_bound(&self, len: usize) -> usize;

    /// Compresses `src` into `dst`, returning the compressed byte count.
    ///
    /// `dst` must hold at least [`compress_bound`](Backend::compress_bound)
    /// of `src.len()` bytes.
    fn compress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize>;

    /// Decompresses `src` into `dst`, returning the decoded byte count.
    ///
    /// `dst` must be sized to the expected decoded length; a short final
    /// block decodes to fewer bytes than `dst.len()`.
    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize>;
}
