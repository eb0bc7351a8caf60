use zstd::zstd_safe;

use crate::error::BackendError;
use crate::Result;

/// ZSTD backend pinned to the maximum compression level.
///
/// Holds one compression and one decompression context for its lifetime;
/// both are released on drop.
pub struct ZstdBackend {
    cctx: zstd_safe::CCtx<'static>,
    dctx: zstd_safe::DCtx<'static>,
}

impl ZstdBackend {
    pub fn new() -> Result<Self> {
        let mut cctx = zstd_safe::CCtx::create();
        let level = *zstd::compression_level_range().end();
        cctx.set_parameter(zstd_safe::CParameter::CompressionLevel(level))
            .map_err(|e| BackendError::Zstd(zstd_safe::get_error_name(e).to_string()))?;

        Ok(Self {
            cctx,
            dctx: zstd_safe::DCtx::create(),
        })
    }
}

impl super::Backend for ZstdBackend {
    fn compress_bound(&self, len: usize) -> usize {
        zstd_safe::compress_bound(len)
    }

    fn compress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        self.cctx
            .compress2(dst, src)
            .map_err(|e| BackendError::Zstd(zstd_safe::get_error_name(e).to_string()).into())
    }

    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        self.dctx
            .decompress(dst, src)
            .map_err(|e| BackendError::Zstd(zstd_safe::get_error_name(e).to_string()).into())
    }
}
