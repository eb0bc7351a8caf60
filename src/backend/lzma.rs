use liblzma::stream::{Action, Filters, LzmaOptions, Status, Stream};

use crate::error::BackendError;
use crate::{Result, MAX_DICT_SIZE};

/// Raw headerless LZMA1 backend.
///
/// Blocks are encoded as bare LZMA1 streams with no container framing, so
/// the filter chain (preset and dictionary size) is the only shared state
/// between writer and reader. The dictionary is sized to
/// `min(MAX_DICT_SIZE, block_decoded_size)` so memory follows the
/// configured block size.
pub struct LzmaBackend {
    filters: Filters,
}

impl LzmaBackend {
    /// Builds the filter chain for a preset in `[0, 9]` and the decoded
    /// block size the matrix was configured with.
    pub fn new(preset: u8, block_decoded_size: usize) -> Result<Self> {
        if preset > 9 {
            return Err(BackendError::InvalidOptions.into());
        }
        let mut options =
            LzmaOptions::new_preset(u32::from(preset)).map_err(BackendError::from)?;
        let dict_size = MAX_DICT_SIZE.min(block_decoded_size.try_into().unwrap_or(u32::MAX));
        // lzma rejects dictionaries under 4 KiB
        options.dict_size(dict_size.max(1 << 12));

        let mut filters = Filters::new();
        filters.lzma1(&options);
        Ok(Self { filters })
    }

    fn run(&self, mut stream: Stream, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        loop {
            let consumed = stream.total_in() as usize;
            let produced = stream.total_out() as usize;
            let status = stream
                .process(&src[consumed..], &mut dst[produced..], Action::Finish)
                .map_err(BackendError::from)?;

            let in_now = stream.total_in() as usize;
            let out_now = stream.total_out() as usize;
            match status {
                Status::StreamEnd => return Ok(out_now),
                _ if in_now == consumed && out_now == produced => {
                    // no forward progress left
                    if in_now == src.len() {
                        return Ok(out_now);
                    }
                    return Err(BackendError::BufferTooSmall.into());
                }
                _ => {}
            }
        }
    }
}

impl super::Backend for LzmaBackend {
    fn compress_bound(&self, len: usize) -> usize {
        // mirrors lzma_stream_buffer_bound()
        len + len / 3 + 128
    }

    fn compress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        let stream = Stream::new_raw_encoder(&self.filters).map_err(BackendError::from)?;
        self.run(stream, src, dst)
    }

    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize> {
        let stream = Stream::new_raw_decoder(&self.filters).map_err(BackendError::from)?;
        self.run(stream, src, dst)
    }
}
