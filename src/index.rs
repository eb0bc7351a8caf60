use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use sucds::mii_sequences::{EliasFano, EliasFanoBuilder};
use sucds::Serializable;

use crate::error::{FormatError, ReadError};
use crate::Result;

/// Succinct index over the cumulative compressed-byte offsets of a matrix.
///
/// Holds `block_count + 1` monotone values, first entry 0; block *i* spans
/// bytes `[nth(i), nth(i+1))` of the matrix payload. Encoded as an
/// Elias-Fano sequence so space stays near the information-theoretic bound
/// for N values bounded by the total compressed size, while `nth` stays
/// near-constant time. The index is resident in memory for the lifetime of
/// a reader; the block payloads are not.
#[derive(Debug)]
pub struct BlockOffsets {
    ef: EliasFano,
}

impl BlockOffsets {
    /// Builds the index from the complete offset sequence.
    pub fn from_offsets(offsets: &[u64]) -> Result<Self> {
        let universe = offsets.last().map_or(0, |last| *last as usize) + 1;
        let mut builder = EliasFanoBuilder::new(universe, offsets.len())?;
        builder.extend(offsets.iter().map(|offset| *offset as usize))?;
        Ok(Self { ef: builder.build() })
    }

    /// The i-th offset, or `None` past the end.
    #[must_use]
    pub fn nth(&self, i: usize) -> Option<u64> {
        self.ef.select(i).map(|offset| offset as u64)
    }

    /// Compressed byte span of block `i`.
    pub fn block_span(&self, i: usize) -> Result<(u64, u64)> {
        let start = self.nth(i).ok_or(ReadError::MissingOffset(i))?;
        let end = self.nth(i + 1).ok_or(ReadError::MissingOffset(i + 1))?;
        Ok((start, end))
    }

    /// Number of offset entries (`block_count + 1`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.ef.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ef.len() == 0
    }

    /// Number of blocks spanned by the index.
    #[must_use]
    pub fn num_blocks(&self) -> usize {
        self.len().saturating_sub(1)
    }

    /// Serializes as `[u64 LE entry count][Elias-Fano encoding]`.
    pub fn write_into<W: io::Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.len() as u64)?;
        self.ef.serialize_into(writer)?;
        Ok(())
    }

    pub fn read_from<R: io::Read>(mut reader: R) -> Result<Self> {
        let stored = reader.read_u64::<LittleEndian>()?;
        let ef = EliasFano::deserialize_from(reader)?;
        if ef.len() as u64 != stored {
            return Err(FormatError::IndexEntryCount {
                stored,
                decoded: ef.len() as u64,
            }
            .into());
        }
        Ok(Self { ef })
    }
}
