/// Accumulates fixed-width rows until a block is full.
///
/// The unit of compression: a writer fills one of these, hands its bytes
/// to the backend, then resets it for the next block.
#[derive(Clone, Default)]
pub(crate) struct RowBlock {
    buf: Vec<u8>,
    row_size: usize,
    rows: u64,
    rows_per_block: u64,
}

impl RowBlock {
    pub(crate) fn new(row_size: usize, rows_per_block: u64) -> Self {
        Self {
            buf: Vec::with_capacity(row_size * rows_per_block as usize),
            row_size,
            rows: 0,
            rows_per_block,
        }
    }

    pub(crate) fn push(&mut self, row: &[u8]) {
        debug_assert_eq!(row.len(), self.row_size);
        debug_assert!(!self.is_full());
        self.buf.extend_from_slice(row);
        self.rows += 1;
    }

    pub(crate) fn push_zero(&mut self) {
        debug_assert!(!self.is_full());
        self.buf.resize(self.buf.len() + self.row_size, 0);
        self.rows += 1;
    }

    /// Bulk path for dense ingestion: appends whole rows at once.
    pub(crate) fn extend_rows(&mut self, chunk: &[u8]) {
        debug_assert_eq!(chunk.len() % self.row_size, 0);
        let rows = (chunk.len() / self.row_size) as u64;
        debug_assert!(self.rows + rows <= self.rows_per_block);
        self.buf.extend_from_slice(chunk);
        self.rows += rows;
    }

    pub(crate) fn is_full(&self) -> bool {
        self.rows == self.rows_per_block
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
        self.rows = 0;
    }
}
