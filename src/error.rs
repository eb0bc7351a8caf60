/// Custom Result type for bitmat operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the bitmat library.
///
/// Every failure is terminal to the current partition's processing; there
/// are no retries or partial recovery inside the engine.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Errors from validating configuration parameters
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    /// Errors from out-of-order or out-of-bounds keys
    #[error("Invalid hash sequence: {0}")]
    HashError(#[from] HashError),

    /// Errors raised by a compression backend
    #[error("Compression backend failure: {0}")]
    BackendError(#[from] BackendError),

    /// Errors that occur while decoding blocks
    #[error("Error reading matrix: {0}")]
    ReadError(#[from] ReadError),

    /// Errors from malformed input or index files
    #[error("Invalid file format: {0}")]
    FormatError(#[from] FormatError),

    /// Errors from the succinct offset-index codec
    #[error("Offset index error: {0}")]
    IndexError(#[from] anyhow::Error),

    /// Standard I/O errors
    #[error("Error with IO: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors from validating configuration parameters
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The sample count must be positive
    #[error("Number of samples must be at least 1")]
    InvalidSampleCount,

    /// The compression preset is outside the supported scale
    #[error("Preset compression level shall be in [0;9], got {0}")]
    InvalidPreset(u8),

    /// The rows-per-block value must be positive
    #[error("The number of rows per block shall be at least 1")]
    InvalidRowsPerBlock,

    /// A configuration line does not follow `property = value`
    #[error("Invalid format for property, received: '{0}'")]
    InvalidLine(String),

    /// A configuration key is not recognized
    #[error("Unknown property: '{0}'")]
    UnknownProperty(String),

    /// A required configuration key is absent
    #[error("Missing property: '{0}'")]
    MissingProperty(&'static str),

    /// The hash-bounds file has no entry for the requested partition
    #[error("No hash bounds found for partition {0}")]
    UnknownPartition(u64),
}

/// Errors from out-of-order or out-of-bounds keys presented to a writer
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The key lies outside the partition's bounds
    #[error("Key {key} out of partition bounds [{min}, {max}]")]
    OutOfBounds { key: u64, min: u64, max: u64 },

    /// The key is smaller than the previously accepted key
    #[error("Key {key} decreases after previous key {previous}")]
    Decreasing { key: u64, previous: u64 },

    /// The key repeats the previously accepted key
    ///
    /// Only the very first row accepted by a writer may coincide with the
    /// initial previous-key value (the partition minimum).
    #[error("Key {0} repeats the previous key")]
    Repeated(u64),
}

/// Errors raised by a compression backend
///
/// Each kind maps a distinct failure of the underlying codec; none are
/// recoverable by the caller.
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    /// Backend parameters were rejected (preset, dictionary size, level)
    #[error("Invalid backend options")]
    InvalidOptions,

    /// The output buffer cannot hold the (de)compressed data
    #[error("Output buffer too small for block")]
    BufferTooSmall,

    /// The backend could not allocate working memory
    #[error("Backend allocation failure")]
    AllocationFailed,

    /// The compressed stream is corrupt or truncated
    #[error("Corrupt compressed stream: {0}")]
    CorruptStream(String),

    /// A ZSTD call failed
    #[error("ZSTD failure: {0}")]
    Zstd(String),
}

impl From<liblzma::stream::Error> for BackendError {
    fn from(err: liblzma::stream::Error) -> Self {
        use liblzma::stream::Error;
        match err {
            Error::Mem | Error::MemLimit => Self::AllocationFailed,
            Error::Options | Error::Format | Error::Program => Self::InvalidOptions,
            other => Self::CorruptStream(other.to_string()),
        }
    }
}

/// Errors that occur while decoding blocks from a matrix file
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// A non-final block decoded to an unexpected size
    #[error("Block {block} decoded to {got} bytes (expected {expected})")]
    SizeMismatch {
        block: usize,
        expected: usize,
        got: usize,
    },

    /// The offset index has no entry at the requested position
    #[error("Missing offset index entry {0}")]
    MissingOffset(usize),
}

/// Errors from malformed input or index files
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// The input payload is not a whole number of records
    #[error("Input payload of {len} bytes is not a multiple of the record size {record}")]
    TruncatedInput { len: u64, record: u64 },

    /// A dense input does not hold one row per key in the partition
    #[error("Input holds {rows} rows but the partition spans {expected} keys")]
    RowCountMismatch { rows: u64, expected: u64 },

    /// A source filename carries no trailing partition digits
    #[error("Cannot derive a partition number from filename: {0}")]
    MissingPartition(String),

    /// A row or abundance vector has the wrong width
    #[error("Row of {got} bytes does not match the configured row size {expected}")]
    RowSize { expected: usize, got: usize },

    /// An abundance vector does not cover every sample
    #[error("Abundance vector of {got} entries does not match the sample count {expected}")]
    SampleCount { expected: usize, got: usize },

    /// The index file's entry count disagrees with the decoded structure
    #[error("Index declares {stored} entries but encodes {decoded}")]
    IndexEntryCount { stored: u64, decoded: u64 },
}
