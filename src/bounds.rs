use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use crate::error::ConfigError;
use crate::Result;

/// Key bounds for every partition of a matrix run.
///
/// Parsed from a whitespace-separated text file with one line per
/// partition:
///
/// ```text
/// 0 0 1048575
/// 1 1048576 2097151
/// ```
///
/// Each line reads `<partition> <min_key> <max_key>`. Keys presented to a
/// partition's writer must lie within its bounds.
#[derive(Debug, Clone, Default)]
pub struct HashBounds {
    entries: HashMap<u64, (u64, u64)>,
}

impl HashBounds {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let handle = fs::File::open(path).map(io::BufReader::new)?;
        Self::from_reader(handle)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut fields = trimmed.split_whitespace().map(str::parse::<u64>);
            let (Some(Ok(partition)), Some(Ok(min)), Some(Ok(max)), None) = (
                fields.next(),
                fields.next(),
                fields.next(),
                fields.next(),
            ) else {
                return Err(ConfigError::InvalidLine(line.clone()).into());
            };
            entries.insert(partition, (min, max));
        }
        Ok(Self { entries })
    }

    /// Returns `(min_key, max_key)` for a partition.
    pub fn get(&self, partition: u64) -> Result<(u64, u64)> {
        self.entries
            .get(&partition)
            .copied()
            .ok_or_else(|| ConfigError::UnknownPartition(partition).into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
