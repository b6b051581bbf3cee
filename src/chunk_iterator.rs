use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

/// A slice of the input: `records` records starting at record `start` (1 based).
#[derive(Debug)]
pub(crate) struct Chunk {
    part: usize,
    start: u64,
    records: u64,
    path: PathBuf,
}

impl Chunk {
    pub(crate) fn new(part: usize, start: u64, records: u64, path: PathBuf) -> Chunk {
        Chunk {
            part,
            start,
            records,
            path,
        }
    }

    pub(crate) fn part(&self) -> usize {
        self.part
    }

    pub(crate) fn start(&self) -> u64 {
        self.start
    }

    pub(crate) fn records(&self) -> u64 {
        self.records
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Split an input file into chunks of at most `max_records` records each. Chunks are numbered
/// from `first_part`.
pub(crate) struct ChunkIterator {
    path: PathBuf,
    total: u64,
    max_records: u64,
    first_part: usize,
    emitted: u64,
}

impl ChunkIterator {
    pub(crate) fn new(path: &Path, max_records: u64, first_part: usize) -> Result<ChunkIterator, anyhow::Error> {
        if max_records == 0 {
            return Err(anyhow!("max records must be positive"));
        }
        let total = count_records(path)?;
        Ok(
            ChunkIterator {
                path: path.to_path_buf(),
                total,
                max_records,
                first_part,
                emitted: 0,
            }
        )
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    /// Number of chunks, ceil(total / max_records)
    pub(crate) fn chunks(&self) -> u64 {
        (self.total + self.max_records - 1) / self.max_records
    }
}

impl Iterator for ChunkIterator {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.emitted * self.max_records;
        if start >= self.total {
            None
        } else {
            let part = self.first_part + self.emitted as usize;
            self.emitted += 1;
            let records = self.max_records.min(self.total - start);
            Some(Chunk::new(part, start + 1, records, self.path.clone()))
        }
    }
}

/// Count the lines of a file. A last line without a terminator counts as a line.
pub(crate) fn count_records(path: &Path) -> Result<u64, anyhow::Error> {
    let file = File::open(path)
        .with_context(|| anyhow!("path: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut count = 0;
    let mut line = Vec::new();
    while reader.read_until(b'\n', &mut line)
        .with_context(|| anyhow!("path: {}", path.display()))? != 0 {
        count += 1;
        line.clear();
    }
    Ok(count)
}
