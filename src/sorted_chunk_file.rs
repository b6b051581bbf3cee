use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::PART_PREFIX;

/// A sorted chunk file of a merge round, named `part<N><suffix>`
#[derive(Debug)]
pub(crate) struct SortedChunkFile {
    path: PathBuf,
    part: usize,
}

impl SortedChunkFile {
    pub(crate) fn new(path: PathBuf, part: usize) -> SortedChunkFile {
        SortedChunkFile {
            path,
            part,
        }
    }

    /// Recognize `path` as a chunk file carrying exactly `suffix`
    pub(crate) fn parse(path: &Path, suffix: &str) -> Option<SortedChunkFile> {
        let name = path.file_name()?.to_str()?;
        let digits = name.strip_prefix(PART_PREFIX)?.strip_suffix(suffix)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let part = digits.parse().ok()?;
        Some(SortedChunkFile::new(path.to_path_buf(), part))
    }

    /// List the chunk files in `dir` carrying `suffix`, ordered by part number
    pub(crate) fn discover(dir: &Path, suffix: &str) -> Result<Vec<SortedChunkFile>, anyhow::Error> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("list directory: {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("list directory: {}", dir.display()))?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(file) = SortedChunkFile::parse(&entry.path(), suffix) {
                files.push(file);
            }
        }
        files.sort();
        Ok(files)
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Eq for SortedChunkFile {}

impl PartialEq<Self> for SortedChunkFile {
    fn eq(&self, other: &Self) -> bool {
        self.part.eq(&other.part)
    }
}

impl PartialOrd<Self> for SortedChunkFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortedChunkFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.part.cmp(&other.part)
    }
}
