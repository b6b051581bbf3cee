use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::SortError;
use crate::field::Field;
use crate::line_record::LineRecord;

/// Sequential reader over a sorted chunk file that keeps exactly one record, the head, in memory.
#[derive(Debug)]
pub(crate) struct UnmergedChunkFile {
    path: PathBuf,
    reader: BufReader<File>,
    head: Option<LineRecord>,
    field: Field,
    records: u64,
}

impl UnmergedChunkFile {
    pub(crate) fn new(path: &Path, field: &Field) -> Result<UnmergedChunkFile, anyhow::Error> {
        let file = File::open(path)
            .map_err(|e| SortError::worker_io(&path.display().to_string(), e))?;
        let mut unmerged_chunk_file = UnmergedChunkFile {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            head: None,
            field: field.clone(),
            records: 0,
        };
        unmerged_chunk_file.head = unmerged_chunk_file.read_next()?;
        Ok(unmerged_chunk_file)
    }

    fn read_next(&mut self) -> Result<Option<LineRecord>, anyhow::Error> {
        let mut line = String::new();
        let bytes = self.reader.read_line(&mut line)
            .map_err(|e| SortError::worker_io(&self.path.display().to_string(), e))?;
        if bytes == 0 {
            return Ok(None);
        }
        self.records += 1;
        let line_record = LineRecord::new(line, &self.field)
            .with_context(|| format!("file: {}, record: {}", self.path.display(), self.records))?;
        Ok(Some(line_record))
    }

    pub(crate) fn head(&self) -> Option<&LineRecord> {
        self.head.as_ref()
    }

    /// Take the head record and read the next one in its place
    pub(crate) fn pop(&mut self) -> Result<Option<LineRecord>, anyhow::Error> {
        if self.head.is_none() {
            return Ok(None);
        }
        let next = self.read_next()?;
        Ok(std::mem::replace(&mut self.head, next))
    }

    pub(crate) fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::field::Field;
    use crate::unmerged_chunk_file::UnmergedChunkFile;

    #[test]
    fn test_pop_all() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("part1.map");
        fs::write(&path, "a,1\r\nb,2\nc,3")?;
        let mut file = UnmergedChunkFile::new(&path, &Field::new(0))?;
        let mut lines = Vec::new();
        while let Some(record) = file.pop()? {
            lines.push(record.line().to_string());
        }
        assert_eq!(lines, vec!["a,1", "b,2", "c,3"]);
        assert!(file.head().is_none());
        assert!(file.pop()?.is_none());
        Ok(())
    }

    #[test]
    fn test_empty_file() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("part1.map");
        fs::write(&path, "")?;
        let file = UnmergedChunkFile::new(&path, &Field::new(0))?;
        assert!(file.head().is_none());
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = UnmergedChunkFile::new(&dir.path().join("part9.map"), &Field::new(0));
        assert!(result.is_err());
    }
}
