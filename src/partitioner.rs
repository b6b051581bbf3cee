use std::path::PathBuf;
use std::sync::Arc;

use crate::chunk_iterator::ChunkIterator;
use crate::config::Config;
use crate::error::SortError;
use crate::phase::Phase;
use crate::sort_command::SortCommand;

/// The partition phase: split the input into chunks of at most `max_records` records and sort
/// every chunk into `part<N>.map` in the working directory.
pub(crate) struct Partitioner {
    config: Arc<Config>,
}

impl Partitioner {
    pub(crate) fn new(config: Arc<Config>) -> Partitioner {
        Partitioner {
            config,
        }
    }

    /// Partition `input_files` in order, numbering chunks across files. Returns the number of
    /// chunks written. Empty input produces no chunks.
    pub(crate) fn partition(&self, input_files: &[PathBuf]) -> Result<usize, anyhow::Error> {
        if self.config.max_records() == 0 {
            return Err(SortError::configuration("max records must be positive").into());
        }

        // count every input before the first task starts
        let mut chunk_iterators = Vec::with_capacity(input_files.len());
        let mut parts = 0;
        for path in input_files {
            let chunk_iterator = ChunkIterator::new(path, self.config.max_records() as u64, parts + 1)?;
            log::info!(
                "Partition {}, records: {}, chunks: {}",
                path.display(),
                chunk_iterator.total(),
                chunk_iterator.chunks(),
            );
            parts += chunk_iterator.chunks() as usize;
            chunk_iterators.push(chunk_iterator);
        }

        let mut phase = Phase::new("partition", &self.config)?;
        for chunk_iterator in chunk_iterators {
            for chunk in chunk_iterator {
                let output = self.config.map_path(chunk.part());
                let sort_command = Box::new(
                    SortCommand::new(chunk, output, self.config.clone(), phase.state())
                );
                phase.submit(sort_command);
            }
        }
        phase.wait()?;
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::error::SortError;
    use crate::field::Field;
    use crate::partitioner::Partitioner;

    fn config(work_dir: PathBuf, max_records: usize) -> Arc<Config> {
        Arc::new(Config::new(work_dir, Field::new(0), max_records, 2, "\n".to_string(), None))
    }

    fn descending_input(dir: &std::path::Path) -> Result<PathBuf, anyhow::Error> {
        let input = dir.join("input.csv");
        let letters = "abcdefghij".chars();
        let lines: Vec<String> = (0..10).rev().zip(letters).map(|(n, l)| format!("{n},{l}\n")).collect();
        fs::write(&input, lines.concat())?;
        Ok(input)
    }

    #[test]
    fn test_partition_3_max() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let input = descending_input(dir.path())?;
        let work_dir = dir.path().join("work");
        fs::create_dir(&work_dir)?;
        let config = config(work_dir.clone(), 3);

        let parts = Partitioner::new(config.clone()).partition(&[input])?;
        assert_eq!(parts, 4);
        assert_eq!(fs::read_dir(&work_dir)?.count(), 4);
        assert_eq!(fs::read_to_string(config.map_path(1))?, "7,c\n8,b\n9,a\n");
        assert_eq!(fs::read_to_string(config.map_path(2))?, "4,f\n5,e\n6,d\n");
        assert_eq!(fs::read_to_string(config.map_path(3))?, "1,i\n2,h\n3,g\n");
        assert_eq!(fs::read_to_string(config.map_path(4))?, "0,j\n");
        Ok(())
    }

    #[test]
    fn test_partition_2_max() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let input = descending_input(dir.path())?;
        let work_dir = dir.path().join("work");
        fs::create_dir(&work_dir)?;

        let parts = Partitioner::new(config(work_dir.clone(), 2)).partition(&[input])?;
        assert_eq!(parts, 5);
        assert_eq!(fs::read_dir(&work_dir)?.count(), 5);
        Ok(())
    }

    #[test]
    fn test_partition_numbering_across_files() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let input = descending_input(dir.path())?;
        let work_dir = dir.path().join("work");
        fs::create_dir(&work_dir)?;
        let config = config(work_dir.clone(), 4);

        let parts = Partitioner::new(config.clone()).partition(&[input.clone(), input])?;
        assert_eq!(parts, 6);
        assert_eq!(fs::read_to_string(config.map_path(4))?, "6,d\n7,c\n8,b\n9,a\n");
        Ok(())
    }

    #[test]
    fn test_empty_input() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("empty.csv");
        fs::write(&input, "")?;
        let work_dir = dir.path().join("work");
        fs::create_dir(&work_dir)?;

        let parts = Partitioner::new(config(work_dir.clone(), 2)).partition(&[input])?;
        assert_eq!(parts, 0);
        assert_eq!(fs::read_dir(&work_dir)?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_zero_max_records() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let input = descending_input(dir.path())?;
        let result = Partitioner::new(config(dir.path().to_path_buf(), 0)).partition(&[input]);
        let e = result.unwrap_err();
        assert!(matches!(e.downcast_ref::<SortError>(), Some(SortError::Configuration(_))));
        Ok(())
    }

    #[test]
    fn test_malformed_record_fails_phase() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.csv");
        fs::write(&input, "1,a\n2,b\n3\n4,d\n")?;
        let work_dir = dir.path().join("work");
        fs::create_dir(&work_dir)?;
        let config = Arc::new(Config::new(work_dir.clone(), Field::new(1), 2, 1, "\n".to_string(), None));

        let e = Partitioner::new(config.clone()).partition(&[input]).unwrap_err();
        assert!(matches!(e.downcast_ref::<SortError>(), Some(SortError::PhaseFailure { .. })));
        assert!(e.chain().any(|c| matches!(c.downcast_ref::<SortError>(), Some(SortError::MalformedRecord { .. }))));
        assert!(!config.map_path(2).exists());
        Ok(())
    }
}
