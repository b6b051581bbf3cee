use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::config::{Config, MAP_SUFFIX};
use crate::merge_command::MergeCommand;
use crate::phase::Phase;
use crate::sorted_chunk_file::SortedChunkFile;

/// Result of the merge rounds
#[derive(Debug)]
pub(crate) struct Reduction {
    path: Option<PathBuf>,
    rounds: usize,
}

impl Reduction {
    /// The fully sorted file, None when there was nothing to merge
    pub(crate) fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub(crate) fn rounds(&self) -> usize {
        self.rounds
    }
}

/// Merge the sorted chunks of the working directory pairwise, round after round, until a single
/// file remains.
///
/// Round `depth` reads the files carrying the previous round's suffix (`.map` for the first round)
/// and writes `part<N>.reduce_iter<depth>`. Every round ends with a barrier, the next round lists
/// the directory only after all merges of the current one completed.
pub(crate) struct MergeCoordinator {
    config: Arc<Config>,
}

impl MergeCoordinator {
    pub(crate) fn new(config: Arc<Config>) -> MergeCoordinator {
        MergeCoordinator {
            config,
        }
    }

    pub(crate) fn reduce(&self) -> Result<Reduction, anyhow::Error> {
        self.reduce_round(MAP_SUFFIX.to_string(), 1)
    }

    fn reduce_round(&self, suffix: String, depth: usize) -> Result<Reduction, anyhow::Error> {
        let mut files = SortedChunkFile::discover(self.config.work_dir(), &suffix)?;
        log::info!("Merge round {}, input suffix: {}, files: {}", depth, suffix, files.len());
        if files.len() <= 1 {
            return Ok(
                Reduction {
                    path: files.pop().map(|f| f.path().clone()),
                    rounds: depth - 1,
                }
            );
        }

        // an odd file out moves to the next round unchanged
        if files.len() % 2 == 1 {
            if let Some(last) = files.pop() {
                let carried = self.config.reduce_path(files.len() / 2 + 1, depth);
                std::fs::rename(last.path(), &carried)
                    .with_context(|| format!("carry {} forward to {}", last.path().display(), carried.display()))?;
                log::debug!("Carried {} forward to {}", last.path().display(), carried.display());
            }
        }

        let mut phase = Phase::new(&format!("merge-round-{}", depth), &self.config)?;
        for (i, pair) in files.chunks_exact(2).enumerate() {
            let merge_command = Box::new(
                MergeCommand::new(
                    pair[0].path().clone(),
                    pair[1].path().clone(),
                    self.config.reduce_path(i + 1, depth),
                    self.config.clone(),
                    phase.state(),
                )
            );
            phase.submit(merge_command);
        }
        phase.wait()
            .with_context(|| format!("merge round {}", depth))?;

        self.reduce_round(Config::reduce_suffix(depth), depth + 1)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::error::SortError;
    use crate::field::Field;
    use crate::merge_coordinator::MergeCoordinator;

    fn config(work_dir: &Path) -> Arc<Config> {
        Arc::new(Config::new(work_dir.to_path_buf(), Field::new(0), 2, 2, "\n".to_string(), None))
    }

    fn write_chunks(config: &Config, chunks: &[&str]) -> Result<(), anyhow::Error> {
        for (i, chunk) in chunks.iter().enumerate() {
            fs::write(config.map_path(i + 1), chunk)?;
        }
        Ok(())
    }

    #[test]
    fn test_single_file_is_terminal() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = config(dir.path());
        write_chunks(&config, &["1,a\n2,b\n"])?;
        let reduction = MergeCoordinator::new(config.clone()).reduce()?;
        assert_eq!(reduction.rounds(), 0);
        assert_eq!(reduction.path(), Some(&config.map_path(1)));
        Ok(())
    }

    #[test]
    fn test_no_files() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let reduction = MergeCoordinator::new(config(dir.path())).reduce()?;
        assert!(reduction.path().is_none());
        assert_eq!(reduction.rounds(), 0);
        Ok(())
    }

    #[test]
    fn test_odd_chunk_count() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = config(dir.path());
        write_chunks(&config, &["8,a\n9,a\n", "6,a\n7,a\n", "4,a\n5,a\n", "2,a\n3,a\n", "0,a\n1,a\n"])?;
        let reduction = MergeCoordinator::new(config.clone()).reduce()?;
        assert_eq!(reduction.rounds(), 3);
        let path = reduction.path().unwrap();
        assert_eq!(path, &config.reduce_path(1, 3));
        let expected: String = (0..10).map(|i| format!("{i},a\n")).collect();
        assert_eq!(fs::read_to_string(path)?, expected);
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_round_count_formula() -> Result<(), anyhow::Error> {
        for (chunks, rounds) in [(1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (16, 4), (17, 5)] {
            let dir = tempfile::tempdir()?;
            let config = config(dir.path());
            for i in 1..=chunks {
                fs::write(config.map_path(i), format!("{:03},x\n", chunks - i))?;
            }
            let reduction = MergeCoordinator::new(config.clone()).reduce()?;
            assert_eq!(reduction.rounds(), rounds, "chunks: {}", chunks);
            let lines = fs::read_to_string(reduction.path().unwrap())?;
            assert_eq!(lines.lines().count(), chunks);
        }
        Ok(())
    }

    #[test]
    fn test_ties_keep_chunk_order() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = config(dir.path());
        write_chunks(&config, &["k,1\n", "k,2\n", "j,3\nk,3\n"])?;
        let reduction = MergeCoordinator::new(config.clone()).reduce()?;
        let merged = fs::read_to_string(reduction.path().unwrap())?;
        assert_eq!(merged, "j,3\nk,1\nk,2\nk,3\n");
        Ok(())
    }

    #[test]
    fn test_failed_merge_stops_rounds() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let config = Arc::new(Config::new(dir.path().to_path_buf(), Field::new(1), 2, 1, "\n".to_string(), None));
        write_chunks(&config, &["1,a\n", "broken\n", "2,b\n", "3,c\n"])?;
        let e = MergeCoordinator::new(config.clone()).reduce().unwrap_err();
        assert!(matches!(e.downcast_ref::<SortError>(), Some(SortError::PhaseFailure { .. })));
        assert!(!config.reduce_path(1, 1).exists());
        assert!(!config.reduce_path(1, 2).exists());
        Ok(())
    }
}
