use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use command_executor::command::Command;

use crate::config::Config;
use crate::error::SortError;
use crate::phase::PhaseState;
use crate::sort::{create_tmp_file, task_name};
use crate::unmerged_chunk_file::UnmergedChunkFile;

/// Merge two sorted chunk files into `output`, streaming both inputs.
///
/// Records with equal keys are taken from `first` before `second`. The inputs are removed once
/// the output is in place.
pub(crate) struct MergeCommand {
    first: PathBuf,
    second: PathBuf,
    output: PathBuf,
    config: Arc<Config>,
    state: Arc<PhaseState>,
}

impl MergeCommand {
    pub(crate) fn new(first: PathBuf, second: PathBuf, output: PathBuf, config: Arc<Config>, state: Arc<PhaseState>) -> MergeCommand {
        MergeCommand {
            first,
            second,
            output,
            config,
            state,
        }
    }

    /// Merge the inputs, returns the number of records written
    pub(crate) fn merge(&self) -> Result<u64, anyhow::Error> {
        let task = task_name(&self.output);
        let io = |e: std::io::Error| SortError::worker_io(&task, e);
        log::debug!(
            "Start merging {} with {} into {}, thread: {}",
            self.first.display(),
            self.second.display(),
            task,
            thread::current().name().unwrap_or("unnamed"),
        );

        let mut first = UnmergedChunkFile::new(&self.first, self.config.field())?;
        let mut second = UnmergedChunkFile::new(&self.second, self.config.field())?;
        let mut merged_writer = BufWriter::new(create_tmp_file(&self.config)?);
        let mut merged_len: u64 = 0;

        loop {
            let take_first = match (first.head(), second.head()) {
                (None, None) => break,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(a), Some(b)) => a <= b,
            };
            let line_record = if take_first {
                first.pop()?
            } else {
                second.pop()?
            };
            if let Some(line_record) = line_record {
                line_record.write_to(&mut merged_writer, self.config.endl()).map_err(io)?;
                merged_len += 1;
            }
        }

        merged_writer.flush().map_err(io)?;
        let merged_file = merged_writer.into_inner().map_err(|e| io(e.into_error()))?;
        merged_file.persist(&self.output).map_err(|e| io(e.error))?;

        std::fs::remove_file(first.path()).map_err(io)?;
        std::fs::remove_file(second.path()).map_err(io)?;
        log::debug!("Finish merging into {}, merged length: {} lines", task, merged_len);
        Ok(merged_len)
    }
}

impl Command for MergeCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        // failures are reported through the phase state
        self.state.run(&task_name(&self.output), || self.merge().map(|_| ()));
        Ok(())
    }
}
