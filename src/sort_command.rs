use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use command_executor::command::Command;

use crate::chunk_iterator::Chunk;
use crate::config::Config;
use crate::error::SortError;
use crate::line_record::LineRecord;
use crate::phase::PhaseState;
use crate::sort::{create_tmp_file, task_name};

/// Read one chunk of the input, sort it in memory and write it to `output`.
pub(crate) struct SortCommand {
    chunk: Chunk,
    output: PathBuf,
    config: Arc<Config>,
    state: Arc<PhaseState>,
}

impl SortCommand {
    pub(crate) fn new(chunk: Chunk, output: PathBuf, config: Arc<Config>, state: Arc<PhaseState>) -> SortCommand {
        SortCommand {
            chunk,
            output,
            config,
            state,
        }
    }

    fn read_records(&self, task: &str) -> Result<Vec<LineRecord>, anyhow::Error> {
        let io = |e: std::io::Error| SortError::worker_io(task, e);
        let path = self.chunk.path();
        let mut reader = BufReader::new(File::open(path).map_err(io)?);

        let mut skipped = Vec::new();
        for _ in 1..self.chunk.start() {
            if reader.read_until(b'\n', &mut skipped).map_err(io)? == 0 {
                break;
            }
            skipped.clear();
        }

        let mut line_records = Vec::with_capacity(self.chunk.records() as usize);
        let mut line = String::new();
        for n in 0..self.chunk.records() {
            if reader.read_line(&mut line).map_err(io)? == 0 {
                break;
            }
            let line_record = std::mem::take(&mut line);
            if let Some(r) = self.config.ignore_lines() {
                if r.is_match(line_record.trim_end_matches(&['\r', '\n'][..])) {
                    continue;
                }
            }
            let line_record = LineRecord::new(line_record, self.config.field())
                .with_context(||
                    format!(
                        "file: {}, record: {}",
                        path.display(),
                        self.chunk.start() + n,
                    )
                )?;
            line_records.push(line_record);
        }
        Ok(line_records)
    }

    fn write_sorted_chunk(&self, task: &str, chunk: &[LineRecord]) -> Result<(), anyhow::Error> {
        let io = |e: std::io::Error| SortError::worker_io(task, e);
        let tmp_file = create_tmp_file(&self.config)?;
        let mut buf_writer = BufWriter::new(tmp_file);
        for line_record in chunk {
            line_record.write_to(&mut buf_writer, self.config.endl()).map_err(io)?;
        }
        buf_writer.flush().map_err(io)?;
        let tmp_file = buf_writer.into_inner().map_err(|e| io(e.into_error()))?;
        tmp_file.persist(&self.output).map_err(|e| io(e.error))?;
        Ok(())
    }

    /// Sort the chunk, returns the number of records written
    pub(crate) fn sort(&self) -> Result<usize, anyhow::Error> {
        let task = task_name(&self.output);
        log::debug!(
            "Start sorting {} records from record {}, output: {}, thread: {}",
            self.chunk.records(),
            self.chunk.start(),
            task,
            thread::current().name().unwrap_or("unnamed"),
        );
        let mut chunk = self.read_records(&task)?;
        chunk.sort();
        self.write_sorted_chunk(&task, &chunk)?;
        log::debug!("Finish sorting {}, records: {}", task, chunk.len());
        Ok(chunk.len())
    }
}

impl Command for SortCommand {
    fn execute(&self) -> Result<(), anyhow::Error> {
        // failures are reported through the phase state
        self.state.run(&task_name(&self.output), || self.sort().map(|_| ()));
        Ok(())
    }
}
