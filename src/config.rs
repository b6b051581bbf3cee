use std::path::{Path, PathBuf};

use regex::Regex;

use crate::field::Field;

pub(crate) const PART_PREFIX: &str = "part";
pub(crate) const MAP_SUFFIX: &str = ".map";
pub(crate) const REDUCE_SUFFIX: &str = ".reduce_iter";

/// Settings of a single run, shared read only by every task of the run.
#[derive(Clone, Debug)]
pub(crate) struct Config {
    work_dir: PathBuf,
    field: Field,
    max_records: usize,
    tasks: usize,
    queue_size: usize,
    endl: String,
    ignore_lines: Option<Regex>,
}

impl Config {
    pub(crate) fn new(
        work_dir: PathBuf,
        field: Field,
        max_records: usize,
        tasks: usize,
        endl: String,
        ignore_lines: Option<Regex>,
    ) -> Config {
        let queue_size = 4096;
        Config {
            work_dir,
            field,
            max_records,
            tasks,
            queue_size,
            endl,
            ignore_lines,
        }
    }

    pub(crate) fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub(crate) fn field(&self) -> &Field {
        &self.field
    }

    pub(crate) fn max_records(&self) -> usize {
        self.max_records
    }

    pub(crate) fn tasks(&self) -> usize {
        self.tasks
    }

    pub(crate) fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub(crate) fn endl(&self) -> &str {
        self.endl.as_str()
    }

    pub(crate) fn ignore_lines(&self) -> &Option<Regex> {
        &self.ignore_lines
    }

    /// Path of the chunk produced by the partition phase for `part`
    pub(crate) fn map_path(&self, part: usize) -> PathBuf {
        self.work_dir.join(format!("{}{}{}", PART_PREFIX, part, MAP_SUFFIX))
    }

    /// Path of the file produced by merge round `depth` for pair `part`
    pub(crate) fn reduce_path(&self, part: usize, depth: usize) -> PathBuf {
        self.work_dir.join(format!("{}{}{}", PART_PREFIX, part, Self::reduce_suffix(depth)))
    }

    /// Suffix of the files produced by merge round `depth`
    pub(crate) fn reduce_suffix(depth: usize) -> String {
        format!("{}{}", REDUCE_SUFFIX, depth)
    }
}
