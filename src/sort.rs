use std::cmp::max;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use regex::Regex;
use rlimit::{getrlimit, Resource, setrlimit};
use tempfile::{Builder, NamedTempFile, TempDir};

use crate::config::Config;
use crate::error::SortError;
use crate::field::Field;
use crate::line_record::LineRecord;
use crate::merge_coordinator::MergeCoordinator;
use crate::partitioner::Partitioner;

/// Create a temporary file in the working directory. The file is removed when dropped, chunk
/// writers persist it under its final name once it is complete.
pub(crate) fn create_tmp_file(config: &Config) -> Result<NamedTempFile, anyhow::Error> {
    Builder::new()
        .prefix(".part-")
        .suffix(".partial")
        .tempfile_in(config.work_dir())
        .with_context(|| anyhow!("Failed to create new temp file in {}", config.work_dir().display()))
}

pub(crate) fn task_name(output: &Path) -> String {
    output.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| output.display().to_string())
}

/// Sort a delimited record file by one field using an external merge sort
///
/// The input is split into chunks of at most `max_records` records that are sorted in memory
/// concurrently. The sorted chunks are then merged pairwise in rounds, concurrently within a
/// round, until a single sorted file remains which is moved to the output path.
///
/// The sort is stable: records with equal keys keep their input order.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use csv_file_sort::field::Field;
/// use csv_file_sort::sort::Sort;
///
/// fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut csv_file_sort = Sort::new(vec![input], output);
///     // sort by the second field
///     csv_file_sort.with_field(Field::new(1));
///     // hold at most 100,000 records in memory per task
///     csv_file_sort.with_max_records(100_000);
///     // set number of CPU cores the sort will attempt to use. The default is to use all
///     // available cores.
///     csv_file_sort.with_tasks(2);
///     // set the directory for intermediate results. The default is the system temp dir -
///     // std::env::temp_dir(). Each run creates its own subdirectory there.
///     csv_file_sort.with_tmp_dir(tmp);
///     csv_file_sort.sort()
/// }
/// ```
pub struct Sort {
    input_files: Vec<PathBuf>,
    output: PathBuf,
    tmp: PathBuf,
    tasks: usize,
    field: Field,
    max_records: usize,
    endl: String,
    ignore_lines: Option<Regex>,
    keep_tmp: bool,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// * intermediate files are created in a new subdirectory of std::env::temp_dir()
    /// * the sort key is the first field (`Field::new(0)`), ',' separated, '"' quoted
    /// * at most 1,000,000 records per chunk
    /// * all available cores are used
    /// * lines are terminated by '\n' in the output
    /// * no lines are ignored
    /// * the run directory is removed when the sort completes
    ///
    /// Multiple input files are sorted as if they were concatenated in the given order.
    pub fn new(input_files: Vec<PathBuf>, output: PathBuf) -> Sort {
        Sort {
            input_files,
            output,
            tmp: std::env::temp_dir(),
            tasks: 0,
            field: Field::new(0),
            max_records: 1_000_000,
            endl: "\n".to_string(),
            ignore_lines: None,
            keep_tmp: false,
        }
    }

    /// Set directory for intermediate files. By default use std::env::temp_dir()
    /// It is recommended for large files to use a directory on the same file system as the
    /// output target.
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the number of tasks. The default is zero which will result in using all system cores
    pub fn with_tasks(&mut self, tasks: usize) {
        self.tasks = tasks;
    }

    /// Set the sort field
    pub fn with_field(&mut self, field: Field) {
        self.field = field;
    }

    /// Set the index of the sort field, starting at 0
    pub fn with_field_index(&mut self, index: usize) {
        self.field = self.field.clone().with_index(index);
    }

    /// Set the field separator. The default is ','
    pub fn with_field_separator(&mut self, field_separator: char) {
        self.field = self.field.clone().with_separator(field_separator);
    }

    /// Set the maximum number of records held in memory by a single sort task
    pub fn with_max_records(&mut self, max_records: usize) {
        self.max_records = max_records;
    }

    /// Set the output line terminator, either "\n" or "\r\n". Input lines may end with either.
    pub fn with_endl(&mut self, endl: &str) {
        self.endl = endl.to_string();
    }

    /// Specify which lines to ignore. Each line matching the regex will be ignored and will not
    /// appear in the output.
    pub fn with_ignore_lines(&mut self, r: Regex) {
        self.ignore_lines = Some(r)
    }

    /// Keep the run directory with the intermediate files after the sort
    pub fn with_keep_tmp(&mut self, keep_tmp: bool) {
        self.keep_tmp = keep_tmp;
    }

    /// Sort the input files into the output file. An existing output file is replaced. When the
    /// sort fails the output file is not created.
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        log::info!("Start sort, inputs: {:?}, output: {}", self.input_files, self.output.display());
        self.validate()?;
        self.with_run_dir(|config| {
            let parts = Partitioner::new(config.clone()).partition(&self.input_files)?;
            log::info!("Partitioned input into {} sorted chunks", parts);
            Self::reduce_to_output(config, &self.output)
        })?;
        log::info!("Finish sort, output: {}", self.output.display());
        Ok(())
    }

    /// Merge input files that are already sorted by the sort field into the output file.
    pub fn merge(&self) -> Result<(), anyhow::Error> {
        log::info!("Start merge, inputs: {:?}, output: {}", self.input_files, self.output.display());
        self.validate()?;
        self.with_run_dir(|config| {
            for (i, path) in self.input_files.iter().enumerate() {
                let part = config.map_path(i + 1);
                std::fs::copy(path, &part)
                    .with_context(|| anyhow!("Copy {} to {}", path.display(), part.display()))?;
            }
            Self::reduce_to_output(config, &self.output)
        })?;
        log::info!("Finish merge, output: {}", self.output.display());
        Ok(())
    }

    /// Check whether every input file is sorted by the sort field.
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        let mut result = true;
        for path in &self.input_files {
            result = Self::internal_check(path, &self.field, &self.ignore_lines)?;
            if !result {
                break;
            }
        }
        Ok(result)
    }

    pub(crate) fn internal_check(path: &Path, field: &Field, ignore_lines: &Option<Regex>) -> Result<bool, anyhow::Error> {
        let mut reader = BufReader::new(
            File::open(path).with_context(|| anyhow!("path: {}", path.display()))?
        );
        let mut previous: Option<LineRecord> = None;
        let mut line = String::new();
        let mut records: u64 = 0;
        while reader.read_line(&mut line)
            .with_context(|| anyhow!("path: {}", path.display()))? != 0 {
            records += 1;
            let current = std::mem::take(&mut line);
            if let Some(r) = ignore_lines {
                if r.is_match(current.trim_end_matches(&['\r', '\n'][..])) {
                    continue;
                }
            }
            let current = LineRecord::new(current, field)
                .with_context(|| format!("file: {}, record: {}", path.display(), records))?;
            if let Some(previous) = &previous {
                if previous > &current {
                    log::info!("{}: {} is out of order", path.display(), current.line());
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }

    fn validate(&self) -> Result<(), SortError> {
        if self.input_files.is_empty() {
            return Err(SortError::configuration("no input files"));
        }
        for path in &self.input_files {
            if !path.is_file() {
                return Err(SortError::configuration(format!("input is not a file: {}", path.display())));
            }
        }
        if self.max_records == 0 {
            return Err(SortError::configuration("max records must be positive"));
        }
        if self.field.separator() == self.field.quote() {
            return Err(SortError::configuration(format!("separator and quote are both '{}'", self.field.separator())));
        }
        if self.endl != "\n" && self.endl != "\r\n" {
            return Err(SortError::configuration(format!("unsupported line terminator: {:?}", self.endl)));
        }
        if !self.tmp.is_dir() {
            return Err(SortError::configuration(format!("not a directory: {}", self.tmp.display())));
        }
        Ok(())
    }

    fn create_config(&self, work_dir: PathBuf) -> Config {
        let mut tasks = self.tasks;
        if self.tasks == 0 {
            tasks = num_cpus::get();
        }

        Config::new(
            work_dir,
            self.field.clone(),
            self.max_records,
            tasks,
            self.endl.clone(),
            self.ignore_lines.clone(),
        )
    }

    /// Run `work` in a fresh run directory under the tmp directory with the open files limit
    /// raised for the configured number of tasks
    fn with_run_dir<F>(&self, work: F) -> Result<(), anyhow::Error>
        where F: FnOnce(&Arc<Config>) -> Result<(), anyhow::Error> {
        let run_dir = Self::create_run_dir(&self.tmp)?;
        let config = Arc::new(self.create_config(run_dir.path().to_path_buf()));
        log::info!("Run directory: {}, tasks: {}", config.work_dir().display(), config.tasks());

        let (current_soft, current_hard) = Self::get_rlimits()?;
        log::info!("Current rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let new_soft = max((config.tasks() * 3 + 256) as u64, current_soft).min(current_hard);
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        Self::set_rlimits(new_soft, current_hard)?;

        let result = work(&config);

        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let restored = Self::set_rlimits(current_soft, current_hard);

        let removed = if self.keep_tmp {
            #[allow(deprecated)]
            let path = run_dir.into_path();
            log::info!("Keeping run directory {}", path.display());
            Ok(())
        } else {
            let path = run_dir.path().to_path_buf();
            run_dir.close()
                .with_context(|| anyhow!("Remove run directory {}", path.display()))
        };
        result?;
        restored?;
        removed
    }

    fn create_run_dir(tmp: &Path) -> Result<TempDir, anyhow::Error> {
        Builder::new()
            .prefix("csv-sort-")
            .tempdir_in(tmp)
            .map_err(|e| SortError::configuration(format!("Failed to create run directory in {}: {}", tmp.display(), e)).into())
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    fn reduce_to_output(config: &Arc<Config>, output: &Path) -> Result<(), anyhow::Error> {
        let reduction = MergeCoordinator::new(config.clone()).reduce()?;
        log::info!("Merged sorted chunks in {} rounds", reduction.rounds());
        match reduction.path() {
            None => Self::write_empty(output),
            Some(path) => Self::relocate(path, output),
        }
    }

    fn output_dir(output: &Path) -> PathBuf {
        match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn write_empty(output: &Path) -> Result<(), anyhow::Error> {
        let tmp_file = NamedTempFile::new_in(Self::output_dir(output))
            .with_context(|| anyhow!("Create empty output {}", output.display()))?;
        tmp_file.persist(output)
            .with_context(|| anyhow!("Create empty output {}", output.display()))?;
        Ok(())
    }

    /// Move the sorted file to `output`, copying through a temporary file next to the output
    /// when a rename is not possible
    fn relocate(path: &Path, output: &Path) -> Result<(), anyhow::Error> {
        if let Err(e) = std::fs::rename(path, output) {
            log::debug!("Rename {} to {} failed: {}, copying", path.display(), output.display(), e);
            let tmp_file = NamedTempFile::new_in(Self::output_dir(output))
                .with_context(|| anyhow!("Create output {}", output.display()))?;
            let mut writer = BufWriter::new(tmp_file);
            let mut reader = File::open(path)
                .with_context(|| anyhow!("path: {}", path.display()))?;
            std::io::copy(&mut reader, &mut writer)
                .with_context(|| anyhow!("Copy {} to {}", path.display(), output.display()))?;
            writer.flush()?;
            let tmp_file = writer.into_inner().map_err(|e| e.into_error())?;
            tmp_file.persist(output)
                .with_context(|| anyhow!("Rename to {}", output.display()))?;
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
