//! This crate implements an external merge sort for large delimited record files, for example
//! CSV, that do not fit comfortably in memory.
//!
//! The sort runs in two phases. The partition phase splits the input into chunks of a bounded
//! number of records and sorts every chunk in memory by a single field, writing one sorted file
//! per chunk. The merge phase merges the sorted files pairwise in rounds, streaming both inputs of
//! every merge, until a single sorted file remains. The tasks of a phase or round run concurrently
//! on a thread pool and every round waits for all of its merges before the next one starts.
//!
//! The sort is stable, records with equal keys keep their input order. The key is extracted
//! from each record respecting quoted fields, so a separator inside quotes does not split a field.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use csv_file_sort::field::Field;
//! use csv_file_sort::sort::Sort;
//!
//! // optimized for use with Jemalloc
//! use tikv_jemallocator::Jemalloc;
//! #[global_allocator]
//! static GLOBAL: Jemalloc = Jemalloc;
//!
//! // parallel record sort by the third field, 10,000 records in memory per task
//! fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut csv_file_sort = Sort::new(vec![input.clone()], output.clone());
//!     csv_file_sort.with_field(Field::new(2));
//!     csv_file_sort.with_max_records(10_000);
//!
//!     // set number of CPU cores the sort will attempt to use. The default is to use all
//!     // available cores.
//!     csv_file_sort.with_tasks(2);
//!
//!     // set the directory for intermediate results. The default is the system temp dir -
//!     // std::env::temp_dir(), however, for large files it is recommended to provide a dedicated
//!     // directory for intermediate files, preferably on the same file system as the output result.
//!     csv_file_sort.with_tmp_dir(tmp);
//!
//!     csv_file_sort.sort()
//! }
//! ```
//!

pub(crate) mod sort_command;
pub(crate) mod merge_command;
pub(crate) mod line_record;
pub(crate) mod key;
pub(crate) mod sorted_chunk_file;
pub(crate) mod unmerged_chunk_file;
pub(crate) mod config;
pub(crate) mod chunk_iterator;
pub(crate) mod phase;
pub(crate) mod partitioner;
pub(crate) mod merge_coordinator;

pub mod sort;
pub mod field;
pub mod error;
