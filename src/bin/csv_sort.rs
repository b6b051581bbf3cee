use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use csv_file_sort::field::Field;
use csv_file_sort::sort::Sort;

/// Sort a delimited record file by one field using an external merge sort
#[derive(Parser, Debug)]
#[command(name = "csv-sort", version, about, long_about = None)]
struct Args {
    #[arg(short = 'i', long, help = "Input file path")]
    input: PathBuf,

    #[arg(short = 'k', long, help = "Index of the field to sort by, starting at 0")]
    key_index: usize,

    #[arg(short = 'm', long, help = "Maximum number of records held in memory by a sort task")]
    max_records: usize,

    #[arg(short = 'o', long, env = "CSV_SORT_OUTPUT", default_value = "sorted.csv", help = "Output file path, replaced if it exists")]
    output: PathBuf,

    #[arg(long, env = "CSV_SORT_TMP_DIR", help = "Directory for intermediate files. Default: the system temp dir")]
    tmp_dir: Option<PathBuf>,

    #[arg(long, env = "CSV_SORT_TASKS", default_value_t = 0, help = "Number of concurrent tasks, 0 uses all cores")]
    tasks: usize,

    #[arg(long, default_value_t = ',', help = "Field separator")]
    separator: char,

    #[arg(long, default_value_t = '"', help = "Quote character")]
    quote: char,

    #[arg(long, env = "CSV_SORT_KEEP_TMP", default_value_t = false, help = "Keep intermediate files after the sort")]
    keep_tmp: bool,

    #[arg(long, env = "CSV_SORT_LOG_LEVEL", default_value_t = LevelFilter::Info, help = "Log level")]
    log_level: LevelFilter,
}

fn run(args: &Args) -> Result<(), anyhow::Error> {
    let mut csv_file_sort = Sort::new(vec![args.input.clone()], args.output.clone());
    csv_file_sort.with_field(
        Field::new(args.key_index)
            .with_separator(args.separator)
            .with_quote(args.quote)
    );
    csv_file_sort.with_max_records(args.max_records);
    csv_file_sort.with_tasks(args.tasks);
    csv_file_sort.with_keep_tmp(args.keep_tmp);
    if let Some(tmp_dir) = &args.tmp_dir {
        csv_file_sort.with_tmp_dir(tmp_dir.clone());
    }
    csv_file_sort.sort()
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = SimpleLogger::new().with_level(args.log_level).init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let start = std::time::Instant::now();
    match run(&args) {
        Ok(()) => {
            log::info!(
                "Sorting was completed for {}, elapsed: {:.3}s",
                args.input.display(),
                start.elapsed().as_secs_f64(),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Sorting {} failed: {:#}", args.input.display(), e);
            ExitCode::FAILURE
        }
    }
}
