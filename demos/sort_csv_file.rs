use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Error;
use csv_file_sort::field::Field;
use csv_file_sort::sort::Sort;
use simple_logger::SimpleLogger;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn create_input(path: &Path, records: usize) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    for i in 0..records {
        let id = (i * 7919) % records;
        writeln!(writer, "{},\"customer {}, branch {}\",{}", id, records - i, i % 13, i)?;
    }
    Ok(())
}

fn sort_by_id(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    // the first field is the default sort field
    let mut csv_file_sort = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf());
    csv_file_sort.with_max_records(1_000);
    csv_file_sort.sort()?;
    Ok(())
}

fn sort_by_name(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    // the second field is quoted and contains the separator
    let mut csv_file_sort = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf());
    csv_file_sort.with_field(Field::new(1));
    csv_file_sort.with_max_records(1_000);
    csv_file_sort.with_tasks(2);
    csv_file_sort.sort()?;
    Ok(())
}

// cargo run -r --example sort_csv_file
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().init()?;
    let input_path = PathBuf::from("./target/records-10000.csv");
    let by_id_path = PathBuf::from("./target/by-id-10000.csv");
    let by_name_path = PathBuf::from("./target/by-name-10000.csv");

    create_input(&input_path, 10_000)?;
    sort_by_id(&input_path, &by_id_path)?;
    sort_by_name(&input_path, &by_name_path)?;

    let check = Sort::new(vec![by_id_path.clone()], PathBuf::new());
    log::info!("{} sorted: {}", by_id_path.display(), check.check()?);
    Ok(())
}
