use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Once;

use data_encoding::HEXLOWER;
use rand::seq::SliceRandom;
use simple_logger::SimpleLogger;

static LOGGER: Once = Once::new();

pub fn setup() {
    LOGGER.call_once(|| {
        SimpleLogger::new().with_level(log::LevelFilter::Info).init().unwrap_or_else(|e|
            println!("Logger already initialized: {}", e)
        );
    });

    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    let parallel_results_dir_path = PathBuf::from_str("./target/parallel-results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    }

    if !parallel_results_dir_path.exists() {
        fs::create_dir_all(&parallel_results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create parallel results directory: {:?}", parallel_results_dir_path)
        );
    }
}

#[allow(dead_code)]
pub fn read_lines(path: PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().map(|x| x.unwrap()).collect();
    Ok(lines)
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

#[allow(dead_code)]
pub fn write_lines(path: &PathBuf, lines: &[String]) -> Result<(), anyhow::Error> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}

/// Records "<key>,<sequence>" with `keys` distinct zero padded keys, shuffled. The sequence
/// number is the position of the record in the input.
#[allow(dead_code)]
pub fn shuffled_records(count: usize, keys: usize) -> Vec<String> {
    let mut keys: Vec<usize> = (0..count).map(|i| i % keys).collect();
    keys.shuffle(&mut rand::thread_rng());
    keys.iter()
        .enumerate()
        .map(|(sequence, key)| format!("{:06},{:08}", key, sequence))
        .collect()
}

/// Key of a record produced by [shuffled_records]
#[allow(dead_code)]
pub fn key_of(line: &str) -> &str {
    line.split(',').next().unwrap()
}
