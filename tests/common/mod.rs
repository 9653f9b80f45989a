use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Once;

use data_encoding::HEXLOWER;
use simple_logger::SimpleLogger;

static LOGGER: Once = Once::new();

pub const TRIPS: &str = "./tests/fixtures/trips-1000.csv";
pub const PICKUP_ZONE: usize = 7;
pub const DROPOFF_ZONE: usize = 8;

pub fn setup() {
    LOGGER.call_once(|| {
        SimpleLogger::new()
            .with_level(log::LevelFilter::Warn)
            .init()
            .unwrap_or_else(|e| println!("Logger already set: {}", e));
    });

    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    }
}

#[allow(dead_code)]
pub fn read_lines(path: &PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let reader = BufReader::new(File::open(path)?);
    let lines = reader.lines().collect::<Result<Vec<String>, _>>()?;
    Ok(lines)
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

/// A fresh, empty directory for the chunks of one test
#[allow(dead_code)]
pub fn temp_dir(dir: &str) -> PathBuf {
    let path = temp_file_name(dir);
    fs::create_dir_all(&path).unwrap_or_else(|_|
        panic!("Failed to create temp directory: {:?}", path)
    );
    path
}

#[allow(dead_code)]
pub fn key(line: &str, separator: char, key_index: usize) -> i64 {
    line.split(separator)
        .nth(key_index)
        .and_then(|field| i64::from_str(field.trim()).ok())
        .unwrap_or_else(|| panic!("no integer key {} in {:?}", key_index, line))
}

#[allow(dead_code)]
pub fn keys(lines: &[String], separator: char, key_index: usize) -> Vec<i64> {
    lines.iter().map(|line| key(line, separator, key_index)).collect()
}

/// Records of a file with a header, in input order
#[allow(dead_code)]
pub fn records(path: &PathBuf) -> Result<Vec<String>, anyhow::Error> {
    let mut lines = read_lines(path)?;
    lines.remove(0);
    Ok(lines)
}

/// Write `records` below `header`, one per line
#[allow(dead_code)]
pub fn write_input(path: &PathBuf, header: &str, records: &[&str]) -> Result<(), anyhow::Error> {
    let mut content = String::from(header);
    content.push('\n');
    for record in records {
        content.push_str(record);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}
