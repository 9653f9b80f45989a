use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Error;
use keyed_file_sort::malformed_policy::MalformedPolicy;
use keyed_file_sort::sort::Sort;
use simple_logger::SimpleLogger;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const PICKUP_ZONE: usize = 7;
const DROPOFF_ZONE: usize = 8;

fn sort_by_zone(input_path: &Path, output_path: &Path, zone: usize, chunk_size: usize) -> Result<(), Error> {
    let mut trips_sort = Sort::new(input_path.to_path_buf(), output_path.to_path_buf(), zone);
    trips_sort.with_chunk_size(chunk_size);
    trips_sort.with_output_separator('\t');
    // trips with a missing zone are left out
    trips_sort.with_malformed_policy(MalformedPolicy::Skip);
    trips_sort.with_tmp_dir(PathBuf::from("./target"));
    trips_sort.sort()?;
    Ok(())
}

// cargo run -r --example sort_trips [input.csv]
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().init()?;
    let input_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./tests/fixtures/trips-1000.csv"));
    let pickup_path = PathBuf::from("./target/trips-by-pickup.tsv");
    let dropoff_path = PathBuf::from("./target/trips-by-dropoff.tsv");

    for chunk_size in [20_000, 50_000, 80_000] {
        let started = Instant::now();
        sort_by_zone(&input_path, &pickup_path, PICKUP_ZONE, chunk_size)?;
        log::info!("Chunk size {}: sorted by pickup zone in {:?}", chunk_size, started.elapsed());
    }
    sort_by_zone(&input_path, &dropoff_path, DROPOFF_ZONE, 50_000)?;
    Ok(())
}
