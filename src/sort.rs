use std::cmp::{max, min};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use regex::Regex;
use rlimit::{getrlimit, Resource, setrlimit};

use crate::config::Config;
use crate::error::SortError;
use crate::line_record::LineRecord;
use crate::malformed_policy::MalformedPolicy;
use crate::merger::{reduce, write_records, MergedRecords};
use crate::partitioner::partition;
use crate::sorted_chunk::ChunkManifest;

/// Sort a delimited text file by an integer key column, in bounded memory
///
/// The input is read sequentially into chunks of at most `chunk_size` records. Each chunk is sorted
/// and written to the temporary directory. The chunks are then merged into the output with a k-way
/// merge holding one record per chunk in memory.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use keyed_file_sort::sort::Sort;
///
/// // sort taxi trips by pickup zone, the 8th column
/// fn sort_trips(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<usize, anyhow::Error> {
///     let mut trips_sort = Sort::new(input, output, 7);
///     // records held in memory at once while partitioning
///     trips_sort.with_chunk_size(50_000);
///     // write the sorted output tab separated
///     trips_sort.with_output_separator('\t');
///     // for large files a dedicated directory on the same file system as the output is
///     // recommended for the intermediate chunks
///     trips_sort.with_tmp_dir(tmp);
///     trips_sort.sort()
/// }
/// ```
pub struct Sort {
    input: PathBuf,
    output: PathBuf,
    key_index: usize,
    tmp: PathBuf,
    chunk_size: usize,
    field_separator: char,
    output_separator: Option<char>,
    skip_header: bool,
    field_count: Option<usize>,
    malformed_policy: MalformedPolicy,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
    intermediate_files: usize,
    io_timeout: Option<Duration>,
}

impl Sort {
    /// Create a default Sort definition keyed by the zero based field `key_index`.
    ///
    /// * intermediate chunks go to std::env::temp_dir()
    /// * chunks hold 50 000 records
    /// * the field separator is ',' and the output keeps it
    /// * the first line is a header and is dropped
    /// * the number of fields per record is not enforced
    /// * malformed records abort the sort
    /// * blank lines are ignored
    /// * at most 1024 chunks are merged at once
    /// * chunk I/O is not timed
    pub fn new(input: PathBuf, output: PathBuf, key_index: usize) -> Sort {
        Sort {
            input,
            output,
            key_index,
            tmp: std::env::temp_dir(),
            chunk_size: 50_000,
            field_separator: ',',
            output_separator: None,
            skip_header: true,
            field_count: None,
            malformed_policy: MalformedPolicy::Abort,
            ignore_empty: true,
            ignore_lines: None,
            intermediate_files: 1024,
            io_timeout: None,
        }
    }

    /// Set directory for intermediate chunks. By default use std::env::temp_dir()
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the maximum number of records per chunk. This is the number of records held in memory
    /// while partitioning.
    pub fn with_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    /// Set the input field separator. The default is ','
    pub fn with_field_separator(&mut self, field_separator: char) {
        self.field_separator = field_separator;
    }

    /// Set the field separator of the sorted output. The default is the input field separator
    pub fn with_output_separator(&mut self, output_separator: char) {
        self.output_separator = Some(output_separator);
    }

    /// Whether the first input line is a header to drop. The default is true
    pub fn with_skip_header(&mut self, skip_header: bool) {
        self.skip_header = skip_header;
    }

    /// Declare the number of fields in every record. Records with a different number of fields
    /// are malformed and a key index outside the declared fields is rejected up front.
    pub fn with_field_count(&mut self, field_count: usize) {
        self.field_count = Some(field_count);
    }

    /// Set the [MalformedPolicy]. The default is [MalformedPolicy::Abort]
    pub fn with_malformed_policy(&mut self, malformed_policy: MalformedPolicy) {
        self.malformed_policy = malformed_policy;
    }

    /// Whether blank lines are ignored. The default is true, otherwise they are malformed
    pub fn with_ignore_empty(&mut self, ignore_empty: bool) {
        self.ignore_empty = ignore_empty;
    }

    /// Specify which lines to ignore. Each line matching the regex will be ignored and will not
    /// appear in the output.
    pub fn with_ignore_lines(&mut self, r: Regex) {
        self.ignore_lines = Some(r)
    }

    /// Set the maximum number of chunks merged at once. When partitioning yields more chunks they
    /// are first merged in groups. The default is 1024.
    pub fn with_intermediate_files(&mut self, files: usize) {
        self.intermediate_files = files;
    }

    /// Fail with [SortError::IoTimeout] when writing one chunk or reading one chunk record takes
    /// longer than `io_timeout`
    pub fn with_io_timeout(&mut self, io_timeout: Duration) {
        self.io_timeout = Some(io_timeout);
    }

    fn create_config(&self) -> Result<Config, SortError> {
        let config = Config::new(
            self.tmp.clone(),
            "chunk-".to_string(),
            ".sorted".to_string(),
            self.field_separator,
            self.output_separator.unwrap_or(self.field_separator),
            self.skip_header,
            self.ignore_empty,
            self.ignore_lines.clone(),
            self.chunk_size,
            self.key_index,
            self.field_count,
            self.malformed_policy,
            self.intermediate_files,
            self.io_timeout,
        );
        config.validate()?;
        Ok(config)
    }

    /// Sort the input file into the output file. Returns the number of records written.
    ///
    /// Intermediate chunks are removed.
    pub fn sort(&self) -> Result<usize, anyhow::Error> {
        let started = Instant::now();
        self.create_config()?;
        log::info!("Start sorting {} by field {}", self.input.display(), self.key_index);

        let manifest = self.partition()
            .with_context(|| anyhow!("partition {}", self.input.display()))?;
        let partitioned = started.elapsed();

        let records = self.merge(manifest)
            .with_context(|| anyhow!("merge into {}", self.output.display()))?;

        log::info!(
            "Finish sorting {}, {} records, partition: {:?}, total: {:?}",
            self.input.display(),
            records,
            partitioned,
            started.elapsed()
        );
        Ok(records)
    }

    fn get_rlimits() -> Result<(u64, u64), SortError> {
        getrlimit(Resource::NOFILE).map_err(|source| SortError::FileLimit { source })
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), SortError> {
        setrlimit(Resource::NOFILE, soft, hard).map_err(|source| SortError::FileLimit { source })
    }

    /// Split the input file into sorted chunks.
    pub fn partition(&self) -> Result<ChunkManifest, SortError> {
        let config = self.create_config()?;
        let file = File::open(&self.input).map_err(|source| SortError::Input {
            path: self.input.clone(),
            source,
        })?;
        partition(BufReader::new(file), &config)
    }

    /// Split any record stream into sorted chunks. The header and blank line settings apply as
    /// for a file.
    pub fn partition_reader<R: BufRead>(&self, reader: R) -> Result<ChunkManifest, SortError> {
        let config = self.create_config()?;
        partition(reader, &config)
    }

    /// Merge the chunks of `manifest` into the output file. Returns the number of records written.
    ///
    /// Chunks written by [Sort::partition] are consumed and removed, whether the merge succeeds or
    /// not. Chunks of a manifest built with [ChunkManifest::from_paths] are left in place. Output
    /// written before a failure is not rolled back. The open files soft limit is raised for the
    /// merge and restored afterwards.
    pub fn merge(&self, manifest: ChunkManifest) -> Result<usize, SortError> {
        let config = match self.create_config() {
            Ok(config) => config,
            Err(e) => {
                Self::remove_chunks(&manifest);
                return Err(e);
            }
        };

        let (current_soft, current_hard) = match Self::get_rlimits() {
            Ok(limits) => limits,
            Err(e) => {
                Self::remove_chunks(&manifest);
                return Err(e);
            }
        };
        let open_files = min(manifest.len(), config.intermediate_files()) as u64;
        let new_soft = min(max(open_files + 256, current_soft), current_hard);
        log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current_hard);
        if let Err(e) = Self::set_rlimits(new_soft, current_hard) {
            Self::remove_chunks(&manifest);
            return Err(e);
        }

        let merged = Self::reduce_and_merge(manifest, &config, &self.output);

        log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", current_soft, current_hard);
        let restored = Self::set_rlimits(current_soft, current_hard);
        let written = merged?;
        restored?;
        log::info!("Finished merging, merged length: {} records", written);
        Ok(written)
    }

    fn remove_chunks(manifest: &ChunkManifest) {
        if let Err(e) = manifest.remove_files() {
            log::warn!("Failed to remove merged chunks: {}", e);
        }
    }

    fn reduce_and_merge(manifest: ChunkManifest, config: &Config, output: &Path) -> Result<usize, SortError> {
        let manifest = reduce(manifest, config)?;
        log::info!("Merging {} sorted chunks into {}", manifest.len(), output.display());
        let merged = Self::merge_into(&manifest, config, output);
        Self::remove_chunks(&manifest);
        merged
    }

    fn merge_into(manifest: &ChunkManifest, config: &Config, output: &Path) -> Result<usize, SortError> {
        let records = Self::open_records(manifest, config)?;
        let file = File::create(output).map_err(|source| SortError::Output {
            path: output.to_path_buf(),
            source,
        })?;
        write_records(records, file, output)
    }

    /// Merge the chunks of `manifest` as a record iterator. Every chunk is opened at once and
    /// nothing is removed. Lines are emitted as [Sort::merge] writes them.
    pub fn merged_records(&self, manifest: &ChunkManifest) -> Result<MergedRecords, SortError> {
        let config = self.create_config()?;
        Self::open_records(manifest, &config)
    }

    fn open_records(manifest: &ChunkManifest, config: &Config) -> Result<MergedRecords, SortError> {
        let records = MergedRecords::open(manifest, config.key_index(), config.io_timeout())?;
        // an explicit output separator replaces the chunk separator
        if config.output_separator() != config.field_separator() {
            Ok(records.with_output_separator(config.output_separator()))
        } else {
            Ok(records)
        }
    }

    /// Check that a header-less file in the output format is sorted ascending by the key.
    pub fn check(&self, path: &Path) -> Result<bool, SortError> {
        let config = self.create_config()?;
        let file = File::open(path).map_err(|source| SortError::Input {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = BufReader::new(file);
        let mut line = String::new();
        let mut line_number = 0;
        let mut previous: Option<i64> = None;
        loop {
            line.clear();
            let bytes = reader.read_line(&mut line)
                .map_err(|source| SortError::InputRead { line: line_number + 1, source })?;
            if bytes == 0 {
                break;
            }
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }

            let current = LineRecord::new(
                &line,
                line_number,
                config.output_separator(),
                config.key_index(),
                config.field_count(),
            )?.key();
            if let Some(previous) = previous {
                if previous > current {
                    log::info!("{} is not sorted at line {}", path.display(), line_number);
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }
}
