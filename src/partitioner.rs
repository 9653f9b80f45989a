use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use tempfile::Builder;

use crate::config::Config;
use crate::error::SortError;
use crate::line_record::LineRecord;
use crate::malformed_policy::MalformedPolicy;
use crate::sorted_chunk::{ChunkManifest, SortedChunk};

/// Create a new, persisted chunk file in the configured temporary directory.
pub(crate) fn create_chunk_file(config: &Config) -> Result<(File, PathBuf), SortError> {
    Builder::new()
        .prefix(config.tmp_prefix())
        .suffix(config.tmp_suffix())
        .tempfile_in(config.tmp())
        .and_then(|tmp_file| tmp_file.keep().map_err(|e| e.error))
        .map_err(|source| SortError::ChunkWrite {
            path: config.tmp().clone(),
            source,
        })
}

/// Split `reader` into sorted chunks of at most `chunk_size` records.
///
/// On failure the chunks written so far are removed.
pub(crate) fn partition<R: BufRead>(reader: R, config: &Config) -> Result<ChunkManifest, SortError> {
    let mut manifest = ChunkManifest::new(config.field_separator());
    log::info!(
        "Start partitioning, chunk size: {} records, key index: {}",
        config.chunk_size(),
        config.key_index()
    );
    match fill_chunks(reader, config, &mut manifest) {
        Ok(records) => {
            log::info!(
                "Finish partitioning, {} records in {} chunks, {} skipped",
                records,
                manifest.len(),
                manifest.skipped()
            );
            Ok(manifest)
        }
        Err(e) => {
            if let Err(cleanup) = manifest.remove_files() {
                log::warn!("Failed to remove chunks after partition failure: {}", cleanup);
            }
            Err(e)
        }
    }
}

fn fill_chunks<R: BufRead>(mut reader: R, config: &Config, manifest: &mut ChunkManifest) -> Result<usize, SortError> {
    let mut records = 0;
    let mut line_number = 0;
    let mut line = String::new();
    let mut chunk: Vec<LineRecord> = Vec::with_capacity(config.chunk_size().min(1 << 16));

    loop {
        line.clear();
        let bytes = reader.read_line(&mut line)
            .map_err(|source| SortError::InputRead { line: line_number + 1, source })?;
        if bytes == 0 {
            break;
        }
        line_number += 1;

        if line_number == 1 && config.skip_header() {
            continue;
        }

        if config.ignore_empty() && line.trim().is_empty() {
            continue;
        }

        if let Some(r) = config.ignore_lines() {
            if r.is_match(line.trim()) {
                continue;
            }
        }

        let line_record = LineRecord::new(
            &line,
            line_number,
            config.field_separator(),
            config.key_index(),
            config.field_count(),
        );
        match line_record {
            Ok(line_record) => chunk.push(line_record),
            Err(e) => match config.malformed_policy() {
                MalformedPolicy::Abort => return Err(e),
                MalformedPolicy::Skip => {
                    log::warn!("Skipping {}", e);
                    manifest.record_skipped();
                    continue;
                }
            },
        }

        if chunk.len() == config.chunk_size() {
            records += write_sorted_chunk(&mut chunk, config, manifest)?;
        }
    }

    if !chunk.is_empty() {
        records += write_sorted_chunk(&mut chunk, config, manifest)?;
    }
    Ok(records)
}

/// Sort the buffered records, persist them as the next chunk and clear the buffer.
fn write_sorted_chunk(chunk: &mut Vec<LineRecord>, config: &Config, manifest: &mut ChunkManifest) -> Result<usize, SortError> {
    // stable, so equal keys keep input order within the chunk
    chunk.sort();

    let started = Instant::now();
    let (chunk_file, path) = create_chunk_file(config)?;
    let write_error = |source: std::io::Error| SortError::ChunkWrite {
        path: path.clone(),
        source,
    };

    let records = chunk.len();
    let mut buf_writer = BufWriter::new(chunk_file);
    // chunks keep the input separator, the merge rewrites it
    for line_record in chunk.drain(..) {
        let line = line_record.into_line(config.field_separator(), config.field_separator());
        buf_writer.write_all(line.as_bytes()).map_err(write_error)?;
        buf_writer.write_all(b"\n").map_err(write_error)?;
    }
    buf_writer.flush().map_err(write_error)?;

    // register before the timeout check so a failed partition still removes the file
    manifest.push(SortedChunk::new(path.clone(), records));
    if let Some(timeout) = config.io_timeout() {
        let elapsed = started.elapsed();
        if elapsed > timeout {
            return Err(SortError::IoTimeout { path, elapsed });
        }
    }

    log::debug!("Wrote chunk {} with {} records to {}", manifest.len() - 1, records, path.display());
    Ok(records)
}
