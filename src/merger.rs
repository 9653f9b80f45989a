use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crate::chunk_cursor::{ChunkCursor, ChunkHead};
use crate::config::Config;
use crate::error::SortError;
use crate::partitioner::create_chunk_file;
use crate::sorted_chunk::{ChunkManifest, SortedChunk};

/// Records of all chunks in a manifest, in ascending key order.
///
/// Produced by [Sort::merged_records](crate::sort::Sort::merged_records). Holds one head record per
/// open chunk. Ties are broken by chunk position in the manifest. Chunk sortedness is not verified,
/// unsorted chunks produce unsorted output. A record is handed out before its chunk is read any
/// further, so a read failure surfaces on the following call. After the first error the iterator
/// ends.
#[derive(Debug)]
pub struct MergedRecords {
    cursors: Vec<ChunkCursor>,
    // min heap on (key, chunk index)
    heap: BinaryHeap<Reverse<(i64, usize)>>,
    separator: char,
    output_separator: char,
    pending: Option<SortError>,
}

impl MergedRecords {
    pub(crate) fn open(manifest: &ChunkManifest, key_index: usize, io_timeout: Option<Duration>) -> Result<MergedRecords, SortError> {
        let mut cursors = Vec::with_capacity(manifest.len());
        let mut heap = BinaryHeap::with_capacity(manifest.len());
        for (index, chunk) in manifest.chunks().iter().enumerate() {
            let cursor = ChunkCursor::open(index, chunk, manifest.separator(), key_index, io_timeout)?;
            if let Some(key) = cursor.key() {
                heap.push(Reverse((key, cursor.index())));
            }
            cursors.push(cursor);
        }

        Ok(
            MergedRecords {
                cursors,
                heap,
                separator: manifest.separator(),
                output_separator: manifest.separator(),
                pending: None,
            }
        )
    }

    /// Emit lines with `output_separator` in place of the chunk field separator.
    pub(crate) fn with_output_separator(mut self, output_separator: char) -> MergedRecords {
        self.output_separator = output_separator;
        self
    }

    /// Field separator of the emitted lines
    pub fn separator(&self) -> char {
        self.output_separator
    }
}

impl Iterator for MergedRecords {
    /// One record without its line terminator
    type Item = Result<String, SortError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            return Some(Err(e));
        }

        let Reverse((_, index)) = self.heap.pop()?;
        let cursor = &mut self.cursors[index];
        let line_record = match cursor.take_head() {
            ChunkHead::Record(line_record) => line_record,
            // a cursor is only in the heap while it has a head
            ChunkHead::Exhausted => return self.next(),
        };

        match cursor.read_next() {
            Ok(()) => {
                if let Some(key) = cursor.key() {
                    self.heap.push(Reverse((key, index)));
                }
            }
            Err(e) => {
                self.heap.clear();
                self.pending = Some(e);
            }
        }
        Some(Ok(line_record.into_line(self.separator, self.output_separator)))
    }
}

/// Drain `records` into `writer`, one line each. Returns the number of records written.
pub(crate) fn write_records<W: Write>(records: MergedRecords, writer: W, path: &Path) -> Result<usize, SortError> {
    let output_error = |source: io::Error| SortError::Output {
        path: path.to_path_buf(),
        source,
    };

    let mut written = 0;
    let mut buf_writer = BufWriter::new(writer);
    for record in records {
        let line = record?;
        buf_writer.write_all(line.as_bytes()).map_err(output_error)?;
        buf_writer.write_all(b"\n").map_err(output_error)?;
        written += 1;
    }
    buf_writer.flush().map_err(output_error)?;
    Ok(written)
}

/// Merge consecutive groups of chunks into intermediate chunks until no more than
/// `intermediate_files` remain, so the final merge never holds more files open than that.
///
/// Group order is kept, so key ties still resolve in original chunk order. Owned chunks are removed
/// once merged, and all of them on failure.
pub(crate) fn reduce(mut manifest: ChunkManifest, config: &Config) -> Result<ChunkManifest, SortError> {
    let limit = config.intermediate_files();
    while manifest.len() > limit {
        log::info!("Intermediate merge pass over {} chunks, {} at a time", manifest.len(), limit);
        let mut reduced = ChunkManifest::new(manifest.separator());
        for _ in 0..manifest.skipped() {
            reduced.record_skipped();
        }

        for group in manifest.chunks().chunks(limit) {
            let mut group_manifest = ChunkManifest::new(manifest.separator());
            for chunk in group {
                group_manifest.push(chunk.clone());
            }
            match merge_group(&group_manifest, config) {
                Ok(merged) => reduced.push(merged),
                Err(e) => {
                    for unmerged in [&reduced, &manifest] {
                        if let Err(cleanup) = unmerged.remove_files() {
                            log::warn!("Failed to remove intermediate chunks: {}", cleanup);
                        }
                    }
                    return Err(e);
                }
            }
            if let Err(e) = group_manifest.remove_files() {
                log::warn!("Failed to remove merged chunks: {}", e);
            }
        }
        manifest = reduced;
    }
    Ok(manifest)
}

fn merge_group(group: &ChunkManifest, config: &Config) -> Result<SortedChunk, SortError> {
    let records = MergedRecords::open(group, config.key_index(), config.io_timeout())?;
    let (chunk_file, path) = create_chunk_file(config)?;
    let written = match write_records(records, chunk_file, &path) {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&path) {
                log::warn!("Failed to remove incomplete chunk {}: {}", path.display(), cleanup);
            }
            return Err(match e {
                SortError::Output { path, source } => SortError::ChunkWrite { path, source },
                other => other,
            });
        }
    };
    log::debug!("Merged {} chunks into {} with {} records", group.len(), path.display(), written);
    Ok(SortedChunk::new(path, written))
}
