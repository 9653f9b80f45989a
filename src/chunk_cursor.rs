use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::SortError;
use crate::line_record::LineRecord;
use crate::sorted_chunk::SortedChunk;

#[derive(Debug)]
pub(crate) enum ChunkHead {
    Record(LineRecord),
    Exhausted,
}

/// Forward only reader over one sorted chunk, holding the chunk's current head record.
#[derive(Debug)]
pub(crate) struct ChunkCursor {
    index: usize,
    path: PathBuf,
    reader: BufReader<File>,
    separator: char,
    key_index: usize,
    io_timeout: Option<Duration>,
    line_number: usize,
    head: ChunkHead,
}

impl ChunkCursor {
    pub(crate) fn open(
        index: usize,
        chunk: &SortedChunk,
        separator: char,
        key_index: usize,
        io_timeout: Option<Duration>,
    ) -> Result<ChunkCursor, SortError> {
        let path = chunk.path().to_path_buf();
        let file = File::open(&path).map_err(|source| SortError::ChunkRead {
            index,
            path: path.clone(),
            source,
        })?;

        let mut cursor = ChunkCursor {
            index,
            path,
            reader: BufReader::new(file),
            separator,
            key_index,
            io_timeout,
            line_number: 0,
            head: ChunkHead::Exhausted,
        };
        cursor.head = cursor.read_head()?;
        Ok(cursor)
    }

    /// Key of the head record, None once the chunk is exhausted
    pub(crate) fn key(&self) -> Option<i64> {
        match &self.head {
            ChunkHead::Record(record) => Some(record.key()),
            ChunkHead::Exhausted => None,
        }
    }

    /// Hand out the current head, leaving the cursor exhausted until [ChunkCursor::read_next].
    pub(crate) fn take_head(&mut self) -> ChunkHead {
        std::mem::replace(&mut self.head, ChunkHead::Exhausted)
    }

    /// Read the next record of the chunk into the head.
    pub(crate) fn read_next(&mut self) -> Result<(), SortError> {
        self.head = self.read_head()?;
        Ok(())
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    fn read_head(&mut self) -> Result<ChunkHead, SortError> {
        let mut line = String::new();
        loop {
            let started = Instant::now();
            line.clear();
            let bytes = self.reader.read_line(&mut line)
                .map_err(|source| self.read_error(source))?;

            if let Some(timeout) = self.io_timeout {
                let elapsed = started.elapsed();
                if elapsed > timeout {
                    return Err(SortError::IoTimeout {
                        path: self.path.clone(),
                        elapsed,
                    });
                }
            }

            if bytes == 0 {
                return Ok(ChunkHead::Exhausted);
            }
            self.line_number += 1;
            if !line.trim().is_empty() {
                break;
            }
        }

        // chunk lines were validated when written, a parse failure here means a damaged chunk
        LineRecord::new(&line, self.line_number, self.separator, self.key_index, None)
            .map(ChunkHead::Record)
            .map_err(|e| self.read_error(io::Error::new(io::ErrorKind::InvalidData, e.to_string())))
    }

    fn read_error(&self, source: io::Error) -> SortError {
        SortError::ChunkRead {
            index: self.index,
            path: self.path.clone(),
            source,
        }
    }
}
