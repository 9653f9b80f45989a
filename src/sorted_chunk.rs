use std::io;
use std::path::{Path, PathBuf};

/// A file of records sorted ascending by key, produced by partitioning or supplied by the caller.
#[derive(Clone, Debug)]
pub struct SortedChunk {
    path: PathBuf,
    records: Option<usize>,
    owned: bool,
}

impl SortedChunk {
    pub(crate) fn new(path: PathBuf, records: usize) -> SortedChunk {
        SortedChunk {
            path,
            records: Some(records),
            owned: true,
        }
    }

    /// Wrap an existing sorted file. The file is never removed by this crate.
    pub fn existing(path: PathBuf) -> SortedChunk {
        SortedChunk {
            path,
            records: None,
            owned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records, when the chunk was written by this crate
    pub fn records(&self) -> Option<usize> {
        self.records
    }

    pub(crate) fn owned(&self) -> bool {
        self.owned
    }
}

/// The ordered list of sorted chunks handed from the partition phase to the merge phase.
///
/// Chunks are kept in creation order. The merge breaks key ties by position in this list.
#[derive(Clone, Debug)]
pub struct ChunkManifest {
    chunks: Vec<SortedChunk>,
    separator: char,
    skipped: usize,
}

impl ChunkManifest {
    pub(crate) fn new(separator: char) -> ChunkManifest {
        ChunkManifest {
            chunks: Vec::new(),
            separator,
            skipped: 0,
        }
    }

    /// Build a manifest from files already sorted ascending by the key, one record per line,
    /// fields separated by `separator`. Sortedness is not verified.
    ///
    /// # Examples
    /// ```
    /// use std::path::PathBuf;
    /// use keyed_file_sort::sorted_chunk::ChunkManifest;
    ///
    /// let manifest = ChunkManifest::from_paths(
    ///     vec![PathBuf::from("zones-a.tsv"), PathBuf::from("zones-b.tsv")],
    ///     '\t',
    /// );
    /// assert_eq!(manifest.len(), 2);
    /// ```
    pub fn from_paths(paths: Vec<PathBuf>, separator: char) -> ChunkManifest {
        ChunkManifest {
            chunks: paths.into_iter().map(SortedChunk::existing).collect(),
            separator,
            skipped: 0,
        }
    }

    pub(crate) fn push(&mut self, chunk: SortedChunk) {
        self.chunks.push(chunk);
    }

    pub(crate) fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn chunks(&self) -> &[SortedChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Field separator used by the lines in the chunk files
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Malformed records left out while partitioning
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Remove the chunk files written by this crate. Files supplied through
    /// [ChunkManifest::from_paths] are left alone. All files are attempted, the first failure is
    /// returned.
    pub fn remove_files(&self) -> io::Result<()> {
        let mut result = Ok(());
        for chunk in self.chunks.iter().filter(|chunk| chunk.owned()) {
            if let Err(e) = std::fs::remove_file(chunk.path()) {
                if e.kind() == io::ErrorKind::NotFound {
                    continue;
                }
                log::warn!("Failed to remove chunk {}: {}", chunk.path().display(), e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}
