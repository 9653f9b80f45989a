use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while partitioning or merging.
///
/// Every error is fatal to the operation that raised it. Nothing is retried; a caller that wants
/// a retry, for example with a different chunk size, reruns the whole sort.
#[derive(Error, Debug)]
pub enum SortError {
    /// A line could not be split into the expected fields or its key is not an integer.
    /// `line` is the 1-based physical line number in the input, the header being line 1.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord {
        line: usize,
        reason: String,
    },
    /// Creating or writing an intermediate chunk failed.
    #[error("failed to write chunk {}", path.display())]
    ChunkWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Reading an intermediate chunk failed mid merge.
    #[error("failed to read chunk {index} ({})", path.display())]
    ChunkRead {
        index: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Rejected before any I/O took place.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A single chunk read or write took longer than the configured I/O timeout.
    #[error("I/O on {} exceeded timeout, took {elapsed:?}", path.display())]
    IoTimeout {
        path: PathBuf,
        elapsed: Duration,
    },
    #[error("failed to open input {}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read input at line {line}")]
    InputRead {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The open files limit could not be read or adjusted for the merge.
    #[error("failed to adjust the open files limit")]
    FileLimit {
        #[source]
        source: io::Error,
    },
}
