//! This crate implements a bounded memory external sort for delimited text files keyed by an
//! integer column. For example a CSV of taxi trips sorted by pickup zone or trip duration.
//!
//! Sorting happens in two phases. The partition phase reads the input once, collects at most
//! `chunk_size` records in memory, sorts them by the key and writes them to a chunk file. The merge
//! phase opens every chunk and repeatedly emits the smallest head record across all chunks, using a
//! binary heap of `(key, chunk index)`. Neither phase holds more than `chunk_size + chunk count`
//! records in memory, so files much larger than the available memory can be sorted.
//!
//! Records with equal keys keep their input order.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use keyed_file_sort::malformed_policy::MalformedPolicy;
//! use keyed_file_sort::sort::Sort;
//!
//! fn sort_by_dropoff(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut trips_sort = Sort::new(input, output.clone(), 8);
//!     trips_sort.with_tmp_dir(tmp);
//!     trips_sort.with_chunk_size(20_000);
//!     // leave rows with a missing zone out instead of failing
//!     trips_sort.with_malformed_policy(MalformedPolicy::Skip);
//!
//!     // the two phases can also be run separately
//!     let manifest = trips_sort.partition()?;
//!     log::info!("{} chunks, {} rows skipped", manifest.len(), manifest.skipped());
//!     trips_sort.merge(manifest)?;
//!
//!     assert!(trips_sort.check(&output)?);
//!     Ok(())
//! }
//! ```

pub(crate) mod config;
pub(crate) mod line_record;
pub(crate) mod chunk_cursor;
pub(crate) mod partitioner;

pub mod sort;
pub mod merger;
pub mod sorted_chunk;
pub mod malformed_policy;
pub mod error;
