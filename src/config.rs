use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;

use crate::error::SortError;
use crate::malformed_policy::MalformedPolicy;

#[derive(Clone, Debug)]
pub(crate) struct Config {
    tmp: PathBuf,
    tmp_prefix: String,
    tmp_suffix: String,
    field_separator: char,
    output_separator: char,
    skip_header: bool,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
    chunk_size: usize,
    key_index: usize,
    field_count: Option<usize>,
    malformed_policy: MalformedPolicy,
    intermediate_files: usize,
    io_timeout: Option<Duration>,
}

impl Config {
    pub(crate) fn new(
        tmp: PathBuf,
        tmp_prefix: String,
        tmp_suffix: String,
        field_separator: char,
        output_separator: char,
        skip_header: bool,
        ignore_empty: bool,
        ignore_lines: Option<Regex>,
        chunk_size: usize,
        key_index: usize,
        field_count: Option<usize>,
        malformed_policy: MalformedPolicy,
        intermediate_files: usize,
        io_timeout: Option<Duration>,
    ) -> Config {
        Config {
            tmp,
            tmp_prefix,
            tmp_suffix,
            field_separator,
            output_separator,
            skip_header,
            ignore_empty,
            ignore_lines,
            chunk_size,
            key_index,
            field_count,
            malformed_policy,
            intermediate_files,
            io_timeout,
        }
    }

    /// Reject settings the pipeline cannot run with. Performs no I/O.
    pub(crate) fn validate(&self) -> Result<(), SortError> {
        if self.chunk_size < 1 {
            return Err(SortError::InvalidConfiguration(
                "chunk size must be at least 1 record".to_string()
            ));
        }

        if let Some(field_count) = self.field_count {
            if self.key_index >= field_count {
                return Err(SortError::InvalidConfiguration(
                    format!(
                        "key index {} is out of range for {} fields",
                        self.key_index,
                        field_count,
                    )
                ));
            }
        }

        if self.intermediate_files < 2 {
            return Err(SortError::InvalidConfiguration(
                format!("intermediate files must be at least 2, got {}", self.intermediate_files)
            ));
        }

        for separator in [self.field_separator, self.output_separator] {
            if separator == '\n' || separator == '\r' {
                return Err(SortError::InvalidConfiguration(
                    format!("field separator {:?} is a line terminator", separator)
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn tmp_prefix(&self) -> &String {
        &self.tmp_prefix
    }

    pub(crate) fn tmp_suffix(&self) -> &String {
        &self.tmp_suffix
    }

    pub(crate) fn field_separator(&self) -> char {
        self.field_separator
    }

    pub(crate) fn output_separator(&self) -> char {
        self.output_separator
    }

    pub(crate) fn skip_header(&self) -> bool {
        self.skip_header
    }

    pub(crate) fn ignore_empty(&self) -> bool {
        self.ignore_empty
    }

    pub(crate) fn ignore_lines(&self) -> &Option<Regex> {
        &self.ignore_lines
    }

    pub(crate) fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn key_index(&self) -> usize {
        self.key_index
    }

    pub(crate) fn field_count(&self) -> Option<usize> {
        self.field_count
    }

    pub(crate) fn malformed_policy(&self) -> MalformedPolicy {
        self.malformed_policy
    }

    pub(crate) fn intermediate_files(&self) -> usize {
        self.intermediate_files
    }

    pub(crate) fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout
    }
}
