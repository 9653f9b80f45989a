use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::SortError;

/// A single line of delimited text and the integer key parsed from one of its fields.
///
/// Ordering and equality only consider the key.
#[derive(Debug)]
pub(crate) struct LineRecord {
    line: String,
    key: i64,
}

impl LineRecord {
    /// Parse `line` into a record keyed by the field at zero based `key_index`.
    ///
    /// The line terminator is stripped. When `field_count` is given a line with any other number of
    /// fields is rejected. `line_number` only serves the error message.
    pub(crate) fn new(
        line: &str,
        line_number: usize,
        field_separator: char,
        key_index: usize,
        field_count: Option<usize>,
    ) -> Result<LineRecord, SortError> {
        let line = line.trim_end_matches(&['\n', '\r'][..]);
        let malformed = |reason: String| SortError::MalformedRecord {
            line: line_number,
            reason,
        };

        let fields = line.split(field_separator).count();
        if let Some(expected) = field_count {
            if fields != expected {
                return Err(malformed(format!("expected {} fields, found {}", expected, fields)));
            }
        }

        let field = line.split(field_separator)
            .nth(key_index)
            .ok_or_else(|| malformed(
                format!(
                    "requested key field {} but there are only {} fields using {:?} as field separator",
                    key_index,
                    fields,
                    field_separator,
                )
            ))?;

        let key = i64::from_str(field.trim())
            .map_err(|e| malformed(format!("key field {:?} is not an integer: {}", field, e)))?;

        Ok(
            LineRecord {
                line: line.to_string(),
                key,
            }
        )
    }

    pub(crate) fn key(&self) -> i64 {
        self.key
    }

    /// Consume the record returning the line with `from` separators replaced by `to`.
    pub(crate) fn into_line(self, from: char, to: char) -> String {
        if from == to {
            self.line
        } else {
            self.line.replace(from, to.encode_utf8(&mut [0; 4]))
        }
    }
}

impl Eq for LineRecord {}

impl PartialEq<Self> for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl PartialOrd<Self> for LineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
