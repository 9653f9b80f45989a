/// What the partitioner does with a record it cannot parse
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Fail the whole partition with [SortError::MalformedRecord](crate::error::SortError::MalformedRecord)
    /// and remove the chunks written so far
    #[default]
    Abort,
    /// Log the record, leave it out of the output and continue
    Skip,
}
