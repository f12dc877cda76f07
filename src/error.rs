//! Error kinds for header parsing, record classification and MD scoring.
//!
//! `HeaderError` and `RecordError` are fatal for a statistics run. The MD
//! related kinds are recovered where they occur and only surface through
//! the lower level scoring functions.

/// Result type for the library, wrapping [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// The alignment header could not be read or is inconsistent
    Header(#[from] HeaderError),
    /// A single alignment record is malformed
    Record(#[from] RecordError),
    /// Standard I/O errors, including decode failures from the reader
    Io(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    #[error("unable to read alignment header: {0}")]
    Unreadable(#[source] std::io::Error),

    /// Two `@RG` lines share the same `ID`
    #[error("duplicate read group ID in header: {0}")]
    DuplicateReadGroup(String),
}

/// A record that cannot contribute to the statistics without misrepresenting them.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The CIGAR consumes more query bases than the record carries
    #[error(
        "record {name}: CIGAR consumes {cigar_len} query bases but the sequence has {seq_len}"
    )]
    CigarSequenceMismatch {
        name: String,
        cigar_len: usize,
        seq_len: usize,
    },
}

/// A malformed `MD` tag. Recovered by treating the record as non-divergent.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TagParseError {
    #[error("match run starting at offset {0} overflows")]
    RunOverflow(usize),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DivergenceError {
    #[error(transparent)]
    TagParse(#[from] TagParseError),

    /// Matched plus mismatched bases, less deletions, came to zero or below
    #[error("mapped total is {0}, divergence fraction is undefined")]
    DivisionDegenerate(i64),
}
