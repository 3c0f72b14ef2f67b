//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent warpper for [`FormatError`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Format(#[from] FormatError),

    /// Transparent warpper for [`tempfile::PersistError`]
    #[error(transparent)]
    PersistError(#[from] tempfile::PersistError),
}

/// The bytes do not describe a valid string database
///
/// Any of these aborts the whole decode or encode, no partial output is produced.
#[derive(Error, Diagnostic, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// buffer is shorter than the 8 byte header
    #[error("truncated header: file is {len} bytes, header needs 8")]
    #[diagnostic(code(sdb::truncated_header))]
    TruncatedHeader { len: usize },

    /// buffer is shorter than the record table declared by the header
    #[error("truncated table: {count} records do not fit in {len} bytes")]
    #[diagnostic(code(sdb::truncated_table))]
    TruncatedTable { count: u32, len: usize },

    /// a record points outside of the buffer
    #[error("record {index} points at {address}+{size}, past the end of a {len} byte file")]
    #[diagnostic(
        code(sdb::payload_out_of_range),
        help("the file is most likely truncated or the table is corrupt")
    )]
    PayloadOutOfRange {
        index: usize,
        address: u32,
        size: u32,
        len: usize,
    },

    /// the entries need more bytes than 32 bit addresses can reach
    #[error("{records} records need {len} bytes, more than 32 bit addresses can reach")]
    #[diagnostic(
        code(sdb::too_large),
        help("split the entries across several files")
    )]
    TooLarge { records: usize, len: u64 },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
