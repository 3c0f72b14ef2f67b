//! Base types for structure of SDB file.

use binrw::{BinRead, BinWrite};
use derive_more::derive::Constructor;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Header tag marking a file whose string payloads are obscured
pub const OBSCURED_TAG: u32 = 0x100;

/// Header tag written for plaintext files
pub const PLAINTEXT_TAG: u32 = 0;

/// Size of [`SdbHeader`] on disk
pub const HEADER_SIZE: usize = 8;

/// Size of a single [`SdbRecord`] on disk
pub const RECORD_SIZE: usize = 12;

/// SDB file header
///
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct SdbHeader {
    /// [`OBSCURED_TAG`] when payloads are obscured, anything else means plaintext
    pub tag: u32,

    /// The number of records stored in the file
    pub count: u32,
}

impl SdbHeader {
    /// Whether the payloads described by this header are obscured
    pub fn is_obscured(&self) -> bool {
        self.tag == OBSCURED_TAG
    }

    /// Offset of the first byte after the record table
    pub fn table_end(&self) -> u64 {
        HEADER_SIZE as u64 + RECORD_SIZE as u64 * self.count as u64
    }
}

/// SDB table record
///
/// Defines where a single string lives in the file. Only used while reading or writing.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct SdbRecord {
    /// Absolute offset from the start of the file to the payload
    pub address: u32,

    /// Length of the payload, excluding the trailing NUL
    pub size: u32,

    /// Identifier of the string
    pub hash_id: u32,
}

impl SdbRecord {
    /// Offset one past the last payload byte
    pub fn end(&self) -> u64 {
        self.address as u64 + self.size as u64
    }
}

/// A single decoded string
///
/// `text` is always plaintext, `was_mangled` only records whether it was obscured in the file it came from.
#[derive(Constructor, Debug, Default, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StringEntry {
    pub hash_id: u32,
    pub text: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub was_mangled: bool,
}
