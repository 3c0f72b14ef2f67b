//! This library handles reading, editing and creating **SDB** string database files.
//!
//! # SDB Format Documentation
//!
//! The SDB format is a small binary container for localized text. Every string is keyed by a 32-bit hash id and
//! may optionally be obscured with a lightweight per-record stream cipher. SDB files are typically identified
//! with the `.sdb` extension.
//!
//! ## File Structure
//!
//! A SDB file consists of a header, followed by a record table, and a blob holding the strings themselves.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Tag                    | 4 bytes: 0x00000100 when strings are obscured              |
//! | 0x0004         | Record Count           | 4 bytes: Number of strings in the file                     |
//! | 0x0008         | Records                | Record Count * 12 bytes                                    |
//!
//! ### Header
//!
//! - **Tag**: A 4-byte unsigned integer. `0x100` marks the string payloads as obscured, any other value means they
//!   are stored as plain UTF-8. Files written by this crate use `0` unless obscuring is requested.
//! - **Record Count**: A 4-byte unsigned integer indicating the number of records in the table.
//!
//! ### Record Table
//!
//! Directly after the header, one record per string is stored. Each record has the following structure:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Address                | 4 bytes: Absolute offset of the string in the file      |
//! | 0x0004         | Size                   | 4 bytes: Length of the string, excluding the NUL        |
//! | 0x0008         | Hash ID                | 4 bytes: Identifier of the string                       |
//!
//! ### String Blob
//!
//! The strings follow the table in table order, each one immediately followed by a single `0x00` byte. When
//! written, addresses are assigned sequentially starting right after the table, at `8 + 12 * count`.
//!
//! ### Obscured Strings
//!
//! Obscured payloads are XORed byte by byte with a key that starts at `(address & 0xFF) ^ 0xCD` and is then
//! replaced by each ciphertext byte in turn. See [`cipher`] for details.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.sdb`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod cache;
pub mod cipher;
pub mod database;
pub mod error;
pub mod read;
pub mod store;
pub mod types;
pub mod write;

pub use cache::CacheTier;
pub use database::StringDatabase;
pub use store::{EntryStore, SearchField};
pub use types::StringEntry;
