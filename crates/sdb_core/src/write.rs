//! Types for writing SDB files
//!

use binrw::BinWrite;
use bon::Builder;
use byteorder::WriteBytesExt;
use std::io::{Cursor, Seek, Write};
use tracing::instrument;

use crate::cipher;
use crate::error::{FormatError, Result};
use crate::types::{
    SdbHeader, SdbRecord, StringEntry, HEADER_SIZE, OBSCURED_TAG, PLAINTEXT_TAG, RECORD_SIZE,
};

/// Options for how the SDB file should be written
#[derive(Debug, Default, Clone, Copy, Builder)]
pub struct EncodeOptions {
    /// Obscure every payload and tag the file accordingly
    ///
    /// Off by default: saving always normalizes a file to plaintext unless asked otherwise.
    #[builder(default)]
    pub obscure: bool,
}

/// Encode entries into a plaintext SDB buffer
///
/// An empty list produces a bare header. The only failure is a list too large for 32 bit addresses.
pub fn encode(entries: &[StringEntry]) -> Result<Vec<u8>> {
    encode_with(entries, EncodeOptions::default())
}

/// Encode entries into an SDB buffer
pub fn encode_with(entries: &[StringEntry], options: EncodeOptions) -> Result<Vec<u8>> {
    let mut writer = SdbWriter::new(Cursor::new(Vec::new()), options);
    for entry in entries {
        writer.add_entry(entry);
    }

    Ok(writer.finish()?.into_inner())
}

/// Lay out the table for strings of the given lengths, in order
///
/// Addresses start right after the table and each string reserves one extra byte for its NUL.
fn layout(lengths: &[(u32, usize)]) -> Result<Vec<SdbRecord>> {
    let too_large = || FormatError::TooLarge {
        records: lengths.len(),
        len: HEADER_SIZE as u64
            + lengths
                .iter()
                .map(|(_, len)| RECORD_SIZE as u64 + *len as u64 + 1)
                .sum::<u64>(),
    };

    let count = u32::try_from(lengths.len()).map_err(|_| too_large())?;
    let mut address = SdbHeader { tag: 0, count }.table_end();

    let mut records = Vec::with_capacity(lengths.len());
    for &(hash_id, len) in lengths {
        records.push(SdbRecord {
            address: u32::try_from(address).map_err(|_| too_large())?,
            size: u32::try_from(len).map_err(|_| too_large())?,
            hash_id,
        });
        address += len as u64 + 1;
    }

    Ok(records)
}

/// SDB file generator
///
/// Strings are buffered until [`SdbWriter::finish`] is called, since the table in front of them can only be laid
/// out once the final count is known.
///
/// ```
/// # fn doit() -> sdb_core::error::Result<()>
/// # {
/// use sdb_core::write::{EncodeOptions, SdbWriter};
///
/// // We use a buffer here, though you'd normally use a `File`
/// let mut sdb = SdbWriter::new(std::io::Cursor::new(Vec::new()), EncodeOptions::builder()
///            .obscure(false)
///            .build());
///
/// sdb.add(0x1000_0000, "Hello, World!");
///
/// let buffer = sdb.finish()?.into_inner();
/// assert_eq!(buffer.len(), 8 + 12 + 14);
///
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct SdbWriter<W: Write + Seek> {
    inner: W,
    options: EncodeOptions,
    /// Hash id and byte length of every string, in order
    lengths: Vec<(u32, usize)>,
    blob: Vec<u8>,
}

impl<W: Write + Seek> SdbWriter<W> {
    /// Initializes the writer.
    pub fn new(inner: W, options: EncodeOptions) -> SdbWriter<W> {
        SdbWriter {
            inner,
            options,
            lengths: Vec::new(),
            blob: Vec::new(),
        }
    }

    /// Number of strings added so far
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Whether no strings have been added yet
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Append a string to the file
    pub fn add(&mut self, hash_id: u32, text: &str) {
        self.lengths.push((hash_id, text.len()));
        self.blob.extend_from_slice(text.as_bytes());
    }

    /// Append an entry to the file
    pub fn add_entry(&mut self, entry: &StringEntry) {
        self.add(entry.hash_id, &entry.text);
    }

    /// Write the header, table and string blob
    ///
    /// Fails without writing anything when the strings cannot be addressed with 32 bits. This will return the
    /// writer, but one should normally not append any data to the end of the file.
    #[instrument(skip(self), fields(count = self.lengths.len(), obscure = self.options.obscure), err)]
    pub fn finish(mut self) -> Result<W> {
        let records = layout(&self.lengths)?;
        let header = SdbHeader {
            tag: if self.options.obscure {
                OBSCURED_TAG
            } else {
                PLAINTEXT_TAG
            },
            count: records.len() as u32,
        };

        header.write(&mut self.inner)?;
        for record in &records {
            record.write(&mut self.inner)?;
        }

        let mut offset = 0;
        for record in &records {
            let payload = &mut self.blob[offset..offset + record.size as usize];
            offset += payload.len();

            if self.options.obscure {
                cipher::obscure_in_place(payload, record.address);
            }

            self.inner.write_all(payload)?;
            self.inner.write_u8(0)?;
        }

        self.inner.flush()?;
        Ok(self.inner)
    }
}
