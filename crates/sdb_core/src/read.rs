//! Types for reading SDB files
//!

use binrw::BinRead;
use bon::Builder;
use rayon::prelude::*;
use std::io::Cursor;
use tracing::{debug, instrument, warn};

use crate::{
    cipher,
    error::{FormatError, Result},
    types::{SdbHeader, SdbRecord, StringEntry, HEADER_SIZE},
};

/// Record count above which payloads are decoded on the rayon pool
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 5000;

/// Options for how an SDB buffer should be decoded
#[derive(Debug, Clone, Copy, Builder)]
pub struct DecodeOptions {
    /// Files with more records than this decode their payloads in parallel
    #[builder(default = DEFAULT_PARALLEL_THRESHOLD)]
    pub parallel_threshold: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Read only the header of an SDB buffer
pub fn read_header(bytes: &[u8]) -> Result<SdbHeader> {
    if bytes.len() < HEADER_SIZE {
        return Err(FormatError::TruncatedHeader { len: bytes.len() }.into());
    }

    Ok(SdbHeader::read(&mut Cursor::new(&bytes[..HEADER_SIZE]))?)
}

/// Decode an SDB buffer into its entries using the default [`DecodeOptions`]
///
/// ```
/// # fn doit() -> sdb_core::error::Result<()>
/// # {
/// let bytes = sdb_core::write::encode(&[sdb_core::StringEntry::new(1, "hello".into(), false)])?;
///
/// let entries = sdb_core::read::decode(&bytes)?;
/// assert_eq!(entries[0].text, "hello");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub fn decode(bytes: &[u8]) -> Result<Vec<StringEntry>> {
    decode_with(bytes, DecodeOptions::default())
}

/// Decode an SDB buffer into its entries
///
/// Entries are returned in table order. Every record is bounds checked before any payload is touched, so a
/// failure never yields a partial list.
#[instrument(skip(bytes), fields(len = bytes.len()), err)]
pub fn decode_with(bytes: &[u8], options: DecodeOptions) -> Result<Vec<StringEntry>> {
    let header = read_header(bytes)?;
    let records = read_records(bytes, &header)?;
    let obscured = header.is_obscured();

    let mut entries = vec![StringEntry::default(); records.len()];
    if records.len() > options.parallel_threshold {
        let chunk = records.len().div_ceil(rayon::current_num_threads().max(1));
        debug!(
            "decoding {} records in parallel, {} per task",
            records.len(),
            chunk
        );

        entries
            .par_chunks_mut(chunk)
            .zip(records.par_chunks(chunk))
            .for_each(|(slots, records)| {
                for (slot, record) in slots.iter_mut().zip(records) {
                    *slot = decode_entry(bytes, record, obscured);
                }
            });
    } else {
        debug!("decoding {} records", records.len());

        for (slot, record) in entries.iter_mut().zip(&records) {
            *slot = decode_entry(bytes, record, obscured);
        }
    }

    Ok(entries)
}

fn read_records(bytes: &[u8], header: &SdbHeader) -> Result<Vec<SdbRecord>> {
    if header.table_end() > bytes.len() as u64 {
        return Err(FormatError::TruncatedTable {
            count: header.count,
            len: bytes.len(),
        }
        .into());
    }

    let mut reader = Cursor::new(&bytes[HEADER_SIZE..header.table_end() as usize]);
    let records = (0..header.count)
        .map(|_| SdbRecord::read(&mut reader))
        .collect::<binrw::BinResult<Vec<_>>>()?;

    if let Some((index, record)) = records
        .iter()
        .enumerate()
        .find(|(_, r)| r.end() > bytes.len() as u64)
    {
        return Err(FormatError::PayloadOutOfRange {
            index,
            address: record.address,
            size: record.size,
            len: bytes.len(),
        }
        .into());
    }

    Ok(records)
}

fn decode_entry(bytes: &[u8], record: &SdbRecord, obscured: bool) -> StringEntry {
    let payload = &bytes[record.address as usize..record.end() as usize];

    let mut raw = if obscured {
        cipher::reveal(payload, record.address)
    } else {
        payload.to_vec()
    };

    if raw.last() == Some(&0) {
        raw.pop();
    }

    let text = match String::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "record {:#010x} is not valid utf-8, decoding lossily",
                record.hash_id
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    StringEntry {
        hash_id: record.hash_id,
        text,
        was_mangled: obscured,
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::{
        error::{Error, FormatError, Result},
        read::{decode, decode_with, read_header, DecodeOptions},
        types::StringEntry,
    };

    #[test]
    fn read_too_short_header() {
        let input = [0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00];

        assert!(matches!(
            decode(&input),
            Err(Error::Format(FormatError::TruncatedHeader { len: 7 }))
        ));
    }

    #[test]
    fn read_empty_file() -> Result<()> {
        let input = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

        assert!(decode(&input)?.is_empty());
        assert_eq!(read_header(&input)?.count, 0);

        Ok(())
    }

    #[test]
    fn read_truncated_table() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            // Only one record present
            0x14, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
        ];

        assert!(matches!(
            decode(&input),
            Err(Error::Format(FormatError::TruncatedTable { count: 2, len: 20 }))
        ));
    }

    #[test]
    fn read_huge_count_is_rejected() {
        let input = [0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];

        assert!(matches!(
            decode(&input),
            Err(Error::Format(FormatError::TruncatedTable { .. }))
        ));
    }

    #[test]
    fn read_payload_out_of_range() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            // Points at 20 with 4 bytes, file is only 22 long
            0x14, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x41, 0x42,
        ];

        assert!(matches!(
            decode(&input),
            Err(Error::Format(FormatError::PayloadOutOfRange {
                index: 0,
                address: 20,
                size: 4,
                len: 22
            }))
        ));
    }

    #[test]
    fn read_payload_with_overflowing_address() {
        #[rustfmt::skip]
        let input = [
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0xFF, 0xFF, 0xFF, 0xFF,
            0x02, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
        ];

        assert!(matches!(
            decode(&input),
            Err(Error::Format(FormatError::PayloadOutOfRange { .. }))
        ));
    }

    #[test]
    fn read_payload_without_terminator() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x14, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x07, 0x00, 0x00, 0x00,
            0x48, 0x69,
        ];

        assert_eq!(decode(&input)?, vec![StringEntry::new(7, "Hi".into(), false)]);

        Ok(())
    }

    #[test]
    fn read_invalid_utf8_lossily() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x14, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x07, 0x00, 0x00, 0x00,
            0x41, 0xFF, 0x00,
        ];

        assert_eq!(decode(&input)?[0].text, "A\u{FFFD}");

        Ok(())
    }

    #[test]
    fn parallel_threshold_is_exclusive() -> Result<()> {
        let entries = (0..4)
            .map(|i| StringEntry::new(i, format!("entry {i}"), false))
            .collect::<Vec<_>>();
        let bytes = crate::write::encode(&entries)?;

        let at_threshold = decode_with(&bytes, DecodeOptions::builder().parallel_threshold(4).build())?;
        let below_threshold =
            decode_with(&bytes, DecodeOptions::builder().parallel_threshold(3).build())?;

        assert_eq!(at_threshold, entries);
        assert_eq!(below_threshold, entries);

        Ok(())
    }
}
