use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use sdb_core::{
    write::{EncodeOptions, SdbWriter},
    StringEntry,
};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Seek, Write},
    path::PathBuf,
};
use tracing::{info, warn};

#[derive(Args)]
pub struct MergeArgs {
    /// An input JSON file, as written by `extract`
    #[arg(short, long, value_name = "JSON")]
    input: PathBuf,

    /// A target SDB file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Obscure the text of every entry
    #[arg(long, default_value_t = false)]
    obscure: bool,
}

impl MergeArgs {
    pub fn handle(&self) -> Result<()> {
        let input = File::open(&self.input)
            .into_diagnostic()
            .context(format!("path: {}", &self.input.display()))?;

        let entries: Vec<StringEntry> = serde_json::from_reader(BufReader::new(input))
            .into_diagnostic()
            .context(format!("parsing {}", &self.input.display()))?;

        if entries.is_empty() {
            warn!("no entries in {}, writing an empty file", self.input.display());
        }

        info!("creating {}", &self.file.display());

        let out = if !self.overwrite {
            File::create_new(&self.file)
                .into_diagnostic()
                .context(format!("creating {}", &self.file.display()))?
        } else {
            File::create(&self.file)
                .into_diagnostic()
                .context(format!("creating {}", &self.file.display()))?
        };

        write_entries(
            BufWriter::new(out),
            &entries,
            EncodeOptions::builder().obscure(self.obscure).build(),
        )?
        .flush()
        .into_diagnostic()?;

        Ok(())
    }
}

fn write_entries<W: Write + Seek>(
    out: W,
    entries: &[StringEntry],
    options: EncodeOptions,
) -> Result<W> {
    let mut sdb = SdbWriter::new(out, options);
    for entry in entries {
        sdb.add_entry(entry);
    }
    info!("merging {} entries", sdb.len());

    let out = sdb.finish().context("finalizing sdb file")?;
    Ok(out)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use sdb_core::{read::decode, write::EncodeOptions, StringEntry};
    use std::io::Cursor;

    use super::write_entries;

    #[test]
    fn empty_list_writes_bare_header() -> miette::Result<()> {
        let out = write_entries(Cursor::new(Vec::new()), &[], EncodeOptions::default())?;

        let bytes = out.into_inner();
        assert_eq!(bytes, vec![0u8; 8]);
        assert!(decode(&bytes)?.is_empty());

        Ok(())
    }

    #[test]
    fn entries_are_written_in_order() -> miette::Result<()> {
        let entries = vec![
            StringEntry::new(2, "second".into(), false),
            StringEntry::new(1, "first".into(), false),
        ];
        let out = write_entries(
            Cursor::new(Vec::new()),
            &entries,
            EncodeOptions::builder().obscure(true).build(),
        )?;

        let decoded = decode(&out.into_inner())?;
        assert_eq!(
            decoded.iter().map(|e| (e.hash_id, e.text.as_str())).collect::<Vec<_>>(),
            vec![(2, "second"), (1, "first")]
        );

        Ok(())
    }
}
