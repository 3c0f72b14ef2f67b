use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use sdb_core::read::{decode, read_header};
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// An input SDB file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let bytes = std::fs::read(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;

        let header = read_header(&bytes)?;
        let entries = decode(&bytes)?;

        println!("{}", self.file.display().bold());
        println!("  tag:      {:#06X}", header.tag);
        println!("  obscured: {}", header.is_obscured());
        println!("  entries:  {}", entries.len());
        println!("  size:     {} bytes", bytes.len());
        if let (Some(first), Some(last)) = (
            entries.iter().map(|e| e.hash_id).min(),
            entries.iter().map(|e| e.hash_id).max(),
        ) {
            println!("  hash ids: {:#010X}..={:#010X}", first, last);
        }

        Ok(())
    }
}
