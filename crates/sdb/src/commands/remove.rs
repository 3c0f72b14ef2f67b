use clap::Args;
use miette::{miette, Result};
use sdb_core::database::SaveOptions;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct RemoveArgs {
    /// An SDB file to edit in place
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Hash id of the entry to remove
    #[arg(long, value_name = "ID")]
    hash: u32,

    /// Write through a temporary file
    #[arg(long, default_value_t = false)]
    atomic: bool,
}

impl RemoveArgs {
    pub fn handle(&self) -> Result<()> {
        let mut db = super::open(&self.file)?;

        if !db.delete(self.hash) {
            return Err(miette!(
                "no entry with hash id {} in {}",
                self.hash,
                self.file.display()
            ));
        }
        info!("removed {}", self.hash);

        let path = self.file.clone();
        db.save_as(path, SaveOptions::builder().atomic(self.atomic).build())?;

        Ok(())
    }
}
