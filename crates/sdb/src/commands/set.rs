use clap::Args;
use miette::Result;
use sdb_core::database::SaveOptions;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct SetArgs {
    /// An SDB file to edit in place
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Hash id of the entry, a new id is assigned when omitted
    #[arg(long, value_name = "ID")]
    hash: Option<u32>,

    /// The new text
    #[arg(short, long)]
    text: String,

    /// Write through a temporary file
    #[arg(long, default_value_t = false)]
    atomic: bool,
}

impl SetArgs {
    pub fn handle(&self) -> Result<()> {
        let mut db = super::open(&self.file)?;

        match self.hash {
            Some(hash_id) if db.update(hash_id, self.text.as_str()) => {
                info!("updated {}", hash_id);
            }
            hash => {
                let hash_id = db.add(self.text.as_str(), hash);
                info!("added {}", hash_id);
                println!("{}", hash_id);
            }
        }

        let path = self.file.clone();
        db.save_as(path, SaveOptions::builder().atomic(self.atomic).build())?;

        Ok(())
    }
}
