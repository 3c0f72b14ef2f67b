use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::info;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input SDB file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target JSON file
    #[arg(short, long, value_name = "JSON")]
    output: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let db = super::open(&self.file)?;
        info!("writing {} entries to {}", db.len(), self.output.display());

        let out = if !self.overwrite {
            File::create_new(&self.output)
                .into_diagnostic()
                .context(format!("creating {}", &self.output.display()))?
        } else {
            File::create(&self.output)
                .into_diagnostic()
                .context(format!("creating {}", &self.output.display()))?
        };

        let mut out = BufWriter::new(out);
        serde_json::to_writer_pretty(&mut out, db.store())
            .into_diagnostic()
            .context("serializing entries")?;
        out.flush().into_diagnostic()?;

        Ok(())
    }
}
