use std::{path::Path, sync::Arc};

use miette::{Context, Result};
use sdb_core::{CacheTier, StringDatabase};

pub mod diff;
pub mod extract;
pub mod info;
pub mod merge;
pub mod remove;
pub mod search;
pub mod set;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Show the header of an SDB file
    Info(info::InfoArgs),
    /// Extract an SDB file into JSON
    Extract(extract::ExtractArgs),
    /// Merge JSON entries into an SDB file
    Merge(merge::MergeArgs),
    /// Search the entries of an SDB file
    Search(search::SearchArgs),
    /// Update or add an entry
    Set(set::SetArgs),
    /// Remove an entry
    Remove(remove::RemoveArgs),
    /// Compare two SDB files
    Diff(diff::DiffArgs),
}

impl Commands {
    pub fn handle(&self) -> Result<()> {
        match self {
            Commands::Info(info) => info.handle(),
            Commands::Extract(extract) => extract.handle(),
            Commands::Merge(merge) => merge.handle(),
            Commands::Search(search) => search.handle(),
            Commands::Set(set) => set.handle(),
            Commands::Remove(remove) => remove.handle(),
            Commands::Diff(diff) => diff.handle(),
        }
    }
}

pub(crate) fn open(path: &Path) -> Result<StringDatabase> {
    let db = StringDatabase::open(path, Arc::new(CacheTier::default()))
        .context(format!("path: {}", path.display()))?;
    Ok(db)
}
