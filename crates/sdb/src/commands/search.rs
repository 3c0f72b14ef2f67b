use clap::{Args, ValueEnum};
use miette::Result;
use owo_colors::OwoColorize;
use sdb_core::SearchField;
use std::path::PathBuf;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Field {
    #[default]
    Text,
    HashId,
    Index,
}

impl From<Field> for SearchField {
    fn from(value: Field) -> Self {
        match value {
            Field::Text => SearchField::Text,
            Field::HashId => SearchField::HashId,
            Field::Index => SearchField::Index,
        }
    }
}

#[derive(Args)]
pub struct SearchArgs {
    /// An input SDB file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Case-insensitive substring to look for
    #[arg(short, long)]
    query: String,

    /// What to match the query against
    #[arg(long, value_enum, default_value_t = Field::Text)]
    field: Field,
}

impl SearchArgs {
    pub fn handle(&self) -> Result<()> {
        let db = super::open(&self.file)?;

        let found = db.store().search_indexed(&self.query, self.field.into());
        for (index, entry) in &found {
            println!("{:>6} {} {}", index.dimmed(), entry.hash_id.cyan(), entry.text);
        }
        eprintln!("{} of {} entries matched", found.len(), db.len());

        Ok(())
    }
}
