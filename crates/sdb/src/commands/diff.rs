use clap::{Args, ValueEnum};
use itertools::Itertools;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use sdb_core::{
    read::{decode, read_header},
    StringEntry,
};
use similar::{ChangeTag, TextDiff};
use std::{collections::HashMap, fmt::Display, path::PathBuf};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    #[default]
    Semantic,
    Full,
}

#[derive(Debug, PartialEq, Eq)]
enum Change {
    Comparison(String, String, String),
    Added(u32, String),
    Removed(u32, String),
    Modified(u32, Vec<String>),
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Comparison(key, old, new) => {
                writeln!(f, "* {}: {} vs {}", key, old.red(), new.green())
            }
            Change::Added(hash_id, text) => {
                writeln!(f, "✅ {}: {}", hash_id, text.green())
            }
            Change::Removed(hash_id, text) => {
                writeln!(f, "❌ {}: {}", hash_id, text.red())
            }
            Change::Modified(hash_id, context) => {
                writeln!(f, "🔃 {}", hash_id.blue())?;
                if !context.is_empty() {
                    writeln!(
                        f,
                        "{}",
                        context
                            .iter()
                            .flat_map(|c| c.lines())
                            .map(|l| "   ".to_string() + l)
                            .join("\n")
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Text of the first entry for every hash id, matching how lookups resolve duplicates
fn by_hash(entries: &[StringEntry]) -> HashMap<u32, &str> {
    entries
        .iter()
        .unique_by(|e| e.hash_id)
        .map(|e| (e.hash_id, e.text.as_str()))
        .collect()
}

fn inline(old: &str, new: &str) -> Vec<String> {
    let diff = TextDiff::from_lines(old, new);

    let mut comparison = Vec::new();
    for op in diff.ops().iter() {
        for change in diff.iter_inline_changes(op) {
            let mut context = String::new();
            for (emphasized, value) in change.iter_strings_lossy() {
                if emphasized {
                    if change.tag() == ChangeTag::Insert {
                        context.push_str(&format!("{}", value.green().underline()));
                    } else {
                        context.push_str(&format!("{}", value.red().underline()));
                    }
                } else {
                    context.push_str(&format!("{}", value.dimmed()));
                }
            }
            comparison.push(context);
        }
    }
    comparison
}

fn changes(left: &[StringEntry], right: &[StringEntry], mode: Mode) -> Vec<Change> {
    let left_texts = by_hash(left);
    let right_texts = by_hash(right);

    let mut result = Vec::new();

    if left.len() != right.len() {
        result.push(Change::Comparison(
            "entries".into(),
            left.len().to_string(),
            right.len().to_string(),
        ));
    }

    right
        .iter()
        .unique_by(|e| e.hash_id)
        .filter(|e| !left_texts.contains_key(&e.hash_id))
        .map(|e| Change::Added(e.hash_id, e.text.clone()))
        .for_each(|c| result.push(c));

    left.iter()
        .unique_by(|e| e.hash_id)
        .filter(|e| !right_texts.contains_key(&e.hash_id))
        .map(|e| Change::Removed(e.hash_id, e.text.clone()))
        .for_each(|c| result.push(c));

    left.iter()
        .unique_by(|e| e.hash_id)
        .filter_map(|e| {
            let new = right_texts.get(&e.hash_id)?;
            if *new == e.text {
                return None;
            }

            let context = match mode {
                Mode::Full => inline(&e.text, new),
                Mode::Semantic => Vec::new(),
            };
            Some(Change::Modified(e.hash_id, context))
        })
        .for_each(|c| result.push(c));

    result
}

#[derive(Args)]
pub struct DiffArgs {
    /// An input SDB file
    #[arg(short, long, value_name = "FILE")]
    left: PathBuf,

    /// An input SDB file
    #[arg(short, long, value_name = "FILE")]
    right: PathBuf,

    /// Comparison mode
    #[arg(short, long, value_enum, default_value_t = Mode::Semantic)]
    mode: Mode,
}

impl DiffArgs {
    pub fn handle(&self) -> Result<()> {
        let l = std::fs::read(&self.left)
            .into_diagnostic()
            .context(format!("path: {}", &self.left.display()))?;
        let r = std::fs::read(&self.right)
            .into_diagnostic()
            .context(format!("path: {}", &self.right.display()))?;

        let mut result = Vec::new();

        if self.mode == Mode::Full {
            let (left, right) = (read_header(&l)?, read_header(&r)?);
            if left.is_obscured() != right.is_obscured() {
                result.push(Change::Comparison(
                    "obscured".into(),
                    left.is_obscured().to_string(),
                    right.is_obscured().to_string(),
                ));
            }
        }

        result.extend(changes(&decode(&l)?, &decode(&r)?, self.mode));

        if !result.is_empty() {
            println!("🔃 {}", self.left.to_string_lossy().blue());
            for c in result {
                print!("{}", c);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use sdb_core::StringEntry;

    use super::{changes, Change, Mode};

    fn entries(items: &[(u32, &str)]) -> Vec<StringEntry> {
        items
            .iter()
            .map(|(hash_id, text)| StringEntry::new(*hash_id, text.to_string(), false))
            .collect()
    }

    #[test]
    fn identical_files_have_no_changes() {
        let left = entries(&[(1, "a"), (2, "b")]);
        assert!(changes(&left, &left.clone(), Mode::Full).is_empty());
    }

    #[test]
    fn semantic_changes() {
        let left = entries(&[(1, "same"), (2, "old"), (3, "gone")]);
        let right = entries(&[(1, "same"), (2, "new"), (4, "fresh"), (5, "more")]);

        assert_eq!(
            changes(&left, &right, Mode::Semantic),
            vec![
                Change::Comparison("entries".into(), "3".into(), "4".into()),
                Change::Added(4, "fresh".into()),
                Change::Added(5, "more".into()),
                Change::Removed(3, "gone".into()),
                Change::Modified(2, vec![]),
            ]
        );
    }

    #[test]
    fn duplicates_compare_first_match() {
        let left = entries(&[(1, "first"), (1, "second")]);
        let right = entries(&[(1, "first"), (1, "other")]);

        assert!(changes(&left, &right, Mode::Semantic).is_empty());
    }

    #[test]
    fn full_mode_shows_inline_context() {
        let left = entries(&[(7, "Hello World")]);
        let right = entries(&[(7, "Hello there")]);

        match changes(&left, &right, Mode::Full).as_slice() {
            [Change::Modified(7, context)] => assert_eq!(context.len(), 2),
            other => panic!("unexpected changes {:?}", other),
        }
    }
}
