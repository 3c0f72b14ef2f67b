//! In-memory collection of the entries of one loaded file.
//!
//! All lookups are linear scans in list order, so duplicate hash ids resolve to the first match.

use derive_more::derive::{Deref, Display, IntoIterator};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::StringEntry;

/// Hash id handed out by [`EntryStore::add`] when the store is empty
pub const FIRST_HASH_ID: u32 = 0x1000_0000;

/// Which part of an entry [`EntryStore::search`] matches against
#[derive(Debug, Display, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SearchField {
    /// The entry text
    #[default]
    #[display("text")]
    Text,

    /// The decimal hash id
    #[display("hashid")]
    HashId,

    /// The decimal position of the entry in the store
    #[display("index")]
    Index,
}

impl FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(SearchField::Text),
            "hashid" | "hash-id" | "hash_id" | "hash" => Ok(SearchField::HashId),
            "index" => Ok(SearchField::Index),
            _ => Err(format!("unknown search field {s}")),
        }
    }
}

/// Ordered entries of one SDB file
///
/// Order is the on-disk table order after a load; new entries are appended and nothing is ever re-sorted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deref, IntoIterator)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntryStore {
    #[deref]
    #[into_iterator(owned, ref)]
    entries: Vec<StringEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<StringEntry>) -> Self {
        Self { entries }
    }

    pub fn into_entries(self) -> Vec<StringEntry> {
        self.entries
    }

    /// Snapshot of every entry
    pub fn get_all(&self) -> &[StringEntry] {
        &self.entries
    }

    /// Up to `count` entries starting at `start`, clamped to the store bounds
    pub fn get_chunk(&self, start: usize, count: usize) -> &[StringEntry] {
        let start = start.min(self.entries.len());
        let end = start.saturating_add(count).min(self.entries.len());
        &self.entries[start..end]
    }

    /// Largest hash id present, if any
    pub fn max_hash_id(&self) -> Option<u32> {
        self.entries.iter().map(|e| e.hash_id).max()
    }

    /// Hash id [`EntryStore::add`] would assign next
    pub fn next_hash_id(&self) -> u32 {
        self.max_hash_id()
            .map(|id| id.wrapping_add(1))
            .unwrap_or(FIRST_HASH_ID)
    }

    /// Append a new entry, returning its hash id
    ///
    /// A caller supplied id is used as is, even if it already exists.
    pub fn add(&mut self, text: impl Into<String>, hash_id: Option<u32>) -> u32 {
        let hash_id = hash_id.unwrap_or_else(|| self.next_hash_id());
        self.entries.push(StringEntry {
            hash_id,
            text: text.into(),
            was_mangled: false,
        });
        hash_id
    }

    /// Replace the text of the first entry with `hash_id`
    pub fn update(&mut self, hash_id: u32, text: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.hash_id == hash_id) {
            Some(entry) => {
                entry.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Remove the first entry with `hash_id`
    pub fn delete(&mut self, hash_id: u32) -> bool {
        match self.index_of(hash_id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Position of the first entry with `hash_id`
    pub fn index_of(&self, hash_id: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.hash_id == hash_id)
    }

    pub fn get_by_hash(&self, hash_id: u32) -> Option<&StringEntry> {
        self.entries.iter().find(|e| e.hash_id == hash_id)
    }

    /// Case-insensitive substring search over one field
    ///
    /// An empty query matches every entry.
    pub fn search(&self, query: &str, field: SearchField) -> Vec<StringEntry> {
        self.search_indexed(query, field)
            .into_iter()
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Like [`EntryStore::search`], paired with the position of each match
    ///
    /// Positions come from the scan itself, so entries sharing a hash id keep their own index.
    pub fn search_indexed(&self, query: &str, field: SearchField) -> Vec<(usize, &StringEntry)> {
        let query = query.to_lowercase();

        self.entries
            .iter()
            .enumerate()
            .filter(|(index, entry)| match field {
                SearchField::Text => entry.text.to_lowercase().contains(&query),
                SearchField::HashId => entry.hash_id.to_string().contains(&query),
                SearchField::Index => index.to_string().contains(&query),
            })
            .collect()
    }
}

impl From<Vec<StringEntry>> for EntryStore {
    fn from(entries: Vec<StringEntry>) -> Self {
        Self::from_entries(entries)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample() -> EntryStore {
        EntryStore::from_entries(vec![
            StringEntry::new(10, "Hello World".into(), false),
            StringEntry::new(21, "goodbye".into(), false),
            StringEntry::new(310, "HELLO again".into(), true),
        ])
    }

    #[test]
    fn add_to_empty_store_uses_first_id() {
        let mut store = EntryStore::new();
        assert_eq!(store.add("first", None), FIRST_HASH_ID);
        assert_eq!(store.add("second", None), FIRST_HASH_ID + 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn add_continues_from_max_id() {
        let mut store = sample();
        assert_eq!(store.add("new", None), 311);
        assert_eq!(store.last().map(|e| e.hash_id), Some(311));
        assert!(!store.last().is_some_and(|e| e.was_mangled));
    }

    #[test]
    fn add_accepts_duplicate_ids() {
        let mut store = sample();
        assert_eq!(store.add("shadowed", Some(10)), 10);
        assert_eq!(store.len(), 4);
        assert_eq!(store.get_by_hash(10).map(|e| e.text.as_str()), Some("Hello World"));
    }

    #[test]
    fn update_and_delete_hit_first_match() {
        let mut store = sample();
        store.add("duplicate", Some(21));

        assert!(store.update(21, "changed"));
        assert_eq!(store[1].text, "changed");
        assert_eq!(store[3].text, "duplicate");

        assert!(store.delete(21));
        assert_eq!(store.get_by_hash(21).map(|e| e.text.as_str()), Some("duplicate"));

        assert!(!store.update(999, "missing"));
        assert!(!store.delete(999));
    }

    #[test]
    fn search_text_is_case_insensitive() {
        let store = sample();
        let found = store.search("hello", SearchField::Text);
        assert_eq!(
            found.iter().map(|e| e.hash_id).collect::<Vec<_>>(),
            vec![10, 310]
        );
    }

    #[test]
    fn search_hash_and_index_use_decimal() {
        let store = sample();
        assert_eq!(
            store
                .search("10", SearchField::HashId)
                .iter()
                .map(|e| e.hash_id)
                .collect::<Vec<_>>(),
            vec![10, 310]
        );
        assert_eq!(
            store
                .search("2", SearchField::Index)
                .iter()
                .map(|e| e.hash_id)
                .collect::<Vec<_>>(),
            vec![310]
        );
    }

    #[test]
    fn empty_query_matches_everything() {
        let store = sample();
        assert_eq!(store.search("", SearchField::Text).len(), 3);
        assert_eq!(store.search("", SearchField::HashId).len(), 3);
    }

    #[test]
    fn chunks_are_clamped() {
        let store = sample();
        assert_eq!(store.get_chunk(1, 10).len(), 2);
        assert!(store.get_chunk(5, 10).is_empty());
        assert_eq!(store.get_chunk(0, usize::MAX).len(), 3);
    }

    #[test]
    fn parse_search_field() {
        assert_eq!("Text".parse::<SearchField>(), Ok(SearchField::Text));
        assert_eq!("hash-id".parse::<SearchField>(), Ok(SearchField::HashId));
        assert_eq!("INDEX".parse::<SearchField>(), Ok(SearchField::Index));
        assert!("other".parse::<SearchField>().is_err());
        assert_eq!(SearchField::HashId.to_string(), "hashid");
    }

    #[test]
    fn search_indexed_keeps_positions_of_duplicates() {
        let mut store = sample();
        store.add("hello duplicate", Some(10));

        let found = store
            .search_indexed("hello", SearchField::Text)
            .into_iter()
            .map(|(index, entry)| (index, entry.hash_id))
            .collect::<Vec<_>>();
        assert_eq!(found, vec![(0, 10), (2, 310), (3, 10)]);

        let by_index = store.search_indexed("3", SearchField::Index);
        assert_eq!(by_index.len(), 1);
        assert_eq!(by_index[0].0, 3);
        assert_eq!(by_index[0].1.text, "hello duplicate");
    }
}
