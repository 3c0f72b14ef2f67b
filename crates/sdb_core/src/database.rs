//! A loaded SDB file and its editing session.
//!

use bon::Builder;
use std::{
    any::Any,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::{
    cache::CacheTier,
    error::Result,
    read::{decode_with, DecodeOptions},
    store::{EntryStore, SearchField},
    types::StringEntry,
    write::{encode_with, EncodeOptions},
};

/// Options for how a [`StringDatabase`] is written back to disk
#[derive(Debug, Default, Clone, Copy, Builder)]
pub struct SaveOptions {
    /// Write to a temporary file next to the target and rename it into place
    ///
    /// When off, the target is truncated and written directly, so a failure midway leaves a partial file.
    #[builder(default)]
    pub atomic: bool,

    #[builder(default)]
    pub encode: EncodeOptions,
}

/// The entries of one SDB file together with the cache they are served through
///
/// Edits go straight to the [`EntryStore`] and keep the shared [`CacheTier`] consistent: every edit drops the
/// cached search results and refreshes the cached entries of the active path.
///
/// ```no_run
/// use std::sync::Arc;
/// use sdb_core::{cache::CacheTier, database::StringDatabase, store::SearchField};
///
/// fn rename(path: &str) -> sdb_core::error::Result<()> {
///     let cache = Arc::new(CacheTier::default());
///     let mut db = StringDatabase::open(path, cache)?;
///
///     for entry in db.search("old name", SearchField::Text) {
///         db.update(entry.hash_id, entry.text.replace("old name", "new name"));
///     }
///
///     db.save()
/// }
/// ```
#[derive(Debug)]
pub struct StringDatabase {
    cache: Arc<CacheTier>,
    path: Option<PathBuf>,
    options: DecodeOptions,
    store: EntryStore,
    modified: bool,
}

impl StringDatabase {
    /// An empty database that is not backed by any file yet
    pub fn new(cache: Arc<CacheTier>) -> Self {
        Self {
            cache,
            path: None,
            options: DecodeOptions::default(),
            store: EntryStore::new(),
            modified: false,
        }
    }

    /// Load the file at `path` using the default [`DecodeOptions`]
    pub fn open(path: impl AsRef<Path>, cache: Arc<CacheTier>) -> Result<Self> {
        Self::open_with(path, cache, DecodeOptions::default())
    }

    /// Load the file at `path`
    ///
    /// The cached entries are used when fresh, then the cached raw bytes, and only then is the file read from disk.
    /// A failed read leaves the cache untouched. A successful one drops the decoded text and search results, since
    /// those are not scoped to a file and may still describe whatever was open before.
    #[instrument(skip(path, cache), fields(path = %path.as_ref().display()), err)]
    pub fn open_with(
        path: impl AsRef<Path>,
        cache: Arc<CacheTier>,
        options: DecodeOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::load(path, &cache, options)?;
        cache.clear_text();
        cache.clear_search();

        Ok(Self {
            cache,
            path: Some(path.to_path_buf()),
            options,
            store,
            modified: false,
        })
    }

    fn load(path: &Path, cache: &CacheTier, options: DecodeOptions) -> Result<EntryStore> {
        if let Some(entries) = cache.get_cached_entries(path) {
            debug!("using {} cached entries", entries.len());
            return Ok(EntryStore::from_entries(entries.to_vec()));
        }

        let (bytes, from_disk) = match cache.get_cached_raw_file(path) {
            Some(bytes) => (bytes, false),
            None => (Arc::<[u8]>::from(std::fs::read(path)?), true),
        };

        let entries = decode_with(&bytes, options)?;
        info!("loaded {} entries", entries.len());

        // Only a file that decoded cleanly is worth remembering
        if from_disk {
            cache.cache_raw_file(path, bytes);
        }
        cache.cache_entries(path, &entries);
        Ok(EntryStore::from_entries(entries))
    }

    /// Discard every edit and load the active file again, with the options it was opened with
    pub fn reload(&mut self) -> Result<()> {
        if let Some(path) = &self.path {
            self.cache.clear(path);
            self.store = Self::load(path, &self.cache, self.options)?;
            self.cache.clear_text();
            self.modified = false;
        }
        Ok(())
    }

    /// The options used to decode the active file
    pub fn decode_options(&self) -> DecodeOptions {
        self.options
    }

    pub fn cache(&self) -> &Arc<CacheTier> {
        &self.cache
    }

    /// The file this database was loaded from or last saved to
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Whether there are edits that have not been saved
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn get_all(&self) -> &[StringEntry] {
        self.store.get_all()
    }

    pub fn get_chunk(&self, start: usize, count: usize) -> &[StringEntry] {
        self.store.get_chunk(start, count)
    }

    pub fn get_by_hash(&self, hash_id: u32) -> Option<&StringEntry> {
        self.store.get_by_hash(hash_id)
    }

    /// Text of the first entry with `hash_id`, served through the decoded text cache
    pub fn text_of(&self, hash_id: u32) -> Option<String> {
        if let Some(text) = self.cache.get_cached_text(hash_id) {
            return Some(text);
        }

        let text = self.store.get_by_hash(hash_id)?.text.clone();
        self.cache.cache_text(hash_id, text.clone());
        Some(text)
    }

    /// Search the entries, served through the search cache
    pub fn search(&self, query: &str, field: SearchField) -> Vec<StringEntry> {
        if let Some(results) = self.cache.get_cached_search_results(query, field) {
            return results.to_vec();
        }

        let results = self.store.search(query, field);
        self.cache.cache_search_results(query, field, &results);
        results
    }

    /// A presentation object for `hash_id`, built with `build` on a cache miss
    pub fn view_or_insert_with<T, F>(&self, hash_id: u32, build: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce(Option<&StringEntry>) -> T,
    {
        let scope = self.view_scope();
        if let Some(view) = self.cache.get_cached_view::<T>(&scope, hash_id) {
            return view;
        }

        let view = Arc::new(build(self.store.get_by_hash(hash_id)));
        self.cache.cache_view(&scope, hash_id, view.clone());
        view
    }

    fn view_scope(&self) -> PathBuf {
        self.path.clone().unwrap_or_default()
    }

    /// Append a new entry, returning its hash id
    pub fn add(&mut self, text: impl Into<String>, hash_id: Option<u32>) -> u32 {
        let hash_id = self.store.add(text, hash_id);
        self.structure_changed();
        hash_id
    }

    /// Replace the text of the first entry with `hash_id`
    pub fn update(&mut self, hash_id: u32, text: impl Into<String>) -> bool {
        if !self.store.update(hash_id, text) {
            return false;
        }

        self.cache.remove_text(hash_id);
        self.entries_changed();
        true
    }

    /// Remove the first entry with `hash_id`
    pub fn delete(&mut self, hash_id: u32) -> bool {
        if !self.store.delete(hash_id) {
            return false;
        }

        self.structure_changed();
        true
    }

    /// Replace every entry at once
    pub fn replace_entries(&mut self, entries: Vec<StringEntry>) {
        self.store = EntryStore::from_entries(entries);
        self.structure_changed();
    }

    fn structure_changed(&mut self) {
        self.cache.clear_text();
        self.cache.clear_views();
        self.entries_changed();
    }

    fn entries_changed(&mut self) {
        self.modified = true;
        self.cache.clear_search();
        if let Some(path) = &self.path {
            self.cache.cache_entries(path, self.store.get_all());
        }
    }

    /// Write the entries back to the active file with the default [`SaveOptions`]
    pub fn save(&mut self) -> Result<()> {
        match self.path.clone() {
            Some(path) => self.save_as(path, SaveOptions::default()),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "database has no file to save to",
            )
            .into()),
        }
    }

    /// Write the entries to `path`, which becomes the active file
    ///
    /// On success the cache is repopulated for `path`; on failure its slots for `path` are dropped.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display(), count = self.store.len()), err)]
    pub fn save_as(&mut self, path: impl AsRef<Path>, options: SaveOptions) -> Result<()> {
        let path = path.as_ref();
        let bytes = encode_with(self.store.get_all(), options.encode)?;

        let written = if options.atomic {
            Self::write_atomic(path, &bytes)
        } else {
            Self::write_direct(path, &bytes)
        };

        if let Err(e) = written {
            self.cache.clear(path);
            return Err(e);
        }

        info!("saved {} entries", self.store.len());

        self.cache.clear(path);
        self.cache.cache_raw_file(path, bytes);
        self.cache.cache_entries(path, self.store.get_all());

        self.path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    fn write_direct(path: &Path, bytes: &[u8]) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path)?;
        Ok(())
    }
}
