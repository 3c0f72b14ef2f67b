//! Shared caches sitting in front of the codec.
//!
//! A [`CacheTier`] holds five independent slices:
//!
//! | Slice          | Key                    | Invalidation                                         |
//! |----------------|------------------------|------------------------------------------------------|
//! | Raw bytes      | file path              | file modified after capture                          |
//! | Parsed entries | file path              | file modified after capture                          |
//! | Search results | `query|field`          | LRU bounded, cleared on any edit                     |
//! | Decoded text   | hash id                | cleared on structural changes                        |
//! | View           | file path + hash id    | cleared on structural changes and on `clear(path)`   |
//!
//! A file that no longer exists on disk is treated as unchanged, so its cached slices stay valid.
//!
//! Every operation takes one coarse lock for its duration. Filesystem metadata is always read before the lock is
//! taken, never while holding it. Values are stored as immutable snapshots, so nothing handed out by the cache can
//! be used to modify what it holds.

use bon::Builder;
use lru::LruCache;
use parking_lot::Mutex;
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    io::ErrorKind,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use tracing::{debug, trace};

use crate::{store::SearchField, types::StringEntry};

/// Default number of search keys kept
pub const DEFAULT_SEARCH_CAPACITY: usize = 100;

/// Default upper bound on the size of a cacheable search result
pub const DEFAULT_MAX_CACHED_RESULTS: usize = 5000;

/// Options for sizing a [`CacheTier`]
#[derive(Debug, Clone, Copy, Builder)]
pub struct CacheOptions {
    /// Number of distinct search keys kept before the least recently used is evicted
    #[builder(default = DEFAULT_SEARCH_CAPACITY)]
    pub search_capacity: usize,

    /// Search results larger than this are never cached
    #[builder(default = DEFAULT_MAX_CACHED_RESULTS)]
    pub max_cached_results: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Running hit and miss counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub raw_hits: u64,
    pub parsed_hits: u64,
    pub search_hits: u64,
    pub text_hits: u64,
    pub view_hits: u64,
    /// Misses across every slice
    pub misses: u64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.raw_hits + self.parsed_hits + self.search_hits + self.text_hits + self.view_hits
    }
}

/// Number of populated slots per slice
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheSizes {
    pub raw: usize,
    pub parsed: usize,
    pub search: usize,
    pub text: usize,
    pub views: usize,
}

type ViewValue = Arc<dyn Any + Send + Sync>;

struct Snapshot<T> {
    value: T,
    captured: SystemTime,
}

enum FileState {
    Missing,
    Modified(SystemTime),
    Unknown,
}

impl FileState {
    fn of(path: &Path) -> Self {
        match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => FileState::Modified(modified),
            Err(e) if e.kind() == ErrorKind::NotFound => FileState::Missing,
            Err(_) => FileState::Unknown,
        }
    }

    fn capture(path: &Path) -> SystemTime {
        match Self::of(path) {
            FileState::Modified(modified) => modified,
            _ => SystemTime::now(),
        }
    }

    fn is_fresh(&self, captured: SystemTime) -> bool {
        match self {
            FileState::Missing => true,
            FileState::Modified(modified) => *modified <= captured,
            FileState::Unknown => false,
        }
    }
}

struct CacheState {
    raw: HashMap<PathBuf, Snapshot<Arc<[u8]>>>,
    parsed: HashMap<PathBuf, Snapshot<Arc<[StringEntry]>>>,
    search: LruCache<String, Arc<[StringEntry]>>,
    text: HashMap<u32, String>,
    views: HashMap<(PathBuf, u32), ViewValue>,
    stats: CacheStats,
}

/// Process wide cache service
///
/// Create one and share it by reference (usually behind an [`Arc`]) with every
/// [`crate::database::StringDatabase`] that should use it.
///
/// ```
/// use sdb_core::cache::CacheTier;
///
/// let cache = CacheTier::default();
/// cache.cache_text(7, "seven");
/// assert_eq!(cache.get_cached_text(7).as_deref(), Some("seven"));
/// assert_eq!(cache.stats().text_hits, 1);
/// ```
pub struct CacheTier {
    options: CacheOptions,
    state: Mutex<CacheState>,
}

impl Default for CacheTier {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

impl fmt::Debug for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheTier")
            .field("options", &self.options)
            .field("sizes", &self.sizes())
            .field("stats", &self.stats())
            .finish()
    }
}

impl CacheTier {
    pub fn new(options: CacheOptions) -> Self {
        let capacity = NonZeroUsize::new(options.search_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            options,
            state: Mutex::new(CacheState {
                raw: HashMap::new(),
                parsed: HashMap::new(),
                search: LruCache::new(capacity),
                text: HashMap::new(),
                views: HashMap::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Snapshot of the hit and miss counters
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    pub fn sizes(&self) -> CacheSizes {
        let state = self.state.lock();
        CacheSizes {
            raw: state.raw.len(),
            parsed: state.parsed.len(),
            search: state.search.len(),
            text: state.text.len(),
            views: state.views.len(),
        }
    }

    /// Remember the raw contents of `path`, stamped with its current modification time
    pub fn cache_raw_file(&self, path: impl AsRef<Path>, bytes: impl Into<Arc<[u8]>>) {
        let path = path.as_ref();
        let captured = FileState::capture(path);
        let value = bytes.into();

        debug!("caching {} raw bytes for {}", value.len(), path.display());
        self.state
            .lock()
            .raw
            .insert(path.to_path_buf(), Snapshot { value, captured });
    }

    /// Raw contents of `path`, if cached and the file has not changed since
    pub fn get_cached_raw_file(&self, path: impl AsRef<Path>) -> Option<Arc<[u8]>> {
        let path = path.as_ref();
        let current = FileState::of(path);

        let mut state = self.state.lock();
        let fresh = state.raw.get(path).map(|s| current.is_fresh(s.captured));
        match fresh {
            Some(true) => {
                trace!("raw cache hit for {}", path.display());
                state.stats.raw_hits += 1;
                state.raw.get(path).map(|s| s.value.clone())
            }
            Some(false) => {
                debug!("raw cache for {} is stale", path.display());
                state.raw.remove(path);
                state.stats.misses += 1;
                None
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Remember the decoded entries of `path`, stamped with its current modification time
    pub fn cache_entries(&self, path: impl AsRef<Path>, entries: &[StringEntry]) {
        let path = path.as_ref();
        let captured = FileState::capture(path);
        let value: Arc<[StringEntry]> = Arc::from(entries);

        debug!("caching {} entries for {}", value.len(), path.display());
        self.state
            .lock()
            .parsed
            .insert(path.to_path_buf(), Snapshot { value, captured });
    }

    /// Decoded entries of `path`, if cached and the file has not changed since
    pub fn get_cached_entries(&self, path: impl AsRef<Path>) -> Option<Arc<[StringEntry]>> {
        let path = path.as_ref();
        let current = FileState::of(path);

        let mut state = self.state.lock();
        let fresh = state.parsed.get(path).map(|s| current.is_fresh(s.captured));
        match fresh {
            Some(true) => {
                trace!("parsed cache hit for {}", path.display());
                state.stats.parsed_hits += 1;
                state.parsed.get(path).map(|s| s.value.clone())
            }
            Some(false) => {
                debug!("parsed cache for {} is stale", path.display());
                state.parsed.remove(path);
                state.stats.misses += 1;
                None
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    fn search_key(query: &str, field: SearchField) -> String {
        format!("{}|{}", query.to_lowercase(), field.to_string().to_lowercase())
    }

    /// Remember the results of a search
    ///
    /// Empty results and results larger than [`CacheOptions::max_cached_results`] are ignored.
    pub fn cache_search_results(&self, query: &str, field: SearchField, results: &[StringEntry]) {
        if results.is_empty() || results.len() > self.options.max_cached_results {
            trace!("not caching {} results for {:?}", results.len(), query);
            return;
        }

        let key = Self::search_key(query, field);
        let value: Arc<[StringEntry]> = Arc::from(results);

        let mut state = self.state.lock();
        if let Some((evicted, _)) = state.search.push(key.clone(), value) {
            if evicted != key {
                debug!("evicted search results for {:?}", evicted);
            }
        }
    }

    /// Results of an earlier search, marking the key as most recently used
    pub fn get_cached_search_results(
        &self,
        query: &str,
        field: SearchField,
    ) -> Option<Arc<[StringEntry]>> {
        let key = Self::search_key(query, field);

        let mut state = self.state.lock();
        match state.search.get(&key).cloned() {
            Some(results) => {
                state.stats.search_hits += 1;
                Some(results)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    pub fn cache_text(&self, hash_id: u32, text: impl Into<String>) {
        self.state.lock().text.insert(hash_id, text.into());
    }

    pub fn get_cached_text(&self, hash_id: u32) -> Option<String> {
        let mut state = self.state.lock();
        match state.text.get(&hash_id).cloned() {
            Some(text) => {
                state.stats.text_hits += 1;
                Some(text)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Forget the decoded text of a single hash id
    pub fn remove_text(&self, hash_id: u32) {
        self.state.lock().text.remove(&hash_id);
    }

    /// Remember a presentation object derived from the entry `hash_id` of `path`
    pub fn cache_view<T: Any + Send + Sync>(
        &self,
        path: impl AsRef<Path>,
        hash_id: u32,
        view: Arc<T>,
    ) {
        let key = (path.as_ref().to_path_buf(), hash_id);
        self.state.lock().views.insert(key, view);
    }

    /// A cached presentation object, if one of type `T` is present
    pub fn get_cached_view<T: Any + Send + Sync>(
        &self,
        path: impl AsRef<Path>,
        hash_id: u32,
    ) -> Option<Arc<T>> {
        let key = (path.as_ref().to_path_buf(), hash_id);

        let mut state = self.state.lock();
        match state.views.get(&key).cloned().map(|v| v.downcast::<T>()) {
            Some(Ok(view)) => {
                state.stats.view_hits += 1;
                Some(view)
            }
            _ => {
                state.stats.misses += 1;
                None
            }
        }
    }

    pub fn clear_search(&self) {
        trace!("clearing search cache");
        self.state.lock().search.clear();
    }

    pub fn clear_text(&self) {
        trace!("clearing text cache");
        self.state.lock().text.clear();
    }

    pub fn clear_views(&self) {
        trace!("clearing view cache");
        self.state.lock().views.clear();
    }

    /// Drop the raw and parsed slots of `path`, along with every search result and view
    pub fn clear(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        debug!("clearing caches for {}", path.display());

        let mut state = self.state.lock();
        state.raw.remove(path);
        state.parsed.remove(path);
        state.search.clear();
        state.views.clear();
    }

    /// Drop everything and reset the counters
    pub fn clear_all(&self) {
        debug!("clearing all caches");

        let mut state = self.state.lock();
        state.raw.clear();
        state.parsed.clear();
        state.search.clear();
        state.text.clear();
        state.views.clear();
        state.stats = CacheStats::default();
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn results(n: usize) -> Vec<StringEntry> {
        (0..n)
            .map(|i| StringEntry::new(i as u32, format!("entry {i}"), false))
            .collect()
    }

    #[test]
    fn search_key_is_case_insensitive() {
        let cache = CacheTier::default();
        cache.cache_search_results("Hello", SearchField::Text, &results(2));

        assert!(cache
            .get_cached_search_results("HELLO", SearchField::Text)
            .is_some());
        assert!(cache
            .get_cached_search_results("hello", SearchField::HashId)
            .is_none());
    }

    #[test]
    fn search_results_outside_bounds_are_not_cached() {
        let cache = CacheTier::new(CacheOptions::builder().max_cached_results(3).build());
        cache.cache_search_results("none", SearchField::Text, &[]);
        cache.cache_search_results("many", SearchField::Text, &results(4));
        cache.cache_search_results("some", SearchField::Text, &results(3));

        assert_eq!(cache.sizes().search, 1);
        assert!(cache
            .get_cached_search_results("some", SearchField::Text)
            .is_some());
    }

    #[test]
    fn search_eviction_follows_access_order() {
        let cache = CacheTier::new(CacheOptions::builder().search_capacity(2).build());
        cache.cache_search_results("a", SearchField::Text, &results(1));
        cache.cache_search_results("b", SearchField::Text, &results(1));

        // Touch "a" so "b" becomes the oldest
        assert!(cache.get_cached_search_results("a", SearchField::Text).is_some());
        cache.cache_search_results("c", SearchField::Text, &results(1));

        assert!(cache.get_cached_search_results("b", SearchField::Text).is_none());
        assert!(cache.get_cached_search_results("a", SearchField::Text).is_some());
        assert!(cache.get_cached_search_results("c", SearchField::Text).is_some());
    }

    #[test]
    fn views_are_scoped_by_file_and_type() {
        let cache = CacheTier::default();
        cache.cache_view("a.sdb", 1, Arc::new(String::from("row a")));

        assert_eq!(
            cache.get_cached_view::<String>("a.sdb", 1).as_deref().map(String::as_str),
            Some("row a")
        );
        assert!(cache.get_cached_view::<String>("b.sdb", 1).is_none());
        assert!(cache.get_cached_view::<u32>("a.sdb", 1).is_none());
    }

    #[test]
    fn clear_path_keeps_text_and_other_files() {
        let cache = CacheTier::default();
        cache.cache_raw_file("missing/a.sdb", vec![1u8, 2, 3]);
        cache.cache_raw_file("missing/b.sdb", vec![4u8]);
        cache.cache_text(1, "one");
        cache.cache_view("missing/b.sdb", 1, Arc::new(1u32));
        cache.cache_search_results("q", SearchField::Text, &results(1));

        cache.clear("missing/a.sdb");

        assert_eq!(
            cache.sizes(),
            CacheSizes {
                raw: 1,
                parsed: 0,
                search: 0,
                text: 1,
                views: 0,
            }
        );
    }

    #[test]
    fn clear_all_resets_counters() {
        let cache = CacheTier::default();
        cache.cache_text(1, "one");
        assert!(cache.get_cached_text(1).is_some());
        assert!(cache.get_cached_text(2).is_none());
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses, 1);

        cache.clear_all();

        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.sizes(), CacheSizes::default());
    }

    #[test]
    fn missing_files_are_trusted() {
        let cache = CacheTier::default();
        cache.cache_raw_file("does/not/exist.sdb", vec![0u8; 8]);

        assert_eq!(
            cache.get_cached_raw_file("does/not/exist.sdb").as_deref(),
            Some(&[0u8; 8][..])
        );
        assert_eq!(cache.stats().raw_hits, 1);
    }
}
