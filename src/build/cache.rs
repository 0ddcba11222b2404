//! Metadata cache for incremental rebuilds.
//!
//! Frontmatter extraction is the only state kept between posts. Both the
//! index and the post builders ask the cache for a post's metadata; the
//! first request extracts, later ones reuse it. Defaulted fields are warned
//! about once per post and build, whether the metadata was extracted or not.
//!
//! The cache is an explicit object owned by the caller. In watch mode it is
//! kept across rebuilds, so each entry remembers the source modification time
//! it was extracted from and is re-extracted once the source changes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::frontmatter::{self, FrontmatterError, MissingField, PostMetadata};
use super::source::{POST_SOURCE, POSTS_DIR};
use super::staleness::modified;

/// Default number of posts whose metadata is kept.
pub const DEFAULT_CAPACITY: usize = 512;

/// Identifies one extraction: the same post rendered under a different base
/// URL resolves images differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_root: PathBuf,
    pub post_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
struct CachedMetadata {
    metadata: PostMetadata,
    missing: Vec<MissingField>,
    source_mtime: Option<SystemTime>,
}

/// Bounded post metadata cache with least-recently-used eviction.
#[derive(Debug)]
pub struct MetadataCache {
    entries: LruCache<CacheKey, CachedMetadata>,
    /// Posts already warned about during the current build
    warned: HashSet<CacheKey>,
    extractions: usize,
    warnings: usize,
}

impl MetadataCache {
    /// Create a cache holding up to [`DEFAULT_CAPACITY`] posts.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            warned: HashSet::new(),
            extractions: 0,
            warnings: 0,
        }
    }

    /// Start a new build: posts with defaulted fields are warned about
    /// again the next time they are requested.
    pub fn start_build(&mut self) {
        self.warned.clear();
    }

    /// Metadata for `post_id` under `source_root`, extracting it if it isn't
    /// cached or its source changed since it was cached.
    pub fn metadata(
        &mut self,
        source_root: &Path,
        post_id: &str,
        base_url: &str,
    ) -> Result<PostMetadata, FrontmatterError> {
        let key = CacheKey {
            source_root: source_root.to_path_buf(),
            post_id: post_id.to_string(),
            base_url: base_url.to_string(),
        };
        let source = post_source(source_root, post_id);
        let source_mtime = modified(&source);

        let hit = self
            .entries
            .get(&key)
            .filter(|cached| cached.source_mtime.is_some() && cached.source_mtime == source_mtime)
            .cloned();

        let cached = match hit {
            Some(cached) => cached,
            None => {
                let extraction = frontmatter::extract(&source, base_url)?;
                self.extractions += 1;
                // A fresh extraction is reported even if this build already warned
                self.warned.remove(&key);

                let cached = CachedMetadata {
                    metadata: extraction.metadata,
                    missing: extraction.missing,
                    source_mtime,
                };
                self.entries.insert(key.clone(), cached.clone());
                cached
            }
        };

        if !cached.missing.is_empty() && self.warned.insert(key) {
            frontmatter::warn_missing(&source, &cached.missing);
            self.warnings += cached.missing.len();
        }

        Ok(cached.metadata)
    }

    /// Number of real extractions performed so far.
    pub fn extractions(&self) -> usize {
        self.extractions
    }

    /// Number of missing-field warnings logged so far.
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Path of a post's Markdown source.
pub fn post_source(source_root: &Path, post_id: &str) -> PathBuf {
    source_root.join(POSTS_DIR).join(post_id).join(POST_SOURCE)
}

/// Map with a size limit that evicts the least recently used key.
#[derive(Debug)]
struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.touch(key);
            self.map.get(key)
        } else {
            None
        }
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(old) = self.map.insert(key.clone(), value) {
            self.touch(&key);
            return Some(old);
        }

        self.order.push_back(key);
        if self.order.len() > self.capacity
            && let Some(evicted) = self.order.pop_front()
        {
            return self.map.remove(&evicted);
        }
        None
    }

    fn touch(&mut self, key: &K) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.clone());
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}
