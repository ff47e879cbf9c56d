//! Artifact store keyed by request fingerprint.

use crate::cache::key::CacheKey;
use crate::types::GeneratedRecipe;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Store of previously generated recipes.
///
/// Lookups never block on I/O. Writes are last-writer-wins.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<GeneratedRecipe>;

    fn put(&self, key: CacheKey, artifact: GeneratedRecipe);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
struct CachedArtifact {
    recipe: GeneratedRecipe,
    inserted_at: Instant,
}

/// In-memory recipe cache with LRU eviction and an optional TTL
pub struct RecipeCache {
    entries: Mutex<LruCache<CacheKey, CachedArtifact>>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecipeCache {
    /// Create a cache holding at most `capacity` entries (0 = unbounded)
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(entries),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Unbounded cache whose entries stay valid until process restart
    pub fn unbounded() -> Self {
        Self::new(0, None)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().len(),
        }
    }

    fn is_expired(&self, entry: &CachedArtifact) -> bool {
        match self.ttl {
            Some(ttl) => entry.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }
}

impl Default for RecipeCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl CacheStore for RecipeCache {
    fn get(&self, key: &CacheKey) -> Option<GeneratedRecipe> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.recipe.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(cache_key = %key, "Dropping expired cache entry");
            entries.pop(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn put(&self, key: CacheKey, artifact: GeneratedRecipe) {
        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(
            key,
            CachedArtifact {
                recipe: artifact,
                inserted_at: Instant::now(),
            },
        ) {
            if evicted != key {
                debug!(cache_key = %evicted, "Evicted least recently used recipe");
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}
