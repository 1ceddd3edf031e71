/// Time-bounded cache for monetization settings
///
/// The cache holds a single value with a fixed time-to-live. Readers see a
/// value at most `ttl` old; [`SettingsCache::invalidate`] drops it
/// immediately so admin writes are visible on the next read.
///
/// Expiry is measured with `tokio::time::Instant`, so tests can drive it
/// with `tokio::time::pause` and `advance`.

use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

/// Abstraction over the settings cache
///
/// Loads race with invalidation: a reader takes [`generation`] before it
/// loads and passes it to [`insert`], which drops the value if an
/// invalidation happened in between.
///
/// [`generation`]: SettingsCache::generation
/// [`insert`]: SettingsCache::insert
pub trait SettingsCache<T: Clone>: Send + Sync {
    /// Returns the cached value if present and not expired
    fn get(&self) -> Option<T>;

    /// Current invalidation generation
    fn generation(&self) -> u64;

    /// Stores a value loaded during `generation`, restarting its time-to-live
    ///
    /// Returns false, leaving the cache empty, when the cache was
    /// invalidated since `generation` was read.
    fn insert(&self, generation: u64, value: T) -> bool;

    /// Drops the cached value and starts a new generation
    fn invalidate(&self);
}

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

struct State<T> {
    entry: Option<Entry<T>>,
    generation: u64,
}

/// In-process single-value TTL cache
pub struct TtlCache<T> {
    ttl: Duration,
    state: RwLock<State<T>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(State {
                entry: None,
                generation: 0,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<T: Clone + Send + Sync> SettingsCache<T> for TtlCache<T> {
    fn get(&self) -> Option<T> {
        // A poisoned lock only means a writer panicked mid-insert; treat it as a miss.
        let guard = self.state.read().ok()?;
        let entry = guard.entry.as_ref()?;

        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn generation(&self) -> u64 {
        match self.state.read() {
            Ok(guard) => guard.generation,
            Err(poisoned) => poisoned.into_inner().generation,
        }
    }

    fn insert(&self, generation: u64, value: T) -> bool {
        let Ok(mut guard) = self.state.write() else {
            return false;
        };

        if guard.generation != generation {
            return false;
        }

        guard.entry = Some(Entry {
            value,
            inserted_at: Instant::now(),
        });
        true
    }

    fn invalidate(&self) {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.entry = None;
        guard.generation = guard.generation.wrapping_add(1);
    }
}
