//! Keyed resource store with touch-based TTL eviction
//!
//! Entries are shared handles: freeing by TTL is advisory and a later
//! `touch` revives the same entry without reallocation. Two clocks run in
//! parallel (ticks and seconds); an entry stays alive only while *both*
//! configured TTLs are unexpired.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Default sweep interval in seconds
const DELAY_CHECK_TTL: f64 = 0.1;

/// Cache for bitmaps, audio buffers, or any other clonable resource handle.
pub struct CacheMap<T: Clone> {
    inner: Rc<RefCell<MapInner<T>>>,
}

struct MapInner<T: Clone> {
    entries: HashMap<String, CacheEntry<T>>,
    update_ticks: u64,
    update_seconds: f64,
    last_check_ttl: f64,
    delay_check_ttl: f64,
}

/// A single cached resource. Clones share state.
pub struct CacheEntry<T: Clone> {
    state: Rc<RefCell<EntryState<T>>>,
}

struct EntryState<T: Clone> {
    cache: Weak<RefCell<MapInner<T>>>,
    key: String,
    item: T,
    cached: bool,
    touch_ticks: u64,
    touch_seconds: f64,
    ttl_ticks: u64,
    ttl_seconds: f64,
    freed_by_ttl: bool,
}

impl<T: Clone> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self { state: Rc::clone(&self.state) }
    }
}

/// Non-owning entry handle. Resources keep one of these back to their entry
/// so a `touch` can refresh TTL without creating an ownership cycle.
pub struct WeakCacheEntry<T: Clone> {
    state: Weak<RefCell<EntryState<T>>>,
}

impl<T: Clone> Clone for WeakCacheEntry<T> {
    fn clone(&self) -> Self {
        Self { state: Weak::clone(&self.state) }
    }
}

impl<T: Clone> WeakCacheEntry<T> {
    pub fn upgrade(&self) -> Option<CacheEntry<T>> {
        self.state.upgrade().map(|state| CacheEntry { state })
    }
}

impl<T: Clone> Default for CacheMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> CacheMap<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(MapInner {
                entries: HashMap::new(),
                update_ticks: 0,
                update_seconds: 0.0,
                last_check_ttl: 0.0,
                delay_check_ttl: DELAY_CHECK_TTL,
            })),
        }
    }

    /// Override the TTL sweep interval (seconds)
    pub fn with_sweep_interval(self, seconds: f64) -> Self {
        self.inner.borrow_mut().delay_check_ttl = seconds;
        self
    }

    /// Insert an item, creating and activating its entry. An existing entry
    /// under the same key is displaced (last writer wins).
    pub fn set_item(&self, key: &str, item: T) -> CacheEntry<T> {
        let entry = CacheEntry {
            state: Rc::new(RefCell::new(EntryState {
                cache: Rc::downgrade(&self.inner),
                key: key.to_string(),
                item,
                cached: false,
                touch_ticks: 0,
                touch_seconds: 0.0,
                ttl_ticks: 0,
                ttl_seconds: 0.0,
                freed_by_ttl: false,
            })),
        };
        entry.allocate();
        entry
    }

    /// Look up an item. Lookup alone does not refresh liveness; only
    /// entry-level `touch` does.
    pub fn get_item(&self, key: &str) -> Option<T> {
        self.inner.borrow().entries.get(key).map(|e| e.item())
    }

    /// Free every entry (not TTL-induced, so none are revivable).
    pub fn clear(&self) {
        let entries: Vec<CacheEntry<T>> =
            self.inner.borrow().entries.values().cloned().collect();
        for entry in &entries {
            entry.free(false);
        }
    }

    /// Advance both clocks; sweeps expired entries at most once per
    /// configured interval. The sweep is two-phase (collect, then free) so
    /// entries added mid-sweep are unaffected.
    pub fn update(&self, ticks: u64, seconds: f64) {
        let dead = {
            let mut inner = self.inner.borrow_mut();
            inner.update_ticks += ticks;
            inner.update_seconds += seconds;
            if inner.update_seconds < inner.last_check_ttl + inner.delay_check_ttl {
                return;
            }
            inner.last_check_ttl = inner.update_seconds;
            let now_ticks = inner.update_ticks;
            let now_seconds = inner.update_seconds;
            inner
                .entries
                .values()
                .filter(|e| !e.is_alive_at(now_ticks, now_seconds))
                .cloned()
                .collect::<Vec<_>>()
        };
        if !dead.is_empty() {
            tracing::debug!(count = dead.len(), "cache ttl sweep");
        }
        for entry in &dead {
            entry.free(true);
        }
    }

    /// Current tick clock
    pub fn update_ticks(&self) -> u64 {
        self.inner.borrow().update_ticks
    }

    /// Current seconds clock
    pub fn update_seconds(&self) -> f64 {
        self.inner.borrow().update_seconds
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }
}

impl<T: Clone> CacheEntry<T> {
    /// Downgrade to a non-owning handle
    pub fn downgrade(&self) -> WeakCacheEntry<T> {
        WeakCacheEntry { state: Rc::downgrade(&self.state) }
    }

    /// The cached payload
    pub fn item(&self) -> T {
        self.state.borrow().item.clone()
    }

    /// Key this entry is stored under
    pub fn key(&self) -> String {
        self.state.borrow().key.clone()
    }

    /// Currently present in its cache map
    pub fn is_cached(&self) -> bool {
        self.state.borrow().cached
    }

    /// Last removal was TTL-driven (and therefore revivable)
    pub fn freed_by_ttl(&self) -> bool {
        self.state.borrow().freed_by_ttl
    }

    /// Set the time to live; zero means no expiry in that unit.
    pub fn set_time_to_live(&self, ticks: u64, seconds: f64) {
        let mut state = self.state.borrow_mut();
        state.ttl_ticks = ticks;
        state.ttl_seconds = seconds;
    }

    /// Insert into the map if absent and refresh the touch stamps.
    fn allocate(&self) {
        let cache = {
            let mut state = self.state.borrow_mut();
            if !state.cached {
                state.cached = true;
                state.cache.upgrade().map(|c| (c, state.key.clone()))
            } else {
                None
            }
        };
        if let Some((cache, key)) = cache {
            cache.borrow_mut().entries.insert(key, self.clone());
        }
        self.touch();
    }

    /// Refresh liveness. A TTL-freed entry is reinstated under its key
    /// (skipped if another entry took the key in the meantime).
    pub fn touch(&self) {
        let mut state = self.state.borrow_mut();
        let Some(cache) = state.cache.upgrade() else {
            return;
        };
        if state.cached {
            let inner = cache.borrow();
            state.touch_ticks = inner.update_ticks;
            state.touch_seconds = inner.update_seconds;
        } else if state.freed_by_ttl {
            state.freed_by_ttl = false;
            let mut inner = cache.borrow_mut();
            if !inner.entries.contains_key(&state.key) {
                inner.entries.insert(state.key.clone(), self.clone());
                state.cached = true;
            }
        }
    }

    /// Remove from the map. `by_ttl` marks the removal as advisory so a
    /// later `touch` may revive the entry.
    pub fn free(&self, by_ttl: bool) {
        let mut state = self.state.borrow_mut();
        state.freed_by_ttl = by_ttl;
        if state.cached {
            state.cached = false;
            if let Some(cache) = state.cache.upgrade() {
                cache.borrow_mut().entries.remove(&state.key);
            }
        }
    }

    /// TTL check against the cache clocks.
    pub fn is_still_alive(&self) -> bool {
        let (now_ticks, now_seconds) = {
            let state = self.state.borrow();
            match state.cache.upgrade() {
                Some(cache) => {
                    let inner = cache.borrow();
                    (inner.update_ticks, inner.update_seconds)
                }
                None => return false,
            }
        };
        self.is_alive_at(now_ticks, now_seconds)
    }

    fn is_alive_at(&self, now_ticks: u64, now_seconds: f64) -> bool {
        let state = self.state.borrow();
        let ticks_ok =
            state.ttl_ticks == 0 || now_ticks - state.touch_ticks < state.ttl_ticks;
        let seconds_ok = state.ttl_seconds == 0.0
            || now_seconds - state.touch_seconds < state.ttl_seconds;
        ticks_ok && seconds_ok
    }
}
