//! Budgeted image cache with reservation pinning
//!
//! Holds loaded and in-flight images under a pixel-area budget. When the
//! budget is exceeded the least recently touched unpinned images are
//! dropped; reserved and still-loading images are held regardless.

use std::collections::HashMap;

use crate::traits::ImageResource;

/// Pixel-area budget before truncation kicks in
pub const IMAGE_CACHE_LIMIT: u64 = 10_000_000;

/// Opaque reservation handle; images sharing a live reservation id are
/// pinned against truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReservationId(pub(crate) u64);

impl ReservationId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

struct CacheItem<B> {
    bitmap: B,
    touch: u64,
    reservation: Option<ReservationId>,
}

/// Keyed image store with an area budget and most-recent-first retention.
pub struct ImageCache<B: ImageResource + Clone> {
    items: HashMap<String, CacheItem<B>>,
    limit: u64,
    touch_seq: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageCacheStats {
    pub entries: usize,
    pub pixel_area: u64,
    pub reserved: usize,
}

impl<B: ImageResource + Clone> Default for ImageCache<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ImageResource + Clone> ImageCache<B> {
    pub fn new() -> Self {
        Self::with_limit(IMAGE_CACHE_LIMIT)
    }

    /// Cache with a custom pixel-area budget
    pub fn with_limit(limit: u64) -> Self {
        Self {
            items: HashMap::new(),
            limit,
            touch_seq: 0,
        }
    }

    fn next_touch(&mut self) -> u64 {
        self.touch_seq += 1;
        self.touch_seq
    }

    /// Insert an image under a key, then re-check the budget. Replaces any
    /// previous image under the same key.
    pub fn add(&mut self, key: &str, bitmap: B) {
        let touch = self.next_touch();
        self.items.insert(
            key.to_string(),
            CacheItem {
                bitmap,
                touch,
                reservation: None,
            },
        );
        self.truncate();
    }

    /// Look up an image, refreshing its recency. Errored images are
    /// returned as-is so `error_bitmap` keeps reporting them; retry policy
    /// belongs to the caller.
    pub fn get(&mut self, key: &str) -> Option<B> {
        let touch = self.next_touch();
        self.items.get_mut(key).map(|item| {
            item.touch = touch;
            item.bitmap.touch();
            item.bitmap.clone()
        })
    }

    /// Pin an image under a reservation id. If the key already exists the
    /// existing image keeps its place and only the reservation transfers.
    pub fn reserve(&mut self, key: &str, bitmap: B, reservation: ReservationId) {
        let touch = self.next_touch();
        self.items
            .entry(key.to_string())
            .or_insert(CacheItem {
                bitmap,
                touch,
                reservation: None,
            })
            .reservation = Some(reservation);
        self.truncate();
    }

    /// Release every pin held under a reservation id
    pub fn release_reservation(&mut self, reservation: ReservationId) {
        for item in self.items.values_mut() {
            if item.reservation == Some(reservation) {
                item.reservation = None;
            }
        }
    }

    /// All images finished loading successfully. A load failure blocks
    /// readiness until the caller deals with it via `error_bitmap`. Pending
    /// requests that were never started do not count as loading.
    pub fn is_ready(&self) -> bool {
        self.items
            .values()
            .all(|item| item.bitmap.is_request_only() || item.bitmap.is_ready())
    }

    /// First image that failed to load, if any
    pub fn error_bitmap(&self) -> Option<B> {
        self.items
            .values()
            .find(|item| item.bitmap.is_error())
            .map(|item| item.bitmap.clone())
    }

    pub fn stats(&self) -> ImageCacheStats {
        ImageCacheStats {
            entries: self.items.len(),
            pixel_area: self
                .items
                .values()
                .map(|item| item.bitmap.pixel_area())
                .sum(),
            reserved: self
                .items
                .values()
                .filter(|item| item.reservation.is_some())
                .count(),
        }
    }

    fn must_be_held(item: &CacheItem<B>) -> bool {
        // A pending request never holds the budget; a pinned or still
        // loading image always does.
        if item.bitmap.is_request_only() {
            return false;
        }
        if item.reservation.is_some() {
            return true;
        }
        !item.bitmap.is_ready()
    }

    /// Walk items newest touch first, spending the budget; once it runs out,
    /// drop everything not held. Held images spend budget but are never
    /// dropped, so the cache can exceed its limit under heavy pinning.
    fn truncate(&mut self) {
        let total: u64 = self
            .items
            .values()
            .map(|item| item.bitmap.pixel_area())
            .sum();
        if total <= self.limit {
            return;
        }

        let mut keys: Vec<(String, u64)> = self
            .items
            .iter()
            .map(|(k, item)| (k.clone(), item.touch))
            .collect();
        keys.sort_by(|a, b| b.1.cmp(&a.1));

        let mut size_left = self.limit as i64;
        let mut dropped = 0usize;
        for (key, _) in keys {
            let item = &self.items[&key];
            let held = Self::must_be_held(item);
            if size_left > 0 || held {
                size_left -= item.bitmap.pixel_area() as i64;
            } else {
                self.items.remove(&key);
                dropped += 1;
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, "image cache truncated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct FakeImage {
        width: u32,
        height: u32,
        ready: bool,
        error: bool,
        request_only: bool,
        touches: Rc<Cell<u32>>,
    }

    impl FakeImage {
        fn ready(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ready: true,
                error: false,
                request_only: false,
                touches: Rc::new(Cell::new(0)),
            }
        }

        fn loading(width: u32, height: u32) -> Self {
            Self {
                ready: false,
                ..Self::ready(width, height)
            }
        }

        fn errored() -> Self {
            Self {
                ready: false,
                error: true,
                ..Self::ready(0, 0)
            }
        }

        fn request_only(width: u32, height: u32) -> Self {
            Self {
                ready: false,
                request_only: true,
                ..Self::ready(width, height)
            }
        }
    }

    impl ImageResource for FakeImage {
        fn is_ready(&self) -> bool {
            self.ready
        }
        fn is_error(&self) -> bool {
            self.error
        }
        fn is_request_only(&self) -> bool {
            self.request_only
        }
        fn width(&self) -> u32 {
            self.width
        }
        fn height(&self) -> u32 {
            self.height
        }
        fn touch(&self) {
            self.touches.set(self.touches.get() + 1);
        }
    }

    #[test]
    fn test_add_and_get() {
        let mut cache = ImageCache::new();
        cache.add("a", FakeImage::ready(10, 10));

        assert!(cache.get("a").is_some());
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_get_refreshes_recency_and_touches() {
        let mut cache = ImageCache::new();
        let img = FakeImage::ready(10, 10);
        let touches = Rc::clone(&img.touches);
        cache.add("a", img);

        cache.get("a");
        assert_eq!(touches.get(), 1);
    }

    #[test]
    fn test_errored_image_stays_visible_on_get() {
        let mut cache = ImageCache::new();
        cache.add("bad", FakeImage::errored());

        // The failure must not be swallowed by a lookup
        assert!(cache.get("bad").is_some_and(|b| b.is_error()));
        assert_eq!(cache.stats().entries, 1);
        assert!(cache.error_bitmap().is_some());
    }

    #[test]
    fn test_errored_image_blocks_readiness() {
        let mut cache = ImageCache::new();
        cache.add("a", FakeImage::ready(10, 10));
        assert!(cache.is_ready());

        cache.add("bad", FakeImage::errored());
        assert!(!cache.is_ready());
    }

    #[test]
    fn test_truncation_drops_least_recent() {
        // Budget fits exactly three 100x100 images
        let mut cache = ImageCache::with_limit(30_000);
        cache.add("a", FakeImage::ready(100, 100));
        cache.add("b", FakeImage::ready(100, 100));
        cache.add("c", FakeImage::ready(100, 100));
        assert_eq!(cache.stats().entries, 3);

        // Refresh "a" so "b" becomes the oldest, then overflow
        cache.get("a");
        cache.add("d", FakeImage::ready(100, 100));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn test_reserved_images_survive_truncation() {
        let mut cache = ImageCache::with_limit(10_000);
        let pin = ReservationId::new(1);
        cache.reserve("pinned", FakeImage::ready(100, 100), pin);
        cache.add("b", FakeImage::ready(100, 100));
        cache.add("c", FakeImage::ready(100, 100));

        // Oldest entry is pinned; it must survive while "b" goes
        assert!(cache.get("pinned").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_release_reservation_unpins() {
        let mut cache = ImageCache::with_limit(10_000);
        let pin = ReservationId::new(7);
        cache.reserve("pinned", FakeImage::ready(100, 100), pin);
        cache.release_reservation(pin);
        cache.add("b", FakeImage::ready(100, 100));
        cache.add("c", FakeImage::ready(100, 100));

        assert!(cache.get("pinned").is_none());
    }

    #[test]
    fn test_loading_images_survive_truncation() {
        let mut cache = ImageCache::with_limit(10_000);
        cache.add("loading", FakeImage::loading(100, 100));
        cache.add("b", FakeImage::ready(100, 100));
        cache.add("c", FakeImage::ready(100, 100));

        assert!(cache.get("loading").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_request_only_images_dropped_first_class() {
        let mut cache = ImageCache::with_limit(10_000);
        cache.add("deferred", FakeImage::request_only(100, 100));
        cache.add("b", FakeImage::ready(100, 100));
        cache.add("c", FakeImage::ready(100, 100));

        // Deferred request is oldest and never held
        assert!(cache.get("deferred").is_none());
    }

    #[test]
    fn test_is_ready() {
        let mut cache = ImageCache::new();
        cache.add("a", FakeImage::ready(10, 10));
        cache.add("deferred", FakeImage::request_only(10, 10));
        assert!(cache.is_ready());

        cache.add("loading", FakeImage::loading(10, 10));
        assert!(!cache.is_ready());
    }

    #[test]
    fn test_reserve_keeps_existing_image() {
        let mut cache = ImageCache::new();
        let original = FakeImage::ready(10, 10);
        let touches = Rc::clone(&original.touches);
        cache.add("a", original);

        cache.reserve("a", FakeImage::ready(99, 99), ReservationId::new(3));
        // Reservation lands on the image already cached, not the argument
        let got = cache.get("a").unwrap();
        assert_eq!(got.width(), 10);
        assert_eq!(touches.get(), 1);
        assert_eq!(cache.stats().reserved, 1);
    }

    #[test]
    fn test_error_bitmap() {
        let mut cache = ImageCache::new();
        cache.add("a", FakeImage::ready(10, 10));
        assert!(cache.error_bitmap().is_none());

        cache.add("bad", FakeImage::errored());
        assert!(cache.error_bitmap().is_some_and(|b| b.is_error()));
    }

    #[test]
    fn test_stats() {
        let mut cache = ImageCache::new();
        cache.add("a", FakeImage::ready(10, 10));
        cache.reserve("b", FakeImage::ready(20, 20), ReservationId::new(1));

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.pixel_area, 100 + 400);
        assert_eq!(stats.reserved, 1);
    }
}
