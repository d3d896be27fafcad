//! Resource manager
//!
//! Front door for bitmap loading. Owns the area-budgeted image cache, a
//! TTL map for bitmaps kept alive across scene changes, the deferred
//! request queue, and the async loader. One `update` per frame pumps all
//! of them.

use tessella_cache::{
    CacheMap, ImageCache, ImageCacheStats, LoadRequest, RequestQueue,
    ReservationId,
};
use tessella_render::{Bitmap, ImageLoader};

use crate::Config;

/// A deferred bitmap load the request queue can pump.
pub struct BitmapRequest {
    bitmap: Bitmap,
    loader: ImageLoader,
}

impl LoadRequest for BitmapRequest {
    fn is_request_ready(&self) -> bool {
        self.bitmap.is_ready() || self.bitmap.is_error()
    }

    fn start_request(&mut self) {
        // Called every tick while at the queue head; only the first call
        // on a still-deferred bitmap starts the load.
        if self.bitmap.is_request_only() {
            self.loader.start_load(&self.bitmap, &self.bitmap.url());
        }
    }
}

/// Owns every bitmap the engine has in flight or in cache.
pub struct ResourceManager {
    config: Config,
    loader: ImageLoader,
    images: ImageCache<Bitmap>,
    ttl_cache: CacheMap<Bitmap>,
    queue: RequestQueue<BitmapRequest>,
    next_reservation: u64,
    ticks: u64,
    seconds: f64,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ResourceManager {
    pub fn new(config: Config) -> Self {
        let loader = ImageLoader::new();
        loader.set_retry_schedule(config.retry_delays_ms.clone());
        Self {
            images: ImageCache::with_limit(config.cache_pixel_limit),
            ttl_cache: CacheMap::new(),
            queue: RequestQueue::new(),
            next_reservation: 1,
            ticks: 0,
            seconds: 0.0,
            loader,
            config,
        }
    }

    /// Fetch a bitmap, starting its load now. A cache hit that is still a
    /// deferred request gets promoted to an immediate load.
    pub fn load_bitmap(&mut self, path: &str) -> Bitmap {
        if let Some(bitmap) = self.images.get(path) {
            if bitmap.is_request_only() {
                self.loader.start_load(&bitmap, path);
            }
            return bitmap;
        }
        let bitmap = Bitmap::request(path);
        self.loader.start_load(&bitmap, path);
        self.images.add(path, bitmap.clone());
        bitmap
    }

    /// Fetch a bitmap without loading it yet; the request queue starts it
    /// in the background, one load at a time. Requesting an already-queued
    /// path moves it to the front.
    pub fn request_bitmap(&mut self, path: &str) -> Bitmap {
        if let Some(bitmap) = self.images.get(path) {
            self.queue.raise_priority(path);
            return bitmap;
        }
        let bitmap = Bitmap::request(path);
        self.images.add(path, bitmap.clone());
        self.queue.enqueue(
            path,
            BitmapRequest {
                bitmap: bitmap.clone(),
                loader: self.loader.clone(),
            },
        );
        bitmap
    }

    /// Hand out a fresh reservation id; every bitmap reserved under it is
    /// pinned until the id is released.
    pub fn next_reservation_id(&mut self) -> ReservationId {
        let raw = self.next_reservation;
        self.next_reservation += 1;
        ReservationId::new(raw)
    }

    /// Load a bitmap and pin it against cache truncation
    pub fn reserve_bitmap(&mut self, path: &str, reservation: ReservationId) -> Bitmap {
        let bitmap = self.load_bitmap(path);
        self.images.reserve(path, bitmap.clone(), reservation);
        bitmap
    }

    /// Unpin everything reserved under this id
    pub fn release_reservation(&mut self, reservation: ReservationId) {
        self.images.release_reservation(reservation);
    }

    /// Keep a bitmap alive under the configured TTL; each `touch` on the
    /// bitmap restarts the clock.
    pub fn keep_bitmap(&mut self, key: &str, bitmap: Bitmap) {
        let entry = self.ttl_cache.set_item(key, bitmap.clone());
        entry.set_time_to_live(self.config.ttl_ticks, self.config.ttl_seconds);
        bitmap.attach_cache_entry(entry.downgrade());
    }

    /// Look up a TTL-kept bitmap without refreshing its clock
    pub fn kept_bitmap(&self, key: &str) -> Option<Bitmap> {
        self.ttl_cache.get_item(key)
    }

    /// Per-frame pump: advance the TTL clocks, feed the request queue,
    /// and apply finished loads.
    pub fn update(&mut self, dt_seconds: f64) {
        self.ticks += 1;
        self.seconds += dt_seconds;
        self.ttl_cache.update(self.ticks, self.seconds);
        self.queue.update();
        self.loader.poll();
    }

    /// All immediately-loaded bitmaps are usable. Deferred requests that
    /// were never promoted do not count.
    pub fn is_ready(&self) -> bool {
        self.images.is_ready()
    }

    /// First bitmap whose load failed, if any
    pub fn error_bitmap(&self) -> Option<Bitmap> {
        self.images.error_bitmap()
    }

    pub fn stats(&self) -> ImageCacheStats {
        self.images.stats()
    }

    /// Drop every cached bitmap and pending request. In-flight loads keep
    /// running; their completions are discarded for dead bitmaps.
    pub fn clear(&mut self) {
        tracing::info!(stats = ?self.images.stats(), "clearing resource caches");
        self.images = ImageCache::with_limit(self.config.cache_pixel_limit);
        self.ttl_cache.clear();
        self.queue.clear();
    }
}
