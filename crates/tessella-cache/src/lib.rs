//! Tessella Cache
//!
//! Resource caches for the tile engine: a generic keyed store with
//! touch-based TTL eviction, an area-budgeted image cache with reservation
//! pinning, and a queue that serializes outstanding load requests.

mod entry;
mod image_cache;
mod queue;
mod traits;

pub use entry::{CacheEntry, CacheMap, WeakCacheEntry};
pub use image_cache::{ImageCache, ImageCacheStats, ReservationId, IMAGE_CACHE_LIMIT};
pub use queue::RequestQueue;
pub use traits::{ImageResource, LoadRequest};
