//! Engine configuration

use serde::{Deserialize, Serialize};
use tessella_cache::IMAGE_CACHE_LIMIT;
use tessella_render::RETRY_DELAYS_MS;

/// Engine configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Visible screen width in pixels
    pub screen_width: u32,

    /// Visible screen height in pixels
    pub screen_height: u32,

    /// Edge length of one map tile in pixels
    pub tile_size: u32,

    /// Image cache budget in pixels of decoded bitmap area
    pub cache_pixel_limit: u64,

    /// Default time-to-live for keyed bitmaps, in frame ticks
    pub ttl_ticks: u64,

    /// Default time-to-live for keyed bitmaps, in seconds
    pub ttl_seconds: f64,

    /// Backoff schedule for failed image loads, in milliseconds
    pub retry_delays_ms: Vec<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen_width: 816,
            screen_height: 624,
            tile_size: 48,
            cache_pixel_limit: IMAGE_CACHE_LIMIT,
            ttl_ticks: 400,
            ttl_seconds: 60.0,
            retry_delays_ms: RETRY_DELAYS_MS.to_vec(),
        }
    }
}
