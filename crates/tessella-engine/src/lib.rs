//! Tessella Engine
//!
//! A 2D tile-map rendering engine: TTL and area-budgeted bitmap caches,
//! deferred request queueing, async image loading, autotile compositing,
//! and sprite effects.
//!
//! # Example
//! ```rust,ignore
//! use tessella_engine::{Config, ResourceManager};
//!
//! let mut resources = ResourceManager::new(Config::default());
//! let tileset = resources.load_bitmap("img/tilesets/Outside_A2.png");
//! loop {
//!     resources.update(1.0 / 60.0);
//!     if resources.is_ready() {
//!         break;
//!     }
//! }
//! ```

mod config;
mod resources;

pub use config::Config;
pub use resources::{BitmapRequest, ResourceManager};

// Re-export sub-crates for direct access
pub use tessella_cache as cache;
pub use tessella_render as render;
pub use tessella_tilemap as tilemap;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global tracing subscriber, filtered by `RUST_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
