//! Tessella Tilemap
//!
//! Decodes a 4-layer tile-ID grid into draw calls: tile-ID band
//! classification, autotile shape tables, a canvas compositor with
//! per-cell memoized repaint and wraparound scrolling, and a batched
//! quad-list variant for GPU-style sinks.

mod autotile;
mod flags;
mod quad_tilemap;
mod tile_id;
mod tilemap;

pub use autotile::{
    QuadOffsets, FLOOR_AUTOTILE_TABLE, WALL_AUTOTILE_TABLE,
    WATERFALL_AUTOTILE_TABLE,
};
pub use flags::{TilesetFlags, FLAG_HIGHER, FLAG_TABLE};
pub use quad_tilemap::{QuadLayer, QuadSource, QuadTilemap, TileQuad};
pub use tile_id::*;
pub use tilemap::{Tilemap, WrapView, LOWER_LAYER_Z, UPPER_LAYER_Z};
