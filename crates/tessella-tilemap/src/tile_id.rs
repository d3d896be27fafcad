//! Tile identity
//!
//! Tile IDs partition into bands with distinct decode rules: B/C/D/E are
//! plain tiles, A5 is plain, A1 through A4 are autotiles. ID 0 is empty
//! and IDs at or past the maximum are invalid and never drawn.

pub const TILE_ID_B: u16 = 0;
pub const TILE_ID_C: u16 = 256;
pub const TILE_ID_D: u16 = 512;
pub const TILE_ID_E: u16 = 768;
pub const TILE_ID_A5: u16 = 1536;
pub const TILE_ID_A1: u16 = 2048;
pub const TILE_ID_A2: u16 = 2816;
pub const TILE_ID_A3: u16 = 4352;
pub const TILE_ID_A4: u16 = 5888;
pub const TILE_ID_MAX: u16 = 8192;

/// Tile-ID band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileBand {
    B,
    C,
    D,
    E,
    A5,
    A1,
    A2,
    A3,
    A4,
}

impl TileBand {
    /// Band of a tile ID; `None` for invalid IDs past the maximum
    pub fn classify(tile_id: u16) -> Option<TileBand> {
        match tile_id {
            TILE_ID_B..=255 => Some(TileBand::B),
            TILE_ID_C..=511 => Some(TileBand::C),
            TILE_ID_D..=767 => Some(TileBand::D),
            TILE_ID_E..=1535 => Some(TileBand::E),
            TILE_ID_A5..=2047 => Some(TileBand::A5),
            TILE_ID_A1..=2815 => Some(TileBand::A1),
            TILE_ID_A2..=4351 => Some(TileBand::A2),
            TILE_ID_A3..=5887 => Some(TileBand::A3),
            TILE_ID_A4..=8191 => Some(TileBand::A4),
            _ => None,
        }
    }
}

/// One entry in a cell's paint list. Table edges and shadows are explicit
/// variants rather than sentinel ID offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawTile {
    /// An ordinary or autotile ID
    Tile(u16),
    /// Front edge of the table tile in the cell above
    TableEdge(u16),
    /// 4-bit shadow quadrant mask
    Shadow(u8),
}

pub fn is_visible_tile(tile_id: u16) -> bool {
    tile_id > 0 && tile_id < TILE_ID_MAX
}

pub fn is_autotile(tile_id: u16) -> bool {
    tile_id >= TILE_ID_A1
}

pub fn autotile_kind(tile_id: u16) -> u16 {
    (tile_id - TILE_ID_A1) / 48
}

pub fn autotile_shape(tile_id: u16) -> u16 {
    (tile_id - TILE_ID_A1) % 48
}

pub fn make_autotile_id(kind: u16, shape: u16) -> u16 {
    TILE_ID_A1 + kind * 48 + shape
}

/// Autotiles of the same kind count as the same tile regardless of shape
pub fn is_same_kind_tile(a: u16, b: u16) -> bool {
    if is_autotile(a) && is_autotile(b) {
        autotile_kind(a) == autotile_kind(b)
    } else {
        a == b
    }
}

pub fn is_tile_a1(tile_id: u16) -> bool {
    (TILE_ID_A1..TILE_ID_A2).contains(&tile_id)
}

pub fn is_tile_a2(tile_id: u16) -> bool {
    (TILE_ID_A2..TILE_ID_A3).contains(&tile_id)
}

pub fn is_tile_a3(tile_id: u16) -> bool {
    (TILE_ID_A3..TILE_ID_A4).contains(&tile_id)
}

pub fn is_tile_a4(tile_id: u16) -> bool {
    (TILE_ID_A4..TILE_ID_MAX).contains(&tile_id)
}

pub fn is_tile_a5(tile_id: u16) -> bool {
    (TILE_ID_A5..TILE_ID_A1).contains(&tile_id)
}

pub fn is_water_tile(tile_id: u16) -> bool {
    if is_tile_a1(tile_id) {
        !(TILE_ID_A1 + 96..TILE_ID_A1 + 192).contains(&tile_id)
    } else {
        false
    }
}

pub fn is_waterfall_tile(tile_id: u16) -> bool {
    if (TILE_ID_A1 + 192..TILE_ID_A2).contains(&tile_id) {
        autotile_kind(tile_id) % 2 == 1
    } else {
        false
    }
}

pub fn is_ground_tile(tile_id: u16) -> bool {
    is_tile_a1(tile_id) || is_tile_a2(tile_id) || is_tile_a5(tile_id)
}

/// Tiles that cast their own shadow and suppress table edges
pub fn is_shadowing_tile(tile_id: u16) -> bool {
    is_tile_a3(tile_id) || is_tile_a4(tile_id)
}

pub fn is_roof_tile(tile_id: u16) -> bool {
    is_tile_a3(tile_id) && autotile_kind(tile_id) % 16 < 8
}

pub fn is_wall_top_tile(tile_id: u16) -> bool {
    is_tile_a4(tile_id) && autotile_kind(tile_id) % 16 < 8
}

pub fn is_wall_side_tile(tile_id: u16) -> bool {
    (is_tile_a3(tile_id) || is_tile_a4(tile_id)) && autotile_kind(tile_id) % 16 >= 8
}

pub fn is_wall_tile(tile_id: u16) -> bool {
    is_wall_top_tile(tile_id) || is_wall_side_tile(tile_id)
}

pub fn is_floor_type_autotile(tile_id: u16) -> bool {
    (is_tile_a1(tile_id) && !is_waterfall_tile(tile_id))
        || is_tile_a2(tile_id)
        || is_wall_top_tile(tile_id)
}

pub fn is_wall_type_autotile(tile_id: u16) -> bool {
    is_roof_tile(tile_id) || is_wall_side_tile(tile_id)
}

pub fn is_waterfall_type_autotile(tile_id: u16) -> bool {
    is_waterfall_tile(tile_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_classification() {
        assert_eq!(TileBand::classify(0), Some(TileBand::B));
        assert_eq!(TileBand::classify(300), Some(TileBand::C));
        assert_eq!(TileBand::classify(600), Some(TileBand::D));
        assert_eq!(TileBand::classify(1000), Some(TileBand::E));
        assert_eq!(TileBand::classify(1536), Some(TileBand::A5));
        assert_eq!(TileBand::classify(2048), Some(TileBand::A1));
        assert_eq!(TileBand::classify(2816), Some(TileBand::A2));
        assert_eq!(TileBand::classify(4352), Some(TileBand::A3));
        assert_eq!(TileBand::classify(5888), Some(TileBand::A4));
        assert_eq!(TileBand::classify(8192), None);
    }

    #[test]
    fn test_visibility_bounds() {
        assert!(!is_visible_tile(0));
        assert!(is_visible_tile(1));
        assert!(is_visible_tile(8191));
        assert!(!is_visible_tile(8192));
    }

    #[test]
    fn test_autotile_kind_shape_roundtrip() {
        let id = make_autotile_id(7, 23);
        assert!(is_autotile(id));
        assert_eq!(autotile_kind(id), 7);
        assert_eq!(autotile_shape(id), 23);
    }

    #[test]
    fn test_same_kind_ignores_shape() {
        let a = make_autotile_id(3, 0);
        let b = make_autotile_id(3, 47);
        let c = make_autotile_id(4, 0);
        assert!(is_same_kind_tile(a, b));
        assert!(!is_same_kind_tile(a, c));
        assert!(is_same_kind_tile(100, 100));
        assert!(!is_same_kind_tile(100, 101));
    }

    #[test]
    fn test_water_and_waterfall() {
        // Kinds 0-1 are water, kind 2 (ids 2144..2192) is not
        assert!(is_water_tile(2048));
        assert!(!is_water_tile(2144));
        assert!(!is_water_tile(2200));
        // Waterfalls are the odd kinds from kind 4 upward
        assert!(is_waterfall_tile(make_autotile_id(5, 0)));
        assert!(!is_waterfall_tile(make_autotile_id(4, 0)));
        assert!(!is_waterfall_tile(2048));
    }

    #[test]
    fn test_wall_predicates() {
        let roof = TILE_ID_A3;
        let wall_side_a3 = make_autotile_id(autotile_kind(TILE_ID_A3) + 8, 0);
        let wall_top = TILE_ID_A4;
        assert!(is_roof_tile(roof));
        assert!(is_wall_side_tile(wall_side_a3));
        assert!(is_wall_top_tile(wall_top));
        assert!(is_wall_tile(wall_top));
        assert!(is_shadowing_tile(roof));
        assert!(!is_shadowing_tile(2048));
    }
}
