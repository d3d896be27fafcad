//! Tileset flags
//!
//! Per-tile-ID bitmask supplied by the tileset: bit 0x10 marks a tile as
//! belonging to the upper layer, bit 0x80 marks a table top.

use crate::tile_id::is_tile_a2;

pub const FLAG_HIGHER: u16 = 0x10;
pub const FLAG_TABLE: u16 = 0x80;

/// Indexable flag table; missing entries read as zero.
#[derive(Debug, Clone, Default)]
pub struct TilesetFlags {
    flags: Vec<u16>,
}

impl TilesetFlags {
    pub fn new(flags: Vec<u16>) -> Self {
        Self { flags }
    }

    pub fn get(&self, tile_id: u16) -> u16 {
        self.flags.get(tile_id as usize).copied().unwrap_or(0)
    }

    /// Drawn into the upper bucket, above characters
    pub fn is_higher(&self, tile_id: u16) -> bool {
        self.get(tile_id) & FLAG_HIGHER != 0
    }

    /// Table top; only meaningful for A2 tiles
    pub fn is_table(&self, tile_id: u16) -> bool {
        is_tile_a2(tile_id) && self.get(tile_id) & FLAG_TABLE != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_id::TILE_ID_A2;

    #[test]
    fn test_missing_flags_read_zero() {
        let flags = TilesetFlags::default();
        assert_eq!(flags.get(1234), 0);
        assert!(!flags.is_higher(1234));
    }

    #[test]
    fn test_higher_flag() {
        let mut table = vec![0u16; 10];
        table[3] = FLAG_HIGHER;
        let flags = TilesetFlags::new(table);
        assert!(flags.is_higher(3));
        assert!(!flags.is_higher(2));
    }

    #[test]
    fn test_table_flag_requires_a2_band() {
        let mut table = vec![0u16; TILE_ID_A2 as usize + 10];
        table[5] = FLAG_TABLE;
        table[TILE_ID_A2 as usize] = FLAG_TABLE;
        let flags = TilesetFlags::new(table);
        assert!(!flags.is_table(5));
        assert!(flags.is_table(TILE_ID_A2));
    }
}
