//! Autotile shape tables and layout
//!
//! Each autotile shape maps to four (quadrant-x, quadrant-y) source
//! offsets into the tileset; the tables are fixed for floor, wall, and
//! waterfall type autotiles. `autotile_layout` resolves a tile ID to its
//! tileset index, base block coordinates, and shape table.

use crate::tile_id::{
    autotile_kind, is_tile_a1, is_tile_a2, is_tile_a3, is_tile_a4,
};

/// Four (x, y) quadrant offsets for one shape
pub type QuadOffsets = [[u8; 2]; 4];

pub const FLOOR_AUTOTILE_TABLE: [QuadOffsets; 48] = [
    [[2, 4], [1, 4], [2, 3], [1, 3]],
    [[2, 0], [1, 4], [2, 3], [1, 3]],
    [[2, 4], [3, 0], [2, 3], [1, 3]],
    [[2, 0], [3, 0], [2, 3], [1, 3]],
    [[2, 4], [1, 4], [2, 3], [3, 1]],
    [[2, 0], [1, 4], [2, 3], [3, 1]],
    [[2, 4], [3, 0], [2, 3], [3, 1]],
    [[2, 0], [3, 0], [2, 3], [3, 1]],
    [[2, 4], [1, 4], [2, 1], [1, 3]],
    [[2, 0], [1, 4], [2, 1], [1, 3]],
    [[2, 4], [3, 0], [2, 1], [1, 3]],
    [[2, 0], [3, 0], [2, 1], [1, 3]],
    [[2, 4], [1, 4], [2, 1], [3, 1]],
    [[2, 0], [1, 4], [2, 1], [3, 1]],
    [[2, 4], [3, 0], [2, 1], [3, 1]],
    [[2, 0], [3, 0], [2, 1], [3, 1]],
    [[0, 4], [1, 4], [0, 3], [1, 3]],
    [[0, 4], [3, 0], [0, 3], [1, 3]],
    [[0, 4], [1, 4], [0, 3], [3, 1]],
    [[0, 4], [3, 0], [0, 3], [3, 1]],
    [[2, 2], [1, 2], [2, 3], [1, 3]],
    [[2, 2], [1, 2], [2, 3], [3, 1]],
    [[2, 2], [1, 2], [2, 1], [1, 3]],
    [[2, 2], [1, 2], [2, 1], [3, 1]],
    [[2, 4], [3, 4], [2, 3], [3, 3]],
    [[2, 4], [3, 4], [2, 1], [3, 3]],
    [[2, 0], [3, 4], [2, 3], [3, 3]],
    [[2, 0], [3, 4], [2, 1], [3, 3]],
    [[2, 4], [1, 4], [2, 5], [1, 5]],
    [[2, 0], [1, 4], [2, 5], [1, 5]],
    [[2, 4], [3, 0], [2, 5], [1, 5]],
    [[2, 0], [3, 0], [2, 5], [1, 5]],
    [[0, 4], [3, 4], [0, 3], [3, 3]],
    [[2, 2], [1, 2], [2, 5], [1, 5]],
    [[0, 2], [1, 2], [0, 3], [1, 3]],
    [[0, 2], [1, 2], [0, 3], [3, 1]],
    [[2, 2], [3, 2], [2, 3], [3, 3]],
    [[2, 2], [3, 2], [2, 1], [3, 3]],
    [[2, 4], [3, 4], [2, 5], [3, 5]],
    [[2, 0], [3, 4], [2, 5], [3, 5]],
    [[0, 4], [1, 4], [0, 5], [1, 5]],
    [[0, 4], [3, 0], [0, 5], [1, 5]],
    [[0, 2], [3, 2], [0, 3], [3, 3]],
    [[0, 2], [1, 2], [0, 5], [1, 5]],
    [[0, 4], [3, 4], [0, 5], [3, 5]],
    [[2, 2], [3, 2], [2, 5], [3, 5]],
    [[0, 2], [3, 2], [0, 5], [3, 5]],
    [[0, 0], [1, 0], [0, 1], [1, 1]],
];

pub const WALL_AUTOTILE_TABLE: [QuadOffsets; 16] = [
    [[2, 2], [1, 2], [2, 1], [1, 1]],
    [[0, 2], [1, 2], [0, 1], [1, 1]],
    [[2, 0], [1, 0], [2, 1], [1, 1]],
    [[0, 0], [1, 0], [0, 1], [1, 1]],
    [[2, 2], [3, 2], [2, 1], [3, 1]],
    [[0, 2], [3, 2], [0, 1], [3, 1]],
    [[2, 0], [3, 0], [2, 1], [3, 1]],
    [[0, 0], [3, 0], [0, 1], [3, 1]],
    [[2, 2], [1, 2], [2, 3], [1, 3]],
    [[0, 2], [1, 2], [0, 3], [1, 3]],
    [[2, 0], [1, 0], [2, 3], [1, 3]],
    [[0, 0], [1, 0], [0, 3], [1, 3]],
    [[2, 2], [3, 2], [2, 3], [3, 3]],
    [[0, 2], [3, 2], [0, 3], [3, 3]],
    [[2, 0], [3, 0], [2, 3], [3, 3]],
    [[0, 0], [3, 0], [0, 3], [3, 3]],
];

pub const WATERFALL_AUTOTILE_TABLE: [QuadOffsets; 4] = [
    [[2, 0], [1, 0], [2, 1], [1, 1]],
    [[0, 0], [1, 0], [0, 1], [1, 1]],
    [[2, 0], [3, 0], [2, 1], [3, 1]],
    [[0, 0], [3, 0], [0, 1], [3, 1]],
];

/// Resolved drawing layout for an autotile ID
pub(crate) struct AutotileLayout {
    pub set_number: usize,
    pub bx: u32,
    pub by: u32,
    pub table: &'static [QuadOffsets],
    pub is_table: bool,
    /// Per-quad shader animation offsets (water scrolls horizontally,
    /// waterfalls vertically)
    pub anim_x: u32,
    pub anim_y: u32,
}

/// Map an autotile ID to its tileset block. With `animation_frame` the
/// water/waterfall animation is baked into the block coordinates (canvas
/// compositing); without it the layout carries per-quad animation offsets
/// for a shader sink instead.
pub(crate) fn autotile_layout(
    tile_id: u16,
    animation_frame: Option<u32>,
    is_table: bool,
) -> AutotileLayout {
    let kind = u32::from(autotile_kind(tile_id));
    let tx = kind % 8;
    let ty = kind / 8;
    let mut layout = AutotileLayout {
        set_number: 0,
        bx: 0,
        by: 0,
        table: &FLOOR_AUTOTILE_TABLE,
        is_table: false,
        anim_x: 0,
        anim_y: 0,
    };

    if is_tile_a1(tile_id) {
        let water_surface = animation_frame.map(|f| [0, 1, 2, 1][(f % 4) as usize]);
        let animate_water = |layout: &mut AutotileLayout| match water_surface {
            Some(index) => layout.bx += index * 2,
            None => layout.anim_x = 2,
        };
        match kind {
            0 => animate_water(&mut layout),
            1 => {
                layout.by = 3;
                animate_water(&mut layout);
            }
            2 => layout.bx = 6,
            3 => {
                layout.bx = 6;
                layout.by = 3;
            }
            _ => {
                layout.bx = (tx / 4) * 8;
                layout.by = ty * 6 + (tx / 2 % 2) * 3;
                if kind % 2 == 0 {
                    animate_water(&mut layout);
                } else {
                    layout.bx += 6;
                    layout.table = &WATERFALL_AUTOTILE_TABLE;
                    match animation_frame {
                        Some(frame) => layout.by += frame % 3,
                        None => layout.anim_y = 1,
                    }
                }
            }
        }
    } else if is_tile_a2(tile_id) {
        layout.set_number = 1;
        layout.bx = tx * 2;
        layout.by = (ty - 2) * 3;
        layout.is_table = is_table;
    } else if is_tile_a3(tile_id) {
        layout.set_number = 2;
        layout.bx = tx * 2;
        layout.by = (ty - 6) * 2;
        layout.table = &WALL_AUTOTILE_TABLE;
    } else if is_tile_a4(tile_id) {
        layout.set_number = 3;
        layout.bx = tx * 2;
        if ty % 2 == 1 {
            // Odd rows are the wall blocks, a half step below the floor row
            layout.by = ((ty - 10) * 5 + 1) / 2;
            layout.table = &WALL_AUTOTILE_TABLE;
        } else {
            layout.by = (ty - 10) * 5 / 2;
        }
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_id::{make_autotile_id, TILE_ID_A2, TILE_ID_A3, TILE_ID_A4};

    #[test]
    fn test_floor_table_shape_count_and_bounds() {
        assert_eq!(FLOOR_AUTOTILE_TABLE.len(), 48);
        for shape in FLOOR_AUTOTILE_TABLE {
            for [x, y] in shape {
                assert!(x <= 3);
                assert!(y <= 5);
            }
        }
    }

    #[test]
    fn test_wall_table_bounds() {
        assert_eq!(WALL_AUTOTILE_TABLE.len(), 16);
        for shape in WALL_AUTOTILE_TABLE {
            for [x, y] in shape {
                assert!(x <= 3);
                assert!(y <= 3);
            }
        }
    }

    #[test]
    fn test_waterfall_table_bounds() {
        assert_eq!(WATERFALL_AUTOTILE_TABLE.len(), 4);
        for shape in WATERFALL_AUTOTILE_TABLE {
            for [x, y] in shape {
                assert!(x <= 3);
                assert!(y <= 1);
            }
        }
    }

    #[test]
    fn test_water_animation_baked() {
        // Frame cycle 0,1,2,1 shifts the source block two columns per step
        let id = make_autotile_id(0, 0);
        assert_eq!(autotile_layout(id, Some(0), false).bx, 0);
        assert_eq!(autotile_layout(id, Some(1), false).bx, 2);
        assert_eq!(autotile_layout(id, Some(2), false).bx, 4);
        assert_eq!(autotile_layout(id, Some(3), false).bx, 2);
    }

    #[test]
    fn test_water_animation_as_offset() {
        let id = make_autotile_id(0, 0);
        let layout = autotile_layout(id, None, false);
        assert_eq!(layout.bx, 0);
        assert_eq!(layout.anim_x, 2);
        assert_eq!(layout.anim_y, 0);
    }

    #[test]
    fn test_waterfall_layout() {
        let id = make_autotile_id(5, 0);
        let baked = autotile_layout(id, Some(2), false);
        assert_eq!(baked.set_number, 0);
        assert_eq!(baked.table.len(), 4);
        assert_eq!(baked.bx, 14);
        assert_eq!(baked.by, 2);

        let offset = autotile_layout(id, None, false);
        assert_eq!(offset.anim_y, 1);
        assert_eq!(offset.by, 0);
    }

    #[test]
    fn test_a2_layout() {
        let id = TILE_ID_A2 + 48 * 3;
        let layout = autotile_layout(id, Some(0), true);
        assert_eq!(layout.set_number, 1);
        assert_eq!(layout.bx, 6);
        assert_eq!(layout.by, 0);
        assert!(layout.is_table);
        assert_eq!(layout.table.len(), 48);
    }

    #[test]
    fn test_a3_uses_wall_table() {
        let layout = autotile_layout(TILE_ID_A3, Some(0), false);
        assert_eq!(layout.set_number, 2);
        assert_eq!(layout.table.len(), 16);
        assert_eq!(layout.by, 0);
    }

    #[test]
    fn test_a4_alternates_floor_and_wall_rows() {
        // Even rows are floor blocks, odd rows wall blocks
        let even = autotile_layout(TILE_ID_A4, Some(0), false);
        assert_eq!(even.set_number, 3);
        assert_eq!(even.table.len(), 48);
        assert_eq!(even.by, 0);

        let odd = autotile_layout(make_autotile_id(88, 0), Some(0), false);
        assert_eq!(odd.table.len(), 16);
        assert_eq!(odd.by, 3);
    }
}
