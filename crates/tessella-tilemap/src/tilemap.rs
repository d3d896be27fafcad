//! Canvas tile compositor
//!
//! Decodes the visible window of a tile grid into blits against two
//! backing bitmaps (lower and upper bucket), sized one tile larger than
//! the padded screen. Scrolling never reallocates: four wraparound views
//! per layer re-slice the backing bitmap, and a per-cell memo of the last
//! painted draw list suppresses redraws of unchanged cells.

use std::collections::HashMap;

use tessella_render::{Bitmap, Color, Point, Rect};

use crate::autotile::autotile_layout;
use crate::flags::TilesetFlags;
use crate::tile_id::{
    autotile_shape, is_autotile, is_shadowing_tile, is_tile_a1, is_tile_a2,
    is_tile_a5, is_visible_tile, DrawTile,
};

const MARGIN: u32 = 20;
const TILE_SIZE: u32 = 48;
const SHADOW_COLOR: Color = Color::rgba(0, 0, 0, 128);

/// Lower bucket z position in the scene
pub const LOWER_LAYER_Z: i32 = 0;
/// Upper bucket z position in the scene
pub const UPPER_LAYER_Z: i32 = 4;

/// One of the four wraparound slices of a layer bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WrapView {
    /// Destination inside the padded surface
    pub dest_x: u32,
    pub dest_y: u32,
    /// Source slice of the backing bitmap
    pub frame: Rect,
}

/// Scrolling tile-grid compositor
pub struct Tilemap {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    margin: u32,
    map_width: u32,
    map_height: u32,
    map_data: Vec<u16>,
    layer_width: u32,
    layer_height: u32,
    lower_bitmap: Bitmap,
    upper_bitmap: Bitmap,
    // Last painted draw list per backing-buffer cell, lower and upper
    last_tiles: [HashMap<(u32, u32), Vec<DrawTile>>; 2],
    wrap_views: [WrapView; 4],

    pub bitmaps: Vec<Option<Bitmap>>,
    pub origin: Point,
    pub flags: TilesetFlags,
    pub horizontal_wrap: bool,
    pub vertical_wrap: bool,
    pub animation_count: u32,
    animation_frame: u32,

    needs_repaint: bool,
    frame_updated: bool,
    last_animation_frame: Option<u32>,
    last_start: Option<(i64, i64)>,
    overpass: Option<Box<dyn Fn(i64, i64) -> bool>>,
}

impl Tilemap {
    /// Compositor for a screen of the given pixel size. The working
    /// surface extends past every screen edge by a fixed margin.
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        let width = screen_width + MARGIN * 2;
        let height = screen_height + MARGIN * 2;
        let tile_cols = width.div_ceil(TILE_SIZE) + 1;
        let tile_rows = height.div_ceil(TILE_SIZE) + 1;
        let layer_width = tile_cols * TILE_SIZE;
        let layer_height = tile_rows * TILE_SIZE;
        tracing::debug!(width, height, layer_width, layer_height, "tilemap layers");

        Self {
            width,
            height,
            tile_width: TILE_SIZE,
            tile_height: TILE_SIZE,
            margin: MARGIN,
            map_width: 0,
            map_height: 0,
            map_data: Vec::new(),
            layer_width,
            layer_height,
            lower_bitmap: Bitmap::new(layer_width, layer_height),
            upper_bitmap: Bitmap::new(layer_width, layer_height),
            last_tiles: [HashMap::new(), HashMap::new()],
            wrap_views: [WrapView::default(); 4],
            bitmaps: Vec::new(),
            origin: Point::default(),
            flags: TilesetFlags::default(),
            horizontal_wrap: false,
            vertical_wrap: false,
            animation_count: 0,
            animation_frame: 0,
            needs_repaint: true,
            frame_updated: false,
            last_animation_frame: None,
            last_start: None,
            overpass: None,
        }
    }

    /// Set the map grid: 5 planes (4 tile layers plus shadow bits) stored
    /// as a flat array indexed by `(plane * height + y) * width + x`.
    pub fn set_data(&mut self, width: u32, height: u32, data: Vec<u16>) {
        self.map_width = width;
        self.map_height = height;
        self.map_data = data;
    }

    /// All referenced tileset bitmaps finished loading
    pub fn is_ready(&self) -> bool {
        self.bitmaps
            .iter()
            .flatten()
            .all(|bitmap| bitmap.is_ready())
    }

    /// Per-frame advance: animation clock plus a liveness ping for every
    /// tileset bitmap.
    pub fn update(&mut self) {
        self.animation_count += 1;
        self.animation_frame = self.animation_count / 30;
        for bitmap in self.bitmaps.iter().flatten() {
            bitmap.touch();
        }
    }

    /// Force a full repaint on the next transform update
    pub fn refresh(&mut self) {
        self.last_tiles[0].clear();
        self.last_tiles[1].clear();
        self.needs_repaint = true;
    }

    /// Replace the layer-2/3 upper-bucket predicate. Reserved for overpass
    /// map semantics; unset, no position qualifies.
    pub fn set_overpass_fn(&mut self, f: impl Fn(i64, i64) -> bool + 'static) {
        self.overpass = Some(Box::new(f));
    }

    pub fn animation_frame(&self) -> u32 {
        self.animation_frame
    }

    pub fn lower_bitmap(&self) -> &Bitmap {
        &self.lower_bitmap
    }

    pub fn upper_bitmap(&self) -> &Bitmap {
        &self.upper_bitmap
    }

    pub fn wrap_views(&self) -> &[WrapView; 4] {
        &self.wrap_views
    }

    /// Per-render-tick update: re-slice the wraparound views for the
    /// current origin and repaint when forced, when the animation frame
    /// advanced, or when the tile-aligned start moved.
    pub fn update_transform(&mut self) {
        let ox = self.origin.x.floor() as i64;
        let oy = self.origin.y.floor() as i64;
        let start_x = (ox - i64::from(self.margin)).div_euclid(i64::from(self.tile_width));
        let start_y = (oy - i64::from(self.margin)).div_euclid(i64::from(self.tile_height));
        self.update_layer_positions(ox, oy);
        if self.needs_repaint
            || self.last_animation_frame != Some(self.animation_frame)
            || self.last_start != Some((start_x, start_y))
        {
            self.frame_updated = self.last_animation_frame != Some(self.animation_frame);
            self.last_animation_frame = Some(self.animation_frame);
            self.last_start = Some((start_x, start_y));
            self.paint_all_tiles(start_x, start_y);
            self.needs_repaint = false;
        }
    }

    /// Composite one bucket onto a target surface. The target's top-left
    /// corresponds to the screen, so views land shifted by the margin.
    pub fn draw_layer_to(&self, target: &Bitmap, upper: bool) {
        let bitmap = if upper { &self.upper_bitmap } else { &self.lower_bitmap };
        for view in &self.wrap_views {
            if view.frame.is_empty() {
                continue;
            }
            target.blt(
                bitmap,
                view.frame.x,
                view.frame.y,
                view.frame.width,
                view.frame.height,
                view.dest_x as i32 - self.margin as i32,
                view.dest_y as i32 - self.margin as i32,
            );
        }
    }

    fn update_layer_positions(&mut self, ox: i64, oy: i64) {
        let m = i64::from(self.margin);
        let x2 = (ox - m).rem_euclid(i64::from(self.layer_width)) as u32;
        let y2 = (oy - m).rem_euclid(i64::from(self.layer_height)) as u32;
        let w1 = (self.layer_width - x2).min(self.width);
        let h1 = (self.layer_height - y2).min(self.height);
        let w2 = self.width.saturating_sub(w1);
        let h2 = self.height.saturating_sub(h1);

        self.wrap_views = [
            WrapView {
                dest_x: 0,
                dest_y: 0,
                frame: Rect::new(x2 as i32, y2 as i32, w1, h1),
            },
            WrapView {
                dest_x: w1,
                dest_y: 0,
                frame: Rect::new(0, y2 as i32, w2, h1),
            },
            WrapView {
                dest_x: 0,
                dest_y: h1,
                frame: Rect::new(x2 as i32, 0, w1, h2),
            },
            WrapView {
                dest_x: w1,
                dest_y: h1,
                frame: Rect::new(0, 0, w2, h2),
            },
        ];
    }

    fn paint_all_tiles(&mut self, start_x: i64, start_y: i64) {
        let tile_cols = self.width.div_ceil(self.tile_width) + 1;
        let tile_rows = self.height.div_ceil(self.tile_height) + 1;
        for y in 0..tile_rows {
            for x in 0..tile_cols {
                self.paint_tiles(start_x, start_y, x, y);
            }
        }
    }

    fn paint_tiles(&mut self, start_x: i64, start_y: i64, x: u32, y: u32) {
        let mx = start_x + i64::from(x);
        let my = start_y + i64::from(y);
        let dx = (mx * i64::from(self.tile_width))
            .rem_euclid(i64::from(self.layer_width)) as u32;
        let dy = (my * i64::from(self.tile_height))
            .rem_euclid(i64::from(self.layer_height)) as u32;
        let cell = (dx / self.tile_width, dy / self.tile_height);

        let tile_id0 = self.read_map_data(mx, my, 0);
        let tile_id1 = self.read_map_data(mx, my, 1);
        let tile_id2 = self.read_map_data(mx, my, 2);
        let tile_id3 = self.read_map_data(mx, my, 3);
        let shadow_bits = (self.read_map_data(mx, my, 4) & 0x0f) as u8;
        let upper_tile_id1 = self.read_map_data(mx, my - 1, 1);

        let mut lower_tiles = Vec::new();
        let mut upper_tiles = Vec::new();
        classify_tile(&self.flags, tile_id0, &mut lower_tiles, &mut upper_tiles);
        classify_tile(&self.flags, tile_id1, &mut lower_tiles, &mut upper_tiles);

        lower_tiles.push(DrawTile::Shadow(shadow_bits));

        if self.flags.is_table(upper_tile_id1)
            && !self.flags.is_table(tile_id1)
            && !is_shadowing_tile(tile_id0)
        {
            lower_tiles.push(DrawTile::TableEdge(upper_tile_id1));
        }

        if self.overpass.as_ref().is_some_and(|f| f(mx, my)) {
            upper_tiles.push(DrawTile::Tile(tile_id2));
            upper_tiles.push(DrawTile::Tile(tile_id3));
        } else {
            classify_tile(&self.flags, tile_id2, &mut lower_tiles, &mut upper_tiles);
            classify_tile(&self.flags, tile_id3, &mut lower_tiles, &mut upper_tiles);
        }

        let lower_changed = self.last_tiles[0].get(&cell) != Some(&lower_tiles);
        if lower_changed || (is_tile_a1(tile_id0) && self.frame_updated) {
            self.lower_bitmap
                .clear_rect(dx as i32, dy as i32, self.tile_width, self.tile_height);
            for draw in &lower_tiles {
                match *draw {
                    DrawTile::Shadow(bits) => {
                        self.draw_shadow(&self.lower_bitmap, bits, dx, dy)
                    }
                    DrawTile::TableEdge(tile_id) => {
                        self.draw_table_edge(&self.lower_bitmap, tile_id, dx, dy)
                    }
                    DrawTile::Tile(tile_id) => {
                        self.draw_tile(&self.lower_bitmap, tile_id, dx, dy)
                    }
                }
            }
            self.last_tiles[0].insert(cell, lower_tiles);
        }

        if self.last_tiles[1].get(&cell) != Some(&upper_tiles) {
            self.upper_bitmap
                .clear_rect(dx as i32, dy as i32, self.tile_width, self.tile_height);
            for draw in &upper_tiles {
                if let DrawTile::Tile(tile_id) = *draw {
                    self.draw_tile(&self.upper_bitmap, tile_id, dx, dy);
                }
            }
            self.last_tiles[1].insert(cell, upper_tiles);
        }
    }

    /// Read one grid cell; wrap flags apply modulo, otherwise out of
    /// bounds reads as empty.
    pub fn read_map_data(&self, x: i64, y: i64, plane: u32) -> u16 {
        if self.map_data.is_empty() || self.map_width == 0 || self.map_height == 0 {
            return 0;
        }
        let width = i64::from(self.map_width);
        let height = i64::from(self.map_height);
        let x = if self.horizontal_wrap { x.rem_euclid(width) } else { x };
        let y = if self.vertical_wrap { y.rem_euclid(height) } else { y };
        if (0..width).contains(&x) && (0..height).contains(&y) {
            let index = (i64::from(plane) * height + y) * width + x;
            self.map_data.get(index as usize).copied().unwrap_or(0)
        } else {
            0
        }
    }

    fn draw_tile(&self, bitmap: &Bitmap, tile_id: u16, dx: u32, dy: u32) {
        if is_visible_tile(tile_id) {
            if is_autotile(tile_id) {
                self.draw_autotile(bitmap, tile_id, dx, dy);
            } else {
                self.draw_normal_tile(bitmap, tile_id, dx, dy);
            }
        }
    }

    fn source_bitmap(&self, set_number: usize) -> Option<&Bitmap> {
        self.bitmaps.get(set_number).and_then(Option::as_ref)
    }

    fn draw_normal_tile(&self, bitmap: &Bitmap, tile_id: u16, dx: u32, dy: u32) {
        let set_number = if is_tile_a5(tile_id) {
            4
        } else {
            5 + usize::from(tile_id / 256)
        };
        let id = u32::from(tile_id);
        let w = self.tile_width;
        let h = self.tile_height;
        let sx = ((id / 128 % 2) * 8 + id % 8) * w;
        let sy = (id % 256 / 8 % 16) * h;

        // Missing tileset source: skip silently
        if let Some(source) = self.source_bitmap(set_number) {
            bitmap.blt(source, sx as i32, sy as i32, w, h, dx as i32, dy as i32);
        }
    }

    fn draw_autotile(&self, bitmap: &Bitmap, tile_id: u16, dx: u32, dy: u32) {
        let layout = autotile_layout(
            tile_id,
            Some(self.animation_frame),
            self.flags.is_table(tile_id),
        );
        let Some(table) = layout.table.get(usize::from(autotile_shape(tile_id))) else {
            return;
        };
        let Some(source) = self.source_bitmap(layout.set_number) else {
            return;
        };
        let w1 = self.tile_width / 2;
        let h1 = self.tile_height / 2;
        for (i, &[qsx, qsy]) in table.iter().enumerate() {
            let i = i as u32;
            let sx1 = (layout.bx * 2 + u32::from(qsx)) * w1;
            let sy1 = (layout.by * 2 + u32::from(qsy)) * h1;
            let dx1 = dx + (i % 2) * w1;
            let mut dy1 = dy + (i / 2) * h1;
            if layout.is_table && (qsy == 1 || qsy == 5) {
                // A table's front quadrants split: the upper part reads the
                // substituted block, the lower strip keeps the original
                let qsx2 = if qsy == 1 { (4 - u32::from(qsx)) % 4 } else { u32::from(qsx) };
                let sx2 = (layout.bx * 2 + qsx2) * w1;
                let sy2 = (layout.by * 2 + 3) * h1;
                bitmap.blt(source, sx2 as i32, sy2 as i32, w1, h1, dx1 as i32, dy1 as i32);
                dy1 += h1 / 2;
                bitmap.blt(
                    source,
                    sx1 as i32,
                    sy1 as i32,
                    w1,
                    h1 / 2,
                    dx1 as i32,
                    dy1 as i32,
                );
            } else {
                bitmap.blt(source, sx1 as i32, sy1 as i32, w1, h1, dx1 as i32, dy1 as i32);
            }
        }
    }

    fn draw_table_edge(&self, bitmap: &Bitmap, tile_id: u16, dx: u32, dy: u32) {
        if !is_tile_a2(tile_id) {
            return;
        }
        let layout = autotile_layout(tile_id, None, false);
        let Some(table) = layout.table.get(usize::from(autotile_shape(tile_id))) else {
            return;
        };
        let Some(source) = self.source_bitmap(layout.set_number) else {
            return;
        };
        let w1 = self.tile_width / 2;
        let h1 = self.tile_height / 2;
        // Only the bottom two quadrants form the edge strip
        for (i, &[qsx, qsy]) in table[2..4].iter().enumerate() {
            let i = i as u32;
            let sx1 = (layout.bx * 2 + u32::from(qsx)) * w1;
            let sy1 = (layout.by * 2 + u32::from(qsy)) * h1 + h1 / 2;
            let dx1 = dx + (i % 2) * w1;
            let dy1 = dy + (i / 2) * h1;
            bitmap.blt(
                source,
                sx1 as i32,
                sy1 as i32,
                w1,
                h1 / 2,
                dx1 as i32,
                dy1 as i32,
            );
        }
    }

    fn draw_shadow(&self, bitmap: &Bitmap, shadow_bits: u8, dx: u32, dy: u32) {
        if shadow_bits & 0x0f == 0 {
            return;
        }
        let w1 = self.tile_width / 2;
        let h1 = self.tile_height / 2;
        for i in 0..4u8 {
            if shadow_bits & (1 << i) != 0 {
                let dx1 = dx + u32::from(i % 2) * w1;
                let dy1 = dy + u32::from(i / 2) * h1;
                bitmap.fill_rect(dx1 as i32, dy1 as i32, w1, h1, SHADOW_COLOR);
            }
        }
    }
}

fn classify_tile(
    flags: &TilesetFlags,
    tile_id: u16,
    lower: &mut Vec<DrawTile>,
    upper: &mut Vec<DrawTile>,
) {
    if flags.is_higher(tile_id) {
        upper.push(DrawTile::Tile(tile_id));
    } else {
        lower.push(DrawTile::Tile(tile_id));
    }
}
