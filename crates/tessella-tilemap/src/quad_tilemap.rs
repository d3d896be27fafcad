//! Quad-batched tile compositor
//!
//! Same decode as the canvas compositor, but the sink is a flat list of
//! textured quads for a GPU-style renderer. Water and waterfall animation
//! stays out of the source coordinates: each quad carries animation
//! offsets the renderer applies per frame, so a repaint is only needed on
//! scroll or forced refresh. There is no per-cell diffing; a repaint
//! rebuilds every visible cell.

use tessella_render::{Bitmap, Point};

use crate::autotile::autotile_layout;
use crate::flags::TilesetFlags;
use crate::tile_id::{
    autotile_shape, is_autotile, is_shadowing_tile, is_tile_a2, is_tile_a5,
    is_visible_tile,
};

const MARGIN: u32 = 20;
const TILE_SIZE: u32 = 48;

/// Texture a quad samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadSource {
    /// Tileset bitmap by set number
    Tileset(usize),
    /// Flat shadow fill using the layer's shadow color
    Shadow,
}

/// One batched draw rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileQuad {
    pub source: QuadSource,
    pub sx: u32,
    pub sy: u32,
    pub dx: u32,
    pub dy: u32,
    pub width: u32,
    pub height: u32,
    /// Animation step applied by the renderer, in source blocks
    pub anim_x: u32,
    pub anim_y: u32,
}

/// Accumulator for one bucket's quads
pub struct QuadLayer {
    quads: Vec<TileQuad>,
    pub shadow_color: [f32; 4],
}

impl Default for QuadLayer {
    fn default() -> Self {
        Self {
            quads: Vec::new(),
            shadow_color: [0.0, 0.0, 0.0, 0.5],
        }
    }
}

impl QuadLayer {
    pub fn clear(&mut self) {
        self.quads.clear();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_rect(
        &mut self,
        source: QuadSource,
        sx: u32,
        sy: u32,
        dx: u32,
        dy: u32,
        width: u32,
        height: u32,
        anim_x: u32,
        anim_y: u32,
    ) {
        self.quads.push(TileQuad {
            source,
            sx,
            sy,
            dx,
            dy,
            width,
            height,
            anim_x,
            anim_y,
        });
    }

    pub fn quads(&self) -> &[TileQuad] {
        &self.quads
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }
}

/// Tile compositor emitting quad batches
pub struct QuadTilemap {
    width: u32,
    height: u32,
    tile_width: u32,
    tile_height: u32,
    margin: u32,
    map_width: u32,
    map_height: u32,
    map_data: Vec<u16>,
    lower_layer: QuadLayer,
    upper_layer: QuadLayer,
    layer_offset: (i64, i64),

    pub bitmaps: Vec<Option<Bitmap>>,
    pub origin: Point,
    pub flags: TilesetFlags,
    pub horizontal_wrap: bool,
    pub vertical_wrap: bool,
    pub animation_count: u32,
    animation_frame: u32,

    needs_repaint: bool,
    last_start: Option<(i64, i64)>,
    last_bitmap_length: usize,
    overpass: Option<Box<dyn Fn(i64, i64) -> bool>>,
}

impl QuadTilemap {
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self {
            width: screen_width + MARGIN * 2,
            height: screen_height + MARGIN * 2,
            tile_width: TILE_SIZE,
            tile_height: TILE_SIZE,
            margin: MARGIN,
            map_width: 0,
            map_height: 0,
            map_data: Vec::new(),
            lower_layer: QuadLayer::default(),
            upper_layer: QuadLayer::default(),
            layer_offset: (0, 0),
            bitmaps: Vec::new(),
            origin: Point::default(),
            flags: TilesetFlags::default(),
            horizontal_wrap: false,
            vertical_wrap: false,
            animation_count: 0,
            animation_frame: 0,
            needs_repaint: true,
            last_start: None,
            last_bitmap_length: 0,
            overpass: None,
        }
    }

    pub fn set_data(&mut self, width: u32, height: u32, data: Vec<u16>) {
        self.map_width = width;
        self.map_height = height;
        self.map_data = data;
    }

    pub fn is_ready(&self) -> bool {
        self.bitmaps
            .iter()
            .flatten()
            .all(|bitmap| bitmap.is_ready())
    }

    pub fn update(&mut self) {
        self.animation_count += 1;
        self.animation_frame = self.animation_count / 30;
        for bitmap in self.bitmaps.iter().flatten() {
            bitmap.touch();
        }
    }

    /// Force a repaint; also re-syncs the tileset list when its length
    /// changed since the last refresh.
    pub fn refresh(&mut self) {
        if self.last_bitmap_length != self.bitmaps.len() {
            self.last_bitmap_length = self.bitmaps.len();
            self.refresh_tileset();
        }
        self.needs_repaint = true;
    }

    /// Re-bind tileset textures after the bitmap list changed
    pub fn refresh_tileset(&mut self) {
        tracing::debug!(tilesets = self.bitmaps.len(), "quad tilemap tileset sync");
    }

    pub fn set_overpass_fn(&mut self, f: impl Fn(i64, i64) -> bool + 'static) {
        self.overpass = Some(Box::new(f));
    }

    pub fn lower_layer(&self) -> &QuadLayer {
        &self.lower_layer
    }

    pub fn upper_layer(&self) -> &QuadLayer {
        &self.upper_layer
    }

    /// Pixel offset the renderer positions both quad batches at
    pub fn layer_offset(&self) -> (i64, i64) {
        self.layer_offset
    }

    /// Source-space animation offset for the current frame, applied to
    /// quads scaled by their `anim_x`/`anim_y` (water cycles 0,1,2,1 per
    /// half block, waterfalls roll through 3 rows).
    pub fn animation_offset(&self) -> (u32, u32) {
        let mut af = self.animation_frame % 4;
        if af == 3 {
            af = 1;
        }
        (
            af * self.tile_width,
            self.animation_frame % 3 * self.tile_height,
        )
    }

    /// Rebuild the quad batches when forced or when the tile-aligned
    /// start moved.
    pub fn update_transform(&mut self) {
        let ox = self.origin.x.floor() as i64;
        let oy = self.origin.y.floor() as i64;
        let start_x = (ox - i64::from(self.margin)).div_euclid(i64::from(self.tile_width));
        let start_y = (oy - i64::from(self.margin)).div_euclid(i64::from(self.tile_height));
        self.layer_offset = (
            start_x * i64::from(self.tile_width) - ox,
            start_y * i64::from(self.tile_height) - oy,
        );
        if self.needs_repaint || self.last_start != Some((start_x, start_y)) {
            self.last_start = Some((start_x, start_y));
            self.paint_all_tiles(start_x, start_y);
            self.needs_repaint = false;
        }
    }

    fn paint_all_tiles(&mut self, start_x: i64, start_y: i64) {
        self.lower_layer.clear();
        self.upper_layer.clear();
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
        let dx = x * self.tile_width;
        let dy = y * self.tile_height;
        let tile_id0 = self.read_map_data(mx, my, 0);
        let tile_id1 = self.read_map_data(mx, my, 1);
        let tile_id2 = self.read_map_data(mx, my, 2);
        let tile_id3 = self.read_map_data(mx, my, 3);
        let shadow_bits = (self.read_map_data(mx, my, 4) & 0x0f) as u8;
        let upper_tile_id1 = self.read_map_data(mx, my - 1, 1);

        self.draw_classified(tile_id0, dx, dy);
        self.draw_classified(tile_id1, dx, dy);

        self.draw_shadow(shadow_bits, dx, dy);
        if self.flags.is_table(upper_tile_id1)
            && !self.flags.is_table(tile_id1)
            && !is_shadowing_tile(tile_id0)
        {
            self.draw_table_edge(upper_tile_id1, dx, dy);
        }

        if self.overpass.as_ref().is_some_and(|f| f(mx, my)) {
            self.draw_tile(true, tile_id2, dx, dy);
            self.draw_tile(true, tile_id3, dx, dy);
        } else {
            self.draw_classified(tile_id2, dx, dy);
            self.draw_classified(tile_id3, dx, dy);
        }
    }

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

    fn draw_classified(&mut self, tile_id: u16, dx: u32, dy: u32) {
        let upper = self.flags.is_higher(tile_id);
        self.draw_tile(upper, tile_id, dx, dy);
    }

    fn layer_mut(&mut self, upper: bool) -> &mut QuadLayer {
        if upper {
            &mut self.upper_layer
        } else {
            &mut self.lower_layer
        }
    }

    fn draw_tile(&mut self, upper: bool, tile_id: u16, dx: u32, dy: u32) {
        if is_visible_tile(tile_id) {
            if is_autotile(tile_id) {
                self.draw_autotile(upper, tile_id, dx, dy);
            } else {
                self.draw_normal_tile(upper, tile_id, dx, dy);
            }
        }
    }

    fn draw_normal_tile(&mut self, upper: bool, tile_id: u16, dx: u32, dy: u32) {
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
        self.layer_mut(upper)
            .add_rect(QuadSource::Tileset(set_number), sx, sy, dx, dy, w, h, 0, 0);
    }

    fn draw_autotile(&mut self, upper: bool, tile_id: u16, dx: u32, dy: u32) {
        let layout = autotile_layout(tile_id, None, self.flags.is_table(tile_id));
        let Some(table) = layout.table.get(usize::from(autotile_shape(tile_id)))
        else {
            return;
        };
        let table = *table;
        let w1 = self.tile_width / 2;
        let h1 = self.tile_height / 2;
        let source = QuadSource::Tileset(layout.set_number);
        for (i, [qsx, qsy]) in table.into_iter().enumerate() {
            let i = i as u32;
            let sx1 = (layout.bx * 2 + u32::from(qsx)) * w1;
            let sy1 = (layout.by * 2 + u32::from(qsy)) * h1;
            let dx1 = dx + (i % 2) * w1;
            let dy1 = dy + (i / 2) * h1;
            let layer = self.layer_mut(upper);
            if layout.is_table && (qsy == 1 || qsy == 5) {
                let qsx2 = if qsy == 1 { (4 - u32::from(qsx)) % 4 } else { u32::from(qsx) };
                let sx2 = (layout.bx * 2 + qsx2) * w1;
                let sy2 = (layout.by * 2 + 3) * h1;
                layer.add_rect(source, sx2, sy2, dx1, dy1, w1, h1, layout.anim_x, layout.anim_y);
                layer.add_rect(
                    source,
                    sx1,
                    sy1,
                    dx1,
                    dy1 + h1 / 2,
                    w1,
                    h1 / 2,
                    layout.anim_x,
                    layout.anim_y,
                );
            } else {
                layer.add_rect(source, sx1, sy1, dx1, dy1, w1, h1, layout.anim_x, layout.anim_y);
            }
        }
    }

    fn draw_table_edge(&mut self, tile_id: u16, dx: u32, dy: u32) {
        if !is_tile_a2(tile_id) {
            return;
        }
        let layout = autotile_layout(tile_id, None, false);
        let Some(table) = layout.table.get(usize::from(autotile_shape(tile_id)))
        else {
            return;
        };
        let table = *table;
        let w1 = self.tile_width / 2;
        let h1 = self.tile_height / 2;
        let source = QuadSource::Tileset(layout.set_number);
        for (i, [qsx, qsy]) in table[2..4].iter().copied().enumerate() {
            let i = i as u32;
            let sx1 = (layout.bx * 2 + u32::from(qsx)) * w1;
            let sy1 = (layout.by * 2 + u32::from(qsy)) * h1 + h1 / 2;
            let dx1 = dx + (i % 2) * w1;
            let dy1 = dy + (i / 2) * h1;
            self.lower_layer
                .add_rect(source, sx1, sy1, dx1, dy1, w1, h1 / 2, 0, 0);
        }
    }

    fn draw_shadow(&mut self, shadow_bits: u8, dx: u32, dy: u32) {
        if shadow_bits & 0x0f == 0 {
            return;
        }
        let w1 = self.tile_width / 2;
        let h1 = self.tile_height / 2;
        for i in 0..4u8 {
            if shadow_bits & (1 << i) != 0 {
                let dx1 = dx + u32::from(i % 2) * w1;
                let dy1 = dy + u32::from(i / 2) * h1;
                self.lower_layer
                    .add_rect(QuadSource::Shadow, 0, 0, dx1, dy1, w1, h1, 0, 0);
            }
        }
    }
}
