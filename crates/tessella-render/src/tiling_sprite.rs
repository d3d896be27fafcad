//! Tiling sprite
//!
//! Fills a screen rectangle by repeating a bitmap, offset by a continuous
//! scroll origin. Used for parallax backgrounds and scrolling panoramas.

use crate::sprite::next_sprite_id;
use crate::stage::{Drawable, ZOrder};
use crate::{Bitmap, Point, Rect};

/// Scrollable repeated-bitmap fill
pub struct TilingSprite {
    id: u64,
    bitmap: Option<Bitmap>,
    frame: Rect,
    pub origin: Point,
    pub z: i32,
    pub opacity: u8,
    pub visible: bool,
}

impl Default for TilingSprite {
    fn default() -> Self {
        Self::new()
    }
}

impl TilingSprite {
    pub fn new() -> Self {
        Self {
            id: next_sprite_id(),
            bitmap: None,
            frame: Rect::default(),
            origin: Point::default(),
            z: 0,
            opacity: 255,
            visible: true,
        }
    }

    pub fn set_bitmap(&mut self, bitmap: Option<Bitmap>) {
        self.bitmap = bitmap;
    }

    /// Position and resize the filled region in one call
    pub fn move_to(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.frame = Rect::new(x, y, width, height);
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }
}

impl Drawable for TilingSprite {
    fn z_order(&self) -> ZOrder {
        ZOrder::new(self.z, self.frame.y as f64, self.id)
    }

    fn draw(&mut self, target: &Bitmap) {
        if !self.visible || self.opacity == 0 || self.frame.is_empty() {
            return;
        }
        let Some(bitmap) = &self.bitmap else {
            return;
        };
        if !bitmap.is_ready() || bitmap.width() == 0 || bitmap.height() == 0 {
            return;
        }
        bitmap.touch();

        let bw = i64::from(bitmap.width());
        let bh = i64::from(bitmap.height());
        let fw = i64::from(self.frame.width);
        let fh = i64::from(self.frame.height);
        let ox = (self.origin.x.floor() as i64).rem_euclid(bw);
        let oy = (self.origin.y.floor() as i64).rem_euclid(bh);
        let opacity = f32::from(self.opacity) / 255.0;

        let mut ty = -oy;
        while ty < fh {
            let mut tx = -ox;
            while tx < fw {
                // Portion of this repeat that lands inside the frame
                let left = tx.max(0);
                let top = ty.max(0);
                let right = (tx + bw).min(fw);
                let bottom = (ty + bh).min(fh);
                if right > left && bottom > top {
                    target.draw_with_opacity(
                        bitmap,
                        (left - tx) as i32,
                        (top - ty) as i32,
                        (right - left) as u32,
                        (bottom - top) as u32,
                        self.frame.x + left as i32,
                        self.frame.y + top as i32,
                        opacity,
                    );
                }
                tx += bw;
            }
            ty += bh;
        }
    }
}
