//! Sprite
//!
//! A positioned bitmap region with opacity, blend color, and color tone.
//! Tinting runs in software against a memoized work surface that is only
//! recomputed when the frame, blend color, or tone actually change.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::stage::{Drawable, ZOrder};
use crate::{Bitmap, Color, Rect, Tone};

static NEXT_SPRITE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_sprite_id() -> u64 {
    NEXT_SPRITE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A drawable bitmap region
pub struct Sprite {
    id: u64,
    bitmap: Option<Bitmap>,
    frame: Option<Rect>,
    pub x: f64,
    pub y: f64,
    pub z: i32,
    pub opacity: u8,
    pub visible: bool,
    blend_color: Color,
    color_tone: Tone,
    tinted: Option<Bitmap>,
    tint_key: Option<(Rect, Color, Tone)>,
    tint_generation: u64,
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new()
    }
}

impl Sprite {
    pub fn new() -> Self {
        Self {
            id: next_sprite_id(),
            bitmap: None,
            frame: None,
            x: 0.0,
            y: 0.0,
            z: 0,
            opacity: 255,
            visible: true,
            blend_color: Color::TRANSPARENT,
            color_tone: Tone::default(),
            tinted: None,
            tint_key: None,
            tint_generation: 0,
        }
    }

    pub fn with_bitmap(bitmap: Bitmap) -> Self {
        let mut sprite = Self::new();
        sprite.set_bitmap(Some(bitmap));
        sprite
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    pub fn set_bitmap(&mut self, bitmap: Option<Bitmap>) {
        self.bitmap = bitmap;
        self.frame = None;
        self.tint_key = None;
        self.tinted = None;
    }

    /// Restrict drawing to a sub-rectangle of the bitmap. Without a frame
    /// the whole bitmap is drawn.
    pub fn set_frame(&mut self, frame: Rect) {
        self.frame = Some(frame);
    }

    pub fn frame(&self) -> Option<Rect> {
        self.frame
    }

    /// Blend color; alpha is the blend strength
    pub fn set_blend_color(&mut self, color: Color) {
        self.blend_color = color;
    }

    pub fn blend_color(&self) -> Color {
        self.blend_color
    }

    pub fn set_color_tone(&mut self, tone: Tone) {
        self.color_tone = tone;
    }

    pub fn color_tone(&self) -> Tone {
        self.color_tone
    }

    /// Times the tint surface has been recomputed
    pub fn tint_generation(&self) -> u64 {
        self.tint_generation
    }

    fn needs_tint(&self) -> bool {
        self.blend_color.a > 0 || !self.color_tone.is_neutral()
    }

    fn effective_frame(&self, bitmap: &Bitmap) -> Rect {
        self.frame
            .unwrap_or_else(|| Rect::new(0, 0, bitmap.width(), bitmap.height()))
    }

    fn refresh_tint(&mut self, bitmap: &Bitmap, frame: Rect) {
        let key = (frame, self.blend_color, self.color_tone);
        if self.tint_key == Some(key) && self.tinted.is_some() {
            return;
        }
        let Some(work) = bitmap.clone_region(frame) else {
            return;
        };
        self.color_tone.apply_to(&work);
        if self.blend_color.a > 0 {
            apply_blend_color(&work, self.blend_color);
        }
        self.tinted = Some(work);
        self.tint_key = Some(key);
        self.tint_generation += 1;
    }
}

/// Mix opaque pixels toward the blend color by its alpha; pixel alpha is
/// preserved (source-atop).
fn apply_blend_color(bitmap: &Bitmap, blend: Color) {
    let strength = f32::from(blend.a) / 255.0;
    bitmap.with_pixmap_mut(|pixmap| {
        for pixel in pixmap.pixels_mut() {
            let c = pixel.demultiply();
            let a = c.alpha();
            if a == 0 {
                continue;
            }
            let mix = |c: u8, b: u8| {
                (f32::from(c) * (1.0 - strength) + f32::from(b) * strength) as u8
            };
            *pixel = tiny_skia::ColorU8::from_rgba(
                mix(c.red(), blend.r),
                mix(c.green(), blend.g),
                mix(c.blue(), blend.b),
                a,
            )
            .premultiply();
        }
    });
}

impl Drawable for Sprite {
    fn z_order(&self) -> ZOrder {
        ZOrder::new(self.z, self.y, self.id)
    }

    fn draw(&mut self, target: &Bitmap) {
        if !self.visible || self.opacity == 0 {
            return;
        }
        let Some(bitmap) = self.bitmap.clone() else {
            return;
        };
        if !bitmap.is_ready() {
            return;
        }
        bitmap.touch();
        let frame = self.effective_frame(&bitmap);
        if frame.is_empty() {
            return;
        }
        let opacity = f32::from(self.opacity) / 255.0;
        let (dx, dy) = (self.x as i32, self.y as i32);
        if self.needs_tint() {
            self.refresh_tint(&bitmap, frame);
            if let Some(tinted) = &self.tinted {
                target.draw_with_opacity(
                    tinted,
                    0,
                    0,
                    frame.width,
                    frame.height,
                    dx,
                    dy,
                    opacity,
                );
            }
        } else {
            target.draw_with_opacity(
                &bitmap,
                frame.x,
                frame.y,
                frame.width,
                frame.height,
                dx,
                dy,
                opacity,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_bitmap(size: u32) -> Bitmap {
        let bitmap = Bitmap::new(size, size);
        bitmap.fill_all(Color::rgb(255, 0, 0));
        bitmap
    }

    #[test]
    fn test_draw_without_tint() {
        let mut sprite = Sprite::with_bitmap(red_bitmap(4));
        sprite.x = 2.0;
        sprite.y = 2.0;

        let target = Bitmap::new(8, 8);
        sprite.draw(&target);
        assert_eq!(target.pixel(3, 3), Color::rgb(255, 0, 0));
        assert_eq!(target.pixel(0, 0), Color::TRANSPARENT);
    }

    #[test]
    fn test_invisible_sprite_draws_nothing() {
        let mut sprite = Sprite::with_bitmap(red_bitmap(4));
        sprite.visible = false;

        let target = Bitmap::new(8, 8);
        sprite.draw(&target);
        assert_eq!(target.blit_count(), 0);
    }

    #[test]
    fn test_unready_bitmap_skipped() {
        let mut sprite = Sprite::with_bitmap(Bitmap::loading("img/a.png"));
        let target = Bitmap::new(8, 8);
        sprite.draw(&target);
        assert_eq!(target.blit_count(), 0);
    }

    #[test]
    fn test_full_blend_color_replaces_rgb() {
        let mut sprite = Sprite::with_bitmap(red_bitmap(2));
        sprite.set_blend_color(Color::rgba(0, 0, 255, 255));

        let target = Bitmap::new(4, 4);
        sprite.draw(&target);
        let pixel = target.pixel(0, 0);
        assert_eq!(pixel.b, 255);
        assert_eq!(pixel.r, 0);
    }

    #[test]
    fn test_tint_memoized_across_draws() {
        let mut sprite = Sprite::with_bitmap(red_bitmap(2));
        sprite.set_color_tone(Tone::new(0, 50, 0, 0));

        let target = Bitmap::new(4, 4);
        sprite.draw(&target);
        sprite.draw(&target);
        sprite.draw(&target);
        assert_eq!(sprite.tint_generation(), 1);
    }

    #[test]
    fn test_tint_recomputed_on_change() {
        let mut sprite = Sprite::with_bitmap(red_bitmap(2));
        sprite.set_color_tone(Tone::new(0, 50, 0, 0));

        let target = Bitmap::new(4, 4);
        sprite.draw(&target);
        sprite.set_color_tone(Tone::new(0, 100, 0, 0));
        sprite.draw(&target);
        assert_eq!(sprite.tint_generation(), 2);
    }

    #[test]
    fn test_frame_limits_draw_region() {
        let bitmap = Bitmap::new(4, 4);
        bitmap.fill_rect(0, 0, 2, 4, Color::rgb(255, 0, 0));
        bitmap.fill_rect(2, 0, 2, 4, Color::rgb(0, 255, 0));

        let mut sprite = Sprite::with_bitmap(bitmap);
        sprite.set_frame(Rect::new(2, 0, 2, 4));

        let target = Bitmap::new(4, 4);
        sprite.draw(&target);
        assert_eq!(target.pixel(0, 0), Color::rgb(0, 255, 0));
        assert_eq!(target.pixel(3, 0), Color::TRANSPARENT);
    }

    #[test]
    fn test_sprite_ids_unique() {
        let a = Sprite::new();
        let b = Sprite::new();
        assert_ne!(a.id(), b.id());
    }
}
