//! Screen sprite
//!
//! Full-viewport color overlay, used for fades and flashes and as the
//! weather dimmer.

use crate::sprite::next_sprite_id;
use crate::stage::{Drawable, ZOrder};
use crate::{Bitmap, Color};

/// Solid color layer covering the whole target
pub struct ScreenSprite {
    id: u64,
    color: Color,
    pub z: i32,
    pub opacity: u8,
    pub visible: bool,
}

impl Default for ScreenSprite {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenSprite {
    pub fn new() -> Self {
        Self {
            id: next_sprite_id(),
            color: Color::BLACK,
            z: 0,
            opacity: 0,
            visible: true,
        }
    }

    pub fn set_black(&mut self) {
        self.color = Color::BLACK;
    }

    pub fn set_white(&mut self) {
        self.color = Color::WHITE;
    }

    pub fn set_color(&mut self, r: u8, g: u8, b: u8) {
        self.color = Color::rgb(r, g, b);
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

impl Drawable for ScreenSprite {
    fn z_order(&self) -> ZOrder {
        ZOrder::new(self.z, 0.0, self.id)
    }

    fn draw(&mut self, target: &Bitmap) {
        if !self.visible || self.opacity == 0 {
            return;
        }
        target.fill_rect(
            0,
            0,
            target.width(),
            target.height(),
            self.color.with_alpha(self.opacity),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_opacity_draws_nothing() {
        let mut sprite = ScreenSprite::new();
        let target = Bitmap::new(4, 4);
        sprite.draw(&target);
        assert_eq!(target.fill_count(), 0);
    }

    #[test]
    fn test_full_opacity_floods_target() {
        let mut sprite = ScreenSprite::new();
        sprite.set_white();
        sprite.opacity = 255;

        let target = Bitmap::new(4, 4);
        sprite.draw(&target);
        assert_eq!(target.pixel(0, 0), Color::WHITE);
        assert_eq!(target.pixel(3, 3), Color::WHITE);
    }
}
