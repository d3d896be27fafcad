//! Tessella Render
//!
//! Bitmap surfaces with a load lifecycle, an async image loader, and the
//! sprite/effect layer that composites on top of them: tinted sprites,
//! tiling sprites, screen overlays, screen tone, and weather particles.

mod bitmap;
mod loader;
mod screen_sprite;
mod sprite;
mod stage;
mod tiling_sprite;
mod tone;
mod weather;

pub use bitmap::{Bitmap, LoadState};
pub use loader::{ImageLoader, LoadError, LoadToken, RETRY_DELAYS_MS};
pub use screen_sprite::ScreenSprite;
pub use sprite::Sprite;
pub use stage::{Drawable, Stage, ZOrder};
pub use tiling_sprite::TilingSprite;
pub use tone::Tone;
pub use weather::{Weather, WeatherKind};

/// RGBA color, straight (non-premultiplied) alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Integer rectangle in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Continuous 2D point, used for scroll origins
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
