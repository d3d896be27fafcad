//! Screen tone
//!
//! Signed RGB shift plus a grayscale amount, applied per pixel. Sprites use
//! the same math for their color-tone tinting.

use crate::Bitmap;

/// Color tone: signed channel offsets in -255..=255 and a gray amount in
/// 0..=255 (0 = full color, 255 = fully desaturated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tone {
    pub red: i16,
    pub green: i16,
    pub blue: i16,
    pub gray: i16,
}

impl Tone {
    pub fn new(red: i16, green: i16, blue: i16, gray: i16) -> Self {
        Self {
            red: red.clamp(-255, 255),
            green: green.clamp(-255, 255),
            blue: blue.clamp(-255, 255),
            gray: gray.clamp(0, 255),
        }
    }

    /// No adjustment at all
    pub fn is_neutral(&self) -> bool {
        *self == Tone::default()
    }

    /// Tone math for one pixel: desaturate toward luma by `gray`, then add
    /// the signed channel offsets, clamped.
    pub fn apply(&self, rgb: [u8; 3]) -> [u8; 3] {
        let [r, g, b] = rgb.map(f32::from);
        let luma = 0.299 * r + 0.587 * g + 0.114 * b;
        let gray = f32::from(self.gray) / 255.0;
        let mix = |c: f32, offset: i16| {
            let desaturated = c + (luma - c) * gray;
            (desaturated + f32::from(offset)).clamp(0.0, 255.0) as u8
        };
        [mix(r, self.red), mix(g, self.green), mix(b, self.blue)]
    }

    /// Apply the tone to every pixel of a bitmap in place
    pub fn apply_to(&self, bitmap: &Bitmap) {
        if self.is_neutral() {
            return;
        }
        apply_tone_pixels(self, bitmap);
    }
}

fn apply_tone_pixels(tone: &Tone, bitmap: &Bitmap) {
    bitmap.with_pixmap_mut(|pixmap| {
        for pixel in pixmap.pixels_mut() {
            let c = pixel.demultiply();
            let a = c.alpha();
            if a == 0 {
                continue;
            }
            let [r, g, b] = tone.apply([c.red(), c.green(), c.blue()]);
            *pixel = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
        }
    });
}
