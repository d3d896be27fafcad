//! Weather effects
//!
//! Rain, storm, and snow particle systems with procedurally drawn particle
//! bitmaps and a screen dimmer. Particle count and dimmer strength both
//! scale with the effect power.

use std::f64::consts::PI;

use rand::Rng;

use crate::sprite::next_sprite_id;
use crate::stage::{Drawable, ZOrder};
use crate::{Bitmap, Color, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeatherKind {
    #[default]
    None,
    Rain,
    Storm,
    Snow,
}

struct Particle {
    ax: f64,
    ay: f64,
    opacity: f64,
}

/// Full-screen weather layer
pub struct Weather {
    id: u64,
    pub kind: WeatherKind,
    pub power: f64,
    pub origin: Point,
    pub z: i32,
    viewport_width: u32,
    viewport_height: u32,
    rain_bitmap: Bitmap,
    storm_bitmap: Bitmap,
    snow_bitmap: Bitmap,
    dimmer_color: Color,
    particles: Vec<Particle>,
}

impl Weather {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        let rain_bitmap = Bitmap::new(1, 60);
        rain_bitmap.fill_all(Color::WHITE);
        let storm_bitmap = Bitmap::new(2, 100);
        storm_bitmap.fill_all(Color::WHITE);
        let snow_bitmap = Bitmap::new(9, 9);
        snow_bitmap.draw_circle(4.5, 4.5, 4.0, Color::WHITE);

        Self {
            id: next_sprite_id(),
            kind: WeatherKind::None,
            power: 0.0,
            origin: Point::default(),
            z: 8,
            viewport_width,
            viewport_height,
            rain_bitmap,
            storm_bitmap,
            snow_bitmap,
            dimmer_color: Color::rgb(80, 80, 80),
            particles: Vec::new(),
        }
    }

    /// Dimmer overlay strength derived from power
    pub fn dimmer_opacity(&self) -> u8 {
        (self.power * 6.0).clamp(0.0, 255.0) as u8
    }

    /// Target particle population for the current power
    pub fn max_particles(&self) -> usize {
        match self.kind {
            WeatherKind::None => 0,
            _ => (self.power * 10.0).floor().max(0.0) as usize,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    fn particle_bitmap(&self) -> &Bitmap {
        match self.kind {
            WeatherKind::Storm => &self.storm_bitmap,
            WeatherKind::Snow => &self.snow_bitmap,
            _ => &self.rain_bitmap,
        }
    }

    /// (fall angle, speed, fade per frame) for the current kind
    fn motion(&self) -> (f64, f64, f64) {
        match self.kind {
            WeatherKind::Storm => (PI / 8.0, 8.0, 8.0),
            WeatherKind::Snow => (PI / 16.0, 3.0, 3.0),
            _ => (PI / 16.0, 6.0, 6.0),
        }
    }

    fn reborn(&self, particle: &mut Particle) {
        let mut rng = rand::rng();
        let w = f64::from(self.viewport_width) + 100.0;
        let h = f64::from(self.viewport_height) + 200.0;
        particle.ax = rng.random_range(0.0..w) - 100.0 + self.origin.x;
        particle.ay = rng.random_range(0.0..h) - 200.0 + self.origin.y;
        particle.opacity = 160.0 + rng.random_range(0.0..60.0);
    }
}

impl Drawable for Weather {
    fn z_order(&self) -> ZOrder {
        ZOrder::new(self.z, 0.0, self.id)
    }

    fn update(&mut self) {
        let max = self.max_particles();
        self.particles.truncate(max);
        while self.particles.len() < max {
            let mut particle = Particle {
                ax: 0.0,
                ay: 0.0,
                opacity: 0.0,
            };
            self.reborn(&mut particle);
            self.particles.push(particle);
        }

        let (angle, speed, fade) = self.motion();
        let (dx, dy) = (speed * angle.sin(), speed * angle.cos());
        let mut faded = Vec::new();
        for (i, particle) in self.particles.iter_mut().enumerate() {
            particle.ax -= dx;
            particle.ay += dy;
            particle.opacity -= fade;
            if particle.opacity < 40.0 {
                faded.push(i);
            }
        }
        for i in faded {
            let mut particle = Particle {
                ax: 0.0,
                ay: 0.0,
                opacity: 0.0,
            };
            std::mem::swap(&mut particle, &mut self.particles[i]);
            self.reborn(&mut particle);
            self.particles[i] = particle;
        }
    }

    fn draw(&mut self, target: &Bitmap) {
        if self.kind == WeatherKind::None && self.particles.is_empty() {
            return;
        }
        let dimmer = self.dimmer_opacity();
        if dimmer > 0 {
            target.fill_rect(
                0,
                0,
                target.width(),
                target.height(),
                self.dimmer_color.with_alpha(dimmer),
            );
        }
        let bitmap = self.particle_bitmap().clone();
        let (w, h) = (bitmap.width(), bitmap.height());
        let span_x = f64::from(self.viewport_width) + 100.0;
        let span_y = f64::from(self.viewport_height) + 200.0;
        for particle in &self.particles {
            let sx = (particle.ax - self.origin.x).rem_euclid(span_x) - 100.0;
            let sy = (particle.ay - self.origin.y).rem_euclid(span_y) - 200.0;
            let opacity = (particle.opacity / 255.0) as f32;
            target.draw_with_opacity(&bitmap, 0, 0, w, h, sx as i32, sy as i32, opacity);
        }
    }
}
