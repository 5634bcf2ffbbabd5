// A single drifting block: position, velocity, edge length, palette color
// and a fade-in opacity that restarts every time the block wraps.

use crate::color::{Color, PALETTE};
use crate::config::FieldConfig;
use rand::seq::SliceRandom;
use rand::Rng;
use vecmath::{vec2_add, vec2_len, vec2_sub, Vector2};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Particle {
    pos: Vector2<f64>,
    vel: Vector2<f64>,
    size: f64,
    color: Color,
    opacity: f64,
}

/// The side of the surface a wrapped particle re-enters from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Particle {
    pub fn new(pos: Vector2<f64>, vel: Vector2<f64>, size: f64, color: Color) -> Particle {
        Particle {
            pos,
            vel,
            size,
            color,
            opacity: 0.0,
        }
    }

    /// Fresh particle placed uniformly inside `[0, width) x [0, height)`.
    pub fn spawn<R: Rng>(rng: &mut R, width: f64, height: f64, config: &FieldConfig) -> Particle {
        let pos = [rng.gen::<f64>() * width, rng.gen::<f64>() * height];
        let vel = random_velocity(rng, config);
        let size = random_size(rng, config);
        let color = config.palette.choose(rng).copied().unwrap_or(PALETTE[0]);
        Particle::new(pos, vel, size, color)
    }

    pub fn pos(&self) -> Vector2<f64> {
        self.pos
    }

    pub fn vel(&self) -> Vector2<f64> {
        self.vel
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Moves one frame, advances the fade and wraps if the particle left the
    /// surface. Returns the entry edge when a wrap happened.
    pub fn step<R: Rng>(
        &mut self,
        rng: &mut R,
        width: f64,
        height: f64,
        config: &FieldConfig,
    ) -> Option<Edge> {
        self.pos = vec2_add(self.pos, self.vel);
        if self.opacity < 1.0 {
            self.opacity = (self.opacity + config.fade_step).min(1.0);
        }

        if self.is_outside(width, height) {
            Some(self.respawn(rng, width, height, config))
        } else {
            None
        }
    }

    // Outside the surface by more than the particle's own size
    pub fn is_outside(&self, width: f64, height: f64) -> bool {
        let [x, y] = self.pos;
        x > width + self.size || x < -self.size || y > height + self.size || y < -self.size
    }

    /// Moves the particle just past a random edge, using the current size as
    /// the margin, then re-rolls size and velocity. Color is kept.
    pub fn respawn<R: Rng>(
        &mut self,
        rng: &mut R,
        width: f64,
        height: f64,
        config: &FieldConfig,
    ) -> Edge {
        let edge = match rng.gen_range(0, 4) {
            0 => Edge::Top,
            1 => Edge::Bottom,
            2 => Edge::Left,
            _ => Edge::Right,
        };
        self.pos = match edge {
            Edge::Top => [rng.gen::<f64>() * width, -self.size],
            Edge::Bottom => [rng.gen::<f64>() * width, height + self.size],
            Edge::Left => [-self.size, rng.gen::<f64>() * height],
            Edge::Right => [width + self.size, rng.gen::<f64>() * height],
        };
        self.size = random_size(rng, config);
        self.vel = random_velocity(rng, config);
        self.opacity = 0.0;
        edge
    }

    pub fn distance_to(&self, other: &Particle) -> f64 {
        vec2_len(vec2_sub(self.pos, other.pos))
    }

    #[cfg(test)]
    pub(crate) fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
    }
}

fn random_size<R: Rng>(rng: &mut R, config: &FieldConfig) -> f64 {
    let (min, max) = config.size_range;
    sample(rng, min, max)
}

fn random_velocity<R: Rng>(rng: &mut R, config: &FieldConfig) -> Vector2<f64> {
    let max = config.max_speed;
    [sample(rng, -max, max), sample(rng, -max, max)]
}

// Uniform in [min, max); an empty range collapses to min
fn sample<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    if min < max {
        rng.gen_range(min, max)
    } else {
        min
    }
}
