// Tunable constants for the particle field. Defaults reproduce the
// portfolio background: 25 faint blocks joined by proximity lines.

use crate::color::{Color, PALETTE};

#[derive(Clone, Debug, PartialEq)]
pub struct FieldConfig {
    pub particle_count: usize,
    /// Edge length range of a block, `[min, max)` in pixels.
    pub size_range: (f64, f64),
    /// Each velocity component is sampled from `[-max_speed, max_speed)`.
    pub max_speed: f64,
    /// Opacity gained per frame while fading in.
    pub fade_step: f64,
    /// Pairs closer than this (pixels) get a connection line.
    pub link_distance: f64,
    pub link_width: f64,
    pub link_alpha_scale: f64,
    /// Draw each close pair once instead of once from each endpoint.
    pub dedupe_links: bool,
    pub palette: Vec<Color>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            particle_count: 25,
            size_range: (4.0, 16.0),
            max_speed: 0.15,
            fade_step: 0.01,
            link_distance: 120.0,
            link_width: 0.4,
            link_alpha_scale: 0.5,
            dedupe_links: false,
            palette: PALETTE.to_vec(),
        }
    }
}

impl FieldConfig {
    pub fn with_particle_count(particle_count: usize) -> Self {
        FieldConfig {
            particle_count,
            ..FieldConfig::default()
        }
    }
}
