mod utils;

pub mod color;
pub mod config;
pub mod field;
pub mod particle;
pub mod surface;
pub mod web;

use wasm_bindgen::prelude::*;
use web_sys::console;

pub use color::{Color, PALETTE};
pub use config::FieldConfig;
pub use field::{connection_alpha, FieldState, ParticleField};
pub use particle::{Edge, Particle};
pub use surface::{FrameHandle, FrameScheduler, Surface, ViewportNotifier};
pub use web::BlockchainBackground;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen]
pub fn initialize() {
    utils::set_panic_hook();
}

pub struct Timer<'a> {
    name: &'a str,
}

impl<'a> Timer<'a> {
    pub fn new(name: &'a str) -> Timer<'a> {
        console::time_with_label(name);
        Timer { name }
    }
}

impl<'a> Drop for Timer<'a> {
    fn drop(&mut self) {
        console::time_end_with_label(self.name);
    }
}
