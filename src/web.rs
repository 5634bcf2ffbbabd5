// Browser host for the particle field: a 2D canvas surface, the window's
// requestAnimationFrame loop and its resize event. `BlockchainBackground` is
// the type the page script constructs.

use crate::color::Color;
use crate::config::FieldConfig;
use crate::field::ParticleField;
use crate::surface::{FrameHandle, FrameScheduler, Surface, ViewportNotifier};
use crate::{utils, Timer};
use rand::rngs::ThreadRng;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use vecmath::Vector2;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, CanvasRenderingContext2d, HtmlCanvasElement, Window};

pub type WebField = ParticleField<CanvasSurface, AnimationFrameScheduler, WindowResize, ThreadRng>;

// Fixed, full-viewport, faint and click-through
const BACKDROP_STYLE: [(&str, &str); 8] = [
    ("position", "fixed"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100%"),
    ("height", "100%"),
    ("z-index", "0"),
    ("opacity", "0.12"),
    ("pointer-events", "none"),
];

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Fails if the canvas is not attached to the document yet, since a
    /// detached canvas is how the field recognises a torn-down surface.
    pub fn new(canvas: HtmlCanvasElement) -> Result<CanvasSurface, JsValue> {
        if !canvas.is_connected() {
            return Err("canvas must be attached to the document".into());
        }
        let context = canvas
            .get_context("2d")?
            .ok_or("canvas has no 2d context")?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(CanvasSurface { canvas, context })
    }

    pub fn apply_backdrop_style(&self) -> Result<(), JsValue> {
        let style = self.canvas.style();
        for &(name, value) in BACKDROP_STYLE.iter() {
            style.set_property(name, value)?;
        }
        Ok(())
    }
}

impl Surface for CanvasSurface {
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.context.clear_rect(x, y, width, height);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color, alpha: f64) {
        let ctx = &self.context;
        ctx.save();
        ctx.set_global_alpha(alpha);
        #[allow(deprecated)]
        ctx.set_fill_style(&JsValue::from_str(&color.to_css()));
        ctx.fill_rect(x, y, width, height);
        ctx.restore();
    }

    fn stroke_line(
        &mut self,
        from: Vector2<f64>,
        to: Vector2<f64>,
        color: Color,
        alpha: f64,
        line_width: f64,
    ) {
        let ctx = &self.context;
        ctx.save();
        ctx.set_global_alpha(alpha);
        #[allow(deprecated)]
        ctx.set_stroke_style(&JsValue::from_str(&color.to_css()));
        ctx.set_line_width(line_width);
        ctx.begin_path();
        ctx.move_to(from[0], from[1]);
        ctx.line_to(to[0], to[1]);
        ctx.stroke();
        ctx.restore();
    }

    // A canvas removed from the document is treated as torn down
    fn is_available(&self) -> bool {
        self.canvas.is_connected()
    }
}

pub struct AnimationFrameScheduler {
    window: Window,
    callback: Closure<dyn FnMut()>,
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        match self
            .window
            .request_animation_frame(
                self.callback.as_ref().unchecked_ref::<js_sys::Function>(),
            )
        {
            Ok(id) => Some(FrameHandle(id)),
            Err(err) => {
                console::error_1(&err);
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Err(err) = self.window.cancel_animation_frame(handle.0) {
            console::error_1(&err);
        }
    }
}

pub struct WindowResize {
    window: Window,
    callback: Closure<dyn FnMut()>,
    subscribed: bool,
}

impl ViewportNotifier for WindowResize {
    fn subscribe(&mut self) {
        if self.subscribed {
            return;
        }
        match self
            .window
            .add_event_listener_with_callback(
                "resize",
                self.callback.as_ref().unchecked_ref::<js_sys::Function>(),
            )
        {
            Ok(()) => self.subscribed = true,
            Err(err) => console::error_1(&err),
        }
    }

    fn unsubscribe(&mut self) {
        if !self.subscribed {
            return;
        }
        if let Err(err) = self
            .window
            .remove_event_listener_with_callback(
                "resize",
                self.callback.as_ref().unchecked_ref::<js_sys::Function>(),
            )
        {
            console::error_1(&err);
        }
        self.subscribed = false;
    }
}

fn viewport_size(window: &Window) -> (u32, u32) {
    let width = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(600.0);
    (width.max(1.0) as u32, height.max(1.0) as u32)
}

#[wasm_bindgen]
pub struct BlockchainBackground {
    field: Rc<RefCell<WebField>>,
}

#[wasm_bindgen]
impl BlockchainBackground {
    /// Starts the backdrop on `canvas`, which must already be in the document.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement) -> Result<BlockchainBackground, JsValue> {
        BlockchainBackground::with_config(canvas, FieldConfig::default())
    }

    pub fn with_particle_count(
        canvas: HtmlCanvasElement,
        particle_count: usize,
    ) -> Result<BlockchainBackground, JsValue> {
        BlockchainBackground::with_config(canvas, FieldConfig::with_particle_count(particle_count))
    }

    /// Cancels the animation loop and the resize listener. Also runs on drop.
    pub fn stop(&self) {
        self.field.borrow_mut().stop();
    }

    pub fn particle_count(&self) -> usize {
        self.field.borrow().particles().len()
    }

    pub fn is_running(&self) -> bool {
        self.field.borrow().state() == crate::field::FieldState::Running
    }
}

impl BlockchainBackground {
    pub fn with_config(
        canvas: HtmlCanvasElement,
        config: FieldConfig,
    ) -> Result<BlockchainBackground, JsValue> {
        utils::set_panic_hook();
        let window = web_sys::window().ok_or("no global window")?;
        let surface = CanvasSurface::new(canvas)?;
        surface.apply_backdrop_style()?;

        // Callbacks hold a weak reference so dropping the backdrop frees the field
        let field = Rc::new_cyclic(|weak: &Weak<RefCell<WebField>>| {
            let target = weak.clone();
            let on_frame = Closure::wrap(Box::new(move || {
                if let Some(field) = target.upgrade() {
                    field.borrow_mut().advance();
                }
            }) as Box<dyn FnMut()>);

            let target = weak.clone();
            let resize_window = window.clone();
            let on_resize = Closure::wrap(Box::new(move || {
                if let Some(field) = target.upgrade() {
                    let _timer = Timer::new("BlockchainBackground::resize");
                    let (width, height) = viewport_size(&resize_window);
                    field.borrow_mut().on_resize(width, height);
                }
            }) as Box<dyn FnMut()>);

            let scheduler = AnimationFrameScheduler {
                window: window.clone(),
                callback: on_frame,
            };
            let viewport = WindowResize {
                window: window.clone(),
                callback: on_resize,
                subscribed: false,
            };
            RefCell::new(ParticleField::new(
                surface,
                scheduler,
                viewport,
                rand::thread_rng(),
                config,
            ))
        });

        let (width, height) = viewport_size(&window);
        field.borrow_mut().mount(width, height);
        console::log_1(
            &format!(
                "blockchain backdrop: {} particles on {}x{}",
                field.borrow().particles().len(),
                width,
                height
            )
            .into(),
        );

        Ok(BlockchainBackground { field })
    }
}

impl Drop for BlockchainBackground {
    fn drop(&mut self) {
        self.field.borrow_mut().stop();
    }
}
