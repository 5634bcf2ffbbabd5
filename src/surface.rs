// Host collaborators the particle field drives. The browser versions live in
// `web`; tests use recording fakes.

use crate::color::Color;
use vecmath::Vector2;

/// A 2D drawing target with a resizable pixel buffer.
pub trait Surface {
    fn set_dimensions(&mut self, width: u32, height: u32);

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color, alpha: f64);

    fn stroke_line(
        &mut self,
        from: Vector2<f64>,
        to: Vector2<f64>,
        color: Color,
        alpha: f64,
        line_width: f64,
    );

    // False once the host has torn the drawing target down
    fn is_available(&self) -> bool {
        true
    }
}

/// Identifies a pending frame request so it can be cancelled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHandle(pub i32);

/// Calls back into the field once before the next display refresh. The host
/// decides what the callback does; the field only asks for "one more frame".
pub trait FrameScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle>;

    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Delivers viewport size changes to the field's `on_resize`.
pub trait ViewportNotifier {
    fn subscribe(&mut self);

    fn unsubscribe(&mut self);
}
