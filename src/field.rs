// ParticleField owns the particle pool and runs the per-frame update/draw
// cycle against whatever surface, scheduler and viewport the host supplies.
// Nothing here touches the DOM directly, so the whole loop can be driven by
// hand in tests by calling `advance()`.

use crate::config::FieldConfig;
use crate::particle::Particle;
use crate::surface::{FrameHandle, FrameScheduler, Surface, ViewportNotifier};
use rand::Rng;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldState {
    Uninitialized,
    Running,
    Stopped,
}

pub struct ParticleField<S, F, V, R> {
    surface: S,
    scheduler: F,
    viewport: V,
    rng: R,
    config: FieldConfig,
    width: u32,
    height: u32,
    particles: Vec<Particle>,
    frame: Option<FrameHandle>,
    state: FieldState,
}

impl<S, F, V, R> ParticleField<S, F, V, R>
where
    S: Surface,
    F: FrameScheduler,
    V: ViewportNotifier,
    R: Rng,
{
    pub fn new(surface: S, scheduler: F, viewport: V, rng: R, config: FieldConfig) -> Self {
        ParticleField {
            surface,
            scheduler,
            viewport,
            rng,
            config,
            width: 0,
            height: 0,
            particles: Vec::new(),
            frame: None,
            state: FieldState::Uninitialized,
        }
    }

    /// Sizes the surface, fills the pool, starts listening for resizes and
    /// requests the first frame. Only valid from `Uninitialized`.
    pub fn mount(&mut self, width: u32, height: u32) {
        if self.state != FieldState::Uninitialized {
            return;
        }
        self.configure(width, height);
        self.reset(self.config.particle_count);
        self.viewport.subscribe();
        self.state = FieldState::Running;
        self.frame = self.scheduler.request_frame();
    }

    pub fn configure(&mut self, width: u32, height: u32) {
        self.surface.set_dimensions(width, height);
        self.width = width;
        self.height = height;
    }

    /// Throws away the whole pool and builds `count` new particles inside the
    /// current surface bounds.
    pub fn reset(&mut self, count: usize) {
        let (width, height) = self.extent();
        let rng = &mut self.rng;
        let config = &self.config;
        self.particles = (0..count)
            .map(|_| Particle::spawn(rng, width, height, config))
            .collect();
    }

    /// One frame: clear, then update and draw each particle in pool order,
    /// then ask for the next frame.
    pub fn advance(&mut self) {
        // Whatever frame was pending has now fired
        self.frame = None;
        if self.state != FieldState::Running || !self.surface.is_available() {
            return;
        }

        let (width, height) = self.extent();
        self.surface.clear_rect(0.0, 0.0, width, height);
        for i in 0..self.particles.len() {
            self.particles[i].step(&mut self.rng, width, height, &self.config);
            draw_particle(&mut self.surface, &self.particles, i, &self.config);
        }

        self.frame = self.scheduler.request_frame();
    }

    /// Resizes the surface and rebuilds the pool from scratch at the new size.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if self.state != FieldState::Running || !self.surface.is_available() {
            return;
        }
        self.configure(width, height);
        self.reset(self.config.particle_count);
    }

    /// Cancels the pending frame and drops the resize subscription. Safe to
    /// call repeatedly; a stopped field never runs again.
    pub fn stop(&mut self) {
        if self.state == FieldState::Stopped {
            return;
        }
        if let Some(handle) = self.frame.take() {
            self.scheduler.cancel_frame(handle);
        }
        if self.state == FieldState::Running {
            self.viewport.unsubscribe();
        }
        self.state = FieldState::Stopped;
    }

    /// Replaces the pool with caller-built particles.
    pub fn seed_particles(&mut self, particles: Vec<Particle>) {
        self.particles = particles;
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frame
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn extent(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }
}

/// Alpha of the line joining two particles `distance` apart. Fades linearly
/// to zero at `link_distance` and is limited by the fainter endpoint.
pub fn connection_alpha(distance: f64, opacity_a: f64, opacity_b: f64, config: &FieldConfig) -> f64 {
    let falloff = 1.0 - distance / config.link_distance;
    (falloff * opacity_a.min(opacity_b) * config.link_alpha_scale).max(0.0)
}

// Square centered on the particle, then a line to every close neighbour in
// the particle's own color. Without `dedupe_links` each close pair is drawn
// from both ends.
fn draw_particle<S: Surface>(
    surface: &mut S,
    particles: &[Particle],
    index: usize,
    config: &FieldConfig,
) {
    let particle = &particles[index];
    let size = particle.size();
    let [x, y] = particle.pos();
    surface.fill_rect(
        x - size / 2.0,
        y - size / 2.0,
        size,
        size,
        particle.color(),
        particle.opacity(),
    );

    for (j, other) in particles.iter().enumerate() {
        if j == index || (config.dedupe_links && j < index) {
            continue;
        }
        let distance = particle.distance_to(other);
        if distance < config.link_distance {
            let alpha = connection_alpha(distance, particle.opacity(), other.opacity(), config);
            surface.stroke_line(
                particle.pos(),
                other.pos(),
                particle.color(),
                alpha,
                config.link_width,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, PALETTE};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::rc::Rc;
    use vecmath::Vector2;

    #[derive(Debug, PartialEq)]
    enum Op {
        Resize(u32, u32),
        Clear,
        Fill {
            x: f64,
            y: f64,
            width: f64,
            height: f64,
            color: Color,
            alpha: f64,
        },
        Line { from: Vector2<f64>, to: Vector2<f64>, color: Color, alpha: f64 },
    }

    #[derive(Default)]
    struct HostLog {
        ops: Vec<Op>,
        requested: Vec<FrameHandle>,
        cancelled: Vec<FrameHandle>,
        subscribed: u32,
        unsubscribed: u32,
        available: bool,
    }

    type Log = Rc<RefCell<HostLog>>;

    struct FakeSurface(Log);
    struct FakeScheduler(Log);
    struct FakeViewport(Log);

    impl Surface for FakeSurface {
        fn set_dimensions(&mut self, width: u32, height: u32) {
            self.0.borrow_mut().ops.push(Op::Resize(width, height));
        }

        fn clear_rect(&mut self, _x: f64, _y: f64, _width: f64, _height: f64) {
            self.0.borrow_mut().ops.push(Op::Clear);
        }

        fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Color, alpha: f64) {
            self.0.borrow_mut().ops.push(Op::Fill {
                x,
                y,
                width,
                height,
                color,
                alpha,
            });
        }

        fn stroke_line(
            &mut self,
            from: Vector2<f64>,
            to: Vector2<f64>,
            color: Color,
            alpha: f64,
            line_width: f64,
        ) {
            assert_eq!(line_width, 0.4);
            self.0.borrow_mut().ops.push(Op::Line { from, to, color, alpha });
        }

        fn is_available(&self) -> bool {
            self.0.borrow().available
        }
    }

    impl FrameScheduler for FakeScheduler {
        fn request_frame(&mut self) -> Option<FrameHandle> {
            let mut log = self.0.borrow_mut();
            let handle = FrameHandle(log.requested.len() as i32 + 1);
            log.requested.push(handle);
            Some(handle)
        }

        fn cancel_frame(&mut self, handle: FrameHandle) {
            self.0.borrow_mut().cancelled.push(handle);
        }
    }

    impl ViewportNotifier for FakeViewport {
        fn subscribe(&mut self) {
            self.0.borrow_mut().subscribed += 1;
        }

        fn unsubscribe(&mut self) {
            self.0.borrow_mut().unsubscribed += 1;
        }
    }

    type TestField = ParticleField<FakeSurface, FakeScheduler, FakeViewport, StdRng>;

    fn field(config: FieldConfig) -> (TestField, Log) {
        let log = Rc::new(RefCell::new(HostLog {
            available: true,
            ..HostLog::default()
        }));
        let field = ParticleField::new(
            FakeSurface(log.clone()),
            FakeScheduler(log.clone()),
            FakeViewport(log.clone()),
            StdRng::seed_from_u64(42),
            config,
        );
        (field, log)
    }

    fn lines(log: &Log) -> usize {
        log.borrow()
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Line { .. }))
            .count()
    }

    #[test]
    fn mount_sizes_surface_fills_pool_and_requests_a_frame() {
        let (mut field, log) = field(FieldConfig::default());
        assert_eq!(field.state(), FieldState::Uninitialized);

        field.mount(800, 600);

        assert_eq!(field.state(), FieldState::Running);
        assert_eq!(field.dimensions(), (800, 600));
        assert_eq!(field.particles().len(), 25);
        assert_eq!(field.pending_frame(), Some(FrameHandle(1)));
        let log = log.borrow();
        assert_eq!(log.ops, vec![Op::Resize(800, 600)]);
        assert_eq!(log.subscribed, 1);
        for p in field.particles() {
            assert_eq!(p.opacity(), 0.0);
        }
    }

    #[test]
    fn mounting_twice_does_nothing() {
        let (mut field, log) = field(FieldConfig::default());
        field.mount(800, 600);
        field.mount(1024, 768);
        assert_eq!(field.dimensions(), (800, 600));
        assert_eq!(log.borrow().subscribed, 1);
        assert_eq!(log.borrow().requested.len(), 1);
    }

    #[test]
    fn single_particle_drifts_and_fades_in_over_a_hundred_frames() {
        let (mut field, log) = field(FieldConfig::with_particle_count(1));
        field.mount(800, 600);
        field.seed_particles(vec![Particle::new([400.0, 300.0], [0.1, 0.0], 10.0, PALETTE[0])]);

        for _ in 0..100 {
            field.advance();
        }

        let p = field.particles()[0];
        assert!((p.pos()[0] - 410.0).abs() < 1e-9);
        assert_eq!(p.pos()[1], 300.0);
        assert_eq!(p.opacity(), 1.0);
        assert_eq!(p.size(), 10.0);
        assert_eq!(log.borrow().requested.len(), 101);
        assert_eq!(lines(&log), 0);
    }

    #[test]
    fn block_is_filled_centered_in_its_color_at_its_opacity() {
        let (mut field, log) = field(FieldConfig::with_particle_count(1));
        field.mount(800, 600);
        field.seed_particles(vec![Particle::new([400.0, 300.0], [0.0, 0.0], 10.0, PALETTE[1])]);
        log.borrow_mut().ops.clear();

        field.advance();

        assert_eq!(
            log.borrow().ops,
            vec![
                Op::Clear,
                Op::Fill {
                    x: 395.0,
                    y: 295.0,
                    width: 10.0,
                    height: 10.0,
                    color: PALETTE[1],
                    alpha: 0.01,
                },
            ]
        );
    }

    #[test]
    fn empty_pool_only_clears_and_reschedules() {
        let (mut field, log) = field(FieldConfig::with_particle_count(0));
        field.mount(800, 600);
        log.borrow_mut().ops.clear();

        field.advance();

        assert_eq!(log.borrow().ops, vec![Op::Clear]);
        assert_eq!(field.pending_frame(), Some(FrameHandle(2)));
    }

    #[test]
    fn opacity_only_drops_to_zero_on_wrap() {
        let (mut field, _log) = field(FieldConfig::default());
        field.mount(300, 200);
        let mut previous: Vec<f64> = field.particles().iter().map(|p| p.opacity()).collect();

        for _ in 0..3000 {
            field.advance();
            for (p, before) in field.particles().iter().zip(previous.iter()) {
                assert!(p.opacity() <= 1.0);
                assert!(p.opacity() >= *before || p.opacity() == 0.0);
            }
            previous = field.particles().iter().map(|p| p.opacity()).collect();
        }
    }

    #[test]
    fn wrapped_particle_reenters_from_an_edge_invisible() {
        let (mut field, _log) = field(FieldConfig::with_particle_count(1));
        field.mount(800, 600);
        let mut p = Particle::new([809.95, 300.0], [0.1, 0.0], 10.0, PALETTE[2]);
        p.set_opacity(1.0);
        field.seed_particles(vec![p]);

        field.advance();

        let p = field.particles()[0];
        let [x, y] = p.pos();
        let on_horizontal_edge = (y == -10.0 || y == 610.0) && x >= 0.0 && x < 800.0;
        let on_vertical_edge = (x == -10.0 || x == 810.0) && y >= 0.0 && y < 600.0;
        assert!(on_horizontal_edge || on_vertical_edge);
        assert_eq!(p.opacity(), 0.0);
        assert_eq!(p.color(), PALETTE[2]);
    }

    #[test]
    fn line_alpha_at_the_extremes() {
        let config = FieldConfig::default();
        assert_eq!(connection_alpha(0.0, 1.0, 1.0, &config), 0.5);
        assert_eq!(connection_alpha(120.0, 1.0, 1.0, &config), 0.0);
        assert_eq!(connection_alpha(300.0, 1.0, 1.0, &config), 0.0);
        assert_eq!(connection_alpha(60.0, 1.0, 0.5, &config), 0.125);
    }

    fn close_pair() -> Vec<Particle> {
        let mut a = Particle::new([100.0, 100.0], [0.0, 0.0], 8.0, PALETTE[0]);
        let mut b = Particle::new([130.0, 140.0], [0.0, 0.0], 8.0, PALETTE[1]);
        a.set_opacity(1.0);
        b.set_opacity(1.0);
        vec![a, b]
    }

    #[test]
    fn close_pairs_are_linked_from_both_ends_by_default() {
        let (mut field, log) = field(FieldConfig::with_particle_count(2));
        field.mount(800, 600);
        field.seed_particles(close_pair());
        log.borrow_mut().ops.clear();

        field.advance();

        let log = log.borrow();
        let drawn: Vec<&Op> = log.ops.iter().filter(|op| matches!(op, Op::Line { .. })).collect();
        assert_eq!(drawn.len(), 2);
        assert_eq!(
            drawn[0],
            &Op::Line {
                from: [100.0, 100.0],
                to: [130.0, 140.0],
                color: PALETTE[0],
                alpha: connection_alpha(50.0, 1.0, 1.0, &FieldConfig::default()),
            }
        );
        match drawn[1] {
            Op::Line { from, color, .. } => {
                assert_eq!(*from, [130.0, 140.0]);
                assert_eq!(*color, PALETTE[1]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn dedupe_draws_each_pair_once() {
        let config = FieldConfig {
            particle_count: 2,
            dedupe_links: true,
            ..FieldConfig::default()
        };
        let (mut field, log) = field(config);
        field.mount(800, 600);
        field.seed_particles(close_pair());

        field.advance();

        assert_eq!(lines(&log), 1);
    }

    #[test]
    fn resize_rebuilds_pool_inside_new_bounds() {
        let (mut field, log) = field(FieldConfig::default());
        field.mount(1920, 1080);
        for _ in 0..10 {
            field.advance();
        }

        field.on_resize(320, 240);

        assert_eq!(field.dimensions(), (320, 240));
        assert_eq!(field.particles().len(), 25);
        for p in field.particles() {
            let [x, y] = p.pos();
            assert!(x >= 0.0 && x < 320.0);
            assert!(y >= 0.0 && y < 240.0);
            assert_eq!(p.opacity(), 0.0);
        }
        assert!(log.borrow().ops.contains(&Op::Resize(320, 240)));
    }

    #[test]
    fn stop_is_idempotent_and_final() {
        let (mut field, log) = field(FieldConfig::default());
        field.mount(800, 600);
        field.advance();

        field.stop();
        field.stop();

        assert_eq!(field.state(), FieldState::Stopped);
        assert_eq!(field.pending_frame(), None);
        {
            let log = log.borrow();
            assert_eq!(log.cancelled, vec![FrameHandle(2)]);
            assert_eq!(log.unsubscribed, 1);
        }

        log.borrow_mut().ops.clear();
        field.advance();
        field.on_resize(100, 100);
        field.mount(100, 100);
        assert!(log.borrow().ops.is_empty());
        assert_eq!(log.borrow().requested.len(), 2);
        assert_eq!(field.dimensions(), (800, 600));
    }

    #[test]
    fn unavailable_surface_turns_ticks_and_resizes_into_no_ops() {
        let (mut field, log) = field(FieldConfig::default());
        field.mount(800, 600);
        log.borrow_mut().available = false;
        log.borrow_mut().ops.clear();

        field.advance();
        field.on_resize(640, 480);

        assert!(log.borrow().ops.is_empty());
        assert_eq!(field.pending_frame(), None);
        assert_eq!(field.dimensions(), (800, 600));

        field.stop();
        assert!(log.borrow().cancelled.is_empty());
        assert_eq!(log.borrow().unsubscribed, 1);
    }
}
