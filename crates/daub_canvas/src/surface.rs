//! Canvas surface lifecycle orchestration
//!
//! [`CanvasSurface`] ties the three halves of the engine together: the
//! [`Painting`] (drawing state), the [`InputProcessor`] (pointer events),
//! and the [`RenderContextManager`] (GPU work). It is driven by the
//! platform shell through surface callbacks:
//!
//! - `surface_available`: a surface exists, spin up the render context
//! - `surface_resized`: recompute transforms and buffers
//! - `surface_destroyed`: the surface went away, pause and tear down the
//!   render context while retaining drawing state
//! - `shutdown`: terminal, releases everything
//!
//! A destroyed surface can come back (`surface_available` again) with the
//! full undo history intact; shutdown cannot.

use std::sync::Arc;

use daub_core::{Bitmap, Brush, Color, ProjectionState, Size};
use daub_gpu::{PaintRenderer, RenderContextManager, RenderError, WgpuPaintRenderer};
use daub_paint::{Background, InputProcessor, Painting, PointerEvent, PointerPhase};

/// Initial configuration for a canvas surface.
#[derive(Clone, Debug)]
pub struct CanvasConfig {
    pub painting_size: Size,
    pub brush: Brush,
    pub background: Background,
}

impl CanvasConfig {
    pub fn new(painting_size: Size) -> Self {
        Self {
            painting_size,
            brush: Brush::default(),
            background: Background::default(),
        }
    }

    pub fn with_brush(mut self, brush: Brush) -> Self {
        self.brush = brush;
        self
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }
}

/// The engine's top-level object, owned by the platform shell on its UI
/// thread. Generic over the renderer backend so lifecycle logic is testable
/// without a GPU.
pub struct CanvasSurface<R: PaintRenderer> {
    painting: Arc<Painting>,
    input: InputProcessor,
    background: Background,
    projection: Option<ProjectionState>,
    render: Option<RenderContextManager<R>>,
    shutting_down: bool,
    /// A start observer fired with no matching end yet.
    stroke_signalled: bool,
    on_stroke_start: Option<Box<dyn Fn() + Send>>,
    on_stroke_end: Option<Box<dyn Fn() + Send>>,
}

/// Canvas surface backed by the wgpu renderer.
pub type GpuCanvasSurface = CanvasSurface<WgpuPaintRenderer>;

impl<R: PaintRenderer> CanvasSurface<R> {
    pub fn new(config: CanvasConfig) -> Self {
        let painting = Arc::new(Painting::new(
            config.painting_size,
            config.brush,
            config.background.clone(),
        ));
        let input = InputProcessor::new(painting.clone());
        Self {
            painting,
            input,
            background: config.background,
            projection: None,
            render: None,
            shutting_down: false,
            stroke_signalled: false,
            on_stroke_start: None,
            on_stroke_end: None,
        }
    }

    pub fn painting(&self) -> &Arc<Painting> {
        &self.painting
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Observer fired when a stroke gesture begins.
    pub fn set_on_stroke_start(&mut self, f: impl Fn() + Send + 'static) {
        self.on_stroke_start = Some(Box::new(f));
    }

    /// Observer fired when a stroke gesture ends or aborts.
    pub fn set_on_stroke_end(&mut self, f: impl Fn() + Send + 'static) {
        self.on_stroke_end = Some(Box::new(f));
    }

    // ── Surface lifecycle ────────────────────────────────────────────────

    /// A display surface became available: spin up the render context with
    /// `backend` and resume rendering. Restores from a prior
    /// `surface_destroyed` with the undo history intact.
    pub fn surface_available(
        &mut self,
        backend: R,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        if self.shutting_down {
            return Err(RenderError::ContextReleased);
        }
        if self.render.is_some() {
            tracing::warn!("surface_available with a live render context, replacing it");
            self.teardown_render_context();
        }

        let manager = RenderContextManager::new(backend, self.painting.clone(), width, height)?;
        self.painting
            .attach_scheduler(Some(Arc::new(manager.handle())));
        self.render = Some(manager);
        self.update_transform(width, height);

        if self.painting.is_paused() {
            if let Err(e) = self.painting.resume() {
                tracing::error!("resume on surface_available failed: {e}");
            }
        } else {
            // First surface: paint the background and history from scratch.
            self.request_full_repaint();
        }
        tracing::info!(width, height, "canvas surface available");
        Ok(())
    }

    /// The surface buffers changed size. Transforms are recomputed and a
    /// frame is forced so the painting reappears at the new scale.
    pub fn surface_resized(&mut self, width: u32, height: u32) {
        let Some(render) = &self.render else {
            tracing::warn!("surface_resized without a render context");
            return;
        };
        render.set_buffer_size(width, height);
        self.update_transform(width, height);
        if let Some(render) = &self.render {
            render.request_render();
        }
        tracing::debug!(width, height, "canvas surface resized");
    }

    /// The surface went away (window hidden, app backgrounded). Rendering
    /// pauses and the GPU context is released on its own thread; drawing
    /// state survives for the next `surface_available`.
    pub fn surface_destroyed(&mut self) {
        if self.render.is_none() {
            return;
        }
        self.teardown_render_context();
        tracing::info!("canvas surface destroyed");
    }

    /// Terminal teardown. Releases the render context and the painting's
    /// retained state; the surface accepts nothing afterwards.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        if let Some(mut render) = self.render.take() {
            // Release retained state behind all queued render work, on the
            // render thread, then drain and join.
            let painting = self.painting.clone();
            render.post(move |_backend| {
                if let Err(e) = painting.clean_resources() {
                    tracing::warn!("clean_resources during shutdown: {e}");
                }
            });
            render.shutdown();
        } else if let Err(e) = self.painting.clean_resources() {
            tracing::warn!("clean_resources during shutdown: {e}");
        }
        self.input.set_transform(None);
        self.projection = None;
        tracing::info!("canvas surface shut down");
    }

    // ── Input ────────────────────────────────────────────────────────────

    /// Feed one pointer event. Returns whether the event was consumed;
    /// events are rejected while no surface is live.
    pub fn pointer_event(&mut self, event: &PointerEvent) -> bool {
        if self.render.is_none() || self.shutting_down {
            return false;
        }
        let handled = self.input.process(event);
        match event.phase {
            PointerPhase::Down => {
                if handled && !self.stroke_signalled {
                    self.stroke_signalled = true;
                    if let Some(f) = &self.on_stroke_start {
                        f();
                    }
                }
            }
            // The end observer pairs with the start observer, not with
            // gesture handling: after a mid-stroke abort the final up is
            // not consumed, but the observer still needs its closing call.
            PointerPhase::Up | PointerPhase::Cancelled => {
                if self.stroke_signalled {
                    self.stroke_signalled = false;
                    if let Some(f) = &self.on_stroke_end {
                        f();
                    }
                }
            }
            PointerPhase::Moved => {}
        }
        handled
    }

    // ── Brush and history ────────────────────────────────────────────────

    pub fn update_brush(&self, brush: Brush) {
        self.painting.set_brush(brush);
    }

    pub fn update_color(&self, color: Color) {
        self.painting.set_brush(self.painting.brush().with_color(color));
    }

    pub fn update_brush_size(&self, weight: f32) {
        self.painting.set_brush(self.painting.brush().with_weight(weight));
    }

    pub fn undo(&self) {
        self.painting.undo();
    }

    pub fn redo(&self) {
        self.painting.redo();
    }

    pub fn can_undo(&self) -> bool {
        self.painting.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.painting.can_redo()
    }

    /// Read back the painting as a bitmap. The readback runs on the render
    /// thread behind queued work; `callback` is invoked there.
    pub fn snapshot(&self, callback: impl FnOnce(Result<Bitmap, RenderError>) + Send + 'static) {
        match &self.render {
            Some(render) => render.post(move |backend| callback(backend.snapshot())),
            None => callback(Err(RenderError::ContextReleased)),
        }
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn update_transform(&mut self, width: u32, height: u32) {
        match ProjectionState::compute(width, height, self.painting.size()) {
            Some(state) => {
                self.input.set_transform(Some(state.view_to_painting));
                if let Some(render) = &self.render {
                    render.set_projection(state.projection);
                }
                self.projection = Some(state);
            }
            None => {
                tracing::warn!(width, height, "degenerate surface size, input disabled");
                self.input.set_transform(None);
                self.projection = None;
            }
        }
    }

    fn request_full_repaint(&self) {
        if let Some(render) = &self.render {
            render.request_render();
        }
    }

    /// Pause the painting, drain render work, release the backend on the
    /// render thread, and join. Drawing state is retained.
    fn teardown_render_context(&mut self) {
        let Some(mut render) = self.render.take() else {
            return;
        };
        // The completion runs on the render thread once queued frames have
        // drained; requesting shutdown from there keeps the release ordered
        // behind them, and the join below happens on this thread.
        let handle = render.handle();
        if let Err(e) = self.painting.pause(Box::new(move || {
            handle.request_shutdown();
        })) {
            tracing::warn!("pause during surface teardown: {e}");
        }
        render.shutdown();
        self.painting.attach_scheduler(None);
        self.input.set_transform(None);
        self.projection = None;
    }
}

impl<R: PaintRenderer> Drop for CanvasSurface<R> {
    fn drop(&mut self) {
        if !self.shutting_down {
            self.shutdown();
        }
    }
}

impl GpuCanvasSurface {
    /// `surface_available` for the wgpu backend: builds the renderer against
    /// the given window handle, blocking on adapter and device setup.
    pub fn gpu_surface_available<W>(
        &mut self,
        window: Arc<W>,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError>
    where
        W: raw_window_handle::HasWindowHandle
            + raw_window_handle::HasDisplayHandle
            + Send
            + Sync
            + 'static,
    {
        let backend = pollster::block_on(WgpuPaintRenderer::new(
            window,
            self.painting.size(),
            &self.background,
            width,
            height,
        ))?;
        self.surface_available(backend, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};

    use daub_core::{Mat4, Stroke, StrokePoint};
    use daub_paint::PaintingState;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    struct FakeRenderer {
        log: Arc<Mutex<Vec<String>>>,
        releases: Arc<AtomicUsize>,
    }

    impl FakeRenderer {
        fn new(log: Arc<Mutex<Vec<String>>>, releases: Arc<AtomicUsize>) -> Self {
            Self { log, releases }
        }

        fn record(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }
    }

    impl PaintRenderer for FakeRenderer {
        fn set_buffer_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
            self.record(format!("resize {width}x{height}"));
            Ok(())
        }

        fn set_projection(&mut self, _projection: Mat4) {
            self.record("projection");
        }

        fn clear(&mut self, _background: &Background) {
            self.record("clear");
        }

        fn draw_segment(&mut self, _brush: &Brush, points: &[StrokePoint], _continues: bool) {
            self.record(format!(
                "segment {}",
                points
                    .iter()
                    .map(|p| format!("({:.0},{:.0})", p.x, p.y))
                    .collect::<Vec<_>>()
                    .join(" ")
            ));
        }

        fn present(&mut self) -> Result<(), RenderError> {
            self.record("present");
            Ok(())
        }

        fn snapshot(&mut self) -> Result<Bitmap, RenderError> {
            self.record("snapshot");
            Ok(Bitmap::filled(4, 4, Color::WHITE))
        }

        fn release(&mut self) {
            self.record("release");
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Fixture {
        surface: CanvasSurface<FakeRenderer>,
        log: Arc<Mutex<Vec<String>>>,
        releases: Arc<AtomicUsize>,
    }

    fn fixture() -> Fixture {
        init_tracing();
        let surface = CanvasSurface::new(
            CanvasConfig::new(Size::new(500.0, 500.0)).with_brush(Brush::new(Color::RED, 10.0)),
        );
        Fixture {
            surface,
            log: Arc::new(Mutex::new(Vec::new())),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    impl Fixture {
        fn backend(&self) -> FakeRenderer {
            FakeRenderer::new(self.log.clone(), self.releases.clone())
        }

        fn attach(&mut self, width: u32, height: u32) {
            let backend = self.backend();
            self.surface
                .surface_available(backend, width, height)
                .unwrap();
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_events_rejected_without_surface() {
        let mut fx = fixture();
        assert!(!fx.surface.pointer_event(&PointerEvent::down(10.0, 10.0)));
        assert!(!fx.surface.can_undo());
    }

    #[test]
    fn test_stroke_lands_in_painting_space() {
        let mut fx = fixture();
        fx.attach(1000, 1000);

        // View (500,500) is the painting center, view (1000,500) its right
        // edge midpoint.
        assert!(fx.surface.pointer_event(&PointerEvent::down(500.0, 500.0)));
        assert!(fx.surface.pointer_event(&PointerEvent::moved(1000.0, 500.0)));
        assert!(fx.surface.pointer_event(&PointerEvent::up(1000.0, 500.0)));
        assert!(fx.surface.can_undo());

        fx.surface.shutdown();
        let log = fx.log();
        assert!(log.iter().any(|e| e.starts_with("segment") && e.contains("(250,250)")));
        assert!(log.iter().any(|e| e.starts_with("segment") && e.contains("(500,250)")));
    }

    #[test]
    fn test_undo_redo_replays_history() {
        let mut fx = fixture();
        fx.attach(1000, 1000);

        fx.surface.pointer_event(&PointerEvent::down(100.0, 100.0));
        fx.surface.pointer_event(&PointerEvent::up(100.0, 100.0));
        assert!(fx.surface.can_undo());
        assert!(!fx.surface.can_redo());

        fx.surface.undo();
        assert!(!fx.surface.can_undo());
        assert!(fx.surface.can_redo());

        fx.surface.redo();
        assert!(fx.surface.can_undo());

        fx.surface.shutdown();
        // Replays clear to the background first. Consecutive replays may
        // coalesce into one frame, so at least one clear is guaranteed.
        assert!(fx.log().iter().any(|e| e == "clear"));
    }

    #[test]
    fn test_surface_destroyed_pauses_and_releases_once() {
        let mut fx = fixture();
        fx.attach(800, 600);
        fx.surface.surface_destroyed();

        assert_eq!(fx.releases.load(Ordering::SeqCst), 1);
        assert_eq!(fx.surface.painting().state(), PaintingState::Paused);
        // Idempotent with no context.
        fx.surface.surface_destroyed();
        assert_eq!(fx.releases.load(Ordering::SeqCst), 1);
        assert!(!fx.surface.pointer_event(&PointerEvent::down(1.0, 1.0)));
    }

    #[test]
    fn test_history_survives_surface_loss() {
        let mut fx = fixture();
        fx.attach(1000, 1000);
        fx.surface.pointer_event(&PointerEvent::down(100.0, 100.0));
        fx.surface.pointer_event(&PointerEvent::up(100.0, 100.0));
        fx.surface.surface_destroyed();

        fx.attach(1000, 1000);
        assert_eq!(fx.surface.painting().state(), PaintingState::Ready);
        assert!(fx.surface.can_undo());
        fx.surface.shutdown();
        assert_eq!(fx.releases.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resize_updates_buffers_and_transform() {
        let mut fx = fixture();
        fx.attach(1000, 1000);
        fx.surface.surface_resized(500, 500);
        fx.surface.shutdown();

        let log = fx.log();
        assert!(log.iter().any(|e| e == "resize 1000x1000"));
        assert!(log.iter().any(|e| e == "resize 500x500"));
        // Projection recomputed for each size.
        assert!(log.iter().filter(|e| *e == "projection").count() >= 2);
    }

    #[test]
    fn test_shutdown_is_terminal_and_idempotent() {
        let mut fx = fixture();
        fx.attach(100, 100);
        fx.surface.shutdown();
        fx.surface.shutdown();

        assert_eq!(fx.releases.load(Ordering::SeqCst), 1);
        assert_eq!(fx.surface.painting().state(), PaintingState::Destroyed);
        let backend = fx.backend();
        assert!(fx.surface.surface_available(backend, 100, 100).is_err());
    }

    #[test]
    fn test_stroke_observers_fire() {
        let mut fx = fixture();
        fx.attach(1000, 1000);

        let starts = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));
        let (s, e) = (starts.clone(), ends.clone());
        fx.surface
            .set_on_stroke_start(move || { s.fetch_add(1, Ordering::SeqCst); });
        fx.surface
            .set_on_stroke_end(move || { e.fetch_add(1, Ordering::SeqCst); });

        fx.surface.pointer_event(&PointerEvent::down(10.0, 10.0));
        fx.surface.pointer_event(&PointerEvent::moved(20.0, 20.0));
        fx.surface.pointer_event(&PointerEvent::up(20.0, 20.0));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stroke_end_fires_after_multi_touch_abort() {
        let mut fx = fixture();
        fx.attach(1000, 1000);

        let starts = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));
        let (s, e) = (starts.clone(), ends.clone());
        fx.surface
            .set_on_stroke_start(move || { s.fetch_add(1, Ordering::SeqCst); });
        fx.surface
            .set_on_stroke_end(move || { e.fetch_add(1, Ordering::SeqCst); });

        // The second pointer aborts the gesture; the final up is not
        // consumed but must still close the start/end observer pair.
        fx.surface.pointer_event(&PointerEvent::down(100.0, 100.0));
        fx.surface
            .pointer_event(&PointerEvent::moved(200.0, 200.0).with_pointer_count(2));
        assert!(!fx.surface.pointer_event(&PointerEvent::up(200.0, 200.0)));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(ends.load(Ordering::SeqCst), 1);

        // No spurious end without a new start.
        assert!(!fx.surface.pointer_event(&PointerEvent::up(200.0, 200.0)));
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_snapshot_delivers_bitmap() {
        let mut fx = fixture();
        fx.attach(100, 100);
        let (tx, rx) = mpsc::channel();
        fx.surface.snapshot(move |result| {
            let _ = tx.send(result.map(|b| (b.width(), b.height())));
        });
        assert_eq!(rx.recv().unwrap().unwrap(), (4, 4));
    }

    #[test]
    fn test_snapshot_without_surface_errors() {
        let fx = fixture();
        let (tx, rx) = mpsc::channel();
        fx.surface.snapshot(move |result| {
            let _ = tx.send(result.is_err());
        });
        assert!(rx.recv().unwrap());
    }

    #[test]
    fn test_brush_updates_apply_to_next_stroke() {
        let fx = fixture();
        fx.surface.update_color(Color::BLUE);
        fx.surface.update_brush_size(24.0);
        let brush = fx.surface.painting().brush();
        assert_eq!(brush.color, Color::BLUE);
        assert_eq!(brush.weight, 24.0);
    }

    #[test]
    fn test_multi_touch_aborts_without_commit() {
        let mut fx = fixture();
        fx.attach(1000, 1000);
        fx.surface.pointer_event(&PointerEvent::down(100.0, 100.0));
        fx.surface.pointer_event(&PointerEvent::moved(200.0, 200.0));
        assert!(!fx
            .surface
            .pointer_event(&PointerEvent::moved(300.0, 300.0).with_pointer_count(2)));
        assert!(!fx.surface.can_undo());
    }

    #[test]
    fn test_committed_stroke_equals_replayed_stroke() {
        // The history replay must reproduce what incremental stamping drew.
        let brush = Brush::new(Color::RED, 10.0);
        let points = vec![
            StrokePoint::new(10.0, 10.0),
            StrokePoint::new(60.0, 10.0),
            StrokePoint::new(60.0, 60.0),
        ];
        let stroke = Stroke::new(brush, points.clone());

        let log = Arc::new(Mutex::new(Vec::new()));
        let releases = Arc::new(AtomicUsize::new(0));
        let mut incremental = FakeRenderer::new(log.clone(), releases.clone());
        incremental.draw_segment(&brush, &points, false);
        let first = log.lock().unwrap().pop().unwrap();

        let mut replayed = FakeRenderer::new(log.clone(), releases);
        replayed.draw_stroke(&stroke);
        let second = log.lock().unwrap().pop().unwrap();
        assert_eq!(first, second);
    }
}
