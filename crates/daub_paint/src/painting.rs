//! The authoritative drawing-state owner
//!
//! A [`Painting`] integrates brush strokes coming off the input thread,
//! coordinates with the undo history, and raises dirty-region notifications
//! toward the render context through the [`RenderScheduler`] seam. The
//! render thread pulls the accumulated work with [`Painting::take_frame`];
//! that is the only place drawable content is consumed, so rasterization
//! state never leaves the render thread.
//!
//! Lifecycle is an explicit state machine with guarded transitions:
//!
//! ```text
//! Ready ⇄ Paused
//!   │        │
//!   └──── ShuttingDown ──── Destroyed
//! ```
//!
//! `clean_resources` is terminal and runs at most once; the owning canvas
//! surface is responsible for sequencing it against pause/resume.

use std::sync::{Arc, Mutex};

use smallvec::{smallvec, SmallVec};

use daub_core::{Bitmap, Brush, Color, Rect, Size, Stroke, StrokePoint, UndoStore};

use crate::PaintError;

/// What the painting is drawn over.
#[derive(Clone, Debug, PartialEq)]
pub enum Background {
    Color(Color),
    Image(Bitmap),
}

impl Default for Background {
    fn default() -> Self {
        Background::Color(Color::WHITE)
    }
}

/// Painting lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintingState {
    Ready,
    Paused,
    ShuttingDown,
    Destroyed,
}

/// Seam between the painting and the render context.
///
/// Implemented by the render context manager's handle; detached (and every
/// notification becomes a no-op) while no surface is live.
pub trait RenderScheduler: Send + Sync {
    /// Dirty-region notification. `None` means the whole surface changed.
    fn content_changed(&self, region: Option<Rect>);

    /// Run a job on the render thread after all already-queued render work.
    fn post(&self, job: Box<dyn FnOnce() + Send>);
}

/// A run of consecutive points from one gesture, rasterized incrementally.
/// Single-point runs are the initial dab of a stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeSegment {
    pub brush: Brush,
    pub points: SmallVec<[StrokePoint; 8]>,
    /// This run re-anchors a gesture whose earlier points were already
    /// delivered: its first point is the last point of the previous run and
    /// must not be stamped again.
    pub continues: bool,
}

/// One frame of work for the render thread.
#[derive(Clone, Debug, PartialEq)]
pub enum FramePlan {
    /// Nothing changed; present the existing canvas texture as-is.
    Skip,
    /// New segments to stamp on top of the current canvas content.
    Incremental(Vec<StrokeSegment>),
    /// Clear to the background and replay the retained history (undo/redo
    /// and aborted-gesture path), then stamp any in-flight segments.
    Full {
        background: Background,
        strokes: Vec<Stroke>,
        pending: Vec<StrokeSegment>,
    },
}

struct ActiveStroke {
    brush: Brush,
    points: Vec<StrokePoint>,
}

struct PaintingInner {
    state: PaintingState,
    brush: Brush,
    background: Background,
    undo: UndoStore,
    active: Option<ActiveStroke>,
    pending: Vec<StrokeSegment>,
    /// The last pending segment belongs to the active gesture and may grow.
    tail_extendable: bool,
    full_repaint: bool,
}

impl PaintingInner {
    /// Schedule a replay of the retained history. Queued segments are
    /// dropped (the replay re-covers their strokes); only the in-flight
    /// gesture is re-queued, as one fresh run of its full polyline.
    fn schedule_full_repaint(&mut self) {
        self.full_repaint = true;
        self.pending.clear();
        self.tail_extendable = false;
        if let Some(active) = &self.active {
            self.pending.push(StrokeSegment {
                brush: active.brush,
                points: SmallVec::from_slice(&active.points),
                continues: false,
            });
            self.tail_extendable = true;
        }
    }
}

/// The drawing-state owner. Shared between the canvas surface, the input
/// thread, and the render thread; the mutex guards only the small control
/// state, never GPU resources.
pub struct Painting {
    size: Size,
    inner: Mutex<PaintingInner>,
    scheduler: Mutex<Option<Arc<dyn RenderScheduler>>>,
}

impl Painting {
    pub fn new(size: Size, brush: Brush, background: Background) -> Self {
        Self {
            size,
            inner: Mutex::new(PaintingInner {
                state: PaintingState::Ready,
                brush,
                background,
                undo: UndoStore::new(),
                active: None,
                pending: Vec::new(),
                tail_extendable: false,
                full_repaint: false,
            }),
            scheduler: Mutex::new(None),
        }
    }

    /// Logical painting size; fixed for the lifetime of the painting.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Attach or detach the render context's scheduler handle.
    pub fn attach_scheduler(&self, scheduler: Option<Arc<dyn RenderScheduler>>) {
        *self.lock_scheduler() = scheduler;
    }

    /// Swap the active brush without touching history.
    pub fn set_brush(&self, brush: Brush) {
        self.lock_inner().brush = brush;
    }

    pub fn brush(&self) -> Brush {
        self.lock_inner().brush
    }

    pub fn state(&self) -> PaintingState {
        self.lock_inner().state
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PaintingState::Paused
    }

    pub fn can_undo(&self) -> bool {
        self.lock_inner().undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.lock_inner().undo.can_redo()
    }

    // ── Stroke integration (input thread) ────────────────────────────────

    /// Start a new gesture with a snapshot of the current brush.
    pub fn begin_stroke(&self, point: StrokePoint) {
        let region = {
            let mut inner = self.lock_inner();
            if inner.state != PaintingState::Ready {
                tracing::warn!(state = ?inner.state, "begin_stroke ignored");
                return;
            }
            if inner.active.is_some() {
                // Previous gesture never saw an up/cancel; drop it.
                tracing::warn!("begin_stroke with a gesture in flight, discarding it");
                inner.active = None;
            }
            let brush = inner.brush;
            inner.active = Some(ActiveStroke {
                brush,
                points: vec![point],
            });
            inner.pending.push(StrokeSegment {
                brush,
                points: smallvec![point],
                continues: false,
            });
            inner.tail_extendable = true;
            dab_region(&brush, point)
        };
        self.notify(Some(region));
    }

    /// Append a point to the in-flight gesture and queue it for incremental
    /// render feedback.
    pub fn extend_stroke(&self, point: StrokePoint) {
        let region = {
            let mut inner = self.lock_inner();
            if inner.state != PaintingState::Ready {
                tracing::warn!(state = ?inner.state, "extend_stroke ignored");
                return;
            }
            let tail_extendable = inner.tail_extendable;
            let Some(active) = inner.active.as_mut() else {
                tracing::warn!("extend_stroke without an active gesture");
                return;
            };
            let Some(prev) = active.points.last().copied() else {
                return;
            };
            let brush = active.brush;
            active.points.push(point);
            match inner.pending.last_mut() {
                Some(tail) if tail_extendable => tail.points.push(point),
                _ => {
                    inner.pending.push(StrokeSegment {
                        brush,
                        points: smallvec![prev, point],
                        continues: true,
                    });
                    inner.tail_extendable = true;
                }
            }
            dab_region(&brush, prev).union(&dab_region(&brush, point))
        };
        self.notify(Some(region));
    }

    /// Finalize the gesture and commit it to the undo history. The stroke is
    /// already rasterized through the incremental segments, so no repaint is
    /// raised.
    pub fn finish_stroke(&self) {
        let mut inner = self.lock_inner();
        if inner.state != PaintingState::Ready {
            tracing::warn!(state = ?inner.state, "finish_stroke ignored");
            return;
        }
        let Some(active) = inner.active.take() else {
            return;
        };
        inner.tail_extendable = false;
        inner
            .undo
            .record(Stroke::new(active.brush, active.points));
        tracing::trace!(strokes = inner.undo.active().len(), "stroke committed");
    }

    /// Discard the in-flight gesture without committing it. Any partial
    /// feedback already stamped is removed by a full repaint.
    pub fn cancel_stroke(&self) {
        let had_active = {
            let mut inner = self.lock_inner();
            if inner.active.take().is_none() {
                false
            } else {
                inner.pending.clear();
                inner.tail_extendable = false;
                inner.full_repaint = true;
                true
            }
        };
        if had_active {
            tracing::debug!("gesture aborted, scheduling full repaint");
            self.notify(None);
        }
    }

    // ── Undo / redo ──────────────────────────────────────────────────────

    /// Step the history back one stroke and schedule a full repaint.
    /// A no-op at the history bounds.
    pub fn undo(&self) {
        self.replay_history(|undo| undo.undo(), "undo")
    }

    /// Reapply the most recently undone stroke. A no-op unless it directly
    /// follows one or more undos.
    pub fn redo(&self) {
        self.replay_history(|undo| undo.redo(), "redo")
    }

    fn replay_history(&self, op: impl FnOnce(&mut UndoStore) -> bool, name: &'static str) {
        let moved = {
            let mut inner = self.lock_inner();
            if inner.state != PaintingState::Ready {
                tracing::warn!(state = ?inner.state, "{name} ignored");
                return;
            }
            if !op(&mut inner.undo) {
                return;
            }
            inner.schedule_full_repaint();
            true
        };
        if moved {
            tracing::debug!("{name}: scheduling full repaint");
            self.notify(None);
        }
    }

    // ── Frame planning (render thread) ───────────────────────────────────

    /// Drain the accumulated drawing work for one frame. Called only on the
    /// render thread.
    pub fn take_frame(&self) -> FramePlan {
        let mut inner = self.lock_inner();
        if inner.state != PaintingState::Ready {
            return FramePlan::Skip;
        }
        inner.tail_extendable = false;
        if inner.full_repaint {
            inner.full_repaint = false;
            let pending = std::mem::take(&mut inner.pending);
            return FramePlan::Full {
                background: inner.background.clone(),
                strokes: inner.undo.active().to_vec(),
                pending,
            };
        }
        if inner.pending.is_empty() {
            return FramePlan::Skip;
        }
        FramePlan::Incremental(std::mem::take(&mut inner.pending))
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// The owning surface went away temporarily. Drawing state is retained;
    /// `completion` runs once outstanding render work has drained (inline
    /// when no render context is attached), releasing frame-bound GPU
    /// resources on the correct thread.
    pub fn pause(&self, completion: Box<dyn FnOnce() + Send>) -> Result<(), PaintError> {
        {
            let mut inner = self.lock_inner();
            match inner.state {
                PaintingState::Ready => inner.state = PaintingState::Paused,
                state => return Err(PaintError::InvalidState { op: "pause", state }),
            }
        }
        tracing::debug!("painting paused");
        let scheduler = self.lock_scheduler().clone();
        match scheduler {
            Some(scheduler) => scheduler.post(completion),
            None => completion(),
        }
        Ok(())
    }

    /// Reactivate rendering after a pause. The undo history is untouched,
    /// but the canvas content is replayed in full: the render context may
    /// have been recreated while paused, with nothing but the background in
    /// its canvas texture.
    pub fn resume(&self) -> Result<(), PaintError> {
        {
            let mut inner = self.lock_inner();
            match inner.state {
                PaintingState::Paused => inner.state = PaintingState::Ready,
                state => return Err(PaintError::InvalidState { op: "resume", state }),
            }
            // The replay re-covers anything queued before the pause; leaving
            // those segments behind would stamp committed strokes twice.
            inner.schedule_full_repaint();
        }
        tracing::debug!("painting resumed");
        self.notify(None);
        Ok(())
    }

    /// Terminal operation: release retained state exactly once. The owner
    /// guarantees no other method runs afterward; anything that does slip
    /// through is rejected by the state guards above.
    pub fn clean_resources(&self) -> Result<(), PaintError> {
        let mut inner = self.lock_inner();
        match inner.state {
            PaintingState::Destroyed | PaintingState::ShuttingDown => {
                return Err(PaintError::InvalidState {
                    op: "clean_resources",
                    state: inner.state,
                })
            }
            _ => inner.state = PaintingState::ShuttingDown,
        }
        inner.undo.clear();
        inner.active = None;
        inner.pending.clear();
        inner.background = Background::Color(Color::TRANSPARENT);
        inner.state = PaintingState::Destroyed;
        drop(inner);
        self.attach_scheduler(None);
        tracing::info!("painting resources released");
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn notify(&self, region: Option<Rect>) {
        let scheduler = self.lock_scheduler().clone();
        if let Some(scheduler) = scheduler {
            scheduler.content_changed(region);
        }
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, PaintingInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_scheduler(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn RenderScheduler>>> {
        self.scheduler.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn dab_region(brush: &Brush, point: StrokePoint) -> Rect {
    Rect::new(point.x, point.y, 0.0, 0.0).expand(brush.radius() * point.pressure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingScheduler {
        redraws: AtomicUsize,
        posted: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    }

    impl RenderScheduler for RecordingScheduler {
        fn content_changed(&self, _region: Option<Rect>) {
            self.redraws.fetch_add(1, Ordering::SeqCst);
        }

        fn post(&self, job: Box<dyn FnOnce() + Send>) {
            self.posted.lock().unwrap().push(job);
        }
    }

    fn painting() -> Painting {
        Painting::new(
            Size::new(500.0, 500.0),
            Brush::new(Color::RED, 10.0),
            Background::default(),
        )
    }

    fn pt(x: f32, y: f32) -> StrokePoint {
        StrokePoint::new(x, y)
    }

    #[test]
    fn test_gesture_produces_incremental_plan() {
        let p = painting();
        p.begin_stroke(pt(0.0, 0.0));
        p.extend_stroke(pt(10.0, 10.0));
        p.extend_stroke(pt(20.0, 20.0));
        p.finish_stroke();

        match p.take_frame() {
            FramePlan::Incremental(segments) => {
                assert_eq!(segments.len(), 1);
                assert_eq!(segments[0].points.len(), 3);
            }
            plan => panic!("expected incremental plan, got {plan:?}"),
        }
        assert_eq!(p.take_frame(), FramePlan::Skip);
        assert!(p.can_undo());
    }

    #[test]
    fn test_segments_split_across_frames() {
        let p = painting();
        p.begin_stroke(pt(0.0, 0.0));
        p.extend_stroke(pt(10.0, 0.0));
        assert!(matches!(p.take_frame(), FramePlan::Incremental(_)));

        // Continuation re-anchors at the previous point and is flagged so
        // the renderer neither re-stamps it nor resets its dab spacing.
        p.extend_stroke(pt(20.0, 0.0));
        match p.take_frame() {
            FramePlan::Incremental(segments) => {
                assert_eq!(segments.len(), 1);
                assert_eq!(segments[0].points[0], pt(10.0, 0.0));
                assert_eq!(segments[0].points[1], pt(20.0, 0.0));
                assert!(segments[0].continues);
            }
            plan => panic!("expected incremental plan, got {plan:?}"),
        }
    }

    #[test]
    fn test_undo_requeues_inflight_gesture() {
        let p = painting();
        p.begin_stroke(pt(0.0, 0.0));
        p.extend_stroke(pt(10.0, 0.0));
        p.finish_stroke();
        let _ = p.take_frame();

        // Undo while a second gesture is in flight: the history entry goes,
        // the live gesture rides along as one fresh full-polyline run.
        p.begin_stroke(pt(50.0, 50.0));
        p.extend_stroke(pt(60.0, 50.0));
        p.undo();
        match p.take_frame() {
            FramePlan::Full {
                strokes, pending, ..
            } => {
                assert!(strokes.is_empty());
                assert_eq!(pending.len(), 1);
                assert_eq!(pending[0].points.len(), 2);
                assert!(!pending[0].continues);
            }
            plan => panic!("expected full plan, got {plan:?}"),
        }
    }

    #[test]
    fn test_resume_drops_segments_replayed_from_history() {
        let p = painting();
        p.begin_stroke(pt(0.0, 0.0));
        p.extend_stroke(pt(10.0, 0.0));
        p.finish_stroke();
        // The frame was never consumed before the pause; its segments are
        // covered by the replay and must not be stamped a second time.
        p.pause(Box::new(|| {})).unwrap();
        p.resume().unwrap();
        match p.take_frame() {
            FramePlan::Full {
                strokes, pending, ..
            } => {
                assert_eq!(strokes.len(), 1);
                assert!(pending.is_empty());
            }
            plan => panic!("expected full plan, got {plan:?}"),
        }
    }

    #[test]
    fn test_undo_yields_full_repaint() {
        let p = painting();
        p.begin_stroke(pt(0.0, 0.0));
        p.extend_stroke(pt(50.0, 50.0));
        p.finish_stroke();
        let _ = p.take_frame();

        p.undo();
        match p.take_frame() {
            FramePlan::Full {
                strokes, pending, ..
            } => {
                assert!(strokes.is_empty());
                assert!(pending.is_empty());
            }
            plan => panic!("expected full plan, got {plan:?}"),
        }

        p.redo();
        match p.take_frame() {
            FramePlan::Full { strokes, .. } => assert_eq!(strokes.len(), 1),
            plan => panic!("expected full plan, got {plan:?}"),
        }
    }

    #[test]
    fn test_undo_at_bounds_is_silent() {
        let p = painting();
        p.undo();
        p.redo();
        assert_eq!(p.take_frame(), FramePlan::Skip);
    }

    #[test]
    fn test_cancel_discards_and_repaints() {
        let p = painting();
        p.begin_stroke(pt(0.0, 0.0));
        p.extend_stroke(pt(10.0, 10.0));
        p.cancel_stroke();
        assert!(!p.can_undo());
        assert!(matches!(p.take_frame(), FramePlan::Full { .. }));
    }

    #[test]
    fn test_notifications_reach_scheduler() {
        let p = painting();
        let scheduler = Arc::new(RecordingScheduler::default());
        p.attach_scheduler(Some(scheduler.clone()));
        p.begin_stroke(pt(0.0, 0.0));
        p.extend_stroke(pt(5.0, 5.0));
        assert_eq!(scheduler.redraws.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pause_completion_inline_without_scheduler() {
        let p = painting();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        p.pause(Box::new(move || {
            ran2.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(p.is_paused());
    }

    #[test]
    fn test_pause_completion_posted_through_scheduler() {
        let p = painting();
        let scheduler = Arc::new(RecordingScheduler::default());
        p.attach_scheduler(Some(scheduler.clone()));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        p.pause(Box::new(move || {
            ran2.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
        // Not run until the render thread drains the queue.
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        for job in scheduler.posted.lock().unwrap().drain(..) {
            job();
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_paused_painting_drops_input_and_frames() {
        let p = painting();
        p.pause(Box::new(|| {})).unwrap();
        p.begin_stroke(pt(0.0, 0.0));
        assert_eq!(p.take_frame(), FramePlan::Skip);
        p.resume().unwrap();
        p.begin_stroke(pt(0.0, 0.0));
        // Resume forces a replay; the new gesture rides along as pending.
        match p.take_frame() {
            FramePlan::Full { pending, .. } => assert_eq!(pending.len(), 1),
            plan => panic!("expected full plan, got {plan:?}"),
        }
    }

    #[test]
    fn test_lifecycle_guards() {
        let p = painting();
        assert!(p.resume().is_err()); // not paused
        p.pause(Box::new(|| {})).unwrap();
        assert!(p.pause(Box::new(|| {})).is_err()); // already paused
        p.resume().unwrap();

        p.clean_resources().unwrap();
        assert_eq!(p.state(), PaintingState::Destroyed);
        assert!(p.clean_resources().is_err()); // at most once
        assert!(p.pause(Box::new(|| {})).is_err());
        assert!(p.resume().is_err());

        // Drawing after destruction is rejected, never a crash.
        p.begin_stroke(pt(0.0, 0.0));
        p.undo();
        assert_eq!(p.take_frame(), FramePlan::Skip);
    }

    #[test]
    fn test_set_brush_snapshot_semantics() {
        let p = painting();
        p.begin_stroke(pt(0.0, 0.0));
        // Brush swap mid-gesture does not affect the in-flight stroke.
        p.set_brush(Brush::new(Color::BLUE, 20.0));
        p.extend_stroke(pt(10.0, 0.0));
        p.finish_stroke();
        match p.take_frame() {
            FramePlan::Incremental(segments) => {
                assert_eq!(segments[0].brush.color, Color::RED);
            }
            plan => panic!("expected incremental plan, got {plan:?}"),
        }
        assert_eq!(p.brush().color, Color::BLUE);
    }
}
