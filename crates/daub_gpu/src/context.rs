//! Render thread ownership and scheduling
//!
//! [`RenderContextManager`] owns the dedicated render thread. The
//! [`PaintRenderer`] backend is moved into that thread at spawn and never
//! leaves it; every other thread talks to it through a FIFO job queue. Two
//! frame flavors exist: coalesced redraws (many content-changed
//! notifications fold into one queued frame) and forced frames that always
//! run and always present, used after resizes and resumes.
//!
//! Shutdown is sequenced: a shutdown job drains behind all queued work, the
//! backend is released exactly once on the render thread, and the owner
//! joins. [`RenderHandle`] is the cloneable side handed to the painting as
//! its [`RenderScheduler`]; it can also request shutdown without joining,
//! which is what a pause completion running on the render thread itself
//! needs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use daub_core::{Mat4, Rect};
use daub_paint::{FramePlan, Painting, RenderScheduler};

use crate::error::RenderError;
use crate::renderer::PaintRenderer;

enum Job<B> {
    /// Arbitrary work against the backend, FIFO with frames.
    Work(Box<dyn FnOnce(&mut B) + Send>),
    /// Draw a frame. Forced frames present even when nothing changed.
    Frame { forced: bool },
    /// Drain and exit; the backend is released on the way out.
    Shutdown,
}

/// Render context lifecycle, as seen by the owning thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Ready,
    Destroyed,
}

/// Cloneable handle into the render thread's job queue.
pub struct RenderHandle<B> {
    sender: Sender<Job<B>>,
    queued: Arc<AtomicBool>,
}

impl<B> Clone for RenderHandle<B> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            queued: self.queued.clone(),
        }
    }
}

impl<B: PaintRenderer> RenderHandle<B> {
    /// Queue a coalesced redraw. Repeated calls while one frame is already
    /// queued are folded into it.
    pub fn schedule_redraw(&self) {
        if self.queued.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.sender.send(Job::Frame { forced: false }).is_err() {
            tracing::debug!("redraw after render thread exit, dropped");
        }
    }

    /// Queue an unconditional frame that presents even without new content.
    pub fn request_render(&self) {
        if self.sender.send(Job::Frame { forced: true }).is_err() {
            tracing::debug!("render request after render thread exit, dropped");
        }
    }

    /// Queue work to run on the render thread with backend access.
    pub fn run(&self, work: impl FnOnce(&mut B) + Send + 'static) {
        if self.sender.send(Job::Work(Box::new(work))).is_err() {
            tracing::debug!("work posted after render thread exit, dropped");
        }
    }

    /// Ask the render thread to exit after draining queued work, without
    /// joining it. Safe to call from the render thread itself; the owning
    /// [`RenderContextManager`] still joins on its own thread.
    pub fn request_shutdown(&self) {
        let _ = self.sender.send(Job::Shutdown);
    }
}

impl<B: PaintRenderer> RenderScheduler for RenderHandle<B> {
    fn content_changed(&self, _region: Option<Rect>) {
        self.schedule_redraw();
    }

    fn post(&self, job: Box<dyn FnOnce() + Send>) {
        self.run(move |_backend| job());
    }
}

/// Owner of the render thread and the GPU backend living on it.
pub struct RenderContextManager<B: PaintRenderer> {
    state: ContextState,
    handle: RenderHandle<B>,
    join: Option<JoinHandle<()>>,
}

impl<B: PaintRenderer> RenderContextManager<B> {
    /// Move `backend` onto a fresh render thread and size its buffers.
    pub fn new(
        backend: B,
        painting: Arc<Painting>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let (sender, receiver) = std::sync::mpsc::channel();
        let queued = Arc::new(AtomicBool::new(false));
        let loop_queued = queued.clone();
        let join = std::thread::Builder::new()
            .name("daub-render".into())
            .spawn(move || render_loop(backend, painting, receiver, loop_queued))
            .map_err(|e| RenderError::RenderThread(e.to_string()))?;

        let manager = Self {
            state: ContextState::Ready,
            handle: RenderHandle { sender, queued },
            join: Some(join),
        };
        manager.set_buffer_size(width, height);
        Ok(manager)
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// A handle suitable for [`Painting::attach_scheduler`] and for posting
    /// from other threads.
    pub fn handle(&self) -> RenderHandle<B> {
        self.handle.clone()
    }

    /// Resize the backend's surface buffers, FIFO with queued frames.
    pub fn set_buffer_size(&self, width: u32, height: u32) {
        self.handle.run(move |backend| {
            if let Err(e) = backend.set_buffer_size(width, height) {
                tracing::error!("buffer resize failed: {e}");
            }
        });
    }

    /// Install a new painting→clip projection, FIFO with queued frames.
    pub fn set_projection(&self, projection: Mat4) {
        self.handle
            .run(move |backend| backend.set_projection(projection));
    }

    pub fn schedule_redraw(&self) {
        self.handle.schedule_redraw();
    }

    pub fn request_render(&self) {
        self.handle.request_render();
    }

    /// Queue work to run on the render thread with backend access.
    pub fn post(&self, work: impl FnOnce(&mut B) + Send + 'static) {
        self.handle.run(work);
    }

    /// Drain the queue, release the backend on the render thread, and join.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.state == ContextState::Destroyed {
            return;
        }
        self.state = ContextState::Destroyed;
        self.handle.request_shutdown();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("render thread panicked during shutdown");
            }
        }
        tracing::debug!("render context manager shut down");
    }
}

impl<B: PaintRenderer> Drop for RenderContextManager<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_loop<B: PaintRenderer>(
    mut backend: B,
    painting: Arc<Painting>,
    receiver: Receiver<Job<B>>,
    queued: Arc<AtomicBool>,
) {
    tracing::debug!("render thread started");
    while let Ok(job) = receiver.recv() {
        match job {
            Job::Work(work) => work(&mut backend),
            Job::Frame { forced } => {
                queued.store(false, Ordering::SeqCst);
                render_frame(&mut backend, &painting, forced);
            }
            Job::Shutdown => break,
        }
    }
    backend.release();
    tracing::debug!("render thread exited");
}

fn render_frame<B: PaintRenderer>(backend: &mut B, painting: &Painting, forced: bool) {
    let plan = painting.take_frame();
    let present = match plan {
        FramePlan::Skip => forced && !painting.is_paused(),
        FramePlan::Incremental(segments) => {
            for segment in &segments {
                backend.draw_segment(&segment.brush, &segment.points, segment.continues);
            }
            true
        }
        FramePlan::Full {
            background,
            strokes,
            pending,
        } => {
            backend.clear(&background);
            for stroke in &strokes {
                backend.draw_stroke(stroke);
            }
            for segment in &pending {
                backend.draw_segment(&segment.brush, &segment.points, segment.continues);
            }
            true
        }
    };
    if present {
        if let Err(e) = backend.present() {
            tracing::error!("present failed: {e}");
        }
    }
}
