//! Pointer input processing
//!
//! Consumes raw pointer events in device coordinates, applies the current
//! view→painting transform, and drives the [`Painting`]'s stroke
//! integration. Multi-touch is rejected wholesale: a second simultaneous
//! pointer aborts the gesture rather than guessing at stroke authorship.

use std::sync::Arc;

use daub_core::{Affine2D, Point, StrokePoint};

use crate::Painting;

/// Where a pointer event sits in its gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Moved,
    Up,
    Cancelled,
}

/// A single pointer event with device-space coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub position: Point,
    /// Simultaneous pointers on the surface, this one included.
    pub pointer_count: u32,
    /// Input pressure, 1.0 for pressure-less devices.
    pub pressure: f32,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f32, y: f32) -> Self {
        Self {
            phase,
            position: Point::new(x, y),
            pointer_count: 1,
            pressure: 1.0,
        }
    }

    pub fn down(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Down, x, y)
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Moved, x, y)
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Up, x, y)
    }

    pub fn cancelled(x: f32, y: f32) -> Self {
        Self::new(PointerPhase::Cancelled, x, y)
    }

    pub fn with_pointer_count(mut self, count: u32) -> Self {
        self.pointer_count = count;
        self
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = pressure;
        self
    }
}

/// Turns the pointer event stream into stroke points in painting space.
pub struct InputProcessor {
    painting: Arc<Painting>,
    view_to_painting: Option<Affine2D>,
    stroking: bool,
}

impl InputProcessor {
    pub fn new(painting: Arc<Painting>) -> Self {
        Self {
            painting,
            view_to_painting: None,
            stroking: false,
        }
    }

    /// Install the current view→painting matrix. Until one is set, all
    /// input is dropped (the surface is not ready).
    pub fn set_transform(&mut self, view_to_painting: Option<Affine2D>) {
        self.view_to_painting = view_to_painting;
    }

    pub fn has_transform(&self) -> bool {
        self.view_to_painting.is_some()
    }

    /// Process one pointer event. Returns whether the event was handled;
    /// multi-touch and not-ready conditions report `false` without error.
    pub fn process(&mut self, event: &PointerEvent) -> bool {
        if event.pointer_count > 1 {
            if self.stroking {
                tracing::debug!(
                    pointers = event.pointer_count,
                    "second pointer landed, aborting gesture"
                );
                self.painting.cancel_stroke();
                self.stroking = false;
            }
            return false;
        }

        let Some(matrix) = self.view_to_painting else {
            tracing::trace!("pointer event dropped, transform not ready");
            return false;
        };

        let p = matrix.transform_point(event.position);
        let point = StrokePoint::with_pressure(p.x, p.y, event.pressure);

        match event.phase {
            PointerPhase::Down => {
                self.painting.begin_stroke(point);
                self.stroking = true;
                true
            }
            PointerPhase::Moved => {
                if !self.stroking {
                    return false;
                }
                self.painting.extend_stroke(point);
                true
            }
            PointerPhase::Up => {
                if !self.stroking {
                    return false;
                }
                self.painting.finish_stroke();
                self.stroking = false;
                true
            }
            PointerPhase::Cancelled => {
                if !self.stroking {
                    return false;
                }
                self.painting.cancel_stroke();
                self.stroking = false;
                true
            }
        }
    }
}
