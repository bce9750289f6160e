//! Brushes and strokes
//!
//! A [`Brush`] describes how a stroke is rendered and never changes while a
//! stroke is in flight: the stroke captures a snapshot of the brush on
//! pointer-down. A committed [`Stroke`] is immutable and is the unit of
//! undo/redo.

use crate::{Point, Rect};

/// Immutable-per-use brush configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brush {
    /// Stroke color
    pub color: crate::Color,
    /// Dab diameter in painting-space units
    pub weight: f32,
    /// Edge falloff: 1.0 is a hard circle, 0.0 fades from the center
    pub hardness: f32,
    /// Dab spacing along the stroke, as a fraction of the dab radius
    pub spacing: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: crate::Color::BLACK,
            weight: 8.0,
            hardness: 0.8,
            spacing: 0.35,
        }
    }
}

impl Brush {
    pub fn new(color: crate::Color, weight: f32) -> Self {
        Self {
            color,
            weight,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: crate::Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        debug_assert!(weight > 0.0);
        self.weight = weight;
        self
    }

    pub fn with_hardness(mut self, hardness: f32) -> Self {
        self.hardness = hardness.clamp(0.0, 1.0);
        self
    }

    pub fn radius(&self) -> f32 {
        self.weight * 0.5
    }
}

/// A single sampled input point in painting-space coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
    /// Width modifier from input pressure; 1.0 for pressure-less devices
    pub pressure: f32,
}

impl StrokePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            pressure: 1.0,
        }
    }

    pub fn with_pressure(x: f32, y: f32, pressure: f32) -> Self {
        Self { x, y, pressure }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One continuous pointer-down-to-up gesture, committed to the undo history.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    /// Brush snapshot taken when the gesture started
    pub brush: Brush,
    /// Ordered points, at least one
    pub points: Vec<StrokePoint>,
}

impl Stroke {
    pub fn new(brush: Brush, points: Vec<StrokePoint>) -> Self {
        debug_assert!(!points.is_empty());
        Self { brush, points }
    }

    /// Painting-space bounds, expanded by the brush radius.
    pub fn bounds(&self) -> Rect {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y).expand(self.brush.radius())
    }
}
