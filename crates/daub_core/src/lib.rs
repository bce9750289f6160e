//! Daub core types
//!
//! Leaf types shared by the painting engine:
//!
//! - **Geometry**: points, sizes, rects, affine transforms, projections
//! - **Brushes and strokes**: immutable brush configuration and committed
//!   stroke data, the unit of undo/redo
//! - **Undo history**: linear stroke history with full-repaint replay
//! - **Transform pipeline**: view↔painting mapping and the composed
//!   painting→clip projection
//!
//! Everything here is plain data with no GPU or threading concerns; the
//! render context lives in `daub_gpu` and the stateful `Painting` owner in
//! `daub_paint`.

pub mod bitmap;
pub mod brush;
pub mod color;
pub mod geometry;
pub mod transform;
pub mod undo;

pub use bitmap::Bitmap;
pub use brush::{Brush, Stroke, StrokePoint};
pub use color::Color;
pub use geometry::{Affine2D, Mat4, Point, Rect, Size};
pub use transform::ProjectionState;
pub use undo::UndoStore;
