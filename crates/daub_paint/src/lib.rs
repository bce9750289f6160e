//! Daub painting state
//!
//! The authoritative drawing-state layer of the engine:
//!
//! - [`Painting`] owns the brush, background, undo history, and lifecycle
//!   state, and plans render-thread work frame by frame
//! - [`InputProcessor`] turns raw pointer events into painting-space stroke
//!   points
//! - [`RenderScheduler`] is the seam through which dirty-region
//!   notifications and context-bound work reach the render thread
//!
//! GPU resources never appear at this layer; `daub_gpu` consumes
//! [`FramePlan`]s on its render thread.

mod error;
pub mod input;
pub mod painting;

pub use error::PaintError;
pub use input::{InputProcessor, PointerEvent, PointerPhase};
pub use painting::{
    Background, FramePlan, Painting, PaintingState, RenderScheduler, StrokeSegment,
};
