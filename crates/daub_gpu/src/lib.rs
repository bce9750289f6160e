//! # Daub GPU
//!
//! GPU render context for the Daub painting engine. The crate owns two
//! things: the wgpu brush rasterizer ([`WgpuPaintRenderer`]) and the render
//! thread that confines it ([`RenderContextManager`]).
//!
//! All GPU resources live behind the [`PaintRenderer`] trait and are only
//! touched from the dedicated render thread; other threads interact through
//! the manager's FIFO job queue and the cloneable [`RenderHandle`], which
//! also serves as the painting's redraw scheduler.

pub mod context;
pub mod error;
pub mod renderer;
pub mod shaders;

pub use context::{ContextState, RenderContextManager, RenderHandle};
pub use error::RenderError;
pub use renderer::{PaintRenderer, WgpuPaintRenderer};
