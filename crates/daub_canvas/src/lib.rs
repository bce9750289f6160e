//! # Daub Canvas
//!
//! Top-level surface orchestration for the Daub painting engine. A
//! [`CanvasSurface`] is what a platform shell embeds: it owns the painting
//! state, routes pointer events into strokes, and brings the GPU render
//! context up and down as the display surface comes and goes.
//!
//! ```no_run
//! use std::sync::Arc;
//! use daub_canvas::{CanvasConfig, GpuCanvasSurface};
//! use daub_core::Size;
//!
//! # fn window() -> Arc<winit_like::Window> { unimplemented!() }
//! # mod winit_like { pub struct Window; }
//! # impl raw_window_handle::HasWindowHandle for winit_like::Window {
//! #     fn window_handle(&self) -> Result<raw_window_handle::WindowHandle<'_>, raw_window_handle::HandleError> { unimplemented!() }
//! # }
//! # impl raw_window_handle::HasDisplayHandle for winit_like::Window {
//! #     fn display_handle(&self) -> Result<raw_window_handle::DisplayHandle<'_>, raw_window_handle::HandleError> { unimplemented!() }
//! # }
//! let mut canvas = GpuCanvasSurface::new(CanvasConfig::new(Size::new(2048.0, 1536.0)));
//! canvas.gpu_surface_available(window(), 1170, 2532).expect("gpu init");
//! ```

pub mod surface;

pub use surface::{CanvasConfig, CanvasSurface, GpuCanvasSurface};

pub use daub_core::{Bitmap, Brush, Color, Point, Size, StrokePoint};
pub use daub_gpu::{PaintRenderer, RenderError, WgpuPaintRenderer};
pub use daub_paint::{Background, Painting, PointerEvent, PointerPhase};
