//! Render context error types

use thiserror::Error;

/// Errors from GPU context creation and rendering.
///
/// Surface and allocation failures during a frame are fatal for the render
/// context; recovery is surface recreation (surface-destroyed followed by
/// surface-available), not in-place retry.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No suitable GPU adapter found
    #[error("no suitable GPU adapter found")]
    AdapterNotFound,

    /// Failed to request the GPU device
    #[error("failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// Failed to create the surface
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    /// The surface was lost or is out of memory
    #[error("surface unusable: {0}")]
    SurfaceUnusable(#[from] wgpu::SurfaceError),

    /// Failed to spawn or reach the render thread
    #[error("render thread unavailable: {0}")]
    RenderThread(String),

    /// Snapshot readback failed
    #[error("snapshot readback failed: {0}")]
    Snapshot(String),

    /// Operation on a released render context
    #[error("render context already released")]
    ContextReleased,
}
