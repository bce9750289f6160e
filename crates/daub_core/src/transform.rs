//! Transform pipeline
//!
//! Two matrices are kept in lockstep and recomputed together whenever the
//! surface buffer size or the logical painting size changes:
//!
//! 1. painting→view: scales by `buffer_width / painting_width` with a
//!    vertical flip (clip-space Y runs opposite to view-space Y) and keeps
//!    the painting origin centered in the surface. Its inverse maps device
//!    pixel coordinates of input events into painting space.
//! 2. painting→clip: an orthographic projection over the buffer composed
//!    with the affine above, handed to the renderer as one matrix.
//!
//! A stale `ProjectionState` produces visibly misaligned strokes; callers
//! recompute on every surface-available/resized event before requesting the
//! first redraw at the new size.

use crate::{Affine2D, Mat4, Size};

/// Derived projection matrices for one (buffer size, painting size) pair.
/// Never persisted; always recomputed from current sizes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionState {
    pub buffer_width: u32,
    pub buffer_height: u32,
    pub painting_size: Size,
    /// Painting space → device/view pixels
    pub painting_to_view: Affine2D,
    /// Device/view pixels → painting space, applied to input events
    pub view_to_painting: Affine2D,
    /// Combined painting space → clip space projection
    pub projection: Mat4,
}

impl ProjectionState {
    /// Build the full transform pipeline for the given sizes.
    ///
    /// Returns `None` for degenerate sizes (zero-area buffer or painting),
    /// in which case input must keep being dropped and no redraw issued.
    pub fn compute(buffer_width: u32, buffer_height: u32, painting_size: Size) -> Option<Self> {
        if buffer_width == 0 || buffer_height == 0 {
            return None;
        }
        if painting_size.width <= 0.0 || painting_size.height <= 0.0 {
            return None;
        }

        let bw = buffer_width as f32;
        let bh = buffer_height as f32;
        let scale = bw / painting_size.width;

        // Center, scale with vertical flip, re-center the painting origin.
        let painting_to_view = Affine2D::translation(bw / 2.0, bh / 2.0)
            .then(&Affine2D::scale(scale, -scale))
            .then(&Affine2D::translation(
                -painting_size.width / 2.0,
                -painting_size.height / 2.0,
            ));

        let view_to_painting = painting_to_view.invert()?;

        let ortho = Mat4::orthographic(0.0, bw, 0.0, bh, -1.0, 1.0);
        let projection = ortho.mul(&painting_to_view.to_mat4());

        Some(Self {
            buffer_width,
            buffer_height,
            painting_size,
            painting_to_view,
            view_to_painting,
            projection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn test_painting_corners_map_to_buffer_corners() {
        // Matching aspect ratio: corners land exactly on buffer corners,
        // with the vertical flip.
        let st = ProjectionState::compute(1000, 1000, Size::new(500.0, 500.0)).unwrap();
        assert_close(
            st.painting_to_view.transform_point(Point::new(0.0, 0.0)),
            Point::new(0.0, 1000.0),
        );
        assert_close(
            st.painting_to_view.transform_point(Point::new(500.0, 500.0)),
            Point::new(1000.0, 0.0),
        );
        assert_close(
            st.painting_to_view.transform_point(Point::new(500.0, 0.0)),
            Point::new(1000.0, 1000.0),
        );
        assert_close(
            st.painting_to_view.transform_point(Point::new(0.0, 500.0)),
            Point::new(0.0, 0.0),
        );
    }

    #[test]
    fn test_projection_maps_corners_to_clip_extremes() {
        for (bw, bh, pw, ph) in [
            (1000u32, 1000u32, 500.0f32, 500.0f32),
            (800, 600, 400.0, 300.0),
            (640, 480, 640.0, 480.0),
        ] {
            let st = ProjectionState::compute(bw, bh, Size::new(pw, ph)).unwrap();
            assert_close(
                st.projection.project_point(Point::new(0.0, 0.0)),
                Point::new(-1.0, 1.0),
            );
            assert_close(
                st.projection.project_point(Point::new(pw, ph)),
                Point::new(1.0, -1.0),
            );
            assert_close(
                st.projection.project_point(Point::new(pw / 2.0, ph / 2.0)),
                Point::new(0.0, 0.0),
            );
        }
    }

    #[test]
    fn test_view_to_painting_inverts_input() {
        let st = ProjectionState::compute(1000, 1000, Size::new(500.0, 500.0)).unwrap();
        // A touch at the buffer center is the painting center.
        assert_close(
            st.view_to_painting.transform_point(Point::new(500.0, 500.0)),
            Point::new(250.0, 250.0),
        );
        // Top-left of the buffer is the painting's bottom-left corner.
        assert_close(
            st.view_to_painting.transform_point(Point::new(0.0, 0.0)),
            Point::new(0.0, 500.0),
        );
    }

    #[test]
    fn test_nonmatching_aspect_keeps_painting_centered() {
        // Buffer twice as tall as the painting aspect: painting is centered
        // vertically, scale driven by width.
        let st = ProjectionState::compute(1000, 2000, Size::new(500.0, 500.0)).unwrap();
        assert_close(
            st.painting_to_view.transform_point(Point::new(250.0, 250.0)),
            Point::new(500.0, 1000.0),
        );
        assert_close(
            st.painting_to_view.transform_point(Point::new(0.0, 0.0)),
            Point::new(0.0, 1500.0),
        );
    }

    #[test]
    fn test_degenerate_sizes_rejected() {
        assert!(ProjectionState::compute(0, 100, Size::new(10.0, 10.0)).is_none());
        assert!(ProjectionState::compute(100, 0, Size::new(10.0, 10.0)).is_none());
        assert!(ProjectionState::compute(100, 100, Size::ZERO).is_none());
    }
}
