//! Core geometry types
//!
//! Points, sizes and rectangles live in painting space (logical,
//! resolution-independent coordinates) unless noted otherwise. `Affine2D`
//! maps between painting space and device/view space; `Mat4` carries the
//! composed projection handed to the GPU.

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }
}

/// 2D rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.size.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.size.height
    }

    /// Smallest rect covering both `self` and `other`
    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x().min(other.x());
        let y0 = self.y().min(other.y());
        let x1 = (self.x() + self.width()).max(other.x() + other.width());
        let y1 = (self.y() + self.height()).max(other.y() + other.height());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Expand the rect outward by `amount` on every side
    pub fn expand(&self, amount: f32) -> Rect {
        Rect::new(
            self.x() - amount,
            self.y() - amount,
            self.width() + amount * 2.0,
            self.height() + amount * 2.0,
        )
    }
}

/// 2D affine transformation
///
/// | a  c  tx |
/// | b  d  ty |
/// | 0  0   1 |
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2D {
    /// Matrix elements [a, b, c, d, tx, ty]
    pub elements: [f32; 6],
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D {
        elements: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            elements: [1.0, 0.0, 0.0, 1.0, x, y],
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            elements: [sx, 0.0, 0.0, sy, 0.0, 0.0],
        }
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let [a, b, c, d, tx, ty] = self.elements;
        Point::new(
            a * point.x + c * point.y + tx,
            b * point.x + d * point.y + ty,
        )
    }

    /// Concatenate this transform with another (self * other)
    /// The resulting transform first applies `other`, then `self`.
    pub fn then(&self, other: &Affine2D) -> Affine2D {
        let [a1, b1, c1, d1, tx1, ty1] = self.elements;
        let [a2, b2, c2, d2, tx2, ty2] = other.elements;

        Affine2D {
            elements: [
                a1 * a2 + c1 * b2,
                b1 * a2 + d1 * b2,
                a1 * c2 + c1 * d2,
                b1 * c2 + d1 * d2,
                a1 * tx2 + c1 * ty2 + tx1,
                b1 * tx2 + d1 * ty2 + ty1,
            ],
        }
    }

    /// Inverse transform, or `None` when the matrix is singular
    pub fn invert(&self) -> Option<Affine2D> {
        let [a, b, c, d, tx, ty] = self.elements;
        let det = a * d - b * c;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine2D {
            elements: [
                d * inv,
                -b * inv,
                -c * inv,
                a * inv,
                (c * ty - d * tx) * inv,
                (b * tx - a * ty) * inv,
            ],
        })
    }

    /// Embed into a 4x4 matrix (z untouched)
    pub fn to_mat4(&self) -> Mat4 {
        let [a, b, c, d, tx, ty] = self.elements;
        Mat4 {
            cols: [
                [a, b, 0.0, 0.0],
                [c, d, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [tx, ty, 0.0, 1.0],
            ],
        }
    }
}

/// 4x4 transformation matrix (column-major)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Orthographic projection mapping the given ranges to clip space
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rw = 1.0 / (right - left);
        let rh = 1.0 / (top - bottom);
        let rd = 1.0 / (far - near);
        Self {
            cols: [
                [2.0 * rw, 0.0, 0.0, 0.0],
                [0.0, 2.0 * rh, 0.0, 0.0],
                [0.0, 0.0, -2.0 * rd, 0.0],
                [
                    -(right + left) * rw,
                    -(top + bottom) * rh,
                    -(far + near) * rd,
                    1.0,
                ],
            ],
        }
    }

    /// Multiply two matrices
    pub fn mul(&self, other: &Mat4) -> Mat4 {
        let mut result = [[0.0f32; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    result[i][j] += self.cols[k][j] * other.cols[i][k];
                }
            }
        }
        Mat4 { cols: result }
    }

    /// Transform a painting-space point into clip space (z = 0, w = 1)
    pub fn project_point(&self, point: Point) -> Point {
        let c = &self.cols;
        let x = c[0][0] * point.x + c[1][0] * point.y + c[3][0];
        let y = c[0][1] * point.x + c[1][1] * point.y + c[3][1];
        let w = c[0][3] * point.x + c[1][3] * point.y + c[3][3];
        Point::new(x / w, y / w)
    }

    /// Flattened column-major floats, as uploaded to the GPU
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0f32; 16];
        for (i, col) in self.cols.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(col);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn test_rect_union_and_expand() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 15.0, 15.0));
        assert_eq!(a.expand(2.0), Rect::new(-2.0, -2.0, 14.0, 14.0));
    }

    #[test]
    fn test_affine_roundtrip() {
        let m = Affine2D::translation(500.0, 500.0)
            .then(&Affine2D::scale(2.0, -2.0))
            .then(&Affine2D::translation(-250.0, -250.0));
        let inv = m.invert().unwrap();
        let p = Point::new(123.0, 456.0);
        assert_close(inv.transform_point(m.transform_point(p)), p);
    }

    #[test]
    fn test_singular_affine_has_no_inverse() {
        assert!(Affine2D::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_affine_then_order() {
        // `a.then(&b)` applies b first
        let a = Affine2D::translation(10.0, 0.0);
        let b = Affine2D::scale(2.0, 2.0);
        let p = Point::new(1.0, 1.0);
        assert_close(a.then(&b).transform_point(p), Point::new(12.0, 2.0));
    }

    #[test]
    fn test_orthographic_corners() {
        let m = Mat4::orthographic(0.0, 800.0, 0.0, 600.0, -1.0, 1.0);
        assert_close(m.project_point(Point::new(0.0, 0.0)), Point::new(-1.0, -1.0));
        assert_close(m.project_point(Point::new(800.0, 600.0)), Point::new(1.0, 1.0));
        assert_close(m.project_point(Point::new(400.0, 300.0)), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_mat4_mul_identity() {
        let m = Mat4::orthographic(0.0, 100.0, 0.0, 100.0, -1.0, 1.0);
        assert_eq!(m.mul(&Mat4::IDENTITY), m);
        assert_eq!(Mat4::IDENTITY.mul(&m), m);
    }

    #[test]
    fn test_affine_to_mat4_matches_affine() {
        let m = Affine2D::translation(3.0, -4.0).then(&Affine2D::scale(2.0, 0.5));
        let p = Point::new(7.0, 9.0);
        assert_close(m.to_mat4().project_point(p), m.transform_point(p));
    }
}
