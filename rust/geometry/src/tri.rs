// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle and segment math
//!
//! Vertex order is significant everywhere: `normal = normalize((b-a) x (c-a))`
//! defines outward orientation, and all solids are expected to keep their
//! normals facing out.

use keel_core::scalar::equal;
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// A single triangle, immutable after construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tri {
    pub a: Point3<f32>,
    pub b: Point3<f32>,
    pub c: Point3<f32>,
}

impl Tri {
    #[inline]
    pub fn new(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Self {
        Self { a, b, c }
    }

    #[inline]
    pub fn vertices(&self) -> [Point3<f32>; 3] {
        [self.a, self.b, self.c]
    }

    #[inline]
    pub fn vertex(&self, i: usize) -> Point3<f32> {
        match i {
            0 => self.a,
            1 => self.b,
            _ => self.c,
        }
    }

    /// Winding normal; zero for degenerate triangles
    pub fn normal(&self) -> Vector3<f32> {
        let n = (self.b - self.a).cross(&(self.c - self.a));
        let len = n.norm();
        if len > 0.0 {
            n / len
        } else {
            Vector3::zeros()
        }
    }

    #[inline]
    pub fn area(&self) -> f32 {
        (self.b - self.a).cross(&(self.c - self.a)).norm() * 0.5
    }

    /// The same triangle with reversed orientation (a and c swapped)
    #[inline]
    pub fn inverted(self) -> Self {
        Self {
            a: self.c,
            b: self.b,
            c: self.a,
        }
    }

    pub fn transformed(&self, m: &Matrix4<f32>) -> Self {
        Self {
            a: m.transform_point(&self.a),
            b: m.transform_point(&self.b),
            c: m.transform_point(&self.c),
        }
    }
}

/// A 3D line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment3 {
    pub a: Point3<f32>,
    pub b: Point3<f32>,
}

impl Segment3 {
    #[inline]
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        Self { a, b }
    }
}

/// Componentwise epsilon equality for 2D points
#[inline]
pub fn v2_equal(a: &Point2<f32>, b: &Point2<f32>) -> bool {
    equal(a.x, b.x) && equal(a.y, b.y)
}

/// Componentwise epsilon equality for 3D points
#[inline]
pub fn v3_equal(a: &Point3<f32>, b: &Point3<f32>) -> bool {
    equal(a.x, b.x) && equal(a.y, b.y) && equal(a.z, b.z)
}

/// Componentwise epsilon equality for 3D vectors
#[inline]
pub fn vec3_equal(a: &Vector3<f32>, b: &Vector3<f32>) -> bool {
    equal(a.x, b.x) && equal(a.y, b.y) && equal(a.z, b.z)
}

/// Parameter `t` such that `ray_origin + t * ray_dir` lies on the plane.
///
/// `t` may be negative; `None` means the ray is parallel to the plane (or
/// the inputs degenerate to a non-finite parameter). Bounds checking is the
/// caller's job.
pub fn ray_plane_intersection(
    plane_origin: Point3<f32>,
    plane_normal: Vector3<f32>,
    ray_origin: Point3<f32>,
    ray_dir: Vector3<f32>,
) -> Option<f32> {
    let t = (plane_origin - ray_origin).dot(&plane_normal) / ray_dir.dot(&plane_normal);
    t.is_finite().then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use keel_core::scalar::zero;

    #[test]
    fn normal_follows_winding() {
        let t = Tri::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(t.normal().z, 1.0, epsilon = 1e-6);
        assert_relative_eq!(t.inverted().normal().z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_normal_is_zero() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let t = Tri::new(p, p, p);
        assert_eq!(t.normal(), Vector3::zeros());
    }

    #[test]
    fn ray_plane_hits() {
        let t = ray_plane_intersection(
            Point3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        )
        .unwrap();
        assert_relative_eq!(t, 1.0, epsilon = 1e-6);

        // parallel ray has no intersection
        assert!(ray_plane_intersection(
            Point3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        )
        .is_none());
    }

    #[test]
    fn transform_moves_vertices() {
        let t = Tri::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        let m = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 5.0));
        let moved = t.transformed(&m);
        assert!(zero(moved.a.z - 5.0));
        assert!(v3_equal(&moved.b, &Point3::new(1.0, 0.0, 5.0)));
    }
}
