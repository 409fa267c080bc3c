// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solution manifolds
//!
//! During propagation every point carries a [`Manifold`]: the locus of
//! positions still consistent with the constraints applied so far. Applying
//! another constraint intersects the current manifold with the new one;
//! solving is the business of shrinking manifolds until they collapse to
//! points.

use keel_core::scalar::{equal, greater_equal, zero};
use keel_geometry::v2_equal;
use nalgebra::{Point2, Vector2};

/// The locus of positions a sketch point may still occupy
#[derive(Debug, Clone, Copy)]
pub enum Manifold {
    /// Unconstrained: the whole plane
    Any,
    /// Infeasible: nothing satisfies the constraints applied so far
    None,
    /// A ray; the direction is oriented and negative parameters are out
    Line {
        origin: Point2<f32>,
        direction: Vector2<f32>,
    },
    Circle {
        origin: Point2<f32>,
        radius: f32,
    },
    /// Two discrete candidates, from circle/circle or line/circle joins
    TwoPoints { a: Point2<f32>, b: Point2<f32> },
    /// Fully determined
    Point(Point2<f32>),
}

impl Manifold {
    pub fn is_none(&self) -> bool {
        matches!(self, Manifold::None)
    }

    /// Epsilon equality, treating the two candidates of `TwoPoints` as
    /// unordered.
    pub fn approx_eq(&self, other: &Manifold) -> bool {
        match (self, other) {
            (Manifold::Any, Manifold::Any) | (Manifold::None, Manifold::None) => true,
            (Manifold::Point(a), Manifold::Point(b)) => v2_equal(a, b),
            (Manifold::TwoPoints { a, b }, Manifold::TwoPoints { a: c, b: d }) => {
                (v2_equal(a, c) && v2_equal(b, d)) || (v2_equal(a, d) && v2_equal(b, c))
            }
            (
                Manifold::Line { origin, direction },
                Manifold::Line {
                    origin: o,
                    direction: d,
                },
            ) => v2_equal(origin, o) && equal(direction.x, d.x) && equal(direction.y, d.y),
            (
                Manifold::Circle { origin, radius },
                Manifold::Circle {
                    origin: o,
                    radius: r,
                },
            ) => v2_equal(origin, o) && equal(*radius, *r),
            _ => false,
        }
    }
}

/// Intersect two manifolds.
///
/// `Any` is the identity and `None` absorbing. Line/line, circle/circle and
/// line/circle meet in closed form, with solutions at negative ray
/// parameters rejected. Coincident lines or circles collapse to the shared
/// manifold. Joins involving already-discrete manifolds (`Point`,
/// `TwoPoints`) yield `None`; callers keep their current manifold when a
/// join comes back empty.
pub fn join(a: Manifold, b: Manifold) -> Manifold {
    use Manifold::*;
    match (a, b) {
        (None, _) | (_, None) => None,
        (Any, other) | (other, Any) => other,
        (
            Line { origin, direction },
            Circle {
                origin: center,
                radius,
            },
        )
        | (
            Circle {
                origin: center,
                radius,
            },
            Line { origin, direction },
        ) => line_circle(origin, direction, center, radius),
        (
            Line { origin, direction },
            Line {
                origin: o2,
                direction: d2,
            },
        ) => line_line(origin, direction, o2, d2),
        (
            Circle { origin, radius },
            Circle {
                origin: o2,
                radius: r2,
            },
        ) => circle_circle(origin, radius, o2, r2),
        _ => None,
    }
}

fn line_line(
    o1: Point2<f32>,
    d1: Vector2<f32>,
    o2: Point2<f32>,
    d2: Vector2<f32>,
) -> Manifold {
    if v2_equal(&o1, &o2) && equal(d1.x, d2.x) && equal(d1.y, d2.y) {
        // coincident rays collapse to the shared manifold
        return Manifold::Line {
            origin: o1,
            direction: d1,
        };
    }

    let denom = d1.x * d2.y - d1.y * d2.x;
    if zero(denom) {
        return Manifold::None;
    }

    let offset = o2 - o1;
    let t = (offset.x * d2.y - offset.y * d2.x) / denom;
    let s = (offset.x * d1.y - offset.y * d1.x) / denom;
    // both parameters must land on the forward half of their rays
    if t < 0.0 || s < 0.0 {
        return Manifold::None;
    }

    Manifold::Point(o1 + d1 * t)
}

fn line_circle(
    origin: Point2<f32>,
    direction: Vector2<f32>,
    center: Point2<f32>,
    radius: f32,
) -> Manifold {
    let other = origin + direction;
    let a = direction.norm_squared();
    let b = 2.0
        * ((other.x - origin.x) * (origin.x - center.x)
            + (other.y - origin.y) * (origin.y - center.y));
    let c = center.x * center.x + center.y * center.y + origin.x * origin.x
        + origin.y * origin.y
        - 2.0 * (center.x * origin.x + center.y * origin.y)
        - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if zero(discriminant) {
        let u = -b / (2.0 * a);
        if !greater_equal(u, 0.0) {
            return Manifold::None;
        }
        return Manifold::Point(origin + direction * u);
    } else if discriminant < 0.0 {
        return Manifold::None;
    }

    let root = discriminant.sqrt();
    let u1 = (-b + root) / (2.0 * a);
    let u2 = (-b - root) / (2.0 * a);
    let p1 = origin + direction * u1;
    let p2 = origin + direction * u2;

    match (greater_equal(u1, 0.0), greater_equal(u2, 0.0)) {
        (false, false) => Manifold::None,
        (true, false) => Manifold::Point(p1),
        (false, true) => Manifold::Point(p2),
        (true, true) => Manifold::TwoPoints { a: p1, b: p2 },
    }
}

fn circle_circle(c1: Point2<f32>, r1: f32, c2: Point2<f32>, r2: f32) -> Manifold {
    let diff = c2 - c1;
    let d = diff.norm();

    if zero(d) && equal(r1, r2) {
        // coincident circles, either manifold will do
        return Manifold::Circle {
            origin: c1,
            radius: r1,
        };
    } else if equal(d, r1 + r2) {
        // externally tangent
        return Manifold::Point(c1 + diff.normalize() * r1);
    } else if equal(d, (r1 - r2).abs()) {
        // internally tangent
        let dir = if r1 >= r2 {
            diff.normalize()
        } else {
            -diff.normalize()
        };
        return Manifold::Point(c1 + dir * r1);
    } else if d > r1 + r2 {
        return Manifold::None;
    } else if d < (r1 - r2).abs() {
        return Manifold::None;
    }

    let k = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - k * k).sqrt();
    let along = diff.normalize() * k;
    let across = Vector2::new(-diff.y, diff.x).normalize() * h;
    Manifold::TwoPoints {
        a: c1 + along + across,
        b: c1 + along - across,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ox: f32, oy: f32, dx: f32, dy: f32) -> Manifold {
        Manifold::Line {
            origin: Point2::new(ox, oy),
            direction: Vector2::new(dx, dy),
        }
    }

    fn circle(ox: f32, oy: f32, r: f32) -> Manifold {
        Manifold::Circle {
            origin: Point2::new(ox, oy),
            radius: r,
        }
    }

    #[test]
    fn line_line_meets_at_a_point() {
        let out = join(line(0.0, 0.0, 1.0, 0.0), line(2.0, 2.0, 0.0, -1.0));
        assert!(out.approx_eq(&Manifold::Point(Point2::new(2.0, 0.0))));
    }

    #[test]
    fn parallel_lines_are_empty() {
        let out = join(line(10.0, 10.0, 0.0, 1.0), line(11.0, 1.0, 0.0, 1.0));
        assert!(out.is_none());
    }

    #[test]
    fn intersections_behind_a_ray_are_rejected() {
        // the crossing sits at (-1, 0), behind the first ray's origin
        let out = join(line(0.0, 0.0, 1.0, 0.0), line(-1.0, -1.0, 0.0, 1.0));
        assert!(out.is_none());
    }

    #[test]
    fn any_is_the_identity() {
        let l = line(0.0, 0.0, 1.0, 1.0);
        assert!(join(Manifold::Any, l).approx_eq(&l));
        assert!(join(l, Manifold::Any).approx_eq(&l));
        assert!(join(Manifold::Any, Manifold::Any).approx_eq(&Manifold::Any));
    }

    #[test]
    fn none_absorbs() {
        assert!(join(Manifold::None, line(0.0, 0.0, 1.0, 0.0)).is_none());
        assert!(join(circle(0.0, 0.0, 1.0), Manifold::None).is_none());
    }

    #[test]
    fn circle_circle_two_points() {
        let out = join(circle(0.0, 0.0, 3.0), circle(1.0, 1.0, 2.0));
        assert!(out.approx_eq(&Manifold::TwoPoints {
            a: Point2::new(0.55104, 2.94896),
            b: Point2::new(2.94896, 0.55104),
        }));
    }

    #[test]
    fn nested_circles_are_empty() {
        let out = join(circle(0.0, 0.0, 1.0), circle(1.0, 0.0, 100.0));
        assert!(out.is_none());
    }

    #[test]
    fn coincident_circles_collapse() {
        let out = join(circle(2.0, 2.0, 5.0), circle(2.0, 2.0, 5.0));
        assert!(out.approx_eq(&circle(2.0, 2.0, 5.0)));
    }

    #[test]
    fn tangent_circles_meet_at_one_point() {
        let out = join(circle(0.0, 0.0, 1.0), circle(3.0, 0.0, 2.0));
        assert!(out.approx_eq(&Manifold::Point(Point2::new(1.0, 0.0))));
    }

    #[test]
    fn line_circle_one_forward_hit() {
        // ray pointing away from the circle still catches the hit behind
        // its origin's far side
        let out = join(line(1.0, 0.0, -3.0, 0.0), circle(1.0, 0.0, 2.0));
        assert!(out.approx_eq(&Manifold::Point(Point2::new(-1.0, 0.0))));
    }

    #[test]
    fn line_circle_tangent() {
        let out = join(line(2.0, 10.0, 0.0, -1.0), circle(0.0, 0.0, 2.0));
        assert!(out.approx_eq(&Manifold::Point(Point2::new(2.0, 0.0))));
    }

    #[test]
    fn line_circle_two_hits() {
        let out = join(line(-5.0, 0.0, 1.0, 0.0), circle(0.0, 0.0, 2.0));
        assert!(out.approx_eq(&Manifold::TwoPoints {
            a: Point2::new(2.0, 0.0),
            b: Point2::new(-2.0, 0.0),
        }));
    }

    #[test]
    fn discrete_manifolds_do_not_join() {
        let p = Manifold::Point(Point2::new(1.0, 1.0));
        assert!(join(p, circle(0.0, 0.0, 1.0)).is_none());
        assert!(join(circle(0.0, 0.0, 1.0), p).is_none());
    }
}
