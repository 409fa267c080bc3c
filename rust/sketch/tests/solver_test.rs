// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end solver tests: propagation-only sketches, relaxation
//! fallback, and over-constrained diagnosis.

use keel_core::scalar::{equal, EPSILON};
use keel_geometry::v2_equal;
use keel_sketch::{solve, Sketch};
use nalgebra::Point2;

#[test]
fn unit_square_solves_exactly() {
    let mut s = Sketch::new();
    let p1 = s.add_point(Point2::new(0.1, -0.1));
    let p2 = s.add_point(Point2::new(0.8, 0.2));
    let p3 = s.add_point(Point2::new(1.2, 1.1));
    let p4 = s.add_point(Point2::new(-0.2, 0.9));

    let l1 = s.add_line(p1, p2).unwrap();
    let l2 = s.add_line(p2, p3).unwrap();
    let l3 = s.add_line(p3, p4).unwrap();
    let l4 = s.add_line(p4, p1).unwrap();

    for line in [l1, l2, l3, l4] {
        s.add_distance(line, 1.0).unwrap();
    }
    let quarter = 90f32.to_radians();
    s.add_angle(l1, false, l2, false, quarter).unwrap();
    s.add_angle(l2, false, l3, false, quarter).unwrap();
    s.add_angle(l3, false, l4, false, quarter).unwrap();

    s.set_origin(l1, true, 0.0).unwrap();
    // pin the origin corner where the square should sit
    s.point_mut(p1).pos = Point2::new(0.0, 0.0);
    solve(&mut s);

    assert!(v2_equal(&s.point(p1).pos, &Point2::new(0.0, 0.0)));
    assert!(v2_equal(&s.point(p2).pos, &Point2::new(1.0, 0.0)));
    assert!(v2_equal(&s.point(p3).pos, &Point2::new(1.0, 1.0)));
    assert!(v2_equal(&s.point(p4).pos, &Point2::new(0.0, 1.0)));
    assert!(s.constraints.iter().all(|c| !c.violated));
}

#[test]
fn slack_triangle_relaxes_to_equilateral() {
    // a triangle floating free of the origin island: propagation cannot
    // touch it, so relaxation has to pull all three sides to length 1
    let mut s = Sketch::new();
    let p1 = s.add_point(Point2::new(0.0, 0.0));
    let p2 = s.add_point(Point2::new(2.0, 0.0));
    let p3 = s.add_point(Point2::new(0.0, 2.0));

    let l1 = s.add_line(p1, p2).unwrap();
    let l2 = s.add_line(p2, p3).unwrap();
    let l3 = s.add_line(p3, p1).unwrap();

    s.add_distance(l1, 1.0).unwrap();
    s.add_distance(l2, 1.0).unwrap();
    s.add_distance(l3, 1.0).unwrap();

    solve(&mut s);

    for line in [l1, l2, l3] {
        let residual = (s.line_length(line) - 1.0).abs();
        assert!(residual < EPSILON, "residual was {residual}");
    }
    assert!(s.constraints.iter().all(|c| !c.violated));
}

#[test]
fn over_constrained_line_is_flagged() {
    // one line asked to be both 1 and 2 long, anchored to the origin point
    // so one endpoint stays put; the free end settles between the two
    // targets and the solver reports the violation instead of failing
    let mut s = Sketch::new();
    let far = s.add_point(Point2::new(2.0, 0.0));
    let l = s.add_line(s.origin_point, far).unwrap();

    let c1 = s.add_distance(l, 1.0).unwrap();
    let c2 = s.add_distance(l, 2.0).unwrap();

    solve(&mut s);

    let len = s.line_length(l);
    assert!(len > 1.0 && len < 2.0, "length was {len}");
    // the residual of the tighter constraint hovers around half the gap
    assert!((len - 1.5).abs() < 0.35);
    assert!(s.constraint(c1).violated);
    assert!(s.constraint(c2).violated);
}

#[test]
fn angled_legs_meet_where_expected() {
    // two legs hanging off the origin line at +30 and -30 degrees; the
    // far point is pinned down by the pair of angle constraints
    let mut s = Sketch::new();
    let p1 = s.add_point(Point2::new(0.0, 0.0));
    let p2 = s.add_point(Point2::new(0.0, 1.0));
    let p3 = s.add_point(Point2::new(0.0, 0.0));

    let l1 = s.add_line(p1, p2).unwrap();
    let l2 = s.add_line(p2, p3).unwrap();
    let l3 = s.add_line(p3, p1).unwrap();

    s.add_distance(l1, 1.0).unwrap();
    s.add_angle(l1, true, l2, false, 30f32.to_radians()).unwrap();
    s.add_angle(l1, false, l3, true, (-30f32).to_radians()).unwrap();

    s.set_origin(l1, true, 0.0).unwrap();
    solve(&mut s);

    // p2 sits at the end of the origin line, and the legs meet below it
    assert!(v2_equal(&s.point(p2).pos, &Point2::new(1.0, 0.0)));
    assert!(s.point(p3).solved);
    let apex_y = -0.5 * 30f32.to_radians().tan();
    assert!(v2_equal(&s.point(p3).pos, &Point2::new(0.5, apex_y)));
    assert!(s.constraints.iter().all(|c| !c.violated));
}

#[test]
fn solving_twice_is_idempotent() {
    let mut s = Sketch::new();
    let p1 = s.add_point(Point2::new(0.0, 0.0));
    let p2 = s.add_point(Point2::new(2.0, 0.0));
    let p3 = s.add_point(Point2::new(0.0, 2.0));
    let l1 = s.add_line(p1, p2).unwrap();
    let l2 = s.add_line(p2, p3).unwrap();
    let l3 = s.add_line(p3, p1).unwrap();
    s.add_distance(l1, 1.0).unwrap();
    s.add_distance(l2, 1.0).unwrap();
    s.add_distance(l3, 1.0).unwrap();
    s.set_origin(l1, true, 0.0).unwrap();

    solve(&mut s);
    let first: Vec<Point2<f32>> = s.points.iter().map(|p| p.pos).collect();
    let first_flags: Vec<bool> = s.constraints.iter().map(|c| c.violated).collect();

    solve(&mut s);
    let second: Vec<Point2<f32>> = s.points.iter().map(|p| p.pos).collect();
    let second_flags: Vec<bool> = s.constraints.iter().map(|c| c.violated).collect();

    for (a, b) in first.iter().zip(&second) {
        assert!(v2_equal(a, b));
    }
    assert_eq!(first_flags, second_flags);
}

#[test]
fn origin_propagation_places_a_chained_point() {
    // distance plus the origin line's fixed angle pin the free endpoint
    let mut s = Sketch::new();
    let origin_line = s.origin_line;
    s.add_distance(origin_line, 3.0).unwrap();
    solve(&mut s);

    let l = s.line(origin_line);
    let far = if s.origin_point == l.p1 { l.p2 } else { l.p1 };
    assert!(v2_equal(&s.point(far).pos, &Point2::new(3.0, 0.0)));
    assert!(equal(s.line_length(origin_line), 3.0));
}
